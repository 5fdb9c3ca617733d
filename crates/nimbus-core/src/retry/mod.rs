//! Retry decisions for one logical call.
//!
//! This module holds the pieces the executor composes: the per-call
//! `CommandState`, the backoff-limited retry handler, the redirection
//! handler, and the provider-pluggable error classifier chain.

mod classify;
mod error;
mod handler;
mod redirect;
mod state;

pub use classify::{
    classify_transport, default_rules, Classification, ClassifierChain, CodeMapClassifier,
    CodeRule, ErrorClassifier, MatchKind, TransientCodeClassifier,
};
pub use error::{ApiError, ErrorKind};
pub use handler::{BackoffRetryHandler, DEFAULT_MAX_ATTEMPTS};
pub use redirect::{RedirectHandler, DEFAULT_MAX_REDIRECTS};
pub use state::CommandState;
