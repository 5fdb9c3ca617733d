//! Subcommand implementations.

mod send;
mod wait;

pub use send::run_send;
pub use wait::run_wait;
