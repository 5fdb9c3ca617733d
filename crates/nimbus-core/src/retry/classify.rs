//! Error classification: decoded failure → transient or terminal kind.
//!
//! Classifiers compose as an ordered chain tried in sequence; each returns
//! an optional verdict and the first verdict wins. Which provider codes are
//! transient is injected configuration, never a shared static set.
//! Classification is a pure function of the current response; no history is
//! carried between attempts.

use std::collections::HashSet;

use crate::decode::ErrorDescriptor;
use crate::retry::error::ErrorKind;
use crate::transport::TransportError;

/// Verdict on one failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Delegate to the backoff-limited retry handler.
    Transient,
    /// Terminal; surface with this portable kind.
    Fatal(ErrorKind),
}

/// One link in the chain. Returns None to pass the descriptor on.
pub trait ErrorClassifier: Send + Sync {
    fn classify(&self, descriptor: &ErrorDescriptor) -> Option<Classification>;
}

/// Flags provider codes configured as transient (request-timeout,
/// operation-aborted, clock-skew, throttling and the like).
pub struct TransientCodeClassifier {
    codes: HashSet<String>,
}

impl TransientCodeClassifier {
    pub fn new(codes: impl IntoIterator<Item = String>) -> Self {
        Self {
            codes: codes.into_iter().collect(),
        }
    }
}

impl ErrorClassifier for TransientCodeClassifier {
    fn classify(&self, descriptor: &ErrorDescriptor) -> Option<Classification> {
        let code = descriptor.provider_code.as_deref()?;
        if self.codes.contains(code) {
            Some(Classification::Transient)
        } else {
            None
        }
    }
}

/// How a rule's needle must sit inside the provider code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Suffix,
    Contains,
}

/// One deterministic `(code substring) → kind` mapping rule.
#[derive(Debug, Clone)]
pub struct CodeRule {
    pub needle: &'static str,
    pub match_kind: MatchKind,
    pub kind: ErrorKind,
}

impl CodeRule {
    const fn suffix(needle: &'static str, kind: ErrorKind) -> Self {
        Self {
            needle,
            match_kind: MatchKind::Suffix,
            kind,
        }
    }

    const fn contains(needle: &'static str, kind: ErrorKind) -> Self {
        Self {
            needle,
            match_kind: MatchKind::Contains,
            kind,
        }
    }

    fn matches(&self, code: &str) -> bool {
        match self.match_kind {
            MatchKind::Suffix => code.ends_with(self.needle),
            MatchKind::Contains => code.contains(self.needle),
        }
    }
}

/// Terminal mapper: provider-code substring rules first (longest, most
/// specific match wins), HTTP status fallback second, Unknown last. Always
/// yields a verdict, so it sits at the end of the chain.
pub struct CodeMapClassifier {
    rules: Vec<CodeRule>,
}

impl Default for CodeMapClassifier {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl CodeMapClassifier {
    pub fn new(rules: Vec<CodeRule>) -> Self {
        Self { rules }
    }

    fn best_rule(&self, code: &str) -> Option<&CodeRule> {
        self.rules
            .iter()
            .filter(|rule| rule.matches(code))
            .max_by_key(|rule| {
                // Longer needles are more specific; a suffix anchor beats a
                // bare substring of the same length.
                (
                    rule.needle.len(),
                    matches!(rule.match_kind, MatchKind::Suffix),
                )
            })
    }
}

impl ErrorClassifier for CodeMapClassifier {
    fn classify(&self, descriptor: &ErrorDescriptor) -> Option<Classification> {
        if let Some(code) = descriptor.provider_code.as_deref() {
            if let Some(rule) = self.best_rule(code) {
                return Some(Classification::Fatal(rule.kind));
            }
        }
        Some(Classification::Fatal(kind_from_status(
            descriptor.status.as_u16(),
        )))
    }
}

/// The code-substring conventions shared across provider dialects.
pub fn default_rules() -> Vec<CodeRule> {
    vec![
        CodeRule::suffix("NotFound", ErrorKind::ResourceNotFound),
        CodeRule::contains("AuthFailure", ErrorKind::AuthorizationFailure),
        CodeRule::contains("AccessDenied", ErrorKind::AuthorizationFailure),
        CodeRule::contains("UnauthorizedOperation", ErrorKind::AuthorizationFailure),
        CodeRule::contains("InUse", ErrorKind::IllegalState),
        CodeRule::contains("IncorrectState", ErrorKind::IllegalState),
        CodeRule::contains("Unsupported", ErrorKind::UnsupportedOperation),
        CodeRule::contains("NotImplemented", ErrorKind::UnsupportedOperation),
        CodeRule::contains("InvalidParameter", ErrorKind::IllegalArgument),
        CodeRule::contains("ValidationError", ErrorKind::IllegalArgument),
        CodeRule::contains("Malformed", ErrorKind::IllegalArgument),
        CodeRule::contains("InsufficientCapacity", ErrorKind::InsufficientResources),
        CodeRule::contains(
            "InsufficientInstanceCapacity",
            ErrorKind::InsufficientResources,
        ),
    ]
}

/// Status fallback for descriptors whose code matched no rule (or that had
/// no code at all).
fn kind_from_status(status: u16) -> ErrorKind {
    match status {
        400 => ErrorKind::IllegalArgument,
        401 | 403 => ErrorKind::AuthorizationFailure,
        404 | 410 => ErrorKind::ResourceNotFound,
        405 | 501 => ErrorKind::UnsupportedOperation,
        409 => ErrorKind::IllegalState,
        507 => ErrorKind::InsufficientResources,
        _ => ErrorKind::Unknown,
    }
}

/// Ordered classifier chain. The first verdict wins; a descriptor nothing
/// claims is Unknown.
pub struct ClassifierChain {
    classifiers: Vec<Box<dyn ErrorClassifier>>,
}

impl ClassifierChain {
    pub fn new(classifiers: Vec<Box<dyn ErrorClassifier>>) -> Self {
        Self { classifiers }
    }

    /// The stock chain: configured transient codes first, then the
    /// deterministic code/status mapping.
    pub fn standard(transient_codes: impl IntoIterator<Item = String>) -> Self {
        Self::new(vec![
            Box::new(TransientCodeClassifier::new(transient_codes)),
            Box::new(CodeMapClassifier::default()),
        ])
    }

    pub fn classify(&self, descriptor: &ErrorDescriptor) -> Classification {
        for classifier in &self.classifiers {
            if let Some(verdict) = classifier.classify(descriptor) {
                return verdict;
            }
        }
        Classification::Fatal(ErrorKind::Unknown)
    }
}

/// Transport failures ride the same ladder as error statuses: timeouts and
/// connection-level failures are transient, anything else is terminal.
pub fn classify_transport(error: &TransportError) -> Classification {
    match error {
        TransportError::Timeout(_) | TransportError::Connect(_) => Classification::Transient,
        TransportError::Io(_) | TransportError::Other(_) => {
            Classification::Fatal(ErrorKind::Unknown)
        }
    }
}
