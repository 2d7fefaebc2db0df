//! The opaque failure payload carried through rejection channels.
//!
//! The library never inspects a failure's content: it is payload, produced
//! by whatever settled the promise and consumed by whatever `fail` handler
//! eventually intercepts it. [`Failure`] is cheap to clone so that a single
//! rejection can fan out to every registered failure continuation.

use std::any::Any;
use std::sync::Arc;

use thiserror::Error;

/// An opaque failure carried end-to-end through rejection channels.
///
/// A `Failure` holds a human-readable message and an optional
/// machine-readable `kind` tag that recovery handlers can match on.
/// Nothing in the promise machinery branches on either field.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct Failure {
    message: Arc<str>,
    kind: Option<Arc<str>>,
}

impl Failure {
    /// Creates a failure with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Arc::from(message.into()),
            kind: None,
        }
    }

    /// Attaches a machine-readable kind tag for handler-side matching.
    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(Arc::from(kind.into()));
        self
    }

    /// Wraps an arbitrary error value, capturing its display rendering.
    #[must_use]
    pub fn from_error(error: &dyn std::error::Error) -> Self {
        Self::new(error.to_string())
    }

    /// Converts a caught panic payload into a failure.
    ///
    /// Panics raised inside `then`/`pipe`/`fail` callbacks are caught at the
    /// operator boundary and rejected through this conversion. String and
    /// `&str` payloads keep their message; anything else gets a placeholder.
    #[must_use]
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = payload.downcast::<String>().map_or_else(
            |payload| match payload.downcast::<&'static str>() {
                Ok(s) => (*s).to_string(),
                Err(_) => "panic in promise continuation".to_string(),
            },
            |s| *s,
        );
        Self::new(message).with_kind("panic")
    }

    /// Returns the failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the kind tag, if one was attached.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    /// Returns true if this failure carries the given kind tag.
    #[must_use]
    pub fn is(&self, kind: &str) -> bool {
        self.kind.as_deref() == Some(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_the_message() {
        let failure = Failure::new("connection refused");
        assert_eq!(failure.to_string(), "connection refused");
    }

    #[test]
    fn kind_tag_matching() {
        let failure = Failure::new("no route").with_kind("io");
        assert!(failure.is("io"));
        assert!(!failure.is("timeout"));
        assert_eq!(failure.kind(), Some("io"));
    }

    #[test]
    fn untagged_failure_matches_nothing() {
        let failure = Failure::new("whatever");
        assert!(!failure.is("io"));
        assert_eq!(failure.kind(), None);
    }

    #[test]
    fn from_error_captures_display() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let failure = Failure::from_error(&io);
        assert_eq!(failure.message(), "disk gone");
    }

    #[test]
    fn from_panic_string_payload() {
        let failure = Failure::from_panic(Box::new("boom".to_string()));
        assert_eq!(failure.message(), "boom");
        assert!(failure.is("panic"));
    }

    #[test]
    fn from_panic_str_payload() {
        let failure = Failure::from_panic(Box::new("static boom"));
        assert_eq!(failure.message(), "static boom");
    }

    #[test]
    fn from_panic_opaque_payload() {
        let failure = Failure::from_panic(Box::new(17_u32));
        assert_eq!(failure.message(), "panic in promise continuation");
    }

    #[test]
    fn clones_share_content() {
        let failure = Failure::new("once").with_kind("io");
        let copy = failure.clone();
        assert_eq!(copy.message(), failure.message());
        assert_eq!(copy.kind(), failure.kind());
    }
}
