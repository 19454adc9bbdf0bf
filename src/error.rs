//! Error types for the patch pipeline and validation engine.
//!
//! The taxonomy deliberately separates outcomes a caller is expected to
//! branch on (not-found, concurrency, validation) from failures that simply
//! propagate (JSON handling, storage collaborators). Ordinary rule failures
//! never surface here at all; they are accumulated as messages on a
//! [`ValidationContext`](crate::validation::ValidationContext) and only
//! converted into a [`ValidationFailure`] when crossing a boundary that
//! needs an error-shaped signal.

use crate::concurrency::ConcurrencyViolation;
use crate::validation::Message;

/// Main error type for pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// One or more validation rules failed and the failure had to cross an
    /// error-shaped boundary (e.g. an orchestrated mutation was aborted).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationFailure),

    /// A required entity tag was missing or did not match the stored value.
    #[error("Concurrency error: {0}")]
    Concurrency(#[from] ConcurrencyViolation),

    /// The retrieval collaborator returned no value when one was required.
    #[error("Entity not found: {entity_type} with key {key}")]
    NotFound { entity_type: String, key: String },

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors from the caller-provided storage collaborators. These are
    /// propagated unchanged; the pipeline performs no retries.
    #[error("Store error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Invalid request format or parameters.
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },
}

// Convenience methods for creating common errors
impl CoreError {
    /// Create a not-found error.
    pub fn not_found(entity_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            key: key.into(),
        }
    }

    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Wrap a storage collaborator error.
    pub fn store<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Store(Box::new(error))
    }
}

/// An error-shaped carrier for one or more validation messages.
///
/// Produced by [`ValidationContext::into_result`](crate::validation::ValidationContext::into_result)
/// when a validation pass with errors must abort an operation. Every violated
/// rule is listed, not just the first.
#[derive(Debug, Clone)]
pub struct ValidationFailure {
    messages: Vec<Message>,
}

impl ValidationFailure {
    /// Create a failure from an ordered list of messages.
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// The ordered validation messages.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Consume the failure, yielding the ordered messages.
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} validation message(s)", self.messages.len())?;
        for m in &self.messages {
            write!(f, "; {}: {}", m.property, m.text)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationFailure {}

/// Result type alias for pipeline operations.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Severity;

    #[test]
    fn test_not_found_display() {
        let error = CoreError::not_found("Person", "123");
        assert!(error.to_string().contains("Person"));
        assert!(error.to_string().contains("123"));
    }

    #[test]
    fn test_validation_failure_lists_every_message() {
        let failure = ValidationFailure::new(vec![
            Message::new("firstName", "First Name is required.", Severity::Error),
            Message::new("age", "Age must be greater than 17.", Severity::Error),
        ]);
        let text = failure.to_string();
        assert!(text.contains("2 validation message(s)"));
        assert!(text.contains("firstName"));
        assert!(text.contains("age"));
    }

    #[test]
    fn test_error_chain() {
        let failure = ValidationFailure::new(vec![]);
        let error = CoreError::from(failure);
        assert!(error.to_string().contains("Validation error"));
    }
}
