//! Request context for pipeline operations.
//!
//! Carries per-request metadata: a request id for logging and auditing, and
//! the conditional-request tags (`If-Match` / `If-None-Match` equivalents)
//! supplied by the transport.

use crate::version::RawTag;
use uuid::Uuid;

/// Request context for a single pipeline invocation.
///
/// Created once per request by the transport layer and threaded through
/// retrieval, concurrency checking, and response building.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique identifier for this request
    pub request_id: String,
    /// Tag the client expects the stored value to carry (write precondition)
    pub if_match: Option<RawTag>,
    /// Tag the client already holds (conditional-read short circuit)
    pub if_none_match: Option<RawTag>,
}

impl RequestContext {
    /// Create a new request context with a specific request ID.
    pub fn new(request_id: String) -> Self {
        Self {
            request_id,
            if_match: None,
            if_none_match: None,
        }
    }

    /// Create a new request context with a generated request ID.
    pub fn with_generated_id() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    /// Set the write-precondition tag.
    pub fn with_if_match(mut self, tag: RawTag) -> Self {
        self.if_match = Some(tag);
        self
    }

    /// Set the conditional-read tag.
    pub fn with_if_none_match(mut self, tag: RawTag) -> Self {
        self.if_none_match = Some(tag);
        self
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::with_generated_id()
    }
}
