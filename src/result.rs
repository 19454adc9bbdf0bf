//! Response envelope construction from terminal pipeline outcomes.
//!
//! Maps a [`PatchOutcome`] onto a transport-neutral envelope using HTTP
//! status conventions: success carries the value and a freshly quoted ETag,
//! failures carry a structured error description. A conditional-read
//! short-circuit turns a success into "not modified" when the caller
//! already holds the current tag.

use crate::concurrency::ConcurrencyViolation;
use crate::context::RequestContext;
use crate::error::CoreResult;
use crate::orchestrator::PatchOutcome;
use crate::validation::Message;
use crate::version::{HttpTag, RawTag};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structured error description carried by failure envelopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Human-readable summary of the failure
    pub detail: String,
    /// Per-property validation messages, when applicable
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Message>,
}

/// Transport-neutral response envelope.
///
/// The `etag` field is rendered in quoted HTTP convention; non-HTTP
/// transports may re-parse it via [`HttpTag`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseEnvelope {
    /// HTTP-conventional status code
    pub status: u16,
    /// Response body, absent for no-content and not-modified responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Quoted entity tag of the returned value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Error description for failure envelopes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl ResponseEnvelope {
    /// Whether the envelope describes a success (including not-modified).
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Builds response envelopes from pipeline outcomes.
pub struct ResultBuilder;

impl ResultBuilder {
    /// Build the envelope for a terminal outcome.
    ///
    /// `Updated` and `Unchanged` both map to a success envelope; the
    /// distinction the transport cares about is carried by the tag and
    /// body, not the status.
    pub fn from_outcome<E>(
        outcome: PatchOutcome<E>,
        ctx: &RequestContext,
    ) -> CoreResult<ResponseEnvelope>
    where
        E: Serialize,
    {
        match outcome {
            PatchOutcome::Updated(entity, tag) | PatchOutcome::Unchanged(entity, tag) => {
                Ok(Self::ok_value(serde_json::to_value(&entity)?, tag, ctx))
            }
            PatchOutcome::NotFound => Ok(Self::not_found()),
            PatchOutcome::ValidationFailed(messages) => Ok(Self::validation_failed(messages)),
            PatchOutcome::ConcurrencyFailed(violation) => {
                Ok(Self::precondition_failed(&violation))
            }
        }
    }

    /// Build a success envelope for a value and its fresh tag.
    ///
    /// Returns "not modified" (304, no body) when the caller's
    /// conditional-read tag equals the fresh tag, "no content" (204, no
    /// body) when the value is JSON null, and a 200 envelope with the body
    /// otherwise. The tag is always included.
    pub fn ok_value(value: Value, tag: RawTag, ctx: &RequestContext) -> ResponseEnvelope {
        let quoted = HttpTag::from(tag.clone()).to_string();

        if ctx.if_none_match.as_ref() == Some(&tag) {
            log::debug!(
                "request {}: tag unchanged, responding not modified",
                ctx.request_id
            );
            return ResponseEnvelope {
                status: 304,
                body: None,
                etag: Some(quoted),
                error: None,
            };
        }

        if value.is_null() {
            return ResponseEnvelope {
                status: 204,
                body: None,
                etag: Some(quoted),
                error: None,
            };
        }

        ResponseEnvelope {
            status: 200,
            body: Some(value),
            etag: Some(quoted),
            error: None,
        }
    }

    /// Build a not-found failure envelope.
    pub fn not_found() -> ResponseEnvelope {
        ResponseEnvelope {
            status: 404,
            body: None,
            etag: None,
            error: Some(ErrorDetail {
                detail: "The requested entity does not exist.".to_string(),
                messages: Vec::new(),
            }),
        }
    }

    /// Build a validation failure envelope listing every violated rule.
    pub fn validation_failed(messages: Vec<Message>) -> ResponseEnvelope {
        ResponseEnvelope {
            status: 400,
            body: None,
            etag: None,
            error: Some(ErrorDetail {
                detail: "The request failed validation.".to_string(),
                messages,
            }),
        }
    }

    /// Build a precondition-failed envelope for a concurrency violation.
    pub fn precondition_failed(violation: &ConcurrencyViolation) -> ResponseEnvelope {
        ResponseEnvelope {
            status: 412,
            body: None,
            etag: None,
            error: Some(ErrorDetail {
                detail: violation.to_string(),
                messages: Vec::new(),
            }),
        }
    }
}
