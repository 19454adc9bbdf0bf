//! Optimistic concurrency matching for write operations.
//!
//! Implements a lock-free, detect-and-reject strategy: concurrent writers to
//! the same entity are serialized only by the entity tag comparison. A
//! losing writer is not queued or retried; it receives a concurrency error
//! and must re-fetch and resubmit.
//!
//! The check runs strictly after retrieval of the current stored value and
//! strictly before any mutation is applied or persisted.

use crate::context::RequestContext;
use crate::error::CoreResult;
use crate::version::{RawTag, Versioned, resolve_tag};
use serde::Serialize;

/// A concurrency precondition violation.
///
/// The two cases are distinguished internally for diagnostics, but both are
/// reported to callers as the same error kind
/// ([`CoreError::Concurrency`](crate::error::CoreError::Concurrency)).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConcurrencyViolation {
    /// A tag was required for this operation and none was supplied, either
    /// on the incoming value or via request metadata.
    #[error("an entity tag is required for this operation and was not supplied")]
    MissingTag,

    /// The supplied tag does not match the stored value's current tag.
    #[error("the supplied entity tag '{supplied}' does not match the current tag '{current}'")]
    Mismatch {
        /// Tag supplied by the client
        supplied: RawTag,
        /// Tag of the stored value at check time
        current: RawTag,
    },
}

/// Matches a stored value's tag against the tag supplied with a write.
pub struct ConcurrencyMatcher;

impl ConcurrencyMatcher {
    /// Check the concurrency precondition for a write.
    ///
    /// Checking is required when the incoming value itself carries a tag or
    /// when the caller has requested automatic concurrency (`auto`). The
    /// expected tag is resolved from the incoming value first, then from the
    /// request's `if_match` metadata. The stored value's tag comes from its
    /// own [`Versioned`] capability when present, otherwise it is derived
    /// deterministically from the stored content.
    ///
    /// Side-effect free on success; returns a
    /// [`CoreError::Concurrency`](crate::error::CoreError::Concurrency) on
    /// violation.
    pub fn check<S, I>(
        ctx: &RequestContext,
        stored: &S,
        incoming: &I,
        auto: bool,
    ) -> CoreResult<()>
    where
        S: Versioned + Serialize,
        I: Versioned,
    {
        let incoming_tag = incoming.entity_tag();
        if incoming_tag.is_none() && !auto {
            return Ok(());
        }
        Self::check_tag(ctx, stored, incoming_tag)
    }

    /// Check an already-resolved (or absent) incoming tag against the stored
    /// value. Unlike [`check`](Self::check), the precondition is
    /// unconditionally required here.
    pub fn check_tag<S>(
        ctx: &RequestContext,
        stored: &S,
        incoming_tag: Option<RawTag>,
    ) -> CoreResult<()>
    where
        S: Versioned + Serialize,
    {
        let supplied = match incoming_tag.or_else(|| ctx.if_match.clone()) {
            Some(tag) => tag,
            None => {
                log::debug!(
                    "request {}: concurrency check failed, no tag supplied",
                    ctx.request_id
                );
                return Err(ConcurrencyViolation::MissingTag.into());
            }
        };

        let current = resolve_tag(stored)?;
        if supplied != current {
            log::debug!(
                "request {}: concurrency check failed, supplied '{}' vs current '{}'",
                ctx.request_id,
                supplied,
                current
            );
            return Err(ConcurrencyViolation::Mismatch { supplied, current }.into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use serde_json::json;

    fn ctx() -> RequestContext {
        RequestContext::with_generated_id()
    }

    #[test]
    fn test_no_tag_no_auto_passes() {
        let stored = json!({"id": 1, "name": "X"});
        let incoming = json!({"name": "Y"});

        ConcurrencyMatcher::check(&ctx(), &stored, &incoming, false).unwrap();
    }

    #[test]
    fn test_auto_without_any_tag_is_missing() {
        let stored = json!({"id": 1, "name": "X"});
        let incoming = json!({"name": "Y"});

        let err = ConcurrencyMatcher::check(&ctx(), &stored, &incoming, true).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Concurrency(ConcurrencyViolation::MissingTag)
        ));
    }

    #[test]
    fn test_matching_body_tag_passes() {
        let stored = json!({"id": 1, "name": "X"});
        let current = resolve_tag(&stored).unwrap();
        let incoming = json!({"name": "Y", "etag": current.as_str()});

        ConcurrencyMatcher::check(&ctx(), &stored, &incoming, false).unwrap();
    }

    #[test]
    fn test_stale_body_tag_is_mismatch() {
        let stored = json!({"id": 1, "name": "X"});
        let incoming = json!({"name": "Y", "etag": "stale"});

        let err = ConcurrencyMatcher::check(&ctx(), &stored, &incoming, false).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Concurrency(ConcurrencyViolation::Mismatch { .. })
        ));
    }

    #[test]
    fn test_if_match_fallback_when_body_has_no_tag() {
        let stored = json!({"id": 1, "name": "X"});
        let current = resolve_tag(&stored).unwrap();
        let incoming = json!({"name": "Y"});

        let ctx = ctx().with_if_match(current);
        ConcurrencyMatcher::check(&ctx, &stored, &incoming, true).unwrap();
    }

    #[test]
    fn test_body_tag_takes_precedence_over_if_match() {
        let stored = json!({"id": 1, "name": "X"});
        let current = resolve_tag(&stored).unwrap();
        // Header carries the right tag, body carries a stale one; the body
        // wins and the check must fail.
        let incoming = json!({"name": "Y", "etag": "stale"});

        let ctx = ctx().with_if_match(current);
        let err = ConcurrencyMatcher::check(&ctx, &stored, &incoming, false).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Concurrency(ConcurrencyViolation::Mismatch { .. })
        ));
    }

    #[test]
    fn test_stored_value_with_explicit_tag() {
        let stored = json!({"id": 1, "name": "X", "etag": "row-7"});
        let incoming = json!({"name": "Y", "etag": "row-7"});

        ConcurrencyMatcher::check(&ctx(), &stored, &incoming, false).unwrap();

        let stale = json!({"name": "Y", "etag": "row-6"});
        let err = ConcurrencyMatcher::check(&ctx(), &stored, &stale, false).unwrap_err();
        assert!(matches!(err, CoreError::Concurrency(_)));
    }

    #[test]
    fn test_round_trip_after_mutation_differs() {
        let stored = json!({"id": 1, "name": "X"});
        let tag = resolve_tag(&stored).unwrap();

        // Unchanged content re-validates against the same tag.
        assert_eq!(tag, resolve_tag(&stored).unwrap());

        // Any content mutation produces a different tag.
        let mutated = json!({"id": 1, "name": "Y"});
        assert_ne!(tag, resolve_tag(&mutated).unwrap());
        assert_eq!(tag, RawTag::from_json(&stored));
    }
}
