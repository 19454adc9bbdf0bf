//! Merge-patch orchestration: retrieve, check, merge, validate, persist.
//!
//! [`PatchOrchestrator`] drives a single mutation through a fixed sequence.
//! Retrieval, concurrency checking, merging, validation, and persistence run
//! strictly in that order within one asynchronous task; each step may
//! suspend on I/O but nothing runs in parallel. The concurrency check is
//! interleaved inside the merge collaborator's lookup callback so tokens are
//! always compared against the pre-merge state.
//!
//! Exactly one persistence attempt occurs per invocation. There is no
//! compare-and-swap loop: a losing concurrency race surfaces as
//! [`PatchOutcome::ConcurrencyFailed`] and the caller must re-fetch and
//! resubmit. Because persistence is the last step, dropping the returned
//! future before it completes guarantees no write occurred.

use crate::concurrency::{ConcurrencyMatcher, ConcurrencyViolation};
use crate::context::RequestContext;
use crate::error::{CoreError, CoreResult};
use crate::merge::JsonMergePatch;
use crate::store::EntityStore;
use crate::validation::{Message, Validator};
use crate::version::{RawTag, Versioned, resolve_tag};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Terminal outcome of an orchestrated mutation.
///
/// Branching outcomes a caller is expected to handle are returned as data;
/// only unexpected collaborator failures propagate as errors.
#[derive(Debug)]
pub enum PatchOutcome<E> {
    /// The entity was changed, validated, and persisted. Carries the
    /// canonical post-write entity and its fresh tag.
    Updated(E, RawTag),

    /// The patch produced no effective change. Validation and persistence
    /// were skipped; carries the current stored entity and its tag.
    Unchanged(E, RawTag),

    /// No entity exists under the requested key. Always an error-shaped
    /// outcome for mutations, never treated as "no changes".
    NotFound,

    /// The merged entity violated one or more validation rules; every
    /// violated rule is listed. Nothing was persisted.
    ValidationFailed(Vec<Message>),

    /// The concurrency precondition failed: a required tag was missing or
    /// stale. Nothing was persisted.
    ConcurrencyFailed(ConcurrencyViolation),
}

impl<E> PatchOutcome<E> {
    /// Whether a write occurred.
    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated(..))
    }

    /// Whether the outcome carries the unchanged stored entity.
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged(..))
    }

    /// The entity carried by a successful outcome, if any.
    pub fn entity(&self) -> Option<&E> {
        match self {
            Self::Updated(entity, _) | Self::Unchanged(entity, _) => Some(entity),
            _ => None,
        }
    }

    /// The fresh tag carried by a successful outcome, if any.
    pub fn tag(&self) -> Option<&RawTag> {
        match self {
            Self::Updated(_, tag) | Self::Unchanged(_, tag) => Some(tag),
            _ => None,
        }
    }
}

/// Orchestrates PUT and PATCH mutations for one entity type.
///
/// Configured once at startup and shared across requests; it holds no
/// per-call state.
pub struct PatchOrchestrator<E> {
    entity_type: String,
    validator: Option<Validator<E>>,
    auto_concurrency: bool,
}

impl<E> PatchOrchestrator<E>
where
    E: Versioned + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Create an orchestrator with no validator and concurrency checking
    /// driven solely by incoming tags.
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            validator: None,
            auto_concurrency: false,
        }
    }

    /// Validate merged entities with `validator` before persisting.
    pub fn with_validator(mut self, validator: Validator<E>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Require a concurrency tag on every mutation, even when the incoming
    /// value carries none.
    pub fn with_auto_concurrency(mut self, enabled: bool) -> Self {
        self.auto_concurrency = enabled;
        self
    }

    /// Apply a JSON Merge Patch (RFC 7396) document to the entity stored
    /// under `key`.
    ///
    /// The top-level `etag` member of the patch document is treated as a
    /// transport token: it participates in the concurrency check but is not
    /// merged into entity content.
    pub async fn run_patch<S>(
        &self,
        store: &S,
        key: &str,
        patch: &Value,
        ctx: &RequestContext,
    ) -> CoreResult<PatchOutcome<E>>
    where
        S: EntityStore<E>,
    {
        log::debug!(
            "request {}: patch {} '{}'",
            ctx.request_id,
            self.entity_type,
            key
        );

        let Some(stored) = store.get(key).await? else {
            log::debug!("request {}: {} '{}' not found", ctx.request_id, self.entity_type, key);
            return Ok(PatchOutcome::NotFound);
        };
        let stored_value = serde_json::to_value(&stored)?;

        let body = strip_tag_member(patch);
        let merge = JsonMergePatch::merge(&body, |_| {
            // Tokens are compared against the pre-merge state; the full
            // document (tag member included) is what carries the token.
            let checked = ConcurrencyMatcher::check(ctx, &stored, patch, self.auto_concurrency)
                .map(|()| stored_value.clone());
            async move { checked }
        })
        .await;

        let merged = match merge {
            Ok(result) => result,
            Err(CoreError::Concurrency(violation)) => {
                return Ok(PatchOutcome::ConcurrencyFailed(violation));
            }
            Err(other) => return Err(other),
        };

        if !merged.has_changes {
            let tag = resolve_tag(&stored)?;
            log::debug!("request {}: no effective change, skipping write", ctx.request_id);
            return Ok(PatchOutcome::Unchanged(stored, tag));
        }

        let candidate: E = serde_json::from_value(merged.value)?;
        if let Some(failed) = self.check_candidate(&candidate, ctx).await {
            return Ok(failed);
        }

        let written = store.put(key, candidate).await?;
        let tag = resolve_tag(&written)?;
        Ok(PatchOutcome::Updated(written, tag))
    }

    /// Replace the entity stored under `key` with `entity`.
    ///
    /// Same sequence as [`run_patch`](Self::run_patch) without the merge
    /// step: retrieve, check concurrency against the stored value, validate
    /// the replacement, persist once.
    pub async fn run_put<S>(
        &self,
        store: &S,
        key: &str,
        entity: E,
        ctx: &RequestContext,
    ) -> CoreResult<PatchOutcome<E>>
    where
        S: EntityStore<E>,
    {
        log::debug!(
            "request {}: put {} '{}'",
            ctx.request_id,
            self.entity_type,
            key
        );

        let Some(stored) = store.get(key).await? else {
            return Ok(PatchOutcome::NotFound);
        };

        if let Err(error) =
            ConcurrencyMatcher::check(ctx, &stored, &entity, self.auto_concurrency)
        {
            return match error {
                CoreError::Concurrency(violation) => {
                    Ok(PatchOutcome::ConcurrencyFailed(violation))
                }
                other => Err(other),
            };
        }

        if let Some(failed) = self.check_candidate(&entity, ctx).await {
            return Ok(failed);
        }

        let written = store.put(key, entity).await?;
        let tag = resolve_tag(&written)?;
        Ok(PatchOutcome::Updated(written, tag))
    }

    async fn check_candidate(&self, candidate: &E, ctx: &RequestContext) -> Option<PatchOutcome<E>> {
        let validator = self.validator.as_ref()?;
        let vctx = validator.validate(candidate).await;
        if vctx.has_errors() {
            log::debug!(
                "request {}: validation failed with {} message(s), aborting write",
                ctx.request_id,
                vctx.messages().len()
            );
            return Some(PatchOutcome::ValidationFailed(vctx.into_messages()));
        }
        None
    }
}

fn strip_tag_member(patch: &Value) -> Value {
    match patch {
        Value::Object(map) if map.contains_key("etag") => {
            let mut map = map.clone();
            map.remove("etag");
            Value::Object(map)
        }
        _ => patch.clone(),
    }
}
