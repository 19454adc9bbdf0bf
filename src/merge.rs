//! JSON Merge Patch (RFC 7396) application with change detection.
//!
//! A merge patch document is a partial JSON value: provided object members
//! overwrite the corresponding members of the target, explicit `null`
//! members delete them, and non-object patches replace the target outright.
//!
//! [`JsonMergePatch::merge`] is the collaborator shape consumed by the patch
//! orchestrator: the target is obtained through a caller-supplied async
//! `lookup` callback, which is where retrieval and the concurrency check are
//! interleaved before the merge is finalized. The result carries a
//! `has_changes` flag; `has_changes == false` guarantees the merged value is
//! identical to the pre-merge target.
//!
//! # Example
//!
//! ```rust
//! use coreex::merge::apply;
//! use serde_json::json;
//!
//! let target = json!({"id": 1, "name": "X", "nick": "x"});
//! let patch = json!({"name": "Y", "nick": null});
//!
//! assert_eq!(apply(&target, &patch), json!({"id": 1, "name": "Y"}));
//! ```

use crate::error::CoreResult;
use serde_json::{Map, Value};
use std::future::Future;

/// Outcome of merging a patch document into a target value.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeResult {
    /// Whether the merge produced a value different from the target
    pub has_changes: bool,
    /// The merged value
    pub value: Value,
}

/// Apply an RFC 7396 merge patch to a target value.
///
/// Pure function: neither argument is modified. Applying the same patch to
/// its own output yields the output unchanged (idempotence).
pub fn apply(target: &Value, patch: &Value) -> Value {
    match patch {
        Value::Object(patch_obj) => {
            let mut result = match target {
                Value::Object(obj) => obj.clone(),
                // A non-object target is replaced by an empty object before
                // the members are merged in (RFC 7396 section 2).
                _ => Map::new(),
            };
            for (key, member) in patch_obj {
                if member.is_null() {
                    result.remove(key);
                } else {
                    let merged = apply(result.get(key).unwrap_or(&Value::Null), member);
                    result.insert(key.clone(), merged);
                }
            }
            Value::Object(result)
        }
        _ => patch.clone(),
    }
}

/// JSON merge-patch collaborator.
///
/// Wraps [`apply`] with the lookup-callback contract: the target value is
/// produced by `lookup`, which receives the raw partial document and is
/// expected to perform retrieval plus any precondition checks (notably the
/// concurrency check against the pre-merge state) before returning it.
pub struct JsonMergePatch;

impl JsonMergePatch {
    /// Merge `patch` into the value produced by `lookup`.
    ///
    /// Errors from `lookup` abort the merge and propagate unchanged.
    pub async fn merge<F, Fut>(patch: &Value, lookup: F) -> CoreResult<MergeResult>
    where
        F: FnOnce(&Value) -> Fut,
        Fut: Future<Output = CoreResult<Value>>,
    {
        let target = lookup(patch).await?;
        let merged = apply(&target, patch);
        let has_changes = merged != target;
        Ok(MergeResult {
            has_changes,
            value: merged,
        })
    }
}
