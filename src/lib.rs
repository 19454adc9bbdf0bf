//! # CoreEx
//!
//! A concurrency-aware PUT/PATCH pipeline for JSON entities: JSON Merge
//! Patch (RFC 7396) application, optimistic concurrency via entity tags,
//! a composable validation rule engine, and transport-neutral response
//! building.
//!
//! ## Architecture
//!
//! The pipeline is a fixed sequence of collaborators, each usable on its
//! own:
//!
//! * [`version`] - entity tags with compile-time format safety
//!   ([`RawTag`] / [`HttpTag`]) and deterministic content-derived
//!   generation
//! * [`concurrency`] - the detect-and-reject tag comparison applied
//!   strictly between retrieval and mutation
//! * [`merge`] - RFC 7396 merge-patch application with change detection
//! * [`validation`] - reusable per-entity-type rule sets accumulating
//!   ordered messages, including collection duplicate detection
//! * [`orchestrator`] - the state machine tying retrieval, concurrency,
//!   merge, validation, and a single persistence attempt together
//! * [`result`] - envelope construction with ETag quoting and the
//!   not-modified short-circuit
//! * [`store`] - the storage collaborator contract plus an in-memory
//!   reference implementation
//!
//! Consistency across concurrent writers is enforced purely by the tag
//! comparison; there is no in-process locking and no retry loop. A losing
//! writer re-fetches and resubmits, or gives up.
//!
//! ## Quick Start
//!
//! ```rust
//! use coreex::{InMemoryStore, PatchOrchestrator, RequestContext};
//! use serde_json::{Value, json};
//!
//! # #[tokio::main]
//! # async fn main() -> coreex::CoreResult<()> {
//! let store = InMemoryStore::new();
//! store.seed("1", json!({"id": 1, "name": "Y"})).await;
//!
//! let orchestrator: PatchOrchestrator<Value> = PatchOrchestrator::new("Person");
//! let outcome = orchestrator
//!     .run_patch(&store, "1", &json!({"name": "Z"}), &RequestContext::default())
//!     .await?;
//!
//! assert!(outcome.is_updated());
//! assert_eq!(store.raw("1").await.unwrap(), json!({"id": 1, "name": "Z"}));
//! # Ok(())
//! # }
//! ```

pub mod concurrency;
pub mod context;
pub mod error;
pub mod merge;
pub mod orchestrator;
pub mod result;
pub mod store;
pub mod validation;
pub mod version;

pub use concurrency::{ConcurrencyMatcher, ConcurrencyViolation};
pub use context::RequestContext;
pub use error::{CoreError, CoreResult, ValidationFailure};
pub use merge::{JsonMergePatch, MergeResult};
pub use orchestrator::{PatchOrchestrator, PatchOutcome};
pub use result::{ErrorDetail, ResponseEnvelope, ResultBuilder};
pub use store::{EntityStore, InMemoryStore};
pub use validation::{
    CollectionRuleSet, Message, PropertyDescriptor, PropertyRuleSet, Severity, ValidationContext,
    Validator,
};
pub use version::{EntityTag, HttpTag, RawTag, Versioned, resolve_tag};
