//! Composable validation rule engine.
//!
//! A [`Validator`] is configured once per entity type and reused across
//! every validation pass; configuration is a fluent chain of
//! [`PropertyRuleSet`]s (scalar properties) and [`CollectionRuleSet`]s
//! (collection properties with duplicate detection). Each rule set holds
//! an ordered list of [`ValueRule`]s, each optionally guarded by
//! [`Clause`]s that decide whether the rule body runs at all.
//!
//! Rule failures are data, not errors: they accumulate as [`Message`]s on
//! a per-call [`ValidationContext`] and never abort the pass, so a single
//! validate call reports everything wrong at once. Misconfiguration, on
//! the other hand (a clause with no rule to attach to, a second duplicate
//! check), is a programming error and panics at setup time.
//!
//! ```rust
//! use coreex::validation::{PropertyDescriptor, PropertyRuleSet, Validator};
//!
//! #[derive(Default)]
//! struct Person {
//!     first_name: String,
//! }
//!
//! # async fn example() {
//! let validator = Validator::new().property(
//!     PropertyRuleSet::new(
//!         PropertyDescriptor::new("first_name", "firstName", "First Name"),
//!         |p: &Person| &p.first_name,
//!     )
//!     .mandatory(),
//! );
//!
//! let ctx = validator.validate(&Person::default()).await;
//! assert_eq!(ctx.messages()[0].text, "First Name is required.");
//! # }
//! ```

pub mod clause;
pub mod collection;
pub mod context;
pub mod rule;
pub mod validator;

pub use clause::{Clause, DependsOnClause};
pub use collection::{CollectionRuleSet, EntityKey, EntityKeyed};
pub use context::{Message, PropertyContext, PropertyDescriptor, Severity, ValidationContext};
pub use rule::{
    BoxFuture, CompareOperator, CompareValueRule, CustomRule, DuplicateRule, IsInitial,
    MandatoryRule, RuleBase, ValueRule,
};
pub use validator::{PropertyRuleSet, Validator};
