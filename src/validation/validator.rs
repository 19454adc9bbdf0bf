//! Entity validator: ordered, type-erased property rule sets.
//!
//! A [`Validator`] is configured once at startup and treated as read-only
//! thereafter; it holds no per-call mutable state, so one instance safely
//! serves many concurrent validation passes. Each call creates a fresh
//! [`ValidationContext`] that is discarded after use.

use super::clause::{Clause, DependsOnClause};
use super::context::{PropertyContext, PropertyDescriptor, ValidationContext};
use super::rule::{
    BoxFuture, CompareOperator, CompareValueRule, CustomRule, DuplicateRule, IsInitial,
    MandatoryRule, ValueRule,
};
use async_trait::async_trait;
use std::fmt::Display;

/// Type-erased validation of one property (or collection) of `E`.
#[async_trait]
pub(crate) trait PropertySetDyn<E>: Send + Sync
where
    E: Send + Sync,
{
    async fn validate_property(&self, entity: &E, vctx: &mut ValidationContext);
}

/// The ordered rule configuration for a single property of `E`.
///
/// Built fluently at configuration time:
///
/// ```rust
/// use coreex::validation::{PropertyDescriptor, PropertyRuleSet, CompareOperator};
///
/// struct Person { age: i32 }
///
/// let rules = PropertyRuleSet::new(PropertyDescriptor::new("age", "age", "Age"), |p: &Person| &p.age)
///     .mandatory()
///     .compare_value(CompareOperator::GreaterThanOrEqual, 18);
/// ```
pub struct PropertyRuleSet<E, V> {
    descriptor: PropertyDescriptor,
    accessor: Box<dyn Fn(&E) -> &V + Send + Sync>,
    rules: Vec<Box<dyn ValueRule<E, V>>>,
}

impl<E, V> PropertyRuleSet<E, V>
where
    E: Send + Sync + 'static,
    V: Default + PartialEq + Send + Sync + 'static,
{
    /// Create a rule set for the property selected by `accessor`.
    pub fn new(
        descriptor: PropertyDescriptor,
        accessor: impl Fn(&E) -> &V + Send + Sync + 'static,
    ) -> Self {
        Self {
            descriptor,
            accessor: Box::new(accessor),
            rules: Vec::new(),
        }
    }

    /// Attach an arbitrary rule.
    pub fn rule(mut self, rule: impl ValueRule<E, V> + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// The value must be provided (see [`IsInitial`]).
    pub fn mandatory(self) -> Self
    where
        V: IsInitial,
    {
        self.rule(MandatoryRule::new())
    }

    /// The value must compare against a literal.
    pub fn compare_value(self, operator: CompareOperator, to: V) -> Self
    where
        V: Clone + PartialOrd + Display,
    {
        self.rule(CompareValueRule::new(operator, to))
    }

    /// The value must compare against a value produced from the parent.
    /// `text` is the human-readable name of the counterpart used in messages.
    pub fn compare_with(
        self,
        operator: CompareOperator,
        f: impl Fn(&E) -> V + Send + Sync + 'static,
        text: impl Into<String>,
    ) -> Self
    where
        V: Clone + PartialOrd + Display,
    {
        self.rule(CompareValueRule::with(operator, f).with_text(text))
    }

    /// The value must compare against an asynchronously produced value.
    pub fn compare_with_async(
        self,
        operator: CompareOperator,
        f: impl for<'a> Fn(&'a E) -> BoxFuture<'a, V> + Send + Sync + 'static,
        text: impl Into<String>,
    ) -> Self
    where
        V: Clone + PartialOrd + Display,
    {
        self.rule(CompareValueRule::with_async(operator, f).with_text(text))
    }

    /// Run arbitrary synchronous validation code over the property context.
    pub fn custom(
        self,
        f: impl for<'a> Fn(&mut PropertyContext<'a, E, V>) + Send + Sync + 'static,
    ) -> Self {
        self.rule(CustomRule::new(f))
    }

    /// Run arbitrary asynchronous validation code over the property context.
    pub fn custom_async(
        self,
        f: impl for<'a, 'c> Fn(&'c mut PropertyContext<'a, E, V>) -> BoxFuture<'c, ()>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.rule(CustomRule::new_async(f))
    }

    /// The value is a duplicate when the predicate over the parent holds.
    pub fn duplicate_if(self, f: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        self.rule(DuplicateRule::new(f))
    }

    /// Attach a [`DependsOnClause`] to the most recently added rule.
    ///
    /// # Panics
    /// Panics if no rule has been added yet (configuration error).
    pub fn depends_on<S>(
        self,
        descriptor: PropertyDescriptor,
        accessor: impl Fn(&E) -> &S + Send + Sync + 'static,
    ) -> Self
    where
        S: Default + PartialEq + Send + Sync + 'static,
    {
        let clause = DependsOnClause::new(descriptor, accessor);
        self.when(clause)
    }

    /// Attach an arbitrary clause to the most recently added rule.
    ///
    /// # Panics
    /// Panics if no rule has been added yet (configuration error).
    pub fn when(mut self, clause: impl Clause<E, V> + 'static) -> Self {
        match self.rules.last_mut() {
            Some(rule) => rule.base_mut().add_clause(Box::new(clause)),
            None => panic!(
                "a clause for property '{}' has no rule to attach to; add a rule first",
                self.descriptor.name()
            ),
        }
        self
    }
}

#[async_trait]
impl<E, V> PropertySetDyn<E> for PropertyRuleSet<E, V>
where
    E: Send + Sync + 'static,
    V: Default + PartialEq + Send + Sync + 'static,
{
    async fn validate_property(&self, entity: &E, vctx: &mut ValidationContext) {
        let value = (self.accessor)(entity);
        let path = vctx.qualify(self.descriptor.name());
        let mut ctx = PropertyContext::new(entity, value, &self.descriptor, path, vctx);

        for rule in &self.rules {
            // Clause gate, evaluated in attachment order.
            if !rule.base().check(&ctx) {
                continue;
            }
            // Default-value gate: the rule body is skipped outright unless
            // it opted into observing default values.
            if !rule.base().validate_when_default() && *ctx.value() == V::default() {
                continue;
            }
            rule.validate(&mut ctx).await;
        }
    }
}

/// Validates one entity type against its configured property rule sets.
pub struct Validator<E> {
    properties: Vec<Box<dyn PropertySetDyn<E>>>,
}

impl<E> Validator<E>
where
    E: Send + Sync + 'static,
{
    /// Create an empty validator.
    pub fn new() -> Self {
        Self {
            properties: Vec::new(),
        }
    }

    /// Add a property rule set. Properties validate in configuration order.
    pub fn property<V>(mut self, set: PropertyRuleSet<E, V>) -> Self
    where
        V: Default + PartialEq + Send + Sync + 'static,
    {
        self.properties.push(Box::new(set));
        self
    }

    pub(crate) fn push_dyn(&mut self, set: Box<dyn PropertySetDyn<E>>) {
        self.properties.push(set);
    }

    /// Validate an entity, returning a fresh context with all messages.
    ///
    /// Never fails for business-rule violations; those are messages on the
    /// returned context.
    pub async fn validate(&self, entity: &E) -> ValidationContext {
        self.validate_with_prefix(entity, "").await
    }

    /// Validate with property paths qualified under `prefix` (used for
    /// nested entities and collection items).
    pub async fn validate_with_prefix(&self, entity: &E, prefix: &str) -> ValidationContext {
        let mut vctx = ValidationContext::with_prefix(prefix);
        for property in &self.properties {
            property.validate_property(entity, &mut vctx).await;
        }
        if vctx.has_errors() {
            log::debug!(
                "validation produced {} message(s)",
                vctx.messages().len()
            );
        }
        vctx
    }
}

impl<E> Default for Validator<E>
where
    E: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Person {
        first_name: Option<String>,
        last_name: Option<String>,
        age: i32,
    }

    fn first_name() -> PropertyDescriptor {
        PropertyDescriptor::new("first_name", "firstName", "First Name")
    }

    fn last_name() -> PropertyDescriptor {
        PropertyDescriptor::new("last_name", "lastName", "Last Name")
    }

    fn age() -> PropertyDescriptor {
        PropertyDescriptor::new("age", "age", "Age")
    }

    #[tokio::test]
    async fn test_mandatory_error_path_and_text() {
        let validator = Validator::new()
            .property(PropertyRuleSet::new(first_name(), |p: &Person| &p.first_name).mandatory());

        let ctx = validator
            .validate(&Person {
                first_name: None,
                ..Default::default()
            })
            .await;

        assert!(ctx.has_errors());
        assert_eq!(ctx.messages().len(), 1);
        assert_eq!(ctx.messages()[0].property, "first_name");
        assert_eq!(ctx.messages()[0].text, "First Name is required.");
    }

    #[tokio::test]
    async fn test_every_violated_rule_is_listed() {
        let validator = Validator::new()
            .property(PropertyRuleSet::new(first_name(), |p: &Person| &p.first_name).mandatory())
            .property(
                PropertyRuleSet::new(age(), |p: &Person| &p.age)
                    .mandatory()
                    .compare_value(CompareOperator::GreaterThanOrEqual, 18),
            );

        let ctx = validator.validate(&Person::default()).await;

        // Mandatory on first_name, mandatory on age (0 is initial); the
        // compare rule is gated off by the default value of age.
        assert_eq!(ctx.messages().len(), 2);
        assert_eq!(ctx.messages()[0].property, "first_name");
        assert_eq!(ctx.messages()[1].property, "age");
    }

    #[tokio::test]
    async fn test_default_value_gates_non_mandatory_rules() {
        let validator = Validator::new().property(
            PropertyRuleSet::new(age(), |p: &Person| &p.age)
                .compare_value(CompareOperator::GreaterThanOrEqual, 18),
        );

        // age == 0 (type default): compare rule must be skipped, not failed.
        let ctx = validator.validate(&Person::default()).await;
        assert!(!ctx.has_errors());

        let ctx = validator
            .validate(&Person {
                age: 16,
                ..Default::default()
            })
            .await;
        assert!(ctx.has_errors());
    }

    /// Spy rule counting how many times its body runs.
    struct SpyRule {
        base: RuleBase<Person, Option<String>>,
        invocations: Arc<AtomicUsize>,
    }

    use crate::validation::rule::RuleBase;

    #[async_trait]
    impl ValueRule<Person, Option<String>> for SpyRule {
        fn base(&self) -> &RuleBase<Person, Option<String>> {
            &self.base
        }

        fn base_mut(&mut self) -> &mut RuleBase<Person, Option<String>> {
            &mut self.base
        }

        async fn validate(&self, _ctx: &mut PropertyContext<'_, Person, Option<String>>) {
            self.invocations.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_failing_clause_never_invokes_rule_body() {
        let invocations = Arc::new(AtomicUsize::new(0));
        let spy = SpyRule {
            base: RuleBase::new(true),
            invocations: invocations.clone(),
        };

        let validator = Validator::new().property(
            PropertyRuleSet::new(last_name(), |p: &Person| &p.last_name)
                .rule(spy)
                .depends_on(first_name(), |p: &Person| &p.first_name),
        );

        // Prerequisite absent: the spy body must not run.
        let ctx = validator
            .validate(&Person {
                last_name: Some("Doe".into()),
                ..Default::default()
            })
            .await;
        assert!(!ctx.has_errors());
        assert_eq!(invocations.load(Ordering::SeqCst), 0);

        // Prerequisite present and clean: the spy body runs once.
        let ctx = validator
            .validate(&Person {
                first_name: Some("Jane".into()),
                last_name: Some("Doe".into()),
                ..Default::default()
            })
            .await;
        assert!(!ctx.has_errors());
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_depends_on_skips_when_prerequisite_missing() {
        let validator = Validator::new()
            .property(PropertyRuleSet::new(first_name(), |p: &Person| &p.first_name).mandatory())
            .property(
                PropertyRuleSet::new(last_name(), |p: &Person| &p.last_name)
                    .mandatory()
                    .depends_on(first_name(), |p: &Person| &p.first_name),
            );

        // first_name missing: its own mandatory error is recorded; the
        // last_name rule is suppressed even though last_name is also empty.
        let ctx = validator.validate(&Person::default()).await;
        assert_eq!(ctx.messages().len(), 1);
        assert_eq!(ctx.messages()[0].property, "first_name");
    }

    #[tokio::test]
    async fn test_depends_on_skips_when_prerequisite_in_error() {
        let validator = Validator::new()
            .property(
                PropertyRuleSet::new(first_name(), |p: &Person| &p.first_name).custom(|ctx| {
                    if ctx.value().as_deref() == Some("Bad") {
                        ctx.add_error("First Name is invalid.");
                    }
                }),
            )
            .property(
                PropertyRuleSet::new(last_name(), |p: &Person| &p.last_name)
                    .mandatory()
                    .depends_on(first_name(), |p: &Person| &p.first_name),
            );

        // first_name present but in error: last_name validation must be
        // suppressed despite last_name being empty.
        let ctx = validator
            .validate(&Person {
                first_name: Some("Bad".into()),
                ..Default::default()
            })
            .await;
        assert_eq!(ctx.messages().len(), 1);
        assert_eq!(ctx.messages()[0].property, "first_name");

        // first_name present and clean: last_name mandatory now fires.
        let ctx = validator
            .validate(&Person {
                first_name: Some("Jane".into()),
                ..Default::default()
            })
            .await;
        assert_eq!(ctx.messages().len(), 1);
        assert_eq!(ctx.messages()[0].property, "last_name");
    }

    #[test]
    #[should_panic(expected = "no rule to attach to")]
    fn test_clause_without_rule_panics() {
        let _ = PropertyRuleSet::new(last_name(), |p: &Person| &p.last_name)
            .depends_on(first_name(), |p: &Person| &p.first_name);
    }

    #[tokio::test]
    async fn test_shared_validator_across_concurrent_tasks() {
        let validator = Arc::new(Validator::new().property(
            PropertyRuleSet::new(first_name(), |p: &Person| &p.first_name).mandatory(),
        ));

        let tasks = (0..8).map(|i| {
            let validator = validator.clone();
            tokio::spawn(async move {
                let person = Person {
                    first_name: if i % 2 == 0 { None } else { Some("J".into()) },
                    ..Default::default()
                };
                validator.validate(&person).await.has_errors()
            })
        });

        let results = futures::future::join_all(tasks).await;
        for (i, result) in results.into_iter().enumerate() {
            assert_eq!(result.unwrap(), i % 2 == 0);
        }
    }

    #[tokio::test]
    async fn test_validation_is_idempotent_across_calls() {
        let validator = Validator::new()
            .property(PropertyRuleSet::new(first_name(), |p: &Person| &p.first_name).mandatory());
        let person = Person::default();

        let first = validator.validate(&person).await;
        let second = validator.validate(&person).await;
        assert_eq!(first.messages(), second.messages());
    }
}
