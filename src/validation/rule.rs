//! Value rules: named validation behaviors attached to a property.
//!
//! Each rule wraps a validate step guarded by an ordered clause list. The
//! engine invokes a rule's body only when every clause passes (checked in
//! attachment order, short-circuiting) and, unless the rule opts into
//! `validate_when_default`, the property's value differs from its type's
//! default.
//!
//! Rule failures never produce an `Err`; every expected business-rule
//! violation becomes a message on the validation context. Rules hold no
//! per-call mutable state and are shared safely across concurrent passes.

use super::clause::Clause;
use super::context::PropertyContext;
use async_trait::async_trait;
use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;

/// Boxed future alias used by async rule configuration.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Shared rule state: the ordered clause list and the default-value gate.
pub struct RuleBase<E, V> {
    clauses: Vec<Box<dyn Clause<E, V>>>,
    validate_when_default: bool,
}

impl<E, V> RuleBase<E, V> {
    /// Create a base with no clauses.
    pub fn new(validate_when_default: bool) -> Self {
        Self {
            clauses: Vec::new(),
            validate_when_default,
        }
    }

    /// Append a clause; clauses run in attachment order.
    pub fn add_clause(&mut self, clause: Box<dyn Clause<E, V>>) {
        self.clauses.push(clause);
    }

    /// Whether the rule body also runs when the value equals its type's default.
    pub fn validate_when_default(&self) -> bool {
        self.validate_when_default
    }

    pub(crate) fn set_validate_when_default(&mut self, value: bool) {
        self.validate_when_default = value;
    }

    /// Evaluate all clauses in order, short-circuiting on the first `false`.
    pub fn check(&self, ctx: &PropertyContext<'_, E, V>) -> bool {
        self.clauses.iter().all(|clause| clause.check(ctx))
    }
}

/// A named validation behavior attached to a property.
#[async_trait]
pub trait ValueRule<E, V>: Send + Sync
where
    E: Send + Sync,
    V: Send + Sync,
{
    /// The rule's clause list and gating configuration.
    fn base(&self) -> &RuleBase<E, V>;

    /// Mutable access for configuration-time clause attachment.
    fn base_mut(&mut self) -> &mut RuleBase<E, V>;

    /// The rule body. Invoked only after the clause and default-value gates
    /// have passed; emits messages rather than returning errors.
    async fn validate(&self, ctx: &mut PropertyContext<'_, E, V>);
}

/// Whether a value counts as "not provided" for mandatory checking.
///
/// For most types this is equality with the type's default. Strings are the
/// special case: the empty string is also treated as missing. Empty
/// collections follow the same reading (see DESIGN.md for the rationale).
pub trait IsInitial {
    fn is_initial(&self) -> bool;
}

macro_rules! impl_is_initial_by_default {
    ($($t:ty),* $(,)?) => {
        $(impl IsInitial for $t {
            fn is_initial(&self) -> bool {
                *self == <$t>::default()
            }
        })*
    };
}

impl_is_initial_by_default!(
    i8, i16, i32, i64, i128, u8, u16, u32, u64, u128, isize, usize, f32, f64, bool, char
);

impl IsInitial for String {
    fn is_initial(&self) -> bool {
        self.is_empty()
    }
}

impl IsInitial for &str {
    fn is_initial(&self) -> bool {
        self.is_empty()
    }
}

impl<T: IsInitial> IsInitial for Option<T> {
    fn is_initial(&self) -> bool {
        match self {
            None => true,
            Some(value) => value.is_initial(),
        }
    }
}

impl<T> IsInitial for Vec<T> {
    fn is_initial(&self) -> bool {
        self.is_empty()
    }
}

/// Fails when the value counts as "not provided" for its type.
///
/// Always observes default values (a default value is exactly what it is
/// here to reject).
pub struct MandatoryRule<E, V> {
    base: RuleBase<E, V>,
}

impl<E, V> MandatoryRule<E, V> {
    pub fn new() -> Self {
        Self {
            base: RuleBase::new(true),
        }
    }
}

impl<E, V> Default for MandatoryRule<E, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E, V> ValueRule<E, V> for MandatoryRule<E, V>
where
    E: Send + Sync,
    V: IsInitial + Send + Sync,
{
    fn base(&self) -> &RuleBase<E, V> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut RuleBase<E, V> {
        &mut self.base
    }

    async fn validate(&self, ctx: &mut PropertyContext<'_, E, V>) {
        if ctx.value().is_initial() {
            let text = format!("{} is required.", ctx.text());
            ctx.add_error(text);
        }
    }
}

/// Comparison operator for [`CompareValueRule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl CompareOperator {
    /// Evaluate `left <op> right`.
    pub fn evaluate<V: PartialOrd>(&self, left: &V, right: &V) -> bool {
        match self {
            Self::Equal => left == right,
            Self::NotEqual => left != right,
            Self::LessThan => left < right,
            Self::LessThanOrEqual => left <= right,
            Self::GreaterThan => left > right,
            Self::GreaterThanOrEqual => left >= right,
        }
    }

    /// The operator's message text.
    pub fn text(&self) -> &'static str {
        match self {
            Self::Equal => "equal to",
            Self::NotEqual => "not equal to",
            Self::LessThan => "less than",
            Self::LessThanOrEqual => "less than or equal to",
            Self::GreaterThan => "greater than",
            Self::GreaterThanOrEqual => "greater than or equal to",
        }
    }
}

/// Source of the compare-to value: a literal, or a (sync or async) function
/// of the parent entity.
pub enum CompareTo<E, V> {
    Value(V),
    With(Box<dyn Fn(&E) -> V + Send + Sync>),
    WithAsync(Box<dyn for<'a> Fn(&'a E) -> BoxFuture<'a, V> + Send + Sync>),
}

/// Compares the property's value against a configured counterpart.
///
/// On failure the message interpolates the human-readable compare-to text:
/// the explicit override when set, otherwise the produced value's display
/// form.
pub struct CompareValueRule<E, V> {
    base: RuleBase<E, V>,
    operator: CompareOperator,
    to: CompareTo<E, V>,
    text: Option<String>,
}

impl<E, V> CompareValueRule<E, V> {
    /// Compare against a literal value.
    pub fn new(operator: CompareOperator, to: V) -> Self {
        Self {
            base: RuleBase::new(false),
            operator,
            to: CompareTo::Value(to),
            text: None,
        }
    }

    /// Compare against a value produced from the parent entity.
    pub fn with(operator: CompareOperator, f: impl Fn(&E) -> V + Send + Sync + 'static) -> Self {
        Self {
            base: RuleBase::new(false),
            operator,
            to: CompareTo::With(Box::new(f)),
            text: None,
        }
    }

    /// Compare against a value produced asynchronously from the parent entity.
    pub fn with_async(
        operator: CompareOperator,
        f: impl for<'a> Fn(&'a E) -> BoxFuture<'a, V> + Send + Sync + 'static,
    ) -> Self {
        Self {
            base: RuleBase::new(false),
            operator,
            to: CompareTo::WithAsync(Box::new(f)),
            text: None,
        }
    }

    /// Override the compare-to text used in the failure message.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Also run when the value equals its type's default.
    pub fn validate_when_default(mut self, value: bool) -> Self {
        self.base.set_validate_when_default(value);
        self
    }
}

#[async_trait]
impl<E, V> ValueRule<E, V> for CompareValueRule<E, V>
where
    E: Send + Sync,
    V: Clone + PartialOrd + Display + Send + Sync,
{
    fn base(&self) -> &RuleBase<E, V> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut RuleBase<E, V> {
        &mut self.base
    }

    async fn validate(&self, ctx: &mut PropertyContext<'_, E, V>) {
        let to_value = match &self.to {
            CompareTo::Value(value) => value.clone(),
            CompareTo::With(f) => f(ctx.parent()),
            CompareTo::WithAsync(f) => f(ctx.parent()).await,
        };

        if !self.operator.evaluate(ctx.value(), &to_value) {
            let to_text = self
                .text
                .clone()
                .unwrap_or_else(|| to_value.to_string());
            let text = format!("{} must be {} {}.", ctx.text(), self.operator.text(), to_text);
            ctx.add_error(text);
        }
    }
}

/// The caller-supplied body of a [`CustomRule`].
pub enum CustomAction<E, V> {
    Sync(Box<dyn for<'a> Fn(&mut PropertyContext<'a, E, V>) + Send + Sync>),
    Async(Box<dyn for<'a, 'c> Fn(&'c mut PropertyContext<'a, E, V>) -> BoxFuture<'c, ()> + Send + Sync>),
}

/// Wraps arbitrary validation code over the property context.
///
/// Carries no built-in pass/fail logic; the custom code emits messages
/// through the context itself.
pub struct CustomRule<E, V> {
    base: RuleBase<E, V>,
    action: CustomAction<E, V>,
}

impl<E, V> CustomRule<E, V> {
    /// Wrap a synchronous action.
    pub fn new(f: impl for<'a> Fn(&mut PropertyContext<'a, E, V>) + Send + Sync + 'static) -> Self {
        Self {
            base: RuleBase::new(false),
            action: CustomAction::Sync(Box::new(f)),
        }
    }

    /// Wrap an asynchronous function.
    pub fn new_async(
        f: impl for<'a, 'c> Fn(&'c mut PropertyContext<'a, E, V>) -> BoxFuture<'c, ()>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            base: RuleBase::new(false),
            action: CustomAction::Async(Box::new(f)),
        }
    }

    /// Also run when the value equals its type's default.
    pub fn validate_when_default(mut self, value: bool) -> Self {
        self.base.set_validate_when_default(value);
        self
    }
}

#[async_trait]
impl<E, V> ValueRule<E, V> for CustomRule<E, V>
where
    E: Send + Sync,
    V: Send + Sync,
{
    fn base(&self) -> &RuleBase<E, V> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut RuleBase<E, V> {
        &mut self.base
    }

    async fn validate(&self, ctx: &mut PropertyContext<'_, E, V>) {
        match &self.action {
            CustomAction::Sync(f) => f(ctx),
            CustomAction::Async(f) => f(ctx).await,
        }
    }
}

/// Predicate deciding whether a single property value is a duplicate.
pub enum DuplicatePredicate<E> {
    Of(Box<dyn Fn(&E) -> bool + Send + Sync>),
    When(Box<dyn Fn() -> bool + Send + Sync>),
}

/// Fails with a "duplicate" error when its predicate holds.
///
/// For single-property duplicate checks; collection-wide duplicate detection
/// lives in [`CollectionRuleSet`](crate::validation::CollectionRuleSet).
pub struct DuplicateRule<E, V> {
    base: RuleBase<E, V>,
    predicate: DuplicatePredicate<E>,
}

impl<E, V> DuplicateRule<E, V> {
    /// Duplicate when the predicate over the parent entity holds.
    pub fn new(f: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        Self {
            base: RuleBase::new(false),
            predicate: DuplicatePredicate::Of(Box::new(f)),
        }
    }

    /// Duplicate when the zero-argument function returns true.
    pub fn when(f: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        Self {
            base: RuleBase::new(false),
            predicate: DuplicatePredicate::When(Box::new(f)),
        }
    }
}

#[async_trait]
impl<E, V> ValueRule<E, V> for DuplicateRule<E, V>
where
    E: Send + Sync,
    V: Send + Sync,
{
    fn base(&self) -> &RuleBase<E, V> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut RuleBase<E, V> {
        &mut self.base
    }

    async fn validate(&self, ctx: &mut PropertyContext<'_, E, V>) {
        let duplicate = match &self.predicate {
            DuplicatePredicate::Of(f) => f(ctx.parent()),
            DuplicatePredicate::When(f) => f(),
        };
        if duplicate {
            let text = format!(
                "{} already exists and would result in a duplicate.",
                ctx.text()
            );
            ctx.add_error(text);
        }
    }
}
