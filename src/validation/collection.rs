//! Collection validation: per-item rules and duplicate detection.
//!
//! Duplicate detection runs in one of two modes, fixed at configuration
//! time: a property projection (projected value → first-seen item) or the
//! item's natural identity key. Configuring both, or either twice, is a
//! programming error and fails loudly at setup.

use super::context::{PropertyDescriptor, ValidationContext};
use super::validator::{PropertySetDyn, Validator};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

/// An item's natural identity key: the ordered parts that uniquely identify
/// a domain entity, independent of surrogate/database keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityKey {
    parts: Vec<Value>,
}

impl EntityKey {
    /// Create a key from ordered parts.
    pub fn new(parts: Vec<Value>) -> Self {
        Self { parts }
    }

    /// Create a single-part key.
    pub fn single(part: impl Into<Value>) -> Self {
        Self {
            parts: vec![part.into()],
        }
    }

    /// The ordered key parts.
    pub fn parts(&self) -> &[Value] {
        &self.parts
    }

    /// Whether the key is un-set: every part is null, an empty string, or
    /// zero (i.e. prior to database assignment).
    pub fn is_initial(&self) -> bool {
        self.parts.iter().all(|part| match part {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::Number(n) => n.as_i64() == Some(0) || n.as_f64() == Some(0.0),
            _ => false,
        })
    }

    /// Whether the key has more than one part.
    pub fn is_composite(&self) -> bool {
        self.parts.len() > 1
    }

    /// Canonical form used for equality grouping.
    pub fn canonical(&self) -> String {
        self.parts
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for part in &self.parts {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            match part {
                Value::String(s) => write!(f, "{s}")?,
                other => write!(f, "{other}")?,
            }
        }
        Ok(())
    }
}

/// Capability for items carrying a natural identity key.
///
/// Returning `None` excludes the item from key-based duplicate detection
/// entirely (the "null item" case).
pub trait EntityKeyed {
    fn entity_key(&self) -> Option<EntityKey>;
}

impl<T: EntityKeyed> EntityKeyed for Option<T> {
    fn entity_key(&self) -> Option<EntityKey> {
        self.as_ref().and_then(EntityKeyed::entity_key)
    }
}

enum DuplicateCheck<I> {
    None,
    Property {
        text: String,
        projection: Box<dyn Fn(&I) -> Option<Value> + Send + Sync>,
    },
    Key {
        ignore_initial: bool,
        key: Box<dyn Fn(&I) -> Option<EntityKey> + Send + Sync>,
    },
}

/// Validation configuration for a collection-typed property of `E`.
pub struct CollectionRuleSet<E, I> {
    descriptor: PropertyDescriptor,
    accessor: Box<dyn Fn(&E) -> &[I] + Send + Sync>,
    duplicate: DuplicateCheck<I>,
    item_validator: Option<Validator<I>>,
    min_count: usize,
    max_count: Option<usize>,
}

impl<E, I> CollectionRuleSet<E, I>
where
    E: Send + Sync + 'static,
    I: Send + Sync + 'static,
{
    /// Create a rule set for the collection selected by `accessor`.
    pub fn new(
        descriptor: PropertyDescriptor,
        accessor: impl Fn(&E) -> &[I] + Send + Sync + 'static,
    ) -> Self {
        Self {
            descriptor,
            accessor: Box::new(accessor),
            duplicate: DuplicateCheck::None,
            item_validator: None,
            min_count: 0,
            max_count: None,
        }
    }

    /// Detect duplicates by a property projection.
    ///
    /// `text` names the projected property in messages. Items whose
    /// projection is `None` (or JSON null) are skipped.
    ///
    /// # Panics
    /// Panics if a duplicate check has already been specified.
    pub fn duplicate_by(
        mut self,
        text: impl Into<String>,
        projection: impl Fn(&I) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        self.assert_no_duplicate_check();
        self.duplicate = DuplicateCheck::Property {
            text: text.into(),
            projection: Box::new(projection),
        };
        self
    }

    /// Detect duplicates by each item's natural identity key.
    ///
    /// With `ignore_initial` set, items whose key is un-set (e.g. prior to
    /// database assignment) are excluded from detection, so several new
    /// items may legitimately coexist without keys.
    ///
    /// # Panics
    /// Panics if a duplicate check has already been specified.
    pub fn duplicate_by_key(mut self, ignore_initial: bool) -> Self
    where
        I: EntityKeyed,
    {
        self.assert_no_duplicate_check();
        self.duplicate = DuplicateCheck::Key {
            ignore_initial,
            key: Box::new(|item: &I| item.entity_key()),
        };
        self
    }

    fn assert_no_duplicate_check(&self) {
        if !matches!(self.duplicate, DuplicateCheck::None) {
            panic!(
                "duplicate check for collection property '{}' has already been specified",
                self.descriptor.name()
            );
        }
    }

    /// Validate each item with `validator`, qualifying paths as `name[index]`.
    pub fn items(mut self, validator: Validator<I>) -> Self {
        self.item_validator = Some(validator);
        self
    }

    /// The collection must contain at least `count` items.
    pub fn min_count(mut self, count: usize) -> Self {
        self.min_count = count;
        self
    }

    /// The collection must contain at most `count` items.
    pub fn max_count(mut self, count: usize) -> Self {
        self.max_count = Some(count);
        self
    }

    fn check_duplicates(&self, items: &[I], path: &str, vctx: &mut ValidationContext) {
        match &self.duplicate {
            DuplicateCheck::None => {}
            DuplicateCheck::Property { text, projection } => {
                let mut seen: HashSet<String> = HashSet::new();
                for item in items {
                    let Some(projected) = projection(item) else {
                        continue;
                    };
                    if projected.is_null() {
                        continue;
                    }
                    if !seen.insert(projected.to_string()) {
                        let display = match &projected {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        vctx.add_error(
                            path.to_string(),
                            format!(
                                "{} contains duplicates; {} '{}' specified more than once.",
                                self.descriptor.text(),
                                text,
                                display
                            ),
                        );
                    }
                }
            }
            DuplicateCheck::Key {
                ignore_initial,
                key,
            } => {
                let mut seen: HashSet<String> = HashSet::new();
                for item in items {
                    let Some(item_key) = key(item) else {
                        continue;
                    };
                    if *ignore_initial && item_key.is_initial() {
                        continue;
                    }
                    if !seen.insert(item_key.canonical()) {
                        let message = if item_key.is_composite() {
                            format!(
                                "{} contains duplicates; the key {{{}}} is specified more than once.",
                                self.descriptor.text(),
                                item_key
                            )
                        } else {
                            format!(
                                "{} contains duplicates; identifier '{}' specified more than once.",
                                self.descriptor.text(),
                                item_key
                            )
                        };
                        vctx.add_error(path.to_string(), message);
                    }
                }
            }
        }
    }
}

#[async_trait]
impl<E, I> PropertySetDyn<E> for CollectionRuleSet<E, I>
where
    E: Send + Sync + 'static,
    I: Send + Sync + 'static,
{
    async fn validate_property(&self, entity: &E, vctx: &mut ValidationContext) {
        let items = (self.accessor)(entity);
        let path = vctx.qualify(self.descriptor.name());

        if items.len() < self.min_count {
            vctx.add_error(
                path.clone(),
                format!(
                    "{} must have at least {} item(s).",
                    self.descriptor.text(),
                    self.min_count
                ),
            );
        }
        if let Some(max) = self.max_count {
            if items.len() > max {
                vctx.add_error(
                    path.clone(),
                    format!(
                        "{} must not exceed {} item(s).",
                        self.descriptor.text(),
                        max
                    ),
                );
            }
        }

        if let Some(validator) = &self.item_validator {
            for (index, item) in items.iter().enumerate() {
                let sub = validator
                    .validate_with_prefix(item, &format!("{path}[{index}]"))
                    .await;
                vctx.absorb(sub);
            }
        }

        self.check_duplicates(items, &path, vctx);
    }
}

impl<E> Validator<E>
where
    E: Send + Sync + 'static,
{
    /// Add a collection rule set. Validates in configuration order along
    /// with property rule sets.
    pub fn collection<I>(mut self, set: CollectionRuleSet<E, I>) -> Self
    where
        I: Send + Sync + 'static,
    {
        self.push_dyn(Box::new(set));
        self
    }
}
