//! Validation contexts and property metadata.
//!
//! A [`ValidationContext`] is a mutable message accumulator created fresh
//! for each validate call and discarded after use; `has_errors` is derived
//! from its contents. A [`PropertyContext`] represents one property of an
//! entity under validation and is the error-emission primitive handed to
//! rules and custom validation code.

use crate::error::ValidationFailure;
use serde::{Deserialize, Serialize};

/// Severity of a validation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single validation message keyed by property path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Fully qualified (dotted) property path
    pub property: String,
    /// Human-readable message text
    pub text: String,
    /// Message severity
    pub severity: Severity,
}

impl Message {
    /// Create a new message.
    pub fn new(property: impl Into<String>, text: impl Into<String>, severity: Severity) -> Self {
        Self {
            property: property.into(),
            text: text.into(),
            severity,
        }
    }
}

/// Ordered accumulator of validation messages for one entity instance.
#[derive(Debug, Default)]
pub struct ValidationContext {
    messages: Vec<Message>,
    path_prefix: String,
}

impl ValidationContext {
    /// Create an empty context with no path prefix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty context whose property paths are qualified with
    /// `prefix` (used when validating nested entities or collection items).
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            path_prefix: prefix.into(),
        }
    }

    /// Build the fully qualified path for a property name.
    pub fn qualify(&self, name: &str) -> String {
        if self.path_prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.path_prefix, name)
        }
    }

    /// Record an error message for a property path.
    pub fn add_error(&mut self, property: impl Into<String>, text: impl Into<String>) {
        self.messages
            .push(Message::new(property, text, Severity::Error));
    }

    /// Record a warning message for a property path.
    pub fn add_warning(&mut self, property: impl Into<String>, text: impl Into<String>) {
        self.messages
            .push(Message::new(property, text, Severity::Warning));
    }

    /// Whether any error-severity message has been recorded.
    pub fn has_errors(&self) -> bool {
        self.messages
            .iter()
            .any(|m| m.severity == Severity::Error)
    }

    /// Whether an error has been recorded for the exact property path.
    pub fn has_error_for(&self, property: &str) -> bool {
        self.messages
            .iter()
            .any(|m| m.severity == Severity::Error && m.property == property)
    }

    /// All messages in insertion order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Consume the context, yielding the ordered messages.
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    /// Append all messages from a nested validation pass. The nested pass is
    /// expected to have qualified its paths already.
    pub fn absorb(&mut self, other: ValidationContext) {
        self.messages.extend(other.messages);
    }

    /// Convert the context to an error-shaped signal: `Err` carrying every
    /// message when errors were recorded, `Ok` otherwise.
    pub fn into_result(self) -> Result<(), ValidationFailure> {
        if self.has_errors() {
            Err(ValidationFailure::new(self.messages))
        } else {
            Ok(())
        }
    }
}

/// Explicit property metadata supplied at configuration time.
///
/// Replaces reflection over property accessors: the caller states the
/// property's code name, its serialized (JSON) name, and the display text
/// used when composing messages.
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    name: String,
    json_name: String,
    text: String,
}

impl PropertyDescriptor {
    /// Create a descriptor with distinct code name, JSON name, and display text.
    pub fn new(
        name: impl Into<String>,
        json_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            json_name: json_name.into(),
            text: text.into(),
        }
    }

    /// Create a descriptor where all three forms share one name.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            json_name: name.clone(),
            text: name.clone(),
            name,
        }
    }

    /// The property's code name, used for qualified paths.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The property's serialized name.
    pub fn json_name(&self) -> &str {
        &self.json_name
    }

    /// The human-readable display text used in messages.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// One property of an entity under validation.
///
/// Ephemeral: owned by the validation pass that created it. Bundles the
/// property's current value, its parent entity, its fully qualified name,
/// and mutable access to the [`ValidationContext`] so rules (and custom
/// validation code) can emit messages.
pub struct PropertyContext<'a, E, V> {
    parent: &'a E,
    value: &'a V,
    descriptor: &'a PropertyDescriptor,
    path: String,
    validation: &'a mut ValidationContext,
}

impl<'a, E, V> PropertyContext<'a, E, V> {
    /// Create a context for one property. Called by the rule engine; rules
    /// receive it ready-made.
    pub fn new(
        parent: &'a E,
        value: &'a V,
        descriptor: &'a PropertyDescriptor,
        path: String,
        validation: &'a mut ValidationContext,
    ) -> Self {
        Self {
            parent,
            value,
            descriptor,
            path,
            validation,
        }
    }

    /// The parent entity.
    pub fn parent(&self) -> &'a E {
        self.parent
    }

    /// The property's current value.
    pub fn value(&self) -> &'a V {
        self.value
    }

    /// The property descriptor.
    pub fn descriptor(&self) -> &PropertyDescriptor {
        self.descriptor
    }

    /// The display text used in messages.
    pub fn text(&self) -> &str {
        self.descriptor.text()
    }

    /// The fully qualified property path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Read access to the enclosing validation context.
    pub fn validation(&self) -> &ValidationContext {
        self.validation
    }

    /// Record an error against this property's path.
    pub fn add_error(&mut self, text: impl Into<String>) {
        let path = self.path.clone();
        self.validation.add_error(path, text);
    }

    /// Record a warning against this property's path.
    pub fn add_warning(&mut self, text: impl Into<String>) {
        let path = self.path.clone();
        self.validation.add_warning(path, text);
    }

    /// Whether this property is already in error.
    pub fn has_error(&self) -> bool {
        self.validation.has_error_for(&self.path)
    }
}
