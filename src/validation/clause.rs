//! Rule clauses: guard predicates evaluated before a rule body runs.
//!
//! Clauses attach to a rule in order; evaluation short-circuits on the first
//! clause returning `false`, in which case the rule body is skipped entirely
//! (not merely a no-op). Clauses are stateless and safely shared across
//! concurrent validation passes.

use super::context::{PropertyContext, PropertyDescriptor};

/// A predicate over a [`PropertyContext`] deciding whether rule evaluation
/// continues.
pub trait Clause<E, V>: Send + Sync {
    /// Return `false` to halt the current rule.
    fn check(&self, ctx: &PropertyContext<'_, E, V>) -> bool;
}

/// Halts the rule unless a sibling property is both present (not at its
/// type's default) and currently error-free.
///
/// Used to suppress follow-on noise: a property whose validity depends on a
/// prerequisite is only validated once the prerequisite itself holds a real,
/// valid value.
pub struct DependsOnClause<E, S> {
    descriptor: PropertyDescriptor,
    accessor: Box<dyn Fn(&E) -> &S + Send + Sync>,
}

impl<E, S> DependsOnClause<E, S> {
    /// Create a clause referencing a sibling property.
    pub fn new(
        descriptor: PropertyDescriptor,
        accessor: impl Fn(&E) -> &S + Send + Sync + 'static,
    ) -> Self {
        Self {
            descriptor,
            accessor: Box::new(accessor),
        }
    }
}

impl<E, V, S> Clause<E, V> for DependsOnClause<E, S>
where
    S: Default + PartialEq,
{
    fn check(&self, ctx: &PropertyContext<'_, E, V>) -> bool {
        let sibling = (self.accessor)(ctx.parent());
        if *sibling == S::default() {
            return false;
        }

        // The in-error lookup is qualified with this clause's own bound
        // property name, not the dependent property's. Long-standing engine
        // behavior; see DESIGN.md before changing it.
        let qualified = ctx.validation().qualify(self.descriptor.name());
        !ctx.validation().has_error_for(&qualified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationContext;

    struct Person {
        first_name: String,
        last_name: String,
    }

    fn property_ctx<'a>(
        person: &'a Person,
        descriptor: &'a PropertyDescriptor,
        vctx: &'a mut ValidationContext,
    ) -> PropertyContext<'a, Person, String> {
        let path = vctx.qualify(descriptor.name());
        PropertyContext::new(person, &person.last_name, descriptor, path, vctx)
    }

    #[test]
    fn test_depends_on_fails_when_sibling_is_default() {
        let person = Person {
            first_name: String::new(),
            last_name: "Doe".into(),
        };
        let descriptor = PropertyDescriptor::named("last_name");
        let mut vctx = ValidationContext::new();

        let clause: DependsOnClause<Person, String> =
            DependsOnClause::new(PropertyDescriptor::named("first_name"), |p: &Person| &p.first_name);

        let ctx = property_ctx(&person, &descriptor, &mut vctx);
        assert!(!clause.check(&ctx));
    }

    #[test]
    fn test_depends_on_fails_when_sibling_in_error() {
        let person = Person {
            first_name: "Jane".into(),
            last_name: "Doe".into(),
        };
        let descriptor = PropertyDescriptor::named("last_name");
        let mut vctx = ValidationContext::new();
        vctx.add_error("first_name", "First Name is invalid.");

        let clause: DependsOnClause<Person, String> =
            DependsOnClause::new(PropertyDescriptor::named("first_name"), |p: &Person| &p.first_name);

        let ctx = property_ctx(&person, &descriptor, &mut vctx);
        assert!(!clause.check(&ctx));
    }

    #[test]
    fn test_depends_on_passes_when_sibling_present_and_clean() {
        let person = Person {
            first_name: "Jane".into(),
            last_name: "Doe".into(),
        };
        let descriptor = PropertyDescriptor::named("last_name");
        let mut vctx = ValidationContext::new();

        let clause: DependsOnClause<Person, String> =
            DependsOnClause::new(PropertyDescriptor::named("first_name"), |p: &Person| &p.first_name);

        let ctx = property_ctx(&person, &descriptor, &mut vctx);
        assert!(clause.check(&ctx));
    }

    #[test]
    fn test_depends_on_qualifies_with_context_prefix() {
        let person = Person {
            first_name: "Jane".into(),
            last_name: "Doe".into(),
        };
        let descriptor = PropertyDescriptor::named("last_name");
        // An error on the unqualified name must not be seen by a prefixed pass.
        let mut vctx = ValidationContext::with_prefix("outer");
        vctx.add_error("first_name", "unqualified error");

        let clause: DependsOnClause<Person, String> =
            DependsOnClause::new(PropertyDescriptor::named("first_name"), |p: &Person| &p.first_name);

        let ctx = property_ctx(&person, &descriptor, &mut vctx);
        assert!(clause.check(&ctx));

        let mut vctx = ValidationContext::with_prefix("outer");
        vctx.add_error("outer.first_name", "qualified error");
        let ctx = property_ctx(&person, &descriptor, &mut vctx);
        assert!(!clause.check(&ctx));
    }
}
