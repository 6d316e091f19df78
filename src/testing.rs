//! Test double container.
//!
//! [`FakeContainer`] builds a service from its real binding but supplies each
//! dependency from a set of stand-ins, so a unit test exercises one service
//! in isolation while registrations stay the single source of truth.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::error::{DiError, DiResult, Operation};
use crate::internal::StackGuard;
use crate::provider::{assemble, next_container_id, Container, Notifier};
use crate::registration::{AnyArc, Dependency};
use crate::trace::MethodTracer;
use crate::traits::ResolverCore;
use crate::value::Value;

/// How notifiers handed to services built by a [`FakeContainer`] behave.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TestDoublePolicy {
    /// Notifying does nothing.
    #[default]
    Stub,
    /// Notifying fails with `DiError::UnexpectedNotification`.
    Mock,
}

/// Builds services with substituted dependencies.
///
/// Each dependency is taken from, in order: an instance registered on the
/// fake, a service listed with [`include_real`](Self::include_real) (itself
/// built through the fake), or else the resolution fails with
/// `DiError::MissingTestDouble`. Services built here are never cached and
/// never join the listener table; their notifiers follow the fake's
/// [`TestDoublePolicy`].
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{Container, FakeContainer, Resolver};
/// use std::sync::Arc;
///
/// struct Clock(u64);
/// struct Greeter {
///     clock: Arc<Clock>,
/// }
///
/// let container = Container::new();
/// container.register("clock").unwrap().with_constructor(|_| Ok(Clock(0)));
/// container.register("greeter").unwrap()
///     .with_constructor(|ctx| Ok(Greeter { clock: ctx.get::<Clock>("clock")? }))
///     .with_dependencies(["clock"]);
///
/// let mut fake = FakeContainer::new(&container);
/// fake.register_instance("clock", Arc::new(Clock(42))).unwrap();
///
/// let greeter = fake.resolve::<Greeter>("greeter", &[]).unwrap();
/// assert_eq!(greeter.clock.0, 42);
/// ```
pub struct FakeContainer<'c> {
    container: &'c Container,
    id: usize,
    overrides: HashMap<String, AnyArc>,
    included: HashSet<String>,
    policy: TestDoublePolicy,
}

impl<'c> FakeContainer<'c> {
    pub fn new(container: &'c Container) -> Self {
        Self {
            container,
            id: next_container_id(),
            overrides: HashMap::new(),
            included: HashSet::new(),
            policy: TestDoublePolicy::default(),
        }
    }

    /// Sets how notifiers of services built from now on behave.
    pub fn with_policy(mut self, policy: TestDoublePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> TestDoublePolicy {
        self.policy
    }

    /// Supplies `instance` wherever a service depends on `name`.
    ///
    /// Each name can be overridden once.
    pub fn register_instance<T: Any + Send + Sync>(
        &mut self,
        name: impl Into<String>,
        instance: Arc<T>,
    ) -> DiResult<()> {
        let name = name.into();
        if self.overrides.contains_key(&name) {
            return Err(DiError::DuplicateOverride(name));
        }
        self.overrides.insert(name, instance as AnyArc);
        Ok(())
    }

    /// Dependencies built from their real bindings instead of stand-ins.
    pub fn include_real<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.included.extend(names.into_iter().map(Into::into));
        self
    }

    fn stand_in(&self, dependency: &Dependency) -> DiResult<AnyArc> {
        let name = dependency.service();
        if let Some(instance) = self.overrides.get(name) {
            return Ok(instance.clone());
        }
        if self.included.contains(name) {
            return self.resolve_any(name, &[]);
        }
        Err(DiError::MissingTestDouble(name.to_string()))
    }
}

impl ResolverCore for FakeContainer<'_> {
    fn resolve_any(&self, name: &str, args: &[Value]) -> DiResult<AnyArc> {
        let inner = self.container.inner();
        let binding = inner.binding(name, Operation::Load)?;
        let _guard = StackGuard::enter(self.id, name, inner.max_depth)?;

        let dependencies = |dependency: &Dependency| self.stand_in(dependency);
        let service = binding.friendly_name();
        let notifier = |event: &str| match self.policy {
            TestDoublePolicy::Stub => Notifier::detached(event),
            TestDoublePolicy::Mock => Notifier::rejecting(event, &service),
        };
        let (instance, _) = assemble(&binding, args, &dependencies, &notifier, MethodTracer::disabled())?;
        Ok(instance)
    }
}

impl fmt::Debug for FakeContainer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut overrides: Vec<_> = self.overrides.keys().collect();
        overrides.sort();
        let mut included: Vec<_> = self.included.iter().collect();
        included.sort();
        f.debug_struct("FakeContainer")
            .field("overrides", &overrides)
            .field("included", &included)
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Resolver;

    #[derive(Debug)]
    struct Foo;

    #[test]
    fn duplicate_override_is_rejected() {
        let container = Container::new();
        let mut fake = FakeContainer::new(&container);
        fake.register_instance("_foo", Arc::new(Foo)).unwrap();

        let err = fake.register_instance("_foo", Arc::new(Foo)).unwrap_err();
        assert_eq!(err.to_string(), "Service _foo already has a test definition");
    }

    #[test]
    fn policy_defaults_to_stub() {
        let container = Container::new();
        let fake = FakeContainer::new(&container);
        assert_eq!(fake.policy(), TestDoublePolicy::Stub);
        assert_eq!(fake.with_policy(TestDoublePolicy::Mock).policy(), TestDoublePolicy::Mock);
    }

    #[test]
    fn unknown_service_is_reported_as_load() {
        let container = Container::new();
        let fake = FakeContainer::new(&container);
        let err = fake.resolve::<Foo>("_nope", &[]).unwrap_err();
        assert_eq!(err.to_string(), "Load was called for undefined service '_nope'.");
    }

    #[test]
    fn missing_stand_in_names_the_dependency() {
        let container = Container::new();
        container.register("_foo").unwrap().with_constructor(|_| Ok(Foo)).with_dependencies(["_bar"]);

        let fake = FakeContainer::new(&container);
        match fake.resolve_any("_foo", &[]) {
            Err(DiError::MissingTestDouble(name)) => assert_eq!(name, "_bar"),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }
}
