//! Fluent registration API.
//!
//! `Container::register(name)` returns a [`BindingStart`], which picks how the
//! service is produced. The resulting [`BindingConfig`] then declares
//! dependencies, parameters, lifetime and events. Every call writes through to
//! the stored binding immediately, so a chain can stop at any point.

use std::any::{type_name, Any, TypeId};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::ServiceError;
use crate::fluent::Fluent;
use crate::lifetime::Lifetime;
use crate::parameter::Parameter;
use crate::provider::context::FnBody;
use crate::provider::{Container, Injection, ServiceFn};
use crate::registration::{AnyArc, Binding, Ctor, Dependency, FactoryId, ListenerCast};
use crate::traits::EventListener;
use crate::value::Value;

/// First step of a registration: choose the factory.
#[must_use = "a registration does nothing until a factory is chosen"]
pub struct BindingStart<'c> {
    container: &'c Container,
    name: String,
}

impl<'c> BindingStart<'c> {
    pub(crate) fn new(container: &'c Container, name: String) -> Self {
        Self { container, name }
    }

    /// Builds the service by calling `factory` with the injection context.
    ///
    /// The service type `T` is the factory identity used by
    /// [`Container::trace`].
    pub fn with_constructor<T, F>(self, factory: F) -> BindingConfig<'c, T>
    where
        T: Any + Send + Sync,
        F: Fn(&Injection) -> Result<T, ServiceError> + Send + Sync + 'static,
    {
        let ctor: Ctor = Arc::new(move |ctx: &Injection| factory(ctx).map(|service| Arc::new(service) as AnyArc));
        let binding = Binding::new(
            self.name.clone(),
            ctor,
            FactoryId(TypeId::of::<T>()),
            Some(type_name::<T>()),
        );
        self.container.insert_binding(binding);
        BindingConfig::new(self.container, self.name)
    }

    /// Registers a function whose dependencies are injected once per
    /// resolution. Resolving the name yields a [`ServiceFn`].
    pub fn with_function<F>(self, body: F) -> BindingConfig<'c, ServiceFn>
    where
        F: Fn(&Injection, &[Value]) -> Result<Value, ServiceError> + Send + Sync + 'static,
    {
        let body: FnBody = Arc::new(body);
        let ctor: Ctor = Arc::new(move |ctx: &Injection| Ok(Arc::new(ServiceFn::new(ctx.clone(), body.clone())) as AnyArc));
        let binding = Binding::new(self.name.clone(), ctor, FactoryId(TypeId::of::<F>()), None);
        self.container.insert_binding(binding);
        BindingConfig::new(self.container, self.name)
    }

    /// Stores `instance` directly; same as [`Container::register_instance`].
    pub fn with_instance<T: Any + Send + Sync>(self, instance: Arc<T>) {
        self.container.register_instance(self.name, instance);
    }
}

/// Configuration of a stored binding producing `T`.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{Container, Dependency, Lifetime, Parameter, Resolver};
///
/// struct Clock;
/// struct Scheduler;
///
/// let container = Container::new();
/// container.register("clock").unwrap().with_constructor(|_| Ok(Clock));
/// container.register("scheduler").unwrap()
///     .with_constructor(|ctx| {
///         ctx.get::<Clock>("time")?;
///         Ok(Scheduler)
///     })
///     .with_dependency(Dependency::aliased("clock", "time"))
///     .with_parameters([Parameter::integer("interval").with_default(30)])
///     .as_singleton()
///     .sending_events(["Tick"])
///     .with_display_name("Scheduler");
///
/// let described = container.binding("scheduler").unwrap();
/// assert_eq!(described.lifetime, Lifetime::Singleton);
/// assert_eq!(described.parameters, vec!["interval".to_string()]);
/// assert!(container.resolve::<Scheduler>("scheduler", &[]).is_ok());
/// ```
pub struct BindingConfig<'c, T> {
    container: &'c Container,
    name: String,
    _service: PhantomData<fn() -> T>,
}

impl<T> Fluent for BindingConfig<'_, T> {}

impl<'c, T> BindingConfig<'c, T> {
    fn new(container: &'c Container, name: String) -> Self {
        Self { container, name, _service: PhantomData }
    }

    fn edit(self, change: impl FnOnce(&mut Binding)) -> Self {
        self.chain(|config| {
            config.container.update_binding(&config.name, change);
        })
    }

    /// Name of the binding being configured.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends dependencies, resolved in order before the factory runs.
    pub fn with_dependencies<I, D>(self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<Dependency>,
    {
        let dependencies: Vec<Dependency> = dependencies.into_iter().map(Into::into).collect();
        self.edit(|binding| binding.requires.extend(dependencies))
    }

    pub fn with_dependency(self, dependency: impl Into<Dependency>) -> Self {
        self.with_dependencies([dependency.into()])
    }

    /// Appends positional parameters.
    pub fn with_parameters<I, P>(self, parameters: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Parameter>,
    {
        let parameters: Vec<Parameter> = parameters.into_iter().map(Into::into).collect();
        self.edit(|binding| binding.parameters.extend(parameters))
    }

    pub fn with_parameter(self, parameter: impl Into<Parameter>) -> Self {
        self.with_parameters([parameter.into()])
    }

    pub fn as_singleton(self) -> Self {
        self.edit(|binding| binding.lifetime = Lifetime::Singleton)
    }

    /// Events this service raises; each gets a [`Notifier`](crate::Notifier)
    /// in the injection context.
    pub fn sending_events<I, S>(self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let events: Vec<String> = events.into_iter().map(Into::into).collect();
        self.edit(|binding| binding.event_source.extend(events))
    }

    /// Label used in trace output and diagnostics instead of the type name.
    pub fn with_display_name(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.edit(|binding| binding.display_name = Some(name))
    }
}

impl<'c, T: EventListener + Any> BindingConfig<'c, T> {
    /// Events this service handles. Instances enlist when they are built.
    pub fn receiving_events<I, S>(self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let events: Vec<String> = events.into_iter().map(Into::into).collect();
        self.edit(|binding| {
            binding.event_listener.extend(events);
            binding.as_listener = Some(listener_cast::<T>());
        })
    }

    /// Events that create an instance when none is listening yet.
    ///
    /// Each event is also added to the received events.
    pub fn created_on_events<I, S>(self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let events: Vec<String> = events.into_iter().map(Into::into).collect();
        self.edit(|binding| {
            for event in events {
                if !binding.listens_for(&event) {
                    binding.event_listener.push(event.clone());
                }
                binding.event_awakener.push(event);
            }
            binding.as_listener = Some(listener_cast::<T>());
        })
    }
}

fn listener_cast<T: EventListener + Any>() -> ListenerCast {
    Arc::new(|instance: &AnyArc| {
        instance
            .clone()
            .downcast::<T>()
            .ok()
            .map(|service| service as Arc<dyn EventListener>)
    })
}
