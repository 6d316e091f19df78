//! Injection context handed to factories.
//!
//! Construction is two-phase: the container first resolves parameters,
//! dependencies and notifiers into an [`Injection`], then calls the factory
//! with it. Factories never observe a partially wired context.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{DiError, DiResult, ServiceError};
use crate::provider::events::Notifier;
use crate::registration::AnyArc;
use crate::trace::MethodTracer;
use crate::traits::downcast_service;
use crate::value::Value;

/// Context passed to factory functions.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{Container, Resolver, Value};
/// use std::sync::Arc;
///
/// struct Store;
/// struct Cache {
///     store: Arc<Store>,
///     level: String,
/// }
///
/// let container = Container::new();
/// container.register("store").unwrap().with_constructor(|_| Ok(Store));
/// container.register("cache").unwrap()
///     .with_constructor(|ctx| {
///         Ok(Cache {
///             store: ctx.get::<Store>("store")?,
///             level: ctx.param_str("level").unwrap_or("none").to_string(),
///         })
///     })
///     .with_dependencies(["store"])
///     .with_parameters(["level"]);
///
/// let cache = container.resolve::<Cache>("cache", &[Value::from("abc")]).unwrap();
/// assert_eq!(cache.level, "abc");
/// ```
#[derive(Clone)]
pub struct Injection {
    service: Arc<str>,
    dependencies: Arc<HashMap<String, AnyArc>>,
    parameters: Arc<HashMap<String, Value>>,
    notifiers: Arc<HashMap<String, Notifier>>,
    tracer: MethodTracer,
}

impl Injection {
    pub(crate) fn new(
        service: &str,
        dependencies: HashMap<String, AnyArc>,
        parameters: HashMap<String, Value>,
        notifiers: HashMap<String, Notifier>,
        tracer: MethodTracer,
    ) -> Self {
        Self {
            service: Arc::from(service),
            dependencies: Arc::new(dependencies),
            parameters: Arc::new(parameters),
            notifiers: Arc::new(notifiers),
            tracer,
        }
    }

    /// Registered name of the service being built.
    pub fn service_name(&self) -> &str {
        &self.service
    }

    /// A declared dependency, by name (or alias).
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> DiResult<Arc<T>> {
        let any = self.dependency(name)?;
        downcast_service(name, any)
    }

    /// A declared dependency registered as `Arc<T>` for an unsized `T`.
    pub fn get_trait<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> DiResult<Arc<T>> {
        let any = self.dependency(name)?;
        any.downcast::<Arc<T>>()
            .map(|boxed| (*boxed).clone())
            .map_err(|_| DiError::TypeMismatch {
                service: name.to_string(),
                expected: std::any::type_name::<Arc<T>>(),
            })
    }

    fn dependency(&self, name: &str) -> DiResult<AnyArc> {
        self.dependencies
            .get(name)
            .cloned()
            .ok_or_else(|| DiError::UndeclaredDependency {
                service: self.service.to_string(),
                dependency: name.to_string(),
            })
    }

    pub fn has_dependency(&self, name: &str) -> bool {
        self.dependencies.contains_key(name)
    }

    /// A parameter value; `None` when it was neither supplied nor defaulted.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.param(name).and_then(Value::as_str)
    }

    pub fn param_i64(&self, name: &str) -> Option<i64> {
        self.param(name).and_then(Value::as_i64)
    }

    pub fn parameters(&self) -> &HashMap<String, Value> {
        &self.parameters
    }

    /// The notifier for an event this service declared with `sending_events`.
    pub fn notifier(&self, event: &str) -> DiResult<Notifier> {
        self.notifiers
            .get(event)
            .cloned()
            .ok_or_else(|| DiError::UndeclaredEvent {
                service: self.service.to_string(),
                event: event.to_string(),
            })
    }

    /// Tracer bound to this service's factory.
    pub fn tracer(&self) -> MethodTracer {
        self.tracer.clone()
    }
}

impl fmt::Debug for Injection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dependencies: Vec<_> = self.dependencies.keys().collect();
        dependencies.sort();
        let mut events: Vec<_> = self.notifiers.keys().collect();
        events.sort();
        f.debug_struct("Injection")
            .field("service", &self.service)
            .field("dependencies", &dependencies)
            .field("parameters", &self.parameters)
            .field("events", &events)
            .finish()
    }
}

pub(crate) type FnBody = Arc<dyn Fn(&Injection, &[Value]) -> Result<Value, ServiceError> + Send + Sync>;

/// A service function with its dependencies already injected.
///
/// Registered with `BindingStart::with_function`; every resolution produces a
/// fresh injection (or the cached one, for singletons) while the body stays
/// the same.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{Container, Resolver, ServiceFn, Value};
///
/// struct Rate(i64);
///
/// let container = Container::new();
/// container.register("rate").unwrap().with_constructor(|_| Ok(Rate(3)));
/// container.register("price").unwrap()
///     .with_function(|ctx, args| {
///         let rate = ctx.get::<Rate>("rate")?;
///         let qty = args.first().and_then(Value::as_i64).unwrap_or(0);
///         Ok(Value::from(rate.0 * qty))
///     })
///     .with_dependencies(["rate"]);
///
/// let price = container.resolve::<ServiceFn>("price", &[]).unwrap();
/// assert_eq!(price.call(&[Value::from(4)]).unwrap(), Value::from(12));
/// ```
pub struct ServiceFn {
    injection: Injection,
    body: FnBody,
}

impl ServiceFn {
    pub(crate) fn new(injection: Injection, body: FnBody) -> Self {
        Self { injection, body }
    }

    /// Invokes the function; traced as `<name>.call` when tracing is on.
    pub fn call(&self, args: &[Value]) -> Result<Value, ServiceError> {
        self.injection
            .tracer
            .call("call", || (self.body)(&self.injection, args))
    }

    pub fn injection(&self) -> &Injection {
        &self.injection
    }
}

impl fmt::Debug for ServiceFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceFn")
            .field("service", &self.injection.service)
            .finish_non_exhaustive()
    }
}
