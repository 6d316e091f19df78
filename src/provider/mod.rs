//! The container: registration entry points, resolution and configuration.
//!
//! Dispatch and listener maintenance live in [`events`].

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::{Mutex, RwLock};

use crate::builder::BindingStart;
use crate::config::ContainerOptions;
use crate::descriptors::BindingDescriptor;
use crate::error::{DiError, DiResult, Operation};
use crate::internal::StackGuard;
use crate::observer::Observers;
use crate::registration::{AnyArc, Binding, Dependency, FactoryId, Registry};
use crate::trace::{MethodTracer, Tracing};
use crate::traits::ResolverCore;
use crate::value::Value;

pub mod context;
pub mod events;

pub use context::{Injection, ServiceFn};
pub use events::Notifier;

use events::{ListenerTable, PendingListener, PendingScope};

static NEXT_CONTAINER_ID: AtomicUsize = AtomicUsize::new(1);

/// Identity used to key the per-thread resolution stack.
pub(crate) fn next_container_id() -> usize {
    NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed)
}

/// Name-keyed inversion-of-control container.
///
/// Cloning is cheap and every clone shares the same registrations, singleton
/// cache and listener table. All operations take `&self` and are safe to call
/// from several threads.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{Container, Resolver, Value};
/// use std::sync::Arc;
///
/// struct Settings {
///     url: String,
/// }
///
/// struct Repository {
///     settings: Arc<Settings>,
///     table: String,
/// }
///
/// let container = Container::new();
/// container.register("settings").unwrap()
///     .with_constructor(|_| Ok(Settings { url: "postgres://localhost".into() }))
///     .as_singleton();
/// container.register("repository").unwrap()
///     .with_constructor(|ctx| {
///         Ok(Repository {
///             settings: ctx.get::<Settings>("settings")?,
///             table: ctx.param_str("table").unwrap_or("users").to_string(),
///         })
///     })
///     .with_dependencies(["settings"])
///     .with_parameters(["table"]);
///
/// let repo = container.resolve::<Repository>("repository", &[Value::from("orders")]).unwrap();
/// assert_eq!(repo.settings.url, "postgres://localhost");
/// assert_eq!(repo.table, "orders");
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

pub(crate) struct ContainerInner {
    pub(crate) id: usize,
    pub(crate) max_depth: usize,
    pub(crate) bindings: RwLock<Registry>,
    pub(crate) singletons: Mutex<HashMap<String, AnyArc>>,
    init_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    pub(crate) listeners: Mutex<ListenerTable>,
    pub(crate) tracing: Tracing,
    pub(crate) observers: Observers,
}

impl ContainerInner {
    fn cached(&self, name: &str) -> Option<AnyArc> {
        self.singletons.lock().get(name).cloned()
    }

    pub(crate) fn binding(&self, name: &str, operation: Operation) -> DiResult<Arc<Binding>> {
        self.bindings
            .read()
            .get(name)
            .ok_or_else(|| DiError::not_found(operation, name))
    }

    fn init_lock(&self, name: &str) -> Arc<Mutex<()>> {
        self.init_locks.lock().entry(name.to_string()).or_default().clone()
    }

    fn as_pending(&self, binding: &Binding, instance: &AnyArc, tracer: MethodTracer) -> Option<PendingListener> {
        if binding.event_listener.is_empty() {
            return None;
        }
        let listener = (binding.as_listener.as_ref()?)(instance)?;
        Some(PendingListener {
            binding: binding.name.clone(),
            events: binding.event_listener.clone(),
            listener,
            tracer,
        })
    }

    fn enlist(&self, ready: Vec<PendingListener>) {
        if ready.is_empty() {
            return;
        }
        let mut table = self.listeners.lock();
        for pending in ready {
            table.enlist_pending(pending);
        }
    }
}

impl Container {
    pub fn new() -> Self {
        Self::with_options(ContainerOptions::default())
    }

    pub fn with_options(options: ContainerOptions) -> Self {
        let inner = ContainerInner {
            id: next_container_id(),
            max_depth: options.max_depth,
            bindings: RwLock::new(Registry::new()),
            singletons: Mutex::new(HashMap::new()),
            init_locks: Mutex::new(HashMap::new()),
            listeners: Mutex::new(ListenerTable::default()),
            tracing: Tracing::new(options.trace_sink),
            observers: options.observers,
        };
        Self { inner: Arc::new(inner) }
    }

    pub(crate) fn from_inner(inner: Arc<ContainerInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<ContainerInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn inner(&self) -> &ContainerInner {
        &self.inner
    }

    /// Starts a binding for `name`.
    ///
    /// Registering a name again replaces the earlier binding.
    pub fn register(&self, name: impl Into<String>) -> DiResult<BindingStart<'_>> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DiError::Registration(
                "Register must be called with a non-empty service name".to_string(),
            ));
        }
        Ok(BindingStart::new(self, name))
    }

    /// Stores a ready-made instance under `name`.
    ///
    /// The instance is served as a singleton and takes precedence over any
    /// binding of the same name.
    pub fn register_instance<T: Any + Send + Sync>(&self, name: impl Into<String>, instance: Arc<T>) {
        let name = name.into();
        tracing::debug!(service = %name, "registered instance");
        self.inner.singletons.lock().insert(name, instance as AnyArc);
    }

    pub(crate) fn insert_binding(&self, binding: Binding) {
        tracing::debug!(service = %binding.name, "registered binding");
        self.inner.bindings.write().insert(binding);
    }

    pub(crate) fn update_binding<R>(&self, name: &str, f: impl FnOnce(&mut Binding) -> R) -> Option<R> {
        self.inner.bindings.write().update(name, f)
    }

    /// Resolves `name`, passing `args` as positional parameter values.
    ///
    /// Singletons are built once; concurrent first resolutions of the same
    /// singleton wait for a single construction. A failed construction caches
    /// nothing.
    pub fn resolve_any(&self, name: &str, args: &[Value]) -> DiResult<AnyArc> {
        if let Some(instance) = self.inner.cached(name) {
            return Ok(instance);
        }

        let binding = self.inner.binding(name, Operation::Load)?;
        let _guard = StackGuard::enter(self.inner.id, name, self.inner.max_depth)?;

        if !binding.lifetime.is_singleton() {
            return self.create(&binding, args);
        }

        let init = self.inner.init_lock(name);
        let _init = init.lock();
        if let Some(instance) = self.inner.cached(name) {
            return Ok(instance);
        }

        let instance = self.create(&binding, args)?;
        self.inner
            .singletons
            .lock()
            .insert(name.to_string(), instance.clone());
        Ok(instance)
    }

    fn create(&self, binding: &Binding, args: &[Value]) -> DiResult<AnyArc> {
        let observers = &self.inner.observers;
        let start = Instant::now();
        if observers.has_observers() {
            observers.resolving(&binding.name);
        }

        let dependencies = |dependency: &Dependency| self.resolve_any(dependency.service(), &[]);
        let tracer = self.inner.tracing.decorate(binding);
        let scope = PendingScope::open(self.inner.id);
        let bus = self.downgrade();
        let notifier = |event: &str| Notifier::new(event, bus.clone());
        let result = assemble(binding, args, &dependencies, &notifier, tracer);

        match result {
            Ok((instance, injection)) => {
                let own = self.inner.as_pending(binding, &instance, injection.tracer());
                // a cached singleton owns everything built for it
                let ready = scope.close(own, binding.lifetime.is_singleton());
                self.inner.enlist(ready);
                observers.resolved(&binding.name, start.elapsed());
                Ok(instance)
            }
            Err(error) => {
                observers.failed(&binding.name, &error);
                Err(error)
            }
        }
    }

    /// Validates `values` against the parameters of `name` and binds them.
    ///
    /// Later resolutions of `name` use the bound values and ignore the
    /// arguments they are given. Configuring again replaces the bound values.
    pub fn configure(&self, name: &str, values: &[Value]) -> DiResult<()> {
        let binding = self.inner.binding(name, Operation::Configure)?;
        let bound = collect_parameters(&binding, values)?;
        self.update_binding(name, |binding| binding.bound_parameters = Some(bound))
            .ok_or_else(|| DiError::not_found(Operation::Configure, name))?;
        tracing::debug!(service = name, "configured");
        Ok(())
    }

    /// Turns on method tracing for every binding whose service type is `T`.
    ///
    /// Applies to instances built before and after the call.
    pub fn trace<T: Any>(&self) {
        tracing::debug!(service = std::any::type_name::<T>(), "tracing enabled");
        self.inner.tracing.enable(FactoryId(TypeId::of::<T>()));
    }

    /// Turns on method tracing for the factory behind the binding `name`.
    pub fn trace_service(&self, name: &str) -> DiResult<()> {
        let binding = self.inner.binding(name, Operation::Trace)?;
        tracing::debug!(service = name, "tracing enabled");
        self.inner.tracing.enable(binding.factory);
        Ok(())
    }

    /// Whether `name` has a binding or a stored instance.
    pub fn is_registered(&self, name: &str) -> bool {
        self.inner.bindings.read().contains_key(name) || self.inner.singletons.lock().contains_key(name)
    }

    /// Describes the binding registered under `name`.
    pub fn binding(&self, name: &str) -> Option<BindingDescriptor> {
        let binding = self.inner.bindings.read().get(name)?;
        let traced = self.inner.tracing.is_enabled(binding.factory);
        Some(BindingDescriptor::describe(&binding, traced))
    }

    /// Describes every binding, in registration order.
    pub fn bindings(&self) -> Vec<BindingDescriptor> {
        let registry = self.inner.bindings.read();
        registry
            .iter()
            .map(|binding| BindingDescriptor::describe(binding, self.inner.tracing.is_enabled(binding.factory)))
            .collect()
    }

    /// Names holding a cached singleton or registered instance, sorted.
    pub fn instance_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.singletons.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether `name` was registered with `register_instance` or
    /// `with_instance` rather than a binding.
    pub(crate) fn is_plain_instance(&self, name: &str) -> bool {
        !self.inner.bindings.read().contains_key(name) && self.inner.singletons.lock().contains_key(name)
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.inner.id)
            .field("bindings", &self.inner.bindings.read().len())
            .field("instances", &self.inner.singletons.lock().len())
            .finish()
    }
}

impl ResolverCore for Container {
    fn resolve_any(&self, name: &str, args: &[Value]) -> DiResult<AnyArc> {
        Container::resolve_any(self, name, args)
    }
}

/// Builds one instance of `binding`: parameters, then dependencies, then
/// notifiers, then the factory call.
///
/// Shared by the container and the test container, which supply their own
/// dependency source and notifiers.
pub(crate) fn assemble(
    binding: &Binding,
    args: &[Value],
    dependencies: &dyn Fn(&Dependency) -> DiResult<AnyArc>,
    notifier: &dyn Fn(&str) -> Notifier,
    tracer: MethodTracer,
) -> DiResult<(AnyArc, Injection)> {
    let parameters = match &binding.bound_parameters {
        Some(bound) => bound.clone(),
        None => collect_parameters(binding, args)?,
    };

    let mut resolved = HashMap::with_capacity(binding.requires.len());
    for dependency in &binding.requires {
        resolved.insert(dependency.alias().to_string(), dependencies(dependency)?);
    }

    let notifiers = binding
        .event_source
        .iter()
        .map(|event| (event.clone(), notifier(event)))
        .collect();

    let injection = Injection::new(&binding.name, resolved, parameters, notifiers, tracer);
    let instance = (binding.ctor)(&injection).map_err(|error| DiError::from_factory(&binding.name, error))?;
    Ok((instance, injection))
}

/// Matches positional `values` to the declared parameters of `binding`.
fn collect_parameters(binding: &Binding, values: &[Value]) -> DiResult<HashMap<String, Value>> {
    let mut parameters = HashMap::with_capacity(binding.parameters.len());
    for (index, parameter) in binding.parameters.iter().enumerate() {
        if let Some(value) = parameter.resolve(values.get(index), &binding.name, index)? {
            parameters.insert(parameter.name().to_string(), value);
        }
    }
    Ok(parameters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Resolver;

    struct Widget(i64);

    #[test]
    fn empty_names_are_rejected() {
        let container = Container::new();
        assert!(matches!(container.register("  "), Err(DiError::Registration(_))));
    }

    #[test]
    fn registered_instance_wins_over_binding() {
        let container = Container::new();
        container.register("w").unwrap().with_constructor(|_| Ok(Widget(1)));
        container.register_instance("w", Arc::new(Widget(2)));

        assert_eq!(container.resolve::<Widget>("w", &[]).unwrap().0, 2);
        assert!(container.is_registered("w"));
        assert!(!container.is_plain_instance("w"));
        assert_eq!(container.instance_names(), vec!["w".to_string()]);
    }

    #[test]
    fn containers_get_distinct_ids() {
        let a = Container::new();
        let b = Container::new();
        assert_ne!(a.inner().id, b.inner().id);
        assert_eq!(a.clone().inner().id, a.inner().id);
    }

    #[test]
    fn configure_reports_missing_service() {
        let container = Container::new();
        let err = container.configure("_foo", &[]).unwrap_err();
        assert_eq!(err.to_string(), "Configure was called for undefined service '_foo'.");

        let err = container.trace_service("_foo").unwrap_err();
        assert_eq!(err.to_string(), "Trace was called for undefined service '_foo'.");
    }
}
