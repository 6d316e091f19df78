//! Stored binding descriptors and the ordered binding registry.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ServiceError;
use crate::lifetime::Lifetime;
use crate::parameter::Parameter;
use crate::provider::Injection;
use crate::traits::EventListener;
use crate::value::Value;

// Type-erased Arc for storage
pub(crate) type AnyArc = Arc<dyn Any + Send + Sync>;

/// Deferred construction: receives the populated injection context.
pub(crate) type Ctor = Arc<dyn Fn(&Injection) -> Result<AnyArc, ServiceError> + Send + Sync>;

/// Views a constructed instance as an event listener.
pub(crate) type ListenerCast = Arc<dyn Fn(&AnyArc) -> Option<Arc<dyn EventListener>> + Send + Sync>;

/// A named dependency, optionally injected under a different name.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::Dependency;
///
/// let plain: Dependency = "clock".into();
/// assert_eq!(plain.service(), "clock");
/// assert_eq!(plain.alias(), "clock");
///
/// let renamed = Dependency::aliased("clock", "time_source");
/// assert_eq!(renamed.service(), "clock");
/// assert_eq!(renamed.alias(), "time_source");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dependency {
    service: String,
    alias: String,
}

impl Dependency {
    pub fn new(service: impl Into<String>) -> Self {
        let service = service.into();
        Self { alias: service.clone(), service }
    }

    /// Resolves `service` but hands it to the dependent under `alias`.
    pub fn aliased(service: impl Into<String>, alias: impl Into<String>) -> Self {
        Self { service: service.into(), alias: alias.into() }
    }

    /// Registered name of the dependency.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Name the dependent looks it up by.
    pub fn alias(&self) -> &str {
        &self.alias
    }
}

impl From<&str> for Dependency {
    fn from(service: &str) -> Self {
        Dependency::new(service)
    }
}

impl From<String> for Dependency {
    fn from(service: String) -> Self {
        Dependency::new(service)
    }
}

/// Identity of the factory behind a binding, used to select bindings for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct FactoryId(pub(crate) TypeId);

/// Service binding: how to build and wire a named service
#[derive(Clone)]
pub(crate) struct Binding {
    pub(crate) name: String,
    pub(crate) ctor: Ctor,
    pub(crate) factory: FactoryId,
    /// `type_name` of the produced service, absent for service functions
    pub(crate) type_name: Option<&'static str>,
    pub(crate) display_name: Option<String>,
    pub(crate) requires: Vec<Dependency>,
    pub(crate) parameters: Vec<Parameter>,
    pub(crate) lifetime: Lifetime,
    pub(crate) event_source: Vec<String>,
    pub(crate) event_listener: Vec<String>,
    pub(crate) event_awakener: Vec<String>,
    pub(crate) bound_parameters: Option<HashMap<String, Value>>,
    pub(crate) as_listener: Option<ListenerCast>,
}

impl Binding {
    pub(crate) fn new(name: String, ctor: Ctor, factory: FactoryId, type_name: Option<&'static str>) -> Self {
        Self {
            name,
            ctor,
            factory,
            type_name,
            display_name: None,
            requires: Vec::new(),
            parameters: Vec::new(),
            lifetime: Lifetime::Transient,
            event_source: Vec::new(),
            event_listener: Vec::new(),
            event_awakener: Vec::new(),
            bound_parameters: None,
            as_listener: None,
        }
    }

    /// Label used in diagnostics and trace output, never for resolution.
    ///
    /// Prefers an explicit display name, then the unqualified service type
    /// name, then the binding name.
    pub(crate) fn friendly_name(&self) -> String {
        if let Some(name) = self.display_name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.to_string();
        }

        match self.type_name.map(short_type_name) {
            Some(short) if !short.trim().is_empty() => short.to_string(),
            _ => self.name.clone(),
        }
    }

    pub(crate) fn listens_for(&self, event: &str) -> bool {
        self.event_listener.iter().any(|e| e == event)
    }

    pub(crate) fn awakens_on(&self, event: &str) -> bool {
        self.event_awakener.iter().any(|e| e == event) && self.listens_for(event)
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("requires", &self.requires)
            .field("parameters", &self.parameters)
            .field("lifetime", &self.lifetime)
            .field("event_source", &self.event_source)
            .field("event_listener", &self.event_listener)
            .field("event_awakener", &self.event_awakener)
            .finish_non_exhaustive()
    }
}

/// `my_crate::module::Service<T>` becomes `Service`.
fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Binding registry holding all registrations in registration order
///
/// Re-registering a name replaces the binding in place, keeping its original
/// position.
#[derive(Default)]
pub(crate) struct Registry {
    order: Vec<String>,
    bindings: HashMap<String, Arc<Binding>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Inserts a binding; last write wins
    pub(crate) fn insert(&mut self, binding: Binding) {
        let name = binding.name.clone();
        if self.bindings.insert(name.clone(), Arc::new(binding)).is_none() {
            self.order.push(name);
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<Arc<Binding>> {
        self.bindings.get(name).cloned()
    }

    pub(crate) fn contains_key(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Mutates a stored binding in place, cloning it first if a resolution
    /// still holds the previous version.
    pub(crate) fn update<R>(&mut self, name: &str, f: impl FnOnce(&mut Binding) -> R) -> Option<R> {
        self.bindings.get_mut(name).map(|binding| f(Arc::make_mut(binding)))
    }

    /// Iterator over all bindings in registration order
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Arc<Binding>> {
        self.order.iter().filter_map(move |name| self.bindings.get(name))
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }
}
