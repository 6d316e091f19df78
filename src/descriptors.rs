//! Binding descriptors for introspection and diagnostics.

use crate::lifetime::Lifetime;
use crate::registration::{Binding, Dependency};

/// Snapshot of a registered binding
///
/// Contains what the container knows about a binding: its dependencies,
/// parameters, lifetime and event wiring. Used by graph export and for
/// startup checks.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{Container, EventListener, Lifetime, ServiceError, Value};
///
/// struct Mailer;
///
/// impl EventListener for Mailer {
///     fn on_event(&self, _event: &str, _args: &[Value]) -> Result<(), ServiceError> {
///         Ok(())
///     }
/// }
///
/// let container = Container::new();
/// container.register("mailer").unwrap()
///     .with_constructor(|_| Ok(Mailer))
///     .with_dependencies(["smtp"])
///     .as_singleton()
///     .created_on_events(["UserCreated"]);
///
/// let mailer = container.binding("mailer").unwrap();
/// assert_eq!(mailer.friendly_name, "Mailer");
/// assert_eq!(mailer.lifetime, Lifetime::Singleton);
/// assert!(mailer.depends_on("smtp"));
/// assert!(mailer.is_listener());
/// assert!(!mailer.configured);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BindingDescriptor {
    /// Registered name
    pub name: String,
    /// Display name, else short type name, else the registered name
    pub friendly_name: String,
    /// Full type name of the service; `None` for service functions
    pub type_name: Option<String>,
    pub lifetime: Lifetime,
    /// Dependencies in declaration order
    pub requires: Vec<Dependency>,
    /// Parameter names in positional order
    pub parameters: Vec<String>,
    pub event_source: Vec<String>,
    pub event_listener: Vec<String>,
    pub event_awakener: Vec<String>,
    /// Whether parameter values were bound with `Container::configure`
    pub configured: bool,
    /// Whether method tracing is on for this binding's factory
    pub traced: bool,
}

impl BindingDescriptor {
    pub(crate) fn describe(binding: &Binding, traced: bool) -> Self {
        Self {
            name: binding.name.clone(),
            friendly_name: binding.friendly_name(),
            type_name: binding.type_name.map(str::to_string),
            lifetime: binding.lifetime,
            requires: binding.requires.clone(),
            parameters: binding.parameters.iter().map(|p| p.name().to_string()).collect(),
            event_source: binding.event_source.clone(),
            event_listener: binding.event_listener.clone(),
            event_awakener: binding.event_awakener.clone(),
            configured: binding.bound_parameters.is_some(),
            traced,
        }
    }

    /// Whether `service` is among the declared dependencies.
    pub fn depends_on(&self, service: &str) -> bool {
        self.requires.iter().any(|d| d.service() == service)
    }

    pub fn is_listener(&self) -> bool {
        !self.event_listener.is_empty()
    }

    pub fn is_singleton(&self) -> bool {
        self.lifetime.is_singleton()
    }
}
