//! Event listener trait.

use crate::error::ServiceError;
use crate::value::Value;

/// A service that reacts to events dispatched through the container.
///
/// Bindings declare the events they handle with `receiving_events` (and
/// `created_on_events`); the builder only offers those methods when the
/// service type implements this trait, so a binding can never listen for an
/// event it has no handler for.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{Container, EventListener, Resolver, ServiceError, Value};
/// use std::sync::Mutex;
///
/// #[derive(Default)]
/// struct Audit {
///     seen: Mutex<Vec<String>>,
/// }
///
/// impl EventListener for Audit {
///     fn on_event(&self, event: &str, args: &[Value]) -> Result<(), ServiceError> {
///         self.seen.lock().unwrap().push(format!("{}{:?}", event, args));
///         Ok(())
///     }
/// }
///
/// let container = Container::new();
/// container.register("audit").unwrap()
///     .with_constructor(|_| Ok(Audit::default()))
///     .receiving_events(["Saved"]);
///
/// let audit = container.resolve::<Audit>("audit", &[]).unwrap();
/// container.dispatch("Saved", &[Value::from(1)]).unwrap();
/// assert_eq!(audit.seen.lock().unwrap().len(), 1);
/// ```
pub trait EventListener: Send + Sync {
    /// Handles `event` with the arguments the sender passed (possibly none).
    fn on_event(&self, event: &str, args: &[Value]) -> Result<(), ServiceError>;

    /// Whether this listener still wants notifications.
    ///
    /// `Container::cleanup_listeners` evicts listeners that return `false`.
    fn is_alive(&self) -> bool {
        true
    }
}
