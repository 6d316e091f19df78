//! Container-mediated event bus.
//!
//! Services declare the events they send (`sending_events`), receive
//! (`receiving_events`) and are created on (`created_on_events`). Senders get a
//! [`Notifier`] per declared event; receivers are enlisted in the listener
//! table when they are constructed.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use crate::error::{DiError, DiResult};
use crate::provider::{Container, ContainerInner};
use crate::trace::MethodTracer;
use crate::traits::EventListener;
use crate::value::Value;

/// Handle a service uses to raise one event.
///
/// Holds the container weakly: notifying after the container is gone does
/// nothing.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{Container, Notifier, Resolver, Value};
///
/// struct Clock {
///     tick: Notifier,
/// }
///
/// let container = Container::new();
/// container.register("clock").unwrap()
///     .with_constructor(|ctx| Ok(Clock { tick: ctx.notifier("Tick")? }))
///     .sending_events(["Tick"]);
///
/// let clock = container.resolve::<Clock>("clock", &[]).unwrap();
/// assert_eq!(clock.tick.event(), "Tick");
/// clock.tick.notify(&[Value::from(1)]).unwrap();
///
/// drop(container);
/// assert!(!clock.tick.is_connected());
/// assert!(clock.tick.notify(&[]).is_ok());
/// ```
#[derive(Clone)]
pub struct Notifier {
    event: Arc<str>,
    route: Route,
}

#[derive(Clone)]
enum Route {
    Bus(Weak<ContainerInner>),
    /// Every call fails, naming the service that raised the event.
    Reject(Arc<str>),
}

impl Notifier {
    pub(crate) fn new(event: &str, bus: Weak<ContainerInner>) -> Self {
        Self { event: Arc::from(event), route: Route::Bus(bus) }
    }

    /// A notifier bound to no container, for building services by hand in tests.
    pub fn detached(event: impl AsRef<str>) -> Self {
        Self::new(event.as_ref(), Weak::new())
    }

    /// A notifier whose every call fails with [`DiError::UnexpectedNotification`].
    ///
    /// `service` is the friendly name reported in the error.
    pub fn rejecting(event: impl AsRef<str>, service: impl AsRef<str>) -> Self {
        Self {
            event: Arc::from(event.as_ref()),
            route: Route::Reject(Arc::from(service.as_ref())),
        }
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn is_connected(&self) -> bool {
        match &self.route {
            Route::Bus(bus) => bus.strong_count() > 0,
            Route::Reject(_) => false,
        }
    }

    /// Dispatches the event with `args` on the owning container.
    pub fn notify(&self, args: &[Value]) -> DiResult<()> {
        match &self.route {
            Route::Bus(bus) => match bus.upgrade() {
                Some(inner) => Container::from_inner(inner).dispatch(&self.event, args),
                None => Ok(()),
            },
            Route::Reject(service) => Err(DiError::UnexpectedNotification {
                service: service.to_string(),
                event: self.event.to_string(),
                count: args.len(),
            }),
        }
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("event", &self.event)
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[derive(Clone)]
pub(crate) struct ListenerEntry {
    pub(crate) binding: String,
    pub(crate) listener: Arc<dyn EventListener>,
    pub(crate) tracer: MethodTracer,
}

/// Event name to listening instances, in enlistment order.
#[derive(Default)]
pub(crate) struct ListenerTable {
    by_event: HashMap<String, Vec<ListenerEntry>>,
}

impl ListenerTable {
    /// Adds one instance under each of `events`, once per event.
    pub(crate) fn enlist_pending(&mut self, pending: PendingListener) {
        self.enlist(&pending.binding, &pending.events, pending.listener, pending.tracer);
    }

    pub(crate) fn enlist(
        &mut self,
        binding: &str,
        events: &[String],
        listener: Arc<dyn EventListener>,
        tracer: MethodTracer,
    ) {
        for (i, event) in events.iter().enumerate() {
            if events[..i].contains(event) {
                continue;
            }
            self.by_event.entry(event.clone()).or_default().push(ListenerEntry {
                binding: binding.to_string(),
                listener: listener.clone(),
                tracer: tracer.clone(),
            });
        }
    }

    pub(crate) fn snapshot(&self, event: &str) -> Vec<ListenerEntry> {
        self.by_event.get(event).cloned().unwrap_or_default()
    }

    /// Whether an instance of `binding` is already listening for `event`.
    pub(crate) fn has_binding(&self, event: &str, binding: &str) -> bool {
        self.by_event
            .get(event)
            .is_some_and(|entries| entries.iter().any(|e| e.binding == binding))
    }

    /// Drops entries whose listener reports itself dead; returns how many.
    pub(crate) fn retain_alive(&mut self) -> usize {
        let mut removed = 0;
        self.by_event.retain(|_, entries| {
            let before = entries.len();
            entries.retain(|e| e.listener.is_alive());
            removed += before - entries.len();
            !entries.is_empty()
        });
        removed
    }

    pub(crate) fn count(&self, event: &str) -> usize {
        self.by_event.get(event).map_or(0, Vec::len)
    }
}

/// A listener built during a construction that has not finished yet.
pub(crate) struct PendingListener {
    pub(crate) binding: String,
    pub(crate) events: Vec<String>,
    pub(crate) listener: Arc<dyn EventListener>,
    pub(crate) tracer: MethodTracer,
}

struct PendingFrame {
    container: usize,
    root: bool,
    listeners: Vec<PendingListener>,
}

// One frame per construction (or dispatch) in flight on this thread.
thread_local! {
    static PENDING: RefCell<Vec<PendingFrame>> = const { RefCell::new(Vec::new()) };
}

/// Holds back listeners built while one construction runs on this thread.
///
/// A listener only joins the table once something owns it: the outermost
/// resolution, a cached singleton, or a dispatch that awakened it. Dropping
/// the scope without [`close`](Self::close) discards what it collected, so a
/// failed construction leaves no listener behind.
pub(crate) struct PendingScope {
    container: usize,
    open: bool,
}

impl PendingScope {
    pub(crate) fn open(container: usize) -> Self {
        Self::push(container, false)
    }

    /// A boundary: constructions directly inside it commit their listeners.
    pub(crate) fn root(container: usize) -> Self {
        Self::push(container, true)
    }

    fn push(container: usize, root: bool) -> Self {
        PENDING.with(|frames| {
            frames.borrow_mut().push(PendingFrame { container, root, listeners: Vec::new() });
        });
        Self { container, open: true }
    }

    /// Ends a successful construction.
    ///
    /// Returns the listeners ready for the table, or nothing when they were
    /// handed to the enclosing construction of the same container.
    pub(crate) fn close(mut self, own: Option<PendingListener>, owned: bool) -> Vec<PendingListener> {
        self.open = false;
        PENDING.with(|frames| {
            let mut frames = frames.borrow_mut();
            let mut listeners = frames.pop().map(|frame| frame.listeners).unwrap_or_default();
            listeners.extend(own);
            if owned {
                return listeners;
            }
            match frames.iter_mut().rev().find(|frame| frame.container == self.container) {
                Some(parent) if !parent.root => {
                    parent.listeners.append(&mut listeners);
                    Vec::new()
                }
                _ => listeners,
            }
        })
    }
}

impl Drop for PendingScope {
    fn drop(&mut self) {
        if self.open {
            PENDING.with(|frames| {
                let discarded = frames.borrow_mut().pop();
                debug_assert!(discarded.is_some_and(|frame| frame.container == self.container));
            });
        }
    }
}

impl Container {
    /// Dispatches `event` to every listening instance.
    ///
    /// Bindings created on `event` are resolved first, in registration order,
    /// unless an instance already exists (cached singleton, or an instance of
    /// that binding already enlisted for the event). Listeners then run in
    /// enlistment order over a snapshot of the table, so handlers may
    /// resolve services or dispatch further events. The first handler error
    /// stops delivery and is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_ioc::{Container, EventListener, ServiceError, Value};
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    ///
    /// #[derive(Default)]
    /// struct Counter(AtomicUsize);
    ///
    /// impl EventListener for Counter {
    ///     fn on_event(&self, _event: &str, _args: &[Value]) -> Result<(), ServiceError> {
    ///         self.0.fetch_add(1, Ordering::SeqCst);
    ///         Ok(())
    ///     }
    /// }
    ///
    /// let container = Container::new();
    /// container.register("counter").unwrap()
    ///     .with_constructor(|_| Ok(Counter::default()))
    ///     .as_singleton()
    ///     .created_on_events(["Start"]);
    ///
    /// container.dispatch("Start", &[]).unwrap();
    /// container.dispatch("Start", &[]).unwrap();
    /// assert_eq!(container.listener_count("Start"), 1);
    /// ```
    pub fn dispatch(&self, event: &str, args: &[Value]) -> DiResult<()> {
        let _root = PendingScope::root(self.inner.id);
        let sleepers: Vec<String> = self
            .inner
            .bindings
            .read()
            .iter()
            .filter(|binding| binding.awakens_on(event))
            .map(|binding| binding.name.clone())
            .collect();

        for name in sleepers {
            if self.is_awake(&name, event) {
                continue;
            }
            tracing::trace!(event, service = %name, "creating listener on event");
            self.resolve_any(&name, &[])?;
        }

        let entries = self.inner.listeners.lock().snapshot(event);
        tracing::trace!(event, listeners = entries.len(), "dispatching");

        let method = format!("On{}", event);
        for entry in &entries {
            entry
                .tracer
                .call(&method, || entry.listener.on_event(event, args))
                .map_err(|error| DiError::from_listener(event, &entry.binding, error))?;
        }

        self.inner.observers.dispatched(event, entries.len());
        Ok(())
    }

    fn is_awake(&self, name: &str, event: &str) -> bool {
        if self.inner.singletons.lock().contains_key(name) {
            return true;
        }
        self.inner.listeners.lock().has_binding(event, name)
    }

    /// Removes listeners whose [`EventListener::is_alive`] returns false.
    ///
    /// Returns the number of table entries removed.
    pub fn cleanup_listeners(&self) -> usize {
        let removed = self.inner.listeners.lock().retain_alive();
        if removed > 0 {
            tracing::debug!(removed, "removed dead listeners");
        }
        removed
    }

    /// Number of instances currently listening for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.inner.listeners.lock().count(event)
    }
}
