//! Method-call tracing for resolved services.
//!
//! Tracing is switched on per factory (the service type behind a binding) and
//! applies to every instance built by that factory, including instances that
//! already exist. Each instance receives a [`MethodTracer`] through its
//! injection context; the container also routes listener notifications and
//! [`ServiceFn`](crate::ServiceFn) calls through it.
//!
//! Output shape, two spaces of indentation per traced call already in flight
//! on the same thread:
//!
//! ```text
//! > Orders.place()
//!   > Inventory.reserve()
//!   < Inventory.reserve (0ms)
//! < Orders.place (2ms)
//! ```

use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::registration::{Binding, FactoryId};

/// Destination for trace lines.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{ContainerOptions, TraceSink};
/// use std::sync::{Arc, Mutex};
///
/// #[derive(Default)]
/// struct Collect(Mutex<Vec<String>>);
///
/// impl TraceSink for Collect {
///     fn log(&self, message: &str) {
///         self.0.lock().unwrap().push(message.to_string());
///     }
/// }
///
/// let options = ContainerOptions::new().with_trace_sink(Arc::new(Collect::default()));
/// ```
pub trait TraceSink: Send + Sync {
    fn log(&self, message: &str);
}

/// Default sink: emits each line as a `tracing` debug event on target
/// `ferrous_ioc::trace`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TraceSink for TracingSink {
    fn log(&self, message: &str) {
        tracing::debug!(target: "ferrous_ioc::trace", "{}", message);
    }
}

// Nesting of traced calls in flight on this thread.
thread_local! {
    static TRACE_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// State shared by every tracer of one container.
struct TraceShared {
    sink: Option<Arc<dyn TraceSink>>,
}

impl TraceShared {
    fn log(&self, message: &str) {
        if let Some(sink) = &self.sink {
            sink.log(message);
        }
    }
}

/// Per-container registry of traced factories.
pub(crate) struct Tracing {
    shared: Arc<TraceShared>,
    flags: Mutex<HashMap<FactoryId, Arc<AtomicBool>>>,
}

impl Tracing {
    pub(crate) fn new(sink: Option<Arc<dyn TraceSink>>) -> Self {
        Self {
            shared: Arc::new(TraceShared { sink }),
            flags: Mutex::new(HashMap::new()),
        }
    }

    fn flag(&self, factory: FactoryId) -> Arc<AtomicBool> {
        self.flags
            .lock()
            .entry(factory)
            .or_insert_with(|| Arc::new(AtomicBool::new(false)))
            .clone()
    }

    /// Turns tracing on for every current and future instance of `factory`.
    pub(crate) fn enable(&self, factory: FactoryId) {
        self.flag(factory).store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_enabled(&self, factory: FactoryId) -> bool {
        self.flags
            .lock()
            .get(&factory)
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Builds the tracer handed to a new instance of `binding`.
    pub(crate) fn decorate(&self, binding: &Binding) -> MethodTracer {
        MethodTracer {
            label: Arc::from(binding.friendly_name()),
            state: Some((self.flag(binding.factory), self.shared.clone())),
        }
    }
}

/// Handle a service uses to trace its own methods.
///
/// Calls run untouched while tracing is off for the service's factory.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{Container, MethodTracer, Resolver, ServiceError};
///
/// struct Orders {
///     trace: MethodTracer,
/// }
///
/// impl Orders {
///     fn place(&self, qty: u32) -> Result<u32, ServiceError> {
///         self.trace.call("place", || {
///             if qty == 0 {
///                 return Err("empty order".into());
///             }
///             Ok(qty)
///         })
///     }
/// }
///
/// let container = Container::new();
/// container.register("orders").unwrap()
///     .with_constructor(|ctx| Ok(Orders { trace: ctx.tracer() }));
/// container.trace::<Orders>();
///
/// let orders = container.resolve::<Orders>("orders", &[]).unwrap();
/// assert_eq!(orders.place(2).unwrap(), 2);
/// assert!(orders.place(0).is_err());
/// ```
#[derive(Clone)]
pub struct MethodTracer {
    label: Arc<str>,
    state: Option<(Arc<AtomicBool>, Arc<TraceShared>)>,
}

impl MethodTracer {
    /// A tracer that never logs.
    pub fn disabled() -> Self {
        Self { label: Arc::from(""), state: None }
    }

    /// Friendly name of the traced service.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_active(&self) -> bool {
        self.active().is_some()
    }

    fn active(&self) -> Option<&TraceShared> {
        match &self.state {
            Some((flag, shared)) if flag.load(Ordering::SeqCst) => Some(shared),
            _ => None,
        }
    }

    /// Traces a fallible method. An `Err` (or a panic) is logged as an
    /// exception and returned unchanged.
    pub fn call<R, E>(&self, method: &str, body: impl FnOnce() -> Result<R, E>) -> Result<R, E> {
        let Some(shared) = self.active() else {
            return body();
        };

        let guard = CallGuard::enter(shared, &self.label, method);
        let result = body();
        if result.is_ok() {
            guard.succeed();
        }
        result
    }

    /// Traces an infallible method; only a panic counts as an exception.
    pub fn scope<R>(&self, method: &str, body: impl FnOnce() -> R) -> R {
        let Some(shared) = self.active() else {
            return body();
        };

        let guard = CallGuard::enter(shared, &self.label, method);
        let result = body();
        guard.succeed();
        result
    }
}

impl fmt::Debug for MethodTracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodTracer")
            .field("label", &self.label)
            .field("active", &self.is_active())
            .finish()
    }
}

/// One traced call in flight. Dropping it without `succeed` logs the exit
/// as an exception.
struct CallGuard<'a> {
    shared: &'a TraceShared,
    label: &'a str,
    method: &'a str,
    prefix: String,
    start: Instant,
    finished: bool,
}

impl<'a> CallGuard<'a> {
    fn enter(shared: &'a TraceShared, label: &'a str, method: &'a str) -> Self {
        let depth = TRACE_DEPTH.with(|depth| depth.replace(depth.get() + 1));
        let prefix = "  ".repeat(depth);
        shared.log(&format!("{}> {}.{}()", prefix, label, method));

        Self { shared, label, method, prefix, start: Instant::now(), finished: false }
    }

    fn succeed(mut self) {
        let elapsed = self.start.elapsed().as_millis();
        self.finished = true;
        leave();
        self.shared.log(&format!("{}< {}.{} ({}ms)", self.prefix, self.label, self.method, elapsed));
    }
}

fn leave() {
    TRACE_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            leave();
            self.shared
                .log(&format!("{}<!{}.{} exited on exception!", self.prefix, self.label, self.method));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::TypeId;
    use crate::provider::Injection;
    use crate::registration::{AnyArc, Ctor};

    #[derive(Default)]
    struct Lines(Mutex<Vec<String>>);

    impl TraceSink for Lines {
        fn log(&self, message: &str) {
            self.0.lock().push(message.to_string());
        }
    }

    fn binding(name: &str) -> Binding {
        let ctor: Ctor = Arc::new(|_: &Injection| Ok(Arc::new(()) as AnyArc));
        Binding::new(name.to_string(), ctor, FactoryId(TypeId::of::<u8>()), Some("app::Widget"))
    }

    fn strip_timing(line: &str) -> String {
        match line.find(" (") {
            Some(idx) => line[..idx].to_string(),
            None => line.to_string(),
        }
    }

    #[test]
    fn disabled_tracer_runs_body_silently() {
        let lines = Arc::new(Lines::default());
        let tracing = Tracing::new(Some(lines.clone()));
        let tracer = tracing.decorate(&binding("w"));

        assert_eq!(tracer.scope("run", || 7), 7);
        assert!(lines.0.lock().is_empty());
        assert!(!MethodTracer::disabled().is_active());
    }

    #[test]
    fn enabling_affects_existing_tracers() {
        let lines = Arc::new(Lines::default());
        let tracing = Tracing::new(Some(lines.clone()));
        let b = binding("w");
        let tracer = tracing.decorate(&b);

        tracing.enable(b.factory);
        assert!(tracing.is_enabled(b.factory));

        let outer: Result<(), ()> = tracer.call("outer", || {
            tracer.scope("inner", || ());
            Ok(())
        });
        assert!(outer.is_ok());

        let logged: Vec<String> = lines.0.lock().iter().map(|l| strip_timing(l)).collect();
        assert_eq!(logged, vec![
            "> Widget.outer()",
            "  > Widget.inner()",
            "  < Widget.inner",
            "< Widget.outer",
        ]);
    }

    #[test]
    fn errors_are_logged_and_returned_unchanged() {
        let lines = Arc::new(Lines::default());
        let tracing = Tracing::new(Some(lines.clone()));
        let b = binding("w");
        tracing.enable(b.factory);
        let tracer = tracing.decorate(&b);

        let result: Result<(), &str> = tracer.call("fail", || Err("nope"));
        assert_eq!(result, Err("nope"));
        assert_eq!(lines.0.lock().last().unwrap(), "<!Widget.fail exited on exception!");

        // depth is restored after a failure
        tracer.scope("again", || ());
        assert_eq!(lines.0.lock()[2], "> Widget.again()");
    }

    #[test]
    fn panics_are_logged_before_unwinding() {
        let lines = Arc::new(Lines::default());
        let tracing = Tracing::new(Some(lines.clone()));
        let b = binding("w");
        tracing.enable(b.factory);
        let tracer = tracing.decorate(&b);

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            tracer.scope("explode", || panic!("kaboom"))
        }));
        assert!(outcome.is_err());
        assert_eq!(lines.0.lock().last().unwrap(), "<!Widget.explode exited on exception!");
    }

    #[test]
    fn threads_indent_independently() {
        let lines = Arc::new(Lines::default());
        let tracing = Tracing::new(Some(lines.clone()));
        let b = binding("w");
        tracing.enable(b.factory);
        let tracer = tracing.decorate(&b);
        let inside = std::sync::Barrier::new(2);
        let done = std::sync::Barrier::new(2);

        std::thread::scope(|s| {
            for method in ["one", "two"] {
                let (tracer, inside, done) = (&tracer, &inside, &done);
                s.spawn(move || {
                    tracer.scope(method, || {
                        inside.wait();
                        done.wait();
                    })
                });
            }
        });

        let logged = lines.0.lock();
        assert_eq!(logged.len(), 4);
        assert!(logged.iter().all(|line| !line.starts_with(' ')));
    }

    #[test]
    fn missing_sink_is_tolerated() {
        let tracing = Tracing::new(None);
        let b = binding("w");
        tracing.enable(b.factory);
        let tracer = tracing.decorate(&b);
        assert!(tracer.is_active());
        assert_eq!(tracer.scope("quiet", || 1), 1);
    }
}
