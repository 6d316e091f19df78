//! Diagnostic observers for resolution and dispatch.
//!
//! Observers are called synchronously whenever the container constructs a
//! service (cache hits are not reported) and whenever an event is dispatched.
//! Keep implementations lightweight.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::DiError;

/// Observer trait for container activity.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{Container, ContainerOptions, MetricsObserver, Resolver};
/// use std::sync::Arc;
///
/// struct Clock;
///
/// let metrics = Arc::new(MetricsObserver::new());
/// let container = Container::with_options(
///     ContainerOptions::new().add_observer(metrics.clone()),
/// );
/// container.register("clock").unwrap().with_constructor(|_| Ok(Clock));
///
/// container.resolve::<Clock>("clock", &[]).unwrap();
/// assert_eq!(metrics.resolution_count(), 1);
/// ```
pub trait ResolutionObserver: Send + Sync {
    /// Called before a binding's parameters and dependencies are resolved.
    fn resolving(&self, name: &str);

    /// Called after an instance was constructed and wired.
    ///
    /// * `duration` - Time elapsed from `resolving` to `resolved`, dependencies included
    fn resolved(&self, name: &str, duration: Duration);

    /// Called when constructing `name` failed. The error still propagates.
    fn failed(&self, _name: &str, _error: &DiError) {}

    /// Called after `event` was delivered to `listeners` listeners.
    fn dispatched(&self, _event: &str, _listeners: usize) {}
}

/// Container for registered observers.
#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn ResolutionObserver>>,
}

impl Observers {
    pub(crate) fn add(&mut self, observer: Arc<dyn ResolutionObserver>) {
        self.observers.push(observer);
    }

    /// Returns true if any observers are registered.
    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    #[inline]
    pub(crate) fn resolving(&self, name: &str) {
        for observer in &self.observers {
            observer.resolving(name);
        }
    }

    #[inline]
    pub(crate) fn resolved(&self, name: &str, duration: Duration) {
        for observer in &self.observers {
            observer.resolved(name, duration);
        }
    }

    #[inline]
    pub(crate) fn failed(&self, name: &str, error: &DiError) {
        for observer in &self.observers {
            observer.failed(name, error);
        }
    }

    #[inline]
    pub(crate) fn dispatched(&self, event: &str, listeners: usize) {
        for observer in &self.observers {
            observer.dispatched(event, listeners);
        }
    }
}

/// Built-in observer that reports activity as `tracing` events.
///
/// Constructions are logged at `debug`, failures at `warn`. The prefix is
/// attached as a field so several containers can be told apart.
pub struct LoggingObserver {
    prefix: String,
}

impl LoggingObserver {
    /// Creates a new logging observer with default prefix.
    pub fn new() -> Self {
        Self { prefix: "ferrous-ioc".to_string() }
    }

    /// Creates a new logging observer with a custom prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolutionObserver for LoggingObserver {
    fn resolving(&self, name: &str) {
        tracing::debug!(container = %self.prefix, service = name, "resolving");
    }

    fn resolved(&self, name: &str, duration: Duration) {
        tracing::debug!(container = %self.prefix, service = name, ?duration, "resolved");
    }

    fn failed(&self, name: &str, error: &DiError) {
        tracing::warn!(container = %self.prefix, service = name, %error, "resolution failed");
    }

    fn dispatched(&self, event: &str, listeners: usize) {
        tracing::debug!(container = %self.prefix, event, listeners, "event dispatched");
    }
}

/// Observer that keeps counters for post-run analysis.
#[derive(Default)]
pub struct MetricsObserver {
    resolution_count: AtomicU64,
    failure_count: AtomicU64,
    dispatch_count: AtomicU64,
    delivered_count: AtomicU64,
    total_resolution_time: AtomicU64,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the number of instances constructed.
    pub fn resolution_count(&self) -> u64 {
        self.resolution_count.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn dispatch_count(&self) -> u64 {
        self.dispatch_count.load(Ordering::Relaxed)
    }

    /// Total listener notifications across all dispatches.
    pub fn delivered_count(&self) -> u64 {
        self.delivered_count.load(Ordering::Relaxed)
    }

    /// Gets the average construction time.
    pub fn average_resolution_time(&self) -> Option<Duration> {
        let count = self.resolution_count();
        if count == 0 {
            return None;
        }

        let total_ns = self.total_resolution_time.load(Ordering::Relaxed);
        Some(Duration::from_nanos(total_ns / count))
    }

    /// Resets all metrics.
    pub fn reset(&self) {
        self.resolution_count.store(0, Ordering::Relaxed);
        self.failure_count.store(0, Ordering::Relaxed);
        self.dispatch_count.store(0, Ordering::Relaxed);
        self.delivered_count.store(0, Ordering::Relaxed);
        self.total_resolution_time.store(0, Ordering::Relaxed);
    }
}

impl ResolutionObserver for MetricsObserver {
    fn resolving(&self, _name: &str) {}

    fn resolved(&self, _name: &str, duration: Duration) {
        self.resolution_count.fetch_add(1, Ordering::Relaxed);
        self.total_resolution_time.fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    fn failed(&self, _name: &str, _error: &DiError) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    fn dispatched(&self, _event: &str, listeners: usize) {
        self.dispatch_count.fetch_add(1, Ordering::Relaxed);
        self.delivered_count.fetch_add(listeners as u64, Ordering::Relaxed);
    }
}
