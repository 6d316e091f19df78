//! Container configuration.
//!
//! Options are set in code by the composition root. `from_env` lets
//! deployments adjust limits without a rebuild.

use std::env;
use std::fmt;
use std::sync::Arc;

use crate::fluent::Fluent;
use crate::observer::{Observers, ResolutionObserver};
use crate::trace::{TraceSink, TracingSink};
use crate::value::Value;

/// Default ceiling for nested resolutions on one thread.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Environment variable read by [`ContainerOptions::from_env`].
pub const MAX_DEPTH_ENV: &str = "FERROUS_IOC_MAX_DEPTH";

/// Options applied when a [`Container`](crate::Container) is created.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{Container, ContainerOptions, LoggingObserver};
/// use std::sync::Arc;
///
/// let options = ContainerOptions::new()
///     .with_max_depth(64)
///     .without_trace_sink()
///     .add_observer(Arc::new(LoggingObserver::new()));
///
/// assert_eq!(options.max_depth(), 64);
/// let container = Container::with_options(options);
/// ```
#[derive(Clone)]
pub struct ContainerOptions {
    pub(crate) max_depth: usize,
    pub(crate) trace_sink: Option<Arc<dyn TraceSink>>,
    pub(crate) observers: Observers,
}

impl Fluent for ContainerOptions {}

impl ContainerOptions {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            trace_sink: Some(Arc::new(TracingSink)),
            observers: Observers::default(),
        }
    }

    /// Defaults, with `FERROUS_IOC_MAX_DEPTH` applied when it holds a
    /// positive integer. Other values are ignored with a warning.
    pub fn from_env() -> Self {
        let options = Self::new();
        match env::var(MAX_DEPTH_ENV) {
            Ok(raw) => match Value::infer(raw.trim()).as_i64() {
                Some(depth) if depth > 0 => options.with_max_depth(depth as usize),
                _ => {
                    tracing::warn!(variable = MAX_DEPTH_ENV, value = %raw, "ignoring invalid max depth");
                    options
                }
            },
            Err(_) => options,
        }
    }

    /// Maximum nesting of resolutions before `DiError::DepthExceeded`.
    pub fn with_max_depth(self, depth: usize) -> Self {
        self.chain(|o| o.max_depth = depth.max(1))
    }

    /// Where method-trace lines go. Defaults to [`TracingSink`].
    pub fn with_trace_sink(self, sink: Arc<dyn TraceSink>) -> Self {
        self.chain(|o| o.trace_sink = Some(sink))
    }

    /// Drops method-trace lines.
    pub fn without_trace_sink(self) -> Self {
        self.chain(|o| o.trace_sink = None)
    }

    pub fn add_observer(self, observer: Arc<dyn ResolutionObserver>) -> Self {
        self.chain(|o| o.observers.add(observer))
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ContainerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerOptions")
            .field("max_depth", &self.max_depth)
            .field("trace_sink", &self.trace_sink.is_some())
            .field("observers", &format!("{} observers", self.observers.len()))
            .finish()
    }
}
