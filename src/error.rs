//! Error types for the dependency injection container.

use std::fmt;
use std::sync::Arc;

/// Error type returned by user factories, service functions and event handlers.
///
/// Anything implementing `std::error::Error + Send + Sync` converts into it
/// with `?`, including [`DiError`] itself.
pub type ServiceError = Box<dyn std::error::Error + Send + Sync>;

/// Shared, cloneable form of a user error kept as the source of a [`DiError`].
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Container operation named in "undefined service" errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Resolving a service.
    Load,
    /// Binding parameter values ahead of resolution.
    Configure,
    /// Enabling method tracing for a registered service.
    Trace,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Load => "Load",
            Operation::Configure => "Configure",
            Operation::Trace => "Trace",
        };
        f.write_str(name)
    }
}

/// Dependency injection errors
///
/// Represents the various error conditions that can occur during service
/// registration, resolution, configuration or event dispatch.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{Container, DiError, Operation};
///
/// let container = Container::new();
/// match container.resolve_any("_missing", &[]) {
///     Err(DiError::NotFound { operation, name }) => {
///         assert_eq!(operation, Operation::Load);
///         assert_eq!(name, "_missing");
///     }
///     _ => unreachable!(),
/// }
///
/// let err = DiError::InvalidParameter { service: "_foo".into(), position: 1 };
/// assert_eq!(err.to_string(), "Invalid parameter #1 passed to _foo.");
/// ```
#[derive(Debug, Clone, thiserror::Error)]
pub enum DiError {
    /// Malformed registration input
    #[error("{0}")]
    Registration(String),
    /// Service not registered
    #[error("{operation} was called for undefined service '{name}'.")]
    NotFound { operation: Operation, name: String },
    /// A supplied parameter value failed its validator (position is 1-based)
    #[error("Invalid parameter #{position} passed to {service}.")]
    InvalidParameter { service: String, position: usize },
    /// Circular dependency detected (includes path)
    #[error("Circular dependency: {}", .0.join(" -> "))]
    Circular(Vec<String>),
    /// Maximum resolution depth exceeded
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),
    /// Resolved instance is not of the requested type
    #[error("Service '{service}' is not of type {expected}")]
    TypeMismatch { service: String, expected: &'static str },
    /// A factory asked for a dependency its binding never declared
    #[error("'{service}' did not declare a dependency named '{dependency}'")]
    UndeclaredDependency { service: String, dependency: String },
    /// A factory asked for a notifier its binding never declared
    #[error("'{service}' does not send event '{event}'")]
    UndeclaredEvent { service: String, event: String },
    /// The user factory failed
    #[error("Factory for '{service}' failed: {source}")]
    Factory {
        service: String,
        #[source]
        source: SharedError,
    },
    /// An event handler failed
    #[error("Listener '{listener}' failed handling '{event}': {source}")]
    Listener {
        event: String,
        listener: String,
        #[source]
        source: SharedError,
    },
    /// A test double was registered twice for the same name
    #[error("Service {0} already has a test definition")]
    DuplicateOverride(String),
    /// A test container had nothing to stand in for a dependency
    #[error("Test container could not find service: {0}")]
    MissingTestDouble(String),
    /// A mocked notifier was called
    #[error("Unexpected call to {service}._notify{event}() with {count} parameters")]
    UnexpectedNotification { service: String, event: String, count: usize },
}

impl DiError {
    pub(crate) fn not_found(operation: Operation, name: &str) -> Self {
        DiError::NotFound { operation, name: name.to_string() }
    }

    /// Converts a user error into a `DiError`, keeping container errors intact.
    pub(crate) fn from_factory(service: &str, error: ServiceError) -> Self {
        match error.downcast::<DiError>() {
            Ok(inner) => *inner,
            Err(other) => DiError::Factory {
                service: service.to_string(),
                source: Arc::from(other),
            },
        }
    }

    /// Same as [`from_factory`](Self::from_factory), for event handlers.
    pub(crate) fn from_listener(event: &str, listener: &str, error: ServiceError) -> Self {
        match error.downcast::<DiError>() {
            Ok(inner) => *inner,
            Err(other) => DiError::Listener {
                event: event.to_string(),
                listener: listener.to_string(),
                source: Arc::from(other),
            },
        }
    }
}

/// Result type for DI operations
///
/// A convenience type alias for `Result<T, DiError>` used throughout ferrous-ioc.
pub type DiResult<T> = Result<T, DiError>;
