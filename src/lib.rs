//! # ferrous-ioc
//!
//! Name-keyed inversion-of-control container with a fluent registration API,
//! validated parameters and a container-mediated event bus.
//!
//! ## Features
//!
//! - **Named bindings**: services are registered and resolved by name, built by
//!   a constructor closure, a service function or a ready-made instance
//! - **Parameters**: positional values with validators and defaults, supplied
//!   at resolution time or bound once with [`Container::configure`]
//! - **Singletons**: built once per container, safe under concurrent first use
//! - **Events**: services send events through injected [`Notifier`]s and
//!   receive them as [`EventListener`]s; listeners can be created on demand
//! - **Circular dependency detection**: cycles fail with the full resolution path
//! - **Method tracing**: opt-in call tracing per service type
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_ioc::{Container, Parameter, Resolver, Value};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//!     page_size: i64,
//! }
//!
//! let container = Container::new();
//! container.register("db").unwrap()
//!     .with_constructor(|ctx| {
//!         Ok(Database { url: ctx.param_str("url").unwrap_or_default().to_string() })
//!     })
//!     .with_parameters(["url"])
//!     .as_singleton();
//! container.register("users").unwrap()
//!     .with_constructor(|ctx| {
//!         Ok(UserService {
//!             db: ctx.get::<Database>("db")?,
//!             page_size: ctx.param_i64("page_size").unwrap_or(10),
//!         })
//!     })
//!     .with_dependencies(["db"])
//!     .with_parameters([Parameter::integer("page_size").with_default(25)]);
//!
//! container.configure("db", &[Value::from("postgres://localhost")]).unwrap();
//!
//! let users = container.resolve::<UserService>("users", &[]).unwrap();
//! assert_eq!(users.db.url, "postgres://localhost");
//! assert_eq!(users.page_size, 25);
//! ```
//!
//! ## Events
//!
//! ```rust
//! use ferrous_ioc::{Container, EventListener, Notifier, Resolver, ServiceError, Value};
//! use std::sync::Mutex;
//!
//! struct Checkout {
//!     completed: Notifier,
//! }
//!
//! #[derive(Default)]
//! struct Receipts {
//!     sent: Mutex<Vec<i64>>,
//! }
//!
//! impl EventListener for Receipts {
//!     fn on_event(&self, _event: &str, args: &[Value]) -> Result<(), ServiceError> {
//!         let order = args.first().and_then(Value::as_i64).unwrap_or_default();
//!         self.sent.lock().unwrap().push(order);
//!         Ok(())
//!     }
//! }
//!
//! let container = Container::new();
//! container.register("checkout").unwrap()
//!     .with_constructor(|ctx| Ok(Checkout { completed: ctx.notifier("OrderCompleted")? }))
//!     .sending_events(["OrderCompleted"]);
//! container.register("receipts").unwrap()
//!     .with_constructor(|_| Ok(Receipts::default()))
//!     .as_singleton()
//!     .created_on_events(["OrderCompleted"]);
//!
//! let checkout = container.resolve::<Checkout>("checkout", &[]).unwrap();
//! checkout.completed.notify(&[Value::from(7)]).unwrap();
//!
//! let receipts = container.resolve::<Receipts>("receipts", &[]).unwrap();
//! assert_eq!(*receipts.sent.lock().unwrap(), vec![7]);
//! ```

// Module declarations
pub mod builder;
pub mod config;
pub mod descriptors;
pub mod error;
pub mod fluent;
pub mod graph_export;
pub mod lifetime;
pub mod observer;
pub mod parameter;
pub mod provider;
pub mod testing;
pub mod trace;
pub mod traits;
pub mod value;

// Internal modules
mod internal;
mod registration;

// Re-export core types
pub use builder::{BindingConfig, BindingStart};
pub use config::{ContainerOptions, DEFAULT_MAX_DEPTH, MAX_DEPTH_ENV};
pub use descriptors::BindingDescriptor;
pub use error::{DiError, DiResult, Operation, ServiceError, SharedError};
pub use fluent::{Chained, Fluent};
pub use graph_export::{DependencyGraph, GraphEdge, GraphNode};
pub use lifetime::Lifetime;
pub use observer::{LoggingObserver, MetricsObserver, ResolutionObserver};
pub use parameter::{Parameter, Validator};
pub use provider::{Container, Injection, Notifier, ServiceFn};
pub use registration::Dependency;
pub use testing::{FakeContainer, TestDoublePolicy};
pub use trace::{MethodTracer, TraceSink, TracingSink};
pub use traits::{EventListener, Resolver, ResolverCore};
pub use value::Value;
