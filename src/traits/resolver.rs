//! Resolver traits for service resolution.

use std::any::Any;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::registration::AnyArc;
use crate::value::Value;

/// Core resolver trait for object-safe service resolution.
///
/// Implemented by the [`Container`](crate::Container) and by the
/// [`FakeContainer`](crate::testing::FakeContainer) test double. Most callers
/// use the generic methods of [`Resolver`] instead.
pub trait ResolverCore: Send + Sync {
    /// Resolves a service by name with positional parameter arguments.
    ///
    /// # Returns
    ///
    /// * `Ok(AnyArc)` - The resolved service wrapped in `Arc<dyn Any>`
    /// * `Err(DiError)` - Resolution error (not found, invalid parameter, circular, etc.)
    fn resolve_any(&self, name: &str, args: &[Value]) -> DiResult<Arc<dyn Any + Send + Sync>>;
}

/// High-level resolver interface with generic methods for type-safe service resolution.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{Container, Resolver};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn prefix(&self) -> &str;
/// }
///
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {
///     fn prefix(&self) -> &str { "LOG" }
/// }
///
/// let container = Container::new();
/// container.register("answer").unwrap().with_constructor(|_| Ok(42usize));
/// container.register("logger").unwrap()
///     .with_constructor(|_| Ok(Arc::new(ConsoleLogger) as Arc<dyn Logger>));
///
/// let number = container.resolve::<usize>("answer", &[]).unwrap();
/// assert_eq!(*number, 42);
///
/// let logger = container.resolve_trait::<dyn Logger>("logger", &[]).unwrap();
/// assert_eq!(logger.prefix(), "LOG");
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves a service and downcasts it to `T`.
    fn resolve<T: Any + Send + Sync>(&self, name: &str, args: &[Value]) -> DiResult<Arc<T>> {
        let any = self.resolve_any(name, args)?;
        downcast_service(name, any)
    }

    /// Resolves a service registered as `Arc<T>` for an unsized `T`, such as a
    /// trait object.
    fn resolve_trait<T: ?Sized + Send + Sync + 'static>(&self, name: &str, args: &[Value]) -> DiResult<Arc<T>> {
        let any = self.resolve_any(name, args)?;
        any.downcast::<Arc<T>>()
            .map(|boxed| (*boxed).clone())
            .map_err(|_| DiError::TypeMismatch {
                service: name.to_string(),
                expected: std::any::type_name::<Arc<T>>(),
            })
    }

    /// Resolves a service without parameters, panicking on failure.
    ///
    /// Use this when a missing registration is a programming error that
    /// should fail fast.
    fn resolve_required<T: Any + Send + Sync>(&self, name: &str) -> Arc<T> {
        self.resolve::<T>(name, &[])
            .unwrap_or_else(|e| panic!("Failed to resolve {}: {}", name, e))
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}

/// Downcasts a type-erased service, reporting the service name on mismatch.
pub(crate) fn downcast_service<T: Any + Send + Sync>(name: &str, any: AnyArc) -> DiResult<Arc<T>> {
    any.downcast::<T>().map_err(|_| DiError::TypeMismatch {
        service: name.to_string(),
        expected: std::any::type_name::<T>(),
    })
}
