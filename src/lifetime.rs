//! Service lifetime definitions.

/// Binding lifetimes controlling instance caching behavior
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{Container, Lifetime, Resolver};
/// use std::sync::Arc;
///
/// struct Database;
/// struct Request;
///
/// let container = Container::new();
/// container.register("db").unwrap()
///     .with_constructor(|_| Ok(Database))
///     .as_singleton();
/// container.register("request").unwrap()
///     .with_constructor(|_| Ok(Request));
///
/// let db1 = container.resolve::<Database>("db", &[]).unwrap();
/// let db2 = container.resolve::<Database>("db", &[]).unwrap();
/// assert!(Arc::ptr_eq(&db1, &db2));
///
/// let r1 = container.resolve::<Request>("request", &[]).unwrap();
/// let r2 = container.resolve::<Request>("request", &[]).unwrap();
/// assert!(!Arc::ptr_eq(&r1, &r2));
///
/// assert_eq!(container.binding("db").unwrap().lifetime, Lifetime::Singleton);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Lifetime {
    /// New instance per resolution, never cached
    #[default]
    Transient,
    /// Single instance per container, cached on first resolution
    ///
    /// The instance lands in the container's singleton map, which also holds
    /// directly registered instances; from then on every resolution of the
    /// name returns that same reference.
    Singleton,
}

impl Lifetime {
    pub fn is_singleton(self) -> bool {
        self == Lifetime::Singleton
    }
}
