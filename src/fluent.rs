//! Chainable configuration for builder types.
//!
//! Builder methods in this crate mutate in place and hand the receiver back,
//! so every configuration call chains. [`Fluent`] captures that shape once:
//! a method body that has nothing to return yields the receiver, one that
//! does produce a value passes it through instead.
//!
//! The trait is implemented per builder type, never through a blanket impl,
//! so a type can only be made fluent once.

/// Outcome of [`Fluent::chain_with`].
#[derive(Debug)]
pub enum Chained<S, R> {
    /// The body produced nothing; here is the receiver to keep chaining.
    Receiver(S),
    /// The body produced a value, passed through unchanged.
    Returned(R),
}

impl<S, R> Chained<S, R> {
    /// The receiver, if the body returned nothing.
    pub fn receiver(self) -> Option<S> {
        match self {
            Chained::Receiver(s) => Some(s),
            Chained::Returned(_) => None,
        }
    }

    /// The returned value, if any.
    pub fn returned(self) -> Option<R> {
        match self {
            Chained::Receiver(_) => None,
            Chained::Returned(r) => Some(r),
        }
    }
}

/// Builder types whose configuration calls return the receiver.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{Fluent, Parameter, Value};
///
/// let parameter = Parameter::new("level")
///     .chain(|p| p.set_default(Value::from("info")))
///     .with_validator(|v| v.as_str().is_some());
///
/// assert_eq!(parameter.default_value(), Some(&Value::from("info")));
/// ```
pub trait Fluent: Sized {
    /// Runs `body` against the receiver and returns the receiver.
    fn chain(mut self, body: impl FnOnce(&mut Self)) -> Self {
        body(&mut self);
        self
    }

    /// Runs `body`; returns its value when it has one, else the receiver.
    fn chain_with<R>(mut self, body: impl FnOnce(&mut Self) -> Option<R>) -> Chained<Self, R> {
        match body(&mut self) {
            Some(value) => Chained::Returned(value),
            None => Chained::Receiver(self),
        }
    }
}
