//! Core traits for the dependency injection container.

mod listener;
mod resolver;

pub use listener::EventListener;
pub use resolver::{Resolver, ResolverCore};
pub(crate) use resolver::downcast_service;
