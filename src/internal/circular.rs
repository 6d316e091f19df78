//! Circular dependency detection infrastructure.

use std::cell::RefCell;

use crate::error::{DiError, DiResult};

// Thread-local resolution stack: (container id, service name)
thread_local! {
    static RESOLUTION_STACK: RefCell<Vec<(usize, String)>> = const { RefCell::new(Vec::new()) };
}

/// Marks a service as being resolved on this thread until dropped.
pub(crate) struct StackGuard {
    container: usize,
}

impl StackGuard {
    /// Pushes `name`, failing if it is already being resolved by the same
    /// container on this thread or if the stack is `max_depth` deep.
    pub(crate) fn enter(container: usize, name: &str, max_depth: usize) -> DiResult<Self> {
        RESOLUTION_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();

            // Circular detection BEFORE pushing the new name
            if stack.iter().any(|(c, n)| *c == container && n == name) {
                let mut path: Vec<String> = stack
                    .iter()
                    .filter(|(c, _)| *c == container)
                    .map(|(_, n)| n.clone())
                    .collect();
                path.push(name.to_string());
                return Err(DiError::Circular(path));
            }

            // Depth guard
            if stack.len() >= max_depth {
                return Err(DiError::DepthExceeded(stack.len()));
            }

            stack.push((container, name.to_string()));
            Ok(Self { container })
        })
    }
}

impl Drop for StackGuard {
    fn drop(&mut self) {
        RESOLUTION_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();
            debug_assert!(popped.is_some_and(|(c, _)| c == self.container));
        });
    }
}
