//! Cycle detection for recursive variable resolution.
//!
//! Variables may reference other variables, so resolution is recursive. A
//! [`CycleGuard`] is created for each top-level resolution call and tracks
//! the names currently being resolved; pushing a name that is already on
//! the stack means the definition reaches itself and resolution must fail.

use crate::render::RenderError;

/// A LIFO stack of names currently being resolved.
///
/// Scoped to one top-level resolution call (one deep-resolver invocation)
/// and discarded with it. Detection is independent of nesting depth: a
/// direct self-reference and a long mutual-reference chain both fail at the
/// point of reentry.
#[derive(Debug, Default)]
pub struct CycleGuard {
    stack: Vec<String>,
}

impl CycleGuard {
    /// Creates an empty guard for a new top-level call.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a name onto the stack.
    ///
    /// Fails with [`RenderError::CircularReference`] if the name is already
    /// being resolved.
    pub fn push(&mut self, name: &str) -> Result<(), RenderError> {
        if self.stack.iter().any(|n| n == name) {
            return Err(RenderError::CircularReference {
                name: name.to_string(),
            });
        }
        self.stack.push(name.to_string());
        Ok(())
    }

    /// Pops the most recently pushed name.
    ///
    /// Callers must pop on every exit path, success or failure, so that
    /// sibling expressions in the same call see a balanced stack.
    pub fn pop(&mut self) {
        self.stack.pop();
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}
