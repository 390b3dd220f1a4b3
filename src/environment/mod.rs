//! Environment management for the WS client core.
//!
//! Provides the layered variable scopes that templates draw from. A chain
//! of scopes is merged into one flat namespace at context-build time; the
//! innermost scope wins on key collisions.

pub mod models;

pub use models::{EnvironmentChain, EnvironmentScope};
