//! Template rendering for the WS client core.
//!
//! This module turns template-bearing strings and structures into concrete
//! values. Rendering always happens against a [`RenderContext`]: an
//! immutable per-call snapshot of the merged variable namespace, the
//! capability table of named template functions, a cookie jar handle, and
//! the purpose of the call.
//!
//! The purpose gates which effectful functions may run:
//!
//! - [`RenderPurpose::Send`] - live dispatch, all allowed effects run
//! - [`RenderPurpose::Preview`] - read-only display, effectful functions
//!   yield deterministic placeholders instead of running
//! - [`RenderPurpose::NoRender`] - pass-through, no evaluation at all

pub mod cycle;
pub mod error;
pub mod evaluator;
pub mod resolver;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::capabilities::CapabilityTable;
use crate::cookies::CookieJar;
use crate::environment::EnvironmentChain;

pub use cycle::CycleGuard;
pub use error::RenderError;
pub use evaluator::evaluate_template;
pub use resolver::resolve_value;

/// Why a resolution call is happening.
///
/// Threaded explicitly through every call so that evaluation policy never
/// depends on ambient application state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RenderPurpose {
    /// Live dispatch: all functions allowed for sending may run.
    Send,
    /// Passive display: effectful functions substitute placeholders.
    Preview,
    /// No evaluation: input is returned unchanged.
    NoRender,
}

impl fmt::Display for RenderPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RenderPurpose::Send => "send",
            RenderPurpose::Preview => "preview",
            RenderPurpose::NoRender => "no-render",
        };
        write!(f, "{}", s)
    }
}

/// Immutable per-call snapshot used by the evaluator and deep resolver.
///
/// Created fresh for every top-level resolution call and discarded when the
/// call returns. Never mutated after construction, so independent calls can
/// run concurrently without shared state.
#[derive(Debug, Clone)]
pub struct RenderContext {
    variables: Map<String, Value>,
    capabilities: Arc<CapabilityTable>,
    cookie_jar: CookieJar,
    purpose: RenderPurpose,
    required: HashSet<String>,
}

impl RenderContext {
    /// Looks up a raw variable value in the merged namespace.
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// The capability table of named template functions.
    pub fn capabilities(&self) -> &CapabilityTable {
        &self.capabilities
    }

    /// The cookie jar snapshot taken at context-build time.
    pub fn cookie_jar(&self) -> &CookieJar {
        &self.cookie_jar
    }

    /// The purpose of this resolution call.
    pub fn purpose(&self) -> RenderPurpose {
        self.purpose
    }

    /// Whether a missing variable of this name is a hard error.
    pub fn is_required(&self, name: &str) -> bool {
        self.required.contains(name)
    }

    /// Number of variables visible to templates.
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }
}

/// Assembles a [`RenderContext`] from an environment chain and a purpose.
///
/// Pure assembly: merging never fails, and a missing chain link is treated
/// as an empty scope.
#[derive(Debug, Default)]
pub struct ContextBuilder {
    chain: EnvironmentChain,
    capabilities: Option<Arc<CapabilityTable>>,
    cookie_jar: CookieJar,
    required: HashSet<String>,
}

impl ContextBuilder {
    /// Creates a builder with an empty chain and no capabilities.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the environment chain to merge, outermost scope first.
    pub fn chain(mut self, chain: EnvironmentChain) -> Self {
        self.chain = chain;
        self
    }

    /// Sets the capability table of named template functions.
    pub fn capabilities(mut self, capabilities: Arc<CapabilityTable>) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    /// Sets the cookie jar snapshot for this call.
    pub fn cookie_jar(mut self, cookie_jar: CookieJar) -> Self {
        self.cookie_jar = cookie_jar;
        self
    }

    /// Flags a variable as required: resolving it while undefined fails
    /// with [`RenderError::UndefinedVariable`] instead of yielding an empty
    /// string.
    pub fn require(mut self, name: impl Into<String>) -> Self {
        self.required.insert(name.into());
        self
    }

    /// Builds the immutable context for one resolution call.
    pub fn build(self, purpose: RenderPurpose) -> RenderContext {
        RenderContext {
            variables: self.chain.merged_variables(),
            capabilities: self
                .capabilities
                .unwrap_or_else(|| Arc::new(CapabilityTable::new())),
            cookie_jar: self.cookie_jar,
            purpose,
            required: self.required,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::EnvironmentScope;
    use serde_json::json;

    #[test]
    fn test_purpose_display() {
        assert_eq!(RenderPurpose::Send.to_string(), "send");
        assert_eq!(RenderPurpose::Preview.to_string(), "preview");
        assert_eq!(RenderPurpose::NoRender.to_string(), "no-render");
    }

    #[test]
    fn test_builder_merges_chain() {
        let mut base = EnvironmentScope::new("base");
        base.set("host", "api.test");
        let mut inner = EnvironmentScope::new("inner");
        inner.set("host", "staging.test");

        let ctx = ContextBuilder::new()
            .chain(EnvironmentChain::from_scopes(vec![base, inner]))
            .build(RenderPurpose::Send);

        assert_eq!(ctx.variable("host"), Some(&json!("staging.test")));
        assert_eq!(ctx.variable_count(), 1);
        assert_eq!(ctx.purpose(), RenderPurpose::Send);
    }

    #[test]
    fn test_builder_defaults_to_empty_table() {
        let ctx = ContextBuilder::new().build(RenderPurpose::Preview);
        assert!(ctx.capabilities().get("guid").is_none());
        assert!(ctx.variable("anything").is_none());
    }

    #[test]
    fn test_required_flagging() {
        let ctx = ContextBuilder::new()
            .require("token")
            .build(RenderPurpose::Send);

        assert!(ctx.is_required("token"));
        assert!(!ctx.is_required("host"));
    }
}
