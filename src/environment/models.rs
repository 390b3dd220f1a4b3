//! Environment data models for the WS client core.
//!
//! An environment chain is an ordered list of variable scopes, from the
//! broadest (workspace base) to the most specific (folder or request
//! override). Scopes closer to the request win on key collisions, and
//! nested object or array values are replaced wholesale by the innermost
//! definition rather than deep-merged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single variable scope within an environment chain.
///
/// Variable values may be plain literals, template-bearing strings
/// (containing `{{ ... }}` tags), or nested objects/arrays of values.
/// Scopes are read-only during resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvironmentScope {
    /// Scope name (e.g., "base", "staging", "folder: users")
    pub name: String,

    /// Variable key-value pairs for this scope
    #[serde(default)]
    pub variables: Map<String, Value>,

    /// Identifier of the enclosing scope, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl EnvironmentScope {
    /// Creates a new empty scope with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: Map::new(),
            parent_id: None,
        }
    }

    /// Creates a scope with name and variables.
    pub fn with_variables(name: impl Into<String>, variables: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            variables,
            parent_id: None,
        }
    }

    /// Gets a variable value by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.variables.get(key)
    }

    /// Sets a variable value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.variables.insert(key.into(), value.into());
    }

    /// Checks if a variable exists in this scope.
    pub fn contains(&self, key: &str) -> bool {
        self.variables.contains_key(key)
    }

    /// Returns the number of variables in this scope.
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Checks if the scope has no variables.
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// An ordered chain of environment scopes, outermost first.
///
/// The chain is a read-only snapshot supplied per resolution call. Merging
/// iterates outer to inner so that the innermost definition of any key is
/// the one visible to templates.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EnvironmentChain {
    scopes: Vec<EnvironmentScope>,
}

impl EnvironmentChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self { scopes: Vec::new() }
    }

    /// Creates a chain from scopes ordered outermost to innermost.
    pub fn from_scopes(scopes: Vec<EnvironmentScope>) -> Self {
        Self { scopes }
    }

    /// Appends a scope as the new innermost link.
    pub fn push(&mut self, scope: EnvironmentScope) {
        self.scopes.push(scope);
    }

    /// Appends a scope if present. A missing chain link is treated as an
    /// empty scope, so `None` is simply skipped.
    pub fn push_optional(&mut self, scope: Option<EnvironmentScope>) {
        if let Some(scope) = scope {
            self.scopes.push(scope);
        }
    }

    /// Returns the scopes ordered outermost to innermost.
    pub fn scopes(&self) -> &[EnvironmentScope] {
        &self.scopes
    }

    /// Returns the number of scopes in the chain.
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Checks if the chain has no scopes.
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Merges all scopes into a single flat namespace.
    ///
    /// Iterates outer to inner, overwriting same-named keys. Nested object
    /// and array values are replaced wholesale by the innermost definition;
    /// there is no deep merge.
    pub fn merged_variables(&self) -> Map<String, Value> {
        let mut merged = Map::new();
        for scope in &self.scopes {
            for (key, value) in &scope.variables {
                merged.insert(key.clone(), value.clone());
            }
        }
        merged
    }
}
