//! Capability table for named template functions.
//!
//! Expressions dispatch to functions by name through an explicit registry
//! supplied in the render context; there is no open-ended reflection. The
//! surrounding application registers effectful capabilities (prompting the
//! user, generating values, reading external resources) behind the
//! [`Capability`] trait without the core depending on their mechanism.

pub mod builtin;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::render::{RenderError, RenderPurpose};

pub use builtin::register_builtins;

/// A named function an expression may invoke.
///
/// Implementations may suspend awaiting an external response (a user
/// decision, an async lookup); the evaluator awaits completion before
/// moving to the next expression in the same string.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Invokes the function with already-split argument tokens.
    async fn invoke(&self, args: &[String], purpose: RenderPurpose) -> Result<Value, RenderError>;
}

/// Wraps a plain synchronous closure as a [`Capability`].
///
/// Useful for pure functions and for test doubles.
pub struct SyncCapability<F>(pub F);

#[async_trait]
impl<F> Capability for SyncCapability<F>
where
    F: Fn(&[String]) -> Result<Value, RenderError> + Send + Sync,
{
    async fn invoke(&self, args: &[String], _purpose: RenderPurpose) -> Result<Value, RenderError> {
        (self.0)(args)
    }
}

/// Registration record for one template function: its handler plus the
/// evaluation policy that gates it.
#[derive(Clone)]
pub struct FunctionSpec {
    name: String,
    is_effectful: bool,
    allowed_purposes: HashSet<RenderPurpose>,
    placeholder_on_preview: bool,
    handler: Arc<dyn Capability>,
}

impl FunctionSpec {
    /// Declares a pure function, allowed for both sending and preview.
    pub fn pure(name: impl Into<String>, handler: Arc<dyn Capability>) -> Self {
        Self {
            name: name.into(),
            is_effectful: false,
            allowed_purposes: [RenderPurpose::Send, RenderPurpose::Preview]
                .into_iter()
                .collect(),
            placeholder_on_preview: false,
            handler,
        }
    }

    /// Declares an effectful function, allowed only for live sends.
    ///
    /// During preview it substitutes a deterministic placeholder instead of
    /// running; override with [`FunctionSpec::fail_on_preview`] for
    /// functions where even a placeholder is wrong.
    pub fn effectful(name: impl Into<String>, handler: Arc<dyn Capability>) -> Self {
        Self {
            name: name.into(),
            is_effectful: true,
            allowed_purposes: [RenderPurpose::Send].into_iter().collect(),
            placeholder_on_preview: true,
            handler,
        }
    }

    /// Replaces the set of purposes this function may run under.
    pub fn allow(mut self, purposes: impl IntoIterator<Item = RenderPurpose>) -> Self {
        self.allowed_purposes = purposes.into_iter().collect();
        self
    }

    /// Makes a disallowed preview a hard [`RenderError::PurposeNotAllowed`]
    /// instead of a placeholder substitution.
    pub fn fail_on_preview(mut self) -> Self {
        self.placeholder_on_preview = false;
        self
    }

    /// The function's registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether invoking this function has observable side effects.
    pub fn is_effectful(&self) -> bool {
        self.is_effectful
    }

    /// Whether this function may run for the given purpose.
    pub fn allows(&self, purpose: RenderPurpose) -> bool {
        self.allowed_purposes.contains(&purpose)
    }

    /// Whether a disallowed preview substitutes a placeholder.
    pub fn placeholder_on_preview(&self) -> bool {
        self.placeholder_on_preview
    }

    /// The deterministic placeholder used for disallowed previews.
    pub fn placeholder(&self) -> String {
        format!("<{}>", self.name)
    }

    /// Invokes the underlying handler.
    pub async fn invoke(
        &self,
        args: &[String],
        purpose: RenderPurpose,
    ) -> Result<Value, RenderError> {
        self.handler.invoke(args, purpose).await
    }
}

impl std::fmt::Debug for FunctionSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionSpec")
            .field("name", &self.name)
            .field("is_effectful", &self.is_effectful)
            .field("allowed_purposes", &self.allowed_purposes)
            .field("placeholder_on_preview", &self.placeholder_on_preview)
            .finish()
    }
}

/// The set of named functions visible to a resolution call.
#[derive(Debug, Default)]
pub struct CapabilityTable {
    functions: HashMap<String, FunctionSpec>,
}

impl CapabilityTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table pre-populated with the builtin pure functions
    /// (`guid`, `timestamp`, `datetime`, `randomInt`, `base64`).
    pub fn with_builtins() -> Self {
        let mut table = Self::new();
        register_builtins(&mut table);
        table
    }

    /// Registers a function, replacing any previous spec with the same name.
    pub fn register(&mut self, spec: FunctionSpec) {
        self.functions.insert(spec.name.clone(), spec);
    }

    /// Looks up a function by name.
    pub fn get(&self, name: &str) -> Option<&FunctionSpec> {
        self.functions.get(name)
    }

    /// Returns the number of registered functions.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Checks whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Lists registered function names.
    pub fn names(&self) -> Vec<&str> {
        self.functions.keys().map(String::as_str).collect()
    }
}

/// Splits raw argument text into tokens.
///
/// Comma-separated when any comma appears outside quotes (the `name(a, b)`
/// call form), whitespace-separated otherwise (the `$name a b` shorthand).
/// Separators inside single or double quotes do not split. Tokens are
/// trimmed and surrounding matching quotes are stripped.
pub fn split_args(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }

    let comma_separated = has_unquoted_comma(raw);
    let mut tokens: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in raw.chars() {
        match quote {
            Some(q) => {
                current.push(ch);
                if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '"' | '\'' => {
                    quote = Some(ch);
                    current.push(ch);
                }
                ',' if comma_separated => {
                    tokens.push(std::mem::take(&mut current));
                }
                c if !comma_separated && c.is_whitespace() => {
                    if !current.is_empty() {
                        tokens.push(std::mem::take(&mut current));
                    }
                }
                other => current.push(other),
            },
        }
    }
    if comma_separated || !current.is_empty() {
        tokens.push(current);
    }

    tokens
        .iter()
        .map(|t| {
            let t = t.trim();
            let unquoted = t
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .or_else(|| t.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')));
            unquoted.unwrap_or(t).to_string()
        })
        .collect()
}

fn has_unquoted_comma(raw: &str) -> bool {
    let mut quote: Option<char> = None;
    for ch in raw.chars() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '"' | '\'' => quote = Some(ch),
                ',' => return true,
                _ => {}
            },
        }
    }
    false
}
