//! Request data models.
//!
//! A [`RequestDefinition`] is the user-authored, template-bearing form of a
//! connection request. Resolution turns it into a [`ResolvedRequest`]: the
//! same shape with every leaf concrete and disabled rows dropped, ready for
//! canonicalization and dispatch.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::auth::AuthDescriptor;
use crate::cookies::CookieJar;
use crate::render::RenderError;

/// A request header row as authored, with an enable toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Header name, may be template-bearing
    pub name: String,

    /// Header value, may be template-bearing
    pub value: String,

    /// Disabled rows are skipped before resolution
    #[serde(default)]
    pub disabled: bool,
}

impl Header {
    /// Creates an enabled header row.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            disabled: false,
        }
    }
}

/// A query parameter row as authored, with an enable toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParam {
    /// Parameter name, may be template-bearing
    pub name: String,

    /// Parameter value, may be template-bearing
    pub value: String,

    /// Disabled rows are skipped before resolution
    #[serde(default)]
    pub disabled: bool,
}

impl QueryParam {
    /// Creates an enabled query parameter row.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            disabled: false,
        }
    }
}

/// A name/value pair with every template already substituted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPair {
    /// Concrete name
    pub name: String,
    /// Concrete value
    pub value: String,
}

/// A user-authored connection request before resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestDefinition {
    /// Unique identifier for lifecycle tracking and correlation
    pub id: String,

    /// Target URL, may contain `{{ ... }}` tags
    pub url: String,

    /// Header rows
    #[serde(default)]
    pub headers: Vec<Header>,

    /// Explicit query parameter rows, merged into the URL at dispatch
    #[serde(default)]
    pub parameters: Vec<QueryParam>,

    /// Authentication descriptor, fields may be template-bearing
    #[serde(default)]
    pub authentication: AuthDescriptor,
}

impl RequestDefinition {
    /// Creates a request with the given id and URL.
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            headers: Vec::new(),
            parameters: Vec::new(),
            authentication: AuthDescriptor::None,
        }
    }

    /// Creates a request with a generated unique id.
    pub fn with_generated_id(url: impl Into<String>) -> Self {
        Self::new(Uuid::new_v4().to_string(), url)
    }

    /// Adds an enabled header row.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push(Header::new(name, value));
    }

    /// Adds an enabled query parameter row.
    pub fn add_parameter(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.parameters.push(QueryParam::new(name, value));
    }

    /// Builds the template-bearing structure handed to the deep resolver.
    ///
    /// Disabled header and parameter rows are dropped here, before any
    /// template evaluation, so their tags never run. The cookie jar rides
    /// along because stored cookie values may carry tags of their own.
    pub fn render_input(&self, cookie_jar: &CookieJar) -> Value {
        let headers: Vec<Value> = self
            .headers
            .iter()
            .filter(|h| !h.disabled)
            .map(|h| serde_json::json!({"name": h.name, "value": h.value}))
            .collect();
        let parameters: Vec<Value> = self
            .parameters
            .iter()
            .filter(|p| !p.disabled)
            .map(|p| serde_json::json!({"name": p.name, "value": p.value}))
            .collect();

        serde_json::json!({
            "url": self.url,
            "headers": headers,
            "parameters": parameters,
            "authentication": self.authentication,
            "cookies": cookie_jar,
        })
    }
}

/// Shape of the resolver output for a request, used to rebuild the typed
/// form.
#[derive(Debug, Deserialize)]
struct RenderOutput {
    url: String,
    headers: Vec<ResolvedPair>,
    parameters: Vec<ResolvedPair>,
    authentication: AuthDescriptor,
    cookies: CookieJar,
}

/// A fully concrete request, structurally isomorphic to its definition.
///
/// Contains no unresolved expression syntax; every leaf is a plain string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRequest {
    /// Identifier inherited from the definition
    pub id: String,

    /// Concrete URL before query-parameter merging
    pub url: String,

    /// Concrete header pairs in authored order
    pub headers: Vec<ResolvedPair>,

    /// Concrete query parameter pairs in authored order
    pub parameters: Vec<ResolvedPair>,

    /// Concrete authentication descriptor
    pub authentication: AuthDescriptor,

    /// Cookie jar snapshot with concrete values
    pub cookies: CookieJar,
}

impl ResolvedRequest {
    /// Rebuilds the typed request from the deep resolver's output.
    ///
    /// The resolver preserves structure, so this only fails if the input
    /// value was not produced from [`RequestDefinition::render_input`].
    pub fn from_render_output(id: impl Into<String>, output: Value) -> Result<Self, RenderError> {
        let parsed: RenderOutput =
            serde_json::from_value(output).map_err(|e| RenderError::InvalidStructure {
                message: e.to_string(),
            })?;

        Ok(Self {
            id: id.into(),
            url: parsed.url,
            headers: parsed.headers,
            parameters: parsed.parameters,
            authentication: parsed.authentication,
            cookies: parsed.cookies,
        })
    }
}
