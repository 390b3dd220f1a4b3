//! Template resolution and connection dispatch for WebSocket-style requests
//!
//! This crate is the headless core behind a connection action bar: it takes a
//! user-authored request whose URL, headers, parameters, cookies and
//! authentication fields may contain `{{ ... }}` template tags, resolves every
//! tag against a chain of environment scopes, and drives the connect /
//! disconnect lifecycle of the resulting request through a pluggable
//! transport.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - **environment**: Environment scopes and the outer-to-inner merge chain
//! - **template**: Splits text into literal and `{{ ... }}` expression nodes
//! - **capabilities**: Named template functions (`guid()`, `timestamp()`, ...)
//!   and the purpose policy that gates them
//! - **render**: The render context, expression evaluator, cycle guard and
//!   deep structural resolver
//! - **models**: Request definitions and their fully resolved counterparts
//! - **auth**: Basic and bearer authentication descriptors
//! - **cookies**: Cookie jar with URL matching for the `Cookie` header
//! - **dispatch**: Canonical request derivation and the connection lifecycle
//!   state machine
//!
//! # Resolution pipeline
//!
//! The main entry point is [`RequestClient::connect`] which:
//! 1. Builds a render context from the environment chain and cookie jar
//! 2. Deep-resolves the request structure for [`RenderPurpose::Send`]
//! 3. Derives the canonical connect instruction (query merge, header
//!    normalization, authentication, cookies)
//! 4. Hands the instruction to the transport and tracks the lifecycle state
//!
//! Template failures and connection failures travel on separate error
//! channels ([`DispatchError::Render`] vs [`DispatchError::Transport`]) so a
//! caller can tell a broken template apart from a failed network call.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use ws_client_core::{
//!     EnvironmentChain, EnvironmentScope, RequestClient, RequestDefinition,
//! };
//! # use ws_client_core::{ConnectInstruction, Transport, TransportError};
//! # struct NoopTransport;
//! # #[async_trait::async_trait]
//! # impl Transport for NoopTransport {
//! #     async fn connect(&self, _: ConnectInstruction) -> Result<(), TransportError> { Ok(()) }
//! #     async fn disconnect(&self, _: &str) -> Result<(), TransportError> { Ok(()) }
//! # }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut base = EnvironmentScope::new("base");
//! base.set("host", "chat.example.com");
//! let chain = EnvironmentChain::from_scopes(vec![base]);
//!
//! let mut request = RequestDefinition::new("req-1", "wss://{{ host }}/socket");
//! request.add_header("X-Request-Id", "{{ guid() }}");
//!
//! let client = RequestClient::new(Arc::new(NoopTransport));
//! client.connect(&request, &chain).await?;
//! client.disconnect(&request.id).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use serde_json::Value;

pub mod auth;
pub mod capabilities;
pub mod cookies;
pub mod dispatch;
pub mod environment;
pub mod models;
pub mod render;
pub mod template;

pub use auth::AuthDescriptor;
pub use capabilities::{Capability, CapabilityTable, FunctionSpec};
pub use cookies::{Cookie, CookieJar};
pub use dispatch::{
    ConnectInstruction, ConnectionDispatcher, ConnectionState, DispatchError, Transport,
    TransportError,
};
pub use environment::{EnvironmentChain, EnvironmentScope};
pub use models::{Header, QueryParam, RequestDefinition, ResolvedPair, ResolvedRequest};
pub use render::{ContextBuilder, RenderContext, RenderError, RenderPurpose};

use render::resolve_value;

/// Resolves an arbitrary template-bearing structure in one call.
///
/// Convenience wrapper for callers that bring their own structure rather
/// than a [`RequestDefinition`]. Builds a context from the chain and the
/// capability table, then deep-resolves the value for the given purpose.
pub async fn resolve(
    input: &Value,
    chain: &EnvironmentChain,
    capabilities: Arc<CapabilityTable>,
    purpose: RenderPurpose,
) -> Result<Value, RenderError> {
    let ctx = ContextBuilder::new()
        .chain(chain.clone())
        .capabilities(capabilities)
        .build(purpose);
    resolve_value(input, &ctx).await
}

/// High-level facade tying resolution and dispatch together.
///
/// Owns the capability table, the cookie jar and the connection dispatcher.
/// One client serves any number of requests; lifecycle state is tracked per
/// request id.
pub struct RequestClient {
    capabilities: Arc<CapabilityTable>,
    cookie_jar: CookieJar,
    dispatcher: ConnectionDispatcher,
}

impl RequestClient {
    /// Creates a client with the built-in template functions registered.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_capabilities(transport, CapabilityTable::with_builtins())
    }

    /// Creates a client with a caller-supplied capability table.
    pub fn with_capabilities(transport: Arc<dyn Transport>, capabilities: CapabilityTable) -> Self {
        Self {
            capabilities: Arc::new(capabilities),
            cookie_jar: CookieJar::new(),
            dispatcher: ConnectionDispatcher::new(transport),
        }
    }

    /// Replaces the cookie jar consulted during resolution and dispatch.
    pub fn set_cookie_jar(&mut self, cookie_jar: CookieJar) {
        self.cookie_jar = cookie_jar;
    }

    /// The cookie jar currently in use.
    pub fn cookie_jar(&self) -> &CookieJar {
        &self.cookie_jar
    }

    /// Resolves a request against an environment chain for a given purpose.
    ///
    /// Disabled header and parameter rows are dropped before evaluation.
    /// For [`RenderPurpose::NoRender`] the authored text is carried through
    /// unchanged; for [`RenderPurpose::Preview`] effectful functions yield
    /// placeholders instead of running.
    pub async fn resolve_request(
        &self,
        request: &RequestDefinition,
        chain: &EnvironmentChain,
        purpose: RenderPurpose,
    ) -> Result<ResolvedRequest, RenderError> {
        let ctx = ContextBuilder::new()
            .chain(chain.clone())
            .capabilities(self.capabilities.clone())
            .cookie_jar(self.cookie_jar.clone())
            .build(purpose);

        let input = request.render_input(&self.cookie_jar);
        let output = resolve_value(&input, &ctx).await?;
        ResolvedRequest::from_render_output(&request.id, output)
    }

    /// Resolves a request for passive display.
    pub async fn preview(
        &self,
        request: &RequestDefinition,
        chain: &EnvironmentChain,
    ) -> Result<ResolvedRequest, RenderError> {
        self.resolve_request(request, chain, RenderPurpose::Preview)
            .await
    }

    /// Resolves a request for dispatch and opens its connection.
    ///
    /// Resolution failures are reported on the render channel without
    /// touching the lifecycle. Repeat calls while the connection is already
    /// connecting or open are no-ops.
    pub async fn connect(
        &self,
        request: &RequestDefinition,
        chain: &EnvironmentChain,
    ) -> Result<(), DispatchError> {
        let resolved = self
            .resolve_request(request, chain, RenderPurpose::Send)
            .await?;
        self.dispatcher.connect(&resolved).await
    }

    /// Closes the connection for a request id, if one is active.
    pub async fn disconnect(&self, request_id: &str) -> Result<(), DispatchError> {
        self.dispatcher.disconnect(request_id).await
    }

    /// Current lifecycle state for a request id.
    pub fn connection_state(&self, request_id: &str) -> ConnectionState {
        self.dispatcher.state(request_id)
    }

    /// Drops lifecycle tracking for a discarded request.
    pub fn forget(&self, request_id: &str) {
        self.dispatcher.remove(request_id);
    }
}
