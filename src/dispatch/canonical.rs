//! Canonical request derivation.
//!
//! Turns a resolved request into the single connect instruction handed to
//! the transport: explicit query parameters merged into the URL, header
//! names case-normalized, authentication applied, and matching cookies
//! folded into a `Cookie` header. Derivation failures belong to the render
//! channel and must happen before any lifecycle transition.

use std::collections::HashMap;

use serde::Serialize;
use url::Url;

use crate::auth::AuthDescriptor;
use crate::cookies::CookieJar;
use crate::models::ResolvedRequest;
use crate::render::RenderError;

/// The outbound instruction carried to the transport boundary.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectInstruction {
    /// Logical request id, used to correlate lifecycle transitions
    pub request_id: String,

    /// Canonical URL with all query parameters merged in
    pub url: String,

    /// Headers keyed by lowercased name; later duplicates win
    pub headers: HashMap<String, String>,

    /// Authentication descriptor for transports that negotiate themselves
    pub authentication: AuthDescriptor,

    /// Cookie jar snapshot the connection may consult later
    pub cookies: CookieJar,
}

/// Derives the canonical connect instruction from a resolved request.
///
/// # Errors
///
/// Returns [`RenderError::InvalidUrl`] when the resolved URL does not
/// parse; nothing is emitted to the transport in that case.
pub fn build_connect_instruction(
    resolved: &ResolvedRequest,
) -> Result<ConnectInstruction, RenderError> {
    let mut url = Url::parse(&resolved.url).map_err(|e| RenderError::InvalidUrl {
        url: resolved.url.clone(),
        message: e.to_string(),
    })?;

    // Explicit parameters are appended after any query already in the URL,
    // percent-encoding as needed.
    if !resolved.parameters.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for param in &resolved.parameters {
            pairs.append_pair(&param.name, &param.value);
        }
    }

    let mut headers: HashMap<String, String> = HashMap::new();
    for header in &resolved.headers {
        headers.insert(header.name.to_ascii_lowercase(), header.value.clone());
    }

    if let Some(value) = resolved.authentication.header_value() {
        headers.insert("authorization".to_string(), value);
    }

    if let Some(cookie_header) = resolved.cookies.header_for(&url) {
        match headers.get_mut("cookie") {
            Some(existing) => {
                existing.push_str("; ");
                existing.push_str(&cookie_header);
            }
            None => {
                headers.insert("cookie".to_string(), cookie_header);
            }
        }
    }

    Ok(ConnectInstruction {
        request_id: resolved.id.clone(),
        url: url.to_string(),
        headers,
        authentication: resolved.authentication.clone(),
        cookies: resolved.cookies.clone(),
    })
}
