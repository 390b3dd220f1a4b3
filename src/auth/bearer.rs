//! Bearer token authentication (RFC 6750).

/// Builds a bearer-style auth header value: `<prefix> <token>`.
pub fn bearer_token(prefix: &str, token: &str) -> String {
    format!("{} {}", prefix, token)
}

/// Extracts the token from a `Bearer <token>` header value.
pub fn parse_bearer_token_header(header: &str) -> Option<String> {
    let token = header.trim().strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}
