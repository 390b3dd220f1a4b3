//! Authentication descriptors for outbound connections.
//!
//! A request carries an [`AuthDescriptor`] whose fields may contain
//! template tags; after resolution the descriptor produces the concrete
//! `Authorization` header value applied during request canonicalization.

pub mod basic;
pub mod bearer;

use serde::{Deserialize, Serialize};

/// Authentication scheme attached to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthDescriptor {
    /// No authentication
    #[default]
    None,

    /// HTTP Basic authentication (RFC 7617)
    Basic {
        /// User name, may be template-bearing before resolution
        username: String,
        /// Password, may be template-bearing before resolution
        password: String,
    },

    /// Bearer token authentication (RFC 6750)
    Bearer {
        /// The token value
        token: String,
        /// Scheme prefix, usually "Bearer"
        #[serde(default = "default_bearer_prefix")]
        prefix: String,
    },
}

fn default_bearer_prefix() -> String {
    "Bearer".to_string()
}

impl AuthDescriptor {
    /// Convenience constructor for Basic auth.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        AuthDescriptor::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Convenience constructor for Bearer auth with the standard prefix.
    pub fn bearer(token: impl Into<String>) -> Self {
        AuthDescriptor::Bearer {
            token: token.into(),
            prefix: default_bearer_prefix(),
        }
    }

    /// Builds the `Authorization` header value, or `None` for
    /// [`AuthDescriptor::None`].
    pub fn header_value(&self) -> Option<String> {
        match self {
            AuthDescriptor::None => None,
            AuthDescriptor::Basic { username, password } => {
                Some(basic::basic_auth(username, password))
            }
            AuthDescriptor::Bearer { token, prefix } => Some(bearer::bearer_token(prefix, token)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_has_no_header() {
        assert_eq!(AuthDescriptor::None.header_value(), None);
    }

    #[test]
    fn test_basic_header() {
        let auth = AuthDescriptor::basic("user", "pass");
        assert_eq!(auth.header_value().unwrap(), "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn test_bearer_header() {
        let auth = AuthDescriptor::bearer("token-123");
        assert_eq!(auth.header_value().unwrap(), "Bearer token-123");
    }

    #[test]
    fn test_bearer_custom_prefix() {
        let auth = AuthDescriptor::Bearer {
            token: "abc".to_string(),
            prefix: "Token".to_string(),
        };
        assert_eq!(auth.header_value().unwrap(), "Token abc");
    }

    #[test]
    fn test_serde_tagged_round_trip() {
        let auth = AuthDescriptor::basic("{{ user }}", "{{ pass }}");
        let json = serde_json::to_string(&auth).unwrap();
        assert!(json.contains("\"type\":\"basic\""));

        let back: AuthDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, auth);
    }

    #[test]
    fn test_default_is_none() {
        assert_eq!(AuthDescriptor::default(), AuthDescriptor::None);
    }
}
