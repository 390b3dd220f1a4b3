//! Cookie jar snapshots for outbound connections.
//!
//! The jar is a read-only snapshot taken at context-build time. During
//! canonicalization the dispatcher selects the cookies matching the
//! resolved host and path and folds them into a single `Cookie` header.
//! Cookie values may carry template tags; they are resolved along with the
//! rest of the request structure.

use serde::{Deserialize, Serialize};
use url::Url;

/// A single stored cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name
    pub name: String,

    /// Cookie value, may be template-bearing before resolution
    pub value: String,

    /// Domain the cookie belongs to (a leading dot is ignored)
    pub domain: String,

    /// Path prefix the cookie applies to
    #[serde(default = "root_path")]
    pub path: String,

    /// Whether the cookie is restricted to secure schemes (wss/https)
    #[serde(default)]
    pub secure: bool,
}

fn root_path() -> String {
    "/".to_string()
}

impl Cookie {
    /// Creates a cookie scoped to a domain with the root path.
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: root_path(),
            secure: false,
        }
    }

    /// Whether this cookie applies to the given request URL.
    ///
    /// Domain matching follows the usual suffix rule: the cookie for
    /// `example.com` matches `example.com` and `api.example.com`. The
    /// request path must start with the cookie path, and secure cookies
    /// only match `wss`/`https` schemes.
    pub fn matches(&self, url: &Url) -> bool {
        let host = match url.host_str() {
            Some(host) => host,
            None => return false,
        };

        let domain = self.domain.trim_start_matches('.');
        let domain_ok = host == domain || host.ends_with(&format!(".{}", domain));
        let path_ok = url.path().starts_with(self.path.as_str());
        let scheme_ok = !self.secure || matches!(url.scheme(), "wss" | "https");

        domain_ok && path_ok && scheme_ok
    }
}

/// An ordered collection of cookies, matched against request URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieJar {
    cookies: Vec<Cookie>,
}

impl CookieJar {
    /// Creates an empty jar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a jar from a list of cookies, keeping their order.
    pub fn from_cookies(cookies: Vec<Cookie>) -> Self {
        Self { cookies }
    }

    /// Adds a cookie to the jar.
    pub fn add(&mut self, cookie: Cookie) {
        self.cookies.push(cookie);
    }

    /// All cookies in insertion order.
    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    /// Checks whether the jar holds no cookies.
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Builds the `Cookie` header value for a request URL.
    ///
    /// Matching cookies are joined as `name=value; name=value` in insertion
    /// order. Returns `None` when nothing matches.
    pub fn header_for(&self, url: &Url) -> Option<String> {
        let pairs: Vec<String> = self
            .cookies
            .iter()
            .filter(|c| c.matches(url))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();

        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }
}
