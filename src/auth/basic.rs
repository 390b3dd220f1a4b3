//! HTTP Basic authentication (RFC 7617).

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Builds a Basic auth header value from credentials.
///
/// Joins username and password with a colon and base64-encodes the result:
/// `Basic <base64(username:password)>`.
pub fn basic_auth(username: &str, password: &str) -> String {
    let credentials = format!("{}:{}", username, password);
    format!("Basic {}", STANDARD.encode(credentials))
}

/// Parses a Basic auth header value back into credentials.
///
/// Returns `None` if the value is not a well-formed Basic header. The
/// password may itself contain colons; only the first colon splits.
pub fn parse_basic_auth_header(header: &str) -> Option<(String, String)> {
    let encoded = header.trim().strip_prefix("Basic ")?.trim();
    let decoded = STANDARD.decode(encoded).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (username, password) = text.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_auth_encoding() {
        assert_eq!(basic_auth("user", "pass"), "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn test_round_trip() {
        let header = basic_auth("alice", "s3cret");
        let (user, pass) = parse_basic_auth_header(&header).unwrap();
        assert_eq!(user, "alice");
        assert_eq!(pass, "s3cret");
    }

    #[test]
    fn test_password_with_colon() {
        let header = basic_auth("bob", "pa:ss");
        let (user, pass) = parse_basic_auth_header(&header).unwrap();
        assert_eq!(user, "bob");
        assert_eq!(pass, "pa:ss");
    }

    #[test]
    fn test_empty_credentials() {
        let header = basic_auth("", "");
        let (user, pass) = parse_basic_auth_header(&header).unwrap();
        assert_eq!(user, "");
        assert_eq!(pass, "");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_basic_auth_header("Bearer xyz").is_none());
        assert!(parse_basic_auth_header("Basic !!!").is_none());
        assert!(parse_basic_auth_header("Basic bm9jb2xvbg==").is_none()); // "nocolon"
    }
}
