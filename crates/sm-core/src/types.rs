//! Shared value types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Authentication token presented to the API server on every call.
///
/// `Debug` and `Display` never print the token itself, so an `ApiToken`
/// can sit inside configuration structs that get logged.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiToken(String);

impl ApiToken {
    /// Wrap a raw token string
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for handing to the credential provider
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// True when no token has been configured
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for ApiToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for ApiToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("ApiToken(<empty>)")
        } else {
            f.write_str("ApiToken(<redacted>)")
        }
    }
}

impl fmt::Display for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_debug_is_redacted() {
        let token = ApiToken::new("s3cr3t");
        assert_eq!(format!("{:?}", token), "ApiToken(<redacted>)");
        assert_eq!(format!("{}", token), "<redacted>");
        assert!(!format!("{:?}", token).contains("s3cr3t"));
    }

    #[test]
    fn test_empty_token_debug() {
        let token = ApiToken::default();
        assert!(token.is_empty());
        assert_eq!(format!("{:?}", token), "ApiToken(<empty>)");
    }

    #[test]
    fn test_token_serializes_transparently() {
        let token = ApiToken::from("abc");
        assert_eq!(serde_json::to_string(&token).unwrap(), r#""abc""#);
        let parsed: ApiToken = serde_json::from_str(r#""xyz""#).unwrap();
        assert_eq!(parsed.expose(), "xyz");
    }
}
