/*!
 * # Access Gate
 *
 * Every API call presents a single shared token, either as the `access_token`
 * field of the JSON body or as the `access_token` query parameter. The gate
 * compares it against the configured value and, on success, hands out an
 * [`AuthContext`]. Service methods take the context as their first argument,
 * so an unauthorized call cannot reach the datastore.
 */

use crate::{config::AppConfig, errors::ServiceError};
use std::{fmt, sync::Arc};
use tracing::warn;

/// Body field and query parameter carrying the token
pub const ACCESS_TOKEN_FIELD: &str = "access_token";

pub const INVALID_TOKEN_MESSAGE: &str = "Invalid access token.";

/// Holds the accepted token and authorizes presented ones.
#[derive(Clone)]
pub struct AccessGate {
    accepted: Arc<str>,
}

impl AccessGate {
    pub fn new(accepted: impl Into<String>) -> Self {
        Self {
            accepted: Arc::from(accepted.into()),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.accepted_token.clone())
    }

    /// Checks a presented token by exact equality.
    ///
    /// A missing token is refused the same way as a wrong one.
    pub fn authorize(&self, presented: Option<&str>) -> Result<AuthContext, ServiceError> {
        match presented {
            Some(token) if token == &*self.accepted => Ok(AuthContext { _private: () }),
            Some(_) => {
                warn!("Rejected request with mismatched access token");
                Err(ServiceError::Forbidden(INVALID_TOKEN_MESSAGE.to_string()))
            }
            None => {
                warn!("Rejected request without access token");
                Err(ServiceError::Forbidden(INVALID_TOKEN_MESSAGE.to_string()))
            }
        }
    }
}

// The accepted token must never end up in logs.
impl fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessGate")
            .field("accepted", &"<redacted>")
            .finish()
    }
}

/// Proof that the current request passed the [`AccessGate`].
///
/// Only [`AccessGate::authorize`] can construct one.
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    _private: (),
}

/// Picks the token to check: a non-empty body token wins over the query one.
pub fn presented_token<'a>(body: Option<&'a str>, query: Option<&'a str>) -> Option<&'a str> {
    body.filter(|token| !token.is_empty())
        .or_else(|| query.filter(|token| !token.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    fn gate() -> AccessGate {
        AccessGate::new("omni_pretest_token")
    }

    #[test]
    fn matching_token_is_authorized() {
        assert!(gate().authorize(Some("omni_pretest_token")).is_ok());
    }

    #[rstest]
    #[case::missing(None)]
    #[case::wrong(Some("invalid_token"))]
    #[case::different_case(Some("OMNI_PRETEST_TOKEN"))]
    #[case::trailing_space(Some("omni_pretest_token "))]
    fn other_tokens_are_forbidden(#[case] presented: Option<&str>) {
        assert_matches!(
            gate().authorize(presented),
            Err(ServiceError::Forbidden(msg)) if msg == INVALID_TOKEN_MESSAGE
        );
    }

    #[test]
    fn body_token_takes_precedence_over_query() {
        assert_eq!(presented_token(Some("body"), Some("query")), Some("body"));
        assert_eq!(presented_token(None, Some("query")), Some("query"));
        assert_eq!(presented_token(Some(""), Some("query")), Some("query"));
        assert_eq!(presented_token(None, None), None);
    }

    #[test]
    fn debug_output_redacts_token() {
        let rendered = format!("{:?}", gate());
        assert!(!rendered.contains("omni_pretest_token"));
    }
}
