use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::{CurrentUser, UserLookupError, UserProvider};

// Auth verification response; session fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifiedIdentity {
    pub user_id: u64,
    pub display_name: String,
}

#[derive(Debug, Serialize)]
struct VerifyTokenRequest<'a> {
    token: &'a str,
}

// Thin reqwest client for auth token verification.
#[derive(Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    base_url: String,
}

impl AuthClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url: String = base_url.into();
        // Paths are appended with a leading slash.
        let base_url = base_url.trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl UserProvider for AuthClient {
    async fn current_user(&self, token: &str) -> Result<Option<CurrentUser>, UserLookupError> {
        if token.trim().is_empty() {
            return Ok(None);
        }

        let url = format!("{}/auth/verify-token", self.base_url);
        let response = self
            .http
            .post(url)
            .json(&VerifyTokenRequest { token })
            .send()
            .await
            .map_err(|err| UserLookupError::Unavailable(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            // Invalid and expired sessions both mean "not signed in".
            return Ok(None);
        }
        if !status.is_success() {
            return Err(UserLookupError::Unavailable(format!(
                "auth responded with {status}"
            )));
        }

        let identity = response
            .json::<VerifiedIdentity>()
            .await
            .map_err(|err| UserLookupError::Unavailable(err.to_string()))?;
        Ok(Some(CurrentUser {
            user_id: identity.user_id,
            display_name: identity.display_name,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn when_token_is_blank_then_no_request_is_made_and_viewer_is_guest() {
        // Port 9 is discard; a request here would fail rather than return None.
        let client = AuthClient::new("http://127.0.0.1:9", Duration::from_millis(50))
            .expect("expected client to build");

        let user = client.current_user("  ").await.expect("expected guest");

        assert_eq!(user, None);
    }

    #[tokio::test]
    async fn when_auth_is_unreachable_then_lookup_is_unavailable() {
        let client = AuthClient::new("http://127.0.0.1:9", Duration::from_millis(200))
            .expect("expected client to build");

        let result = client.current_user("token").await;

        assert!(matches!(result, Err(UserLookupError::Unavailable(_))));
    }

    #[test]
    fn when_auth_reports_session_fields_then_identity_still_decodes() {
        let identity: VerifiedIdentity = serde_json::from_str(
            r#"{"user_id":42,"display_name":"Pilot","session_id":"s-1","expires_at":10}"#,
        )
        .expect("expected identity");

        assert_eq!(identity.user_id, 42);
        assert_eq!(identity.display_name, "Pilot");
    }

    #[test]
    fn when_base_url_has_trailing_slash_then_it_is_trimmed() {
        let client = AuthClient::new("http://127.0.0.1:3002/", Duration::from_millis(50))
            .expect("expected client to build");

        assert_eq!(client.base_url(), "http://127.0.0.1:3002");
    }
}
