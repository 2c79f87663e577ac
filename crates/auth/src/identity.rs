//! Remote "whoami" identity endpoint.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use esgadmin_core::ActorId;

/// Payload returned by the identity endpoint.
///
/// Only `user_id` is required; any other field may be absent or `null`.
/// Unknown fields are ignored so the backend can add to the payload freely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityResponse {
    pub user_id: ActorId,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub access_level: Option<String>,
    #[serde(default)]
    pub approval_status: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub custom_permissions: HashMap<String, bool>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<HashMap<String, bool>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<HashMap<String, bool>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The credential was rejected (HTTP 401). Local session state is stale.
    #[error("credential rejected by identity endpoint")]
    Unauthorized,
    #[error("identity request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("API error ({0}): {1}")]
    Api(u16, String),
    #[error("parse error: {0}")]
    Parse(String),
}

impl IdentityError {
    /// Whether the failure means the session itself is no longer valid.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, IdentityError::Unauthorized)
    }
}

/// Source of the authenticated actor's identity.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn fetch_identity(&self, token: &str) -> Result<IdentityResponse, IdentityError>;
}

#[async_trait::async_trait]
impl<P> IdentityProvider for std::sync::Arc<P>
where
    P: IdentityProvider + ?Sized,
{
    async fn fetch_identity(&self, token: &str) -> Result<IdentityResponse, IdentityError> {
        (**self).fetch_identity(token).await
    }
}

/// HTTP client for the identity endpoint (`GET {api_url}{identity_path}`).
#[derive(Debug, Clone)]
pub struct HttpIdentityClient {
    client: reqwest::Client,
    url: String,
}

impl HttpIdentityClient {
    pub fn new(api_url: &str, identity_path: &str, timeout: Duration) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IdentityError::Network(e.to_string()))?;

        Ok(Self {
            client,
            url: join_url(api_url, identity_path),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

#[async_trait::async_trait]
impl IdentityProvider for HttpIdentityClient {
    async fn fetch_identity(&self, token: &str) -> Result<IdentityResponse, IdentityError> {
        let resp = self
            .client
            .get(&self.url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    IdentityError::Timeout
                } else {
                    IdentityError::Network(e.to_string())
                }
            })?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(IdentityError::Unauthorized);
        }
        if !status.is_success() {
            return Err(IdentityError::Api(
                status.as_u16(),
                resp.text().await.unwrap_or_default(),
            ));
        }

        resp.json::<IdentityResponse>()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    IdentityError::Timeout
                } else {
                    IdentityError::Parse(e.to_string())
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_payload_deserializes() {
        let body = serde_json::json!({
            "user_id": "a1b2",
            "role": "admin",
            "email": "esg@example.org",
            "full_name": "Esg Admin",
            "access_level": "full",
            "approval_status": "approved",
            "is_active": true,
            "custom_permissions": { "delete_faqs": true },
            "last_login": "2026-01-01T00:00:00Z"
        });
        let resp: IdentityResponse = serde_json::from_value(body).unwrap();
        assert_eq!(resp.user_id.as_str(), "a1b2");
        assert_eq!(resp.role.as_deref(), Some("admin"));
        assert_eq!(resp.is_active, Some(true));
        assert_eq!(resp.custom_permissions.get("delete_faqs"), Some(&true));
    }

    #[test]
    fn null_and_missing_fields_are_tolerated() {
        let body = serde_json::json!({ "user_id": 12, "role": null, "custom_permissions": null });
        let resp: IdentityResponse = serde_json::from_value(body).unwrap();
        assert_eq!(resp.role, None);
        assert!(resp.custom_permissions.is_empty());
    }

    #[test]
    fn missing_user_id_is_a_parse_failure() {
        let body = serde_json::json!({ "role": "admin" });
        assert!(serde_json::from_value::<IdentityResponse>(body).is_err());
    }

    #[test]
    fn urls_are_joined_with_a_single_slash() {
        assert_eq!(join_url("http://api/", "/api/auth/me"), "http://api/api/auth/me");
        assert_eq!(join_url("http://api", "api/auth/me"), "http://api/api/auth/me");
    }

    #[test]
    fn only_unauthorized_counts_as_expired_session() {
        assert!(IdentityError::Unauthorized.is_auth_expired());
        assert!(!IdentityError::Api(403, String::new()).is_auth_expired());
        assert!(!IdentityError::Timeout.is_auth_expired());
    }
}
