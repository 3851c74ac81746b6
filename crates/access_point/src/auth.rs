use crate::RemoteError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Refresh this long before the advertised expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// How a backend service expects to be authenticated.
#[derive(Clone, Default)]
pub enum ServiceAuth {
    #[default]
    Anonymous,
    ApiKey {
        key: String,
    },
    OAuth2 {
        client_id: String,
        client_secret: String,
        token_url: String,
    },
}

impl std::fmt::Debug for ServiceAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceAuth::Anonymous => f.write_str("Anonymous"),
            ServiceAuth::ApiKey { .. } => f.write_str("ApiKey"),
            ServiceAuth::OAuth2 {
                client_id,
                token_url,
                ..
            } => f
                .debug_struct("OAuth2")
                .field("client_id", client_id)
                .field("token_url", token_url)
                .finish(),
        }
    }
}

#[derive(Debug, Serialize)]
struct OAuth2TokenRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
}

#[derive(Debug, Deserialize)]
struct OAuth2TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    /// `None` when the token endpoint gave no lifetime.
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        self.expires_at.map_or(true, |at| Instant::now() < at)
    }
}

/// Resolves the `Authorization` header, caching client-credentials tokens.
#[derive(Clone)]
pub(crate) struct Authenticator {
    auth: ServiceAuth,
    access_token: Arc<RwLock<Option<CachedToken>>>,
}

impl Authenticator {
    pub(crate) fn new(auth: ServiceAuth) -> Self {
        Self {
            auth,
            access_token: Arc::new(RwLock::new(None)),
        }
    }

    pub(crate) async fn header(
        &self,
        http_client: &reqwest::Client,
    ) -> Result<Option<String>, RemoteError> {
        match &self.auth {
            ServiceAuth::Anonymous => Ok(None),
            ServiceAuth::ApiKey { key } => Ok(Some(format!("Bearer {}", key))),
            ServiceAuth::OAuth2 {
                client_id,
                client_secret,
                token_url,
            } => {
                {
                    let token_read = self.access_token.read().await;
                    if let Some(t) = token_read.as_ref().filter(|t| t.is_fresh()) {
                        return Ok(Some(format!("Bearer {}", t.value)));
                    }
                }

                let req_body = OAuth2TokenRequest {
                    grant_type: "client_credentials",
                    client_id,
                    client_secret,
                };

                let resp = http_client
                    .post(token_url)
                    .json(&req_body)
                    .send()
                    .await
                    .map_err(|e| RemoteError::Transport(e.to_string()))?;

                if !resp.status().is_success() {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    return Err(RemoteError::Auth(format!(
                        "token request failed: {} - {}",
                        status, body
                    )));
                }

                let token_resp: OAuth2TokenResponse = resp
                    .json()
                    .await
                    .map_err(|e| RemoteError::Auth(format!("invalid token response: {e}")))?;

                let expires_at = token_resp.expires_in.map(|secs| {
                    Instant::now() + Duration::from_secs(secs).saturating_sub(EXPIRY_MARGIN)
                });
                let mut token_write = self.access_token.write().await;
                *token_write = Some(CachedToken {
                    value: token_resp.access_token.clone(),
                    expires_at,
                });
                tracing::debug!(expires_in = ?token_resp.expires_in, "Cached service access token");

                Ok(Some(format!("Bearer {}", token_resp.access_token)))
            }
        }
    }

    /// Drop a cached token, e.g. after the service answered 401.
    pub(crate) async fn invalidate(&self) {
        *self.access_token.write().await = None;
    }
}
