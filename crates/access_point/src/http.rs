use crate::auth::{Authenticator, ServiceAuth};
use crate::{RemoteCall, RemoteError};
use anyhow::{Context, Result};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Build `{prefix}/{segment}/...` with every segment percent-encoded.
///
/// Empty, `.` and `..` segments are refused: URL normalisation would
/// silently route them elsewhere.
pub(crate) fn route(prefix: &str, segments: &[&str]) -> Result<String, RemoteError> {
    let mut route = prefix.trim_end_matches('/').to_string();
    for segment in segments {
        if segment.is_empty() || *segment == "." || *segment == ".." {
            return Err(RemoteError::InvalidInput(format!(
                "`{segment}` is not a valid path segment"
            )));
        }
        route.push('/');
        route.push_str(&urlencoding::encode(segment));
    }
    Ok(route)
}

/// Shared plumbing for the backend JSON services.
#[derive(Clone)]
pub(crate) struct ServiceClient {
    base_url: String,
    authenticator: Authenticator,
    http_client: reqwest::Client,
}

impl ServiceClient {
    pub(crate) fn new(base_url: String, auth: ServiceAuth, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            authenticator: Authenticator::new(auth),
            http_client,
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn request(&self, method: Method, route: &str) -> RequestBuilder {
        self.http_client
            .request(method, format!("{}{}", self.base_url, route))
    }

    /// Send `req` and decode a JSON body.
    ///
    /// `Ok(None)` means a 2xx with an empty body.
    pub(crate) async fn execute<T: DeserializeOwned>(
        &self,
        call: RemoteCall,
        req: RequestBuilder,
    ) -> Result<Option<T>, RemoteError> {
        let body = self.send(call, req).await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }

    /// Send `req`, returning the raw body of a 2xx response.
    pub(crate) async fn send(
        &self,
        call: RemoteCall,
        req: RequestBuilder,
    ) -> Result<String, RemoteError> {
        let req = match self.authenticator.header(&self.http_client).await? {
            Some(value) => req.header("Authorization", value),
            None => req,
        };

        let resp = req.send().await.map_err(|e| {
            tracing::warn!(call = %call, error = %e, "Backend unreachable");
            RemoteError::Transport(e.to_string())
        })?;

        let status = resp.status();
        // A status line arrived, so a broken body is not a transport failure.
        let body = resp
            .text()
            .await
            .map_err(|e| RemoteError::Decode(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                self.authenticator.invalidate().await;
            }
            tracing::warn!(call = %call, status = %status, "Backend rejected request");
            return Err(RemoteError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(call = %call, status = %status, "Backend call succeeded");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_encodes_each_segment() {
        assert_eq!(route("/invoice", &["EU", "42"]).unwrap(), "/invoice/EU/42");
        assert_eq!(
            route("/approvals/validate", &["a?x=1"]).unwrap(),
            "/approvals/validate/a%3Fx%3D1"
        );
        assert_eq!(
            route("/approvals/validate", &["a/../b"]).unwrap(),
            "/approvals/validate/a%2F..%2Fb"
        );
        assert_eq!(route("/invoice/", &["a b#c"]).unwrap(), "/invoice/a%20b%23c");
    }

    #[test]
    fn route_refuses_dot_and_empty_segments() {
        for bad in ["", ".", ".."] {
            assert!(matches!(
                route("/invoice", &["EU", bad]),
                Err(RemoteError::InvalidInput(_))
            ));
        }
    }
}
