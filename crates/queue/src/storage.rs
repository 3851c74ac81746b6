use crate::{report, PublishError, QueuePublisher};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

const STORAGE_API_VERSION: &str = "2021-08-06";
const QUEUE_ALREADY_EXISTS: &str = "QueueAlreadyExists";

/// Publisher for a REST storage-queue service.
///
/// Queues are created on first use. Authentication is a SAS token appended
/// to every request as the query string.
pub struct StorageQueuePublisher {
    account_url: String,
    sas_token: Option<String>,
    http_client: reqwest::Client,
    provisioned: RwLock<HashSet<String>>,
}

impl StorageQueuePublisher {
    pub fn new(account_url: String, sas_token: Option<String>, timeout: Duration) -> Result<Arc<Self>> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Arc::new(Self {
            account_url: account_url.trim_end_matches('/').to_string(),
            sas_token: sas_token
                .map(|t| t.trim_start_matches('?').to_string())
                .filter(|t| !t.is_empty()),
            http_client,
            provisioned: RwLock::new(HashSet::new()),
        }))
    }

    fn url(&self, path: &str) -> String {
        match &self.sas_token {
            Some(sas) => format!("{}/{}?{}", self.account_url, path, sas),
            None => format!("{}/{}", self.account_url, path),
        }
    }

    async fn ensure_queue(&self, queue_name: &str) -> Result<(), PublishError> {
        if self.provisioned.read().await.contains(queue_name) {
            return Ok(());
        }

        let resp = self
            .http_client
            .put(self.url(queue_name))
            .header("x-ms-version", STORAGE_API_VERSION)
            .header("Content-Length", "0")
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::CREATED || status == StatusCode::NO_CONTENT {
            tracing::info!(queue = %queue_name, status = %status, "Queue ready");
            self.provisioned.write().await.insert(queue_name.to_string());
            return Ok(());
        }

        let headers = resp.headers().clone();
        let body = resp.text().await.unwrap_or_default();
        let code = error_code(&headers, &body);
        if status == StatusCode::CONFLICT && code.as_deref() == Some(QUEUE_ALREADY_EXISTS) {
            // Another caller created it first; later publishes can skip the PUT.
            self.provisioned.write().await.insert(queue_name.to_string());
            return Err(PublishError::QueueAlreadyExists(queue_name.to_string()));
        }

        Err(PublishError::Rejected {
            status: status.as_u16(),
            code,
            body,
        })
    }

    async fn post_message(&self, queue_name: &str, message: &str) -> Result<(), PublishError> {
        let body = format!(
            "<QueueMessage><MessageText>{}</MessageText></QueueMessage>",
            escape_xml(message)
        );

        let resp = self
            .http_client
            .post(self.url(&format!("{queue_name}/messages")))
            .header("x-ms-version", STORAGE_API_VERSION)
            .header("Content-Type", "application/xml")
            .body(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let headers = resp.headers().clone();
            let body = resp.text().await.unwrap_or_default();
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                code: error_code(&headers, &body),
                body,
            });
        }

        Ok(())
    }

    async fn try_publish(&self, queue_name: &str, message: &str) -> Result<(), PublishError> {
        if !is_valid_queue_name(queue_name) {
            return Err(PublishError::InvalidQueueName(queue_name.to_string()));
        }
        self.ensure_queue(queue_name).await?;
        self.post_message(queue_name, message).await
    }
}

#[async_trait]
impl QueuePublisher for StorageQueuePublisher {
    async fn publish(&self, queue_name: &str, message: &str) -> bool {
        report(queue_name, self.try_publish(queue_name, message).await)
    }
}

/// Service error code: the `x-ms-error-code` header, else `<Error><Code>`.
fn error_code(headers: &HeaderMap, body: &str) -> Option<String> {
    if let Some(code) = headers
        .get("x-ms-error-code")
        .and_then(|v| v.to_str().ok())
    {
        return Some(code.to_string());
    }

    let doc = roxmltree::Document::parse(body.trim_start_matches('\u{feff}')).ok()?;
    doc.root_element()
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == "Code")
        .and_then(|n| n.text())
        .map(|s| s.trim().to_string())
}

// 3-63 chars, lowercase letters, digits and single dashes, alphanumeric ends.
fn is_valid_queue_name(name: &str) -> bool {
    (3..=63).contains(&name.len())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !name.starts_with('-')
        && !name.ends_with('-')
        && !name.contains("--")
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_prefers_header_then_body() {
        let mut headers = HeaderMap::new();
        let body = r#"<?xml version="1.0" encoding="utf-8"?><Error><Code>QueueBeingDeleted</Code><Message>x</Message></Error>"#;
        assert_eq!(error_code(&headers, body).as_deref(), Some("QueueBeingDeleted"));

        headers.insert("x-ms-error-code", "QueueAlreadyExists".parse().unwrap());
        assert_eq!(error_code(&headers, body).as_deref(), Some("QueueAlreadyExists"));

        assert_eq!(error_code(&HeaderMap::new(), "not xml"), None);
    }

    #[test]
    fn queue_names_follow_service_rules() {
        assert!(is_valid_queue_name("invoicenotification"));
        assert!(is_valid_queue_name("invoice-notification-2"));
        assert!(!is_valid_queue_name("Invoices"));
        assert!(!is_valid_queue_name("ab"));
        assert!(!is_valid_queue_name("-invoices"));
        assert!(!is_valid_queue_name("in--voices"));
    }
}
