use crate::approvals::{ApprovalService, WorkflowSettings};
use crate::audit::AuditLog;
use access_point::mock::{MockApprovalApi, MockInvoiceApi};
use access_point::{ApprovalApi, HttpApprovalApi, HttpInvoiceApi, InvoiceApi, ServiceAuth};
use anyhow::{anyhow, Result};
use config::{AppConfig, QueueConfig, ServiceConfig, QUEUE_SAS_ENV, QUEUE_SAS_KEY};
use queue::mock::MockPublisher;
use queue::{LocalQueue, QueuePublisher, StorageQueuePublisher};
use std::sync::Arc;
use std::time::Duration;

/// Wire an [`ApprovalService`] from configuration.
pub fn build_service(cfg: &AppConfig) -> Result<ApprovalService> {
    let timeout = Duration::from_secs(cfg.workflow.request_timeout_secs);

    let invoices = create_invoice_api(&cfg.invoice_api, timeout)?;
    let approvals = create_approval_api(&cfg.approval_api, timeout)?;
    let publisher = create_publisher(&cfg.queue, timeout)?;

    let settings = WorkflowSettings {
        queue_name: cfg.queue.queue_name.clone(),
        base_uri: cfg.workflow.base_uri.clone(),
        acting_user: cfg.workflow.acting_user.clone(),
    };

    let service = ApprovalService::new(invoices, approvals, publisher, settings);
    Ok(match &cfg.workflow.audit_log {
        Some(path) => service.with_audit_log(AuditLog::new(path)),
        None => service,
    })
}

pub fn create_invoice_api(cfg: &ServiceConfig, timeout: Duration) -> Result<Arc<dyn InvoiceApi>> {
    match cfg.kind.as_str() {
        "http" => {
            let base_url = cfg
                .base_url
                .clone()
                .ok_or_else(|| anyhow!("invoice_api base_url not configured"))?;
            let auth = service_auth("invoice_api", cfg)?;
            Ok(HttpInvoiceApi::new(base_url, auth, timeout)?)
        }
        "mock" => {
            tracing::info!("Using mock invoice API");
            Ok(MockInvoiceApi::new())
        }
        other => Err(anyhow!("unknown invoice_api kind `{other}`")),
    }
}

pub fn create_approval_api(cfg: &ServiceConfig, timeout: Duration) -> Result<Arc<dyn ApprovalApi>> {
    match cfg.kind.as_str() {
        "http" => {
            let base_url = cfg
                .base_url
                .clone()
                .ok_or_else(|| anyhow!("approval_api base_url not configured"))?;
            let auth = service_auth("approval_api", cfg)?;
            Ok(HttpApprovalApi::new(base_url, auth, timeout)?)
        }
        "mock" => {
            tracing::info!("Using mock approval API");
            Ok(MockApprovalApi::new())
        }
        other => Err(anyhow!("unknown approval_api kind `{other}`")),
    }
}

pub fn create_publisher(cfg: &QueueConfig, timeout: Duration) -> Result<Arc<dyn QueuePublisher>> {
    match cfg.kind.as_str() {
        "storage" => {
            let account_url = cfg
                .account_url
                .clone()
                .ok_or_else(|| anyhow!("queue account_url not configured"))?;
            let sas_token = config::resolve_secret(Some(QUEUE_SAS_ENV), QUEUE_SAS_KEY);
            if sas_token.is_none() {
                tracing::warn!("No queue SAS token found; requests will be unauthenticated");
            }
            Ok(StorageQueuePublisher::new(account_url, sas_token, timeout)?)
        }
        "local" => Ok(LocalQueue::open(&cfg.local_path)?),
        "mock" => {
            tracing::info!("Using mock queue publisher");
            Ok(MockPublisher::new())
        }
        other => Err(anyhow!("unknown queue kind `{other}`")),
    }
}

/// API key first (env or keychain), then OAuth2 client credentials, else none.
fn service_auth(section: &str, cfg: &ServiceConfig) -> Result<ServiceAuth> {
    let prefix = section.to_uppercase();

    if let Some(key) = config::resolve_secret(cfg.api_key_env.as_deref(), &format!("{section}.api_key")) {
        tracing::info!(service = %section, "Using API key auth");
        return Ok(ServiceAuth::ApiKey { key });
    }

    let Some(client_id) = cfg.client_id.clone() else {
        tracing::info!(service = %section, "No service credentials configured");
        return Ok(ServiceAuth::Anonymous);
    };

    let client_secret = config::resolve_secret(
        Some(&format!("{prefix}_CLIENT_SECRET")),
        &format!("{section}.client_secret"),
    )
    .ok_or_else(|| anyhow!("{section} client_secret not found in env or keychain"))?;

    let token_url = match (&cfg.token_url, &cfg.base_url) {
        (Some(url), _) => url.clone(),
        (None, Some(base)) => format!("{}/oauth/token", base.trim_end_matches('/')),
        (None, None) => return Err(anyhow!("{section} token_url not configured")),
    };

    tracing::info!(service = %section, "Using OAuth2 auth");
    Ok(ServiceAuth::OAuth2 {
        client_id,
        client_secret,
        token_url,
    })
}
