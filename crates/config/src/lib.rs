use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

const APP_NAME: &str = "payment-invoice-approvals";
const KEYCHAIN_SERVICE: &str = "payment.invoice.approvals";

/// Environment variable consulted for the storage queue SAS token.
pub const QUEUE_SAS_ENV: &str = "INVOICE_QUEUE_SAS_TOKEN";
/// Keychain entry holding the storage queue SAS token.
pub const QUEUE_SAS_KEY: &str = "queue.sas_token";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub invoice_api: ServiceConfig,
    #[serde(default)]
    pub approval_api: ServiceConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
}

/// A backend REST service. Secrets are looked up at wiring time, never stored here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_kind")]
    pub kind: String, // "mock" | "http"
    pub base_url: Option<String>,
    /// Env var holding a static bearer key.
    pub api_key_env: Option<String>,
    /// OAuth2 client-credentials; the secret comes from `resolve_secret`.
    pub client_id: Option<String>,
    pub token_url: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            kind: default_service_kind(),
            base_url: None,
            api_key_env: None,
            client_id: None,
            token_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_queue_kind")]
    pub kind: String, // "mock" | "storage" | "local"
    pub account_url: Option<String>,
    #[serde(default = "default_queue_name")]
    pub queue_name: String,
    #[serde(default = "default_local_path")]
    pub local_path: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            kind: default_queue_kind(),
            account_url: None,
            queue_name: default_queue_name(),
            local_path: default_local_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default = "default_base_uri")]
    pub base_uri: String,
    #[serde(default = "default_acting_user")]
    pub acting_user: String,
    pub audit_log: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            base_uri: default_base_uri(),
            acting_user: default_acting_user(),
            audit_log: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_service_kind() -> String {
    "mock".to_string()
}

fn default_queue_kind() -> String {
    "mock".to_string()
}

fn default_queue_name() -> String {
    "invoicenotification".to_string()
}

fn default_local_path() -> String {
    ".invoice_queue".to_string()
}

fn default_base_uri() -> String {
    "http://localhost".to_string()
}

fn default_acting_user() -> String {
    "user".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

pub fn load() -> Result<AppConfig> {
    let cfg: AppConfig = confy::load(APP_NAME, None).context("Failed to load app config")?;
    Ok(cfg)
}

/// Load from an explicit file; a missing file is created with defaults.
pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig> {
    let path = path.as_ref();
    let cfg: AppConfig = confy::load_path(path)
        .with_context(|| format!("Failed to load app config from {}", path.display()))?;
    Ok(cfg)
}

pub fn store_to(path: impl AsRef<Path>, cfg: &AppConfig) -> Result<()> {
    let path = path.as_ref();
    confy::store_path(path, cfg)
        .with_context(|| format!("Failed to store app config to {}", path.display()))?;
    Ok(())
}

/// Retrieve a secret from the OS keychain
pub fn get_secret(key: &str) -> Result<String> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, key)?;
    let password = entry.get_password()?;
    Ok(password)
}

/// Environment first, then the keychain. `None` when neither has it.
pub fn resolve_secret(env_var: Option<&str>, keychain_key: &str) -> Option<String> {
    if let Some(value) = env_var
        .and_then(|name| std::env::var(name).ok())
        .filter(|v| !v.is_empty())
    {
        return Some(value);
    }

    match get_secret(keychain_key) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(key = %keychain_key, error = %e, "Secret not found in keychain");
            None
        }
    }
}
