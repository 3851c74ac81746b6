use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// One line of the workflow audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub event_type: String,
    pub invoice_id: String,
    pub scheme: String,
    pub status: String,
    pub actor: Option<String>,
    /// SHA-256 of the queued message.
    pub message_hash: Option<String>,
    pub error: Option<String>,
}

impl AuditEvent {
    pub fn new(event_type: &str, invoice_id: &str, scheme: &str, status: &str) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            event_type: event_type.to_string(),
            invoice_id: invoice_id.to_string(),
            scheme: scheme.to_string(),
            status: status.to_string(),
            actor: None,
            message_hash: None,
            error: None,
        }
    }

    pub fn with_actor(mut self, actor: &str) -> Self {
        self.actor = Some(actor.to_string());
        self
    }

    pub fn with_hash(mut self, hash: String) -> Self {
        self.message_hash = Some(hash);
        self
    }

    pub fn with_error(mut self, error: String) -> Self {
        self.error = Some(error);
        self
    }
}

/// Append-only JSONL audit file.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, event: &AuditEvent) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open audit log {}", self.path.display()))?;

        let json = serde_json::to_string(event)?;
        writeln!(file, "{}", json)?;
        tracing::debug!(event_type = %event.event_type, invoice_id = %event.invoice_id, "Audit event written");
        Ok(())
    }

    pub fn read_all(&self) -> Result<Vec<AuditEvent>> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read audit log {}", self.path.display()))?;
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).context("Malformed audit line"))
            .collect()
    }
}

pub fn compute_sha256_hex(message: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(message.as_bytes());
    let bytes = hasher.finalize();
    hex::encode(bytes)
}
