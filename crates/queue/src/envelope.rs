//! Event envelope carried by every queued notification.
//!
//! On the wire a message is the base64 of the JSON envelope:
//!
//! ```json
//! { "name": "Payments",
//!   "properties": { "status": "", "checkpoint": "",
//!     "action": { "type": "", "message": "approved",
//!                 "timestamp": "...", "data": "{...notification...}" } } }
//! ```

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub properties: EventProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventProperties {
    pub status: String,
    pub checkpoint: String,
    pub action: EventAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventAction {
    #[serde(rename = "type")]
    pub kind: String,
    /// Workflow status that triggered the event.
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Serialized notification payload.
    pub data: String,
}

impl Event {
    pub fn payments(message: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            name: "Payments".to_string(),
            properties: EventProperties {
                status: String::new(),
                checkpoint: String::new(),
                action: EventAction {
                    kind: String::new(),
                    message: message.into(),
                    timestamp: Utc::now(),
                    data: data.into(),
                },
            },
        }
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        let json = serde_json::to_vec(self)?;
        Ok(STANDARD.encode(json))
    }

    pub fn decode(encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .context("Queued message is not valid base64")?;
        serde_json::from_slice(&bytes).context("Queued message is not an event envelope")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_message_is_base64_json() {
        let event = Event::payments("approved", r#"{"id":"X"}"#);
        let encoded = event.encode().unwrap();

        let raw = STANDARD.decode(&encoded).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(json["name"], "Payments");
        assert_eq!(json["properties"]["status"], "");
        assert_eq!(json["properties"]["action"]["type"], "");
        assert_eq!(json["properties"]["action"]["message"], "approved");
        assert_eq!(json["properties"]["action"]["data"], r#"{"id":"X"}"#);

        assert_eq!(Event::decode(&encoded).unwrap(), event);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(Event::decode("not base64!").is_err());
        assert!(Event::decode(&STANDARD.encode("[]")).is_err());
    }
}
