use async_trait::async_trait;

pub mod envelope;
pub mod local;
pub mod mock;
pub mod storage;

pub use envelope::Event;
pub use local::LocalQueue;
pub use storage::StorageQueuePublisher;

pub const DEFAULT_QUEUE_NAME: &str = "invoicenotification";

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// Lost a create race with another first-use of the same queue.
    #[error("queue `{0}` already exists")]
    QueueAlreadyExists(String),
    #[error("invalid queue name `{0}`")]
    InvalidQueueName(String),
    #[error("queue service rejected request with {status}: {body}")]
    Rejected {
        status: u16,
        code: Option<String>,
        body: String,
    },
    #[error("queue service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("local queue storage error: {0}")]
    Storage(#[from] sled::Error),
    #[error("failed to encode queued message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Pushes serialized notification messages onto a named queue.
#[async_trait]
pub trait QueuePublisher: Send + Sync {
    /// One enqueue attempt; `true` only when the queue confirmed the message.
    /// Failures are logged here and never surface as errors.
    async fn publish(&self, queue_name: &str, message: &str) -> bool;
}

/// Log the outcome of a publish attempt and flatten it to a bool.
pub(crate) fn report(queue_name: &str, result: Result<(), PublishError>) -> bool {
    match result {
        Ok(()) => {
            tracing::debug!(queue = %queue_name, "Message enqueued");
            true
        }
        Err(PublishError::QueueAlreadyExists(_)) => {
            tracing::warn!(queue = %queue_name, "Queue created concurrently; message not sent");
            false
        }
        Err(e) => {
            tracing::error!(queue = %queue_name, error = %e, "Error sending message to event queue");
            false
        }
    }
}
