use crate::{report, PublishError, QueuePublisher};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::Db;
use std::path::Path;
use std::sync::Arc;

/// A message stored by [`LocalQueue`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedMessage {
    pub id: u64,
    pub queue: String,
    pub body: String,
    pub state: String,
    pub enqueued_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Durable on-disk queue backed by sled, one tree per queue name.
///
/// Stands in for the storage service when running offline. Keys are
/// big-endian sled ids so iteration order is enqueue order. Only waiting
/// messages are stored; delivery removes the record.
#[derive(Clone)]
pub struct LocalQueue {
    db: Db,
}

impl LocalQueue {
    pub fn open(path: impl AsRef<Path>) -> Result<Arc<Self>> {
        let db = sled::open(path.as_ref())?;
        tracing::info!(path = %path.as_ref().display(), "Local queue opened");
        Ok(Arc::new(Self { db }))
    }

    fn tree(&self, queue_name: &str) -> Result<sled::Tree, PublishError> {
        Ok(self.db.open_tree(format!("queue:{queue_name}"))?)
    }

    async fn enqueue(&self, queue_name: &str, message: &str) -> Result<(), PublishError> {
        let tree = self.tree(queue_name)?;
        let id = self.db.generate_id()?;
        let now = Utc::now();
        let rec = QueuedMessage {
            id,
            queue: queue_name.to_string(),
            body: message.to_string(),
            state: "queued".to_string(),
            enqueued_at: now,
            updated_at: now,
        };

        tree.insert(id.to_be_bytes(), serde_json::to_vec(&rec)?)?;
        tree.flush_async().await?;
        Ok(())
    }

    /// Messages still waiting on `queue_name`, oldest first.
    pub fn pending(&self, queue_name: &str) -> Result<Vec<QueuedMessage>> {
        let tree = self.tree(queue_name)?;
        let mut out = Vec::with_capacity(tree.len());
        for item in tree.iter() {
            let (_k, v) = item?;
            out.push(serde_json::from_slice(&v)?);
        }
        Ok(out)
    }

    /// Take the oldest waiting message off the queue.
    ///
    /// The record is removed atomically, so concurrent consumers never
    /// receive the same message.
    pub fn pop(&self, queue_name: &str) -> Result<Option<QueuedMessage>> {
        let tree = self.tree(queue_name)?;
        let Some((_k, v)) = tree.pop_min()? else {
            return Ok(None);
        };
        tree.flush()?;

        let mut rec: QueuedMessage = serde_json::from_slice(&v)?;
        rec.state = "delivered".into();
        rec.updated_at = Utc::now();
        tracing::debug!(queue = %queue_name, id = rec.id, "Local message delivered");
        Ok(Some(rec))
    }
}

#[async_trait]
impl QueuePublisher for LocalQueue {
    async fn publish(&self, queue_name: &str, message: &str) -> bool {
        report(queue_name, self.enqueue(queue_name, message).await)
    }
}
