use crate::QueuePublisher;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory publisher that records what it was asked to send.
pub struct MockPublisher {
    accepting: AtomicBool,
    calls: AtomicUsize,
    messages: Mutex<Vec<(String, String)>>,
}

impl MockPublisher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            accepting: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
            messages: Mutex::new(Vec::new()),
        })
    }

    /// A publisher whose every attempt fails.
    pub fn rejecting() -> Arc<Self> {
        let publisher = Self::new();
        publisher.set_accepting(false);
        publisher
    }

    pub fn set_accepting(&self, accepting: bool) {
        self.accepting.store(accepting, Ordering::SeqCst);
    }

    /// Publish attempts, accepted or not.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Accepted `(queue, message)` pairs in publish order.
    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl QueuePublisher for MockPublisher {
    async fn publish(&self, queue_name: &str, message: &str) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.accepting.load(Ordering::SeqCst) {
            tracing::warn!(queue = %queue_name, "Mock publisher rejected message");
            return false;
        }
        match self.messages.lock() {
            Ok(mut messages) => {
                messages.push((queue_name.to_string(), message.to_string()));
                true
            }
            Err(_) => false,
        }
    }
}
