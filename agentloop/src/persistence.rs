//! Conversation persistence: a narrow `ConversationStore` trait the step loop
//! appends to and reads from. The on-disk format is an external concern; this
//! crate only defines the contract and an in-memory implementation for tests,
//! in the same trait-plus-`InMemory`-impl shape as [`crate::run_manager::RunStore`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::message::Message;

#[derive(Debug, Error)]
pub enum ConversationStoreError {
    #[error("storage error: {0}")]
    Storage(String),
}

/// Appends and reads the `Message` history for one thread.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn append(&self, thread_id: &str, message: Message) -> Result<(), ConversationStoreError>;
    async fn read(&self, thread_id: &str) -> Result<Vec<Message>, ConversationStoreError>;
}

/// In-process `ConversationStore` used by tests.
#[derive(Clone, Default)]
pub struct InMemoryConversationStore {
    threads: Arc<RwLock<HashMap<String, Vec<Message>>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn append(&self, thread_id: &str, message: Message) -> Result<(), ConversationStoreError> {
        self.threads.write().await.entry(thread_id.to_string()).or_default().push(message);
        Ok(())
    }

    async fn read(&self, thread_id: &str) -> Result<Vec<Message>, ConversationStoreError> {
        Ok(self.threads.read().await.get(thread_id).cloned().unwrap_or_default())
    }
}

/// Discards every write. The default when persistence is not configured.
#[derive(Clone, Default)]
pub struct NoOpConversationStore;

#[async_trait]
impl ConversationStore for NoOpConversationStore {
    async fn append(&self, _thread_id: &str, _message: Message) -> Result<(), ConversationStoreError> {
        Ok(())
    }

    async fn read(&self, _thread_id: &str) -> Result<Vec<Message>, ConversationStoreError> {
        Ok(Vec::new())
    }
}
