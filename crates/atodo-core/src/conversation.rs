//! Short-term memory: message history per conversation id.

use std::num::NonZeroUsize;
use std::sync::Arc;

use atodo_ai::Message;
use lru::LruCache;
use parking_lot::Mutex;

pub const DEFAULT_CONVERSATION_CAPACITY: usize = 256;

/// History of one conversation; the async lock is held for a whole turn.
pub type ConversationHandle = Arc<tokio::sync::Mutex<Vec<Message>>>;

/// LRU-bounded map of conversation histories.
///
/// Evicting a conversation only forgets its messages; long-term memory is
/// untouched.
pub struct ConversationStore {
    conversations: Mutex<LruCache<String, ConversationHandle>>,
}

impl ConversationStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            conversations: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Handle for `conversation_id`, created empty on first use.
    pub fn handle(&self, conversation_id: &str) -> ConversationHandle {
        self.conversations
            .lock()
            .get_or_insert(conversation_id.to_string(), || {
                tracing::debug!(conversation_id, "Starting new conversation");
                Arc::new(tokio::sync::Mutex::new(Vec::new()))
            })
            .clone()
    }

    /// Copy of the history, waiting for any running turn to finish.
    pub async fn snapshot(&self, conversation_id: &str) -> Vec<Message> {
        let handle = self.conversations.lock().get(conversation_id).cloned();
        match handle {
            Some(handle) => handle.lock().await.clone(),
            None => Vec::new(),
        }
    }

    pub fn contains(&self, conversation_id: &str) -> bool {
        self.conversations.lock().contains(conversation_id)
    }

    pub fn len(&self) -> usize {
        self.conversations.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(DEFAULT_CONVERSATION_CAPACITY)
    }
}
