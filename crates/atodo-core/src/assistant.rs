//! Service facade tying the graph, the memory store and conversations together.

use std::collections::HashMap;
use std::sync::Arc;

use atodo_ai::{Extractor, LlmClient, LlmExtractor, Message};
use parking_lot::Mutex;
use tracing::Instrument;

use crate::config::{AssistantConfig, GraphConfig};
use crate::conversation::{ConversationStore, DEFAULT_CONVERSATION_CAPACITY};
use crate::error::Result;
use crate::graph::{GraphExecutor, RouteObserver};
use crate::models::MemoryType;
use crate::store::{MemoryStore, Namespace, StoredRecord};

type NamespaceLock = Arc<tokio::sync::Mutex<()>>;
type NamespaceKey = (String, String);

pub struct AssistantBuilder {
    llm: Arc<dyn LlmClient>,
    store: Arc<dyn MemoryStore>,
    extractor: Option<Arc<dyn Extractor>>,
    config: AssistantConfig,
    graph_config: GraphConfig,
    conversation_capacity: usize,
    temperature: Option<f32>,
}

impl AssistantBuilder {
    /// Extraction backend; defaults to an [`LlmExtractor`] over the same model.
    pub fn extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn config(mut self, config: AssistantConfig) -> Self {
        self.config = config;
        self
    }

    pub fn graph_config(mut self, graph_config: GraphConfig) -> Self {
        self.graph_config = graph_config;
        self
    }

    pub fn conversation_capacity(mut self, capacity: usize) -> Self {
        self.conversation_capacity = capacity;
        self
    }

    pub fn temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn build(self) -> Assistant {
        let extractor = self.extractor.unwrap_or_else(|| {
            Arc::new(LlmExtractor::new(self.llm.clone()).with_temperature(self.temperature))
        });
        let executor = GraphExecutor::new(self.llm, extractor, self.store)
            .with_config(self.graph_config)
            .with_temperature(self.temperature);

        Assistant {
            executor,
            conversations: ConversationStore::new(self.conversation_capacity),
            namespace_locks: Mutex::new(HashMap::new()),
            config: self.config,
        }
    }
}

/// Personal assistant with long-term memory.
///
/// Turns on the same conversation run one at a time. Turns that touch the
/// same long-term namespace (assistant type and user id) are serialized too,
/// even across conversations.
pub struct Assistant {
    executor: GraphExecutor,
    conversations: ConversationStore,
    namespace_locks: Mutex<HashMap<NamespaceKey, NamespaceLock>>,
    config: AssistantConfig,
}

impl Assistant {
    pub fn builder(llm: Arc<dyn LlmClient>, store: Arc<dyn MemoryStore>) -> AssistantBuilder {
        AssistantBuilder {
            llm,
            store,
            extractor: None,
            config: AssistantConfig::default(),
            graph_config: GraphConfig::default(),
            conversation_capacity: DEFAULT_CONVERSATION_CAPACITY,
            temperature: Some(0.0),
        }
    }

    pub fn new(llm: Arc<dyn LlmClient>, store: Arc<dyn MemoryStore>) -> Self {
        Self::builder(llm, store).build()
    }

    /// Configuration used by [`Assistant::submit_turn`].
    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    pub async fn submit_turn(&self, conversation_id: &str, user_text: &str) -> Result<String> {
        let config = self.config.clone();
        self.submit_turn_with(conversation_id, &config, user_text)
            .await
    }

    /// Run one turn and return the assistant's reply.
    ///
    /// On failure the conversation keeps the history it had before the turn;
    /// memory written by update nodes that completed is kept.
    pub async fn submit_turn_with(
        &self,
        conversation_id: &str,
        config: &AssistantConfig,
        user_text: &str,
    ) -> Result<String> {
        let span = tracing::info_span!("conversation", conversation_id);
        let key = (config.assistant_type.clone(), config.user_id.clone());
        let namespace_lock = self.namespace_lock(&key);

        let result = async {
            let _namespace_guard = namespace_lock.lock().await;

            let handle = self.conversations.handle(conversation_id);
            let mut history = handle.lock().await;

            match self.executor.run_turn(&history, user_text, config).await {
                Ok(outcome) => {
                    *history = outcome.messages;
                    Ok(outcome.reply)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Turn failed");
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await;

        self.release_namespace_lock(&key, namespace_lock);
        result
    }

    /// All records in one namespace.
    pub fn query_memory(
        &self,
        partition: MemoryType,
        assistant_type: &str,
        user_id: &str,
    ) -> Result<Vec<StoredRecord>> {
        let namespace = Namespace::new(partition, assistant_type, user_id);
        Ok(self.executor.store().search(&namespace)?)
    }

    pub fn add_route_observer<O>(&self, observer: O)
    where
        O: RouteObserver + 'static,
    {
        self.executor.add_observer(Arc::new(observer));
    }

    /// Short-term history of a conversation.
    pub async fn history(&self, conversation_id: &str) -> Vec<Message> {
        self.conversations.snapshot(conversation_id).await
    }

    fn namespace_lock(&self, key: &NamespaceKey) -> NamespaceLock {
        self.namespace_locks
            .lock()
            .entry(key.clone())
            .or_default()
            .clone()
    }

    /// Drop the map entry once no other turn holds or waits on the lock.
    fn release_namespace_lock(&self, key: &NamespaceKey, lock: NamespaceLock) {
        let mut locks = self.namespace_locks.lock();
        // One reference in the map, one here.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use atodo_ai::{MockLlmClient, MockStep};

    #[tokio::test]
    async fn test_idle_namespace_locks_are_released() {
        let llm = MockLlmClient::from_steps(
            "mock",
            vec![MockStep::text("Hi").with_delay(20), MockStep::text("Hello")],
        );
        let assistant = Assistant::new(Arc::new(llm), Arc::new(InMemoryStore::new()));

        let (first, second) = tokio::join!(
            assistant.submit_turn("1", "hi"),
            assistant.submit_turn("2", "hello"),
        );
        first.unwrap();
        second.unwrap();

        assert!(assistant.namespace_locks.lock().is_empty());
    }
}
