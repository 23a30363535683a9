use std::sync::Arc;

use atodo_ai::{Extractor, LlmClient, Message};
use parking_lot::RwLock;
use tracing::Instrument;

use super::nodes::{self, NodeContext};
use super::observer::notify;
use super::{NodeId, RouteObserver, Router};
use crate::config::{AssistantConfig, GraphConfig};
use crate::error::{GraphError, Result};
use crate::reconcile::Reconciler;
use crate::store::MemoryStore;

/// Result of one completed turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Full history including everything this turn appended.
    pub messages: Vec<Message>,
    /// Content of the controller's final message.
    pub reply: String,
    /// Update nodes visited, in order.
    pub updates: Vec<NodeId>,
}

/// Drives the graph from the user's message to termination.
pub struct GraphExecutor {
    llm: Arc<dyn LlmClient>,
    reconciler: Reconciler,
    store: Arc<dyn MemoryStore>,
    observers: RwLock<Vec<Arc<dyn RouteObserver>>>,
    config: GraphConfig,
    temperature: Option<f32>,
}

impl GraphExecutor {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        extractor: Arc<dyn Extractor>,
        store: Arc<dyn MemoryStore>,
    ) -> Self {
        Self {
            llm,
            reconciler: Reconciler::new(extractor),
            store,
            observers: RwLock::new(Vec::new()),
            config: GraphConfig::default(),
            temperature: Some(0.0),
        }
    }

    pub fn with_config(mut self, config: GraphConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn add_observer(&self, observer: Arc<dyn RouteObserver>) {
        self.observers.write().push(observer);
    }

    pub fn store(&self) -> &Arc<dyn MemoryStore> {
        &self.store
    }

    /// Run one turn: append `user_text` to `history` and loop until the
    /// controller stops asking for memory updates.
    ///
    /// `history` itself is not modified; the caller commits
    /// [`TurnOutcome::messages`] on success.
    pub async fn run_turn(
        &self,
        history: &[Message],
        user_text: &str,
        config: &AssistantConfig,
    ) -> Result<TurnOutcome> {
        let span = tracing::info_span!(
            "turn",
            assistant_type = %config.assistant_type,
            user_id = %config.user_id,
        );
        self.drive(history, user_text, config).instrument(span).await
    }

    async fn drive(
        &self,
        history: &[Message],
        user_text: &str,
        config: &AssistantConfig,
    ) -> Result<TurnOutcome> {
        let observers = self.observers.read().clone();
        let router = Router::new(observers.clone());
        let ctx = NodeContext {
            llm: self.llm.as_ref(),
            reconciler: &self.reconciler,
            store: self.store.as_ref(),
            config,
            temperature: self.temperature,
        };

        let mut messages = history.to_vec();
        messages.push(Message::user(user_text));
        let mut updates = Vec::new();

        notify(&observers, NodeId::Start, NodeId::Controller);
        let mut current = NodeId::Controller;
        let mut steps = 0;

        while current != NodeId::End {
            steps += 1;
            if steps > self.config.max_steps {
                tracing::warn!(limit = self.config.max_steps, "Turn exceeded step limit");
                return Err(GraphError::StepLimitExceeded {
                    limit: self.config.max_steps,
                });
            }
            tracing::debug!(node = %current, step = steps, "Visiting node");

            current = match current {
                NodeId::Start => NodeId::Controller,
                NodeId::Controller => {
                    let message = nodes::controller::run(&ctx, &messages).await?;
                    messages.push(message);
                    router.route(NodeId::Controller, &messages[messages.len() - 1])?
                }
                update @ (NodeId::UpdateProfile
                | NodeId::UpdateTodos
                | NodeId::UpdateInstructions) => {
                    let message = match update {
                        NodeId::UpdateProfile => nodes::profile::run(&ctx, &messages).await?,
                        NodeId::UpdateTodos => nodes::todos::run(&ctx, &messages).await?,
                        _ => nodes::instructions::run(&ctx, &messages).await?,
                    };
                    messages.push(message);
                    updates.push(update);
                    notify(&observers, update, NodeId::Controller);
                    NodeId::Controller
                }
                NodeId::End => NodeId::End,
            };
        }

        let reply = messages
            .last()
            .map(|message| message.content.clone())
            .unwrap_or_default();
        tracing::info!(
            steps,
            updates = updates.len(),
            messages = messages.len(),
            "Turn complete"
        );

        Ok(TurnOutcome {
            messages,
            reply,
            updates,
        })
    }
}
