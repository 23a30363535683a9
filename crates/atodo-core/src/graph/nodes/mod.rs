//! Graph nodes: the controller and the three memory update nodes.
//!
//! Every node reads the conversation so far and returns exactly one message
//! to append to it.

pub mod controller;
pub mod instructions;
pub mod profile;
pub mod todos;

use atodo_ai::{LlmClient, Message, Role, ToolCall};
use chrono::Local;

use super::NodeId;
use crate::config::AssistantConfig;
use crate::error::{GraphError, Result};
use crate::prompts::extraction_prompt;
use crate::reconcile::Reconciler;
use crate::store::MemoryStore;

/// Dependencies shared by all nodes for one turn.
pub struct NodeContext<'a> {
    pub llm: &'a dyn LlmClient,
    pub reconciler: &'a Reconciler,
    pub store: &'a dyn MemoryStore,
    pub config: &'a AssistantConfig,
    pub temperature: Option<f32>,
}

/// The controller's tool call an update node is answering.
pub(crate) fn pending_tool_call(messages: &[Message], node: NodeId) -> Result<&ToolCall> {
    messages
        .last()
        .filter(|message| message.role == Role::Assistant)
        .and_then(|message| message.tool_calls().first())
        .ok_or(GraphError::MissingToolCall { node })
}

/// History without the triggering controller message.
pub(crate) fn prior_history(messages: &[Message]) -> &[Message] {
    match messages.split_last() {
        Some((_, rest)) => rest,
        None => messages,
    }
}

/// Collapse consecutive plain system or user messages into one.
pub(crate) fn merge_message_runs(messages: Vec<Message>) -> Vec<Message> {
    let mut merged: Vec<Message> = Vec::with_capacity(messages.len());
    for message in messages {
        let mergeable = matches!(message.role, Role::System | Role::User);
        if let Some(previous) = merged.last_mut()
            && mergeable
            && previous.role == message.role
            && previous.tool_calls.is_none()
            && previous.tool_call_id.is_none()
        {
            previous.content.push('\n');
            previous.content.push_str(&message.content);
            continue;
        }
        merged.push(message);
    }
    merged
}

/// Reconciliation input: the extraction instruction followed by the history
/// that led to the pending tool call.
pub(crate) fn extraction_messages(messages: &[Message]) -> Vec<Message> {
    let mut request = Vec::with_capacity(messages.len());
    request.push(Message::system(extraction_prompt(Local::now())));
    request.extend_from_slice(prior_history(messages));
    merge_message_runs(request)
}
