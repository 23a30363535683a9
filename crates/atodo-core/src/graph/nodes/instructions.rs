use atodo_ai::{CompletionRequest, Message};
use serde_json::json;

use super::controller::instructions_text;
use super::{NodeContext, pending_tool_call, prior_history};
use crate::error::{GraphError, Result};
use crate::graph::NodeId;
use crate::models::MemoryType;
use crate::prompts::{INSTRUCTIONS_REQUEST, instructions_prompt};
use crate::store::Namespace;

/// Fixed key of the single instructions record.
pub const INSTRUCTIONS_KEY: &str = "user_instructions";

pub const INSTRUCTIONS_UPDATED: &str = "updated instructions";

/// Ask the model to restate the user's preferences and overwrite the stored text.
pub async fn run(ctx: &NodeContext<'_>, messages: &[Message]) -> Result<Message> {
    let call = pending_tool_call(messages, NodeId::UpdateInstructions)?;
    let namespace = Namespace::for_config(MemoryType::Instructions, ctx.config);
    let current = ctx
        .store
        .get(&namespace, INSTRUCTIONS_KEY)?
        .map(|record| instructions_text(&record.value));

    let history = prior_history(messages);
    let mut request_messages = Vec::with_capacity(history.len() + 2);
    request_messages.push(Message::system(instructions_prompt(current.as_deref())));
    request_messages.extend_from_slice(history);
    request_messages.push(Message::user(INSTRUCTIONS_REQUEST));

    let mut request = CompletionRequest::new(request_messages);
    if let Some(temperature) = ctx.temperature {
        request = request.with_temperature(temperature);
    }
    let response = ctx.llm.complete(request).await.map_err(GraphError::Llm)?;
    let text = response.content.unwrap_or_default();

    ctx.store
        .put(&namespace, INSTRUCTIONS_KEY, json!({"memory": text}))?;
    tracing::info!(namespace = %namespace, chars = text.len(), "Saved instructions");

    Ok(Message::tool_result(&call.id, INSTRUCTIONS_UPDATED))
}
