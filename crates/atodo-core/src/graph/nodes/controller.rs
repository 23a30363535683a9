//! Hub node: loads memory, prompts the model, and records its decision.

use atodo_ai::{CompletionRequest, Message, ToolChoice};
use serde_json::Value;

use super::NodeContext;
use crate::error::{GraphError, Result};
use crate::models::{MemoryType, UpdateMemory};
use crate::prompts::controller_prompt;
use crate::store::Namespace;

/// Instructions text held in an instructions record.
pub(crate) fn instructions_text(value: &Value) -> String {
    match value.get("memory") {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

pub async fn run(ctx: &NodeContext<'_>, messages: &[Message]) -> Result<Message> {
    let config = ctx.config;
    let profile = ctx
        .store
        .search(&Namespace::for_config(MemoryType::UserProfile, config))?
        .into_iter()
        .next()
        .map(|record| record.value);
    let todos = ctx
        .store
        .search(&Namespace::for_config(MemoryType::Todo, config))?;
    let instructions = ctx
        .store
        .search(&Namespace::for_config(MemoryType::Instructions, config))?
        .first()
        .map(|record| instructions_text(&record.value))
        .unwrap_or_default();

    let system = controller_prompt(&config.role, profile.as_ref(), &todos, &instructions);
    tracing::debug!(
        prompt_chars = system.len(),
        todos = todos.len(),
        history = messages.len(),
        "Invoking controller"
    );

    let mut request_messages = Vec::with_capacity(messages.len() + 1);
    request_messages.push(Message::system(system));
    request_messages.extend_from_slice(messages);

    let mut request = CompletionRequest::new(request_messages)
        .with_tools(vec![UpdateMemory::tool_schema()])
        .with_tool_choice(ToolChoice::Auto);
    if let Some(temperature) = ctx.temperature {
        request = request.with_temperature(temperature);
    }

    let mut response = ctx.llm.complete(request).await.map_err(GraphError::Llm)?;
    if response.tool_calls.len() > 1 {
        tracing::warn!(
            dropped = response.tool_calls.len() - 1,
            "Controller requested several memory updates, keeping the first"
        );
        response.tool_calls.truncate(1);
    }

    Ok(response.into_message())
}
