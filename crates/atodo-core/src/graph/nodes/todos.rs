use atodo_ai::Message;

use super::{NodeContext, extraction_messages, pending_tool_call};
use crate::error::Result;
use crate::graph::NodeId;
use crate::models::{MemoryType, ToDo};
use crate::reconcile::ReconcileRequest;
use crate::store::Namespace;

/// Patch existing tasks and add new ones, answering with a summary of the changes.
pub async fn run(ctx: &NodeContext<'_>, messages: &[Message]) -> Result<Message> {
    let call = pending_tool_call(messages, NodeId::UpdateTodos)?;
    let namespace = Namespace::for_config(MemoryType::Todo, ctx.config);
    let existing = ctx.store.search(&namespace)?;

    let outcome = ctx
        .reconciler
        .reconcile::<ToDo>(ReconcileRequest {
            partition: MemoryType::Todo,
            schema: ToDo::tool_schema(),
            messages: extraction_messages(messages),
            existing: &existing,
            enable_inserts: true,
        })
        .await?;

    for record in &outcome.records {
        ctx.store.put(&namespace, &record.key, record.value.clone())?;
    }
    tracing::info!(
        namespace = %namespace,
        written = outcome.records.len(),
        created = outcome.records.iter().filter(|r| r.is_new).count(),
        "Saved ToDo list changes"
    );

    Ok(Message::tool_result(&call.id, outcome.summary()))
}
