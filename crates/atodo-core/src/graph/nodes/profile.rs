use atodo_ai::Message;
use serde_json::Value;

use super::{NodeContext, extraction_messages, pending_tool_call};
use crate::error::Result;
use crate::graph::NodeId;
use crate::models::{MemoryType, UserProfile};
use crate::reconcile::ReconcileRequest;
use crate::store::Namespace;

pub const PROFILE_UPDATED: &str = "updated profile";

/// Fold `other` into `target`: lists gain the entries they lack, other fields
/// are filled only where `target` has none.
fn merge_profile(target: &mut Value, other: Value) {
    let (Value::Object(target), Value::Object(other)) = (target, other) else {
        return;
    };
    for (field, incoming) in other {
        if incoming.is_null() {
            continue;
        }
        match target.get_mut(&field) {
            Some(Value::Array(items)) => {
                if let Value::Array(more) = incoming {
                    for item in more {
                        if !items.contains(&item) {
                            items.push(item);
                        }
                    }
                }
            }
            Some(slot) => {
                if slot.is_null() {
                    *slot = incoming;
                }
            }
            None => {
                target.insert(field, incoming);
            }
        }
    }
}

/// Merge what the conversation revealed about the user into their single profile.
pub async fn run(ctx: &NodeContext<'_>, messages: &[Message]) -> Result<Message> {
    let call = pending_tool_call(messages, NodeId::UpdateProfile)?;
    let namespace = Namespace::for_config(MemoryType::UserProfile, ctx.config);
    let existing = ctx.store.search(&namespace)?;

    let mut outcome = ctx
        .reconciler
        .reconcile::<UserProfile>(ReconcileRequest {
            partition: MemoryType::UserProfile,
            schema: UserProfile::tool_schema(),
            messages: extraction_messages(messages),
            existing: &existing,
            // With a profile on file only patches are offered.
            enable_inserts: false,
        })
        .await?;

    // A namespace holds one profile; several new ones are folded together.
    if existing.is_empty() && outcome.records.len() > 1 {
        tracing::warn!(
            extracted = outcome.records.len(),
            "Several new profiles extracted, merging them"
        );
        let mut records = std::mem::take(&mut outcome.records).into_iter();
        if let Some(mut first) = records.next() {
            for other in records {
                merge_profile(&mut first.value, other.value);
            }
            outcome.records.push(first);
        }
    }

    for record in &outcome.records {
        ctx.store.put(&namespace, &record.key, record.value.clone())?;
        tracing::info!(
            namespace = %namespace,
            key = %record.key,
            new = record.is_new,
            "Saved user profile"
        );
    }

    Ok(Message::tool_result(&call.id, PROFILE_UPDATED))
}
