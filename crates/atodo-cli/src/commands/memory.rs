use anyhow::Result;
use atodo_core::{AssistantConfig, MemoryStore, MemoryType, Namespace};
use serde_json::{Value, json};

use crate::output::print_json;

pub fn run(store: &dyn MemoryStore, config: &AssistantConfig, partition: MemoryType) -> Result<()> {
    let namespace = Namespace::for_config(partition, config);
    print_json(&records_json(store, &namespace)?)
}

/// Records of a namespace as `{key, value, created_at, updated_at}` objects.
pub fn records_json(store: &dyn MemoryStore, namespace: &Namespace) -> Result<Value> {
    let records = store.search(namespace)?;
    tracing::debug!(namespace = %namespace, count = records.len(), "Listing memory");
    Ok(Value::Array(
        records
            .into_iter()
            .map(|record| {
                json!({
                    "key": record.key,
                    "value": record.value,
                    "created_at": record.created_at.to_rfc3339(),
                    "updated_at": record.updated_at.to_rfc3339(),
                })
            })
            .collect(),
    ))
}
