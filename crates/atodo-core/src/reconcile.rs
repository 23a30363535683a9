//! Reconciliation adapter.
//!
//! Wraps an [`Extractor`]: runs it against the existing records of a
//! partition, validates every returned document against the partition's
//! schema, assigns keys, and describes what changed in human-readable form.

use std::fmt;
use std::sync::Arc;

use atodo_ai::{
    ExistingDoc, ExtractionRequest, Extractor, Message, PATCH_DOC_TOOL, ToolCall,
    ToolCallInspector, ToolSchema, parse_patch_list,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{GraphError, Result};
use crate::models::MemoryType;
use crate::store::StoredRecord;

/// Tool-result text when the extractor made no calls.
pub const NO_CHANGES_SUMMARY: &str = "no changes to the ToDo list";

/// One change as reported by the extractor's tool calls.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordChange {
    Updated {
        id: String,
        planned_edits: String,
        added_content: Value,
    },
    Unchanged {
        id: String,
        planned_edits: String,
    },
    Created {
        schema: String,
        content: Value,
    },
}

/// Strings are shown bare, everything else as JSON.
struct Plain<'a>(&'a Value);

impl fmt::Display for Plain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Value::String(text) => f.write_str(text),
            other => write!(f, "{other}"),
        }
    }
}

impl fmt::Display for RecordChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordChange::Updated {
                id,
                planned_edits,
                added_content,
            } => write!(
                f,
                "Document {id} updated:\nPlan: {planned_edits}\nAdded content: {}",
                Plain(added_content)
            ),
            RecordChange::Unchanged { id, planned_edits } => {
                write!(f, "Document {id} unchanged:\n{planned_edits}")
            }
            RecordChange::Created { schema, content } => {
                write!(f, "New {schema} created:\nContent: {}", Plain(content))
            }
        }
    }
}

/// Classify raw tool calls into changes. Calls to other tools are skipped.
pub fn changes_from_tool_calls(batches: &[Vec<ToolCall>], schema_name: &str) -> Vec<RecordChange> {
    let mut changes = Vec::new();
    for call in batches.iter().flatten() {
        if call.name == PATCH_DOC_TOOL {
            let args = &call.arguments;
            let id = text_field(args, "json_doc_id");
            let planned_edits = text_field(args, "planned_edits");
            // Decoded like the extractor decodes them, string-encoded lists included.
            let patches = parse_patch_list(args["patches"].clone()).unwrap_or_default();
            match patches.first() {
                Some(patch) => changes.push(RecordChange::Updated {
                    id,
                    planned_edits,
                    added_content: patch.value().cloned().unwrap_or(Value::Null),
                }),
                None => changes.push(RecordChange::Unchanged { id, planned_edits }),
            }
        } else if call.name == schema_name {
            changes.push(RecordChange::Created {
                schema: schema_name.to_string(),
                content: call.arguments.clone(),
            });
        }
    }
    changes
}

fn text_field(args: &Value, field: &str) -> String {
    match &args[field] {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Join change descriptions with blank lines.
pub fn summarize(changes: &[RecordChange]) -> String {
    if changes.is_empty() {
        return NO_CHANGES_SUMMARY.to_string();
    }
    changes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// A validated document ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledRecord {
    pub key: String,
    pub value: Value,
    pub is_new: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub records: Vec<ReconciledRecord>,
    pub changes: Vec<RecordChange>,
}

impl Reconciliation {
    pub fn summary(&self) -> String {
        summarize(&self.changes)
    }
}

/// What to reconcile: conversation, schema, and whether new records may appear.
pub struct ReconcileRequest<'a> {
    pub partition: MemoryType,
    pub schema: ToolSchema,
    pub messages: Vec<Message>,
    pub existing: &'a [StoredRecord],
    pub enable_inserts: bool,
}

#[derive(Clone)]
pub struct Reconciler {
    extractor: Arc<dyn Extractor>,
}

impl Reconciler {
    pub fn new(extractor: Arc<dyn Extractor>) -> Self {
        Self { extractor }
    }

    /// Run the extractor and validate its output as `T`.
    ///
    /// Nothing is returned unless every document deserializes; documents are
    /// re-serialized from `T` so stored values are normalized.
    pub async fn reconcile<T>(&self, request: ReconcileRequest<'_>) -> Result<Reconciliation>
    where
        T: DeserializeOwned + Serialize,
    {
        let inspector = ToolCallInspector::new();
        let schema_name = request.schema.name.clone();
        let existing = request
            .existing
            .iter()
            .map(|record| ExistingDoc::new(&record.key, record.value.clone()))
            .collect();

        let extraction = ExtractionRequest::new(request.messages, request.schema)
            .with_existing(existing)
            .with_inserts(request.enable_inserts)
            .with_listener(Arc::new(inspector.clone()));

        let result = self
            .extractor
            .extract(extraction)
            .await
            .map_err(GraphError::Reconciliation)?;

        let mut records = Vec::with_capacity(result.responses.len());
        for (doc_id, value) in result.documents() {
            let typed: T = serde_json::from_value(value.clone()).map_err(|source| {
                GraphError::InvalidRecord {
                    partition: request.partition,
                    source,
                }
            })?;
            let value = serde_json::to_value(&typed).map_err(|source| GraphError::InvalidRecord {
                partition: request.partition,
                source,
            })?;
            records.push(match doc_id {
                Some(id) => ReconciledRecord {
                    key: id.to_string(),
                    value,
                    is_new: false,
                },
                None => ReconciledRecord {
                    key: Uuid::new_v4().to_string(),
                    value,
                    is_new: true,
                },
            });
        }

        Ok(Reconciliation {
            records,
            changes: changes_from_tool_calls(&inspector.called_tools(), &schema_name),
        })
    }
}
