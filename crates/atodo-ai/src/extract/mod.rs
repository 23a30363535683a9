//! Structured extraction: reconcile a conversation into JSON documents.
//!
//! An [`Extractor`] receives the conversation, the documents that already
//! exist for a schema, and the schema itself. It answers with a list of
//! documents: patched versions of existing ones (carrying their id in the
//! matching [`ResponseMetadata`]) and new ones (no id).

mod llm_extractor;
mod patch;

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::Result;
use crate::llm::{Message, ToolCall, ToolSchema};

pub use llm_extractor::{LlmExtractor, PATCH_DOC_TOOL};
pub use patch::{PatchOperation, apply_patches, parse_patch_list};

/// A document that already exists and may be patched.
#[derive(Debug, Clone, PartialEq)]
pub struct ExistingDoc {
    pub id: String,
    pub value: Value,
}

impl ExistingDoc {
    pub fn new(id: impl Into<String>, value: Value) -> Self {
        Self {
            id: id.into(),
            value,
        }
    }
}

/// Observes the raw tool calls an extractor's model produced.
pub trait ExtractionListener: Send + Sync {
    fn on_tool_calls(&self, calls: &[ToolCall]);
}

/// Collects every batch of tool calls seen by an extraction.
#[derive(Debug, Clone, Default)]
pub struct ToolCallInspector {
    called_tools: Arc<Mutex<Vec<Vec<ToolCall>>>>,
}

impl ToolCallInspector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captured batches, one per model response.
    pub fn called_tools(&self) -> Vec<Vec<ToolCall>> {
        self.called_tools.lock().clone()
    }
}

impl ExtractionListener for ToolCallInspector {
    fn on_tool_calls(&self, calls: &[ToolCall]) {
        self.called_tools.lock().push(calls.to_vec());
    }
}

#[derive(Clone)]
pub struct ExtractionRequest {
    pub messages: Vec<Message>,
    pub existing: Vec<ExistingDoc>,
    pub schema: ToolSchema,
    /// Allow new documents when `existing` is non-empty.
    pub enable_inserts: bool,
    pub listeners: Vec<Arc<dyn ExtractionListener>>,
}

impl ExtractionRequest {
    pub fn new(messages: Vec<Message>, schema: ToolSchema) -> Self {
        Self {
            messages,
            existing: Vec::new(),
            schema,
            enable_inserts: false,
            listeners: Vec::new(),
        }
    }

    pub fn with_existing(mut self, existing: Vec<ExistingDoc>) -> Self {
        self.existing = existing;
        self
    }

    pub fn with_inserts(mut self, enable: bool) -> Self {
        self.enable_inserts = enable;
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn ExtractionListener>) -> Self {
        self.listeners.push(listener);
        self
    }
}

impl std::fmt::Debug for ExtractionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionRequest")
            .field("messages", &self.messages.len())
            .field("existing", &self.existing)
            .field("schema", &self.schema.name)
            .field("enable_inserts", &self.enable_inserts)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseMetadata {
    /// Id of the patched document; `None` for a new one.
    pub json_doc_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractionResult {
    /// Documents, aligned index by index with `response_metadata`.
    pub responses: Vec<Value>,
    pub response_metadata: Vec<ResponseMetadata>,
    /// Raw tool calls behind the responses.
    pub tool_calls: Vec<ToolCall>,
}

impl ExtractionResult {
    /// Pairs each response with the id it patches, if any.
    pub fn documents(&self) -> impl Iterator<Item = (Option<&str>, &Value)> {
        self.responses
            .iter()
            .zip(self.response_metadata.iter())
            .map(|(value, meta)| (meta.json_doc_id.as_deref(), value))
    }
}

/// Reconciliation capability.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, request: ExtractionRequest) -> Result<ExtractionResult>;
}
