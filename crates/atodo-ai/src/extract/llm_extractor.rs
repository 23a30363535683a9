use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{AiError, Result};
use crate::llm::{CompletionRequest, LlmClient, Message, Role, ToolCall, ToolChoice, ToolSchema};

use super::patch::{PatchOperation, apply_patches, parse_patch_list};
use super::{ExistingDoc, ExtractionRequest, ExtractionResult, Extractor, ResponseMetadata};

/// Name of the tool used to patch an existing document.
pub const PATCH_DOC_TOOL: &str = "PatchDoc";

#[derive(Debug, Deserialize)]
struct PatchDocArgs {
    json_doc_id: String,
    #[serde(default)]
    planned_edits: String,
    #[serde(default)]
    patches: Value,
}

fn patch_doc_schema() -> ToolSchema {
    ToolSchema::new(
        PATCH_DOC_TOOL,
        "Apply JSON patches to an existing document. Plan the edits first, then list the \
         add, replace or remove operations needed. Send an empty patch list if the document \
         should stay as it is.",
        json!({
            "type": "object",
            "properties": {
                "json_doc_id": {
                    "type": "string",
                    "description": "The id of the document to patch."
                },
                "planned_edits": {
                    "type": "string",
                    "description": "Short description of the changes to make."
                },
                "patches": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "op": {"type": "string", "enum": ["add", "replace", "remove"]},
                            "path": {
                                "type": "string",
                                "description": "JSON pointer, e.g. /status or /solutions/-"
                            },
                            "value": {"description": "New value for add and replace."}
                        },
                        "required": ["op", "path"]
                    }
                }
            },
            "required": ["json_doc_id", "planned_edits", "patches"]
        }),
    )
}

/// Extractor that asks a chat model to emit schema or patch tool calls.
pub struct LlmExtractor {
    llm: Arc<dyn LlmClient>,
    temperature: Option<f32>,
}

impl LlmExtractor {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            temperature: Some(0.0),
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    fn offered_tools(request: &ExtractionRequest) -> Vec<ToolSchema> {
        if request.existing.is_empty() {
            vec![request.schema.clone()]
        } else if request.enable_inserts {
            vec![request.schema.clone(), patch_doc_schema()]
        } else {
            vec![patch_doc_schema()]
        }
    }

    /// With inserts disabled and nothing on file, exactly one document is
    /// created, so the schema tool itself is forced.
    fn single_document(request: &ExtractionRequest) -> bool {
        request.existing.is_empty() && !request.enable_inserts
    }

    fn tool_choice(request: &ExtractionRequest) -> ToolChoice {
        if Self::single_document(request) {
            ToolChoice::Tool(request.schema.name.clone())
        } else {
            ToolChoice::Required
        }
    }

    fn guidance(request: &ExtractionRequest) -> Result<String> {
        let schema = &request.schema.name;
        if Self::single_document(request) {
            return Ok(format!(
                "Extract the relevant information from the conversation by calling {schema} \
                 exactly once, combining everything into a single document."
            ));
        }
        if request.existing.is_empty() {
            return Ok(format!(
                "Extract the relevant information from the conversation by calling {schema}. \
                 Make one call per item."
            ));
        }

        let mut docs = Vec::with_capacity(request.existing.len());
        for doc in &request.existing {
            docs.push(json!({"json_doc_id": doc.id, "schema": schema, "value": doc.value}));
        }
        let rendered = serde_json::to_string_pretty(&docs)?;

        let mut text = format!(
            "Existing {schema} documents:\n<existing>\n{rendered}\n</existing>\n\n\
             Call {PATCH_DOC_TOOL} once for each existing document that needs changes, \
             referencing it by json_doc_id."
        );
        if request.enable_inserts {
            text.push_str(&format!(
                " Call {schema} for each new item that matches none of the existing documents."
            ));
        }
        text.push_str(" Use parallel tool calls when several documents change.");
        Ok(text)
    }

    fn build_messages(request: &ExtractionRequest) -> Result<Vec<Message>> {
        let guidance = Self::guidance(request)?;
        let mut messages = request.messages.clone();
        match messages.first_mut() {
            Some(first) if first.role == Role::System => {
                first.content = format!("{}\n\n{}", first.content, guidance);
            }
            _ => messages.insert(0, Message::system(guidance)),
        }
        Ok(messages)
    }
}

fn parse_patches(call: &ToolCall, raw: Value) -> Result<Vec<PatchOperation>> {
    parse_patch_list(raw).map_err(|e| AiError::InvalidFormat(format!("{} call: {e}", call.name)))
}

/// Documents produced so far, at most one response per patched id.
#[derive(Default)]
struct Responses {
    result: ExtractionResult,
    by_id: HashMap<String, usize>,
}

impl Responses {
    fn current<'a>(&'a self, existing: &'a HashMap<&str, &Value>, id: &str) -> Option<&'a Value> {
        match self.by_id.get(id) {
            Some(idx) => self.result.responses.get(*idx),
            None => existing.get(id).copied(),
        }
    }

    fn set_patched(&mut self, id: String, value: Value) {
        match self.by_id.get(&id) {
            Some(idx) => self.result.responses[*idx] = value,
            None => {
                self.by_id.insert(id.clone(), self.result.responses.len());
                self.result.responses.push(value);
                self.result.response_metadata.push(ResponseMetadata {
                    json_doc_id: Some(id),
                });
            }
        }
    }

    fn push_new(&mut self, value: Value) {
        self.result.responses.push(value);
        self.result
            .response_metadata
            .push(ResponseMetadata { json_doc_id: None });
    }
}

fn process_calls(
    request: &ExtractionRequest,
    tools: &[ToolSchema],
    calls: Vec<ToolCall>,
) -> Result<ExtractionResult> {
    let existing: HashMap<&str, &Value> = request
        .existing
        .iter()
        .map(|ExistingDoc { id, value }| (id.as_str(), value))
        .collect();
    let mut responses = Responses::default();

    for call in &calls {
        if !tools.iter().any(|tool| tool.name == call.name) {
            return Err(AiError::InvalidFormat(format!(
                "model called tool '{}' which was not offered",
                call.name
            )));
        }

        if call.name == PATCH_DOC_TOOL {
            let args: PatchDocArgs = serde_json::from_value(call.arguments.clone())
                .map_err(|e| AiError::InvalidFormat(format!("invalid PatchDoc arguments: {e}")))?;
            let base = responses
                .current(&existing, &args.json_doc_id)
                .ok_or_else(|| {
                    AiError::InvalidFormat(format!(
                        "PatchDoc references unknown document '{}'",
                        args.json_doc_id
                    ))
                })?;
            let ops = parse_patches(call, args.patches)?;
            let patched = apply_patches(base, &ops)?;
            if !patched.is_object() {
                return Err(AiError::InvalidFormat(format!(
                    "patched document '{}' is not an object",
                    args.json_doc_id
                )));
            }
            tracing::debug!(
                doc_id = %args.json_doc_id,
                operations = ops.len(),
                planned_edits = %args.planned_edits,
                "Applied document patch"
            );
            responses.set_patched(args.json_doc_id, patched);
        } else {
            if !call.arguments.is_object() {
                return Err(AiError::InvalidFormat(format!(
                    "{} arguments must be a JSON object",
                    call.name
                )));
            }
            responses.push_new(call.arguments.clone());
        }
    }

    let mut result = responses.result;
    result.tool_calls = calls;
    Ok(result)
}

#[async_trait]
impl Extractor for LlmExtractor {
    async fn extract(&self, request: ExtractionRequest) -> Result<ExtractionResult> {
        let tools = Self::offered_tools(&request);
        let messages = Self::build_messages(&request)?;

        let mut completion = CompletionRequest::new(messages)
            .with_tools(tools.clone())
            .with_tool_choice(Self::tool_choice(&request));
        if let Some(temperature) = self.temperature {
            completion = completion.with_temperature(temperature);
        }

        tracing::debug!(
            schema = %request.schema.name,
            existing = request.existing.len(),
            enable_inserts = request.enable_inserts,
            "Running extraction"
        );

        let response = self.llm.complete(completion).await?;
        for listener in &request.listeners {
            listener.on_tool_calls(&response.tool_calls);
        }

        process_calls(&request, &tools, response.tool_calls)
    }
}
