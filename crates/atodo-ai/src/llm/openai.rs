//! OpenAI-compatible chat completions provider (OpenAI, Ollama)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{AiError, Result};
use crate::http_client::build_http_client;
use crate::llm::client::{
    CompletionRequest, CompletionResponse, FinishReason, LlmClient, Role, TokenUsage, ToolCall,
    ToolChoice,
};
use crate::llm::retry::{LlmRetryConfig, error_from_response};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";

/// OpenAI-compatible client
pub struct OpenAIClient {
    client: Client,
    provider: String,
    api_key: String,
    model: String,
    base_url: String,
    retry_config: LlmRetryConfig,
}

impl OpenAIClient {
    /// Create a new OpenAI client
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: build_http_client(),
            provider: "openai".to_string(),
            api_key: api_key.into(),
            model: "gpt-4o".to_string(),
            base_url: OPENAI_BASE_URL.to_string(),
            retry_config: LlmRetryConfig::default(),
        }
    }

    /// Client for a local Ollama server through its OpenAI-compatible endpoint
    pub fn ollama(model: impl Into<String>) -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: OLLAMA_BASE_URL.to_string(),
            ..Self::new("ollama")
        }
        .with_model(model)
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set custom base URL (for API-compatible services)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry_config(mut self, config: LlmRetryConfig) -> Self {
        self.retry_config = config;
        self
    }
}

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct OpenAIMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIMessageToolCall>>,
}

#[derive(Serialize)]
struct OpenAIMessageToolCall {
    id: String,
    r#type: String,
    function: OpenAIMessageFunction,
}

#[derive(Serialize)]
struct OpenAIMessageFunction {
    name: String,
    arguments: String,
}

#[derive(Serialize)]
struct OpenAITool {
    r#type: String,
    function: OpenAIFunction,
}

#[derive(Serialize)]
struct OpenAIFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAIToolCall>>,
}

#[derive(Deserialize)]
struct OpenAIToolCall {
    id: String,
    function: OpenAIFunctionCall,
}

#[derive(Deserialize)]
struct OpenAIFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Deserialize, Debug)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

fn build_request_body(model: &str, request: &CompletionRequest) -> OpenAIRequest {
    let messages: Vec<OpenAIMessage> = request
        .messages
        .iter()
        .map(|m| {
            let role = match m.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::Tool => "tool",
            }
            .to_string();

            let tool_calls = m.tool_calls.as_ref().map(|tcs| {
                tcs.iter()
                    .map(|tc| OpenAIMessageToolCall {
                        id: tc.id.clone(),
                        r#type: "function".to_string(),
                        function: OpenAIMessageFunction {
                            name: tc.name.clone(),
                            arguments: tc.arguments.to_string(),
                        },
                    })
                    .collect()
            });

            // For assistant messages with tool_calls, content can be null
            let content = if m.tool_calls.is_some() && m.content.is_empty() {
                None
            } else {
                Some(m.content.clone())
            };

            OpenAIMessage {
                role,
                content,
                tool_call_id: m.tool_call_id.clone(),
                tool_calls,
            }
        })
        .collect();

    let tools: Option<Vec<OpenAITool>> = if request.tools.is_empty() {
        None
    } else {
        Some(
            request
                .tools
                .iter()
                .map(|t| OpenAITool {
                    r#type: "function".to_string(),
                    function: OpenAIFunction {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    },
                })
                .collect(),
        )
    };

    // tool_choice is rejected by the API when no tools are offered
    let tool_choice = match (&tools, &request.tool_choice) {
        (Some(_), Some(choice)) => Some(match choice {
            ToolChoice::Auto => json!("auto"),
            ToolChoice::Required => json!("required"),
            ToolChoice::Tool(name) => json!({"type": "function", "function": {"name": name}}),
        }),
        _ => None,
    };

    OpenAIRequest {
        model: model.to_string(),
        messages,
        tools,
        tool_choice,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
    }
}

fn parse_tool_call(tc: OpenAIToolCall) -> ToolCall {
    let arguments = match serde_json::from_str(&tc.function.arguments) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(
                tool = %tc.function.name,
                error = %e,
                "Tool call arguments are not valid JSON, keeping raw text"
            );
            Value::String(tc.function.arguments)
        }
    };

    ToolCall {
        id: tc.id,
        name: tc.function.name,
        arguments,
    }
}

impl OpenAIClient {
    /// One chat completions round trip, without retries.
    async fn send_completion(&self, body: &OpenAIRequest) -> Result<CompletionResponse> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response, &self.provider).await);
        }

        let data: OpenAIResponse = response.json().await?;
        let choice = data.choices.into_iter().next().ok_or_else(|| {
            AiError::Llm(format!("No response choices from {}", self.provider))
        })?;

        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(parse_tool_call)
            .collect();

        let finish_reason = match choice.finish_reason.as_deref() {
            Some("stop") if tool_calls.is_empty() => FinishReason::Stop,
            Some("stop") | Some("tool_calls") => FinishReason::ToolCalls,
            Some("length") => FinishReason::MaxTokens,
            None if tool_calls.is_empty() => FinishReason::Stop,
            None => FinishReason::ToolCalls,
            _ => FinishReason::Error,
        };

        let usage = data.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        tracing::debug!(
            provider = %self.provider,
            model = %self.model,
            tool_calls = tool_calls.len(),
            "Chat completion received"
        );

        Ok(CompletionResponse {
            content: choice.message.content,
            tool_calls,
            finish_reason,
            usage,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    fn provider(&self) -> &str {
        &self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = build_request_body(&self.model, &request);
        self.retry_config
            .run(&self.provider, || self.send_completion(&body))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Message, ToolSchema};

    #[test]
    fn test_request_body_maps_tool_calls_and_results() {
        let request = CompletionRequest::new(vec![
            Message::system("sys"),
            Message::user("hi"),
            Message::assistant_with_tool_calls(
                None,
                vec![ToolCall {
                    id: "call-1".to_string(),
                    name: "UpdateMemory".to_string(),
                    arguments: json!({"update_type": "todo"}),
                }],
            ),
            Message::tool_result("call-1", "updated"),
        ]);

        let body = serde_json::to_value(build_request_body("gpt-4o", &request)).unwrap();
        let messages = body["messages"].as_array().unwrap();

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[2]["role"], "assistant");
        assert!(messages[2].get("content").is_none());
        assert_eq!(messages[2]["tool_calls"][0]["function"]["name"], "UpdateMemory");
        assert_eq!(
            messages[2]["tool_calls"][0]["function"]["arguments"],
            r#"{"update_type":"todo"}"#
        );
        assert_eq!(messages[3]["tool_call_id"], "call-1");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_tool_choice_only_sent_with_tools() {
        let without_tools =
            CompletionRequest::new(vec![Message::user("hi")]).with_tool_choice(ToolChoice::Required);
        let body = serde_json::to_value(build_request_body("m", &without_tools)).unwrap();
        assert!(body.get("tool_choice").is_none());

        let with_tools = CompletionRequest::new(vec![Message::user("hi")])
            .with_tools(vec![ToolSchema::new("ToDo", "a task", json!({"type": "object"}))])
            .with_tool_choice(ToolChoice::Tool("ToDo".to_string()));
        let body = serde_json::to_value(build_request_body("m", &with_tools)).unwrap();
        assert_eq!(body["tool_choice"]["function"]["name"], "ToDo");
        assert_eq!(body["tools"][0]["type"], "function");
    }

    #[test]
    fn test_invalid_arguments_are_kept_raw() {
        let call = parse_tool_call(OpenAIToolCall {
            id: "c".to_string(),
            function: OpenAIFunctionCall {
                name: "UpdateMemory".to_string(),
                arguments: "not json".to_string(),
            },
        });
        assert_eq!(call.arguments, Value::String("not json".to_string()));
    }

    #[test]
    fn test_ollama_defaults() {
        let client = OpenAIClient::ollama("llama3.1:8b-instruct-q8_0");
        assert_eq!(client.provider(), "ollama");
        assert_eq!(client.model(), "llama3.1:8b-instruct-q8_0");
        assert_eq!(client.base_url, OLLAMA_BASE_URL);
    }
}
