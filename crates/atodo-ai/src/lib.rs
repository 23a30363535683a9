//! ATodo AI - model access for the memory-routing assistant
//!
//! This crate provides:
//! - The `LlmClient` trait and chat message model (messages, tool calls, tool schemas)
//! - An OpenAI-compatible chat-completions client (OpenAI, Ollama) with retries
//! - A token-bucket rate limiter that wraps any client
//! - A deterministic, scripted mock client for tests
//! - Tool-calling document extraction: patch existing JSON documents or insert new ones

pub mod error;
pub mod extract;
mod http_client;
pub mod llm;

pub use error::{AiError, Result};
pub use extract::{
    ExistingDoc, ExtractionListener, ExtractionRequest, ExtractionResult, Extractor,
    LlmExtractor, PATCH_DOC_TOOL, PatchOperation, ResponseMetadata, ToolCallInspector,
    parse_patch_list,
};
pub use llm::{
    CompletionRequest, CompletionResponse, FinishReason, LlmClient, LlmRetryConfig, Message,
    MockLlmClient, MockStep, OpenAIClient, RateLimitConfig, RateLimitedLlm, Role, TokenUsage,
    ToolCall, ToolChoice, ToolSchema,
};
