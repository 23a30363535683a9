//! LLM module - chat model client abstraction

mod client;
mod mock_client;
mod openai;
mod rate_limit;
mod retry;

pub use client::{
    CompletionRequest, CompletionResponse, FinishReason, LlmClient, Message, Role, TokenUsage,
    ToolCall, ToolChoice, ToolSchema,
};
pub use mock_client::{MockLlmClient, MockStep, MockStepKind};
pub use openai::OpenAIClient;
pub use rate_limit::{RateLimitConfig, RateLimitedLlm};
pub use retry::LlmRetryConfig;
