//! Retrying model requests with capped exponential backoff

use std::future::Future;
use std::time::Duration;

use reqwest::Response;

use crate::error::{AiError, Result};

/// Longest error body kept in an [`AiError::LlmHttp`] message, in characters.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// How often and how patiently a client retries failed requests.
#[derive(Debug, Clone)]
pub struct LlmRetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Wait before the first retry; doubled for each later one.
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for LlmRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 200,
            max_delay_ms: 5_000,
        }
    }
}

impl LlmRetryConfig {
    /// Wait before retry number `retry`, counted from 1.
    fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u64.saturating_pow(retry.saturating_sub(1));
        let delay = self.initial_delay_ms.saturating_mul(factor);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error or
    /// the retries are used up. A server-sent `Retry-After` replaces the
    /// backoff for that wait.
    pub async fn run<T, F, Fut>(&self, provider: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retries = 0;
        loop {
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };
            if retries >= self.max_retries || !error.is_retryable() {
                return Err(error);
            }

            retries += 1;
            let delay = error
                .retry_after()
                .map(Duration::from_secs)
                .unwrap_or_else(|| self.backoff(retries));
            tracing::warn!(
                provider,
                retry = retries,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retrying model request"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// Turn a non-success response into an error, keeping the status, a bounded
/// copy of the body and any `Retry-After` seconds.
pub(crate) async fn error_from_response(response: Response, provider: &str) -> AiError {
    let status = response.status().as_u16();
    let retry_after_secs = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();

    let message = match body.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((cut, _)) => format!("{}... [truncated]", &body[..cut]),
        None => body,
    };

    AiError::LlmHttp {
        provider: provider.to_string(),
        status,
        message,
        retry_after_secs,
    }
}
