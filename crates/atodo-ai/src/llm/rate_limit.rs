//! Token-bucket throttling for chat model calls.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant, sleep};

use crate::error::Result;

use super::{CompletionRequest, CompletionResponse, LlmClient};

#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitConfig {
    /// Refill rate. Zero or negative disables throttling.
    pub requests_per_second: f64,
    /// Bucket capacity; also the number of calls allowed back to back.
    pub max_burst: f64,
}

impl Default for RateLimitConfig {
    /// Three requests per minute, bursting up to three.
    fn default() -> Self {
        Self {
            requests_per_second: 3.0 / 60.0,
            max_burst: 3.0,
        }
    }
}

impl RateLimitConfig {
    pub fn unlimited() -> Self {
        Self {
            requests_per_second: 0.0,
            max_burst: 1.0,
        }
    }

    fn is_enabled(&self) -> bool {
        self.requests_per_second > 0.0
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Wraps an [`LlmClient`] and waits for a token before every call.
///
/// Callers are served in lock order; a caller that finds the bucket empty
/// sleeps until the next token is due while holding the bucket.
pub struct RateLimitedLlm {
    inner: Arc<dyn LlmClient>,
    config: RateLimitConfig,
    bucket: Mutex<Bucket>,
}

impl RateLimitedLlm {
    pub fn new(inner: Arc<dyn LlmClient>, config: RateLimitConfig) -> Self {
        let tokens = config.max_burst.max(1.0);
        Self {
            inner,
            config,
            bucket: Mutex::new(Bucket {
                tokens,
                last_refill: Instant::now(),
            }),
        }
    }

    async fn acquire(&self) {
        if !self.config.is_enabled() {
            return;
        }

        let rate = self.config.requests_per_second;
        let burst = self.config.max_burst.max(1.0);
        let mut bucket = self.bucket.lock().await;

        loop {
            let now = Instant::now();
            let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
            bucket.tokens = (bucket.tokens + elapsed * rate).min(burst);
            bucket.last_refill = now;

            if bucket.tokens >= 1.0 {
                bucket.tokens -= 1.0;
                return;
            }

            let wait = Duration::from_secs_f64((1.0 - bucket.tokens) / rate);
            tracing::debug!(
                provider = self.inner.provider(),
                wait_ms = wait.as_millis(),
                "Rate limit reached, waiting for token"
            );
            sleep(wait).await;
        }
    }
}

#[async_trait]
impl LlmClient for RateLimitedLlm {
    fn provider(&self) -> &str {
        self.inner.provider()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.acquire().await;
        self.inner.complete(request).await
    }
}
