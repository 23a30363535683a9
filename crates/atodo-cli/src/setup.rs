//! CLI setup module
//!
//! Builds the memory store, the model client and the assistant from command
//! line flags and the config file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use atodo_ai::{LlmClient, OpenAIClient, RateLimitedLlm};
use atodo_core::{Assistant, AssistantConfig, InMemoryStore, MemoryStore, RedbMemoryStore};
use atodo_storage::paths;

use crate::cli::Cli;
use crate::config::{CliConfig, OPENAI_API_KEY_ENV};

/// Model used against a keyless OpenAI-compatible server such as Ollama.
const LOCAL_DEFAULT_MODEL: &str = "llama3.1";

pub fn open_store(cli: &Cli, config: &CliConfig) -> Result<Arc<dyn MemoryStore>> {
    if cli.in_memory {
        tracing::info!("Using in-memory store");
        return Ok(Arc::new(InMemoryStore::new()));
    }

    let path = match cli.db_path.as_ref().or(config.default.db_path.as_ref()) {
        Some(path) => PathBuf::from(path),
        None => {
            paths::ensure_atodo_dir()?;
            paths::database_path()?
        }
    };
    tracing::info!(path = %path.display(), "Opening memory database");
    Ok(Arc::new(RedbMemoryStore::open(&path)?))
}

pub fn build_llm(cli: &Cli, config: &CliConfig) -> Result<Arc<dyn LlmClient>> {
    let model = cli.model.clone().or_else(|| config.default.model.clone());
    let base_url = cli.base_url.clone().or_else(|| config.default.base_url.clone());

    let client = match (config.openai_api_key(), base_url) {
        (Some(key), base_url) => {
            let mut client = OpenAIClient::new(key);
            if let Some(model) = model {
                client = client.with_model(model);
            }
            if let Some(url) = base_url {
                client = client.with_base_url(url);
            }
            client
        }
        (None, Some(url)) => {
            OpenAIClient::ollama(model.unwrap_or_else(|| LOCAL_DEFAULT_MODEL.to_string()))
                .with_base_url(url)
        }
        (None, None) => bail!(
            "No API key configured. Set {OPENAI_API_KEY_ENV}, add [api_keys] openai to {}, \
             or pass --base-url for a local OpenAI-compatible server",
            CliConfig::default_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "config.toml".to_string())
        ),
    };

    let rate_limit = config.rate_limit.to_config();
    tracing::debug!(
        requests_per_second = rate_limit.requests_per_second,
        max_burst = rate_limit.max_burst,
        "Model rate limit"
    );
    Ok(Arc::new(RateLimitedLlm::new(Arc::new(client), rate_limit)))
}

/// Config file values, then environment overrides, then command line flags.
pub fn assistant_config(cli: &Cli, config: &CliConfig) -> AssistantConfig {
    let mut resolved = AssistantConfig::default();
    if let Some(user_id) = &config.default.user_id {
        resolved.user_id = user_id.clone();
    }
    if let Some(assistant_type) = &config.default.assistant_type {
        resolved.assistant_type = assistant_type.clone();
    }
    let mut resolved = resolved.with_env_overrides();
    if let Some(user_id) = &cli.user_id {
        resolved.user_id = user_id.clone();
    }
    if let Some(assistant_type) = &cli.assistant_type {
        resolved.assistant_type = assistant_type.clone();
    }
    resolved
}

pub fn build_assistant(cli: &Cli, config: &CliConfig) -> Result<Assistant> {
    let store = open_store(cli, config)?;
    let llm = build_llm(cli, config).context("Failed to set up the chat model")?;
    Ok(Assistant::builder(llm, store)
        .config(assistant_config(cli, config))
        .build())
}
