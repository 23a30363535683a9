//! CLI configuration file support
//!
//! Loads configuration from ~/.config/atodo/config.toml

use std::path::{Path, PathBuf};

use atodo_ai::RateLimitConfig;
use serde::{Deserialize, Serialize};

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub default: DefaultConfig,
    #[serde(default)]
    pub api_keys: ApiKeysConfig,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
}

/// Default configuration values
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultConfig {
    pub db_path: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub user_id: Option<String>,
    pub assistant_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeysConfig {
    pub openai: Option<String>,
}

/// Client-side throttling of model requests. Unset values use the defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateLimitSettings {
    pub requests_per_second: Option<f64>,
    pub max_burst: Option<f64>,
}

impl RateLimitSettings {
    pub fn to_config(&self) -> RateLimitConfig {
        let defaults = RateLimitConfig::default();
        RateLimitConfig {
            requests_per_second: self
                .requests_per_second
                .unwrap_or(defaults.requests_per_second),
            max_burst: self.max_burst.unwrap_or(defaults.max_burst),
        }
    }
}

impl CliConfig {
    /// Load configuration from default path
    pub fn load() -> Self {
        Self::load_from_path(Self::default_path())
    }

    /// Load configuration from a specific path. Missing or unreadable files
    /// give the defaults.
    pub fn load_from_path(path: Option<PathBuf>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::read(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring invalid config file");
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("atodo").join("config.toml"))
    }

    /// API key from the config file, else from `OPENAI_API_KEY`.
    pub fn openai_api_key(&self) -> Option<String> {
        self.openai_api_key_with(|key| std::env::var(key).ok())
    }

    fn openai_api_key_with<F>(&self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.api_keys
            .openai
            .clone()
            .or_else(|| lookup(OPENAI_API_KEY_ENV))
            .filter(|key| !key.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = CliConfig::load_from_path(Some(dir.path().join("config.toml")));
        assert!(config.default.model.is_none());
        assert!(config.api_keys.openai.is_none());
    }

    #[test]
    fn test_load_full_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[default]
model = "llama3.1"
base_url = "http://localhost:11434/v1"
user_id = "dan"

[api_keys]
openai = "sk-test"

[rate_limit]
requests_per_second = 2.0
"#,
        )
        .unwrap();

        let config = CliConfig::load_from_path(Some(path));
        assert_eq!(config.default.model.as_deref(), Some("llama3.1"));
        assert_eq!(config.default.user_id.as_deref(), Some("dan"));
        assert_eq!(config.api_keys.openai.as_deref(), Some("sk-test"));

        let rate_limit = config.rate_limit.to_config();
        assert_eq!(rate_limit.requests_per_second, 2.0);
        assert_eq!(rate_limit.max_burst, RateLimitConfig::default().max_burst);
    }

    #[test]
    fn test_invalid_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[default\nmodel = ").unwrap();

        let config = CliConfig::load_from_path(Some(path));
        assert!(config.default.model.is_none());
    }

    #[test]
    fn test_api_key_falls_back_to_env() {
        let config = CliConfig::default();
        let key = config.openai_api_key_with(|name| {
            (name == OPENAI_API_KEY_ENV).then(|| "sk-env".to_string())
        });
        assert_eq!(key.as_deref(), Some("sk-env"));

        let mut config = CliConfig::default();
        config.api_keys.openai = Some("sk-file".to_string());
        let key = config.openai_api_key_with(|_| Some("sk-env".to_string()));
        assert_eq!(key.as_deref(), Some("sk-file"));

        assert!(CliConfig::default().openai_api_key_with(|_| None).is_none());
    }
}
