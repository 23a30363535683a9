mod cli_config;

pub use cli_config::{CliConfig, OPENAI_API_KEY_ENV};
