//! Server configuration.

use anyhow::Context;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use parley_core::chat::{DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL, DEFAULT_SYSTEM_PROMPT};
use parley_core::storage::StorageConfig;
use std::path::PathBuf;

/// Server configuration
///
/// Every option can be given as a flag or through its environment variable.
/// A `.env` file in the working directory is loaded before parsing.
#[derive(Parser, Debug, Clone)]
#[command(name = "parley-server")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Address to bind
    #[arg(long, env = "PARLEY_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PARLEY_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Store conversations in S3 instead of the local directory
    #[arg(
        long,
        env = "USE_S3",
        default_value_t = false,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub use_s3: bool,

    /// Bucket holding conversation objects
    #[arg(long, env = "S3_BUCKET")]
    pub s3_bucket: Option<String>,

    /// Directory for conversation files (and the S3 fallback)
    #[arg(long, env = "MEMORY_DIR", default_value = "../memory")]
    pub memory_dir: PathBuf,

    /// Write to MEMORY_DIR when an S3 write fails transiently
    #[arg(
        long,
        env = "S3_LOCAL_FALLBACK",
        default_value_t = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub s3_local_fallback: bool,

    /// Comma-separated list of allowed CORS origins
    #[arg(long, env = "CORS_ORIGINS", default_value = "http://localhost:3000")]
    pub cors_origins: String,

    /// API key for the chat completions endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Chat model name
    #[arg(long, env = "OPENAI_MODEL", default_value = DEFAULT_OPENAI_MODEL)]
    pub openai_model: String,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_OPENAI_BASE_URL)]
    pub openai_base_url: String,

    /// System prompt text
    #[arg(long, env = "SYSTEM_PROMPT", conflicts_with = "system_prompt_file")]
    pub system_prompt: Option<String>,

    /// File containing the system prompt
    #[arg(long, env = "SYSTEM_PROMPT_FILE")]
    pub system_prompt_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from `.env`, the environment, and flags
    pub fn load() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Reject combinations that cannot start a server
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.use_s3 && self.bucket().is_none() {
            anyhow::bail!("USE_S3 is enabled but S3_BUCKET is not set");
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Storage label reported by the root endpoint
    pub fn storage_label(&self) -> &'static str {
        if self.use_s3 { "s3" } else { "local" }
    }

    pub fn storage_config(&self) -> StorageConfig {
        match self.bucket() {
            Some(bucket) if self.use_s3 => StorageConfig::S3 {
                bucket: bucket.to_string(),
                local_fallback: self.s3_local_fallback.then(|| self.memory_dir.clone()),
            },
            _ => StorageConfig::Local {
                root: self.memory_dir.clone(),
            },
        }
    }

    /// Allowed origins, trimmed, empty entries dropped
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Resolve the system prompt: inline text, then file, then the default
    pub fn load_system_prompt(&self) -> anyhow::Result<String> {
        if let Some(prompt) = self.system_prompt.as_deref().filter(|p| !p.trim().is_empty()) {
            return Ok(prompt.to_string());
        }
        if let Some(path) = &self.system_prompt_file {
            let prompt = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
            return Ok(prompt.trim_end().to_string());
        }
        Ok(DEFAULT_SYSTEM_PROMPT.to_string())
    }

    fn bucket(&self) -> Option<&str> {
        self.s3_bucket
            .as_deref()
            .map(str::trim)
            .filter(|bucket| !bucket.is_empty())
    }
}
