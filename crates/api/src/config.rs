//! API configuration

use anyhow::{Context, Result};
use serde::Deserialize;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// HTTP listen port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// The single origin allowed by CORS
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,

    /// Maximum accepted request body size
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,

    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_api_port() -> u16 {
    3000
}

fn default_cors_origin() -> String {
    "http://localhost:5173".to_string()
}

fn default_body_limit() -> usize {
    10 * 1024 * 1024
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            cors_origin: default_cors_origin(),
            body_limit_bytes: default_body_limit(),
            log_format: LogFormat::default(),
        }
    }
}

impl ApiConfig {
    /// Load configuration from an optional `generator-api.*` file, then
    /// `GENERATOR_*` environment variables
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("generator-api").required(false))
            .add_source(config::Environment::with_prefix("GENERATOR").try_parsing(true))
            .build()
            .context("failed to read configuration")?;

        config
            .try_deserialize()
            .context("invalid configuration")
    }
}
