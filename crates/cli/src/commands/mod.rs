//! Subcommand implementations

pub mod generate;
pub mod health;
pub mod templates;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde_json::Value;

/// Which generator a command talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Kind {
    /// Kubernetes manifest
    Manifest,
    /// Dockerfile and .dockerignore
    Dockerfile,
    /// Helm chart
    Helm,
    /// CI/CD pipeline
    Cicd,
}

impl Kind {
    /// API route prefix for this generator
    pub fn route(self) -> &'static str {
        match self {
            Kind::Manifest => "api/manifest",
            Kind::Dockerfile => "api/dockerfile",
            Kind::Helm => "api/helm-chart",
            Kind::Cicd => "api/cicd",
        }
    }
}

/// Read a JSON request body from a file, or stdin when the path is `-`
pub fn read_input(path: &Path) -> Result<Value> {
    let content = if path == Path::new("-") {
        std::io::read_to_string(std::io::stdin()).context("Failed to read stdin")?
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    };

    serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", path.display()))
}
