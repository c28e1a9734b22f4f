//! DevOps Generator CLI
//!
//! A command-line client for the generator API: produce Kubernetes
//! manifests, Dockerfiles, Helm charts and CI/CD pipelines from JSON
//! request files and write them into a project.

mod client;
mod commands;
mod config;
mod files;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{generate, health, templates, validate, Kind};

/// DevOps Generator CLI
#[derive(Parser)]
#[command(name = "dgen")]
#[command(author, version, about = "CLI for the DevOps Generator API", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via DGEN_API_URL env var)
    #[arg(long, env = "DGEN_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate an artifact from a JSON request file
    Generate {
        /// Artifact kind
        #[arg(value_enum)]
        kind: Kind,

        /// Request file (`-` reads stdin)
        #[arg(long, short)]
        input: PathBuf,

        /// Directory to write files into
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Print the files instead of writing them
        #[arg(long, conflicts_with = "output")]
        stdout: bool,
    },

    /// Report advisory warnings for a JSON request file
    Validate {
        /// Artifact kind
        #[arg(value_enum)]
        kind: Kind,

        /// Request file (`-` reads stdin)
        #[arg(long, short)]
        input: PathBuf,
    },

    /// List example requests
    Templates {
        /// Artifact kind
        #[arg(value_enum)]
        kind: Kind,

        /// Print a single template
        #[arg(long, short)]
        name: Option<String>,
    },

    /// Check that the API is reachable
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load()?;

    // Initialize client
    let client = client::ApiClient::new(&config.api_url(cli.api_url.as_deref()))?;

    // Execute command
    match cli.command {
        Commands::Generate {
            kind,
            input,
            output,
            stdout,
        } => {
            let output_dir = config.output_dir(output);
            generate::generate(&client, kind, &input, output_dir, stdout, cli.format).await?;
        }
        Commands::Validate { kind, input } => {
            validate::validate(&client, kind, &input, cli.format).await?;
        }
        Commands::Templates { kind, name } => {
            templates::templates(&client, kind, name.as_deref(), cli.format).await?;
        }
        Commands::Health => {
            health::health(&client, cli.format).await?;
        }
    }

    Ok(())
}
