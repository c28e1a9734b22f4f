//! `dgen generate`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use super::{read_input, Kind};
use crate::client::{ApiClient, DockerfileResponse, FilesResponse, ManifestResponse};
use crate::files::write_files;
use crate::output::{format_size, print_json, print_success, OutputFormat};

/// Row for the written files table
#[derive(Tabled)]
struct FileRow {
    #[tabled(rename = "File")]
    path: String,
    #[tabled(rename = "Size")]
    size: String,
}

/// Request an artifact and collect it as a file set
pub async fn fetch_files(client: &ApiClient, kind: Kind, body: &serde_json::Value) -> Result<BTreeMap<String, String>> {
    let path = format!("{}/generate", kind.route());

    let files = match kind {
        Kind::Manifest => {
            let response: ManifestResponse = client.post(&path, body).await?;
            let name = format!("{}.yaml", response.metadata.resource_type.to_lowercase());
            BTreeMap::from([(name, response.manifest)])
        }
        Kind::Dockerfile => {
            let response: DockerfileResponse = client.post(&path, body).await?;
            let mut files = BTreeMap::from([("Dockerfile".to_string(), response.dockerfile)]);
            if let Some(ignore) = response.dockerignore {
                files.insert(".dockerignore".to_string(), ignore);
            }
            files
        }
        Kind::Helm | Kind::Cicd => {
            let response: FilesResponse = client.post(&path, body).await?;
            response.files
        }
    };

    Ok(files)
}

/// Generate an artifact and write it to disk (or stdout)
pub async fn generate(
    client: &ApiClient,
    kind: Kind,
    input: &Path,
    output_dir: PathBuf,
    to_stdout: bool,
    format: OutputFormat,
) -> Result<()> {
    let body = read_input(input)?;
    let files = fetch_files(client, kind, &body).await?;

    if to_stdout {
        match format {
            OutputFormat::Json => print_json(&files)?,
            OutputFormat::Table => {
                let single = files.len() == 1;
                for (path, content) in &files {
                    if !single {
                        println!("{}", format!("# --- {}", path).dimmed());
                    }
                    print!("{}", content);
                }
            }
        }
        return Ok(());
    }

    let written = write_files(&output_dir, &files)?;

    match format {
        OutputFormat::Json => {
            let paths: Vec<String> = written.iter().map(|f| f.path.display().to_string()).collect();
            print_json(&paths)?;
        }
        OutputFormat::Table => {
            let rows: Vec<FileRow> = written
                .iter()
                .map(|f| FileRow {
                    path: f.path.display().to_string(),
                    size: format_size(f.bytes),
                })
                .collect();
            let table = Table::new(rows).with(Style::rounded()).to_string();
            println!("{}", table);
            print_success(&format!(
                "Wrote {} file(s) to {}",
                written.len(),
                output_dir.display().to_string().cyan()
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manifest_becomes_single_file() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/manifest/generate")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"success":true,"manifest":"kind: Service\n","metadata":{"resourceType":"Service","timestamp":"2026-01-01T00:00:00Z"}}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let files = fetch_files(&client, Kind::Manifest, &serde_json::json!({}))
            .await
            .unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files["service.yaml"], "kind: Service\n");
    }

    #[tokio::test]
    async fn test_dockerfile_with_ignore_file() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/dockerfile/generate")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":true,"dockerfile":"FROM alpine\n","dockerignore":".git\n"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let files = fetch_files(&client, Kind::Dockerfile, &serde_json::json!({}))
            .await
            .unwrap();

        let names: Vec<&str> = files.keys().map(String::as_str).collect();
        assert_eq!(names, vec![".dockerignore", "Dockerfile"]);
    }

    #[tokio::test]
    async fn test_generate_writes_helm_chart() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/helm-chart/generate")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"success":true,"files":{"Chart.yaml":"name: web\n","templates/service.yaml":"kind: Service\n"}}"#,
            )
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("chart.json");
        std::fs::write(&input, r#"{"metadata": {"name": "web"}}"#).unwrap();
        let out = dir.path().join("web");

        let client = ApiClient::new(&server.url()).unwrap();
        generate(&client, Kind::Helm, &input, out.clone(), false, OutputFormat::Json)
            .await
            .unwrap();

        assert!(out.join("Chart.yaml").exists());
        assert!(out.join("templates/service.yaml").exists());
    }
}
