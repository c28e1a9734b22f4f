//! `dgen validate`

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use super::{read_input, Kind};
use crate::client::{ApiClient, ManifestValidation, Validation, ValidationResponse};
use crate::output::{color_severity, print_json, print_success, print_warning, OutputFormat};

/// Row for the warnings table
#[derive(Tabled)]
struct WarningRow {
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Message")]
    message: String,
}

/// Ask the API for advisory warnings on a request body
pub async fn fetch_validation(client: &ApiClient, kind: Kind, body: &serde_json::Value) -> Result<Validation> {
    let path = format!("{}/validate", kind.route());

    Ok(match kind {
        Kind::Manifest => client.post::<ManifestValidation, _>(&path, body).await?.into(),
        Kind::Dockerfile | Kind::Helm | Kind::Cicd => {
            client.post::<ValidationResponse, _>(&path, body).await?.validation
        }
    })
}

/// Validate a request and print the warnings; fails when any warning is high severity
pub async fn validate(client: &ApiClient, kind: Kind, input: &Path, format: OutputFormat) -> Result<()> {
    let body = read_input(input)?;
    let validation = fetch_validation(client, kind, &body).await?;

    match format {
        OutputFormat::Json => print_json(&validation)?,
        OutputFormat::Table => print_table(&validation),
    }

    if !validation.valid {
        anyhow::bail!("validation found high severity warnings");
    }
    Ok(())
}

fn print_table(validation: &Validation) {
    if validation.warnings.is_empty() {
        print_success("No warnings");
    } else {
        let rows: Vec<WarningRow> = validation
            .warnings
            .iter()
            .map(|w| WarningRow {
                severity: color_severity(&w.severity),
                category: w.category.clone(),
                field: w.field.clone().unwrap_or_else(|| "-".to_string()),
                message: w.message.clone(),
            })
            .collect();
        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{}", table);
        if validation.valid {
            print_warning(&format!("{} warning(s)", validation.warnings.len()));
        }
    }

    if !validation.suggestions.is_empty() {
        println!("\n{}", "Suggestions".bold());
        for suggestion in &validation.suggestions {
            println!("  • {}", suggestion);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_high_severity_fails() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/dockerfile/validate")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"success":true,"validation":{"valid":false,"warnings":[{"severity":"high","category":"security","message":"Container runs as root","field":"security.nonRootUser"}],"suggestions":[]}}"#,
            )
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("dockerfile.json");
        std::fs::write(&input, r#"{"language": "nodejs", "projectName": "x"}"#).unwrap();

        let client = ApiClient::new(&server.url()).unwrap();
        let validation = fetch_validation(&client, Kind::Dockerfile, &serde_json::json!({}))
            .await
            .unwrap();
        assert!(!validation.valid);
        assert_eq!(validation.warnings[0].field.as_deref(), Some("security.nonRootUser"));

        let err = validate(&client, Kind::Dockerfile, &input, OutputFormat::Json)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("high severity"));
    }

    #[tokio::test]
    async fn test_manifest_warnings_are_text() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/manifest/validate")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"success":true,"valid":true,"warnings":["Service 'svc' is of type LoadBalancer"],"suggestions":["kubectl apply --dry-run=server -f svc.yaml"]}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let validation = fetch_validation(&client, Kind::Manifest, &serde_json::json!({}))
            .await
            .unwrap();

        assert!(validation.valid);
        assert!(validation.warnings[0].message.contains("LoadBalancer"));
        assert_eq!(validation.suggestions.len(), 1);
    }
}
