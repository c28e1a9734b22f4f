//! `dgen templates`

use anyhow::Result;
use serde_json::Value;
use tabled::{settings::Style, Table, Tabled};

use super::Kind;
use crate::client::{ApiClient, TemplatesResponse};
use crate::output::{print_info, print_json, OutputFormat};

/// Row for the templates table
#[derive(Tabled)]
struct TemplateRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Fields")]
    fields: String,
}

fn top_level_fields(template: &Value) -> String {
    template
        .as_object()
        .map(|object| object.keys().cloned().collect::<Vec<_>>().join(", "))
        .unwrap_or_default()
}

/// List the canned example requests, or print one of them
///
/// A single template is always printed as JSON so it can be saved and fed
/// back to `generate`.
pub async fn templates(client: &ApiClient, kind: Kind, name: Option<&str>, format: OutputFormat) -> Result<()> {
    let path = format!("{}/templates", kind.route());
    let response: TemplatesResponse = client.get(&path).await?;

    if let Some(name) = name {
        let Some(template) = response.templates.get(name) else {
            let available: Vec<&str> = response.templates.keys().map(String::as_str).collect();
            anyhow::bail!(
                "unknown template '{}' (available: {})",
                name,
                available.join(", ")
            );
        };
        return print_json(template);
    }

    match format {
        OutputFormat::Json => print_json(&response.templates)?,
        OutputFormat::Table => {
            let rows: Vec<TemplateRow> = response
                .templates
                .iter()
                .map(|(name, template)| TemplateRow {
                    name: name.clone(),
                    fields: top_level_fields(template),
                })
                .collect();
            let table = Table::new(rows).with(Style::rounded()).to_string();
            println!("{}", table);
            print_info("Print one with --name <NAME> and save it as a generate input");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_level_fields() {
        let template = serde_json::json!({"resourceType": "Service", "service": {}});
        assert_eq!(top_level_fields(&template), "resourceType, service");
    }

    #[tokio::test]
    async fn test_unknown_template_lists_available() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/helm-chart/templates")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":true,"templates":{"basic":{},"production":{}}}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = templates(&client, Kind::Helm, Some("staging"), OutputFormat::Table)
            .await
            .unwrap_err()
            .to_string();

        assert!(err.contains("unknown template 'staging'"));
        assert!(err.contains("basic, production"));
    }
}
