//! API client for the generator service

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// API client for the generator service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            match serde_json::from_str::<ErrorBody>(&body) {
                Ok(error) => anyhow::bail!("API error ({}): {}", status, error.describe()),
                Err(_) => anyhow::bail!("API error ({}): {}", status, body),
            }
        }

        response.json().await.context("Failed to parse response")
    }
}

// API response types

/// Error body returned for rejected requests
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default)]
    pub details: Option<Value>,
}

impl ErrorBody {
    fn describe(&self) -> String {
        let details = match &self.details {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match (item["field"].as_str(), item["message"].as_str()) {
                    (Some(field), Some(message)) => format!("{}: {}", field, message),
                    _ => item.to_string(),
                })
                .collect::<Vec<_>>(),
            Some(Value::String(detail)) => vec![detail.clone()],
            _ => Vec::new(),
        };
        if details.is_empty() {
            self.error.clone()
        } else {
            format!("{}\n  - {}", self.error, details.join("\n  - "))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestMetadata {
    pub resource_type: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestResponse {
    pub manifest: String,
    pub metadata: ManifestMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockerfileResponse {
    pub dockerfile: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerignore: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesResponse {
    pub files: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warning {
    pub severity: String,
    pub category: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Validation {
    pub valid: bool,
    pub warnings: Vec<Warning>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub validation: Validation,
}

/// Manifest validation carries plain-text warnings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestValidation {
    pub valid: bool,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

impl From<ManifestValidation> for Validation {
    fn from(v: ManifestValidation) -> Self {
        Self {
            valid: v.valid,
            warnings: v
                .warnings
                .into_iter()
                .map(|message| Warning {
                    severity: "medium".to_string(),
                    category: "best-practice".to_string(),
                    message,
                    field: None,
                })
                .collect(),
            suggestions: v.suggestions,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplatesResponse {
    pub templates: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_health() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/health")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"ok","timestamp":"2026-01-01T00:00:00Z"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let health: HealthStatus = client.get("health").await.unwrap();

        mock.assert_async().await;
        assert_eq!(health.status, "ok");
    }

    #[tokio::test]
    async fn test_post_files() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/cicd/generate")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"platform":"jenkins"}"#.to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":true,"files":{"Jenkinsfile":"pipeline {}\n"}}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let body = serde_json::json!({"platform": "jenkins", "projectName": "web"});
        let response: FilesResponse = client.post("api/cicd/generate", &body).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.files["Jenkinsfile"], "pipeline {}\n");
    }

    #[tokio::test]
    async fn test_validation_error_details() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/helm-chart/generate")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"success":false,"error":"Validation failed","details":[{"field":"metadata.name","message":"must be a DNS-1123 label"}]}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client
            .post::<FilesResponse, _>("api/helm-chart/generate", &serde_json::json!({}))
            .await
            .unwrap_err()
            .to_string();

        assert!(err.contains("400"));
        assert!(err.contains("Validation failed"));
        assert!(err.contains("metadata.name: must be a DNS-1123 label"));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(ApiClient::new("not a url").is_err());
    }

    #[test]
    fn test_manifest_validation_conversion() {
        let validation: Validation = ManifestValidation {
            valid: true,
            warnings: vec!["No resource limits".to_string()],
            suggestions: vec![],
        }
        .into();
        assert!(validation.valid);
        assert_eq!(validation.warnings[0].message, "No resource limits");
    }
}
