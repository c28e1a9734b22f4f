//! `dgen health`

use anyhow::Result;

use crate::client::{ApiClient, HealthStatus};
use crate::output::{color_status, print_json, OutputFormat};

/// Check that the API is up
pub async fn health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let status: HealthStatus = client.get("health").await?;

    match format {
        OutputFormat::Json => print_json(&status)?,
        OutputFormat::Table => {
            println!("Status:    {}", color_status(&status.status));
            println!("Timestamp: {}", status.timestamp);
        }
    }

    if status.status != "ok" {
        anyhow::bail!("API reported status '{}'", status.status);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degraded_status_fails() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/health")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"starting","timestamp":"2026-01-01T00:00:00Z"}"#)
            .create();

        let client = ApiClient::new(&server.url()).unwrap();
        let result = tokio_test::block_on(health(&client, OutputFormat::Json));

        assert!(result.unwrap_err().to_string().contains("starting"));
    }
}
