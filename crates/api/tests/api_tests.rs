//! Integration tests for the generator API endpoints

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use generator_api::{create_router, ApiConfig, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn setup_test_app() -> Router {
    setup_with_config(ApiConfig::default())
}

fn setup_with_config(config: ApiConfig) -> Router {
    let state = Arc::new(AppState::new(&config).unwrap());
    create_router(state)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (status, json) = send(setup_test_app(), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup_test_app();
    let body = json!({
        "platform": "gitlab-ci",
        "projectName": "web",
        "language": "go",
        "registry": {"repository": "acme/web"}
    });
    let (status, _) = send(app.clone(), post_json("/api/cicd/generate", &body)).await;
    assert_eq!(status, StatusCode::OK);

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("devops_generator_requests_total"));
    assert!(text.contains("devops_generator_duration_seconds"));
}

#[tokio::test]
async fn test_manifest_generate_load_balancer() {
    let body = json!({
        "resourceType": "Service",
        "service": {
            "metadata": {"name": "svc"},
            "type": "LoadBalancer",
            "ports": [{"port": 80}]
        }
    });
    let (status, json) = send(setup_test_app(), post_json("/api/manifest/generate", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["metadata"]["resourceType"], "Service");
    assert!(json["metadata"]["timestamp"].is_string());

    let manifest: serde_yaml::Value =
        serde_yaml::from_str(json["manifest"].as_str().unwrap()).unwrap();
    assert_eq!(manifest["kind"], "Service");
    assert_eq!(manifest["spec"]["type"], "LoadBalancer");
}

#[tokio::test]
async fn test_manifest_validate_reports_cost_warning() {
    let body = json!({
        "resourceType": "Service",
        "service": {
            "metadata": {"name": "svc"},
            "type": "LoadBalancer",
            "ports": [{"port": 80}]
        }
    });
    let (status, json) = send(setup_test_app(), post_json("/api/manifest/validate", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["valid"], true);
    let warnings = json["warnings"].as_array().unwrap();
    assert!(warnings
        .iter()
        .any(|w| w.as_str().unwrap().contains("LoadBalancer")));
    assert!(json["suggestions"].is_array());
}

#[tokio::test]
async fn test_manifest_missing_sub_object_is_rejected() {
    let body = json!({"resourceType": "Deployment"});
    let (status, json) = send(setup_test_app(), post_json("/api/manifest/generate", &body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Validation failed");
    assert_eq!(json["details"][0]["field"], "deployment");
}

#[tokio::test]
async fn test_unknown_enum_value_is_rejected() {
    let body = json!({
        "platform": "travis",
        "projectName": "web",
        "language": "nodejs",
        "registry": {"repository": "acme/web"}
    });
    let (status, json) = send(setup_test_app(), post_json("/api/cicd/generate", &body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Validation failed");
    assert_eq!(json["details"][0]["field"], "body");
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/helm-chart/generate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"metadata\": "))
        .unwrap();
    let (status, json) = send(setup_test_app(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Invalid JSON body");
}

#[tokio::test]
async fn test_body_limit() {
    let app = setup_with_config(ApiConfig {
        body_limit_bytes: 64,
        ..ApiConfig::default()
    });
    let body = json!({
        "metadata": {"name": "web", "description": "x".repeat(256)}
    });
    let (status, json) = send(app, post_json("/api/helm-chart/generate", &body)).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_dockerfile_generate_and_validate() {
    let app = setup_test_app();
    let body = json!({
        "language": "nodejs",
        "projectName": "x",
        "startCommand": "[\"npm\",\"start\"]",
        "security": {"nonRootUser": false}
    });

    let (status, json) = send(app.clone(), post_json("/api/dockerfile/generate", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert!(json["dockerfile"].as_str().unwrap().contains("FROM "));

    let (status, json) = send(app, post_json("/api/dockerfile/validate", &body)).await;
    assert_eq!(status, StatusCode::OK);
    let validation = &json["validation"];
    assert_eq!(validation["valid"], false);
    assert!(validation["warnings"]
        .as_array()
        .unwrap()
        .iter()
        .any(|w| w["severity"] == "high" && w["category"] == "security"));
}

#[tokio::test]
async fn test_helm_chart_generate_and_validate() {
    let app = setup_test_app();
    let body = json!({
        "metadata": {"name": "web"},
        "environments": [{"name": "staging"}, {"name": "production"}],
        "options": {"generateEnvironmentValues": true}
    });

    let (status, json) = send(app.clone(), post_json("/api/helm-chart/generate", &body)).await;
    assert_eq!(status, StatusCode::OK);
    let files = json["files"].as_object().unwrap();
    assert!(files.contains_key("Chart.yaml"));
    assert!(files.contains_key("values-staging.yaml"));
    assert!(files.contains_key("values-production.yaml"));

    let long = json!({"metadata": {"name": "a".repeat(60)}});
    let (status, json) = send(app, post_json("/api/helm-chart/validate", &long)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["validation"]["valid"], false);
}

#[tokio::test]
async fn test_cicd_generate_and_validate() {
    let app = setup_test_app();
    let body = json!({
        "platform": "github-actions",
        "projectName": "web",
        "language": "nodejs",
        "registry": {"repository": "x/y", "tagStrategy": "latest"},
        "deployment": {"enabled": false}
    });

    let (status, json) = send(app.clone(), post_json("/api/cicd/generate", &body)).await;
    assert_eq!(status, StatusCode::OK);
    let files = json["files"].as_object().unwrap();
    let workflow: serde_yaml::Value =
        serde_yaml::from_str(files[".github/workflows/ci-cd.yml"].as_str().unwrap()).unwrap();
    assert!(workflow["jobs"].get("build").is_some());
    assert!(workflow["jobs"].get("deploy").is_none());

    let (status, json) = send(app, post_json("/api/cicd/validate", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["validation"]["suggestions"].as_array().unwrap().len() >= 3);
}

#[tokio::test]
async fn test_templates_endpoints() {
    let app = setup_test_app();
    let cases = [
        ("/api/manifest/templates", vec!["deployment", "service"]),
        ("/api/helm-chart/templates", vec!["basic", "microservice", "production"]),
        ("/api/cicd/templates", vec!["github-actions", "gitlab-ci", "jenkins"]),
    ];
    for (uri, expected) in cases {
        let (status, json) = send(app.clone(), get(uri)).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        let names: Vec<&str> = json["templates"]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(names, expected, "{}", uri);
    }

    let (_, json) = send(app, get("/api/dockerfile/templates")).await;
    assert_eq!(json["templates"].as_object().unwrap().len(), 8);
}

#[tokio::test]
async fn test_cors_headers() {
    let app = setup_with_config(ApiConfig {
        cors_origin: "https://app.example.com".to_string(),
        ..ApiConfig::default()
    });

    let preflight = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/cicd/generate")
        .header(header::ORIGIN, "https://app.example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(preflight).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://app.example.com"
    );

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://app.example.com"
    );
}
