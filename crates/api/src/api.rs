//! HTTP API for the four generators, health checks and Prometheus metrics

use std::{collections::BTreeMap, sync::Arc, time::Instant};

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, OriginalUri, Request, State},
    http::{header, HeaderValue, Method, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use generator_lib::{
    schema::{
        cicd::CicdRequest, dockerfile::DockerfileRequest, helm::HelmChartRequest,
        manifest::ManifestRequest,
    },
    templates, CicdGenerator, DockerfileGenerator, DockerfileOutput, FieldError, FileSet,
    GeneratorMetrics, HelmChartGenerator, ManifestGenerator, SchemaCheck, StructuredLogger,
    ValidationResult,
};
use prometheus::{Encoder, TextEncoder};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::{config::ApiConfig, error::ApiError};

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub metrics: GeneratorMetrics,
    pub logger: StructuredLogger,
    pub cors_origin: HeaderValue,
    pub body_limit: usize,
}

impl AppState {
    pub fn new(config: &ApiConfig) -> anyhow::Result<Self> {
        let cors_origin = HeaderValue::from_str(&config.cors_origin)
            .map_err(|e| anyhow::anyhow!("invalid CORS origin {:?}: {}", config.cors_origin, e))?;

        Ok(Self {
            metrics: GeneratorMetrics::new(),
            logger: StructuredLogger::new("generator-api"),
            cors_origin,
            body_limit: config.body_limit_bytes,
        })
    }

    fn record(&self, generator: &str, operation: &str, success: bool, started: Instant) -> f64 {
        let elapsed = started.elapsed().as_secs_f64();
        self.metrics.observe(generator, operation, success, elapsed);
        elapsed * 1000.0
    }

    fn record_validation(&self, generator: &str, started: Instant, result: &ValidationResult) {
        self.record(generator, "validate", true, started);
        self.metrics.add_warnings(generator, result.warnings.len());
        self.logger
            .log_validated(generator, result.valid, result.warnings.len());
    }
}

/// Turn a raw JSON body into a checked request
///
/// Malformed JSON is reported as such; a body that is valid JSON but does not
/// fit the request schema is reported field by field.
fn parse<T>(
    state: &AppState,
    uri: &Uri,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<T, ApiError>
where
    T: DeserializeOwned + SchemaCheck,
{
    let reject = |reason: &str, errors: usize| state.logger.log_rejected(uri.path(), reason, errors);

    let Json(value) = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            reject("payload_too_large", 1);
            ApiError::PayloadTooLarge(state.body_limit)
        } else {
            reject("invalid_json", 1);
            ApiError::InvalidJson(rejection.body_text())
        }
    })?;

    let request: T = serde_json::from_value(value).map_err(|e| {
        reject("schema", 1);
        ApiError::Validation(vec![FieldError::new("body", e.to_string())])
    })?;

    request.check_all().map_err(|errors| {
        reject("schema", errors.len());
        ApiError::Validation(errors)
    })?;

    Ok(request)
}

#[derive(Serialize)]
struct FilesResponse {
    success: bool,
    files: FileSet,
}

#[derive(Serialize)]
struct ValidationResponse {
    success: bool,
    validation: ValidationResult,
}

#[derive(Serialize)]
struct DockerfileResponse {
    success: bool,
    #[serde(flatten)]
    output: DockerfileOutput,
}

#[derive(Serialize)]
struct TemplatesResponse {
    success: bool,
    templates: BTreeMap<&'static str, Value>,
}

fn templates_response(templates: BTreeMap<&'static str, Value>) -> Json<TemplatesResponse> {
    Json(TemplatesResponse {
        success: true,
        templates,
    })
}

async fn manifest_generate(
    State(state): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let req: ManifestRequest = parse(&state, &uri, body)?;

    let started = Instant::now();
    let manifest = ManifestGenerator::new(&req).generate();
    let duration_ms = state.record("manifest", "generate", manifest.is_ok(), started);
    let manifest = manifest?;
    state.logger.log_generated("manifest", 1, duration_ms);

    Ok(Json(json!({
        "success": true,
        "manifest": manifest,
        "metadata": {
            "resourceType": req.resource_type.as_str(),
            "timestamp": Utc::now().to_rfc3339(),
        },
    })))
}

async fn manifest_validate(
    State(state): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let req: ManifestRequest = parse(&state, &uri, body)?;

    let started = Instant::now();
    let generator = ManifestGenerator::new(&req);
    let advice = generator
        .warnings()
        .and_then(|warnings| Ok((warnings, generator.suggestions()?)));
    state.record("manifest", "validate", advice.is_ok(), started);
    let (warnings, suggestions) = advice?;
    state.metrics.add_warnings("manifest", warnings.len());
    // Manifest advice is free text without severities
    state.logger.log_validated("manifest", true, warnings.len());

    Ok(Json(json!({
        "success": true,
        "valid": true,
        "warnings": warnings,
        "suggestions": suggestions,
    })))
}

async fn manifest_templates() -> Json<TemplatesResponse> {
    templates_response(templates::manifest_templates())
}

async fn dockerfile_generate(
    State(state): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<DockerfileResponse> {
    let req: DockerfileRequest = parse(&state, &uri, body)?;

    let started = Instant::now();
    let output = DockerfileGenerator::new(&req).generate();
    let duration_ms = state.record("dockerfile", "generate", true, started);
    let files = 1 + usize::from(output.dockerignore.is_some());
    state.logger.log_generated("dockerfile", files, duration_ms);

    Ok(Json(DockerfileResponse {
        success: true,
        output,
    }))
}

async fn dockerfile_validate(
    State(state): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<ValidationResponse> {
    let req: DockerfileRequest = parse(&state, &uri, body)?;

    let started = Instant::now();
    let validation = DockerfileGenerator::new(&req).validate();
    state.record_validation("dockerfile", started, &validation);

    Ok(Json(ValidationResponse {
        success: true,
        validation,
    }))
}

async fn dockerfile_templates() -> Json<TemplatesResponse> {
    templates_response(templates::dockerfile_templates())
}

async fn helm_generate(
    State(state): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<FilesResponse> {
    let req: HelmChartRequest = parse(&state, &uri, body)?;

    let started = Instant::now();
    let files = HelmChartGenerator::new(&req).generate();
    let duration_ms = state.record("helm", "generate", files.is_ok(), started);
    let files = files?;
    state.logger.log_generated("helm", files.len(), duration_ms);

    Ok(Json(FilesResponse {
        success: true,
        files,
    }))
}

async fn helm_validate(
    State(state): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<ValidationResponse> {
    let req: HelmChartRequest = parse(&state, &uri, body)?;

    let started = Instant::now();
    let validation = HelmChartGenerator::new(&req).validate();
    state.record_validation("helm", started, &validation);

    Ok(Json(ValidationResponse {
        success: true,
        validation,
    }))
}

async fn helm_templates() -> Json<TemplatesResponse> {
    templates_response(templates::helm_templates())
}

async fn cicd_generate(
    State(state): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<FilesResponse> {
    let req: CicdRequest = parse(&state, &uri, body)?;

    let started = Instant::now();
    let files = CicdGenerator::new(&req).generate();
    let duration_ms = state.record("cicd", "generate", files.is_ok(), started);
    let files = files?;
    state.logger.log_generated("cicd", files.len(), duration_ms);

    Ok(Json(FilesResponse {
        success: true,
        files,
    }))
}

async fn cicd_validate(
    State(state): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<ValidationResponse> {
    let req: CicdRequest = parse(&state, &uri, body)?;

    let started = Instant::now();
    let validation = CicdGenerator::new(&req).validate();
    state.record_validation("cicd", started, &validation);

    Ok(Json(ValidationResponse {
        success: true,
        validation,
    }))
}

async fn cicd_templates() -> Json<TemplatesResponse> {
    templates_response(templates::cicd_templates())
}

/// Liveness probe
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}

/// Allow browser calls from the configured origin only
async fn cors(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        debug!(path = %request.uri().path(), "CORS preflight");
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, state.cors_origin.clone());
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("content-type"),
    );
    headers.insert(header::VARY, HeaderValue::from_static("origin"));
    response
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/manifest/generate", post(manifest_generate))
        .route("/manifest/validate", post(manifest_validate))
        .route("/manifest/templates", get(manifest_templates))
        .route("/dockerfile/generate", post(dockerfile_generate))
        .route("/dockerfile/validate", post(dockerfile_validate))
        .route("/dockerfile/templates", get(dockerfile_templates))
        .route("/helm-chart/generate", post(helm_generate))
        .route("/helm-chart/validate", post(helm_validate))
        .route("/helm-chart/templates", get(helm_templates))
        .route("/cicd/generate", post(cicd_generate))
        .route("/cicd/validate", post(cicd_validate))
        .route("/cicd/templates", get(cicd_templates));

    Router::new()
        .nest("/api", api)
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(DefaultBodyLimit::max(state.body_limit))
        .layer(middleware::from_fn_with_state(state.clone(), cors))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let logger = state.logger.clone();
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    logger.log_startup(env!("CARGO_PKG_VERSION"), &addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    logger.log_shutdown("signal");
    Ok(())
}
