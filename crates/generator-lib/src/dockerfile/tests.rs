use serde_json::json;

use super::*;
use crate::schema::Language;
use crate::validation::{Category, Severity};

fn request(value: serde_json::Value) -> DockerfileRequest {
    serde_json::from_value(value).unwrap()
}

fn generate(value: serde_json::Value) -> DockerfileOutput {
    DockerfileGenerator::new(&request(value)).generate()
}

/// Lines after the last FROM
fn runtime_stage(dockerfile: &str) -> Vec<&str> {
    let lines: Vec<&str> = dockerfile.lines().collect();
    let start = lines.iter().rposition(|l| l.starts_with("FROM ")).unwrap();
    lines[start..].to_vec()
}

#[test]
fn test_root_container_is_high_severity() {
    let req = request(json!({
        "language": "nodejs",
        "projectName": "x",
        "startCommand": "[\"npm\",\"start\"]",
        "security": {"nonRootUser": false}
    }));
    let result = DockerfileGenerator::new(&req).validate();
    assert!(!result.valid);
    assert!(result
        .warnings
        .iter()
        .any(|w| w.severity == Severity::High && w.category == Category::Security && w.message.contains("root")));

    let dockerfile = DockerfileGenerator::new(&req).generate().dockerfile;
    assert!(!dockerfile.contains("USER "));
    assert!(dockerfile.trim_end().ends_with("CMD [\"npm\",\"start\"]"));
}

#[test]
fn test_node_multi_stage_defaults() {
    let out = generate(json!({"language": "nodejs", "projectName": "web", "version": "20", "port": 3000}));
    let df = &out.dockerfile;
    assert!(df.contains("FROM node:20-alpine AS builder"));
    assert!(df.contains("FROM node:20-alpine AS runtime"));
    assert!(df.contains("RUN npm ci"));
    assert!(df.contains("RUN addgroup -g 1001 -S appuser && adduser -u 1001 -S -G appuser appuser"));
    assert!(df.contains("COPY --from=builder --chown=appuser:appuser /app ."));
    assert!(df.contains("ENV NODE_ENV=production"));
    assert!(df.contains("EXPOSE 3000"));
    assert!(df.contains("USER appuser"));
    assert!(df.contains("LABEL org.opencontainers.image.title=\"web\""));
    assert!(df.trim_end().ends_with("CMD [\"npm\", \"start\"]"));
    assert!(out.dockerignore.unwrap().contains("node_modules"));
}

#[test]
fn test_node_package_manager_and_build_output() {
    let df = generate(json!({
        "language": "nodejs",
        "projectName": "web",
        "nodejsConfig": {"packageManager": "pnpm", "buildCommand": "pnpm build", "buildOutput": "dist"}
    }))
    .dockerfile;
    assert!(df.contains("COPY package.json pnpm-lock.yaml ./"));
    assert!(df.contains("RUN corepack enable && pnpm install --frozen-lockfile"));
    assert!(df.contains("RUN pnpm build"));
    assert!(df.contains("COPY --from=builder --chown=appuser:appuser /app/dist ./dist"));
}

#[test]
fn test_go_distroless_runtime() {
    let df = generate(json!({
        "language": "go",
        "projectName": "api",
        "version": "1.22",
        "baseImageType": "distroless",
        "healthCheck": {"enabled": true}
    }))
    .dockerfile;
    assert!(df.contains("FROM golang:1.22-bookworm AS builder"));
    assert!(df.contains("go build -ldflags=\"-s -w\" -o /app/api ."));

    let runtime = runtime_stage(&df);
    assert_eq!(runtime[0], "FROM gcr.io/distroless/static-debian12 AS runtime");
    assert!(runtime.iter().all(|l| !l.starts_with("RUN ")));
    assert!(runtime.contains(&"COPY --from=builder /app/api ./api"));
    assert!(runtime.contains(&"USER 65532:65532"));
    assert!(runtime.iter().any(|l| l.starts_with("# HEALTHCHECK omitted")));
    assert!(!df.contains("HEALTHCHECK --interval"));
    assert!(df.trim_end().ends_with("CMD [\"/app/api\"]"));
}

#[test]
fn test_healthcheck_tool_follows_distro() {
    let alpine = generate(json!({
        "language": "python",
        "projectName": "svc",
        "port": 8000,
        "healthCheck": {"enabled": true}
    }))
    .dockerfile;
    assert!(alpine.contains("HEALTHCHECK --interval=30s --timeout=3s --start-period=5s --retries=3 \\"));
    assert!(alpine.contains("CMD wget --no-verbose --tries=1 --spider http://localhost:8000/health || exit 1"));

    let slim = generate(json!({
        "language": "python",
        "projectName": "svc",
        "port": 8000,
        "baseImageType": "slim",
        "healthCheck": {"enabled": true, "path": "/ready"}
    }))
    .dockerfile;
    assert!(slim.contains("FROM python:3.12-slim AS runtime"));
    assert!(slim.contains("apt-get install -y --no-install-recommends curl"));
    assert!(slim.contains("CMD curl -fsS http://localhost:8000/ready || exit 1"));
}

#[test]
fn test_distroless_fallback_keeps_healthcheck_without_warning() {
    for language in ["php", "ruby"] {
        let req = request(json!({
            "language": language,
            "projectName": "legacy",
            "baseImageType": "distroless",
            "port": 8080,
            "healthCheck": {"enabled": true}
        }));
        let dockerfile = DockerfileGenerator::new(&req).generate().dockerfile;
        assert!(dockerfile.contains("HEALTHCHECK --interval"), "{}", language);

        let result = DockerfileGenerator::new(&req).validate();
        assert!(
            !result.warnings.iter().any(|w| w.message.contains("HEALTHCHECK is omitted")),
            "{}",
            language
        );
        assert!(result.warnings.iter().any(|w| w.message.contains("No distroless image exists")));
    }

    let go = request(json!({
        "language": "go",
        "projectName": "edge",
        "baseImageType": "distroless",
        "healthCheck": {"enabled": true}
    }));
    let result = DockerfileGenerator::new(&go).validate();
    assert!(result.warnings.iter().any(|w| w.message.contains("HEALTHCHECK is omitted")));
}

#[test]
fn test_python_framework_command() {
    let df = generate(json!({
        "language": "python",
        "projectName": "shop-api",
        "port": 8080,
        "pythonConfig": {"framework": "fastapi", "appModule": "app.main:app"}
    }))
    .dockerfile;
    assert!(df.contains("RUN pip install --no-cache-dir --prefix=/install -r requirements.txt"));
    assert!(df.contains("COPY --from=builder --chown=appuser:appuser /install /usr/local"));
    assert!(df.trim_end().ends_with(
        "CMD [\"uvicorn\", \"app.main:app\", \"--host\", \"0.0.0.0\", \"--port\", \"8080\"]"
    ));
}

#[test]
fn test_single_stage_build() {
    let df = generate(json!({
        "language": "rust",
        "projectName": "tool",
        "version": "1.77",
        "multiStage": {"enabled": false}
    }))
    .dockerfile;
    assert_eq!(df.lines().filter(|l| l.starts_with("FROM ")).count(), 1);
    assert!(df.contains("FROM rust:1.77-alpine\n"));
    assert!(!df.contains("--from=builder"));
    assert!(df.contains("chown -R appuser:appuser /app"));
    assert!(df.trim_end().ends_with("CMD [\"/app/target/release/tool\"]"));
}

#[test]
fn test_args_env_and_labels() {
    let df = generate(json!({
        "language": "java",
        "projectName": "billing",
        "buildArgs": {"MAVEN_PROFILE": "prod"},
        "envVars": {"GREETING": "hello world", "LOG_LEVEL": "info"},
        "labels": {"org.opencontainers.image.vendor": "Acme"}
    }))
    .dockerfile;
    assert!(df.contains("ARG MAVEN_PROFILE=prod"));
    assert!(df.contains("ENV GREETING=\"hello world\""));
    assert!(df.contains("ENV LOG_LEVEL=info"));
    assert!(df.contains("ENV JAVA_TOOL_OPTIONS=-XX:MaxRAMPercentage=75.0"));
    assert!(df.contains("LABEL org.opencontainers.image.vendor=\"Acme\""));
    assert!(df.contains("COPY --from=builder --chown=appuser:appuser /app/target/*.jar ./app.jar"));
}

#[test]
fn test_label_values_are_escaped() {
    let df = generate(json!({
        "language": "go",
        "projectName": "we\"b",
        "labels": {"org.opencontainers.image.description": "a \\ b"}
    }))
    .dockerfile;
    assert!(df.contains(r#"LABEL org.opencontainers.image.title="we\"b""#));
    assert!(df.contains(r#"LABEL org.opencontainers.image.description="a \\ b""#));
    assert!(!df.contains(r#"title="we"b""#));
}

#[test]
fn test_custom_stage_names_and_shell_command() {
    let df = generate(json!({
        "language": "ruby",
        "projectName": "blog",
        "multiStage": {"builderStageName": "deps", "runtimeStageName": "app"},
        "startCommand": "bundle exec puma -C config/puma.rb",
        "rubyConfig": {"framework": "rails"}
    }))
    .dockerfile;
    assert!(df.contains("AS deps"));
    assert!(df.contains("AS app"));
    assert!(df.contains("COPY --from=deps --chown=appuser:appuser /usr/local/bundle /usr/local/bundle"));
    assert!(df.contains("ENV RAILS_ENV=production"));
    assert!(df.trim_end().ends_with("CMD bundle exec puma -C config/puma.rb"));
}

#[test]
fn test_every_language_renders() {
    for language in Language::ALL {
        let req = DockerfileRequest::new(language, "demo");
        let out = DockerfileGenerator::new(&req).generate();
        assert!(out.dockerfile.starts_with("# Dockerfile for demo"), "{}", language);
        assert!(out.dockerfile.lines().any(|l| l.starts_with("FROM ")), "{}", language);
        assert!(out.dockerfile.lines().any(|l| l.starts_with("CMD ")), "{}", language);
        assert!(out.dockerfile.contains("USER appuser"), "{}", language);
        assert!(out.dockerignore.is_some());
    }
}

#[test]
fn test_generation_is_deterministic() {
    let req = request(json!({
        "language": "dotnet",
        "projectName": "orders",
        "envVars": {"B": "2", "A": "1"},
        "healthCheck": {"enabled": true}
    }));
    let generator = DockerfileGenerator::new(&req);
    assert_eq!(generator.generate(), generator.generate());
}

#[test]
fn test_dockerignore_can_be_disabled() {
    let out = generate(json!({"language": "php", "projectName": "site", "generateDockerignore": false}));
    assert!(out.dockerignore.is_none());
    let value = serde_json::to_value(&out).unwrap();
    assert!(value.get("dockerignore").is_none());
    assert!(value.get("dockerfile").is_some());
}

#[test]
fn test_compiled_language_without_multi_stage_warns() {
    let req = request(json!({
        "language": "go",
        "projectName": "svc",
        "version": "1.22",
        "port": 8080,
        "multiStage": {"enabled": false},
        "healthCheck": {"enabled": true}
    }));
    let result = DockerfileGenerator::new(&req).validate();
    assert!(result.valid);
    assert!(result
        .warnings
        .iter()
        .any(|w| w.category == Category::Size && w.field.as_deref() == Some("multiStage.enabled")));
}

#[test]
fn test_validation_heuristics() {
    let req = request(json!({
        "language": "python",
        "projectName": "svc",
        "version": "latest",
        "baseImageType": "ubuntu",
        "envVars": {"DB_PASSWORD": "hunter2"}
    }));
    let result = DockerfileGenerator::new(&req).validate();
    assert!(!result.valid);
    let fields: Vec<_> = result.warnings.iter().filter_map(|w| w.field.as_deref()).collect();
    assert!(fields.contains(&"version"));
    assert!(fields.contains(&"healthCheck"));
    assert!(fields.contains(&"baseImageType"));
    assert!(fields.contains(&"envVars.DB_PASSWORD"));
    assert!(fields.contains(&"port"));
    assert!(result.suggestions.iter().any(|s| s.contains("docker build -t svc:1.0.0 .")));
}

#[test]
fn test_well_configured_request_has_no_high_warnings() {
    let req = request(json!({
        "language": "rust",
        "projectName": "edge",
        "version": "1.77",
        "baseImageType": "distroless",
        "port": 8080,
        "healthCheck": {"enabled": true}
    }));
    let result = DockerfileGenerator::new(&req).validate();
    assert!(result.valid);
    assert_eq!(result.count(Severity::High), 0);
    assert_eq!(result.count(Severity::Medium), 0);
}
