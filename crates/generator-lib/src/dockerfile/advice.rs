//! Dockerfile validation heuristics

use once_cell::sync::Lazy;
use regex::Regex;

use crate::schema::dockerfile::{BaseImageType, DockerfileRequest};
use crate::validation::{Category, Severity, ValidationResult, ValidationWarning};

use super::images::{default_version, has_distroless};

/// Variable names that usually carry credentials
static SECRET_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(PASSWORD|PASSWD|SECRET|TOKEN|API_?KEY|PRIVATE_?KEY|CREDENTIAL)")
        .expect("valid secret-name regex")
});

pub fn validate(req: &DockerfileRequest, version: &str) -> ValidationResult {
    let mut warnings = Vec::new();
    let mut suggestions = Vec::new();
    let lang = req.language;

    match req.version.as_deref() {
        None => warnings.push(
            ValidationWarning::new(
                Severity::Medium,
                Category::BestPractice,
                format!(
                    "No {} version pinned; defaulting to {}. Pin an explicit version for reproducible builds",
                    lang,
                    default_version(lang)
                ),
            )
            .with_field("version"),
        ),
        Some("latest") => warnings.push(
            ValidationWarning::new(
                Severity::Medium,
                Category::BestPractice,
                "Base image uses the 'latest' tag; builds are not reproducible",
            )
            .with_field("version"),
        ),
        Some(_) => {}
    }

    if !req.health_check.as_ref().is_some_and(|h| h.enabled) {
        warnings.push(
            ValidationWarning::new(
                Severity::Medium,
                Category::Reliability,
                "No HEALTHCHECK configured; Docker cannot detect an unhealthy container",
            )
            .with_field("healthCheck"),
        );
        suggestions.push("Enable healthCheck so the runtime can restart unhealthy containers".to_string());
    } else if req.base_image_type == BaseImageType::Distroless
        && req.multi_stage.enabled
        && has_distroless(lang)
    {
        warnings.push(
            ValidationWarning::new(
                Severity::Low,
                Category::Reliability,
                "HEALTHCHECK is omitted on distroless images; configure Kubernetes liveness/readiness probes instead",
            )
            .with_field("healthCheck"),
        );
    }

    if !req.security.non_root_user {
        warnings.push(
            ValidationWarning::new(
                Severity::High,
                Category::Security,
                "Container runs as root; a compromised process gets root inside the container",
            )
            .with_field("security.nonRootUser"),
        );
        suggestions.push("Set security.nonRootUser to true to run as an unprivileged user".to_string());
    }

    if lang.is_compiled() && !req.multi_stage.enabled {
        warnings.push(
            ValidationWarning::new(
                Severity::Medium,
                Category::Size,
                format!(
                    "{} is a compiled language but multi-stage build is disabled; the final image ships the whole toolchain",
                    lang
                ),
            )
            .with_field("multiStage.enabled"),
        );
        suggestions.push(
            "Enable multiStage to copy only the build artifact into a minimal runtime image".to_string(),
        );
    }

    match req.base_image_type {
        BaseImageType::Ubuntu | BaseImageType::Debian => {
            warnings.push(
                ValidationWarning::new(
                    Severity::Low,
                    Category::Size,
                    format!(
                        "Base image type '{}' is considerably larger than alpine, slim or distroless",
                        req.base_image_type.as_str()
                    ),
                )
                .with_field("baseImageType"),
            );
            suggestions.push("Prefer alpine, slim or distroless base images to shrink the image".to_string());
        }
        BaseImageType::Distroless if !has_distroless(lang) => warnings.push(
            ValidationWarning::new(
                Severity::Low,
                Category::BestPractice,
                format!("No distroless image exists for {}; the slim image is used instead", lang),
            )
            .with_field("baseImageType"),
        ),
        BaseImageType::Distroless if !req.multi_stage.enabled => warnings.push(
            ValidationWarning::new(
                Severity::Low,
                Category::BestPractice,
                "Distroless images cannot run build steps; without multi-stage the slim toolchain image is used",
            )
            .with_field("baseImageType"),
        ),
        _ => {}
    }

    if req.base_image_type == BaseImageType::Distroless
        && req.multi_stage.enabled
        && req
            .start_command
            .as_deref()
            .is_some_and(|c| !c.trim_start().starts_with('['))
    {
        warnings.push(
            ValidationWarning::new(
                Severity::Medium,
                Category::Reliability,
                "Shell-form startCommand needs /bin/sh, which distroless images do not have; use exec form",
            )
            .with_field("startCommand"),
        );
    }

    for name in req.env_vars.keys().filter(|k| SECRET_NAME.is_match(k)) {
        warnings.push(
            ValidationWarning::new(
                Severity::High,
                Category::Security,
                format!(
                    "Environment variable '{}' looks like a secret; ENV values are baked into image layers",
                    name
                ),
            )
            .with_field(format!("envVars.{}", name)),
        );
    }
    for name in req.build_args.keys().filter(|k| SECRET_NAME.is_match(k)) {
        warnings.push(
            ValidationWarning::new(
                Severity::Medium,
                Category::Security,
                format!(
                    "Build argument '{}' looks like a secret; build args are visible in image history, use BuildKit secret mounts",
                    name
                ),
            )
            .with_field(format!("buildArgs.{}", name)),
        );
    }

    if req.port.is_none() {
        warnings.push(
            ValidationWarning::new(
                Severity::Low,
                Category::BestPractice,
                "No port configured; the Dockerfile will not EXPOSE a port",
            )
            .with_field("port"),
        );
    }

    if !req.generate_dockerignore {
        suggestions.push(
            "Generate a .dockerignore to keep the build context small and secrets out of the image".to_string(),
        );
    }

    let image = format!("{}:1.0.0", req.project_name);
    suggestions.push(format!("Build the image with: docker build -t {} .", image));
    suggestions.push(format!("Scan the image for vulnerabilities with: trivy image {}", image));
    suggestions.push(format!(
        "Build for several architectures with: docker buildx build --platform linux/amd64,linux/arm64 -t {} .",
        image
    ));

    tracing::trace!(language = %lang, version, warnings = warnings.len(), "Validated Dockerfile request");
    ValidationResult::new(warnings, suggestions)
}
