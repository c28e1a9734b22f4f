//! Helm chart validation heuristics

use once_cell::sync::Lazy;
use regex::Regex;

use crate::schema::helm::HelmChartRequest;
use crate::validation::{Category, Severity, ValidationResult, ValidationWarning};

use super::values::HelmValues;

/// Helm release names, and the chart-derived names built from them, must fit here
pub const RELEASE_NAME_MAX: usize = 53;

static SEMVER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\d+\.\d+$").expect("valid semver regex"));

pub fn validate(req: &HelmChartRequest, values: &HelmValues) -> ValidationResult {
    let meta = &req.metadata;
    let chart = &meta.name;
    let mut warnings = Vec::new();
    let mut suggestions = Vec::new();

    if chart.len() > RELEASE_NAME_MAX {
        warnings.push(
            ValidationWarning::new(
                Severity::High,
                Category::BestPractice,
                format!(
                    "Chart name is {} characters; names longer than {} characters break the DNS limit for release resources",
                    chart.len(),
                    RELEASE_NAME_MAX
                ),
            )
            .with_field("metadata.name"),
        );
    }

    if !SEMVER.is_match(&meta.version) {
        warnings.push(
            ValidationWarning::new(
                Severity::Medium,
                Category::BestPractice,
                format!("Chart version '{}' is not a MAJOR.MINOR.PATCH semantic version", meta.version),
            )
            .with_field("metadata.version"),
        );
    }

    if meta.description.as_deref().map_or(true, |d| d.trim().is_empty()) {
        warnings.push(
            ValidationWarning::new(Severity::Low, Category::BestPractice, "Chart has no description")
                .with_field("metadata.description"),
        );
    }
    if meta.maintainers.is_empty() {
        warnings.push(
            ValidationWarning::new(Severity::Low, Category::BestPractice, "Chart lists no maintainers")
                .with_field("metadata.maintainers"),
        );
    }

    if !values.has_limits() {
        warnings.push(
            ValidationWarning::new(
                Severity::Medium,
                Category::Reliability,
                "No resource limits set; pods can consume unbounded CPU and memory",
            )
            .with_field("values.resources"),
        );
        suggestions.push("Set values.resources.limits and requests for predictable scheduling".to_string());
    }

    if !values.security_context.run_as_non_root {
        warnings.push(
            ValidationWarning::new(
                Severity::High,
                Category::Security,
                "securityContext.runAsNonRoot is disabled; containers may run as root",
            )
            .with_field("values.securityContext.runAsNonRoot"),
        );
    }

    if !values.liveness_probe.enabled {
        warnings.push(
            ValidationWarning::new(
                Severity::Medium,
                Category::Reliability,
                "Liveness probe is disabled; hung containers will not be restarted",
            )
            .with_field("values.livenessProbe.enabled"),
        );
    }

    if !req.options.include_helpers {
        warnings.push(
            ValidationWarning::new(
                Severity::Medium,
                Category::BestPractice,
                "Helpers are disabled but the generated templates include them; provide your own _helpers.tpl",
            )
            .with_field("options.includeHelpers"),
        );
    }

    if values.autoscaling.min_replicas > values.autoscaling.max_replicas {
        warnings.push(
            ValidationWarning::new(
                Severity::High,
                Category::Reliability,
                format!(
                    "autoscaling.minReplicas ({}) exceeds maxReplicas ({})",
                    values.autoscaling.min_replicas, values.autoscaling.max_replicas
                ),
            )
            .with_field("values.autoscaling"),
        );
    }

    if values.image.tag == "latest" {
        warnings.push(
            ValidationWarning::new(
                Severity::Medium,
                Category::BestPractice,
                "image.tag is 'latest'; upgrades and rollbacks will not be reproducible",
            )
            .with_field("values.image.tag"),
        );
    }

    suggestions.push(format!("Lint the chart with: helm lint ./{}", chart));
    suggestions.push(format!("Install with: helm install {0} ./{0}", chart));
    suggestions.push(format!("Upgrade with: helm upgrade {0} ./{0}", chart));
    suggestions.push(format!("Run chart tests with: helm test {}", chart));
    if req.options.generate_environment_values {
        for env in &req.environments {
            suggestions.push(format!(
                "Install {env}: helm install {chart}-{env} ./{chart} -f ./{chart}/values-{env}.yaml --namespace {env} --create-namespace",
                chart = chart,
                env = env.name
            ));
        }
    }

    ValidationResult::new(warnings, suggestions)
}
