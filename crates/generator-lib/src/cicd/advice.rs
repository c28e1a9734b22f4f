//! CI/CD pipeline validation heuristics

use crate::schema::cicd::{CicdRequest, DeploymentStrategy, RegistryType, TagStrategy};
use crate::validation::{Category, Severity, ValidationResult, ValidationWarning};

pub fn validate(req: &CicdRequest) -> ValidationResult {
    let mut warnings = Vec::new();
    let mut suggestions = Vec::new();

    if !req.security.enabled {
        warnings.push(
            ValidationWarning::new(
                Severity::Medium,
                Category::Security,
                "Security scanning is disabled; images are pushed without a vulnerability scan",
            )
            .with_field("security.enabled"),
        );
    } else if req.security.trivy.enabled && !req.security.trivy.fail_on_findings {
        warnings.push(
            ValidationWarning::new(
                Severity::Low,
                Category::Security,
                "Trivy reports findings without failing the pipeline",
            )
            .with_field("security.trivy.failOnFindings"),
        );
    }

    if !req.test.enabled {
        warnings.push(
            ValidationWarning::new(
                Severity::High,
                Category::Reliability,
                "Tests are disabled; untested code can reach the registry and the cluster",
            )
            .with_field("test.enabled"),
        );
    }

    let registry = &req.registry;
    if registry.username_secret.is_none() || registry.password_secret.is_none() {
        warnings.push(
            ValidationWarning::new(
                Severity::High,
                Category::Security,
                "Registry credentials are not mapped to CI secrets (usernameSecret and passwordSecret)",
            )
            .with_field("registry"),
        );
    }
    if registry.tag_strategy == TagStrategy::Latest {
        warnings.push(
            ValidationWarning::new(
                Severity::Medium,
                Category::Reliability,
                "The 'latest' tag is mutable; deployments cannot be traced to a commit or rolled back",
            )
            .with_field("registry.tagStrategy"),
        );
    }
    let needs_url = matches!(
        registry.registry_type,
        RegistryType::Ecr | RegistryType::Acr | RegistryType::Custom
    );
    if needs_url && registry.url.as_deref().map_or(true, str::is_empty) {
        warnings.push(
            ValidationWarning::new(
                Severity::Medium,
                Category::BestPractice,
                "This registry type has no default host; set registry.url to your registry address",
            )
            .with_field("registry.url"),
        );
    }

    for (i, env) in req.environments.iter().enumerate() {
        let name = env.name.to_lowercase();
        if (name == "production" || name == "prod") && !env.requires_approval {
            warnings.push(
                ValidationWarning::new(
                    Severity::Medium,
                    Category::BestPractice,
                    format!("Environment '{}' deploys without manual approval", env.name),
                )
                .with_field(format!("environments[{}].requiresApproval", i)),
            );
        }
    }

    let deployment = &req.deployment;
    if deployment.enabled
        && deployment.strategy == DeploymentStrategy::Kubectl
        && deployment.kubectl.manifests.is_empty()
    {
        warnings.push(
            ValidationWarning::new(
                Severity::High,
                Category::Reliability,
                "kubectl deployment lists no manifests to apply",
            )
            .with_field("deployment.kubectl.manifests"),
        );
    }

    suggestions.push("Configure the registry, cluster and notification secrets before the first run".to_string());
    suggestions.push("Test the pipeline against a development environment before production".to_string());
    suggestions.push("Monitor pipeline runs and alert on repeated failures".to_string());
    if deployment.enabled {
        suggestions.push(
            "Consider a GitOps workflow (ArgoCD or Flux) so cluster state is reconciled from Git".to_string(),
        );
        let rollback = match deployment.strategy {
            DeploymentStrategy::Helm => format!(
                "Roll back a bad release with: helm rollback {} -n {}",
                super::helpers::helm_release(req),
                deployment.namespace
            ),
            DeploymentStrategy::Gitops => {
                "Roll back by reverting the commit the GitOps controller deployed".to_string()
            }
            DeploymentStrategy::Kubectl | DeploymentStrategy::Kustomize => format!(
                "Roll back a bad rollout with: kubectl rollout undo deployment/{} -n {}",
                req.project_name, deployment.namespace
            ),
        };
        suggestions.push(rollback);
    }

    ValidationResult::new(warnings, suggestions)
}
