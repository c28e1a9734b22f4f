//! CI/CD pipeline request schema

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{check_dns_label, check_non_empty, FieldError, Language, SchemaCheck};

fn default_true() -> bool {
    true
}

fn default_branches() -> Vec<String> {
    vec!["main".to_string()]
}

fn default_dockerfile() -> String {
    "Dockerfile".to_string()
}

fn default_context() -> String {
    ".".to_string()
}

fn default_trivy_severity() -> String {
    "CRITICAL,HIGH".to_string()
}

fn default_snyk_token() -> String {
    "SNYK_TOKEN".to_string()
}

fn default_sonar_token() -> String {
    "SONAR_TOKEN".to_string()
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_manifests() -> Vec<String> {
    vec!["k8s/".to_string()]
}

fn default_chart_path() -> String {
    "./chart".to_string()
}

fn default_kubeconfig_secret() -> String {
    "KUBECONFIG".to_string()
}

fn default_slack_secret() -> String {
    "SLACK_WEBHOOK_URL".to_string()
}

fn default_timeout() -> u32 {
    30
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    GithubActions,
    GitlabCi,
    Jenkins,
    Circleci,
    AzureDevops,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::GithubActions,
        Platform::GitlabCi,
        Platform::Jenkins,
        Platform::Circleci,
        Platform::AzureDevops,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::GithubActions => "github-actions",
            Platform::GitlabCi => "gitlab-ci",
            Platform::Jenkins => "jenkins",
            Platform::Circleci => "circleci",
            Platform::AzureDevops => "azure-devops",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::GithubActions => "GitHub Actions",
            Platform::GitlabCi => "GitLab CI",
            Platform::Jenkins => "Jenkins",
            Platform::Circleci => "CircleCI",
            Platform::AzureDevops => "Azure DevOps",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Triggers {
    #[serde(default = "default_branches")]
    pub branches: Vec<String>,
    #[serde(default = "default_true")]
    pub pull_requests: bool,
    #[serde(default)]
    pub tags: bool,
}

impl Default for Triggers {
    fn default() -> Self {
        Self {
            branches: default_branches(),
            pull_requests: true,
            tags: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Application build command run before the image build
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default = "default_dockerfile")]
    pub dockerfile: String,
    #[serde(default = "default_context")]
    pub context: String,
    #[serde(default)]
    pub build_args: BTreeMap<String, String>,
    #[serde(default = "default_true")]
    pub cache: bool,
    #[serde(default)]
    pub platforms: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: None,
            dockerfile: default_dockerfile(),
            context: default_context(),
            build_args: BTreeMap::new(),
            cache: true,
            platforms: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_test_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_test_command: Option<String>,
    #[serde(default)]
    pub coverage: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            unit_test_command: None,
            integration_test_command: None,
            coverage: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrivyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_trivy_severity")]
    pub severity: String,
    #[serde(default = "default_true")]
    pub ignore_unfixed: bool,
    /// Fail the pipeline on findings
    #[serde(default = "default_true")]
    pub fail_on_findings: bool,
}

impl Default for TrivyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            severity: default_trivy_severity(),
            ignore_unfixed: true,
            fail_on_findings: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnykConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_snyk_token")]
    pub token_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SonarqubeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub host_url: String,
    pub project_key: String,
    #[serde(default = "default_sonar_token")]
    pub token_secret: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub trivy: TrivyConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snyk: Option<SnykConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sonarqube: Option<SonarqubeConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryType {
    #[default]
    Dockerhub,
    Ghcr,
    Ecr,
    Gcr,
    Acr,
    Custom,
}

impl RegistryType {
    pub const ALL: [RegistryType; 6] = [
        RegistryType::Dockerhub,
        RegistryType::Ghcr,
        RegistryType::Ecr,
        RegistryType::Gcr,
        RegistryType::Acr,
        RegistryType::Custom,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TagStrategy {
    #[default]
    CommitSha,
    BranchName,
    Tag,
    Semantic,
    Latest,
}

impl TagStrategy {
    pub const ALL: [TagStrategy; 5] = [
        TagStrategy::CommitSha,
        TagStrategy::BranchName,
        TagStrategy::Tag,
        TagStrategy::Semantic,
        TagStrategy::Latest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TagStrategy::CommitSha => "commit-sha",
            TagStrategy::BranchName => "branch-name",
            TagStrategy::Tag => "tag",
            TagStrategy::Semantic => "semantic",
            TagStrategy::Latest => "latest",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryConfig {
    #[serde(default, rename = "type")]
    pub registry_type: RegistryType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub repository: String,
    #[serde(default)]
    pub tag_strategy: TagStrategy,
    #[serde(default)]
    pub additional_tags: Vec<String>,
    /// CI secret holding the registry user name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_secret: Option<String>,
    /// CI secret holding the registry password or token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_secret: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStrategy {
    #[default]
    Kubectl,
    Helm,
    Kustomize,
    Gitops,
}

impl DeploymentStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStrategy::Kubectl => "kubectl",
            DeploymentStrategy::Helm => "helm",
            DeploymentStrategy::Kustomize => "kustomize",
            DeploymentStrategy::Gitops => "gitops",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubectlConfig {
    #[serde(default = "default_manifests")]
    pub manifests: Vec<String>,
}

impl Default for KubectlConfig {
    fn default() -> Self {
        Self {
            manifests: default_manifests(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelmDeployConfig {
    #[serde(default = "default_chart_path")]
    pub chart_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values_file: Option<String>,
}

impl Default for HelmDeployConfig {
    fn default() -> Self {
        Self {
            chart_path: default_chart_path(),
            release_name: None,
            values_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KustomizeConfig {
    #[serde(default = "default_context")]
    pub path: String,
}

impl Default for KustomizeConfig {
    fn default() -> Self {
        Self {
            path: default_context(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GitOpsTool {
    #[default]
    Argocd,
    Flux,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitOpsConfig {
    #[serde(default)]
    pub tool: GitOpsTool,
    /// ArgoCD application or Flux kustomization name; defaults to the project name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub strategy: DeploymentStrategy,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub kubectl: KubectlConfig,
    #[serde(default)]
    pub helm: HelmDeployConfig,
    #[serde(default)]
    pub kustomize: KustomizeConfig,
    #[serde(default)]
    pub gitops: GitOpsConfig,
    #[serde(default = "default_kubeconfig_secret")]
    pub kubeconfig_secret: String,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            strategy: DeploymentStrategy::default(),
            namespace: default_namespace(),
            kubectl: KubectlConfig::default(),
            helm: HelmDeployConfig::default(),
            kustomize: KustomizeConfig::default(),
            gitops: GitOpsConfig::default(),
            kubeconfig_secret: default_kubeconfig_secret(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineEnvironment {
    pub name: String,
    /// Branch that deploys to this environment; `main` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlackNotification {
    #[serde(default = "default_slack_secret")]
    pub webhook_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default)]
    pub on_success: bool,
    #[serde(default = "default_true")]
    pub on_failure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailNotification {
    pub recipients: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notifications {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack: Option<SlackNotification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailNotification>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOptions {
    #[serde(default = "default_true")]
    pub cache_dependencies: bool,
    #[serde(default = "default_timeout")]
    pub timeout_minutes: u32,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            cache_dependencies: true,
            timeout_minutes: default_timeout(),
        }
    }
}

/// Built-in stage a custom stage runs after
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageAnchor {
    #[default]
    Build,
    Test,
    Security,
    Deploy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomStage {
    pub name: String,
    #[serde(default)]
    pub after: StageAnchor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub commands: Vec<String>,
}

/// CI/CD pipeline generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CicdRequest {
    pub platform: Platform,
    pub project_name: String,
    pub language: Language,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_version: Option<String>,
    #[serde(default)]
    pub triggers: Triggers,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub test: TestConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    pub registry: RegistryConfig,
    #[serde(default)]
    pub deployment: DeploymentConfig,
    #[serde(default)]
    pub environments: Vec<PipelineEnvironment>,
    #[serde(default)]
    pub notifications: Notifications,
    #[serde(default)]
    pub options: PipelineOptions,
    #[serde(default)]
    pub custom_stages: Vec<CustomStage>,
}

impl SchemaCheck for CicdRequest {
    fn check(&self, errors: &mut Vec<FieldError>) {
        check_non_empty("projectName", &self.project_name, errors);
        check_non_empty("registry.repository", &self.registry.repository, errors);
        let image_name = self.registry.repository.rsplit('/').next().unwrap_or_default();
        if image_name.contains(':') {
            errors.push(FieldError::new("registry.repository", "must not include a tag"));
        }
        if self.triggers.branches.is_empty() {
            errors.push(FieldError::new("triggers.branches", "at least one branch is required"));
        }
        if self.options.timeout_minutes == 0 {
            errors.push(FieldError::new("options.timeoutMinutes", "must be at least 1"));
        }
        for (i, env) in self.environments.iter().enumerate() {
            check_dns_label(&format!("environments[{}].name", i), &env.name, errors);
        }
        for (i, stage) in self.custom_stages.iter().enumerate() {
            check_dns_label(&format!("customStages[{}].name", i), &stage.name, errors);
            if stage.commands.is_empty() {
                errors.push(FieldError::new(
                    format!("customStages[{}].commands", i),
                    "at least one command is required",
                ));
            }
        }
        if let Some(sonar) = &self.security.sonarqube {
            check_non_empty("security.sonarqube.hostUrl", &sonar.host_url, errors);
            check_non_empty("security.sonarqube.projectKey", &sonar.project_key, errors);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_request_defaults() {
        let req: CicdRequest = serde_json::from_value(json!({
            "platform": "github-actions",
            "projectName": "web",
            "language": "nodejs",
            "registry": {"repository": "acme/web"}
        }))
        .unwrap();
        assert_eq!(req.registry.tag_strategy, TagStrategy::CommitSha);
        assert_eq!(req.registry.registry_type, RegistryType::Dockerhub);
        assert!(req.test.enabled);
        assert!(!req.security.enabled);
        assert!(!req.deployment.enabled);
        assert_eq!(req.triggers.branches, vec!["main"]);
        assert!(req.check_all().is_ok());
    }

    #[test]
    fn test_platform_names() {
        for platform in Platform::ALL {
            let json = serde_json::to_value(platform).unwrap();
            assert_eq!(json, platform.as_str());
        }
    }

    #[test]
    fn test_tag_strategy_names() {
        let parsed: TagStrategy = serde_json::from_value(json!("branch-name")).unwrap();
        assert_eq!(parsed, TagStrategy::BranchName);
    }

    #[test]
    fn test_custom_stage_without_commands_rejected() {
        let req: CicdRequest = serde_json::from_value(json!({
            "platform": "jenkins",
            "projectName": "web",
            "language": "go",
            "registry": {"repository": "acme/web"},
            "customStages": [{"name": "lint", "commands": []}]
        }))
        .unwrap();
        let errors = req.check_all().unwrap_err();
        assert_eq!(errors[0].field, "customStages[0].commands");
    }
}
