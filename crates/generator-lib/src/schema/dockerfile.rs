//! Dockerfile request schema

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{check_non_empty, check_port, FieldError, Language, SchemaCheck};

fn default_true() -> bool {
    true
}

fn default_workdir() -> String {
    "/app".to_string()
}

fn default_builder_stage() -> String {
    "builder".to_string()
}

fn default_runtime_stage() -> String {
    "runtime".to_string()
}

fn default_user() -> String {
    "appuser".to_string()
}

fn default_uid() -> u32 {
    1001
}

fn default_health_path() -> String {
    "/health".to_string()
}

fn default_interval() -> String {
    "30s".to_string()
}

fn default_timeout() -> String {
    "3s".to_string()
}

fn default_start_period() -> String {
    "5s".to_string()
}

fn default_retries() -> u32 {
    3
}

/// Base image family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseImageType {
    #[default]
    Alpine,
    Slim,
    Debian,
    Ubuntu,
    Distroless,
}

impl BaseImageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BaseImageType::Alpine => "alpine",
            BaseImageType::Slim => "slim",
            BaseImageType::Debian => "debian",
            BaseImageType::Ubuntu => "ubuntu",
            BaseImageType::Distroless => "distroless",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiStage {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_builder_stage")]
    pub builder_stage_name: String,
    #[serde(default = "default_runtime_stage")]
    pub runtime_stage_name: String,
}

impl Default for MultiStage {
    fn default() -> Self {
        Self {
            enabled: true,
            builder_stage_name: default_builder_stage(),
            runtime_stage_name: default_runtime_stage(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSecurity {
    #[serde(default = "default_true")]
    pub non_root_user: bool,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_uid")]
    pub uid: u32,
}

impl Default for ContainerSecurity {
    fn default() -> Self {
        Self {
            non_root_user: true,
            user: default_user(),
            uid: default_uid(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Explicit probe command; derived from `path` and `port` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default = "default_health_path")]
    pub path: String,
    #[serde(default = "default_interval")]
    pub interval: String,
    #[serde(default = "default_timeout")]
    pub timeout: String,
    #[serde(default = "default_start_period")]
    pub start_period: String,
    #[serde(default = "default_retries")]
    pub retries: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodePackageManager {
    #[default]
    Npm,
    Yarn,
    Pnpm,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodejsConfig {
    #[serde(default)]
    pub package_manager: NodePackageManager,
    /// Build script, e.g. `npm run build`; skipped when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_output: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PythonPackageManager {
    #[default]
    Pip,
    Poetry,
    Pipenv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PythonFramework {
    #[default]
    None,
    Django,
    Flask,
    Fastapi,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PythonConfig {
    #[serde(default)]
    pub package_manager: PythonPackageManager,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements_file: Option<String>,
    #[serde(default)]
    pub framework: PythonFramework,
    /// Module path for ASGI/WSGI frameworks, e.g. `main:app`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_module: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_package: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_name: Option<String>,
    #[serde(default)]
    pub cgo_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JavaBuildTool {
    #[default]
    Maven,
    Gradle,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaConfig {
    #[serde(default)]
    pub build_tool: JavaBuildTool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jar_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jvm_options: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RustConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_name: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DotnetConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assembly_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhpFramework {
    #[default]
    None,
    Laravel,
    Symfony,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhpConfig {
    #[serde(default)]
    pub framework: PhpFramework,
    #[serde(default)]
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RubyFramework {
    #[default]
    None,
    Rails,
    Sinatra,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RubyConfig {
    #[serde(default)]
    pub framework: RubyFramework,
}

/// Dockerfile generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerfileRequest {
    pub language: Language,
    pub project_name: String,
    /// Language runtime version; a pinned per-language default applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub base_image_type: BaseImageType,
    #[serde(default)]
    pub multi_stage: MultiStage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u32>,
    #[serde(default = "default_workdir")]
    pub workdir: String,
    /// Exec form (`["npm","start"]`) or shell form; a per-language default applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_command: Option<String>,
    #[serde(default)]
    pub security: ContainerSecurity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheck>,
    #[serde(default)]
    pub build_args: BTreeMap<String, String>,
    #[serde(default)]
    pub env_vars: BTreeMap<String, String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default = "default_true")]
    pub generate_dockerignore: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodejs_config: Option<NodejsConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python_config: Option<PythonConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub go_config: Option<GoConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub java_config: Option<JavaConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rust_config: Option<RustConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dotnet_config: Option<DotnetConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub php_config: Option<PhpConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ruby_config: Option<RubyConfig>,
}

impl DockerfileRequest {
    /// Minimal request with every optional block defaulted
    pub fn new(language: Language, project_name: impl Into<String>) -> Self {
        Self {
            language,
            project_name: project_name.into(),
            version: None,
            base_image_type: BaseImageType::default(),
            multi_stage: MultiStage::default(),
            port: None,
            workdir: default_workdir(),
            start_command: None,
            security: ContainerSecurity::default(),
            health_check: None,
            build_args: BTreeMap::new(),
            env_vars: BTreeMap::new(),
            labels: BTreeMap::new(),
            generate_dockerignore: true,
            nodejs_config: None,
            python_config: None,
            go_config: None,
            java_config: None,
            rust_config: None,
            dotnet_config: None,
            php_config: None,
            ruby_config: None,
        }
    }
}

impl SchemaCheck for DockerfileRequest {
    fn check(&self, errors: &mut Vec<FieldError>) {
        check_non_empty("projectName", &self.project_name, errors);
        if self.project_name.chars().any(char::is_whitespace) {
            errors.push(FieldError::new("projectName", "must not contain whitespace"));
        }
        if let Some(port) = self.port {
            check_port("port", port, errors);
        }
        if !self.workdir.starts_with('/') {
            errors.push(FieldError::new("workdir", "must be an absolute path"));
        }
        if self.multi_stage.enabled
            && self.multi_stage.builder_stage_name == self.multi_stage.runtime_stage_name
        {
            errors.push(FieldError::new(
                "multiStage.runtimeStageName",
                "must differ from builderStageName",
            ));
        }
        if self.security.non_root_user && self.security.uid == 0 {
            errors.push(FieldError::new("security.uid", "uid 0 is root"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_request_defaults() {
        let req: DockerfileRequest =
            serde_json::from_value(json!({"language": "nodejs", "projectName": "web"})).unwrap();
        assert_eq!(req.base_image_type, BaseImageType::Alpine);
        assert!(req.multi_stage.enabled);
        assert_eq!(req.multi_stage.builder_stage_name, "builder");
        assert!(req.security.non_root_user);
        assert_eq!(req.workdir, "/app");
        assert!(req.generate_dockerignore);
        assert!(req.check_all().is_ok());
    }

    #[test]
    fn test_unknown_language_fails_to_parse() {
        let parsed = serde_json::from_value::<DockerfileRequest>(json!({"language": "cobol", "projectName": "x"}));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_identical_stage_names_rejected() {
        let req: DockerfileRequest = serde_json::from_value(json!({
            "language": "go",
            "projectName": "svc",
            "multiStage": {"builderStageName": "build", "runtimeStageName": "build"}
        }))
        .unwrap();
        let errors = req.check_all().unwrap_err();
        assert_eq!(errors[0].field, "multiStage.runtimeStageName");
    }
}
