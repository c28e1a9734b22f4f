//! Helm chart request schema
//!
//! `ChartValues` mirrors a Helm `values.yaml`, with every field optional so
//! the generator can merge explicit input over its defaults field by field.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::manifest::ResourceRequirements;
use super::{check_dns_label, check_non_empty, FieldError, SchemaCheck};

fn default_true() -> bool {
    true
}

fn default_chart_version() -> String {
    "0.1.0".to_string()
}

fn default_app_version() -> String {
    "1.0.0".to_string()
}

fn default_api_version() -> String {
    "v2".to_string()
}

fn default_chart_type() -> String {
    "application".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Maintainer {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    pub name: String,
    #[serde(default = "default_chart_version")]
    pub version: String,
    #[serde(default = "default_app_version")]
    pub app_version: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_chart_type", rename = "type")]
    pub chart_type: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub maintainers: Vec<Maintainer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_policy: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityContextValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_as_non_root: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_as_user: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only_root_filesystem: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_privilege_escalation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceValues {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_port: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressPathValues {
    pub path: String,
    #[serde(default = "default_path_type")]
    pub path_type: String,
}

fn default_path_type() -> String {
    "ImplementationSpecific".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressHostValues {
    pub host: String,
    pub paths: Vec<IngressPathValues>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressTlsValues {
    pub secret_name: String,
    pub hosts: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosts: Option<Vec<IngressHostValues>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<Vec<IngressTlsValues>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoscalingValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_replicas: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_replicas: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "targetCPUUtilizationPercentage")]
    pub target_cpu_utilization_percentage: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_memory_utilization_percentage: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_delay_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_seconds: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedData {
    pub name: String,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replica_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageValues>,
    #[serde(default)]
    pub image_pull_secrets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_override: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fullname_override: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account: Option<ServiceAccountValues>,
    #[serde(default)]
    pub pod_annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_security_context: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_context: Option<SecurityContextValues>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceValues>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress: Option<IngressValues>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoscaling: Option<AutoscalingValues>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liveness_probe: Option<ProbeValues>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readiness_probe: Option<ProbeValues>,
    #[serde(default)]
    pub node_selector: BTreeMap<String, String>,
    #[serde(default)]
    pub tolerations: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity: Option<serde_json::Value>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub config_maps: Vec<NamedData>,
    #[serde(default)]
    pub secrets: Vec<NamedData>,
}

/// Per-environment overrides written to `values-<name>.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelmEnvironment {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replica_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoscaling: Option<AutoscalingValues>,
    #[serde(default)]
    pub ingress_hosts: Vec<String>,
    /// Additional top-level keys merged into the overlay
    #[serde(default)]
    pub values: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDependency {
    pub name: String,
    pub version: String,
    pub repository: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartOptions {
    #[serde(default = "default_true")]
    pub include_helpers: bool,
    #[serde(default = "default_true")]
    pub include_tests: bool,
    #[serde(default = "default_true")]
    pub include_notes: bool,
    #[serde(default)]
    pub include_hooks: bool,
    #[serde(default)]
    pub generate_environment_values: bool,
    #[serde(default)]
    pub include_service_monitor: bool,
    #[serde(default)]
    pub include_pod_disruption_budget: bool,
    #[serde(default)]
    pub include_network_policy: bool,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            include_helpers: true,
            include_tests: true,
            include_notes: true,
            include_hooks: false,
            generate_environment_values: false,
            include_service_monitor: false,
            include_pod_disruption_budget: false,
            include_network_policy: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateStyle {
    /// Templates carry a one-line header comment
    #[default]
    Standard,
    Minimal,
}

/// Helm chart generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelmChartRequest {
    pub metadata: ChartMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<ChartValues>,
    #[serde(default)]
    pub environments: Vec<HelmEnvironment>,
    #[serde(default)]
    pub dependencies: Vec<ChartDependency>,
    #[serde(default)]
    pub options: ChartOptions,
    #[serde(default)]
    pub template_style: TemplateStyle,
}

impl SchemaCheck for HelmChartRequest {
    fn check(&self, errors: &mut Vec<FieldError>) {
        // Chart names are checked against the label pattern only; the 53
        // character release limit is advisory and reported by `validate`.
        let name = &self.metadata.name;
        if name.len() <= super::DNS_LABEL_MAX {
            check_dns_label("metadata.name", name, errors);
        } else if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            errors.push(FieldError::new("metadata.name", "must contain only lowercase alphanumerics or '-'"));
        }
        check_non_empty("metadata.version", &self.metadata.version, errors);

        let mut seen = std::collections::BTreeSet::new();
        for (i, env) in self.environments.iter().enumerate() {
            check_dns_label(&format!("environments[{}].name", i), &env.name, errors);
            if !seen.insert(env.name.as_str()) {
                errors.push(FieldError::new(
                    format!("environments[{}].name", i),
                    format!("duplicate environment '{}'", env.name),
                ));
            }
        }
        for (i, dep) in self.dependencies.iter().enumerate() {
            check_non_empty(&format!("dependencies[{}].name", i), &dep.name, errors);
            check_non_empty(&format!("dependencies[{}].repository", i), &dep.repository, errors);
        }
        if let Some(values) = &self.values {
            for (i, cm) in values.config_maps.iter().enumerate() {
                check_dns_label(&format!("values.configMaps[{}].name", i), &cm.name, errors);
            }
            for (i, s) in values.secrets.iter().enumerate() {
                check_dns_label(&format!("values.secrets[{}].name", i), &s.name, errors);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_options_default() {
        let req: HelmChartRequest = serde_json::from_value(json!({"metadata": {"name": "web"}})).unwrap();
        assert!(req.options.include_helpers);
        assert!(req.options.include_tests);
        assert!(!req.options.generate_environment_values);
        assert_eq!(req.metadata.version, "0.1.0");
        assert_eq!(req.metadata.api_version, "v2");
        assert_eq!(req.template_style, TemplateStyle::Standard);
    }

    #[test]
    fn test_long_name_passes_schema() {
        let req: HelmChartRequest =
            serde_json::from_value(json!({"metadata": {"name": "a".repeat(60)}})).unwrap();
        assert!(req.check_all().is_ok());
    }

    #[test]
    fn test_duplicate_environment_rejected() {
        let req: HelmChartRequest = serde_json::from_value(json!({
            "metadata": {"name": "web"},
            "environments": [{"name": "dev"}, {"name": "dev"}]
        }))
        .unwrap();
        let errors = req.check_all().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("duplicate"));
    }
}
