//! Kubernetes manifest request schema

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{check_dns_label, check_non_empty, check_port, FieldError, SchemaCheck};
use crate::error::{GeneratorError, Result};

fn default_namespace() -> String {
    "default".to_string()
}

fn default_pull_policy() -> String {
    "IfNotPresent".to_string()
}

fn default_protocol() -> String {
    "TCP".to_string()
}

fn default_replicas() -> u32 {
    1
}

fn default_one() -> u32 {
    1
}

fn default_period() -> u32 {
    10
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_path() -> String {
    "/".to_string()
}

fn default_path_type() -> String {
    "Prefix".to_string()
}

fn default_access_modes() -> Vec<String> {
    vec!["ReadWriteOnce".to_string()]
}

fn default_secret_type() -> String {
    "Opaque".to_string()
}

fn default_target_api_version() -> String {
    "apps/v1".to_string()
}

fn default_target_kind() -> String {
    "Deployment".to_string()
}

/// Discriminant selecting which resource sub-object is read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceType {
    Deployment,
    Service,
    ConfigMap,
    Secret,
    Ingress,
    PersistentVolumeClaim,
    HorizontalPodAutoscaler,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Deployment => "Deployment",
            ResourceType::Service => "Service",
            ResourceType::ConfigMap => "ConfigMap",
            ResourceType::Secret => "Secret",
            ResourceType::Ingress => "Ingress",
            ResourceType::PersistentVolumeClaim => "PersistentVolumeClaim",
            ResourceType::HorizontalPodAutoscaler => "HorizontalPodAutoscaler",
        }
    }

    /// Name of the request field carrying this resource
    pub fn field(&self) -> &'static str {
        match self {
            ResourceType::Deployment => "deployment",
            ResourceType::Service => "service",
            ResourceType::ConfigMap => "configMap",
            ResourceType::Secret => "secret",
            ResourceType::Ingress => "ingress",
            ResourceType::PersistentVolumeClaim => "persistentVolumeClaim",
            ResourceType::HorizontalPodAutoscaler => "horizontalPodAutoscaler",
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Manifest generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestRequest {
    pub resource_type: ResourceType,
    /// Prepend a Namespace document when the namespace is not `default`
    #[serde(default)]
    pub include_namespace: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<DeploymentSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map: Option<ConfigMapSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<SecretSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress: Option<IngressSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent_volume_claim: Option<PvcSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizontal_pod_autoscaler: Option<HpaSpec>,
}

/// Borrowed view of the sub-object matching `resourceType`
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    Deployment(&'a DeploymentSpec),
    Service(&'a ServiceSpec),
    ConfigMap(&'a ConfigMapSpec),
    Secret(&'a SecretSpec),
    Ingress(&'a IngressSpec),
    PersistentVolumeClaim(&'a PvcSpec),
    HorizontalPodAutoscaler(&'a HpaSpec),
}

impl<'a> Resource<'a> {
    pub fn metadata(&self) -> &'a Metadata {
        match self {
            Resource::Deployment(r) => &r.metadata,
            Resource::Service(r) => &r.metadata,
            Resource::ConfigMap(r) => &r.metadata,
            Resource::Secret(r) => &r.metadata,
            Resource::Ingress(r) => &r.metadata,
            Resource::PersistentVolumeClaim(r) => &r.metadata,
            Resource::HorizontalPodAutoscaler(r) => &r.metadata,
        }
    }
}

impl ManifestRequest {
    /// Resolve the sub-object selected by `resourceType`
    pub fn resource(&self) -> Result<Resource<'_>> {
        let missing = || GeneratorError::MissingResource {
            resource_type: self.resource_type.as_str(),
            field: self.resource_type.field(),
        };
        Ok(match self.resource_type {
            ResourceType::Deployment => Resource::Deployment(self.deployment.as_ref().ok_or_else(missing)?),
            ResourceType::Service => Resource::Service(self.service.as_ref().ok_or_else(missing)?),
            ResourceType::ConfigMap => Resource::ConfigMap(self.config_map.as_ref().ok_or_else(missing)?),
            ResourceType::Secret => Resource::Secret(self.secret.as_ref().ok_or_else(missing)?),
            ResourceType::Ingress => Resource::Ingress(self.ingress.as_ref().ok_or_else(missing)?),
            ResourceType::PersistentVolumeClaim => {
                Resource::PersistentVolumeClaim(self.persistent_volume_claim.as_ref().ok_or_else(missing)?)
            }
            ResourceType::HorizontalPodAutoscaler => {
                Resource::HorizontalPodAutoscaler(self.horizontal_pod_autoscaler.as_ref().ok_or_else(missing)?)
            }
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

impl Metadata {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: default_namespace(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
        }
    }
}

/// Integer port or named port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortRef {
    Number(u32),
    Name(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub container_port: u32,
    #[serde(default = "default_protocol")]
    pub protocol: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRef {
    pub name: String,
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvVarSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map_key_ref: Option<KeyRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key_ref: Option<KeyRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvVar {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_from: Option<EnvVarSource>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceQuantities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequirements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests: Option<ResourceQuantities>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<ResourceQuantities>,
}

impl ResourceRequirements {
    pub fn has_limits(&self) -> bool {
        self.limits
            .as_ref()
            .is_some_and(|l| l.cpu.is_some() || l.memory.is_some())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    pub name: String,
    pub mount_path: String,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,
}

/// Probe mechanism; exactly one of `httpGet`, `exec`, `tcpSocket`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProbeHandler {
    #[serde(rename_all = "camelCase")]
    HttpGet {
        path: String,
        port: PortRef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scheme: Option<String>,
    },
    Exec { command: Vec<String> },
    TcpSocket { port: PortRef },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Probe {
    #[serde(flatten)]
    pub handler: ProbeHandler,
    #[serde(default)]
    pub initial_delay_seconds: u32,
    #[serde(default = "default_period")]
    pub period_seconds: u32,
    #[serde(default = "default_one")]
    pub timeout_seconds: u32,
    #[serde(default = "default_one")]
    pub success_threshold: u32,
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub name: String,
    pub image: String,
    #[serde(default = "default_pull_policy")]
    pub image_pull_policy: String,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub ports: Vec<ContainerPort>,
    #[serde(default)]
    pub env: Vec<EnvVar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
    #[serde(default)]
    pub volume_mounts: Vec<VolumeMount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liveness_probe: Option<Probe>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readiness_probe: Option<Probe>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startup_probe: Option<Probe>,
}

impl Container {
    /// True when the image reference has no tag or uses `latest`
    pub fn uses_floating_tag(&self) -> bool {
        if self.image.contains('@') {
            return false;
        }
        let last_segment = self.image.rsplit('/').next().unwrap_or(&self.image);
        match last_segment.split_once(':') {
            Some((_, tag)) => tag == "latest",
            None => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VolumeSource {
    ConfigMap {
        name: String,
    },
    #[serde(rename_all = "camelCase")]
    Secret {
        secret_name: String,
    },
    #[serde(rename_all = "camelCase")]
    PersistentVolumeClaim {
        claim_name: String,
    },
    #[serde(rename_all = "camelCase")]
    EmptyDir {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        medium: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size_limit: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub name: String,
    #[serde(flatten)]
    pub source: VolumeSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolloutStrategy {
    #[serde(rename = "type")]
    pub strategy_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_surge: Option<PortRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_unavailable: Option<PortRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSpec {
    pub metadata: Metadata,
    #[serde(default = "default_replicas")]
    pub replicas: u32,
    /// Pod selector; defaults to `app: <name>`
    #[serde(default)]
    pub selector: BTreeMap<String, String>,
    pub containers: Vec<Container>,
    #[serde(default)]
    pub init_containers: Vec<Container>,
    #[serde(default)]
    pub volumes: Vec<Volume>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<RolloutStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,
    #[serde(default)]
    pub node_selector: BTreeMap<String, String>,
    /// Pod security context, passed through as-is
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_context: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ServiceType {
    #[default]
    ClusterIP,
    NodePort,
    LoadBalancer,
    ExternalName,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::ClusterIP => "ClusterIP",
            ServiceType::NodePort => "NodePort",
            ServiceType::LoadBalancer => "LoadBalancer",
            ServiceType::ExternalName => "ExternalName",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePort {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub port: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_port: Option<PortRef>,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_port: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    pub metadata: Metadata,
    #[serde(default, rename = "type")]
    pub service_type: ServiceType,
    /// Pod selector; defaults to `app: <name>`
    #[serde(default)]
    pub selector: BTreeMap<String, String>,
    #[serde(default)]
    pub ports: Vec<ServicePort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_affinity: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMapSpec {
    pub metadata: Metadata,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
    #[serde(default)]
    pub binary_data: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretSpec {
    pub metadata: Metadata,
    #[serde(default = "default_secret_type", rename = "type")]
    pub secret_type: String,
    /// Base64-encoded values
    #[serde(default)]
    pub data: BTreeMap<String, String>,
    /// Plaintext values
    #[serde(default)]
    pub string_data: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressTls {
    pub hosts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressPath {
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default = "default_path_type")]
    pub path_type: String,
    pub service_name: String,
    pub service_port: PortRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    pub paths: Vec<IngressPath>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressSpec {
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress_class_name: Option<String>,
    #[serde(default)]
    pub tls: Vec<IngressTls>,
    pub rules: Vec<IngressRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PvcSpec {
    pub metadata: Metadata,
    #[serde(default = "default_access_modes")]
    pub access_modes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class_name: Option<String>,
    /// Requested size, e.g. `10Gi`
    pub storage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_mode: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleTargetRef {
    #[serde(default = "default_target_api_version")]
    pub api_version: String,
    #[serde(default = "default_target_kind")]
    pub kind: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HpaSpec {
    pub metadata: Metadata,
    pub scale_target_ref: ScaleTargetRef,
    #[serde(default = "default_one")]
    pub min_replicas: u32,
    pub max_replicas: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "targetCPUUtilizationPercentage")]
    pub target_cpu_utilization_percentage: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_memory_utilization_percentage: Option<u32>,
}

fn check_metadata(prefix: &str, metadata: &Metadata, errors: &mut Vec<FieldError>) {
    check_dns_label(&format!("{}.metadata.name", prefix), &metadata.name, errors);
    check_dns_label(&format!("{}.metadata.namespace", prefix), &metadata.namespace, errors);
}

fn check_container(prefix: &str, container: &Container, errors: &mut Vec<FieldError>) {
    check_dns_label(&format!("{}.name", prefix), &container.name, errors);
    check_non_empty(&format!("{}.image", prefix), &container.image, errors);
    for (i, port) in container.ports.iter().enumerate() {
        check_port(&format!("{}.ports[{}].containerPort", prefix, i), port.container_port, errors);
    }
    for (i, env) in container.env.iter().enumerate() {
        if env.value.is_some() == env.value_from.is_some() {
            errors.push(FieldError::new(
                format!("{}.env[{}]", prefix, i),
                "exactly one of value or valueFrom is required",
            ));
        }
    }
}

impl SchemaCheck for ManifestRequest {
    fn check(&self, errors: &mut Vec<FieldError>) {
        let resource = match self.resource() {
            Ok(resource) => resource,
            Err(e) => {
                errors.push(FieldError::new(self.resource_type.field(), e.to_string()));
                return;
            }
        };
        let prefix = self.resource_type.field();
        check_metadata(prefix, resource.metadata(), errors);

        match resource {
            Resource::Deployment(d) => {
                if d.containers.is_empty() {
                    errors.push(FieldError::new("deployment.containers", "at least one container is required"));
                }
                for (i, c) in d.containers.iter().enumerate() {
                    check_container(&format!("deployment.containers[{}]", i), c, errors);
                }
                for (i, c) in d.init_containers.iter().enumerate() {
                    check_container(&format!("deployment.initContainers[{}]", i), c, errors);
                }
            }
            Resource::Service(s) => {
                if s.service_type == ServiceType::ExternalName {
                    if s.external_name.is_none() {
                        errors.push(FieldError::new("service.externalName", "required for ExternalName services"));
                    }
                } else if s.ports.is_empty() {
                    errors.push(FieldError::new("service.ports", "at least one port is required"));
                }
                for (i, p) in s.ports.iter().enumerate() {
                    check_port(&format!("service.ports[{}].port", i), p.port, errors);
                }
            }
            Resource::ConfigMap(_) => {}
            Resource::Secret(s) => {
                if s.data.is_empty() && s.string_data.is_empty() {
                    errors.push(FieldError::new("secret", "one of data or stringData is required"));
                }
            }
            Resource::Ingress(i) => {
                if i.rules.is_empty() {
                    errors.push(FieldError::new("ingress.rules", "at least one rule is required"));
                }
            }
            Resource::PersistentVolumeClaim(p) => {
                check_non_empty("persistentVolumeClaim.storage", &p.storage, errors);
            }
            Resource::HorizontalPodAutoscaler(h) => {
                check_non_empty("horizontalPodAutoscaler.scaleTargetRef.name", &h.scale_target_ref.name, errors);
                if h.max_replicas == 0 {
                    errors.push(FieldError::new("horizontalPodAutoscaler.maxReplicas", "must be at least 1"));
                }
            }
        }
    }
}
