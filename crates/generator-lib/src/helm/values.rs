//! values.yaml resolution
//!
//! `HelmValues::resolve` is the single place chart defaults live: every
//! field takes the explicit input when present and the default otherwise.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Value};

use crate::schema::helm::{
    AutoscalingValues, ChartOptions, ChartValues, HelmEnvironment, IngressHostValues,
    IngressPathValues, IngressTlsValues, NamedData, ProbeValues,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub repository: String,
    pub pull_policy: String,
    /// Empty means `.Chart.AppVersion`
    pub tag: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PullSecret {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceAccount {
    pub create: bool,
    pub annotations: BTreeMap<String, String>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityContext {
    pub run_as_non_root: bool,
    pub run_as_user: u32,
    pub read_only_root_filesystem: bool,
    pub allow_privilege_escalation: bool,
    pub capabilities: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    #[serde(rename = "type")]
    pub service_type: String,
    pub port: u32,
    pub target_port: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingress {
    pub enabled: bool,
    pub class_name: String,
    pub annotations: BTreeMap<String, String>,
    pub hosts: Vec<IngressHostValues>,
    pub tls: Vec<IngressTlsValues>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Autoscaling {
    pub enabled: bool,
    pub min_replicas: u32,
    pub max_replicas: u32,
    #[serde(rename = "targetCPUUtilizationPercentage")]
    pub target_cpu_utilization_percentage: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_memory_utilization_percentage: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Probe {
    pub enabled: bool,
    pub path: String,
    pub initial_delay_seconds: u32,
    pub period_seconds: u32,
}

/// Complete values.yaml content
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelmValues {
    pub replica_count: u32,
    pub image: Image,
    pub image_pull_secrets: Vec<PullSecret>,
    pub name_override: String,
    pub fullname_override: String,
    pub service_account: ServiceAccount,
    pub pod_annotations: BTreeMap<String, String>,
    pub pod_security_context: Value,
    pub security_context: SecurityContext,
    pub service: Service,
    pub ingress: Ingress,
    /// Requests/limits, `{}` when none were given
    pub resources: Value,
    pub autoscaling: Autoscaling,
    pub liveness_probe: Probe,
    pub readiness_probe: Probe,
    pub node_selector: BTreeMap<String, String>,
    pub tolerations: Vec<Value>,
    pub affinity: Value,
    pub env: BTreeMap<String, String>,
    pub config_maps: Vec<NamedData>,
    pub secrets: Vec<NamedData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod_disruption_budget: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_monitor: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_policy: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hooks: Option<Value>,
}

fn probe(input: Option<&ProbeValues>, path: &str, initial_delay: u32, period: u32) -> Probe {
    Probe {
        enabled: input.and_then(|p| p.enabled).unwrap_or(true),
        path: input
            .and_then(|p| p.path.clone())
            .unwrap_or_else(|| path.to_string()),
        initial_delay_seconds: input
            .and_then(|p| p.initial_delay_seconds)
            .unwrap_or(initial_delay),
        period_seconds: input.and_then(|p| p.period_seconds).unwrap_or(period),
    }
}

fn autoscaling(input: Option<&AutoscalingValues>) -> Autoscaling {
    Autoscaling {
        enabled: input.and_then(|a| a.enabled).unwrap_or(false),
        min_replicas: input.and_then(|a| a.min_replicas).unwrap_or(1),
        max_replicas: input.and_then(|a| a.max_replicas).unwrap_or(10),
        target_cpu_utilization_percentage: input
            .and_then(|a| a.target_cpu_utilization_percentage)
            .unwrap_or(80),
        target_memory_utilization_percentage: input
            .and_then(|a| a.target_memory_utilization_percentage),
    }
}

fn default_ingress_hosts() -> Vec<IngressHostValues> {
    vec![IngressHostValues {
        host: "chart-example.local".to_string(),
        paths: vec![IngressPathValues {
            path: "/".to_string(),
            path_type: "ImplementationSpecific".to_string(),
        }],
    }]
}

impl HelmValues {
    pub fn resolve(chart: &str, input: Option<&ChartValues>, options: &ChartOptions) -> Self {
        let image = input.and_then(|v| v.image.as_ref());
        let sa = input.and_then(|v| v.service_account.as_ref());
        let sc = input.and_then(|v| v.security_context.as_ref());
        let svc = input.and_then(|v| v.service.as_ref());
        let ing = input.and_then(|v| v.ingress.as_ref());

        HelmValues {
            replica_count: input.and_then(|v| v.replica_count).unwrap_or(1),
            image: Image {
                repository: image
                    .and_then(|i| i.repository.clone())
                    .unwrap_or_else(|| chart.to_string()),
                pull_policy: image
                    .and_then(|i| i.pull_policy.clone())
                    .unwrap_or_else(|| "IfNotPresent".to_string()),
                tag: image.and_then(|i| i.tag.clone()).unwrap_or_default(),
            },
            image_pull_secrets: input
                .map(|v| {
                    v.image_pull_secrets
                        .iter()
                        .map(|name| PullSecret { name: name.clone() })
                        .collect()
                })
                .unwrap_or_default(),
            name_override: input
                .and_then(|v| v.name_override.clone())
                .unwrap_or_default(),
            fullname_override: input
                .and_then(|v| v.fullname_override.clone())
                .unwrap_or_default(),
            service_account: ServiceAccount {
                create: sa.and_then(|s| s.create).unwrap_or(true),
                annotations: sa.and_then(|s| s.annotations.clone()).unwrap_or_default(),
                name: sa.and_then(|s| s.name.clone()).unwrap_or_default(),
            },
            pod_annotations: input.map(|v| v.pod_annotations.clone()).unwrap_or_default(),
            pod_security_context: input
                .and_then(|v| v.pod_security_context.clone())
                .unwrap_or_else(|| json!({"fsGroup": 1000})),
            security_context: SecurityContext {
                run_as_non_root: sc.and_then(|s| s.run_as_non_root).unwrap_or(true),
                run_as_user: sc.and_then(|s| s.run_as_user).unwrap_or(1000),
                read_only_root_filesystem: sc
                    .and_then(|s| s.read_only_root_filesystem)
                    .unwrap_or(true),
                allow_privilege_escalation: sc
                    .and_then(|s| s.allow_privilege_escalation)
                    .unwrap_or(false),
                capabilities: sc
                    .and_then(|s| s.capabilities.clone())
                    .unwrap_or_else(|| json!({"drop": ["ALL"]})),
            },
            service: Service {
                service_type: svc
                    .and_then(|s| s.service_type.clone())
                    .unwrap_or_else(|| "ClusterIP".to_string()),
                port: svc.and_then(|s| s.port).unwrap_or(80),
                target_port: svc.and_then(|s| s.target_port).unwrap_or(8080),
            },
            ingress: Ingress {
                enabled: ing.and_then(|i| i.enabled).unwrap_or(false),
                class_name: ing.and_then(|i| i.class_name.clone()).unwrap_or_default(),
                annotations: ing.and_then(|i| i.annotations.clone()).unwrap_or_default(),
                hosts: ing
                    .and_then(|i| i.hosts.clone())
                    .unwrap_or_else(default_ingress_hosts),
                tls: ing.and_then(|i| i.tls.clone()).unwrap_or_default(),
            },
            resources: input
                .and_then(|v| v.resources.as_ref())
                .and_then(|r| serde_json::to_value(r).ok())
                .unwrap_or_else(|| json!({})),
            autoscaling: autoscaling(input.and_then(|v| v.autoscaling.as_ref())),
            liveness_probe: probe(input.and_then(|v| v.liveness_probe.as_ref()), "/health", 30, 10),
            readiness_probe: probe(input.and_then(|v| v.readiness_probe.as_ref()), "/ready", 5, 5),
            node_selector: input.map(|v| v.node_selector.clone()).unwrap_or_default(),
            tolerations: input.map(|v| v.tolerations.clone()).unwrap_or_default(),
            affinity: input
                .and_then(|v| v.affinity.clone())
                .unwrap_or_else(|| json!({})),
            env: input.map(|v| v.env.clone()).unwrap_or_default(),
            config_maps: input.map(|v| v.config_maps.clone()).unwrap_or_default(),
            secrets: input.map(|v| v.secrets.clone()).unwrap_or_default(),
            pod_disruption_budget: options
                .include_pod_disruption_budget
                .then(|| json!({"enabled": true, "minAvailable": 1})),
            service_monitor: options
                .include_service_monitor
                .then(|| json!({"enabled": true, "interval": "30s", "path": "/metrics"})),
            network_policy: options.include_network_policy.then(|| json!({"enabled": true})),
            hooks: options.include_hooks.then(|| {
                json!({
                    "preInstall": {
                        "enabled": true,
                        "image": "busybox:1.36",
                        "command": ["sh", "-c", "echo running pre-install checks"],
                    }
                })
            }),
        }
    }

    pub fn has_limits(&self) -> bool {
        self.resources
            .get("limits")
            .and_then(Value::as_object)
            .is_some_and(|l| !l.is_empty())
    }
}

/// Overlay written to `values-<env>.yaml`; always carries `replicaCount`
pub fn environment_overlay(env: &HelmEnvironment, base: &HelmValues) -> Value {
    let mut map = serde_json::Map::new();
    map.insert(
        "replicaCount".into(),
        json!(env.replica_count.unwrap_or(base.replica_count)),
    );
    if let Some(tag) = &env.image_tag {
        map.insert("image".into(), json!({"tag": tag}));
    }
    if let Some(resources) = &env.resources {
        if let Ok(value) = serde_json::to_value(resources) {
            map.insert("resources".into(), value);
        }
    }
    if let Some(a) = &env.autoscaling {
        if let Ok(value) = serde_json::to_value(a) {
            map.insert("autoscaling".into(), value);
        }
    }
    if !env.ingress_hosts.is_empty() {
        map.insert(
            "ingress".into(),
            json!({
                "enabled": true,
                "hosts": env.ingress_hosts.iter().map(|host| json!({
                    "host": host,
                    "paths": [{"path": "/", "pathType": "ImplementationSpecific"}],
                })).collect::<Vec<_>>(),
            }),
        );
    }
    for (key, value) in &env.values {
        map.insert(key.clone(), value.clone());
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values(input: Value) -> ChartValues {
        serde_json::from_value(input).unwrap()
    }

    #[test]
    fn test_defaults_without_input() {
        let v = HelmValues::resolve("web", None, &ChartOptions::default());
        assert_eq!(v.replica_count, 1);
        assert_eq!(v.image.repository, "web");
        assert_eq!(v.image.pull_policy, "IfNotPresent");
        assert_eq!(v.service.service_type, "ClusterIP");
        assert_eq!(v.service.port, 80);
        assert!(v.security_context.run_as_non_root);
        assert!(v.liveness_probe.enabled);
        assert!(!v.autoscaling.enabled);
        assert!(!v.has_limits());
        assert!(v.hooks.is_none());
    }

    #[test]
    fn test_explicit_fields_override_defaults_individually() {
        let input = values(json!({
            "image": {"repository": "acme/web"},
            "service": {"port": 8080},
            "securityContext": {"runAsNonRoot": false},
            "resources": {"limits": {"cpu": "500m"}},
            "autoscaling": {"enabled": true, "maxReplicas": 5}
        }));
        let v = HelmValues::resolve("web", Some(&input), &ChartOptions::default());
        assert_eq!(v.image.repository, "acme/web");
        assert_eq!(v.image.pull_policy, "IfNotPresent");
        assert_eq!(v.service.port, 8080);
        assert_eq!(v.service.service_type, "ClusterIP");
        assert!(!v.security_context.run_as_non_root);
        assert!(!v.security_context.allow_privilege_escalation);
        assert!(v.has_limits());
        assert!(v.autoscaling.enabled);
        assert_eq!(v.autoscaling.min_replicas, 1);
        assert_eq!(v.autoscaling.max_replicas, 5);
    }

    #[test]
    fn test_option_gated_blocks() {
        let options = ChartOptions {
            include_hooks: true,
            include_pod_disruption_budget: true,
            ..ChartOptions::default()
        };
        let v = HelmValues::resolve("web", None, &options);
        assert!(v.hooks.is_some());
        assert!(v.pod_disruption_budget.is_some());
        assert!(v.service_monitor.is_none());
    }

    #[test]
    fn test_overlay_inherits_replica_count() {
        let base = HelmValues::resolve("web", None, &ChartOptions::default());
        let env: HelmEnvironment = serde_json::from_value(json!({
            "name": "staging",
            "imageTag": "1.2.3",
            "ingressHosts": ["staging.example.com"],
            "values": {"logLevel": "debug"}
        }))
        .unwrap();
        let overlay = environment_overlay(&env, &base);
        assert_eq!(overlay["replicaCount"], 1);
        assert_eq!(overlay["image"]["tag"], "1.2.3");
        assert_eq!(overlay["ingress"]["hosts"][0]["host"], "staging.example.com");
        assert_eq!(overlay["logLevel"], "debug");
    }
}
