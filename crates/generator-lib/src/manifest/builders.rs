//! Kubernetes object builders
//!
//! Each builder mirrors the target API object as a JSON tree. Optional
//! fields are emitted as `null`/empty and removed by `yaml::clean`.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::schema::manifest::{
    ConfigMapSpec, Container, DeploymentSpec, HpaSpec, IngressSpec, Metadata, PortRef, Probe,
    PvcSpec, ResourceRequirements, SecretSpec, ServiceSpec, ServiceType,
};

fn metadata(meta: &Metadata) -> Value {
    json!({
        "name": meta.name,
        "namespace": meta.namespace,
        "labels": meta.labels,
        "annotations": meta.annotations,
    })
}

/// Selector labels, falling back to `app: <name>`
fn selector_or_default(selector: &BTreeMap<String, String>, name: &str) -> BTreeMap<String, String> {
    if selector.is_empty() {
        BTreeMap::from([("app".to_string(), name.to_string())])
    } else {
        selector.clone()
    }
}

fn port_ref(port: &PortRef) -> Value {
    match port {
        PortRef::Number(n) => json!(n),
        PortRef::Name(s) => json!(s),
    }
}

fn resources(resources: &Option<ResourceRequirements>) -> Value {
    match resources {
        Some(r) => json!({
            "requests": r.requests.as_ref().map(|q| json!({"cpu": q.cpu, "memory": q.memory})),
            "limits": r.limits.as_ref().map(|q| json!({"cpu": q.cpu, "memory": q.memory})),
        }),
        None => Value::Null,
    }
}

fn probe(probe: &Option<Probe>) -> Value {
    let Some(probe) = probe else {
        return Value::Null;
    };
    let mut value = serde_json::to_value(&probe.handler).unwrap_or(Value::Null);
    if let Value::Object(map) = &mut value {
        map.insert("initialDelaySeconds".into(), json!(probe.initial_delay_seconds));
        map.insert("periodSeconds".into(), json!(probe.period_seconds));
        map.insert("timeoutSeconds".into(), json!(probe.timeout_seconds));
        map.insert("successThreshold".into(), json!(probe.success_threshold));
        map.insert("failureThreshold".into(), json!(probe.failure_threshold));
    }
    value
}

pub(crate) fn container(c: &Container) -> Value {
    json!({
        "name": c.name,
        "image": c.image,
        "imagePullPolicy": c.image_pull_policy,
        "command": c.command,
        "args": c.args,
        "ports": c.ports.iter().map(|p| json!({
            "name": p.name,
            "containerPort": p.container_port,
            "protocol": p.protocol,
        })).collect::<Vec<_>>(),
        "env": c.env.iter().map(|e| json!({
            "name": e.name,
            "value": e.value,
            "valueFrom": e.value_from.as_ref().map(|src| json!({
                "configMapKeyRef": src.config_map_key_ref.as_ref().map(|r| json!({"name": r.name, "key": r.key})),
                "secretKeyRef": src.secret_key_ref.as_ref().map(|r| json!({"name": r.name, "key": r.key})),
            })),
        })).collect::<Vec<_>>(),
        "resources": resources(&c.resources),
        "volumeMounts": c.volume_mounts.iter().map(|m| json!({
            "name": m.name,
            "mountPath": m.mount_path,
            "readOnly": m.read_only.then_some(true),
            "subPath": m.sub_path,
        })).collect::<Vec<_>>(),
        "livenessProbe": probe(&c.liveness_probe),
        "readinessProbe": probe(&c.readiness_probe),
        "startupProbe": probe(&c.startup_probe),
    })
}

pub fn namespace(name: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {"name": name},
    })
}

pub fn deployment(d: &DeploymentSpec) -> Value {
    let selector = selector_or_default(&d.selector, &d.metadata.name);
    let mut pod_labels = d.metadata.labels.clone();
    pod_labels.extend(selector.clone());

    let volumes: Vec<Value> = d
        .volumes
        .iter()
        .map(|v| {
            let mut value = serde_json::to_value(&v.source).unwrap_or(Value::Null);
            if let Value::Object(map) = &mut value {
                map.insert("name".into(), json!(v.name));
            }
            value
        })
        .collect();

    json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": metadata(&d.metadata),
        "spec": {
            "replicas": d.replicas,
            "selector": {"matchLabels": selector},
            "strategy": d.strategy.as_ref().map(|s| json!({
                "type": s.strategy_type,
                "rollingUpdate": if s.strategy_type == "RollingUpdate" {
                    json!({
                        "maxSurge": s.max_surge.as_ref().map(port_ref),
                        "maxUnavailable": s.max_unavailable.as_ref().map(port_ref),
                    })
                } else {
                    Value::Null
                },
            })),
            "template": {
                "metadata": {
                    "labels": pod_labels,
                    "annotations": d.metadata.annotations,
                },
                "spec": {
                    "serviceAccountName": d.service_account_name,
                    "securityContext": d.security_context,
                    "nodeSelector": d.node_selector,
                    "initContainers": d.init_containers.iter().map(container).collect::<Vec<_>>(),
                    "containers": d.containers.iter().map(container).collect::<Vec<_>>(),
                    "volumes": volumes,
                },
            },
        },
    })
}

pub fn service(s: &ServiceSpec) -> Value {
    let selector = match s.service_type {
        ServiceType::ExternalName => BTreeMap::new(),
        _ => selector_or_default(&s.selector, &s.metadata.name),
    };
    json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": metadata(&s.metadata),
        "spec": {
            "type": s.service_type.as_str(),
            "selector": selector,
            "ports": s.ports.iter().map(|p| json!({
                "name": p.name,
                "port": p.port,
                "targetPort": p.target_port.as_ref().map(port_ref).unwrap_or_else(|| json!(p.port)),
                "protocol": p.protocol,
                "nodePort": p.node_port,
            })).collect::<Vec<_>>(),
            "externalName": s.external_name,
            "sessionAffinity": s.session_affinity,
        },
    })
}

pub fn config_map(c: &ConfigMapSpec) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": metadata(&c.metadata),
        "data": c.data,
        "binaryData": c.binary_data,
    })
}

pub fn secret(s: &SecretSpec) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": metadata(&s.metadata),
        "type": s.secret_type,
        "data": s.data,
        "stringData": s.string_data,
    })
}

pub fn ingress(i: &IngressSpec) -> Value {
    json!({
        "apiVersion": "networking.k8s.io/v1",
        "kind": "Ingress",
        "metadata": metadata(&i.metadata),
        "spec": {
            "ingressClassName": i.ingress_class_name,
            "tls": i.tls.iter().map(|t| json!({
                "hosts": t.hosts,
                "secretName": t.secret_name,
            })).collect::<Vec<_>>(),
            "rules": i.rules.iter().map(|r| json!({
                "host": r.host,
                "http": {
                    "paths": r.paths.iter().map(|p| json!({
                        "path": p.path,
                        "pathType": p.path_type,
                        "backend": {
                            "service": {
                                "name": p.service_name,
                                "port": match &p.service_port {
                                    PortRef::Number(n) => json!({"number": n}),
                                    PortRef::Name(s) => json!({"name": s}),
                                },
                            },
                        },
                    })).collect::<Vec<_>>(),
                },
            })).collect::<Vec<_>>(),
        },
    })
}

pub fn persistent_volume_claim(p: &PvcSpec) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "PersistentVolumeClaim",
        "metadata": metadata(&p.metadata),
        "spec": {
            "accessModes": p.access_modes,
            "storageClassName": p.storage_class_name,
            "volumeMode": p.volume_mode,
            "resources": {"requests": {"storage": p.storage}},
        },
    })
}

pub fn horizontal_pod_autoscaler(h: &HpaSpec) -> Value {
    let utilization = |resource: &str, target: Option<u32>| {
        target.map(|t| {
            json!({
                "type": "Resource",
                "resource": {
                    "name": resource,
                    "target": {"type": "Utilization", "averageUtilization": t},
                },
            })
        })
    };
    let metrics: Vec<Value> = [
        utilization("cpu", h.target_cpu_utilization_percentage),
        utilization("memory", h.target_memory_utilization_percentage),
    ]
    .into_iter()
    .flatten()
    .collect();

    json!({
        "apiVersion": "autoscaling/v2",
        "kind": "HorizontalPodAutoscaler",
        "metadata": metadata(&h.metadata),
        "spec": {
            "scaleTargetRef": {
                "apiVersion": h.scale_target_ref.api_version,
                "kind": h.scale_target_ref.kind,
                "name": h.scale_target_ref.name,
            },
            "minReplicas": h.min_replicas,
            "maxReplicas": h.max_replicas,
            "metrics": metrics,
        },
    })
}
