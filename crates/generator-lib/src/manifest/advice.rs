//! Best-practice warnings and follow-up suggestions for manifests

use crate::schema::manifest::{Container, Resource, ServiceType};

fn container_warnings(kind: &str, c: &Container, warnings: &mut Vec<String>) {
    if c.uses_floating_tag() {
        warnings.push(format!(
            "{} container '{}' uses image '{}' without a pinned tag; use an explicit version instead of latest",
            kind, c.name, c.image
        ));
    }
    if !c.resources.as_ref().is_some_and(|r| r.has_limits()) {
        warnings.push(format!(
            "{} container '{}' has no resource limits; set CPU and memory limits to protect the node",
            kind, c.name
        ));
    }
}

pub fn warnings(resource: Resource<'_>) -> Vec<String> {
    let mut warnings = Vec::new();
    match resource {
        Resource::Deployment(d) => {
            for c in &d.containers {
                container_warnings("Deployment", c, &mut warnings);
                if c.liveness_probe.is_none() {
                    warnings.push(format!(
                        "Container '{}' has no liveness probe; Kubernetes cannot restart it when it hangs",
                        c.name
                    ));
                }
                if c.readiness_probe.is_none() {
                    warnings.push(format!(
                        "Container '{}' has no readiness probe; traffic may reach it before it is ready",
                        c.name
                    ));
                }
            }
            if d.replicas < 2 {
                warnings.push(format!(
                    "Deployment '{}' runs {} replica(s); use at least 2 for high availability",
                    d.metadata.name, d.replicas
                ));
            }
        }
        Resource::Service(s) => match s.service_type {
            ServiceType::LoadBalancer => warnings.push(format!(
                "Service '{}' is of type LoadBalancer, which provisions a cloud load balancer and may incur costs",
                s.metadata.name
            )),
            ServiceType::NodePort => warnings.push(format!(
                "Service '{}' is of type NodePort and is exposed on every node's IP; consider an Ingress instead",
                s.metadata.name
            )),
            ServiceType::ClusterIP | ServiceType::ExternalName => {}
        },
        Resource::ConfigMap(c) => {
            let size: usize = c.data.iter().map(|(k, v)| k.len() + v.len()).sum();
            if size > 1024 * 1024 {
                warnings.push(format!(
                    "ConfigMap '{}' exceeds the 1MiB object size limit",
                    c.metadata.name
                ));
            }
        }
        Resource::Secret(s) => {
            if !s.string_data.is_empty() {
                warnings.push(format!(
                    "Secret '{}' uses stringData; values are stored in plaintext in the manifest, do not commit it to version control",
                    s.metadata.name
                ));
            }
        }
        Resource::Ingress(i) => {
            if i.tls.is_empty() {
                warnings.push(format!(
                    "Ingress '{}' has no TLS configuration; traffic will be served over plain HTTP",
                    i.metadata.name
                ));
            }
        }
        Resource::PersistentVolumeClaim(p) => {
            if p.storage_class_name.is_none() {
                warnings.push(format!(
                    "PersistentVolumeClaim '{}' has no storageClassName; the cluster default class will be used",
                    p.metadata.name
                ));
            }
        }
        Resource::HorizontalPodAutoscaler(h) => {
            if h.max_replicas <= h.min_replicas {
                warnings.push(format!(
                    "HorizontalPodAutoscaler '{}' has maxReplicas ({}) <= minReplicas ({}); it can never scale out",
                    h.metadata.name, h.max_replicas, h.min_replicas
                ));
            }
            if h.target_cpu_utilization_percentage.is_none()
                && h.target_memory_utilization_percentage.is_none()
            {
                warnings.push(format!(
                    "HorizontalPodAutoscaler '{}' has no utilization target",
                    h.metadata.name
                ));
            }
        }
    }
    warnings
}

pub fn suggestions(resource: Resource<'_>) -> Vec<String> {
    let meta = resource.metadata();
    let file = format!("{}.yaml", meta.name);
    let mut suggestions = vec![
        format!("Apply with: kubectl apply -f {}", file),
        format!("Preview server-side changes with: kubectl diff -f {}", file),
        format!("Validate with: kubectl apply --dry-run=server -f {}", file),
    ];
    match resource {
        Resource::Deployment(_) => {
            suggestions.push(format!(
                "Watch the rollout with: kubectl rollout status deployment/{} -n {}",
                meta.name, meta.namespace
            ));
            suggestions.push("Pair the Deployment with a PodDisruptionBudget for safe node drains".to_string());
        }
        Resource::Service(_) => suggestions.push(format!(
            "Check endpoints with: kubectl get endpoints {} -n {}",
            meta.name, meta.namespace
        )),
        Resource::ConfigMap(_) => suggestions.push(
            "Pods read ConfigMap changes only on restart unless mounted as a volume".to_string(),
        ),
        Resource::Secret(_) => suggestions.push(
            "Consider Sealed Secrets or External Secrets Operator instead of committing Secret manifests".to_string(),
        ),
        Resource::Ingress(_) => suggestions.push(
            "Make sure an ingress controller (e.g. ingress-nginx) is installed in the cluster".to_string(),
        ),
        Resource::PersistentVolumeClaim(_) => suggestions.push(format!(
            "Check binding with: kubectl get pvc {} -n {}",
            meta.name, meta.namespace
        )),
        Resource::HorizontalPodAutoscaler(_) => suggestions.push(
            "The HPA requires metrics-server (or another metrics API provider) in the cluster".to_string(),
        ),
    }
    suggestions
}
