use serde::Deserialize;
use serde_json::json;

use super::*;
use crate::error::GeneratorError;

fn request(value: serde_json::Value) -> ManifestRequest {
    serde_json::from_value(value).unwrap()
}

fn parse_documents(yaml: &str) -> Vec<serde_yaml::Value> {
    serde_yaml::Deserializer::from_str(yaml)
        .map(|doc| serde_yaml::Value::deserialize(doc).unwrap())
        .collect()
}

fn deployment_request() -> ManifestRequest {
    request(json!({
        "resourceType": "Deployment",
        "deployment": {
            "metadata": {"name": "web", "namespace": "shop", "labels": {"tier": "frontend"}},
            "replicas": 3,
            "containers": [{
                "name": "web",
                "image": "nginx:1.25",
                "ports": [{"containerPort": 80}],
                "env": [
                    {"name": "MODE", "value": "prod"},
                    {"name": "DB_PASSWORD", "valueFrom": {"secretKeyRef": {"name": "db", "key": "password"}}}
                ],
                "resources": {"limits": {"cpu": "500m", "memory": "256Mi"}},
                "livenessProbe": {"httpGet": {"path": "/healthz", "port": 80}},
                "readinessProbe": {"tcpSocket": {"port": 80}}
            }],
            "volumes": [{"name": "cache", "emptyDir": {"sizeLimit": "1Gi"}}]
        }
    }))
}

#[test]
fn test_deployment_structure() {
    let req = deployment_request();
    let yaml = ManifestGenerator::new(&req).generate().unwrap();
    let docs = parse_documents(&yaml);
    assert_eq!(docs.len(), 1);

    let doc = &docs[0];
    assert_eq!(doc["apiVersion"], "apps/v1");
    assert_eq!(doc["kind"], "Deployment");
    assert_eq!(doc["metadata"]["name"], "web");
    assert_eq!(doc["spec"]["replicas"], 3);
    assert_eq!(doc["spec"]["selector"]["matchLabels"]["app"], "web");

    let pod_labels = &doc["spec"]["template"]["metadata"]["labels"];
    assert_eq!(pod_labels["app"], "web");
    assert_eq!(pod_labels["tier"], "frontend");

    let container = &doc["spec"]["template"]["spec"]["containers"][0];
    assert_eq!(container["imagePullPolicy"], "IfNotPresent");
    assert_eq!(container["env"][1]["valueFrom"]["secretKeyRef"]["key"], "password");
    assert_eq!(container["livenessProbe"]["httpGet"]["path"], "/healthz");
    assert_eq!(container["livenessProbe"]["periodSeconds"], 10);
    assert_eq!(container["livenessProbe"]["initialDelaySeconds"], 0);

    let volume = &doc["spec"]["template"]["spec"]["volumes"][0];
    assert_eq!(volume["name"], "cache");
    assert_eq!(volume["emptyDir"]["sizeLimit"], "1Gi");
}

#[test]
fn test_empty_fields_are_not_emitted() {
    let req = deployment_request();
    let yaml = ManifestGenerator::new(&req).generate().unwrap();
    assert!(!yaml.contains("annotations"));
    assert!(!yaml.contains("command"));
    assert!(!yaml.contains("initContainers"));
    assert!(!yaml.contains("null"));
    assert!(!yaml.contains("{}"));
}

#[test]
fn test_generate_is_deterministic() {
    let req = deployment_request();
    let generator = ManifestGenerator::new(&req);
    assert_eq!(generator.generate().unwrap(), generator.generate().unwrap());
}

#[test]
fn test_namespace_document_prepended() {
    let mut req = deployment_request();
    req.include_namespace = true;
    let yaml = ManifestGenerator::new(&req).generate().unwrap();
    assert!(yaml.contains("\n---\n"));

    let docs = parse_documents(&yaml);
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0]["kind"], "Namespace");
    assert_eq!(docs[0]["metadata"]["name"], "shop");
    assert_eq!(docs[1]["kind"], "Deployment");
}

#[test]
fn test_no_namespace_document_for_default_namespace() {
    let req = request(json!({
        "resourceType": "ConfigMap",
        "includeNamespace": true,
        "configMap": {"metadata": {"name": "settings"}, "data": {"LOG_LEVEL": "info"}}
    }));
    let docs = parse_documents(&ManifestGenerator::new(&req).generate().unwrap());
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["data"]["LOG_LEVEL"], "info");
}

#[test]
fn test_load_balancer_service() {
    let req = request(json!({
        "resourceType": "Service",
        "service": {"metadata": {"name": "svc"}, "type": "LoadBalancer", "ports": [{"port": 80}]}
    }));
    let generator = ManifestGenerator::new(&req);
    let docs = parse_documents(&generator.generate().unwrap());
    assert_eq!(docs[0]["spec"]["type"], "LoadBalancer");
    assert_eq!(docs[0]["spec"]["ports"][0]["targetPort"], 80);
    assert_eq!(docs[0]["spec"]["selector"]["app"], "svc");

    let warnings = generator.warnings().unwrap();
    assert!(warnings.iter().any(|w| w.contains("LoadBalancer") && w.contains("cost")));
}

#[test]
fn test_ingress_backend_and_tls_warning() {
    let req = request(json!({
        "resourceType": "Ingress",
        "ingress": {
            "metadata": {"name": "web"},
            "ingressClassName": "nginx",
            "rules": [{"host": "shop.example.com", "paths": [{"serviceName": "web", "servicePort": 80}]}]
        }
    }));
    let generator = ManifestGenerator::new(&req);
    let docs = parse_documents(&generator.generate().unwrap());
    let path = &docs[0]["spec"]["rules"][0]["http"]["paths"][0];
    assert_eq!(path["pathType"], "Prefix");
    assert_eq!(path["backend"]["service"]["port"]["number"], 80);
    assert!(generator.warnings().unwrap().iter().any(|w| w.contains("TLS")));
}

#[test]
fn test_secret_string_data_warning() {
    let req = request(json!({
        "resourceType": "Secret",
        "secret": {"metadata": {"name": "creds"}, "stringData": {"password": "hunter2"}}
    }));
    let generator = ManifestGenerator::new(&req);
    let docs = parse_documents(&generator.generate().unwrap());
    assert_eq!(docs[0]["type"], "Opaque");
    assert_eq!(docs[0]["stringData"]["password"], "hunter2");
    assert!(docs[0].get("data").is_none());
    assert!(generator.warnings().unwrap().iter().any(|w| w.contains("plaintext")));
}

#[test]
fn test_pvc_and_hpa() {
    let pvc = request(json!({
        "resourceType": "PersistentVolumeClaim",
        "persistentVolumeClaim": {"metadata": {"name": "data"}, "storage": "10Gi"}
    }));
    let docs = parse_documents(&ManifestGenerator::new(&pvc).generate().unwrap());
    assert_eq!(docs[0]["spec"]["accessModes"][0], "ReadWriteOnce");
    assert_eq!(docs[0]["spec"]["resources"]["requests"]["storage"], "10Gi");

    let hpa = request(json!({
        "resourceType": "HorizontalPodAutoscaler",
        "horizontalPodAutoscaler": {
            "metadata": {"name": "web"},
            "scaleTargetRef": {"name": "web"},
            "minReplicas": 2,
            "maxReplicas": 2,
            "targetCPUUtilizationPercentage": 75
        }
    }));
    let generator = ManifestGenerator::new(&hpa);
    let docs = parse_documents(&generator.generate().unwrap());
    assert_eq!(docs[0]["apiVersion"], "autoscaling/v2");
    assert_eq!(docs[0]["spec"]["scaleTargetRef"]["kind"], "Deployment");
    assert_eq!(docs[0]["spec"]["metrics"][0]["resource"]["target"]["averageUtilization"], 75);
    assert!(generator.warnings().unwrap().iter().any(|w| w.contains("never scale out")));
}

#[test]
fn test_deployment_warnings() {
    let req = request(json!({
        "resourceType": "Deployment",
        "deployment": {
            "metadata": {"name": "api"},
            "containers": [{"name": "api", "image": "acme/api"}]
        }
    }));
    let warnings = ManifestGenerator::new(&req).warnings().unwrap();
    assert!(warnings.iter().any(|w| w.contains("latest")));
    assert!(warnings.iter().any(|w| w.contains("resource limits")));
    assert!(warnings.iter().any(|w| w.contains("liveness")));
    assert!(warnings.iter().any(|w| w.contains("readiness")));
    assert!(warnings.iter().any(|w| w.contains("high availability")));
}

#[test]
fn test_well_configured_deployment_has_no_warnings() {
    let req = deployment_request();
    assert!(ManifestGenerator::new(&req).warnings().unwrap().is_empty());
}

#[test]
fn test_suggestions_include_kubectl_apply() {
    let req = deployment_request();
    let suggestions = ManifestGenerator::new(&req).suggestions().unwrap();
    assert!(suggestions[0].contains("kubectl apply -f web.yaml"));
    assert!(suggestions.iter().any(|s| s.contains("rollout status deployment/web -n shop")));
}

#[test]
fn test_missing_sub_object_fails_fast() {
    let req = request(json!({"resourceType": "Service"}));
    let err = ManifestGenerator::new(&req).generate().unwrap_err();
    assert!(matches!(err, GeneratorError::MissingResource { field: "service", .. }));
}

#[test]
fn test_every_resource_type_has_required_keys() {
    for value in crate::templates::manifest_templates().values() {
        let req: ManifestRequest = serde_json::from_value(value.clone()).unwrap();
        let docs = parse_documents(&ManifestGenerator::new(&req).generate().unwrap());
        let doc = docs.last().unwrap();
        assert!(doc.get("apiVersion").is_some());
        assert!(doc.get("kind").is_some());
        assert!(doc["metadata"].get("name").is_some());
    }
}
