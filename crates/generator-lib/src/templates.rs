//! Canned example requests served by the `templates` endpoints
//!
//! Each template is a complete request body for its generator and is
//! checked against the request schema in the tests below.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::schema::Language;

pub fn manifest_templates() -> BTreeMap<&'static str, Value> {
    BTreeMap::from([
        (
            "deployment",
            json!({
                "resourceType": "Deployment",
                "deployment": {
                    "metadata": {
                        "name": "my-app",
                        "namespace": "default",
                        "labels": {"app": "my-app"}
                    },
                    "replicas": 3,
                    "selector": {"app": "my-app"},
                    "containers": [{
                        "name": "my-app",
                        "image": "my-app:1.0.0",
                        "ports": [{"name": "http", "containerPort": 8080}],
                        "resources": {
                            "requests": {"cpu": "100m", "memory": "128Mi"},
                            "limits": {"cpu": "500m", "memory": "512Mi"}
                        },
                        "livenessProbe": {
                            "httpGet": {"path": "/health", "port": 8080},
                            "initialDelaySeconds": 30
                        },
                        "readinessProbe": {
                            "httpGet": {"path": "/ready", "port": 8080},
                            "initialDelaySeconds": 5
                        }
                    }]
                }
            }),
        ),
        (
            "service",
            json!({
                "resourceType": "Service",
                "service": {
                    "metadata": {"name": "my-app", "namespace": "default"},
                    "type": "ClusterIP",
                    "selector": {"app": "my-app"},
                    "ports": [{"name": "http", "port": 80, "targetPort": 8080}]
                }
            }),
        ),
    ])
}

/// Per-language extras for the Dockerfile examples
fn dockerfile_extras(language: Language) -> (u32, &'static str, Value) {
    match language {
        Language::Nodejs => (
            3000,
            r#"["node", "dist/index.js"]"#,
            json!({"nodejsConfig": {"packageManager": "npm", "buildCommand": "npm run build", "buildOutput": "dist"}}),
        ),
        Language::Python => (
            8000,
            r#"["uvicorn", "main:app", "--host", "0.0.0.0", "--port", "8000"]"#,
            json!({"pythonConfig": {"packageManager": "pip", "framework": "fastapi", "appModule": "main:app"}}),
        ),
        Language::Go => (
            8080,
            r#"["/app/server"]"#,
            json!({"goConfig": {"mainPackage": "./cmd/server", "binaryName": "server"}}),
        ),
        Language::Java => (
            8080,
            r#"["java", "-jar", "app.jar"]"#,
            json!({"javaConfig": {"buildTool": "maven", "jvmOptions": "-XX:MaxRAMPercentage=75.0"}}),
        ),
        Language::Rust => (
            8080,
            r#"["/app/my-app"]"#,
            json!({"rustConfig": {"binaryName": "my-app"}}),
        ),
        Language::Dotnet => (
            8080,
            r#"["dotnet", "MyApp.dll"]"#,
            json!({"dotnetConfig": {"projectFile": "MyApp.csproj", "assemblyName": "MyApp"}}),
        ),
        Language::Php => (
            9000,
            r#"["php-fpm"]"#,
            json!({"phpConfig": {"framework": "laravel", "extensions": ["pdo_mysql", "opcache"]}}),
        ),
        Language::Ruby => (
            3000,
            r#"["bundle", "exec", "rails", "server", "-b", "0.0.0.0"]"#,
            json!({"rubyConfig": {"framework": "rails"}}),
        ),
    }
}

/// One example per language, keyed by language name
pub fn dockerfile_templates() -> BTreeMap<&'static str, Value> {
    Language::ALL
        .iter()
        .map(|&language| {
            let (port, start, extras) = dockerfile_extras(language);
            let mut template = json!({
                "language": language.as_str(),
                "projectName": "my-app",
                "baseImageType": "alpine",
                "multiStage": {"enabled": language.is_compiled() || language == Language::Nodejs},
                "port": port,
                "startCommand": start,
                "security": {"nonRootUser": true},
                "healthCheck": {"enabled": true, "path": "/health"},
                "generateDockerignore": true
            });
            if let (Some(base), Some(extras)) = (template.as_object_mut(), extras.as_object()) {
                for (key, value) in extras {
                    base.insert(key.clone(), value.clone());
                }
            }
            (language.as_str(), template)
        })
        .collect()
}

pub fn helm_templates() -> BTreeMap<&'static str, Value> {
    BTreeMap::from([
        (
            "basic",
            json!({
                "metadata": {
                    "name": "my-app",
                    "version": "0.1.0",
                    "appVersion": "1.0.0",
                    "description": "A basic web application chart"
                },
                "values": {
                    "replicaCount": 1,
                    "image": {"repository": "my-app", "tag": "1.0.0"},
                    "service": {"type": "ClusterIP", "port": 80, "targetPort": 8080}
                }
            }),
        ),
        (
            "production",
            json!({
                "metadata": {
                    "name": "my-app",
                    "version": "1.0.0",
                    "appVersion": "1.0.0",
                    "description": "Production web application chart",
                    "maintainers": [{"name": "Platform Team", "email": "platform@example.com"}]
                },
                "values": {
                    "replicaCount": 3,
                    "image": {"repository": "registry.example.com/my-app", "tag": "1.0.0", "pullPolicy": "IfNotPresent"},
                    "serviceAccount": {"create": true},
                    "securityContext": {
                        "runAsNonRoot": true,
                        "runAsUser": 1000,
                        "readOnlyRootFilesystem": true,
                        "allowPrivilegeEscalation": false
                    },
                    "ingress": {
                        "enabled": true,
                        "className": "nginx",
                        "hosts": [{"host": "app.example.com", "paths": [{"path": "/", "pathType": "Prefix"}]}],
                        "tls": [{"secretName": "app-tls", "hosts": ["app.example.com"]}]
                    },
                    "resources": {
                        "requests": {"cpu": "250m", "memory": "256Mi"},
                        "limits": {"cpu": "1", "memory": "1Gi"}
                    },
                    "autoscaling": {
                        "enabled": true,
                        "minReplicas": 3,
                        "maxReplicas": 10,
                        "targetCPUUtilizationPercentage": 70
                    }
                },
                "environments": [
                    {"name": "staging", "replicaCount": 2, "imageTag": "staging"},
                    {"name": "production", "replicaCount": 3, "ingressHosts": ["app.example.com"]}
                ],
                "options": {
                    "generateEnvironmentValues": true,
                    "includePodDisruptionBudget": true,
                    "includeNetworkPolicy": true
                }
            }),
        ),
        (
            "microservice",
            json!({
                "metadata": {
                    "name": "orders",
                    "version": "0.3.0",
                    "appVersion": "2.1.0",
                    "description": "Order service with metrics and configuration",
                    "maintainers": [{"name": "Orders Team"}]
                },
                "values": {
                    "image": {"repository": "registry.example.com/orders", "tag": "2.1.0"},
                    "service": {"port": 8080, "targetPort": 8080},
                    "resources": {
                        "requests": {"cpu": "100m", "memory": "128Mi"},
                        "limits": {"cpu": "500m", "memory": "256Mi"}
                    },
                    "env": {"LOG_LEVEL": "info"},
                    "configMaps": [{"name": "settings", "data": {"FEATURE_FLAGS": "checkout"}}]
                },
                "dependencies": [
                    {"name": "redis", "version": "18.x", "repository": "https://charts.bitnami.com/bitnami", "condition": "redis.enabled"}
                ],
                "options": {"includeServiceMonitor": true}
            }),
        ),
    ])
}

pub fn cicd_templates() -> BTreeMap<&'static str, Value> {
    BTreeMap::from([
        (
            "github-actions",
            json!({
                "platform": "github-actions",
                "projectName": "my-app",
                "language": "nodejs",
                "languageVersion": "20",
                "test": {"enabled": true, "coverage": true},
                "security": {"enabled": true},
                "registry": {
                    "type": "ghcr",
                    "repository": "my-org/my-app",
                    "tagStrategy": "commit-sha",
                    "usernameSecret": "GHCR_USERNAME",
                    "passwordSecret": "GHCR_TOKEN"
                },
                "deployment": {"enabled": true, "strategy": "helm", "namespace": "my-app"}
            }),
        ),
        (
            "gitlab-ci",
            json!({
                "platform": "gitlab-ci",
                "projectName": "my-app",
                "language": "python",
                "languageVersion": "3.11",
                "test": {"enabled": true},
                "security": {"enabled": true},
                "registry": {
                    "type": "custom",
                    "url": "registry.gitlab.com",
                    "repository": "my-group/my-app",
                    "usernameSecret": "CI_REGISTRY_USER",
                    "passwordSecret": "CI_REGISTRY_PASSWORD"
                },
                "deployment": {"enabled": true, "strategy": "kubectl", "namespace": "my-app"},
                "environments": [
                    {"name": "staging", "branch": "develop"},
                    {"name": "production", "requiresApproval": true}
                ]
            }),
        ),
        (
            "jenkins",
            json!({
                "platform": "jenkins",
                "projectName": "my-app",
                "language": "java",
                "languageVersion": "17",
                "build": {"command": "mvn -B package -DskipTests"},
                "test": {"enabled": true},
                "security": {"enabled": true},
                "registry": {
                    "type": "dockerhub",
                    "repository": "my-org/my-app",
                    "tagStrategy": "branch-name",
                    "usernameSecret": "dockerhub-username",
                    "passwordSecret": "dockerhub-token"
                },
                "deployment": {"enabled": true, "strategy": "gitops", "gitops": {"tool": "argocd"}},
                "notifications": {"email": {"recipients": ["team@example.com"]}}
            }),
        ),
    ])
}
