use serde_json::json;

use super::*;
use crate::validation::Severity;

fn request(extra: serde_json::Value) -> CicdRequest {
    let mut value = json!({
        "platform": "github-actions",
        "projectName": "web",
        "language": "nodejs",
        "registry": {"repository": "acme/web"}
    });
    if let (Some(base), Some(extra)) = (value.as_object_mut(), extra.as_object()) {
        for (k, v) in extra {
            base.insert(k.clone(), v.clone());
        }
    }
    serde_json::from_value(value).unwrap()
}

fn generate(extra: serde_json::Value) -> FileSet {
    CicdGenerator::new(&request(extra)).generate().unwrap()
}

fn parse(files: &FileSet, path: &str) -> serde_yaml::Value {
    serde_yaml::from_str(&files[path]).unwrap()
}

fn full_request(platform: &str) -> serde_json::Value {
    json!({
        "platform": platform,
        "build": {"command": "npm run build"},
        "security": {"enabled": true, "snyk": {"enabled": true}},
        "registry": {
            "type": "ghcr",
            "repository": "acme/web",
            "tagStrategy": "semantic",
            "usernameSecret": "GHCR_USER",
            "passwordSecret": "GHCR_TOKEN"
        },
        "deployment": {"enabled": true, "strategy": "helm", "helm": {"chartPath": "./chart"}},
        "environments": [
            {"name": "staging", "branch": "develop"},
            {"name": "production", "requiresApproval": true}
        ],
        "notifications": {
            "slack": {"channel": "#deploys", "onSuccess": true},
            "email": {"recipients": ["team@example.com"]}
        },
        "customStages": [
            {"name": "lint", "after": "build", "commands": ["npm run lint"]}
        ]
    })
}

#[test]
fn test_github_actions_without_deployment() {
    let files = generate(json!({
        "registry": {"repository": "x/y", "tagStrategy": "latest"},
        "deployment": {"enabled": false}
    }));
    let names: Vec<&str> = files.keys().map(String::as_str).collect();
    assert_eq!(names, vec![".github/workflows/ci-cd.yml", "README-CICD.md"]);

    let workflow = parse(&files, ".github/workflows/ci-cd.yml");
    let jobs = workflow["jobs"].as_mapping().unwrap();
    assert!(jobs.contains_key("build"));
    assert!(!jobs.contains_key("deploy"));
    assert!(!jobs.contains_key("security"));
    // tests run inside the build job
    assert!(!jobs.contains_key("test"));
    assert!(files[".github/workflows/ci-cd.yml"].contains("x/y:latest"));
}

#[test]
fn test_github_actions_security_and_deploy_gating() {
    let files = generate(json!({
        "security": {"enabled": true},
        "deployment": {"enabled": true}
    }));
    let workflow = parse(&files, ".github/workflows/ci-cd.yml");
    let jobs = &workflow["jobs"];
    assert_eq!(jobs["security"]["needs"][0], "build");
    let needs: Vec<&str> = jobs["deploy"]["needs"]
        .as_sequence()
        .unwrap()
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert_eq!(needs, vec!["build", "security"]);
    assert!(jobs["deploy"]["if"]
        .as_str()
        .unwrap()
        .contains("refs/heads/main"));

    let steps: Vec<&str> = jobs["build"]["steps"]
        .as_sequence()
        .unwrap()
        .iter()
        .filter_map(|s| s["name"].as_str())
        .collect();
    let tests_at = steps.iter().position(|s| *s == "Run tests").unwrap();
    let push_at = steps.iter().position(|s| *s == "Build and push image").unwrap();
    assert!(tests_at < push_at);
}

#[test]
fn test_every_platform_renders() {
    for platform in Platform::ALL {
        let files = generate(full_request(platform.as_str()));
        let (path, _) = platform_target(platform);
        assert_eq!(files.len(), 2, "{}", platform);
        assert!(files.contains_key("README-CICD.md"));
        let definition = &files[path];
        assert!(definition.contains("npm run lint"), "{}", platform);
        assert!(definition.contains("helm upgrade --install web ./chart"), "{}", platform);
        match platform {
            Platform::Jenkins => {
                assert!(definition.starts_with("pipeline {"));
                assert!(definition.contains("stage('Deploy to production')"));
                assert!(definition.contains("input message:"));
                assert!(definition.contains("mail to: 'team@example.com'"));
            }
            _ => {
                serde_yaml::from_str::<serde_yaml::Value>(definition).unwrap();
            }
        }
    }
}

#[test]
fn test_jenkins_build_stage_runs_in_toolchain_image() {
    let files = generate(json!({
        "platform": "jenkins",
        "languageVersion": "20",
        "build": {"command": "npm run build"}
    }));
    let jenkinsfile = &files["Jenkinsfile"];
    let build = &jenkinsfile[jenkinsfile.find("stage('Build')").unwrap()..];
    let build = &build[..build.find("stage('Test')").unwrap()];

    assert!(build.contains(
        r#"sh 'docker run --rm -v "$WORKSPACE":/workspace -w /workspace node:20 sh -c \'npm ci\''"#
    ));
    assert!(build.contains("node:20 sh -c \\'npm run build"));
    // docker commands stay on the host
    assert!(build.contains("sh 'docker build"));
    assert!(!build.contains("sh 'npm"));
}

#[test]
fn test_gitlab_deploy_is_manual() {
    let files = generate(json!({
        "platform": "gitlab-ci",
        "deployment": {"enabled": true}
    }));
    let config = parse(&files, ".gitlab-ci.yml");
    assert_eq!(config["deploy"]["stage"], "deploy");
    assert_eq!(config["deploy"]["when"], "manual");
    assert_eq!(config["deploy"]["only"][0], "main");
    let stages: Vec<&str> = config["stages"]
        .as_sequence()
        .unwrap()
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert_eq!(stages, vec!["build", "test", "deploy"]);
}

#[test]
fn test_flux_reconciles_kustomization() {
    let files = generate(json!({
        "platform": "gitlab-ci",
        "deployment": {"enabled": true, "strategy": "gitops", "gitops": {"tool": "flux"}}
    }));
    assert!(files[".gitlab-ci.yml"]
        .contains("flux reconcile kustomization web --with-source -n flux-system"));
}

#[test]
fn test_azure_stage_dependencies() {
    let files = generate(json!({
        "platform": "azure-devops",
        "deployment": {"enabled": true}
    }));
    let config = parse(&files, "azure-pipelines.yml");
    let stages = config["stages"].as_sequence().unwrap();
    assert_eq!(stages[0]["stage"], "Build");
    assert_eq!(stages[1]["dependsOn"][0], "Build");
    let deploy = &stages[2];
    assert_eq!(deploy["stage"], "Deploy");
    assert_eq!(deploy["dependsOn"][0], "Build");
    assert_eq!(deploy["dependsOn"][1], "Test");
    assert!(deploy["condition"].as_str().unwrap().contains("refs/heads/main"));
    assert_eq!(deploy["jobs"][0]["deployment"], "Deploy");
}

#[test]
fn test_circleci_approval_job() {
    let files = generate(full_request("circleci"));
    let config = parse(&files, ".circleci/config.yml");
    assert_eq!(config["orbs"]["docker"], "circleci/docker@2.6.0");
    let workflow = config["workflows"]["ci-cd"]["jobs"].as_sequence().unwrap();
    let hold = workflow
        .iter()
        .find_map(|entry| entry.get("hold-deploy-production"))
        .unwrap();
    assert_eq!(hold["type"], "approval");
    assert_eq!(hold["requires"][0], "deploy-staging");
    let deploy = workflow
        .iter()
        .find_map(|entry| entry.get("deploy-production"))
        .unwrap();
    assert_eq!(deploy["requires"][0], "hold-deploy-production");
}

#[test]
fn test_generation_is_deterministic() {
    for platform in Platform::ALL {
        let req = request(full_request(platform.as_str()));
        let generator = CicdGenerator::new(&req);
        assert_eq!(generator.generate().unwrap(), generator.generate().unwrap());
    }
}

#[test]
fn test_readme_lists_secrets_and_environments() {
    let files = generate(full_request("github-actions"));
    let readme = &files["README-CICD.md"];
    assert!(readme.starts_with("# web CI/CD\n"));
    assert!(readme.contains("`.github/workflows/ci-cd.yml`"));
    for secret in ["GHCR_USER", "GHCR_TOKEN", "KUBECONFIG", "SNYK_TOKEN", "SLACK_WEBHOOK_URL"] {
        assert!(readme.contains(&format!("| `{}` |", secret)), "{}", secret);
    }
    assert!(readme.contains("| production | main | default | required |"));
    assert!(readme.contains("ghcr.io/acme/web:latest"));
    assert!(readme.contains("team@example.com"));
}

#[test]
fn test_validation_defaults() {
    let result = CicdGenerator::new(&request(json!({}))).validate();
    assert!(!result.valid);
    let fields: Vec<&str> = result
        .warnings
        .iter()
        .filter_map(|w| w.field.as_deref())
        .collect();
    assert!(fields.contains(&"security.enabled"));
    assert!(fields.contains(&"registry"));
    assert_eq!(result.count(Severity::High), 1);
    assert_eq!(result.suggestions.len(), 3);
}

#[test]
fn test_validation_flags_risky_pipelines() {
    let req = request(json!({
        "test": {"enabled": false},
        "registry": {"type": "ecr", "repository": "web", "tagStrategy": "latest"},
        "deployment": {"enabled": true, "strategy": "kubectl", "kubectl": {"manifests": []}},
        "environments": [{"name": "Production"}]
    }));
    let result = CicdGenerator::new(&req).validate();
    assert!(!result.valid);
    let field = |name: &str| {
        result
            .warnings
            .iter()
            .find(|w| w.field.as_deref() == Some(name))
            .map(|w| w.severity)
    };
    assert_eq!(field("test.enabled"), Some(Severity::High));
    assert_eq!(field("registry.tagStrategy"), Some(Severity::Medium));
    assert_eq!(field("registry.url"), Some(Severity::Medium));
    assert_eq!(field("environments[0].requiresApproval"), Some(Severity::Medium));
    assert_eq!(field("deployment.kubectl.manifests"), Some(Severity::High));
    assert!(result
        .suggestions
        .iter()
        .any(|s| s.contains("kubectl rollout undo deployment/web")));
}

#[test]
fn test_validation_passes_for_complete_pipeline() {
    let req = request(json!({
        "security": {"enabled": true},
        "registry": {
            "repository": "acme/web",
            "usernameSecret": "DOCKER_USER",
            "passwordSecret": "DOCKER_TOKEN"
        },
        "deployment": {"enabled": true, "strategy": "helm"}
    }));
    let result = CicdGenerator::new(&req).validate();
    assert!(result.valid);
    assert!(result.warnings.is_empty());
    assert!(result.suggestions.iter().any(|s| s.contains("helm rollback web")));
}
