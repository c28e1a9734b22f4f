//! Values shared by every platform renderer: image names and tags, toolchain
//! commands and deployment commands.

use crate::dockerfile::default_version;
use crate::schema::cicd::{
    CicdRequest, DeploymentStrategy, GitOpsTool, RegistryConfig, RegistryType, TagStrategy,
};
use crate::schema::Language;

/// Platform expressions for the values image tags are derived from
#[derive(Debug, Clone, Copy)]
pub struct CiVars<'a> {
    pub commit_sha: &'a str,
    pub branch: &'a str,
    pub tag: &'a str,
}

pub const DEFAULT_USERNAME_SECRET: &str = "REGISTRY_USERNAME";
pub const DEFAULT_PASSWORD_SECRET: &str = "REGISTRY_PASSWORD";

/// Registry hostname, from `url` when given
pub fn registry_host(registry: &RegistryConfig) -> String {
    if let Some(url) = registry.url.as_deref().filter(|u| !u.is_empty()) {
        let host = url
            .trim_start_matches("https://")
            .trim_start_matches("http://");
        return host.trim_end_matches('/').to_string();
    }
    match registry.registry_type {
        RegistryType::Dockerhub => "docker.io",
        RegistryType::Ghcr => "ghcr.io",
        RegistryType::Ecr => "<aws-account-id>.dkr.ecr.<region>.amazonaws.com",
        RegistryType::Gcr => "gcr.io",
        RegistryType::Acr => "<registry-name>.azurecr.io",
        RegistryType::Custom => "registry.example.com",
    }
    .to_string()
}

/// Image reference without a tag. Docker Hub images stay unqualified.
pub fn image_name(registry: &RegistryConfig) -> String {
    let host = registry_host(registry);
    let repository = &registry.repository;
    if (registry.registry_type == RegistryType::Dockerhub && registry.url.is_none())
        || repository.starts_with(&format!("{}/", host))
    {
        repository.clone()
    } else {
        format!("{}/{}", host, repository)
    }
}

/// Tag names for the configured strategy, primary first, without duplicates
fn tag_names<'a>(registry: &'a RegistryConfig, vars: &CiVars<'a>) -> Vec<&'a str> {
    let primary: Vec<&str> = match registry.tag_strategy {
        TagStrategy::CommitSha => vec![vars.commit_sha],
        TagStrategy::BranchName => vec![vars.branch],
        TagStrategy::Tag => vec![vars.tag],
        TagStrategy::Semantic => vec![vars.tag, "latest"],
        TagStrategy::Latest => vec!["latest"],
    };

    let mut names: Vec<&str> = Vec::new();
    for tag in primary
        .into_iter()
        .chain(registry.additional_tags.iter().map(String::as_str))
    {
        if !names.contains(&tag) {
            names.push(tag);
        }
    }
    names
}

/// `repository:tag` references for the configured strategy, primary tag first
pub fn image_tags(registry: &RegistryConfig, vars: &CiVars<'_>) -> Vec<String> {
    tag_names(registry, vars)
        .into_iter()
        .map(|tag| format!("{}:{}", registry.repository, tag))
        .collect()
}

/// The same tags qualified with the registry host, as pushed and deployed
pub fn pushed_tags(registry: &RegistryConfig, vars: &CiVars<'_>) -> Vec<String> {
    let image = image_name(registry);
    tag_names(registry, vars)
        .into_iter()
        .map(|tag| format!("{}:{}", image, tag))
        .collect()
}

/// Secret names holding registry credentials, defaulted when not configured
pub fn registry_secrets(registry: &RegistryConfig) -> (String, String) {
    (
        registry
            .username_secret
            .clone()
            .unwrap_or_else(|| DEFAULT_USERNAME_SECRET.to_string()),
        registry
            .password_secret
            .clone()
            .unwrap_or_else(|| DEFAULT_PASSWORD_SECRET.to_string()),
    )
}

pub fn language_version(req: &CicdRequest) -> String {
    req.language_version
        .clone()
        .unwrap_or_else(|| default_version(req.language).to_string())
}

/// Container image carrying the language toolchain
pub fn toolchain_image(language: Language, version: &str) -> String {
    match language {
        Language::Nodejs => format!("node:{}", version),
        Language::Python => format!("python:{}", version),
        Language::Go => format!("golang:{}", version),
        Language::Java => format!("maven:3.9-eclipse-temurin-{}", version),
        Language::Rust => format!("rust:{}", version),
        Language::Dotnet => format!("mcr.microsoft.com/dotnet/sdk:{}", version),
        Language::Php => format!("php:{}-cli", version),
        Language::Ruby => format!("ruby:{}", version),
    }
}

pub fn install_command(language: Language) -> &'static str {
    match language {
        Language::Nodejs => "npm ci",
        Language::Python => "pip install -r requirements.txt",
        Language::Go => "go mod download",
        Language::Java => "mvn -B dependency:go-offline",
        Language::Rust => "cargo fetch",
        Language::Dotnet => "dotnet restore",
        Language::Php => "composer install --no-interaction --prefer-dist",
        Language::Ruby => "bundle install",
    }
}

fn default_test_command(language: Language, coverage: bool) -> &'static str {
    match (language, coverage) {
        (Language::Nodejs, false) => "npm test",
        (Language::Nodejs, true) => "npm test -- --coverage",
        (Language::Python, false) => "pytest",
        (Language::Python, true) => "pytest --cov --cov-report=xml",
        (Language::Go, false) => "go test ./...",
        (Language::Go, true) => "go test -coverprofile=coverage.out ./...",
        (Language::Java, false) => "mvn test",
        (Language::Java, true) => "mvn verify",
        (Language::Rust, false) => "cargo test",
        (Language::Rust, true) => "cargo llvm-cov --lcov --output-path lcov.info",
        (Language::Dotnet, false) => "dotnet test",
        (Language::Dotnet, true) => "dotnet test --collect:\"XPlat Code Coverage\"",
        (Language::Php, false) => "vendor/bin/phpunit",
        (Language::Php, true) => "vendor/bin/phpunit --coverage-clover coverage.xml",
        (Language::Ruby, false) => "bundle exec rspec",
        (Language::Ruby, true) => "COVERAGE=true bundle exec rspec",
    }
}

/// Unit test command (configured or per-language default), then integration tests
pub fn test_commands(req: &CicdRequest) -> Vec<String> {
    let test = &req.test;
    let mut commands = vec![test
        .unit_test_command
        .clone()
        .unwrap_or_else(|| default_test_command(req.language, test.coverage).to_string())];
    if let Some(integration) = &test.integration_test_command {
        commands.push(integration.clone());
    }
    commands
}

/// Dependency cache directories and the lockfile keying them
pub fn cache_paths(language: Language) -> (&'static [&'static str], &'static str) {
    match language {
        Language::Nodejs => (&[".npm"], "package-lock.json"),
        Language::Python => (&[".cache/pip"], "requirements.txt"),
        Language::Go => (&[".cache/go-build", "go/pkg/mod"], "go.sum"),
        Language::Java => (&[".m2/repository"], "pom.xml"),
        Language::Rust => (&[".cargo/registry", "target"], "Cargo.lock"),
        Language::Dotnet => (&[".nuget/packages"], "packages.lock.json"),
        Language::Php => (&["vendor"], "composer.lock"),
        Language::Ruby => (&["vendor/bundle"], "Gemfile.lock"),
    }
}

/// Environment pointing package caches at the `cache_paths` directories under `root`
pub fn cache_env(language: Language, root: &str) -> Vec<(&'static str, String)> {
    match language {
        Language::Nodejs => vec![("npm_config_cache", format!("{}/.npm", root))],
        Language::Python => vec![("PIP_CACHE_DIR", format!("{}/.cache/pip", root))],
        Language::Go => vec![
            ("GOPATH", format!("{}/go", root)),
            ("GOCACHE", format!("{}/.cache/go-build", root)),
        ],
        Language::Java => vec![(
            "MAVEN_OPTS",
            format!("-Dmaven.repo.local={}/.m2/repository", root),
        )],
        Language::Rust => vec![("CARGO_HOME", format!("{}/.cargo", root))],
        Language::Dotnet => vec![("NUGET_PACKAGES", format!("{}/.nuget/packages", root))],
        Language::Php => vec![],
        Language::Ruby => vec![("BUNDLE_PATH", "vendor/bundle".to_string())],
    }
}

/// ArgoCD application or Flux kustomization name
pub fn gitops_app(req: &CicdRequest) -> String {
    req.deployment
        .gitops
        .app_name
        .clone()
        .unwrap_or_else(|| req.project_name.clone())
}

pub fn helm_release(req: &CicdRequest) -> String {
    req.deployment
        .helm
        .release_name
        .clone()
        .unwrap_or_else(|| req.project_name.clone())
}

/// Commands that roll `image` (a full `image:tag` reference) out to `namespace`
pub fn deployment_commands(req: &CicdRequest, namespace: &str, image: &str) -> Vec<String> {
    let deployment = &req.deployment;
    let project = &req.project_name;
    match deployment.strategy {
        DeploymentStrategy::Kubectl => {
            let mut commands: Vec<String> = deployment
                .kubectl
                .manifests
                .iter()
                .map(|m| format!("kubectl apply -f {} -n {}", m, namespace))
                .collect();
            commands.push(format!(
                "kubectl set image deployment/{0} {0}={1} -n {2}",
                project, image, namespace
            ));
            commands.push(format!(
                "kubectl rollout status deployment/{} -n {} --timeout=300s",
                project, namespace
            ));
            commands
        }
        DeploymentStrategy::Helm => {
            let helm = &deployment.helm;
            let (repository, tag) = image.rsplit_once(':').unwrap_or((image, "latest"));
            let mut command = format!(
                "helm upgrade --install {} {} --namespace {} --create-namespace --set image.repository={} --set image.tag={}",
                helm_release(req),
                helm.chart_path,
                namespace,
                repository,
                tag
            );
            if let Some(values) = &helm.values_file {
                command.push_str(&format!(" -f {}", values));
            }
            command.push_str(" --wait");
            vec![command]
        }
        DeploymentStrategy::Kustomize => vec![format!(
            "kubectl apply -k {} -n {}",
            deployment.kustomize.path, namespace
        )],
        DeploymentStrategy::Gitops => {
            let app = gitops_app(req);
            match deployment.gitops.tool {
                GitOpsTool::Argocd => vec![
                    format!("argocd app sync {}", app),
                    format!("argocd app wait {} --health --timeout 300", app),
                ],
                GitOpsTool::Flux => vec![format!(
                    "flux reconcile kustomization {} --with-source -n flux-system",
                    app
                )],
            }
        }
    }
}

/// Run `commands` inside `image`, mounting `dir` as the working directory
pub fn in_container(image: &str, commands: &[String], dir: &str) -> String {
    let script = commands.join(" && ").replace('\'', r"'\''");
    format!(
        "docker run --rm -v \"{}\":/workspace -w /workspace {} sh -c '{}'",
        dir, image, script
    )
}

/// Slack incoming-webhook call posting `text`; reads the URL from `$SLACK_WEBHOOK_URL`.
/// The payload is double-quoted so CI variables in `text` expand.
pub fn slack_command(text: &str, channel: Option<&str>) -> String {
    let payload = match channel {
        Some(channel) => format!(r#"{{"channel":"{}","text":"{}"}}"#, channel, text),
        None => format!(r#"{{"text":"{}"}}"#, text),
    };
    format!(
        "curl -sS -X POST -H 'Content-type: application/json' --data \"{}\" \"$SLACK_WEBHOOK_URL\"",
        payload.replace('"', "\\\"")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    const VARS: CiVars<'static> = CiVars {
        commit_sha: "$SHA",
        branch: "$BRANCH",
        tag: "$TAG",
    };

    fn registry(value: serde_json::Value) -> RegistryConfig {
        serde_json::from_value(value).unwrap()
    }

    fn request(value: serde_json::Value) -> CicdRequest {
        let mut base = json!({
            "platform": "gitlab-ci",
            "projectName": "web",
            "language": "go",
            "registry": {"repository": "acme/web"}
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), value.as_object()) {
            for (k, v) in extra {
                base.insert(k.clone(), v.clone());
            }
        }
        serde_json::from_value(base).unwrap()
    }

    #[test]
    fn test_registry_hosts() {
        assert_eq!(registry_host(&registry(json!({"repository": "a/b"}))), "docker.io");
        assert_eq!(
            registry_host(&registry(json!({"type": "ghcr", "repository": "a/b"}))),
            "ghcr.io"
        );
        assert_eq!(
            registry_host(&registry(json!({"type": "custom", "url": "https://harbor.internal/", "repository": "a/b"}))),
            "harbor.internal"
        );
    }

    #[test]
    fn test_image_name_qualification() {
        assert_eq!(image_name(&registry(json!({"repository": "acme/web"}))), "acme/web");
        assert_eq!(
            image_name(&registry(json!({"type": "ghcr", "repository": "acme/web"}))),
            "ghcr.io/acme/web"
        );
        assert_eq!(
            image_name(&registry(json!({"type": "gcr", "repository": "gcr.io/proj/web"}))),
            "gcr.io/proj/web"
        );
    }

    #[test]
    fn test_semantic_tags_and_additional_tags() {
        let tags = image_tags(
            &registry(json!({
                "repository": "acme/web",
                "tagStrategy": "semantic",
                "additionalTags": ["stable", "latest"]
            })),
            &VARS,
        );
        assert_eq!(tags, vec!["acme/web:$TAG", "acme/web:latest", "acme/web:stable"]);
    }

    #[test]
    fn test_tags_keep_repository_prefix_on_hosted_registries() {
        let ghcr = registry(json!({"type": "ghcr", "repository": "x/y"}));
        let vars = CiVars { commit_sha: "abc1234", branch: "main", tag: "v1" };
        assert_eq!(image_tags(&ghcr, &vars), vec!["x/y:abc1234"]);
        assert_eq!(pushed_tags(&ghcr, &vars), vec!["ghcr.io/x/y:abc1234"]);

        let hub = registry(json!({"repository": "x/y"}));
        assert_eq!(pushed_tags(&hub, &vars), image_tags(&hub, &vars));
    }

    #[test]
    fn test_default_and_configured_test_commands() {
        assert_eq!(test_commands(&request(json!({}))), vec!["go test ./..."]);
        let req = request(json!({
            "test": {"unitTestCommand": "make test", "integrationTestCommand": "make it"}
        }));
        assert_eq!(test_commands(&req), vec!["make test", "make it"]);
        let req = request(json!({"language": "python", "test": {"coverage": true}}));
        assert_eq!(test_commands(&req), vec!["pytest --cov --cov-report=xml"]);
    }

    #[test]
    fn test_kubectl_deployment_commands() {
        let req = request(json!({
            "deployment": {"enabled": true, "kubectl": {"manifests": ["k8s/deploy.yaml", "k8s/svc.yaml"]}}
        }));
        let commands = deployment_commands(&req, "shop", "acme/web:abc");
        assert_eq!(commands[0], "kubectl apply -f k8s/deploy.yaml -n shop");
        assert_eq!(commands[1], "kubectl apply -f k8s/svc.yaml -n shop");
        assert_eq!(commands[2], "kubectl set image deployment/web web=acme/web:abc -n shop");
        assert!(commands[3].starts_with("kubectl rollout status deployment/web -n shop"));
    }

    #[test]
    fn test_helm_and_kustomize_commands() {
        let req = request(json!({
            "deployment": {"enabled": true, "strategy": "helm", "helm": {"releaseName": "shop", "valuesFile": "values-prod.yaml"}}
        }));
        assert_eq!(
            deployment_commands(&req, "prod", "ghcr.io/acme/web:1.0.0"),
            vec!["helm upgrade --install shop ./chart --namespace prod --create-namespace --set image.repository=ghcr.io/acme/web --set image.tag=1.0.0 -f values-prod.yaml --wait"]
        );

        let req = request(json!({"deployment": {"enabled": true, "strategy": "kustomize"}}));
        assert_eq!(deployment_commands(&req, "dev", "x:1"), vec!["kubectl apply -k . -n dev"]);
    }

    #[test]
    fn test_gitops_commands() {
        let argo = request(json!({"deployment": {"enabled": true, "strategy": "gitops"}}));
        let commands = deployment_commands(&argo, "default", "x:1");
        assert_eq!(commands[0], "argocd app sync web");
        assert_eq!(commands[1], "argocd app wait web --health --timeout 300");

        let flux = request(json!({
            "deployment": {"enabled": true, "strategy": "gitops", "gitops": {"tool": "flux", "appName": "web-prod"}}
        }));
        assert_eq!(
            deployment_commands(&flux, "default", "x:1"),
            vec!["flux reconcile kustomization web-prod --with-source -n flux-system"]
        );
    }

    #[test]
    fn test_slack_command_payload() {
        let command = slack_command("web pipeline failed", Some("#deploys"));
        assert!(command.contains(r##"--data "{\"channel\":\"#deploys\",\"text\":\"web pipeline failed\"}""##));
        assert!(command.ends_with("\"$SLACK_WEBHOOK_URL\""));
    }

    #[test]
    fn test_in_container_quotes_script() {
        let commands = vec!["npm ci".to_string(), "echo 'done'".to_string()];
        assert_eq!(
            in_container("node:20", &commands, "$PWD"),
            r#"docker run --rm -v "$PWD":/workspace -w /workspace node:20 sh -c 'npm ci && echo '\''done'\'''"#
        );
    }

    proptest! {
        #[test]
        fn prop_primary_tag_prefixed_by_repository(
            registry_type in prop::sample::select(RegistryType::ALL.to_vec()),
            strategy in prop::sample::select(TagStrategy::ALL.to_vec()),
            repository in "[a-z]{1,8}/[a-z]{1,8}",
            sha in "[0-9a-f]{7,40}",
        ) {
            let mut config = registry(json!({"repository": repository}));
            config.registry_type = registry_type;
            config.tag_strategy = strategy;
            let vars = CiVars { commit_sha: &sha, branch: "main", tag: "v1.0.0" };
            let first = image_tags(&config, &vars);
            let second = image_tags(&config, &vars);
            prop_assert!(!first.is_empty());
            let repo_prefix = format!("{}:", config.repository);
            prop_assert!(first[0].starts_with(&repo_prefix));
            prop_assert_eq!(&first, &second);

            let pushed = pushed_tags(&config, &vars);
            prop_assert_eq!(pushed.len(), first.len());
            for (pushed, tag) in pushed.iter().zip(&first) {
                prop_assert!(pushed.ends_with(tag.as_str()));
            }
        }
    }
}
