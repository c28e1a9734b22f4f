//! Platform-neutral pipeline model
//!
//! Every renderer consumes the same `Pipeline`, so job ordering, dependency
//! edges, commands and image tags are derived once per request.

use std::collections::BTreeMap;

use crate::schema::cicd::{
    CicdRequest, CustomStage, DeploymentStrategy, GitOpsTool, StageAnchor, Triggers,
};
use crate::schema::Language;

use super::helpers::{self, CiVars};

/// A CI secret exposed to a step as an environment variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRef {
    /// Variable name the command reads
    pub var: String,
    /// Name of the secret in the CI system
    pub secret: String,
    pub purpose: &'static str,
}

impl SecretRef {
    pub fn new(var: impl Into<String>, secret: impl Into<String>, purpose: &'static str) -> Self {
        Self {
            var: var.into(),
            secret: secret.into(),
            purpose,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuild {
    pub dockerfile: String,
    pub context: String,
    pub tags: Vec<String>,
    pub build_args: BTreeMap<String, String>,
    pub platforms: Vec<String>,
    pub cache: bool,
}

impl ImageBuild {
    /// Plain docker CLI commands for runners without a native build step
    pub fn commands(&self) -> Vec<String> {
        let mut args = Vec::new();
        for tag in &self.tags {
            args.push(format!("-t {}", tag));
        }
        for (key, value) in &self.build_args {
            args.push(format!("--build-arg {}={}", key, value));
        }
        if self.platforms.is_empty() {
            let mut build = format!("docker build -f {}", self.dockerfile);
            if self.cache {
                if let Some(first) = self.tags.first() {
                    build.push_str(&format!(" --cache-from {}", first));
                }
            }
            build.push(' ');
            build.push_str(&args.join(" "));
            build.push(' ');
            build.push_str(&self.context);
            let mut commands = vec![build];
            commands.extend(self.tags.iter().map(|t| format!("docker push {}", t)));
            commands
        } else {
            vec![format!(
                "docker buildx build --platform {} -f {} {} --push {}",
                self.platforms.join(","),
                self.dockerfile,
                args.join(" "),
                self.context
            )]
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageScan {
    pub image: String,
    pub severity: String,
    pub ignore_unfixed: bool,
    pub fail_on_findings: bool,
}

impl ImageScan {
    pub fn exit_code(&self) -> u8 {
        u8::from(self.fail_on_findings)
    }

    /// Trivy CLI invocation
    pub fn command(&self) -> String {
        let mut command = format!(
            "trivy image --no-progress --exit-code {} --severity {}",
            self.exit_code(),
            self.severity
        );
        if self.ignore_unfixed {
            command.push_str(" --ignore-unfixed");
        }
        command.push(' ');
        command.push_str(&self.image);
        command
    }

    /// Trivy through its container image against the host docker daemon
    pub fn docker_command(&self) -> String {
        format!(
            "docker run --rm -v /var/run/docker.sock:/var/run/docker.sock {} {}",
            TRIVY_IMAGE,
            self.command().trim_start_matches("trivy ")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Checkout,
    /// Install the language toolchain; `image` is its container equivalent
    Toolchain {
        language: Language,
        version: String,
        image: String,
        cache: bool,
    },
    Run {
        name: String,
        commands: Vec<String>,
        secrets: Vec<SecretRef>,
    },
    /// Prepare the docker builder
    DockerSetup,
    RegistryLogin {
        host: String,
        username: SecretRef,
        password: SecretRef,
    },
    BuildPush(ImageBuild),
    ImageScan(ImageScan),
}

impl Step {
    pub fn run(name: impl Into<String>, commands: Vec<String>) -> Self {
        Step::Run {
            name: name.into(),
            commands,
            secrets: Vec::new(),
        }
    }

    fn needs_toolchain(&self) -> bool {
        matches!(self, Step::Toolchain { .. })
    }

    fn is_image_step(&self) -> bool {
        matches!(
            self,
            Step::DockerSetup | Step::RegistryLogin { .. } | Step::BuildPush(_)
        )
    }
}

/// Command line tool a deploy job drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployCli {
    Kubectl,
    Helm,
    Argocd,
    Flux,
}

impl DeployCli {
    pub fn for_request(req: &CicdRequest) -> Self {
        match req.deployment.strategy {
            DeploymentStrategy::Kubectl | DeploymentStrategy::Kustomize => DeployCli::Kubectl,
            DeploymentStrategy::Helm => DeployCli::Helm,
            DeploymentStrategy::Gitops => match req.deployment.gitops.tool {
                GitOpsTool::Argocd => DeployCli::Argocd,
                GitOpsTool::Flux => DeployCli::Flux,
            },
        }
    }

    pub fn image(&self) -> &'static str {
        match self {
            DeployCli::Kubectl => "bitnami/kubectl:1.29",
            DeployCli::Helm => "alpine/helm:3.14.4",
            DeployCli::Argocd => "quay.io/argoproj/argocd:v2.10.7",
            DeployCli::Flux => "ghcr.io/fluxcd/flux-cli:v2.2.3",
        }
    }
}

/// Container a job runs in; `None` on a job means a docker-capable host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub image: String,
    /// The image's entrypoint is a CLI and must be cleared to run scripts
    pub clear_entrypoint: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEnvironment {
    pub name: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: String,
    pub name: String,
    pub stage: String,
    pub container: Option<Container>,
    pub needs: Vec<String>,
    pub steps: Vec<Step>,
    /// Only run for pushes to this branch
    pub branch: Option<String>,
    /// Wait for manual approval before running
    pub manual: bool,
    pub environment: Option<JobEnvironment>,
    pub cli: Option<DeployCli>,
}

impl Job {
    fn new(id: &str, name: &str, stage: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            stage: stage.to_string(),
            container: None,
            needs: Vec::new(),
            steps: Vec::new(),
            branch: None,
            manual: false,
            environment: None,
            cli: None,
        }
    }

    /// Toolchain image for steps that need one on a host job
    pub fn toolchain_image(&self) -> Option<&str> {
        self.steps.iter().find_map(|s| match s {
            Step::Toolchain { image, .. } => Some(image.as_str()),
            _ => None,
        })
    }

    pub fn is_deploy(&self) -> bool {
        self.stage == DEPLOY_STAGE
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlackNotify {
    pub webhook: SecretRef,
    pub channel: Option<String>,
    pub on_success: bool,
    pub on_failure: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notify {
    pub slack: Option<SlackNotify>,
    pub email: Vec<String>,
}

impl Notify {
    pub fn is_empty(&self) -> bool {
        self.slack.is_none() && self.email.is_empty()
    }
}

pub const TRIVY_IMAGE: &str = "aquasec/trivy:0.50.1";
pub const INSTALL_STEP: &str = "Install dependencies";

pub const BUILD_STAGE: &str = "build";
pub const TEST_STAGE: &str = "test";
pub const SECURITY_STAGE: &str = "security";
pub const DEPLOY_STAGE: &str = "deploy";

#[derive(Debug, Clone)]
pub struct Pipeline {
    pub project: String,
    pub language: Language,
    pub language_version: String,
    pub triggers: Triggers,
    pub image: String,
    pub registry: String,
    pub tags: Vec<String>,
    pub jobs: Vec<Job>,
    pub notify: Notify,
    pub timeout_minutes: u32,
    pub cache: bool,
}

impl Pipeline {
    pub fn build(req: &CicdRequest, vars: &CiVars<'_>) -> Self {
        let language_version = helpers::language_version(req);
        let toolchain = Step::Toolchain {
            language: req.language,
            version: language_version.clone(),
            image: helpers::toolchain_image(req.language, &language_version),
            cache: req.options.cache_dependencies,
        };
        let install = Step::run(
            INSTALL_STEP,
            vec![helpers::install_command(req.language).to_string()],
        );
        let tags = helpers::pushed_tags(&req.registry, vars);
        let primary = tags.first().cloned().unwrap_or_default();
        let host = helpers::registry_host(&req.registry);
        let (username, password) = helpers::registry_secrets(&req.registry);
        let login = Step::RegistryLogin {
            host: host.clone(),
            username: SecretRef::new("REGISTRY_USERNAME", username, "Container registry user name"),
            password: SecretRef::new("REGISTRY_PASSWORD", password, "Container registry password or token"),
        };

        // (anchor, job) in pipeline order
        let mut jobs: Vec<(StageAnchor, Job)> = Vec::new();

        let mut build = Job::new("build", "Build", BUILD_STAGE);
        build.steps.push(Step::Checkout);
        if let Some(command) = &req.build.command {
            build.steps.push(toolchain.clone());
            build.steps.push(install.clone());
            build.steps.push(Step::run("Build application", vec![command.clone()]));
        }
        if req.build.enabled {
            build.steps.push(Step::DockerSetup);
            build.steps.push(login.clone());
            build.steps.push(Step::BuildPush(ImageBuild {
                dockerfile: req.build.dockerfile.clone(),
                context: req.build.context.clone(),
                tags: tags.clone(),
                build_args: req.build.build_args.clone(),
                platforms: req.build.platforms.clone(),
                cache: req.build.cache,
            }));
        }
        jobs.push((StageAnchor::Build, build));

        if req.test.enabled {
            let mut test = Job::new("test", "Test", TEST_STAGE);
            test.container = Some(Container {
                image: helpers::toolchain_image(req.language, &language_version),
                clear_entrypoint: false,
            });
            test.needs = vec!["build".to_string()];
            test.steps = vec![
                Step::Checkout,
                toolchain.clone(),
                install.clone(),
                Step::run("Run tests", helpers::test_commands(req)),
            ];
            jobs.push((StageAnchor::Test, test));
        }

        let security = &req.security;
        if security.enabled {
            if security.trivy.enabled {
                let mut scan = Job::new("security", "Security Scan", SECURITY_STAGE);
                scan.needs = vec!["build".to_string()];
                scan.steps = vec![
                    login.clone(),
                    Step::ImageScan(ImageScan {
                        image: primary.clone(),
                        severity: security.trivy.severity.clone(),
                        ignore_unfixed: security.trivy.ignore_unfixed,
                        fail_on_findings: security.trivy.fail_on_findings,
                    }),
                ];
                jobs.push((StageAnchor::Security, scan));
            }
            if let Some(snyk) = security.snyk.as_ref().filter(|s| s.enabled) {
                let mut job = Job::new("snyk", "Snyk", SECURITY_STAGE);
                job.container = Some(Container {
                    image: "snyk/snyk:linux".to_string(),
                    clear_entrypoint: true,
                });
                job.needs = vec!["build".to_string()];
                job.steps = vec![
                    Step::Checkout,
                    Step::Run {
                        name: "Snyk dependency scan".to_string(),
                        commands: vec!["snyk test --severity-threshold=high".to_string()],
                        secrets: vec![SecretRef::new("SNYK_TOKEN", &snyk.token_secret, "Snyk API token")],
                    },
                ];
                jobs.push((StageAnchor::Security, job));
            }
            if let Some(sonar) = security.sonarqube.as_ref().filter(|s| s.enabled) {
                let mut job = Job::new("sonarqube", "SonarQube", SECURITY_STAGE);
                job.container = Some(Container {
                    image: "sonarsource/sonar-scanner-cli:5".to_string(),
                    clear_entrypoint: true,
                });
                job.needs = vec!["build".to_string()];
                job.steps = vec![
                    Step::Checkout,
                    Step::Run {
                        name: "SonarQube analysis".to_string(),
                        commands: vec![format!(
                            "sonar-scanner -Dsonar.projectKey={} -Dsonar.host.url={}",
                            sonar.project_key, sonar.host_url
                        )],
                        secrets: vec![SecretRef::new("SONAR_TOKEN", &sonar.token_secret, "SonarQube token")],
                    },
                ];
                jobs.push((StageAnchor::Security, job));
            }
        }

        for stage in req.custom_stages.iter().filter(|s| s.after != StageAnchor::Deploy) {
            place_custom_stage(&mut jobs, stage);
        }

        if req.deployment.enabled {
            let pre_deploy: Vec<String> = jobs.iter().map(|(_, j)| j.id.clone()).collect();
            let targets: Vec<(String, Option<JobEnvironment>, String, bool)> = if req.environments.is_empty() {
                vec![(
                    "main".to_string(),
                    None,
                    req.deployment.namespace.clone(),
                    false,
                )]
            } else {
                req.environments
                    .iter()
                    .map(|env| {
                        (
                            env.branch.clone().unwrap_or_else(|| "main".to_string()),
                            Some(JobEnvironment {
                                name: env.name.clone(),
                                url: env.url.clone(),
                            }),
                            env.namespace
                                .clone()
                                .unwrap_or_else(|| req.deployment.namespace.clone()),
                            env.requires_approval,
                        )
                    })
                    .collect()
            };

            let mut previous: Option<String> = None;
            for (branch, environment, namespace, manual) in targets {
                let (id, name) = match &environment {
                    Some(env) => (format!("deploy-{}", env.name), format!("Deploy to {}", env.name)),
                    None => ("deploy".to_string(), "Deploy".to_string()),
                };
                let cli = DeployCli::for_request(req);
                let mut job = Job::new(&id, &name, DEPLOY_STAGE);
                job.container = Some(Container {
                    image: cli.image().to_string(),
                    clear_entrypoint: true,
                });
                job.cli = Some(cli);
                job.needs = match &previous {
                    Some(prev) => vec![prev.clone()],
                    None => pre_deploy.clone(),
                };
                job.branch = Some(branch);
                job.manual = manual;
                job.environment = environment;
                job.steps = deploy_steps(req, &namespace, &primary);
                previous = Some(id);
                jobs.push((StageAnchor::Deploy, job));
            }
        }

        for stage in req.custom_stages.iter().filter(|s| s.after == StageAnchor::Deploy) {
            place_custom_stage(&mut jobs, stage);
        }

        let notify = Notify {
            slack: req.notifications.slack.as_ref().map(|slack| SlackNotify {
                webhook: SecretRef::new("SLACK_WEBHOOK_URL", &slack.webhook_secret, "Slack incoming webhook URL"),
                channel: slack.channel.clone(),
                on_success: slack.on_success,
                on_failure: slack.on_failure,
            }),
            email: req
                .notifications
                .email
                .as_ref()
                .map(|e| e.recipients.clone())
                .unwrap_or_default(),
        };

        Pipeline {
            project: req.project_name.clone(),
            language: req.language,
            language_version,
            triggers: req.triggers.clone(),
            image: helpers::image_name(&req.registry),
            registry: host,
            tags,
            jobs: jobs.into_iter().map(|(_, job)| job).collect(),
            notify,
            timeout_minutes: req.options.timeout_minutes,
            cache: req.options.cache_dependencies,
        }
    }

    pub fn job(&self, id: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    /// Stage names in first-use order
    pub fn stages(&self) -> Vec<String> {
        let mut stages: Vec<String> = Vec::new();
        for job in &self.jobs {
            if !stages.contains(&job.stage) {
                stages.push(job.stage.clone());
            }
        }
        stages
    }

    /// Every secret a step reads, keyed by secret name
    pub fn secrets(&self) -> BTreeMap<String, &'static str> {
        let mut secrets = BTreeMap::new();
        let mut add = |s: &SecretRef| {
            secrets.entry(s.secret.clone()).or_insert(s.purpose);
        };
        for job in &self.jobs {
            for step in &job.steps {
                match step {
                    Step::Run { secrets, .. } => secrets.iter().for_each(&mut add),
                    Step::RegistryLogin { username, password, .. } => {
                        add(username);
                        add(password);
                    }
                    _ => {}
                }
            }
        }
        if let Some(slack) = &self.notify.slack {
            add(&slack.webhook);
        }
        secrets
    }

    /// Merge the test job's steps into the build job ahead of the image steps,
    /// so a failing test stops the push. Edges to `test` move to `build`.
    pub fn fold_tests_into_build(&mut self) {
        let Some(index) = self.jobs.iter().position(|j| j.id == "test") else {
            return;
        };
        let test = self.jobs.remove(index);
        if let Some(build) = self.jobs.iter_mut().find(|j| j.id == "build") {
            let mut at = build
                .steps
                .iter()
                .position(Step::is_image_step)
                .unwrap_or(build.steps.len());
            let has_toolchain = build.steps.iter().any(Step::needs_toolchain);
            for step in test.steps {
                if build.steps.contains(&step) || (has_toolchain && step.needs_toolchain()) {
                    continue;
                }
                build.steps.insert(at, step);
                at += 1;
            }
        }
        for job in &mut self.jobs {
            for need in &mut job.needs {
                if need == "test" {
                    *need = "build".to_string();
                }
            }
            let mut seen = Vec::new();
            job.needs.retain(|n| {
                let fresh = !seen.contains(n);
                seen.push(n.clone());
                fresh
            });
        }
    }
}

fn anchor_rank(anchor: StageAnchor) -> u8 {
    match anchor {
        StageAnchor::Build => 0,
        StageAnchor::Test => 1,
        StageAnchor::Security => 2,
        StageAnchor::Deploy => 3,
    }
}

/// Insert after the last job at or before the stage's anchor
fn place_custom_stage(jobs: &mut Vec<(StageAnchor, Job)>, stage: &CustomStage) {
    let position = jobs
        .iter()
        .rposition(|(anchor, _)| anchor_rank(*anchor) <= anchor_rank(stage.after))
        .unwrap_or(0);
    let mut job = Job::new(&stage.name, &stage.name, &stage.name);
    job.container = stage.image.as_ref().map(|image| Container {
        image: image.clone(),
        clear_entrypoint: false,
    });
    job.needs = vec![jobs[position].1.id.clone()];
    job.steps = vec![Step::Checkout, Step::run(stage.name.clone(), stage.commands.clone())];
    jobs.insert(position + 1, (stage.after, job));
}

fn deploy_steps(req: &CicdRequest, namespace: &str, image: &str) -> Vec<Step> {
    let commands = helpers::deployment_commands(req, namespace, image);

    let mut steps = vec![Step::Checkout];
    if DeployCli::for_request(req) == DeployCli::Argocd {
        steps.push(Step::Run {
            name: "Deploy".to_string(),
            commands,
            secrets: vec![
                SecretRef::new("ARGOCD_SERVER", "ARGOCD_SERVER", "ArgoCD API server address"),
                SecretRef::new("ARGOCD_AUTH_TOKEN", "ARGOCD_AUTH_TOKEN", "ArgoCD API token"),
            ],
        });
    } else {
        steps.push(Step::Run {
            name: "Configure cluster access".to_string(),
            commands: vec![
                "mkdir -p $HOME/.kube".to_string(),
                "echo \"$KUBECONFIG_DATA\" | base64 -d > $HOME/.kube/config".to_string(),
            ],
            secrets: vec![SecretRef::new(
                "KUBECONFIG_DATA",
                &req.deployment.kubeconfig_secret,
                "Base64-encoded kubeconfig for the target cluster",
            )],
        });
        steps.push(Step::run("Deploy", commands));
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const VARS: CiVars<'static> = CiVars {
        commit_sha: "$SHA",
        branch: "$BRANCH",
        tag: "$TAG",
    };

    fn pipeline(extra: serde_json::Value) -> Pipeline {
        let mut value = json!({
            "platform": "gitlab-ci",
            "projectName": "web",
            "language": "nodejs",
            "registry": {"repository": "acme/web"}
        });
        if let (Some(base), Some(extra)) = (value.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                base.insert(k.clone(), v.clone());
            }
        }
        let req: CicdRequest = serde_json::from_value(value).unwrap();
        Pipeline::build(&req, &VARS)
    }

    fn ids(p: &Pipeline) -> Vec<&str> {
        p.jobs.iter().map(|j| j.id.as_str()).collect()
    }

    #[test]
    fn test_default_jobs() {
        let p = pipeline(json!({}));
        assert_eq!(ids(&p), vec!["build", "test"]);
        assert_eq!(p.stages(), vec!["build", "test"]);
        assert_eq!(p.tags, vec!["acme/web:$SHA"]);
        assert_eq!(p.job("test").unwrap().container.as_ref().unwrap().image, "node:20");
        assert!(p.job("build").unwrap().steps.contains(&Step::DockerSetup));
    }

    #[test]
    fn test_security_and_deploy_edges() {
        let p = pipeline(json!({
            "security": {"enabled": true, "snyk": {"enabled": true}},
            "deployment": {"enabled": true, "strategy": "helm"}
        }));
        assert_eq!(ids(&p), vec!["build", "test", "security", "snyk", "deploy"]);
        let deploy = p.job("deploy").unwrap();
        assert_eq!(deploy.needs, vec!["build", "test", "security", "snyk"]);
        assert_eq!(deploy.branch.as_deref(), Some("main"));
        assert_eq!(deploy.container.as_ref().unwrap().image, "alpine/helm:3.14.4");
    }

    #[test]
    fn test_environments_chain() {
        let p = pipeline(json!({
            "test": {"enabled": false},
            "deployment": {"enabled": true, "namespace": "apps"},
            "environments": [
                {"name": "staging", "branch": "develop"},
                {"name": "production", "namespace": "prod", "requiresApproval": true, "url": "https://web.example.com"}
            ]
        }));
        assert_eq!(ids(&p), vec!["build", "deploy-staging", "deploy-production"]);
        let staging = p.job("deploy-staging").unwrap();
        assert_eq!(staging.needs, vec!["build"]);
        assert_eq!(staging.branch.as_deref(), Some("develop"));
        assert!(!staging.manual);
        let production = p.job("deploy-production").unwrap();
        assert_eq!(production.needs, vec!["deploy-staging"]);
        assert!(production.manual);
        assert_eq!(
            production.environment.as_ref().unwrap().url.as_deref(),
            Some("https://web.example.com")
        );
        let Step::Run { commands, .. } = production.steps.last().unwrap() else {
            panic!("deploy step");
        };
        assert!(commands[0].ends_with("-n prod"));
    }

    #[test]
    fn test_custom_stages_follow_their_anchor() {
        let p = pipeline(json!({
            "security": {"enabled": true},
            "customStages": [
                {"name": "lint", "after": "build", "commands": ["npm run lint"]},
                {"name": "smoke", "after": "deploy", "commands": ["curl -f https://web"]},
                {"name": "e2e", "after": "test", "image": "cypress/included:13", "commands": ["npx cypress run"]}
            ]
        }));
        assert_eq!(ids(&p), vec!["build", "lint", "test", "e2e", "security", "smoke"]);
        assert_eq!(p.job("lint").unwrap().needs, vec!["build"]);
        assert_eq!(p.job("e2e").unwrap().needs, vec!["test"]);
        assert_eq!(p.job("smoke").unwrap().needs, vec!["security"]);
        assert_eq!(
            p.job("e2e").unwrap().container.as_ref().unwrap().image,
            "cypress/included:13"
        );
    }

    #[test]
    fn test_fold_tests_into_build() {
        let mut p = pipeline(json!({
            "build": {"command": "npm run build"},
            "security": {"enabled": true}
        }));
        p.fold_tests_into_build();
        assert_eq!(ids(&p), vec!["build", "security"]);
        let build = p.job("build").unwrap();
        let names: Vec<&str> = build
            .steps
            .iter()
            .filter_map(|s| match s {
                Step::Run { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["Install dependencies", "Build application", "Run tests"]);
        let tests_at = build
            .steps
            .iter()
            .position(|s| matches!(s, Step::Run { name, .. } if name == "Run tests"))
            .unwrap();
        let push_at = build.steps.iter().position(|s| matches!(s, Step::BuildPush(_))).unwrap();
        assert!(tests_at < push_at);
        assert_eq!(build.steps.iter().filter(|s| **s == Step::Checkout).count(), 1);
        assert_eq!(p.job("security").unwrap().needs, vec!["build"]);
    }

    #[test]
    fn test_secrets_collected() {
        let p = pipeline(json!({
            "registry": {"repository": "acme/web", "usernameSecret": "DOCKER_USER", "passwordSecret": "DOCKER_TOKEN"},
            "deployment": {"enabled": true},
            "notifications": {"slack": {}}
        }));
        let secrets = p.secrets();
        let names: Vec<&str> = secrets.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["DOCKER_TOKEN", "DOCKER_USER", "KUBECONFIG", "SLACK_WEBHOOK_URL"]);
    }

    #[test]
    fn test_image_build_commands() {
        let build = ImageBuild {
            dockerfile: "Dockerfile".into(),
            context: ".".into(),
            tags: vec!["acme/web:1".into(), "acme/web:latest".into()],
            build_args: BTreeMap::from([("MODE".to_string(), "prod".to_string())]),
            platforms: vec![],
            cache: true,
        };
        assert_eq!(
            build.commands(),
            vec![
                "docker build -f Dockerfile --cache-from acme/web:1 -t acme/web:1 -t acme/web:latest --build-arg MODE=prod .",
                "docker push acme/web:1",
                "docker push acme/web:latest",
            ]
        );
        let multi = ImageBuild {
            platforms: vec!["linux/amd64".into(), "linux/arm64".into()],
            ..build
        };
        assert_eq!(
            multi.commands(),
            vec!["docker buildx build --platform linux/amd64,linux/arm64 -f Dockerfile -t acme/web:1 -t acme/web:latest --build-arg MODE=prod --push ."]
        );
    }
}
