//! GitHub Actions workflow

use serde_json::{json, Map, Value};

use crate::error::Result;
use crate::schema::Language;
use crate::yaml;

use super::helpers::{self, CiVars};
use super::ir::{DeployCli, Job, Pipeline, SecretRef, Step};

pub const PATH: &str = ".github/workflows/ci-cd.yml";

pub const VARS: CiVars<'static> = CiVars {
    commit_sha: "${{ github.sha }}",
    branch: "${{ github.ref_name }}",
    tag: "${{ github.ref_name }}",
};

fn secret(name: &str) -> String {
    format!("${{{{ secrets.{} }}}}", name)
}

fn secret_env(secrets: &[SecretRef]) -> Value {
    let env: Map<String, Value> = secrets
        .iter()
        .map(|s| (s.var.clone(), json!(secret(&s.secret))))
        .collect();
    Value::Object(env)
}

fn uses(name: &str, action: &str, with: Map<String, Value>) -> Value {
    let mut step = Map::new();
    step.insert("name".into(), json!(name));
    step.insert("uses".into(), json!(action));
    if !with.is_empty() {
        step.insert("with".into(), Value::Object(with));
    }
    Value::Object(step)
}

fn with(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn toolchain(language: Language, version: &str, cache: bool) -> Vec<Value> {
    let mut steps = Vec::new();
    match language {
        Language::Nodejs => {
            let mut w = with(&[("node-version", json!(version))]);
            if cache {
                w.insert("cache".into(), json!("npm"));
            }
            steps.push(uses("Set up Node.js", "actions/setup-node@v4", w));
        }
        Language::Python => {
            let mut w = with(&[("python-version", json!(version))]);
            if cache {
                w.insert("cache".into(), json!("pip"));
            }
            steps.push(uses("Set up Python", "actions/setup-python@v5", w));
        }
        Language::Go => steps.push(uses(
            "Set up Go",
            "actions/setup-go@v5",
            with(&[("go-version", json!(version)), ("cache", json!(cache))]),
        )),
        Language::Java => {
            let mut w = with(&[("distribution", json!("temurin")), ("java-version", json!(version))]);
            if cache {
                w.insert("cache".into(), json!("maven"));
            }
            steps.push(uses("Set up JDK", "actions/setup-java@v4", w));
        }
        Language::Rust => {
            steps.push(uses(
                "Set up Rust",
                "dtolnay/rust-toolchain@master",
                with(&[("toolchain", json!(version))]),
            ));
            if cache {
                steps.push(uses("Cache cargo", "Swatinem/rust-cache@v2", Map::new()));
            }
        }
        Language::Dotnet => steps.push(uses(
            "Set up .NET",
            "actions/setup-dotnet@v4",
            with(&[("dotnet-version", json!(format!("{}.x", version)))]),
        )),
        Language::Php => steps.push(uses(
            "Set up PHP",
            "shivammathur/setup-php@v2",
            with(&[("php-version", json!(version)), ("tools", json!("composer"))]),
        )),
        Language::Ruby => steps.push(uses(
            "Set up Ruby",
            "ruby/setup-ruby@v1",
            with(&[("ruby-version", json!(version)), ("bundler-cache", json!(cache))]),
        )),
    }
    steps
}

fn cli_setup(cli: DeployCli) -> Value {
    match cli {
        DeployCli::Kubectl => uses("Set up kubectl", "azure/setup-kubectl@v4", Map::new()),
        DeployCli::Helm => uses("Set up Helm", "azure/setup-helm@v4", Map::new()),
        DeployCli::Flux => uses("Set up Flux", "fluxcd/flux2/action@main", Map::new()),
        DeployCli::Argocd => json!({
            "name": "Set up ArgoCD CLI",
            "run": "curl -sSL -o argocd https://github.com/argoproj/argo-cd/releases/latest/download/argocd-linux-amd64\nsudo install -m 555 argocd /usr/local/bin/argocd",
        }),
    }
}

fn steps(job: &Job) -> Vec<Value> {
    let mut out = Vec::new();
    for step in &job.steps {
        match step {
            Step::Checkout => {
                out.push(uses("Checkout", "actions/checkout@v4", Map::new()));
                if let Some(cli) = job.cli {
                    out.push(cli_setup(cli));
                }
            }
            Step::Toolchain {
                language,
                version,
                cache,
                ..
            } => out.extend(toolchain(*language, version, *cache)),
            Step::Run {
                name,
                commands,
                secrets,
            } => {
                let mut run = Map::new();
                run.insert("name".into(), json!(name));
                run.insert("run".into(), json!(commands.join("\n")));
                if !secrets.is_empty() {
                    run.insert("env".into(), secret_env(secrets));
                }
                out.push(Value::Object(run));
            }
            Step::DockerSetup => {
                out.push(uses("Set up Docker Buildx", "docker/setup-buildx-action@v3", Map::new()))
            }
            Step::RegistryLogin {
                host,
                username,
                password,
            } => out.push(uses(
                "Log in to registry",
                "docker/login-action@v3",
                with(&[
                    ("registry", json!(host)),
                    ("username", json!(secret(&username.secret))),
                    ("password", json!(secret(&password.secret))),
                ]),
            )),
            Step::BuildPush(build) => {
                let mut w = with(&[
                    ("context", json!(build.context)),
                    ("file", json!(build.dockerfile)),
                    ("push", json!("${{ github.event_name != 'pull_request' }}")),
                    ("tags", json!(build.tags.join("\n"))),
                ]);
                if !build.build_args.is_empty() {
                    let args: Vec<String> = build
                        .build_args
                        .iter()
                        .map(|(k, v)| format!("{}={}", k, v))
                        .collect();
                    w.insert("build-args".into(), json!(args.join("\n")));
                }
                if !build.platforms.is_empty() {
                    w.insert("platforms".into(), json!(build.platforms.join(",")));
                }
                if build.cache {
                    w.insert("cache-from".into(), json!("type=gha"));
                    w.insert("cache-to".into(), json!("type=gha,mode=max"));
                }
                out.push(uses("Build and push image", "docker/build-push-action@v5", w));
            }
            Step::ImageScan(scan) => {
                out.push(uses(
                    "Scan image with Trivy",
                    "aquasecurity/trivy-action@0.24.0",
                    with(&[
                        ("image-ref", json!(scan.image)),
                        ("format", json!("sarif")),
                        ("output", json!("trivy-results.sarif")),
                        ("severity", json!(scan.severity)),
                        ("ignore-unfixed", json!(scan.ignore_unfixed)),
                        ("exit-code", json!(scan.exit_code().to_string())),
                    ]),
                ));
                let mut upload = uses(
                    "Upload scan results",
                    "github/codeql-action/upload-sarif@v3",
                    with(&[("sarif_file", json!("trivy-results.sarif"))]),
                );
                upload["if"] = json!("always()");
                out.push(upload);
            }
        }
    }
    out
}

fn job(job: &Job, pipeline: &Pipeline) -> Value {
    let mut j = Map::new();
    j.insert("name".into(), json!(job.name));
    j.insert("runs-on".into(), json!("ubuntu-latest"));
    if !job.needs.is_empty() {
        j.insert("needs".into(), json!(job.needs));
    }
    if let Some(branch) = &job.branch {
        j.insert(
            "if".into(),
            json!(format!("github.event_name == 'push' && github.ref == 'refs/heads/{}'", branch)),
        );
    }
    if let Some(env) = &job.environment {
        let mut e = Map::new();
        e.insert("name".into(), json!(env.name));
        if let Some(url) = &env.url {
            e.insert("url".into(), json!(url));
        }
        j.insert("environment".into(), Value::Object(e));
    }
    // deploy CLIs are installed on the runner instead
    if job.cli.is_none() {
        if let Some(container) = &job.container {
            j.insert("container".into(), json!(container.image));
        }
    }
    if job.steps.iter().any(|s| matches!(s, Step::ImageScan(_))) {
        j.insert(
            "permissions".into(),
            json!({"contents": "read", "security-events": "write"}),
        );
    }
    j.insert("timeout-minutes".into(), json!(pipeline.timeout_minutes));
    j.insert("steps".into(), json!(steps(job)));
    Value::Object(j)
}

fn notify_job(pipeline: &Pipeline) -> Option<Value> {
    let slack = pipeline.notify.slack.as_ref()?;
    let run_url = "${{ github.server_url }}/${{ github.repository }}/actions/runs/${{ github.run_id }}";
    let mut steps = Vec::new();
    let env = secret_env(std::slice::from_ref(&slack.webhook));
    if slack.on_failure {
        steps.push(json!({
            "name": "Notify failure",
            "if": "contains(needs.*.result, 'failure')",
            "run": helpers::slack_command(
                &format!("{} pipeline failed: {}", pipeline.project, run_url),
                slack.channel.as_deref(),
            ),
            "env": env,
        }));
    }
    if slack.on_success {
        steps.push(json!({
            "name": "Notify success",
            "if": "${{ !contains(needs.*.result, 'failure') }}",
            "run": helpers::slack_command(
                &format!("{} pipeline succeeded: {}", pipeline.project, run_url),
                slack.channel.as_deref(),
            ),
            "env": env,
        }));
    }
    if steps.is_empty() {
        return None;
    }
    let needs: Vec<&str> = pipeline.jobs.iter().map(|j| j.id.as_str()).collect();
    Some(json!({
        "name": "Notify",
        "runs-on": "ubuntu-latest",
        "needs": needs,
        "if": "always()",
        "steps": steps,
    }))
}

pub fn render(pipeline: &Pipeline) -> Result<String> {
    let mut pipeline = pipeline.clone();
    pipeline.fold_tests_into_build();

    let triggers = &pipeline.triggers;
    let mut push = Map::new();
    push.insert("branches".into(), json!(triggers.branches));
    if triggers.tags {
        push.insert("tags".into(), json!(["v*"]));
    }
    let mut on = Map::new();
    on.insert("push".into(), Value::Object(push));
    if triggers.pull_requests {
        on.insert("pull_request".into(), json!({"branches": triggers.branches}));
    }

    let mut jobs = Map::new();
    for j in &pipeline.jobs {
        jobs.insert(j.id.clone(), job(j, &pipeline));
    }
    if let Some(notify) = notify_job(&pipeline) {
        jobs.insert("notify".into(), notify);
    }

    let workflow = json!({
        "name": format!("{} CI/CD", pipeline.project),
        "on": on,
        "env": {
            "REGISTRY": pipeline.registry,
            "IMAGE_NAME": pipeline.image,
        },
        "jobs": jobs,
    });
    yaml::to_yaml(&workflow)
}
