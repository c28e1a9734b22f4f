//! Azure DevOps pipeline

use serde_json::{json, Map, Value};

use crate::error::Result;
use crate::schema::Language;
use crate::yaml;

use super::helpers::{self, CiVars};
use super::ir::{DeployCli, Job, Pipeline, SecretRef, Step, INSTALL_STEP};

pub const PATH: &str = "azure-pipelines.yml";

pub const VARS: CiVars<'static> = CiVars {
    commit_sha: "$(Build.SourceVersion)",
    branch: "$(Build.SourceBranchName)",
    tag: "$(Build.SourceBranchName)",
};

const SOURCES: &str = "$(Build.SourcesDirectory)";

/// Stage and job identifiers allow only letters, digits and underscores
pub fn stage_id(id: &str) -> String {
    id.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

fn script(name: &str, commands: &[String], secrets: &[SecretRef]) -> Value {
    let mut step = Map::new();
    step.insert("script".into(), json!(commands.join("\n")));
    step.insert("displayName".into(), json!(name));
    if !secrets.is_empty() {
        let env: Map<String, Value> = secrets
            .iter()
            .map(|s| (s.var.clone(), json!(format!("$({})", s.secret))))
            .collect();
        step.insert("env".into(), Value::Object(env));
    }
    Value::Object(step)
}

fn toolchain(language: Language, version: &str) -> Value {
    match language {
        Language::Nodejs => json!({
            "task": "NodeTool@0",
            "inputs": {"versionSpec": format!("{}.x", version)},
            "displayName": "Set up Node.js",
        }),
        Language::Python => json!({
            "task": "UsePythonVersion@0",
            "inputs": {"versionSpec": version},
            "displayName": "Set up Python",
        }),
        Language::Go => json!({
            "task": "GoTool@0",
            "inputs": {"version": version},
            "displayName": "Set up Go",
        }),
        Language::Java => json!({
            "task": "JavaToolInstaller@0",
            "inputs": {
                "versionSpec": version,
                "jdkArchitectureOption": "x64",
                "jdkSourceOption": "PreInstalled",
            },
            "displayName": "Set up JDK",
        }),
        Language::Dotnet => json!({
            "task": "UseDotNet@2",
            "inputs": {"packageType": "sdk", "version": format!("{}.x", version)},
            "displayName": "Set up .NET",
        }),
        Language::Ruby => json!({
            "task": "UseRubyVersion@0",
            "inputs": {"versionSpec": version},
            "displayName": "Set up Ruby",
        }),
        Language::Rust => script(
            "Set up Rust",
            &[format!("rustup toolchain install {0} --profile minimal && rustup default {0}", version)],
            &[],
        ),
        Language::Php => script(
            "Set up PHP",
            &[format!(
                "sudo update-alternatives --set php /usr/bin/php{}",
                version
            )],
            &[],
        ),
    }
}

fn cli_setup(cli: DeployCli) -> Value {
    match cli {
        DeployCli::Kubectl => json!({"task": "KubectlInstaller@0", "displayName": "Set up kubectl"}),
        DeployCli::Helm => json!({
            "task": "HelmInstaller@1",
            "inputs": {"helmVersionToInstall": "latest"},
            "displayName": "Set up Helm",
        }),
        DeployCli::Argocd => script(
            "Set up ArgoCD CLI",
            &[
                "curl -sSL -o argocd https://github.com/argoproj/argo-cd/releases/latest/download/argocd-linux-amd64".to_string(),
                "sudo install -m 555 argocd /usr/local/bin/argocd".to_string(),
            ],
            &[],
        ),
        DeployCli::Flux => script(
            "Set up Flux",
            &["curl -s https://fluxcd.io/install.sh | sudo bash".to_string()],
            &[],
        ),
    }
}

fn cache_task(pipeline: &Pipeline) -> Value {
    let (paths, lockfile) = helpers::cache_paths(pipeline.language);
    let path = paths.first().copied().unwrap_or(".cache");
    json!({
        "task": "Cache@2",
        "inputs": {
            "key": format!("\"{}\" | \"$(Agent.OS)\" | {}", pipeline.language, lockfile),
            "restoreKeys": format!("\"{}\" | \"$(Agent.OS)\"", pipeline.language),
            "path": format!("{}/{}", SOURCES, path),
        },
        "displayName": "Cache dependencies",
    })
}

fn steps(job: &Job, pipeline: &Pipeline) -> Vec<Value> {
    let host = job.container.is_none() || job.cli.is_some();
    let cached = job
        .steps
        .iter()
        .any(|s| matches!(s, Step::Toolchain { cache: true, .. }));
    let mut out = Vec::new();
    for step in &job.steps {
        match step {
            Step::Checkout => {
                out.push(json!({"checkout": "self"}));
                if let Some(cli) = job.cli {
                    out.push(cli_setup(cli));
                }
            }
            Step::Toolchain {
                language, version, ..
            } => {
                if host {
                    out.push(toolchain(*language, version));
                }
            }
            Step::Run {
                name,
                commands,
                secrets,
            } => {
                if name == INSTALL_STEP && cached {
                    out.push(cache_task(pipeline));
                }
                out.push(script(name, commands, secrets));
            }
            Step::DockerSetup => {}
            Step::RegistryLogin {
                host,
                username,
                password,
            } => out.push(script(
                "Log in to registry",
                &[format!(
                    "echo \"${}\" | docker login {} -u \"${}\" --password-stdin",
                    password.var, host, username.var
                )],
                &[username.clone(), password.clone()],
            )),
            Step::BuildPush(build) => {
                let mut commands = Vec::new();
                if !build.platforms.is_empty() {
                    commands.push("docker buildx create --use".to_string());
                }
                commands.extend(build.commands());
                out.push(script("Build and push image", &commands, &[]));
            }
            Step::ImageScan(scan) => {
                out.push(script("Scan image with Trivy", &[scan.docker_command()], &[]))
            }
        }
    }
    out
}

fn job(job: &Job, pipeline: &Pipeline) -> Value {
    let id = stage_id(&job.id);
    let mut j = Map::new();
    let steps = steps(job, pipeline);
    if job.is_deploy() {
        let environment = job
            .environment
            .as_ref()
            .map(|e| e.name.clone())
            .unwrap_or_else(|| pipeline.project.clone());
        j.insert("deployment".into(), json!(id));
        j.insert("displayName".into(), json!(job.name));
        j.insert("environment".into(), json!(environment));
        j.insert("timeoutInMinutes".into(), json!(pipeline.timeout_minutes));
        j.insert(
            "strategy".into(),
            json!({"runOnce": {"deploy": {"steps": steps}}}),
        );
    } else {
        j.insert("job".into(), json!(id));
        j.insert("displayName".into(), json!(job.name));
        if let Some(container) = &job.container {
            j.insert("container".into(), json!(container.image));
        }
        let cached = job
            .steps
            .iter()
            .any(|s| matches!(s, Step::Toolchain { cache: true, .. }));
        if cached {
            let variables: Map<String, Value> = helpers::cache_env(pipeline.language, SOURCES)
                .into_iter()
                .map(|(k, v)| (k.to_string(), json!(v)))
                .collect();
            if !variables.is_empty() {
                j.insert("variables".into(), Value::Object(variables));
            }
        }
        j.insert("timeoutInMinutes".into(), json!(pipeline.timeout_minutes));
        j.insert("steps".into(), json!(steps));
    }
    Value::Object(j)
}

fn stage(job: &Job, pipeline: &Pipeline) -> Value {
    let mut s = Map::new();
    s.insert("stage".into(), json!(stage_id(&job.id)));
    s.insert("displayName".into(), json!(job.name));
    let depends: Vec<String> = job.needs.iter().map(|n| stage_id(n)).collect();
    s.insert("dependsOn".into(), json!(depends));
    if let Some(branch) = &job.branch {
        s.insert(
            "condition".into(),
            json!(format!(
                "and(succeeded(), eq(variables['Build.SourceBranch'], 'refs/heads/{}'))",
                branch
            )),
        );
    }
    s.insert("jobs".into(), json!([self::job(job, pipeline)]));
    Value::Object(s)
}

fn notify_stages(pipeline: &Pipeline) -> Vec<Value> {
    let Some(slack) = &pipeline.notify.slack else {
        return Vec::new();
    };
    let all: Vec<String> = pipeline.jobs.iter().map(|j| stage_id(&j.id)).collect();
    let events = [
        (slack.on_failure, "NotifyFailure", "failed()", "failed"),
        (slack.on_success, "NotifySuccess", "succeeded()", "succeeded"),
    ];
    events
        .into_iter()
        .filter(|(enabled, ..)| *enabled)
        .map(|(_, id, condition, outcome)| {
            let text = format!(
                "{} pipeline {}: $(System.CollectionUri)$(System.TeamProject)/_build/results?buildId=$(Build.BuildId)",
                pipeline.project, outcome
            );
            let notify = script(
                "Notify Slack",
                &[helpers::slack_command(&text, slack.channel.as_deref())],
                std::slice::from_ref(&slack.webhook),
            );
            json!({
                "stage": id,
                "displayName": format!("Notify ({})", outcome),
                "dependsOn": all,
                "condition": condition,
                "jobs": [{"job": "Slack", "steps": [notify]}],
            })
        })
        .collect()
}

pub fn render(pipeline: &Pipeline) -> Result<String> {
    let triggers = &pipeline.triggers;
    let mut trigger = Map::new();
    trigger.insert("branches".into(), json!({"include": triggers.branches}));
    if triggers.tags {
        trigger.insert("tags".into(), json!({"include": ["v*"]}));
    }
    let pr = if triggers.pull_requests {
        json!({"branches": {"include": triggers.branches}})
    } else {
        json!("none")
    };

    let mut stages: Vec<Value> = pipeline.jobs.iter().map(|j| stage(j, pipeline)).collect();
    stages.extend(notify_stages(pipeline));

    let config = json!({
        "trigger": trigger,
        "pr": pr,
        "pool": {"vmImage": "ubuntu-latest"},
        "variables": {
            "REGISTRY": pipeline.registry,
            "IMAGE_NAME": pipeline.image,
        },
        "stages": stages,
    });
    yaml::to_yaml(&config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_id() {
        assert_eq!(stage_id("build"), "Build");
        assert_eq!(stage_id("deploy-production"), "DeployProduction");
        assert_eq!(stage_id("e2e tests"), "E2eTests");
    }
}
