//! GitLab CI configuration

use serde_json::{json, Map, Value};

use crate::error::Result;
use crate::yaml;

use super::helpers::{self, CiVars};
use super::ir::{Container, Job, Pipeline, SecretRef, Step, TRIVY_IMAGE};

pub const PATH: &str = ".gitlab-ci.yml";

pub const VARS: CiVars<'static> = CiVars {
    commit_sha: "$CI_COMMIT_SHORT_SHA",
    branch: "$CI_COMMIT_REF_SLUG",
    tag: "$CI_COMMIT_TAG",
};

const DOCKER_IMAGE: &str = "docker:24";
const DOCKER_SERVICE: &str = "docker:24-dind";
const CURL_IMAGE: &str = "curlimages/curl:8.7.1";

fn image(container: &Container) -> Value {
    if container.clear_entrypoint {
        json!({"name": container.image, "entrypoint": [""]})
    } else {
        json!(container.image)
    }
}

fn add_secret(variables: &mut Map<String, Value>, secret: &SecretRef) {
    if secret.var != secret.secret {
        variables.insert(secret.var.clone(), json!(format!("${}", secret.secret)));
    }
}

fn refs(pipeline: &Pipeline) -> Vec<String> {
    let triggers = &pipeline.triggers;
    let mut refs = triggers.branches.clone();
    if triggers.pull_requests {
        refs.push("merge_requests".to_string());
    }
    if triggers.tags {
        refs.push("tags".to_string());
    }
    refs
}

fn job(job: &Job, pipeline: &Pipeline) -> Value {
    let scans = job.steps.iter().any(|s| matches!(s, Step::ImageScan(_)));
    let mut variables = Map::new();
    let mut script: Vec<String> = Vec::new();

    // toolchain steps on a docker host run in the toolchain image
    let mut wrap_in: Option<&str> = match job.container {
        None => job.toolchain_image(),
        Some(_) => None,
    };

    for step in &job.steps {
        match step {
            Step::Checkout | Step::Toolchain { .. } => {}
            Step::Run {
                commands, secrets, ..
            } => {
                secrets.iter().for_each(|s| add_secret(&mut variables, s));
                match wrap_in {
                    Some(image) if secrets.is_empty() => {
                        script.push(helpers::in_container(image, commands, "$CI_PROJECT_DIR"))
                    }
                    _ => script.extend(commands.iter().cloned()),
                }
            }
            Step::DockerSetup => wrap_in = None,
            Step::RegistryLogin {
                host,
                username,
                password,
            } => {
                if scans {
                    variables.insert("TRIVY_USERNAME".into(), json!(format!("${}", username.secret)));
                    variables.insert("TRIVY_PASSWORD".into(), json!(format!("${}", password.secret)));
                } else {
                    script.push(format!(
                        "echo \"${}\" | docker login {} -u \"${}\" --password-stdin",
                        password.secret, host, username.secret
                    ));
                }
            }
            Step::BuildPush(build) => script.extend(build.commands()),
            Step::ImageScan(scan) => script.push(scan.command()),
        }
    }

    let mut j = Map::new();
    j.insert("stage".into(), json!(job.stage));
    if scans {
        j.insert(
            "image".into(),
            image(&Container {
                image: TRIVY_IMAGE.to_string(),
                clear_entrypoint: true,
            }),
        );
    } else if let Some(container) = &job.container {
        j.insert("image".into(), image(container));
    } else {
        j.insert("image".into(), json!(DOCKER_IMAGE));
        j.insert("services".into(), json!([DOCKER_SERVICE]));
    }
    if !job.needs.is_empty() {
        j.insert("needs".into(), json!(job.needs));
    }

    let cached = job.container.is_some()
        && job
            .steps
            .iter()
            .any(|s| matches!(s, Step::Toolchain { cache: true, .. }));
    if cached {
        for (key, value) in helpers::cache_env(pipeline.language, "$CI_PROJECT_DIR") {
            variables.insert(key.into(), json!(value));
        }
        let (paths, lockfile) = helpers::cache_paths(pipeline.language);
        j.insert(
            "cache".into(),
            json!({"key": {"files": [lockfile]}, "paths": paths}),
        );
    }
    if !variables.is_empty() {
        j.insert("variables".into(), Value::Object(variables));
    }
    j.insert("script".into(), json!(script));

    if let Some(env) = &job.environment {
        let mut e = Map::new();
        e.insert("name".into(), json!(env.name));
        if let Some(url) = &env.url {
            e.insert("url".into(), json!(url));
        }
        j.insert("environment".into(), Value::Object(e));
    }
    match &job.branch {
        Some(branch) => j.insert("only".into(), json!([branch])),
        None => j.insert("only".into(), json!(refs(pipeline))),
    };
    if job.is_deploy() || job.manual {
        j.insert("when".into(), json!("manual"));
    }
    j.insert("timeout".into(), json!(format!("{}m", pipeline.timeout_minutes)));
    Value::Object(j)
}

fn notify_jobs(pipeline: &Pipeline, root: &mut Map<String, Value>) {
    let Some(slack) = &pipeline.notify.slack else {
        return;
    };
    let mut variables = Map::new();
    add_secret(&mut variables, &slack.webhook);
    let events = [
        (slack.on_failure, "notify-failure", "on_failure", "failed"),
        (slack.on_success, "notify-success", "on_success", "succeeded"),
    ];
    for (enabled, id, when, outcome) in events {
        if !enabled {
            continue;
        }
        let text = format!("{} pipeline {}: $CI_PIPELINE_URL", pipeline.project, outcome);
        let mut j = Map::new();
        j.insert("stage".into(), json!(".post"));
        j.insert(
            "image".into(),
            image(&Container {
                image: CURL_IMAGE.to_string(),
                clear_entrypoint: true,
            }),
        );
        if !variables.is_empty() {
            j.insert("variables".into(), Value::Object(variables.clone()));
        }
        j.insert(
            "script".into(),
            json!([helpers::slack_command(&text, slack.channel.as_deref())]),
        );
        j.insert("when".into(), json!(when));
        root.insert(id.into(), Value::Object(j));
    }
}

pub fn render(pipeline: &Pipeline) -> Result<String> {
    let mut root = Map::new();
    root.insert("stages".into(), json!(pipeline.stages()));
    root.insert(
        "variables".into(),
        json!({
            "REGISTRY": pipeline.registry,
            "IMAGE_NAME": pipeline.image,
            "DOCKER_TLS_CERTDIR": "/certs",
        }),
    );
    for j in &pipeline.jobs {
        root.insert(j.id.clone(), job(j, pipeline));
    }
    notify_jobs(pipeline, &mut root);
    yaml::to_yaml(&Value::Object(root))
}
