//! CircleCI configuration

use serde_json::{json, Map, Value};

use crate::error::Result;
use crate::yaml;

use super::helpers::{self, CiVars};
use super::ir::{ImageBuild, Job, Pipeline, SecretRef, Step, INSTALL_STEP};

pub const PATH: &str = ".circleci/config.yml";

pub const VARS: CiVars<'static> = CiVars {
    commit_sha: "${CIRCLE_SHA1}",
    branch: "${CIRCLE_BRANCH}",
    tag: "${CIRCLE_TAG}",
};

const DOCKER_ORB: &str = "circleci/docker@2.6.0";
const MACHINE_IMAGE: &str = "ubuntu-2204:current";
const WORKFLOW: &str = "ci-cd";

fn run(name: &str, command: String, pipeline: &Pipeline) -> Value {
    json!({"run": {
        "name": name,
        "command": command,
        "no_output_timeout": format!("{}m", pipeline.timeout_minutes),
    }})
}

/// Project environment variables are read under their own names, so a
/// differing command variable is exported first.
fn with_secrets(commands: &[String], secrets: &[SecretRef]) -> String {
    let mut lines: Vec<String> = secrets
        .iter()
        .filter(|s| s.var != s.secret)
        .map(|s| format!("export {}=\"${}\"", s.var, s.secret))
        .collect();
    lines.extend(commands.iter().cloned());
    lines.join("\n")
}

/// Tags relative to the image name, as the docker orb expects them
fn orb_tags(build: &ImageBuild, image: &str) -> String {
    let prefix = format!("{}:", image);
    let tags: Vec<&str> = build
        .tags
        .iter()
        .map(|t| t.strip_prefix(&prefix).unwrap_or(t.as_str()))
        .collect();
    tags.join(",")
}

/// Image name without the registry host
fn orb_image(pipeline: &Pipeline) -> &str {
    pipeline
        .image
        .strip_prefix(&format!("{}/", pipeline.registry))
        .unwrap_or(pipeline.image.as_str())
}

fn cache_key(pipeline: &Pipeline) -> String {
    let (_, lockfile) = helpers::cache_paths(pipeline.language);
    format!("deps-{}-{{{{ checksum \"{}\" }}}}", pipeline.language, lockfile)
}

/// Package caches live under the home directory; build outputs stay in the project
fn cache_dirs(pipeline: &Pipeline) -> Vec<String> {
    let (paths, _) = helpers::cache_paths(pipeline.language);
    paths
        .iter()
        .map(|p| {
            if p.starts_with('.') || p.starts_with("go/") {
                format!("~/{}", p)
            } else {
                p.to_string()
            }
        })
        .collect()
}

fn build_steps(build: &ImageBuild, pipeline: &Pipeline) -> Vec<Value> {
    if !build.platforms.is_empty() {
        let mut commands = vec![
            "docker run --privileged --rm tonistiigi/binfmt --install all".to_string(),
            "docker buildx create --use".to_string(),
        ];
        commands.extend(build.commands());
        return vec![run("Build and push multi-platform image", commands.join("\n"), pipeline)];
    }

    let image = orb_image(pipeline);
    let tag = orb_tags(build, &pipeline.image);
    let mut params = Map::new();
    params.insert("image".into(), json!(image));
    params.insert("tag".into(), json!(tag));
    params.insert("registry".into(), json!(pipeline.registry));
    params.insert("dockerfile".into(), json!(build.dockerfile));
    params.insert("path".into(), json!(build.context));
    if !build.build_args.is_empty() {
        let args: Vec<String> = build
            .build_args
            .iter()
            .map(|(k, v)| format!("--build-arg {}={}", k, v))
            .collect();
        params.insert("extra_build_args".into(), json!(args.join(" ")));
    }
    if build.cache {
        if let Some(first) = build.tags.first() {
            params.insert("cache_from".into(), json!(first));
        }
    }
    vec![
        json!({"docker/build": params}),
        json!({"docker/push": {
            "image": image,
            "tag": tag,
            "registry": pipeline.registry,
        }}),
    ]
}

fn slack_step(pipeline: &Pipeline, outcome: &str, when: &str) -> Option<Value> {
    let slack = pipeline.notify.slack.as_ref()?;
    let text = format!("{} pipeline {}: ${{CIRCLE_BUILD_URL}}", pipeline.project, outcome);
    let command = with_secrets(
        &[helpers::slack_command(&text, slack.channel.as_deref())],
        std::slice::from_ref(&slack.webhook),
    );
    Some(json!({"run": {
        "name": format!("Notify Slack ({})", outcome),
        "command": command,
        "when": when,
    }}))
}

fn job(job: &Job, pipeline: &Pipeline, last: bool) -> Value {
    let mut steps = Vec::new();
    let host = job.container.is_none();
    // toolchain steps on the machine executor run in the toolchain image
    let mut wrap_in: Option<&str> = if host { job.toolchain_image() } else { None };
    let cached = !host
        && job
            .steps
            .iter()
            .any(|s| matches!(s, Step::Toolchain { cache: true, .. }));

    for step in &job.steps {
        match step {
            Step::Checkout => steps.push(json!("checkout")),
            Step::Toolchain { .. } => {}
            Step::Run {
                name,
                commands,
                secrets,
            } => {
                let install = name == INSTALL_STEP && cached;
                if install {
                    steps.push(json!({"restore_cache": {
                        "keys": [cache_key(pipeline), format!("deps-{}-", pipeline.language)],
                    }}));
                }
                let command = match wrap_in {
                    Some(image) if secrets.is_empty() => helpers::in_container(image, commands, "$PWD"),
                    _ => with_secrets(commands, secrets),
                };
                steps.push(run(name, command, pipeline));
                if install {
                    steps.push(json!({"save_cache": {
                        "key": cache_key(pipeline),
                        "paths": cache_dirs(pipeline),
                    }}));
                }
            }
            Step::DockerSetup => wrap_in = None,
            Step::RegistryLogin {
                host,
                username,
                password,
            } => steps.push(json!({"docker/check": {
                "docker-username": username.secret,
                "docker-password": password.secret,
                "registry": host,
            }})),
            Step::BuildPush(build) => steps.extend(build_steps(build, pipeline)),
            Step::ImageScan(scan) => {
                steps.push(run("Scan image with Trivy", scan.docker_command(), pipeline))
            }
        }
    }

    if pipeline.notify.slack.as_ref().is_some_and(|s| s.on_failure) {
        steps.extend(slack_step(pipeline, "failed", "on_fail"));
    }
    if last && pipeline.notify.slack.as_ref().is_some_and(|s| s.on_success) {
        steps.extend(slack_step(pipeline, "succeeded", "on_success"));
    }

    let mut j = Map::new();
    match &job.container {
        None => {
            j.insert("machine".into(), json!({"image": MACHINE_IMAGE}));
        }
        Some(container) => {
            let mut image = Map::new();
            image.insert("image".into(), json!(container.image));
            if container.clear_entrypoint {
                image.insert("entrypoint".into(), json!(["/bin/sh"]));
            }
            j.insert("docker".into(), json!([image]));
        }
    }
    j.insert(
        "environment".into(),
        json!({"REGISTRY": pipeline.registry, "IMAGE_NAME": pipeline.image}),
    );
    j.insert("steps".into(), json!(steps));
    Value::Object(j)
}

fn filters(job: &Job, pipeline: &Pipeline) -> Option<Value> {
    let triggers = &pipeline.triggers;
    let mut filters = Map::new();
    if let Some(branch) = &job.branch {
        filters.insert("branches".into(), json!({"only": [branch]}));
        return Some(Value::Object(filters));
    }
    // pull request builds run on arbitrary branches
    if !triggers.pull_requests {
        filters.insert("branches".into(), json!({"only": triggers.branches}));
    }
    if triggers.tags {
        filters.insert("tags".into(), json!({"only": "/^v.*/"}));
    }
    (!filters.is_empty()).then_some(Value::Object(filters))
}

fn workflow(pipeline: &Pipeline) -> Vec<Value> {
    let mut entries = Vec::new();
    for job in &pipeline.jobs {
        let filters = filters(job, pipeline);
        let mut requires = job.needs.clone();
        if job.manual {
            let hold = format!("hold-{}", job.id);
            let mut approval = Map::new();
            approval.insert("type".into(), json!("approval"));
            if !requires.is_empty() {
                approval.insert("requires".into(), json!(requires));
            }
            if let Some(f) = &filters {
                approval.insert("filters".into(), f.clone());
            }
            entries.push(json!({ hold.clone(): approval }));
            requires = vec![hold];
        }

        let mut config = Map::new();
        if !requires.is_empty() {
            config.insert("requires".into(), json!(requires));
        }
        if let Some(f) = filters {
            config.insert("filters".into(), f);
        }
        if config.is_empty() {
            entries.push(json!(job.id));
        } else {
            entries.push(json!({ job.id.clone(): config }));
        }
    }
    entries
}

pub fn render(pipeline: &Pipeline) -> Result<String> {
    let mut jobs = Map::new();
    let count = pipeline.jobs.len();
    for (i, j) in pipeline.jobs.iter().enumerate() {
        jobs.insert(j.id.clone(), job(j, pipeline, i + 1 == count));
    }
    let config = json!({
        "version": 2.1,
        "orbs": {"docker": DOCKER_ORB},
        "jobs": jobs,
        "workflows": {
            WORKFLOW: {"jobs": workflow(pipeline)},
        },
    });
    yaml::to_yaml(&config)
}
