//! Jenkins declarative pipeline
//!
//! Jenkinsfiles are Groovy, so this renderer writes text rather than
//! serializing a tree.

use super::helpers::{self, CiVars};
use super::ir::{Job, Pipeline, SecretRef, Step};

pub const PATH: &str = "Jenkinsfile";

pub const VARS: CiVars<'static> = CiVars {
    commit_sha: "$GIT_COMMIT",
    branch: "$BRANCH_NAME",
    tag: "$TAG_NAME",
};

/// Single-quoted Groovy string; the shell, not Groovy, expands `$VAR`
fn groovy(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn sh(command: &str) -> String {
    format!("sh {}", groovy(command))
}

/// Indented text builder
struct Writer {
    lines: Vec<String>,
    depth: usize,
}

impl Writer {
    fn new() -> Self {
        Self {
            lines: Vec::new(),
            depth: 0,
        }
    }

    fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if text.is_empty() {
            self.lines.push(String::new());
        } else {
            self.lines.push(format!("{}{}", "    ".repeat(self.depth), text));
        }
    }

    fn open(&mut self, header: impl AsRef<str>) {
        self.line(format!("{} {{", header.as_ref()));
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.line("}");
    }

    fn finish(self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}

fn credentials(secrets: &[&SecretRef]) -> String {
    let bindings: Vec<String> = secrets
        .iter()
        .map(|s| {
            format!(
                "string(credentialsId: {}, variable: {})",
                groovy(&s.secret),
                groovy(&s.var)
            )
        })
        .collect();
    format!("withCredentials([{}])", bindings.join(", "))
}

fn commands(w: &mut Writer, commands: &[String], secrets: &[&SecretRef]) {
    if secrets.is_empty() {
        commands.iter().for_each(|c| w.line(sh(c)));
    } else {
        w.open(credentials(secrets));
        commands.iter().for_each(|c| w.line(sh(c)));
        w.close();
    }
}

fn stage(w: &mut Writer, job: &Job) {
    w.open(format!("stage({})", groovy(&job.name)));
    if let Some(container) = &job.container {
        w.open("agent");
        w.open("docker");
        w.line(format!("image {}", groovy(&container.image)));
        if container.clear_entrypoint {
            w.line(format!("args {}", groovy("--entrypoint=")));
        }
        w.line("reuseNode true");
        w.close();
        w.close();
    }
    if let Some(branch) = &job.branch {
        w.open("when");
        w.line(format!("branch {}", groovy(branch)));
        w.close();
    }
    if let Some(env) = &job.environment {
        w.open("environment");
        w.line(format!("DEPLOY_ENV = {}", groovy(&env.name)));
        w.close();
    }
    w.open("steps");
    if job.manual {
        w.line(format!("input message: {}", groovy(&format!("{}?", job.name))));
    }
    let mut wrap_in: Option<&str> = match job.container {
        None => job.toolchain_image(),
        Some(_) => None,
    };
    for step in &job.steps {
        match step {
            Step::Checkout => w.line("checkout scm"),
            Step::Toolchain { .. } => {}
            Step::DockerSetup => wrap_in = None,
            Step::Run {
                commands: cmds,
                secrets,
                ..
            } => match wrap_in {
                Some(image) if secrets.is_empty() => {
                    w.line(sh(&helpers::in_container(image, cmds, "$WORKSPACE")))
                }
                _ => {
                    let secrets: Vec<&SecretRef> = secrets.iter().collect();
                    commands(w, cmds, &secrets);
                }
            },
            Step::RegistryLogin {
                host,
                username,
                password,
            } => {
                let login = format!(
                    "echo \"${}\" | docker login {} -u \"${}\" --password-stdin",
                    password.var, host, username.var
                );
                commands(w, &[login], &[username, password]);
            }
            Step::BuildPush(build) => build.commands().iter().for_each(|c| w.line(sh(c))),
            Step::ImageScan(scan) => w.line(sh(&scan.docker_command())),
        }
    }
    w.close();
    w.close();
}

fn post(w: &mut Writer, pipeline: &Pipeline) {
    let notify = &pipeline.notify;
    w.open("post");
    let outcomes = [
        ("failure", "failed", notify.slack.as_ref().is_some_and(|s| s.on_failure), true),
        ("success", "succeeded", notify.slack.as_ref().is_some_and(|s| s.on_success), false),
    ];
    for (condition, outcome, slack, email) in outcomes {
        let email = email && !notify.email.is_empty();
        if !slack && !email {
            continue;
        }
        let text = format!("{} pipeline {}: ${{BUILD_URL}}", pipeline.project, outcome);
        w.open(condition);
        if let Some(s) = notify.slack.as_ref().filter(|_| slack) {
            commands(w, &[helpers::slack_command(&text, s.channel.as_deref())], &[&s.webhook]);
        }
        if email {
            w.line(format!(
                "mail to: {}, subject: \"{} build ${{env.BUILD_NUMBER}} {}\", body: \"See ${{env.BUILD_URL}}\"",
                groovy(&notify.email.join(", ")),
                pipeline.project,
                outcome
            ));
        }
        w.close();
    }
    w.open("always");
    w.line("cleanWs()");
    w.close();
    w.close();
}

pub fn render(pipeline: &Pipeline) -> String {
    let mut w = Writer::new();
    w.open("pipeline");
    w.line("agent any");
    w.line("");

    w.open("options");
    w.line(format!("timeout(time: {}, unit: 'MINUTES')", pipeline.timeout_minutes));
    w.line("buildDiscarder(logRotator(numToKeepStr: '20'))");
    w.line("disableConcurrentBuilds()");
    w.close();
    w.line("");

    w.open("environment");
    w.line(format!("REGISTRY = {}", groovy(&pipeline.registry)));
    w.line(format!("IMAGE_NAME = {}", groovy(&pipeline.image)));
    w.close();
    w.line("");

    w.open("stages");
    for (i, job) in pipeline.jobs.iter().enumerate() {
        if i > 0 {
            w.line("");
        }
        stage(&mut w, job);
    }
    w.close();
    w.line("");

    post(&mut w, pipeline);
    w.close();
    w.finish()
}
