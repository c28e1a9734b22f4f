//! README-CICD.md describing the generated pipeline and its setup

use std::fmt::Write;

use crate::schema::cicd::{CicdRequest, Platform};

use super::ir::Pipeline;

pub const PATH: &str = "README-CICD.md";

fn secret_setup(platform: Platform) -> &'static str {
    match platform {
        Platform::GithubActions => {
            "Add each secret under **Settings > Secrets and variables > Actions > New repository secret**. \
             Environment-scoped secrets and required reviewers live under **Settings > Environments**."
        }
        Platform::GitlabCi => {
            "Add each secret under **Settings > CI/CD > Variables**. Mark them *Masked*, and *Protected* \
             when they are only needed on protected branches."
        }
        Platform::Jenkins => {
            "Add each secret under **Manage Jenkins > Credentials** as a *Secret text* credential whose ID \
             is the secret name. The pipeline needs the Docker Pipeline, Credentials Binding, Workspace \
             Cleanup and Mailer plugins."
        }
        Platform::Circleci => {
            "Add each secret under **Project Settings > Environment Variables**, or in an organization \
             context attached to the workflow jobs."
        }
        Platform::AzureDevops => {
            "Add each secret as a secret pipeline variable (**Pipelines > Edit > Variables**) or in a \
             variable group under **Pipelines > Library**."
        }
    }
}

fn approval_note(platform: Platform) -> &'static str {
    match platform {
        Platform::GithubActions => "Add required reviewers to the environment under **Settings > Environments**.",
        Platform::GitlabCi => "Deploy jobs are manual; start them from the pipeline view.",
        Platform::Jenkins => "The stage pauses on an `input` step until someone approves it.",
        Platform::Circleci => "An approval job (`hold-<job>`) gates the deploy job in the workflow.",
        Platform::AzureDevops => "Add an approval check to the environment under **Pipelines > Environments > Approvals and checks**.",
    }
}

fn email_note(platform: Platform) -> &'static str {
    match platform {
        Platform::Jenkins => "The `post` block mails the recipients when the build fails.",
        Platform::GithubActions => "Enable e-mail for failed workflow runs in each user's GitHub notification settings.",
        Platform::GitlabCi => "Enable the *Pipeline status emails* integration under **Settings > Integrations**.",
        Platform::Circleci => "Enable e-mail notifications under **Project Settings > Notifications**.",
        Platform::AzureDevops => "Subscribe the recipients to *Build fails* under **Project Settings > Notifications**.",
    }
}

pub fn render(req: &CicdRequest, pipeline: &Pipeline, output: &str) -> String {
    let platform = req.platform;
    let mut doc = String::new();
    // writes into a String cannot fail
    let _ = write_readme(&mut doc, req, pipeline, platform, output);
    doc
}

fn write_readme(
    doc: &mut String,
    req: &CicdRequest,
    pipeline: &Pipeline,
    platform: Platform,
    output: &str,
) -> std::fmt::Result {
    writeln!(doc, "# {} CI/CD", pipeline.project)?;
    writeln!(doc)?;
    writeln!(
        doc,
        "{} pipeline for the `{}` {} project.",
        platform.display_name(),
        pipeline.project,
        pipeline.language
    )?;
    writeln!(doc)?;
    writeln!(doc, "Pipeline definition: `{}`", output)?;
    writeln!(doc)?;

    writeln!(doc, "## Jobs")?;
    writeln!(doc)?;
    writeln!(doc, "| Job | Stage | Needs | Runs on |")?;
    writeln!(doc, "|---|---|---|---|")?;
    for job in &pipeline.jobs {
        let needs = if job.needs.is_empty() {
            "-".to_string()
        } else {
            job.needs.join(", ")
        };
        let runs_on = match &job.branch {
            Some(branch) => format!("`{}` pushes", branch),
            None => "every trigger".to_string(),
        };
        writeln!(doc, "| {} | {} | {} | {} |", job.name, job.stage, needs, runs_on)?;
    }
    writeln!(doc)?;
    let triggers = &pipeline.triggers;
    write!(doc, "Triggered by pushes to {}", triggers.branches.join(", "))?;
    if triggers.pull_requests {
        write!(doc, ", pull requests")?;
    }
    if triggers.tags {
        write!(doc, ", `v*` tags")?;
    }
    writeln!(doc, ".")?;
    writeln!(doc)?;

    if req.build.enabled {
        writeln!(doc, "## Image")?;
        writeln!(doc)?;
        writeln!(doc, "Built from `{}` and pushed as:", req.build.dockerfile)?;
        writeln!(doc)?;
        for tag in &pipeline.tags {
            writeln!(doc, "- `{}`", tag)?;
        }
        writeln!(doc)?;
    }

    let secrets = pipeline.secrets();
    if !secrets.is_empty() {
        writeln!(doc, "## Required secrets")?;
        writeln!(doc)?;
        writeln!(doc, "| Secret | Purpose |")?;
        writeln!(doc, "|---|---|")?;
        for (name, purpose) in &secrets {
            writeln!(doc, "| `{}` | {} |", name, purpose)?;
        }
        writeln!(doc)?;
        writeln!(doc, "{}", secret_setup(platform))?;
        writeln!(doc)?;
    }

    if req.deployment.enabled {
        let deployment = &req.deployment;
        writeln!(doc, "## Deployment")?;
        writeln!(doc)?;
        writeln!(
            doc,
            "Strategy: `{}`, default namespace `{}`.",
            deployment.strategy.as_str(),
            deployment.namespace
        )?;
        writeln!(doc)?;
        if req.environments.is_empty() {
            writeln!(doc, "Pushes to `main` deploy automatically.")?;
        } else {
            writeln!(doc, "| Environment | Branch | Namespace | Approval |")?;
            writeln!(doc, "|---|---|---|---|")?;
            for env in &req.environments {
                writeln!(
                    doc,
                    "| {} | {} | {} | {} |",
                    env.name,
                    env.branch.as_deref().unwrap_or("main"),
                    env.namespace.as_deref().unwrap_or(&deployment.namespace),
                    if env.requires_approval { "required" } else { "-" }
                )?;
            }
            if req.environments.iter().any(|e| e.requires_approval) {
                writeln!(doc)?;
                writeln!(doc, "{}", approval_note(platform))?;
            }
        }
        writeln!(doc)?;
    }

    let notify = &pipeline.notify;
    if !notify.is_empty() {
        writeln!(doc, "## Notifications")?;
        writeln!(doc)?;
        if let Some(slack) = &notify.slack {
            let mut events = Vec::new();
            if slack.on_failure {
                events.push("failure");
            }
            if slack.on_success {
                events.push("success");
            }
            write!(
                doc,
                "- Slack on {} through the webhook in `{}`",
                events.join(" and "),
                slack.webhook.secret
            )?;
            match &slack.channel {
                Some(channel) => writeln!(doc, ", posting to `{}`.", channel)?,
                None => writeln!(doc, ".")?,
            }
        }
        if !notify.email.is_empty() {
            writeln!(
                doc,
                "- E-mail to {}. {}",
                notify.email.join(", "),
                email_note(platform)
            )?;
        }
        writeln!(doc)?;
    }
    Ok(())
}
