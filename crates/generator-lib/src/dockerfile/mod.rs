//! Dockerfile generation
//!
//! Assembles a Dockerfile from a language recipe, optionally split into a
//! builder stage and a minimal runtime stage, plus a `.dockerignore`.

mod advice;
mod dockerignore;
mod images;
mod languages;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::schema::dockerfile::{DockerfileRequest, HealthCheck};
use crate::validation::ValidationResult;

pub use images::{default_port, default_version, Distro};
use images::DISTROLESS_NONROOT;
use languages::Context;

/// Files produced for a Dockerfile request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerfileOutput {
    pub dockerfile: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerignore: Option<String>,
}

/// Quote a value for ENV/ARG when it contains anything beyond a safe set
fn quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:,=+@%".contains(c));
    if safe {
        value.to_string()
    } else {
        quoted(value)
    }
}

/// Always double-quoted, with `\` and `"` escaped
fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn exec_form(argv: &[String]) -> String {
    let parts: Vec<String> = argv
        .iter()
        .map(|a| format!("\"{}\"", a.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("[{}]", parts.join(", "))
}

#[derive(Default)]
struct Lines(Vec<String>);

impl Lines {
    fn push(&mut self, line: impl Into<String>) {
        self.0.push(line.into());
    }

    fn extend(&mut self, lines: impl IntoIterator<Item = String>) {
        self.0.extend(lines);
    }

    fn blank(&mut self) {
        if self.0.last().is_some_and(|l| !l.is_empty()) {
            self.0.push(String::new());
        }
    }

    fn finish(self) -> String {
        let mut out = self.0.join("\n");
        out.push('\n');
        out
    }
}

pub struct DockerfileGenerator<'a> {
    request: &'a DockerfileRequest,
}

impl<'a> DockerfileGenerator<'a> {
    pub fn new(request: &'a DockerfileRequest) -> Self {
        Self { request }
    }

    /// Requested runtime version or the pinned per-language default
    pub fn version(&self) -> &str {
        self.request
            .version
            .as_deref()
            .unwrap_or_else(|| default_version(self.request.language))
    }

    /// Port the application listens on, used by HEALTHCHECK and server commands
    pub fn port(&self) -> u32 {
        self.request
            .port
            .unwrap_or_else(|| default_port(self.request.language))
    }

    fn health_check(&self) -> Option<&HealthCheck> {
        self.request.health_check.as_ref().filter(|h| h.enabled)
    }

    pub fn generate(&self) -> DockerfileOutput {
        let dockerfile = self.render();
        debug!(
            language = %self.request.language,
            multi_stage = self.request.multi_stage.enabled,
            lines = dockerfile.lines().count(),
            "Rendered Dockerfile"
        );
        DockerfileOutput {
            dockerfile,
            dockerignore: self
                .request
                .generate_dockerignore
                .then(|| dockerignore::render(self.request.language)),
        }
    }

    pub fn validate(&self) -> ValidationResult {
        advice::validate(self.request, self.version())
    }

    fn render(&self) -> String {
        let req = self.request;
        let version = self.version();
        let images = images::select(req, version);
        let multi = req.multi_stage.enabled;
        let (build_image, final_image) = if multi {
            (&images.toolchain, &images.runtime)
        } else {
            (&images.single, &images.single)
        };
        let ctx = Context {
            request: req,
            version,
            port: self.port(),
            multi_stage: multi,
            toolchain: build_image.distro,
            runtime: final_image.distro,
        };
        let recipe = languages::recipe(&ctx);
        let distro = final_image.distro;
        let workdir = req.workdir.trim_end_matches('/');
        let workdir = if workdir.is_empty() { "/" } else { workdir };
        let user = &req.security.user;
        let non_root = req.security.non_root_user;

        let args: Vec<String> = req
            .build_args
            .iter()
            .map(|(k, v)| format!("ARG {}={}", k, quote(v)))
            .collect();

        let mut labels = vec![format!(
            "LABEL org.opencontainers.image.title={}",
            quoted(&req.project_name)
        )];
        labels.extend(
            req.labels
                .iter()
                .map(|(k, v)| format!("LABEL {}={}", k, quoted(v))),
        );

        let mut env: Vec<String> = recipe
            .env
            .iter()
            .map(|(k, v)| format!("ENV {}={}", k, quote(v)))
            .collect();
        env.extend(req.env_vars.iter().map(|(k, v)| format!("ENV {}={}", k, quote(v))));

        let mut packages = recipe.packages.clone();
        if distro == Distro::Debian && self.health_check().is_some_and(|h| h.command.is_none()) {
            packages.push("curl");
        }

        let mut out = Lines::default();
        out.push(format!(
            "# Dockerfile for {} ({} {})",
            req.project_name, req.language, version
        ));
        if multi {
            out.push(format!(
                "# Multi-stage build: '{}' compiles, '{}' runs",
                req.multi_stage.builder_stage_name, req.multi_stage.runtime_stage_name
            ));
        }
        out.blank();

        if multi {
            out.push(format!(
                "FROM {} AS {}",
                images.toolchain.reference, req.multi_stage.builder_stage_name
            ));
            out.push(format!("WORKDIR {}", workdir));
            out.extend(args);
            out.extend(recipe.build);
            out.blank();

            out.push(format!(
                "FROM {} AS {}",
                images.runtime.reference, req.multi_stage.runtime_stage_name
            ));
            out.push(format!("WORKDIR {}", workdir));
            out.extend(labels);
            out.extend(distro.install(&packages));
            out.extend(recipe.runtime_setup);
            out.extend(env);
            if non_root {
                out.extend(distro.create_user(user, req.security.uid));
            }
            let chown = if non_root && distro != Distro::Distroless {
                format!(" --chown={0}:{0}", user)
            } else {
                String::new()
            };
            for (src, dst) in &recipe.artifacts {
                out.push(format!(
                    "COPY --from={}{} {} {}",
                    req.multi_stage.builder_stage_name, chown, src, dst
                ));
            }
        } else {
            out.push(format!("FROM {}", images.single.reference));
            out.push(format!("WORKDIR {}", workdir));
            out.extend(args);
            out.extend(labels);
            out.extend(distro.install(&packages));
            out.extend(recipe.runtime_setup);
            out.extend(recipe.build);
            out.extend(env);
            if non_root {
                out.extend(
                    distro
                        .create_user(user, req.security.uid)
                        .map(|cmd| format!("{0} && chown -R {1}:{1} {2}", cmd, user, workdir)),
                );
            }
        }
        out.blank();

        if let Some(port) = req.port {
            out.push(format!("EXPOSE {}", port));
        }

        if let Some(hc) = self.health_check() {
            let probe = match (&hc.command, distro) {
                (Some(cmd), _) => Some(cmd.clone()),
                (None, Distro::Alpine) => Some(format!(
                    "wget --no-verbose --tries=1 --spider http://localhost:{}{} || exit 1",
                    self.port(),
                    hc.path
                )),
                (None, Distro::Debian) => Some(format!(
                    "curl -fsS http://localhost:{}{} || exit 1",
                    self.port(),
                    hc.path
                )),
                (None, Distro::Distroless) => None,
            };
            match probe {
                Some(cmd) if distro != Distro::Distroless => {
                    out.push(format!(
                        "HEALTHCHECK --interval={} --timeout={} --start-period={} --retries={} \\",
                        hc.interval, hc.timeout, hc.start_period, hc.retries
                    ));
                    out.push(format!("    CMD {}", cmd));
                }
                _ => out.push(
                    "# HEALTHCHECK omitted: distroless images have no shell or HTTP client, use orchestrator probes",
                ),
            }
        }

        if non_root {
            if distro == Distro::Distroless {
                out.push("# distroless images ship a nonroot user");
                out.push(format!("USER {}", DISTROLESS_NONROOT));
            } else {
                out.push(format!("USER {}", user));
            }
        }

        match &req.start_command {
            Some(cmd) => out.push(format!("CMD {}", cmd.trim())),
            None => out.push(format!("CMD {}", exec_form(&recipe.command))),
        }

        out.finish()
    }
}

#[cfg(test)]
mod tests;
