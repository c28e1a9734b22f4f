//! Helm chart generation
//!
//! `Chart.yaml`, `values.yaml` and the environment overlays are built as data
//! and serialized. Everything under `templates/` is Helm template text.

mod advice;
mod templates;
mod values;

use serde_json::json;
use tracing::debug;

use crate::error::Result;
use crate::schema::helm::{HelmChartRequest, TemplateStyle};
use crate::validation::ValidationResult;
use crate::{yaml, FileSet};

pub use values::HelmValues;

pub struct HelmChartGenerator<'a> {
    request: &'a HelmChartRequest,
}

impl<'a> HelmChartGenerator<'a> {
    pub fn new(request: &'a HelmChartRequest) -> Self {
        Self { request }
    }

    fn chart(&self) -> &str {
        &self.request.metadata.name
    }

    /// Merged values.yaml content
    pub fn values(&self) -> HelmValues {
        HelmValues::resolve(
            self.chart(),
            self.request.values.as_ref(),
            &self.request.options,
        )
    }

    pub fn generate(&self) -> Result<FileSet> {
        let req = self.request;
        let opts = &req.options;
        let input = req.values.as_ref();
        let values = self.values();
        let mut files = FileSet::new();

        files.insert("Chart.yaml".into(), self.chart_yaml()?);
        files.insert("values.yaml".into(), yaml::to_yaml(&values)?);
        files.insert(".helmignore".into(), templates::HELMIGNORE.to_string());

        if opts.include_helpers {
            files.insert(
                "templates/_helpers.tpl".into(),
                templates::render(templates::HELPERS, self.chart()),
            );
        }
        self.template(&mut files, "deployment.yaml", templates::DEPLOYMENT);
        self.template(&mut files, "service.yaml", templates::SERVICE);

        if input.is_some_and(|v| v.ingress.is_some()) {
            self.template(&mut files, "ingress.yaml", templates::INGRESS);
        }
        if input.is_some_and(|v| v.autoscaling.is_some()) {
            self.template(&mut files, "hpa.yaml", templates::HPA);
        }
        if input.is_some_and(|v| v.service_account.is_some()) {
            self.template(&mut files, "serviceaccount.yaml", templates::SERVICE_ACCOUNT);
        }
        if !values.config_maps.is_empty() {
            let names = values.config_maps.iter().map(|c| c.name.as_str());
            let body = self.per_entry(templates::CONFIG_MAP, names);
            self.template(&mut files, "configmap.yaml", &body);
        }
        if !values.secrets.is_empty() {
            let names = values.secrets.iter().map(|s| s.name.as_str());
            let body = self.per_entry(templates::SECRET, names);
            self.template(&mut files, "secret.yaml", &body);
        }
        if opts.include_pod_disruption_budget {
            self.template(&mut files, "poddisruptionbudget.yaml", templates::POD_DISRUPTION_BUDGET);
        }
        if opts.include_service_monitor {
            self.template(&mut files, "servicemonitor.yaml", templates::SERVICE_MONITOR);
        }
        if opts.include_network_policy {
            self.template(&mut files, "networkpolicy.yaml", templates::NETWORK_POLICY);
        }
        if opts.include_hooks {
            self.template(&mut files, "hooks/pre-install-job.yaml", templates::PRE_INSTALL_HOOK);
        }
        if opts.include_tests {
            self.template(&mut files, "tests/test-connection.yaml", templates::TEST_CONNECTION);
        }
        if opts.include_notes {
            // NOTES.txt is shown to users verbatim, so it never gets a header
            files.insert(
                "templates/NOTES.txt".into(),
                templates::render(templates::NOTES, self.chart()),
            );
        }

        if opts.generate_environment_values {
            for env in &req.environments {
                let overlay = yaml::clean(values::environment_overlay(env, &values));
                files.insert(format!("values-{}.yaml", env.name), yaml::to_yaml(&overlay)?);
            }
        }

        debug!(chart = %self.chart(), files = files.len(), "Rendered Helm chart");
        Ok(files)
    }

    pub fn validate(&self) -> ValidationResult {
        advice::validate(self.request, &self.values())
    }

    fn chart_yaml(&self) -> Result<String> {
        let meta = &self.request.metadata;
        let chart = json!({
            "apiVersion": meta.api_version,
            "name": meta.name,
            "description": meta.description.clone()
                .unwrap_or_else(|| format!("A Helm chart for {}", meta.name)),
            "type": meta.chart_type,
            "version": meta.version,
            "appVersion": meta.app_version,
            "keywords": meta.keywords,
            "home": meta.home,
            "sources": meta.sources,
            "maintainers": meta.maintainers,
            "icon": meta.icon,
            "dependencies": self.request.dependencies,
        });
        yaml::to_yaml(&yaml::clean(chart))
    }

    /// Insert `templates/<name>` with the chart name substituted
    fn template(&self, files: &mut FileSet, name: &str, source: &str) {
        let mut body = String::new();
        if self.request.template_style == TemplateStyle::Standard {
            body.push_str(&format!("{{{{/* {} for the {} chart */}}}}\n", name, self.chart()));
        }
        body.push_str(&templates::render(source, self.chart()));
        files.insert(format!("templates/{}", name), body);
    }

    /// One document per named entry, `---` separated
    fn per_entry<'n>(&self, source: &str, names: impl Iterator<Item = &'n str>) -> String {
        names
            .enumerate()
            .map(|(i, name)| {
                source
                    .replace("%INDEX%", &i.to_string())
                    .replace("%NAME%", name)
            })
            .collect::<Vec<_>>()
            .join(yaml::DOCUMENT_SEPARATOR)
    }
}
