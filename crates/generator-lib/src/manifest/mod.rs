//! Kubernetes manifest generation
//!
//! Converts one resource descriptor into a YAML document stream, with an
//! optional leading Namespace document.

mod advice;
mod builders;

use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::schema::manifest::{ManifestRequest, Resource};
use crate::yaml;

/// Generates a single Kubernetes resource from a validated request
pub struct ManifestGenerator<'a> {
    request: &'a ManifestRequest,
}

impl<'a> ManifestGenerator<'a> {
    pub fn new(request: &'a ManifestRequest) -> Self {
        Self { request }
    }

    /// Cleaned documents in output order
    pub fn documents(&self) -> Result<Vec<Value>> {
        let resource = self.request.resource()?;
        let mut docs = Vec::with_capacity(2);

        let namespace = &resource.metadata().namespace;
        if self.request.include_namespace && namespace != "default" {
            docs.push(builders::namespace(namespace));
        }

        docs.push(match resource {
            Resource::Deployment(d) => builders::deployment(d),
            Resource::Service(s) => builders::service(s),
            Resource::ConfigMap(c) => builders::config_map(c),
            Resource::Secret(s) => builders::secret(s),
            Resource::Ingress(i) => builders::ingress(i),
            Resource::PersistentVolumeClaim(p) => builders::persistent_volume_claim(p),
            Resource::HorizontalPodAutoscaler(h) => builders::horizontal_pod_autoscaler(h),
        });

        Ok(docs.into_iter().map(yaml::clean).collect())
    }

    /// Render the manifest as a `---` separated YAML stream
    pub fn generate(&self) -> Result<String> {
        let docs = self.documents()?;
        debug!(
            resource_type = %self.request.resource_type,
            documents = docs.len(),
            "Rendering manifest"
        );
        yaml::to_multi_document(&docs)
    }

    pub fn warnings(&self) -> Result<Vec<String>> {
        Ok(advice::warnings(self.request.resource()?))
    }

    pub fn suggestions(&self) -> Result<Vec<String>> {
        Ok(advice::suggestions(self.request.resource()?))
    }
}

#[cfg(test)]
mod tests;
