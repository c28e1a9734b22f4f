//! CI/CD pipeline generation
//!
//! A request is lowered once into the platform-neutral [`ir::Pipeline`];
//! each platform module renders that model into its own dialect.

mod advice;
mod azure;
mod circleci;
mod github;
mod gitlab;
pub mod helpers;
pub mod ir;
mod jenkins;
mod readme;

use tracing::debug;

use crate::error::Result;
use crate::schema::cicd::{CicdRequest, Platform};
use crate::validation::ValidationResult;
use crate::FileSet;

pub use helpers::CiVars;
pub use ir::Pipeline;

/// Output path and tag variables for a platform
pub fn platform_target(platform: Platform) -> (&'static str, CiVars<'static>) {
    match platform {
        Platform::GithubActions => (github::PATH, github::VARS),
        Platform::GitlabCi => (gitlab::PATH, gitlab::VARS),
        Platform::Jenkins => (jenkins::PATH, jenkins::VARS),
        Platform::Circleci => (circleci::PATH, circleci::VARS),
        Platform::AzureDevops => (azure::PATH, azure::VARS),
    }
}

pub struct CicdGenerator<'a> {
    request: &'a CicdRequest,
}

impl<'a> CicdGenerator<'a> {
    pub fn new(request: &'a CicdRequest) -> Self {
        Self { request }
    }

    /// The platform-neutral pipeline for this request
    pub fn pipeline(&self) -> Pipeline {
        let (_, vars) = platform_target(self.request.platform);
        Pipeline::build(self.request, &vars)
    }

    pub fn generate(&self) -> Result<FileSet> {
        let platform = self.request.platform;
        let (path, _) = platform_target(platform);
        let pipeline = self.pipeline();

        let definition = match platform {
            Platform::GithubActions => github::render(&pipeline)?,
            Platform::GitlabCi => gitlab::render(&pipeline)?,
            Platform::Jenkins => jenkins::render(&pipeline),
            Platform::Circleci => circleci::render(&pipeline)?,
            Platform::AzureDevops => azure::render(&pipeline)?,
        };

        let mut files = FileSet::new();
        files.insert(path.to_string(), definition);
        files.insert(
            readme::PATH.to_string(),
            readme::render(self.request, &pipeline, path),
        );
        debug!(
            platform = %platform,
            jobs = pipeline.jobs.len(),
            "Rendered CI/CD pipeline"
        );
        Ok(files)
    }

    pub fn validate(&self) -> ValidationResult {
        advice::validate(self.request)
    }
}

#[cfg(test)]
mod tests;
