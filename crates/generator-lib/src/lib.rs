//! Generator library for DevOps configuration artifacts
//!
//! This crate provides the core functionality for:
//! - Request schemas with defaults and field-level checks
//! - Kubernetes manifest generation
//! - Dockerfile generation
//! - Helm chart generation
//! - CI/CD pipeline generation for five platforms
//! - Advisory validation and observability

pub mod cicd;
pub mod dockerfile;
pub mod error;
pub mod helm;
pub mod manifest;
pub mod observability;
pub mod schema;
pub mod templates;
pub mod validation;
pub mod yaml;

use std::collections::BTreeMap;

/// Relative output path mapped to file contents
pub type FileSet = BTreeMap<String, String>;

pub use cicd::CicdGenerator;
pub use dockerfile::{DockerfileGenerator, DockerfileOutput};
pub use error::{GeneratorError, Result};
pub use helm::HelmChartGenerator;
pub use manifest::ManifestGenerator;
pub use observability::{GeneratorMetrics, StructuredLogger};
pub use schema::{FieldError, SchemaCheck};
pub use validation::{Category, Severity, ValidationResult, ValidationWarning};
