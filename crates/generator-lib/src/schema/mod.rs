//! Request schemas
//!
//! Typed request bodies for the four generators. Serde supplies structural
//! validation and schema defaults; `SchemaCheck` adds the constraints serde
//! cannot express (name patterns, port ranges, tag/sub-object agreement).

pub mod cicd;
pub mod dockerfile;
pub mod helm;
pub mod manifest;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Kubernetes DNS-1123 label
static DNS_1123_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("valid DNS-1123 regex"));

/// Maximum DNS-1123 label length
pub const DNS_LABEL_MAX: usize = 63;

/// Application language, shared by the Dockerfile and CI/CD schemas
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Nodejs,
    Python,
    Go,
    Java,
    Rust,
    Dotnet,
    Php,
    Ruby,
}

impl Language {
    pub const ALL: [Language; 8] = [
        Language::Nodejs,
        Language::Python,
        Language::Go,
        Language::Java,
        Language::Rust,
        Language::Dotnet,
        Language::Php,
        Language::Ruby,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Nodejs => "nodejs",
            Language::Python => "python",
            Language::Go => "go",
            Language::Java => "java",
            Language::Rust => "rust",
            Language::Dotnet => "dotnet",
            Language::Php => "php",
            Language::Ruby => "ruby",
        }
    }

    /// Languages that produce a native or bytecode artifact at build time
    pub fn is_compiled(&self) -> bool {
        matches!(
            self,
            Language::Go | Language::Java | Language::Rust | Language::Dotnet
        )
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single rejected field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Constraint checks run on a deserialized request before it reaches a generator
pub trait SchemaCheck {
    /// Append every violation found to `errors`
    fn check(&self, errors: &mut Vec<FieldError>);

    /// Collect violations; `Ok` when there are none
    fn check_all(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        self.check(&mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

pub fn is_dns_label(name: &str) -> bool {
    name.len() <= DNS_LABEL_MAX && DNS_1123_LABEL.is_match(name)
}

pub(crate) fn check_dns_label(field: &str, name: &str, errors: &mut Vec<FieldError>) {
    if !is_dns_label(name) {
        errors.push(FieldError::new(
            field,
            format!(
                "'{}' must be a DNS-1123 label: lowercase alphanumerics or '-', starting and ending alphanumeric, at most {} characters",
                name, DNS_LABEL_MAX
            ),
        ));
    }
}

pub(crate) fn check_non_empty(field: &str, value: &str, errors: &mut Vec<FieldError>) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, "must not be empty"));
    }
}

pub(crate) fn check_port(field: &str, port: u32, errors: &mut Vec<FieldError>) {
    if port == 0 || port > 65535 {
        errors.push(FieldError::new(field, format!("port {} is outside 1-65535", port)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dns_label_accepts_valid_names() {
        assert!(is_dns_label("web"));
        assert!(is_dns_label("my-app-2"));
        assert!(is_dns_label("a"));
    }

    #[test]
    fn test_dns_label_rejects_invalid_names() {
        assert!(!is_dns_label(""));
        assert!(!is_dns_label("MyApp"));
        assert!(!is_dns_label("-web"));
        assert!(!is_dns_label("web-"));
        assert!(!is_dns_label("web_app"));
        assert!(!is_dns_label(&"a".repeat(64)));
    }

    #[test]
    fn test_check_port_bounds() {
        let mut errors = Vec::new();
        check_port("p", 0, &mut errors);
        check_port("p", 80, &mut errors);
        check_port("p", 70000, &mut errors);
        assert_eq!(errors.len(), 2);
    }
}
