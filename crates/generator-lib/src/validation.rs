//! Advisory validation results shared by the Dockerfile, Helm and CI/CD generators

use serde::{Deserialize, Serialize};

/// Warning severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

/// What a warning is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Security,
    Performance,
    BestPractice,
    Size,
    Reliability,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Security => write!(f, "security"),
            Category::Performance => write!(f, "performance"),
            Category::BestPractice => write!(f, "best-practice"),
            Category::Size => write!(f, "size"),
            Category::Reliability => write!(f, "reliability"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationWarning {
    pub severity: Severity,
    pub category: Category,
    pub message: String,
    /// Input field the warning refers to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ValidationWarning {
    pub fn new(severity: Severity, category: Category, message: impl Into<String>) -> Self {
        Self {
            severity,
            category,
            message: message.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

/// Outcome of a `validate` call. Never blocks generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub warnings: Vec<ValidationWarning>,
    pub suggestions: Vec<String>,
}

impl ValidationResult {
    /// Build a result; `valid` is false iff some warning is high severity.
    pub fn new(warnings: Vec<ValidationWarning>, suggestions: Vec<String>) -> Self {
        let valid = !warnings.iter().any(|w| w.severity == Severity::High);
        Self {
            valid,
            warnings,
            suggestions,
        }
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.warnings.iter().filter(|w| w.severity == severity).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_without_high_warnings() {
        let result = ValidationResult::new(
            vec![
                ValidationWarning::new(Severity::Low, Category::Size, "a"),
                ValidationWarning::new(Severity::Medium, Category::BestPractice, "b"),
            ],
            vec![],
        );
        assert!(result.valid);
        assert_eq!(result.count(Severity::Medium), 1);
    }

    #[test]
    fn test_invalid_with_high_warning() {
        let result = ValidationResult::new(
            vec![ValidationWarning::new(Severity::High, Category::Security, "root")],
            vec![],
        );
        assert!(!result.valid);
    }

    #[test]
    fn test_warning_serializes_lowercase() {
        let w = ValidationWarning::new(Severity::High, Category::BestPractice, "x").with_field("security");
        let json = serde_json::to_value(&w).unwrap();
        assert_eq!(json["severity"], "high");
        assert_eq!(json["category"], "best-practice");
        assert_eq!(json["field"], "security");
    }
}
