//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print any response as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Color a warning severity
pub fn color_severity(severity: &str) -> String {
    match severity {
        "high" => severity.red().bold().to_string(),
        "medium" => severity.yellow().to_string(),
        "low" => severity.blue().to_string(),
        _ => severity.to_string(),
    }
}

/// Color a health status
pub fn color_status(status: &str) -> String {
    match status {
        "ok" => status.green().to_string(),
        _ => status.red().to_string(),
    }
}

/// Format a byte count as a human-readable string
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;

    if bytes >= KB {
        format!("{:.1}Ki", bytes as f64 / KB as f64)
    } else {
        format!("{}B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512B");
        assert_eq!(format_size(2048), "2.0Ki");
    }

    #[test]
    fn test_color_severity_keeps_text() {
        colored::control::set_override(false);
        assert_eq!(color_severity("high"), "high");
        assert_eq!(color_status("ok"), "ok");
    }
}
