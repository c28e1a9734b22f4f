//! `.dockerignore` patterns

use crate::schema::Language;

const COMMON: &[&str] = &[
    ".git",
    ".gitignore",
    ".dockerignore",
    "Dockerfile*",
    "docker-compose*.yml",
    ".env",
    ".env.*",
    ".vscode",
    ".idea",
    "*.log",
    "*.md",
    "coverage",
    ".DS_Store",
];

fn language_patterns(language: Language) -> &'static [&'static str] {
    match language {
        Language::Nodejs => &[
            "node_modules",
            "npm-debug.log*",
            "yarn-error.log",
            ".pnpm-store",
            "dist",
            ".next/cache",
        ],
        Language::Python => &[
            "__pycache__",
            "*.py[cod]",
            ".venv",
            "venv",
            ".pytest_cache",
            ".mypy_cache",
            "*.egg-info",
            ".tox",
        ],
        Language::Go => &["bin", "*.test", "*.out"],
        Language::Java => &["target", "build", ".gradle", "*.class"],
        Language::Rust => &["target", "**/*.rs.bk"],
        Language::Dotnet => &["bin", "obj", "*.user", "*.suo"],
        Language::Php => &["vendor", "storage/logs", "storage/framework/cache", ".phpunit.result.cache"],
        Language::Ruby => &["vendor/bundle", ".bundle", "log", "tmp", "public/assets"],
    }
}

pub fn render(language: Language) -> String {
    let mut out = String::from("# Version control and editor files\n");
    for pattern in COMMON {
        out.push_str(pattern);
        out.push('\n');
    }
    out.push_str(&format!("\n# {} build artifacts and dependencies\n", language));
    for pattern in language_patterns(language) {
        out.push_str(pattern);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_specific_patterns() {
        assert!(render(Language::Nodejs).lines().any(|l| l == "node_modules"));
        assert!(render(Language::Python).lines().any(|l| l == "__pycache__"));
        assert!(render(Language::Rust).lines().any(|l| l == "target"));
        assert!(!render(Language::Go).lines().any(|l| l == "node_modules"));
    }

    #[test]
    fn test_common_patterns_always_present() {
        for language in Language::ALL {
            let out = render(language);
            assert!(out.lines().any(|l| l == ".git"));
            assert!(out.lines().any(|l| l == ".env"));
        }
    }
}
