//! Userscript Guard - Static anchor validation for browser userscripts
//!
//! Architecture: Clean Architecture - Library interface serves as the application layer
//! - Pure domain logic separated from file system and terminal concerns
//! - Rules are data (configuration), the engine only evaluates them
//! - One call validates one file and returns the complete set of violations

pub mod analyzer;
pub mod config;
pub mod domain;
pub mod patterns;
pub mod report;

// Re-export main types for convenient access
pub use domain::violations::{
    GuardError, GuardResult, SkippedRule, ValidationReport, ValidationSummary, Violation,
};

pub use config::{CheckDef, ConfigBuilder, GuardConfig, MethodRef, RuleDef, DEFAULT_TARGET};

pub use analyzer::{Analyzer, RuleStats};

pub use patterns::{extract_method_body, MethodBody, RuleEngine};

pub use report::{OutputFormat, ReportFormatter, ReportOptions};

use std::path::{Component, Path, PathBuf};

/// Main validator providing high-level validation operations
pub struct GuardValidator {
    analyzer: Analyzer,
    report_formatter: ReportFormatter,
}

impl GuardValidator {
    /// Create a new validator with the given configuration
    pub fn new_with_config(config: GuardConfig) -> GuardResult<Self> {
        let analyzer = Analyzer::new(config)?;
        let report_formatter = ReportFormatter::default();

        Ok(Self { analyzer, report_formatter })
    }

    /// Create a validator with the built-in rule battery
    pub fn new() -> GuardResult<Self> {
        Self::new_with_config(GuardConfig::default())
    }

    /// Create a validator loading configuration from file
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> GuardResult<Self> {
        let config = GuardConfig::load_from_file(path)?;
        Self::new_with_config(config)
    }

    /// Create a validator from the config file in `dir`, or the defaults
    pub fn discover<P: AsRef<Path>>(dir: P) -> GuardResult<Self> {
        let config = GuardConfig::discover(dir)?;
        Self::new_with_config(config)
    }

    /// Set custom report formatter
    pub fn with_report_formatter(mut self, formatter: ReportFormatter) -> Self {
        self.report_formatter = formatter;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &GuardConfig {
        self.analyzer.config()
    }

    /// Path to validate for an optional CLI argument
    pub fn resolve_target(&self, arg: Option<&Path>, cwd: &Path) -> PathBuf {
        resolve_target(arg, cwd, &self.config().target)
    }

    /// Validate a userscript on disk
    pub fn validate_file<P: AsRef<Path>>(&self, file_path: P) -> GuardResult<ValidationReport> {
        self.analyzer.analyze_file(file_path)
    }

    /// Validate source text already in memory
    pub fn validate_source<P: AsRef<Path>>(&self, file_path: P, source: &str) -> ValidationReport {
        self.analyzer.analyze_source(file_path, source)
    }

    /// Format a validation report for output
    pub fn format_report(
        &self,
        report: &ValidationReport,
        format: OutputFormat,
    ) -> GuardResult<String> {
        self.report_formatter.format_report(report, format)
    }

    /// Get rule statistics
    pub fn rule_statistics(&self) -> RuleStats {
        self.analyzer.rule_stats()
    }
}

/// Resolve the target path: the argument against `cwd`, or `default_name` in `cwd`
pub fn resolve_target(arg: Option<&Path>, cwd: &Path, default_name: &str) -> PathBuf {
    let path = match arg {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => cwd.join(path),
        None => cwd.join(default_name),
    };
    normalize_path(&path)
}

/// Lexically remove `.` and `..` components without touching the file system
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Convenience function to create a validator with default settings
pub fn create_validator() -> GuardResult<GuardValidator> {
    GuardValidator::new()
}

/// Convenience function to validate one file with the built-in rules
pub fn validate_file<P: AsRef<Path>>(file_path: P) -> GuardResult<ValidationReport> {
    GuardValidator::new()?.validate_file(file_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const VALID: &str = include_str!("../tests/fixtures/valid.user.js");

    #[test]
    fn test_validator_creation() {
        let validator = GuardValidator::new().unwrap();
        let stats = validator.rule_statistics();

        assert_eq!(stats.total_rules, 22);
        assert_eq!(validator.config().target, DEFAULT_TARGET);
    }

    #[test]
    fn test_validate_file() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join(DEFAULT_TARGET);
        fs::write(&target, VALID).unwrap();

        let report = validate_file(&target).unwrap();
        assert!(report.passed());
    }

    #[test]
    fn test_validate_source_reports_all_failures() {
        let validator = create_validator().unwrap();
        let source = VALID
            .replace(":focus-visible", ":focus")
            .replace("DesignSystem.ensureChat();\n            StyleManager.injectOnce(DesignSystem.STYLE_IDS.LINUX_DO", "StyleManager.injectOnce(DesignSystem.STYLE_IDS.LINUX_DO");
        let report = validator.validate_source("app.user.js", &source);

        let ids: Vec<&str> = report.violations.iter().map(|v| v.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["ui_ensure_chat", "focus_visible"]);
    }

    #[test]
    fn test_report_formatting() {
        let validator = GuardValidator::new().unwrap().with_report_formatter(
            ReportFormatter::new(ReportOptions {
                use_colors: false,
                base_dir: Some(PathBuf::from("/repo")),
            }),
        );
        let report = validator.validate_source("/repo/app.user.js", VALID);

        let human = validator.format_report(&report, OutputFormat::Human).unwrap();
        assert!(human.contains("- userscript: app.user.js"));
        assert!(human.contains("- anchors checked: tokens, chat, NotionSiteUI.injectStyles"));

        let json = validator.format_report(&report, OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["passed"], true);
    }

    #[test]
    fn test_discover_uses_config_target() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConfigBuilder::new().target("custom.user.js").build().unwrap();
        fs::write(
            temp_dir.path().join("userscript_guard.yaml"),
            config.to_yaml().unwrap(),
        )
        .unwrap();

        let validator = GuardValidator::discover(temp_dir.path()).unwrap();
        assert_eq!(
            validator.resolve_target(None, temp_dir.path()),
            temp_dir.path().join("custom.user.js")
        );
    }

    #[test]
    fn test_resolve_target() {
        let cwd = Path::new("/work/repo");
        assert_eq!(
            resolve_target(None, cwd, DEFAULT_TARGET),
            PathBuf::from("/work/repo").join(DEFAULT_TARGET)
        );
        assert_eq!(
            resolve_target(Some(Path::new("dist/app.user.js")), cwd, DEFAULT_TARGET),
            PathBuf::from("/work/repo/dist/app.user.js")
        );
        assert_eq!(
            resolve_target(Some(Path::new("../other/./app.user.js")), cwd, DEFAULT_TARGET),
            PathBuf::from("/work/other/app.user.js")
        );
        assert_eq!(
            resolve_target(Some(Path::new("/abs/app.user.js")), cwd, DEFAULT_TARGET),
            PathBuf::from("/abs/app.user.js")
        );
    }
}
