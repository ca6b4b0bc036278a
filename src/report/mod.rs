//! Report generation for validation results
//!
//! CDD Principle: Anti-Corruption Layer - Formatters translate domain objects to external formats
//! - ValidationReport (domain) is rendered as terminal text or JSON
//! - Human output mirrors the CI log shape: a status header plus one bullet per line
//! - Path display relative to the working directory is a presentation concern kept here

use crate::domain::violations::{GuardError, GuardResult, ValidationReport};
use serde_json::Value as JsonValue;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

/// Supported output formats for validation reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable status lines
    Human,
    /// JSON format for programmatic consumption
    Json,
}

impl OutputFormat {
    /// Parse format from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "human" => Some(Self::Human),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Options for customizing report output
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    /// Whether to use colored output (for human format)
    pub use_colors: bool,
    /// Directory target paths are displayed relative to
    pub base_dir: Option<PathBuf>,
}

#[derive(Clone, Copy)]
enum Tone {
    Pass,
    Fail,
}

/// Report formatter that dispatches to specific formats
#[derive(Debug, Clone, Default)]
pub struct ReportFormatter {
    options: ReportOptions,
}

impl ReportFormatter {
    /// Create a new report formatter with options
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    /// Format a validation report in the specified format
    pub fn format_report(
        &self,
        report: &ValidationReport,
        format: OutputFormat,
    ) -> GuardResult<String> {
        match format {
            OutputFormat::Human => Ok(self.format_human(report)),
            OutputFormat::Json => self.format_json(report),
        }
    }

    /// Write a formatted report to a writer
    pub fn write_report<W: Write>(
        &self,
        report: &ValidationReport,
        format: OutputFormat,
        mut writer: W,
    ) -> GuardResult<()> {
        let formatted = self.format_report(report, format)?;
        writer.write_all(formatted.as_bytes())?;
        Ok(())
    }

    /// Target path as it should be shown to the user
    pub fn display_path(&self, path: &Path) -> PathBuf {
        match &self.options.base_dir {
            Some(base) => relative_path(path, base),
            None => path.to_path_buf(),
        }
    }

    /// Format report in human-readable form
    fn format_human(&self, report: &ValidationReport) -> String {
        let mut output = String::new();

        if report.passed() {
            output.push_str(&self.paint("✅ UI static validation passed", Tone::Pass));
            output.push('\n');
            output.push_str(&format!(
                "- userscript: {}\n",
                self.display_path(&report.target).display()
            ));
            output.push_str(&format!(
                "- anchors checked: {}\n",
                report.summary.groups_checked.join(", ")
            ));
        } else {
            output.push_str(&self.paint("❌ UI static validation failed:", Tone::Fail));
            output.push('\n');
            for violation in &report.violations {
                output.push_str(&format!("- {}\n", violation.format_display()));
            }
        }

        output
    }

    /// Format report in JSON format
    fn format_json(&self, report: &ValidationReport) -> GuardResult<String> {
        let json_report: JsonValue = serde_json::json!({
            "target": self.display_path(&report.target).display().to_string(),
            "passed": report.passed(),
            "violations": report.violations,
            "skipped": report.skipped,
            "summary": {
                "rules_total": report.summary.rules_total,
                "rules_evaluated": report.summary.rules_evaluated,
                "rules_passed": report.summary.rules_passed,
                "rules_skipped": report.summary.rules_skipped(),
                "groups_checked": report.summary.groups_checked,
                "execution_time_ms": report.summary.execution_time_ms,
                "validated_at": report.summary.validated_at.to_rfc3339()
            },
            "source_digest": report.source_digest,
            "config_fingerprint": report.config_fingerprint
        });

        serde_json::to_string_pretty(&json_report)
            .map_err(|e| GuardError::config(format!("JSON serialization failed: {e}")))
    }

    #[cfg(feature = "colors")]
    fn paint(&self, text: &str, tone: Tone) -> String {
        use colored::Colorize;

        if !self.options.use_colors {
            return text.to_string();
        }
        match tone {
            Tone::Pass => text.green().bold().to_string(),
            Tone::Fail => text.red().bold().to_string(),
        }
    }

    #[cfg(not(feature = "colors"))]
    fn paint(&self, text: &str, _tone: Tone) -> String {
        text.to_string()
    }
}

/// Express `path` relative to `base`, falling back to `path` across roots
pub fn relative_path(path: &Path, base: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix(base) {
        return if stripped.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            stripped.to_path_buf()
        };
    }

    let path_parts: Vec<Component> = path.components().collect();
    let base_parts: Vec<Component> = base.components().collect();
    let common = path_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();

    if common == 0 {
        return path.to_path_buf();
    }

    let mut relative = PathBuf::new();
    for _ in common..base_parts.len() {
        relative.push("..");
    }
    for part in &path_parts[common..] {
        relative.push(part.as_os_str());
    }
    relative
}
