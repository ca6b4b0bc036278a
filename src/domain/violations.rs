//! Core domain models for anchor violations and validation results
//!
//! Architecture: Rich Domain Models - Violations carry their own display rules
//! - A Violation knows how to render its description and optional detail
//! - ValidationReport is the aggregate root collecting violations and skipped rules
//! - The pass/fail decision is made once, over the whole accumulated report

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A single failed rule detected during validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Identifier of the rule that failed
    pub rule_id: String,
    /// Human-readable description of the failure
    pub message: String,
    /// Extra diagnostic, e.g. `count=2` for a duplicated marker
    pub detail: Option<String>,
    /// `Object.method` scope for rules evaluated against an extracted body
    pub scope: Option<String>,
    /// 1-indexed lines of the offending occurrences, when there are any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<u32>,
}

impl Violation {
    /// Create a new violation
    pub fn new(rule_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            message: message.into(),
            detail: None,
            scope: None,
            lines: Vec::new(),
        }
    }

    /// Attach a diagnostic detail
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Attach the method scope the rule was evaluated in
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Attach the lines where the offending text occurs
    pub fn with_lines(mut self, lines: Vec<u32>) -> Self {
        self.lines = lines;
        self
    }

    /// Format violation for display: `message: detail` or just `message`
    pub fn format_display(&self) -> String {
        match &self.detail {
            Some(detail) => format!("{}: {}", self.message, detail),
            None => self.message.clone(),
        }
    }
}

/// A scoped rule that was not evaluated because its method body is missing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRule {
    pub rule_id: String,
    pub scope: String,
}

/// Summary statistics for a validation report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationSummary {
    /// Number of rules in the battery
    pub rules_total: usize,
    /// Number of rules actually evaluated (total minus skipped)
    pub rules_evaluated: usize,
    /// Number of evaluated rules that passed
    pub rules_passed: usize,
    /// Anchor groups covered by the battery, in first-seen order
    pub groups_checked: Vec<String>,
    /// Total execution time in milliseconds
    pub execution_time_ms: u64,
    /// Timestamp when validation was performed
    pub validated_at: DateTime<Utc>,
}

impl ValidationSummary {
    pub fn rules_skipped(&self) -> usize {
        self.rules_total.saturating_sub(self.rules_evaluated)
    }
}

/// Complete validation report for one target file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// File that was validated
    pub target: PathBuf,
    /// Failed rules, in evaluation order
    pub violations: Vec<Violation>,
    /// Scoped rules skipped because their extraction failed
    pub skipped: Vec<SkippedRule>,
    /// Summary statistics
    pub summary: ValidationSummary,
    /// SHA-256 of the validated source text
    pub source_digest: Option<String>,
    /// Configuration used for this validation
    pub config_fingerprint: Option<String>,
}

impl ValidationReport {
    /// Create a new empty validation report
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            violations: Vec::new(),
            skipped: Vec::new(),
            summary: ValidationSummary {
                validated_at: Utc::now(),
                ..Default::default()
            },
            source_digest: None,
            config_fingerprint: None,
        }
    }

    /// Record a failed rule
    pub fn add_violation(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    /// Record a rule that could not be evaluated
    pub fn add_skipped(&mut self, rule_id: impl Into<String>, scope: impl Into<String>) {
        self.skipped.push(SkippedRule {
            rule_id: rule_id.into(),
            scope: scope.into(),
        });
    }

    /// Whether the report contains any violations
    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// A run passes only when no rule failed
    pub fn passed(&self) -> bool {
        !self.has_violations()
    }

    /// Look up a violation by rule id
    pub fn violation(&self, rule_id: &str) -> Option<&Violation> {
        self.violations.iter().find(|v| v.rule_id == rule_id)
    }

    /// Whether the given rule was skipped
    pub fn was_skipped(&self, rule_id: &str) -> bool {
        self.skipped.iter().any(|s| s.rule_id == rule_id)
    }

    /// Set the execution time
    pub fn set_execution_time(&mut self, duration_ms: u64) {
        self.summary.execution_time_ms = duration_ms;
    }

    /// Set the source digest
    pub fn set_source_digest(&mut self, digest: impl Into<String>) {
        self.source_digest = Some(digest.into());
    }

    /// Set the configuration fingerprint
    pub fn set_config_fingerprint(&mut self, fingerprint: impl Into<String>) {
        self.config_fingerprint = Some(fingerprint.into());
    }
}

/// Error types that can occur during validation
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    /// The target userscript does not exist
    #[error("target userscript not found: {}", .path.display())]
    TargetNotFound { path: PathBuf },

    /// Configuration file could not be loaded, parsed or validated
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// File could not be read or accessed
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Pattern compilation failed
    #[error("Pattern error: {message}")]
    Pattern { message: String },
}

impl GuardError {
    /// Create a target-not-found error
    pub fn target_not_found(path: impl Into<PathBuf>) -> Self {
        Self::TargetNotFound { path: path.into() }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a pattern error
    pub fn pattern(message: impl Into<String>) -> Self {
        Self::Pattern {
            message: message.into(),
        }
    }
}

/// Result type for guard operations
pub type GuardResult<T> = Result<T, GuardError>;
