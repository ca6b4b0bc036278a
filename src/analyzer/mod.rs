//! Main analysis orchestrator for Userscript Guard
//!
//! CDD Principle: Domain Services - Analyzer orchestrates one validation cycle
//! - Reads the target file once and hands the text to the rule engine
//! - Stamps the report with timing, a content digest and the config fingerprint
//! - A missing target is the only condition that stops evaluation up front

use crate::config::{CheckDef, GuardConfig};
use crate::domain::violations::{GuardError, GuardResult, ValidationReport};
use crate::patterns::RuleEngine;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use std::time::Instant;

/// Main analyzer that runs the rule battery against a userscript
pub struct Analyzer {
    /// Configuration for this analysis
    config: GuardConfig,
    /// Compiled rule battery
    engine: RuleEngine,
}

impl Analyzer {
    /// Create a new analyzer with the given configuration
    pub fn new(config: GuardConfig) -> GuardResult<Self> {
        let engine = RuleEngine::new(&config)?;
        Ok(Self { config, engine })
    }

    /// Create an analyzer with the built-in rule battery
    pub fn with_defaults() -> GuardResult<Self> {
        Self::new(GuardConfig::default())
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Read and validate a userscript file
    pub fn analyze_file<P: AsRef<Path>>(&self, file_path: P) -> GuardResult<ValidationReport> {
        let file_path = file_path.as_ref();

        if !file_path.is_file() {
            return Err(GuardError::target_not_found(file_path));
        }

        let content = fs::read_to_string(file_path)?;
        tracing::debug!(
            "Read {} ({} bytes)",
            file_path.display(),
            content.len()
        );

        Ok(self.analyze_source(file_path, &content))
    }

    /// Validate source text that has already been read
    pub fn analyze_source<P: AsRef<Path>>(&self, file_path: P, content: &str) -> ValidationReport {
        let start_time = Instant::now();
        let mut report = ValidationReport::new(file_path.as_ref());

        self.engine.evaluate(content, &mut report);

        report.summary.groups_checked = self.config.groups();
        report.set_source_digest(content_digest(content));
        report.set_config_fingerprint(self.config.fingerprint());
        report.set_execution_time(start_time.elapsed().as_millis() as u64);

        tracing::info!(
            "Validated {}: {} violations, {} of {} rules evaluated",
            report.target.display(),
            report.violations.len(),
            report.summary.rules_evaluated,
            report.summary.rules_total
        );

        report
    }

    /// Get statistics about the configured rules
    pub fn rule_stats(&self) -> RuleStats {
        let mut stats = RuleStats {
            scopes: self.engine.scope_count(),
            groups: self.config.groups().len(),
            ..Default::default()
        };

        for rule in &self.config.rules {
            stats.total_rules += 1;
            match rule.check {
                CheckDef::Contains { .. } => stats.presence_rules += 1,
                CheckDef::Count { .. } => stats.count_rules += 1,
                CheckDef::Extract { .. } => stats.extract_rules += 1,
                CheckDef::ScopedContains { .. } | CheckDef::ScopedAbsent { .. } => {
                    stats.scoped_rules += 1
                }
            }
        }

        stats
    }
}

/// Statistics about the configured rule battery
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RuleStats {
    pub total_rules: usize,
    pub presence_rules: usize,
    pub count_rules: usize,
    pub extract_rules: usize,
    pub scoped_rules: usize,
    pub scopes: usize,
    pub groups: usize,
}

/// Hex SHA-256 of the validated text
fn content_digest(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const VALID: &str = include_str!("../../tests/fixtures/valid.user.js");

    #[test]
    fn test_analyzer_creation() {
        let analyzer = Analyzer::with_defaults().unwrap();
        let stats = analyzer.rule_stats();

        assert_eq!(stats.total_rules, 22);
        assert_eq!(stats.presence_rules, 7);
        assert_eq!(stats.count_rules, 1);
        assert_eq!(stats.extract_rules, 3);
        assert_eq!(stats.scoped_rules, 11);
        assert_eq!(stats.scopes, 3);
        assert_eq!(stats.groups, 6);
    }

    #[test]
    fn test_single_file_analysis() -> GuardResult<()> {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("valid.user.js");
        fs::write(&file_path, VALID)?;

        let analyzer = Analyzer::with_defaults()?;
        let report = analyzer.analyze_file(&file_path)?;

        assert!(report.passed());
        assert_eq!(report.target, file_path);
        assert_eq!(report.summary.groups_checked.len(), 6);
        assert_eq!(report.source_digest.as_ref().map(String::len), Some(64));
        assert!(report.config_fingerprint.is_some());

        Ok(())
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.user.js");

        let analyzer = Analyzer::with_defaults().unwrap();
        match analyzer.analyze_file(&missing) {
            Err(GuardError::TargetNotFound { path }) => assert_eq!(path, missing),
            other => panic!("expected TargetNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_directory_is_not_a_target() {
        let temp_dir = TempDir::new().unwrap();
        let analyzer = Analyzer::with_defaults().unwrap();

        assert!(matches!(
            analyzer.analyze_file(temp_dir.path()),
            Err(GuardError::TargetNotFound { .. })
        ));
    }

    #[test]
    fn test_invalid_utf8_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("binary.user.js");
        fs::write(&file_path, [0xff, 0xfe, 0x00, 0x41]).unwrap();

        let analyzer = Analyzer::with_defaults().unwrap();
        assert!(matches!(
            analyzer.analyze_file(&file_path),
            Err(GuardError::Io { .. })
        ));
    }

    #[test]
    fn test_digest_tracks_content() {
        let analyzer = Analyzer::with_defaults().unwrap();
        let a = analyzer.analyze_source("a.user.js", VALID);
        let b = analyzer.analyze_source("b.user.js", &format!("{VALID}\n"));

        assert_ne!(a.source_digest, b.source_digest);
        assert_eq!(a.config_fingerprint, b.config_fingerprint);
    }
}
