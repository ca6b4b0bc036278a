//! Rule engine for detecting missing userscript anchors
//!
//! Architectural Principle: Service Layer - the engine evaluates an ordered rule battery
//! - Rules are compiled once from configuration, then run against one source text
//! - Every rule is evaluated; failures accumulate instead of short-circuiting
//! - Method bodies are extracted once per scope and shared by all scoped rules

pub mod method_body;

use crate::config::{CheckDef, GuardConfig, MethodRef, RuleDef};
use crate::domain::violations::{GuardResult, ValidationReport, Violation};
use std::collections::HashMap;

pub use method_body::{extract_method_body, MethodBody, MethodLocator};

/// Compiled rule battery
#[derive(Debug)]
pub struct RuleEngine {
    rules: Vec<CompiledRule>,
    /// One locator per method scope referenced by any rule
    locators: HashMap<MethodRef, MethodLocator>,
}

/// A rule ready for evaluation
#[derive(Debug)]
struct CompiledRule {
    id: String,
    description: String,
    check: CheckDef,
}

/// Result of evaluating one rule
#[derive(Debug, PartialEq, Eq)]
pub enum RuleOutcome {
    Passed,
    Failed(Violation),
    /// Not evaluated because the scope's body could not be extracted
    Skipped(MethodRef),
}

/// Method bodies extracted during one evaluation pass
type BodyCache<'s> = HashMap<MethodRef, Option<MethodBody<'s>>>;

impl RuleEngine {
    /// Compile every rule of a validated configuration
    pub fn new(config: &GuardConfig) -> GuardResult<Self> {
        config.validate()?;

        let mut engine = Self {
            rules: Vec::with_capacity(config.rules.len()),
            locators: HashMap::new(),
        };

        for rule in &config.rules {
            engine.add_rule(rule)?;
        }

        Ok(engine)
    }

    /// Add a rule to the engine
    fn add_rule(&mut self, rule: &RuleDef) -> GuardResult<()> {
        tracing::debug!("Adding rule '{}' of kind {}", rule.id, rule.check.kind());

        let scope = match &rule.check {
            CheckDef::Extract { scope } => Some(scope),
            other => other.dependent_scope(),
        };

        if let Some(scope) = scope {
            if !self.locators.contains_key(scope) {
                self.locators
                    .insert(scope.clone(), MethodLocator::new(scope)?);
            }
        }

        self.rules.push(CompiledRule {
            id: rule.id.clone(),
            description: rule.description.clone(),
            check: rule.check.clone(),
        });

        Ok(())
    }

    /// Number of compiled rules
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Number of distinct method scopes
    pub fn scope_count(&self) -> usize {
        self.locators.len()
    }

    /// Run the whole battery against `source`, recording results in `report`
    pub fn evaluate(&self, source: &str, report: &mut ValidationReport) {
        let mut bodies = BodyCache::new();
        let mut evaluated = 0;
        let mut passed = 0;

        for rule in &self.rules {
            match self.evaluate_rule(rule, source, &mut bodies) {
                RuleOutcome::Passed => {
                    tracing::debug!("Rule '{}' passed", rule.id);
                    evaluated += 1;
                    passed += 1;
                }
                RuleOutcome::Failed(violation) => {
                    tracing::debug!("Rule '{}' failed: {}", rule.id, violation.format_display());
                    evaluated += 1;
                    report.add_violation(violation);
                }
                RuleOutcome::Skipped(scope) => {
                    tracing::info!("Rule '{}' skipped: {} was not extracted", rule.id, scope);
                    report.add_skipped(rule.id.clone(), scope.to_string());
                }
            }
        }

        report.summary.rules_total += self.rules.len();
        report.summary.rules_evaluated += evaluated;
        report.summary.rules_passed += passed;
    }

    /// Evaluate a single rule
    fn evaluate_rule<'s>(
        &self,
        rule: &CompiledRule,
        source: &'s str,
        bodies: &mut BodyCache<'s>,
    ) -> RuleOutcome {
        match &rule.check {
            CheckDef::Contains { needle } => {
                if source.contains(needle.as_str()) {
                    RuleOutcome::Passed
                } else {
                    RuleOutcome::Failed(Violation::new(&rule.id, &rule.description))
                }
            }
            CheckDef::Count { needle, expected } => {
                let offsets = occurrences(source, needle);
                if offsets.len() == *expected {
                    RuleOutcome::Passed
                } else {
                    RuleOutcome::Failed(
                        Violation::new(&rule.id, &rule.description)
                            .with_detail(format!("count={}", offsets.len()))
                            .with_lines(line_numbers(source, &offsets)),
                    )
                }
            }
            CheckDef::Extract { scope } => match self.body(scope, source, bodies) {
                Some(_) => RuleOutcome::Passed,
                None => RuleOutcome::Failed(
                    Violation::new(&rule.id, &rule.description).with_scope(scope.to_string()),
                ),
            },
            CheckDef::ScopedContains { scope, needle } => {
                let Some(body) = self.body(scope, source, bodies) else {
                    return RuleOutcome::Skipped(scope.clone());
                };
                if body.contains(needle) {
                    RuleOutcome::Passed
                } else {
                    RuleOutcome::Failed(
                        Violation::new(&rule.id, &rule.description).with_scope(scope.to_string()),
                    )
                }
            }
            CheckDef::ScopedAbsent { scope, needle } => {
                let Some(body) = self.body(scope, source, bodies) else {
                    return RuleOutcome::Skipped(scope.clone());
                };
                let offsets = body.find_all(needle);
                if offsets.is_empty() {
                    RuleOutcome::Passed
                } else {
                    RuleOutcome::Failed(
                        Violation::new(&rule.id, &rule.description)
                            .with_scope(scope.to_string())
                            .with_lines(line_numbers(source, &offsets)),
                    )
                }
            }
        }
    }

    /// Extracted body for `scope`, computed on first use
    fn body<'s>(
        &self,
        scope: &MethodRef,
        source: &'s str,
        bodies: &mut BodyCache<'s>,
    ) -> Option<MethodBody<'s>> {
        if let Some(cached) = bodies.get(scope) {
            return *cached;
        }

        let extracted = self
            .locators
            .get(scope)
            .and_then(|locator| locator.extract(source));
        bodies.insert(scope.clone(), extracted);
        extracted
    }
}

/// Byte offsets of non-overlapping occurrences; an empty needle never occurs
fn occurrences(haystack: &str, needle: &str) -> Vec<usize> {
    if needle.is_empty() {
        return Vec::new();
    }
    haystack.match_indices(needle).map(|(idx, _)| idx).collect()
}

/// 1-indexed line number of a byte offset
fn line_number(source: &str, byte_offset: usize) -> u32 {
    let prefix = &source.as_bytes()[..byte_offset.min(source.len())];
    prefix.iter().filter(|&&b| b == b'\n').count() as u32 + 1
}

fn line_numbers(source: &str, offsets: &[usize]) -> Vec<u32> {
    offsets.iter().map(|&offset| line_number(source, offset)).collect()
}
