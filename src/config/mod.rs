//! Configuration loading and management for Userscript Guard
//!
//! Architecture: Anti-Corruption Layer - Configuration translates external YAML formats
//! - Raw YAML structures are converted to typed rule definitions
//! - The default rule battery is embedded in the domain, not in a shipped file
//! - Validation happens on load so the engine only ever sees consistent rules

use crate::domain::violations::{GuardError, GuardResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Userscript validated when no path is given on the command line
pub const DEFAULT_TARGET: &str = "LinuxDo-Bookmarks-to-Notion.user.js";

/// Config file names looked up in the working directory, in order
pub const DEFAULT_CONFIG_FILES: [&str; 3] = [
    "userscript_guard.yaml",
    "userscript_guard.yml",
    ".userscript_guard.yaml",
];

const SUPPORTED_VERSIONS: [&str; 1] = ["1.0"];

/// Main configuration structure for Userscript Guard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Configuration format version
    pub version: String,
    /// File name validated when no path argument is given
    #[serde(default = "default_target")]
    pub target: String,
    /// Ordered rule battery
    pub rules: Vec<RuleDef>,
}

/// One named rule of the battery
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleDef {
    /// Unique identifier for this rule
    pub id: String,
    /// Anchor group reported in the success summary
    #[serde(default)]
    pub group: Option<String>,
    /// Human-readable message used when the rule fails
    pub description: String,
    /// What the rule asserts
    pub check: CheckDef,
}

/// The kinds of checks a rule can perform
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckDef {
    /// The file contains the literal
    Contains { needle: String },
    /// The literal occurs exactly `expected` times in the file
    Count { needle: String, expected: usize },
    /// The method body can be located
    Extract { scope: MethodRef },
    /// The extracted method body contains the literal
    ScopedContains { scope: MethodRef, needle: String },
    /// The extracted method body does not contain the literal
    ScopedAbsent { scope: MethodRef, needle: String },
}

impl CheckDef {
    /// Method scope this check depends on, if it is scoped
    pub fn dependent_scope(&self) -> Option<&MethodRef> {
        match self {
            Self::ScopedContains { scope, .. } | Self::ScopedAbsent { scope, .. } => Some(scope),
            _ => None,
        }
    }

    /// Literal this check searches for, if any
    pub fn needle(&self) -> Option<&str> {
        match self {
            Self::Contains { needle }
            | Self::Count { needle, .. }
            | Self::ScopedContains { needle, .. }
            | Self::ScopedAbsent { needle, .. } => Some(needle),
            Self::Extract { .. } => None,
        }
    }

    /// Short kind name used in logs and statistics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Contains { .. } => "contains",
            Self::Count { .. } => "count",
            Self::Extract { .. } => "extract",
            Self::ScopedContains { .. } => "scoped_contains",
            Self::ScopedAbsent { .. } => "scoped_absent",
        }
    }
}

/// An `Object.method` pair naming a method inside an object literal
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MethodRef {
    pub object: String,
    pub method: String,
}

impl MethodRef {
    pub fn new(object: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            method: method.into(),
        }
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.object, self.method)
    }
}

impl FromStr for MethodRef {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((object, method))
                if !object.trim().is_empty()
                    && !method.trim().is_empty()
                    && !method.contains('.') =>
            {
                Ok(Self::new(object.trim(), method.trim()))
            }
            _ => Err(GuardError::config(format!(
                "Invalid method scope '{s}': expected 'Object.method'"
            ))),
        }
    }
}

impl TryFrom<String> for MethodRef {
    type Error = GuardError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MethodRef> for String {
    fn from(value: MethodRef) -> Self {
        value.to_string()
    }
}

impl GuardConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> GuardResult<Self> {
        let contents = fs::read_to_string(&path).map_err(|e| {
            GuardError::config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = serde_yaml::from_str(&contents).map_err(|e| {
            GuardError::config(format!(
                "Failed to parse config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from string content
    pub fn load_from_str(content: &str) -> GuardResult<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| GuardError::config(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Load the first default config file found in `dir`, or the built-in battery
    pub fn discover<P: AsRef<Path>>(dir: P) -> GuardResult<Self> {
        match Self::find_config_file(dir) {
            Some(path) => {
                tracing::debug!("Loading configuration from {}", path.display());
                Self::load_from_file(path)
            }
            None => {
                tracing::debug!("No configuration file found, using built-in rules");
                Ok(Self::default())
            }
        }
    }

    /// Path of the first default config file present in `dir`
    pub fn find_config_file<P: AsRef<Path>>(dir: P) -> Option<PathBuf> {
        DEFAULT_CONFIG_FILES
            .iter()
            .map(|name| dir.as_ref().join(name))
            .find(|path| path.is_file())
    }

    /// Get default configuration with the built-in rule battery
    pub fn with_defaults() -> Self {
        let mut rules = vec![
            contains(
                "style_manager_inject_once",
                "tokens",
                "missing StyleManager.injectOnce",
                "injectOnce: (styleId, cssText) => {",
            ),
            contains(
                "style_id_base",
                "tokens",
                "missing DesignSystem.STYLE_IDS.BASE",
                r#"BASE: "ldb-ui-base""#,
            ),
            contains(
                "style_id_chat",
                "chat",
                "missing DesignSystem.STYLE_IDS.CHAT",
                r#"CHAT: "ldb-ui-chat""#,
            ),
            contains(
                "tokens_marker",
                "tokens",
                "missing tokens marker LDB_UI_TOKENS",
                "/* LDB_UI_TOKENS */",
            ),
            contains(
                "chat_marker",
                "chat",
                "missing ChatUI style marker LDB_UI_CHAT",
                "/* LDB_UI_CHAT */",
            ),
            RuleDef {
                id: "chat_marker_unique".to_string(),
                group: Some("chat".to_string()),
                description: "ChatUI style marker duplicated (expected exactly 1)".to_string(),
                check: CheckDef::Count {
                    needle: "/* LDB_UI_CHAT */".to_string(),
                    expected: 1,
                },
            },
        ];

        rules.extend(inject_styles_rules("notion", "NotionSiteUI", "NOTION", true));
        rules.extend(inject_styles_rules("ui", "UI", "LINUX_DO", true));
        rules.extend(inject_styles_rules("generic", "GenericUI", "GENERIC", false));

        rules.push(contains(
            "reduced_motion",
            "accessibility",
            "missing prefers-reduced-motion support",
            "@media (prefers-reduced-motion: reduce)",
        ));
        rules.push(contains(
            "focus_visible",
            "accessibility",
            "missing :focus-visible focus ring styles",
            ":focus-visible",
        ));

        Self {
            version: "1.0".to_string(),
            target: default_target(),
            rules,
        }
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> GuardResult<()> {
        if !SUPPORTED_VERSIONS.contains(&self.version.as_str()) {
            return Err(GuardError::config(format!(
                "Unsupported configuration version: {}. Supported versions: {}",
                self.version,
                SUPPORTED_VERSIONS.join(", ")
            )));
        }

        if self.target.trim().is_empty() {
            return Err(GuardError::config("Default target file name is empty"));
        }

        if self.rules.is_empty() {
            return Err(GuardError::config("Configuration defines no rules"));
        }

        let mut seen_ids = HashSet::new();
        let mut extracted = HashSet::new();

        for rule in &self.rules {
            if rule.id.trim().is_empty() {
                return Err(GuardError::config("Rule with empty id"));
            }
            if !seen_ids.insert(rule.id.as_str()) {
                return Err(GuardError::config(format!("Duplicate rule ID '{}'", rule.id)));
            }

            if rule.check.needle().is_some_and(str::is_empty) {
                return Err(GuardError::config(format!(
                    "Rule '{}' has an empty needle",
                    rule.id
                )));
            }

            if let CheckDef::Extract { scope } = &rule.check {
                extracted.insert(scope);
            }

            // Scoped rules reuse a body extracted by an earlier rule
            if let Some(scope) = rule.check.dependent_scope() {
                if !extracted.contains(scope) {
                    return Err(GuardError::config(format!(
                        "Rule '{}' is scoped to {} but no earlier extract rule defines it",
                        rule.id, scope
                    )));
                }
            }
        }

        Ok(())
    }

    /// Anchor groups in first-seen order
    pub fn groups(&self) -> Vec<String> {
        let mut groups: Vec<String> = Vec::new();
        for group in self.rules.iter().filter_map(|r| r.group.as_ref()) {
            if !groups.contains(group) {
                groups.push(group.clone());
            }
        }
        groups
    }

    /// Find a rule by id
    pub fn rule(&self, id: &str) -> Option<&RuleDef> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// Serialize back to YAML
    pub fn to_yaml(&self) -> GuardResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| GuardError::config(format!("Failed to serialize config: {e}")))
    }

    /// Create a fingerprint of the configuration for report provenance
    pub fn fingerprint(&self) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();

        // Rule order is significant, so hash in declaration order
        self.version.hash(&mut hasher);
        self.target.hash(&mut hasher);
        self.rules.hash(&mut hasher);

        format!("{:x}", hasher.finish())
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn default_target() -> String {
    DEFAULT_TARGET.to_string()
}

fn contains(id: &str, group: &str, description: &str, needle: &str) -> RuleDef {
    RuleDef {
        id: id.to_string(),
        group: Some(group.to_string()),
        description: description.to_string(),
        check: CheckDef::Contains {
            needle: needle.to_string(),
        },
    }
}

/// Rules asserting that `<object>.injectStyles` goes through StyleManager
fn inject_styles_rules(
    prefix: &str,
    object: &str,
    style_id: &str,
    requires_chat: bool,
) -> Vec<RuleDef> {
    let scope = MethodRef::new(object, "injectStyles");
    let group = Some(scope.to_string());

    let scoped = |suffix: &str, description: String, check: CheckDef| RuleDef {
        id: format!("{prefix}_{suffix}"),
        group: group.clone(),
        description,
        check,
    };

    let mut rules = vec![scoped(
        "extract",
        format!("unable to extract {scope}()"),
        CheckDef::Extract {
            scope: scope.clone(),
        },
    )];

    rules.push(scoped(
        "ensure_base",
        format!("{scope} does not call DesignSystem.ensureBase()"),
        CheckDef::ScopedContains {
            scope: scope.clone(),
            needle: "DesignSystem.ensureBase();".to_string(),
        },
    ));

    if requires_chat {
        rules.push(scoped(
            "ensure_chat",
            format!("{scope} does not call DesignSystem.ensureChat()"),
            CheckDef::ScopedContains {
                scope: scope.clone(),
                needle: "DesignSystem.ensureChat();".to_string(),
            },
        ));
    }

    rules.push(scoped(
        "inject_once",
        format!("{scope} does not use StyleManager.injectOnce(DesignSystem.STYLE_IDS.{style_id})"),
        CheckDef::ScopedContains {
            scope: scope.clone(),
            needle: format!("StyleManager.injectOnce(DesignSystem.STYLE_IDS.{style_id}"),
        },
    ));

    rules.push(scoped(
        "legacy_style",
        format!(
            r#"{scope} still uses document.createElement("style") (migrate to StyleManager)"#
        ),
        CheckDef::ScopedAbsent {
            scope,
            needle: r#"document.createElement("style")"#.to_string(),
        },
    ));

    rules
}

/// Configuration builder for programmatic construction
pub struct ConfigBuilder {
    config: GuardConfig,
}

impl ConfigBuilder {
    /// Start from an empty battery
    pub fn empty() -> Self {
        Self {
            config: GuardConfig {
                version: "1.0".to_string(),
                target: default_target(),
                rules: Vec::new(),
            },
        }
    }

    /// Start from the built-in battery
    pub fn new() -> Self {
        Self {
            config: GuardConfig::default(),
        }
    }

    /// Set the default target file name
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.config.target = target.into();
        self
    }

    /// Append a rule
    pub fn rule(
        mut self,
        id: impl Into<String>,
        description: impl Into<String>,
        check: CheckDef,
    ) -> Self {
        self.config.rules.push(RuleDef {
            id: id.into(),
            group: None,
            description: description.into(),
            check,
        });
        self
    }

    /// Build the final configuration
    pub fn build(self) -> GuardResult<GuardConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = GuardConfig::default();
        config.validate().unwrap();

        assert_eq!(config.target, DEFAULT_TARGET);
        assert_eq!(config.rules.len(), 22);
        assert_eq!(
            config.groups(),
            vec![
                "tokens",
                "chat",
                "NotionSiteUI.injectStyles",
                "UI.injectStyles",
                "GenericUI.injectStyles",
                "accessibility",
            ]
        );
    }

    #[test]
    fn test_generic_ui_has_no_chat_requirement() {
        let config = GuardConfig::default();
        assert!(config.rule("generic_ensure_chat").is_none());
        assert!(config.rule("notion_ensure_chat").is_some());
        assert!(config.rule("ui_ensure_chat").is_some());

        let rule = config.rule("ui_inject_once").unwrap();
        assert_eq!(
            rule.check.needle(),
            Some("StyleManager.injectOnce(DesignSystem.STYLE_IDS.LINUX_DO")
        );
    }

    #[test]
    fn test_yaml_round_trip_preserves_battery() {
        let config = GuardConfig::default();
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("scope: NotionSiteUI.injectStyles"));
        assert!(yaml.contains("type: scoped_absent"));

        let reloaded = GuardConfig::load_from_str(&yaml).unwrap();
        assert_eq!(reloaded.rules, config.rules);
        assert_eq!(reloaded.fingerprint(), config.fingerprint());
    }

    #[test]
    fn test_load_custom_config() {
        let yaml = r#"
version: "1.0"
target: app.user.js
rules:
  - id: has_banner
    group: layout
    description: missing banner
    check:
      type: contains
      needle: "const Banner = {"
  - id: banner_render
    description: unable to extract Banner.render()
    check:
      type: extract
      scope: Banner.render
  - id: banner_no_innerhtml
    description: Banner.render still assigns innerHTML
    check:
      type: scoped_absent
      scope: Banner.render
      needle: ".innerHTML ="
"#;
        let config = GuardConfig::load_from_str(yaml).unwrap();
        assert_eq!(config.target, "app.user.js");
        assert_eq!(config.groups(), vec!["layout"]);
        assert_eq!(
            config.rule("banner_render").unwrap().check,
            CheckDef::Extract {
                scope: MethodRef::new("Banner", "render")
            }
        );
    }

    #[rstest]
    #[case::bad_version(
        "version: \"2.0\"\nrules:\n  - id: a\n    description: a\n    check: {type: contains, needle: x}\n",
        "Unsupported configuration version"
    )]
    #[case::duplicate_id(
        "version: \"1.0\"\nrules:\n  - id: a\n    description: a\n    check: {type: contains, needle: x}\n  - id: a\n    description: b\n    check: {type: contains, needle: y}\n",
        "Duplicate rule ID 'a'"
    )]
    #[case::empty_needle(
        "version: \"1.0\"\nrules:\n  - id: a\n    description: a\n    check: {type: count, needle: \"\", expected: 1}\n",
        "empty needle"
    )]
    #[case::scope_without_extract(
        "version: \"1.0\"\nrules:\n  - id: a\n    description: a\n    check: {type: scoped_contains, scope: UI.injectStyles, needle: x}\n",
        "no earlier extract rule"
    )]
    #[case::malformed_scope(
        "version: \"1.0\"\nrules:\n  - id: a\n    description: a\n    check: {type: extract, scope: injectStyles}\n",
        "expected 'Object.method'"
    )]
    #[case::no_rules("version: \"1.0\"\nrules: []\n", "defines no rules")]
    fn test_invalid_configs_rejected(#[case] yaml: &str, #[case] expected: &str) {
        let err = GuardConfig::load_from_str(yaml).unwrap_err();
        assert!(
            err.to_string().contains(expected),
            "expected '{expected}' in '{err}'"
        );
    }

    #[test]
    fn test_method_ref_parsing() {
        let scope: MethodRef = "GenericUI.injectStyles".parse().unwrap();
        assert_eq!(scope, MethodRef::new("GenericUI", "injectStyles"));
        assert_eq!(scope.to_string(), "GenericUI.injectStyles");

        assert!("GenericUI.".parse::<MethodRef>().is_err());
        assert!(".injectStyles".parse::<MethodRef>().is_err());
        assert!("a.b.c".parse::<MethodRef>().is_err());
    }

    #[test]
    fn test_discover_prefers_file_over_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = GuardConfig::discover(temp_dir.path()).unwrap();
        assert_eq!(config.rules.len(), GuardConfig::default().rules.len());

        let custom = ConfigBuilder::empty()
            .target("custom.user.js")
            .rule(
                "has_init",
                "missing init",
                CheckDef::Contains {
                    needle: "init()".to_string(),
                },
            )
            .build()
            .unwrap();
        std::fs::write(
            temp_dir.path().join("userscript_guard.yml"),
            custom.to_yaml().unwrap(),
        )
        .unwrap();

        let found = GuardConfig::find_config_file(temp_dir.path()).unwrap();
        assert!(found.ends_with("userscript_guard.yml"));

        let config = GuardConfig::discover(temp_dir.path()).unwrap();
        assert_eq!(config.target, "custom.user.js");
        assert_eq!(config.rules.len(), 1);
    }

    #[test]
    fn test_fingerprint_tracks_rule_changes() {
        let base = GuardConfig::default();
        let mut changed = base.clone();
        changed.rules.pop();

        assert_eq!(base.fingerprint(), GuardConfig::default().fingerprint());
        assert_ne!(base.fingerprint(), changed.fingerprint());
    }
}
