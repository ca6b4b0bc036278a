//! Method body extraction from object literals
//!
//! Architectural Principle: Service Layer - a deliberately small textual heuristic
//! - Locates `const <Object> = {` and searches only from that anchor onwards
//! - Matches `<method>: () => { ... },` with a non-greedy body
//! - Never parses JavaScript; the guarded file must keep the expected shape
//!
//! # Method-shape contract
//!
//! The guarded file must define each checked method as a zero-argument arrow
//! function property whose body is closed by a line holding only `},`:
//!
//! ```text
//! const UI = {
//!     injectStyles: () => {
//!         DesignSystem.ensureBase();
//!     },
//! };
//! ```
//!
//! Only the first `const <Object> = {` is inspected. The body ends at the first
//! line that starts (after whitespace) with `},`, so a nested object literal
//! closed the same way cuts the body short. Other shapes (arguments, a comment
//! after the closing brace) are not matched.

use crate::config::MethodRef;
use crate::domain::violations::{GuardError, GuardResult};
use regex::Regex;

/// Extracted method body and where it sits in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodBody<'a> {
    /// Text between the opening brace and the closing `},` line
    pub text: &'a str,
    /// Byte offset of `text` within the full source
    pub offset: usize,
}

impl<'a> MethodBody<'a> {
    pub fn contains(&self, needle: &str) -> bool {
        self.text.contains(needle)
    }

    /// Absolute byte offsets of every occurrence of `needle` in the body
    pub fn find_all(&self, needle: &str) -> Vec<usize> {
        self.text
            .match_indices(needle)
            .map(|(idx, _)| self.offset + idx)
            .collect()
    }
}

/// Compiled locator for one `Object.method` pair
#[derive(Debug, Clone)]
pub struct MethodLocator {
    scope: MethodRef,
    anchor: String,
    pattern: Regex,
}

impl MethodLocator {
    /// Compile the anchor and signature pattern for a method scope
    pub fn new(scope: &MethodRef) -> GuardResult<Self> {
        let anchor = format!("const {} = {{", scope.object);
        let pattern = format!(
            r"{}:\s*\(\)\s*=>\s*\{{([\s\S]*?)\n\s*\}},",
            regex::escape(&scope.method)
        );

        let pattern = Regex::new(&pattern).map_err(|e| {
            GuardError::pattern(format!("Invalid method pattern for {scope}: {e}"))
        })?;

        Ok(Self {
            scope: scope.clone(),
            anchor,
            pattern,
        })
    }

    pub fn scope(&self) -> &MethodRef {
        &self.scope
    }

    /// Locate the method body, or `None` when the object or method is missing
    pub fn extract<'a>(&self, source: &'a str) -> Option<MethodBody<'a>> {
        let Some(start) = source.find(&self.anchor) else {
            tracing::debug!("Anchor '{}' not found", self.anchor);
            return None;
        };

        let body = self.pattern.captures(&source[start..])?.get(1)?;

        tracing::debug!(
            "Extracted {} ({} bytes at offset {})",
            self.scope,
            body.len(),
            start + body.start()
        );

        Some(MethodBody {
            text: body.as_str(),
            offset: start + body.start(),
        })
    }
}

/// Extract the body of `object.method` from `source`
pub fn extract_method_body<'a>(
    source: &'a str,
    object: &str,
    method: &str,
) -> GuardResult<Option<MethodBody<'a>>> {
    let locator = MethodLocator::new(&MethodRef::new(object, method))?;
    Ok(locator.extract(source))
}
