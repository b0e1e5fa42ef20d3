//! Suite result types: per-path error and warning lists.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Reserved key for whole-form (cross-field) validation output.
///
/// Controls always live below the tree root, so no real control path ever
/// aliases this key.
pub const ROOT_KEY: &str = "rootForm";

/// Issue severity.
///
/// Warnings are non-blocking: only errors affect a target's validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Structured output of one suite invocation.
///
/// Maps path strings (or [`ROOT_KEY`]) to ordered message lists. A path
/// absent from the error map is valid as far as this run is concerned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteResult {
    #[serde(default)]
    errors: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    warnings: BTreeMap<String, Vec<String>>,
}

impl SuiteResult {
    /// An empty (all-valid) result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message for `path` at the given severity.
    pub fn add(&mut self, severity: Severity, path: impl Into<String>, message: impl Into<String>) {
        let bucket = match severity {
            Severity::Error => &mut self.errors,
            Severity::Warning => &mut self.warnings,
        };
        bucket.entry(path.into()).or_default().push(message.into());
    }

    /// Append an error message for `path`.
    pub fn add_error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.add(Severity::Error, path, message);
    }

    /// Append a warning message for `path`.
    pub fn add_warning(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.add(Severity::Warning, path, message);
    }

    /// Builder-style [`add_error`](Self::add_error).
    pub fn with_error(mut self, path: impl Into<String>, message: impl Into<String>) -> Self {
        self.add_error(path, message);
        self
    }

    /// Builder-style [`add_warning`](Self::add_warning).
    pub fn with_warning(mut self, path: impl Into<String>, message: impl Into<String>) -> Self {
        self.add_warning(path, message);
        self
    }

    /// Error messages recorded for `path`, in insertion order.
    pub fn errors_for(&self, path: &str) -> &[String] {
        self.errors.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Warning messages recorded for `path`, in insertion order.
    pub fn warnings_for(&self, path: &str) -> &[String] {
        self.warnings.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whole-form error messages (the [`ROOT_KEY`] entry).
    pub fn root_errors(&self) -> &[String] {
        self.errors_for(ROOT_KEY)
    }

    /// Whole-form warning messages.
    pub fn root_warnings(&self) -> &[String] {
        self.warnings_for(ROOT_KEY)
    }

    /// Paths with at least one error, including [`ROOT_KEY`] if present.
    pub fn error_paths(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }

    /// Paths with at least one warning.
    pub fn warning_paths(&self) -> impl Iterator<Item = &str> {
        self.warnings.keys().map(String::as_str)
    }

    /// Whether the run produced no errors anywhere (warnings ignored).
    pub fn is_valid(&self) -> bool {
        self.errors.values().all(Vec::is_empty)
    }

    /// Total error messages across all paths.
    pub fn error_count(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    /// Total warning messages across all paths.
    pub fn warning_count(&self) -> usize {
        self.warnings.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_message_order() {
        let mut result = SuiteResult::new();
        result.add_error("password", "Required");
        result.add_error("password", "Too short");
        assert_eq!(result.errors_for("password"), &["Required", "Too short"]);
    }

    #[test]
    fn warnings_do_not_affect_validity() {
        let result = SuiteResult::new().with_warning("email", "Unusual domain");
        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 1);
        assert_eq!(result.error_count(), 0);
    }

    #[test]
    fn root_entry_is_reachable() {
        let result = SuiteResult::new().with_error(ROOT_KEY, "Dates out of order");
        assert_eq!(result.root_errors(), &["Dates out of order"]);
        assert!(!result.is_valid());
    }

    #[test]
    fn absent_path_yields_empty_slice() {
        let result = SuiteResult::new();
        assert!(result.errors_for("missing").is_empty());
        assert!(result.warnings_for("missing").is_empty());
    }
}
