//! Configuration options for the validation orchestrator.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Options controlling orchestrator scheduling behavior.
///
/// Intervals are stored as milliseconds so the options serialize cleanly
/// into project configuration files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorOptions {
    /// Debounce interval applied to every target without an override.
    ///
    /// Default: 0 (validate on the next scheduler turn). Raise this for
    /// fields whose suites are expensive.
    pub debounce_ms: u64,

    /// Per-target debounce overrides, keyed by path string (or the root
    /// sentinel). Typical use: a longer window for fields backed by a
    /// network check.
    pub target_debounce_ms: BTreeMap<String, u64>,

    /// Trailing quiet period before the externally observable busy signal
    /// clears. Bounds busy/idle flicker during a burst of related
    /// validations. Default: 100ms.
    pub pending_quiet_ms: u64,

    /// Run whole-form (root sentinel) validation on every field change.
    ///
    /// Default: true. Disable for forms without cross-field rules.
    pub validate_root: bool,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            debounce_ms: 0,
            target_debounce_ms: BTreeMap::new(),
            pending_quiet_ms: 100,
            validate_root: true,
        }
    }
}

impl OrchestratorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default debounce interval.
    pub fn with_debounce(mut self, interval: Duration) -> Self {
        self.debounce_ms = interval.as_millis() as u64;
        self
    }

    /// Override the debounce interval for one target.
    pub fn with_target_debounce(mut self, target: impl Into<String>, interval: Duration) -> Self {
        self.target_debounce_ms
            .insert(target.into(), interval.as_millis() as u64);
        self
    }

    /// Set the trailing quiet period for the busy signal.
    pub fn with_pending_quiet(mut self, interval: Duration) -> Self {
        self.pending_quiet_ms = interval.as_millis() as u64;
        self
    }

    /// Enable or disable implicit whole-form validation.
    pub fn with_root_validation(mut self, enabled: bool) -> Self {
        self.validate_root = enabled;
        self
    }

    /// Effective debounce interval for `target`.
    pub fn debounce_for(&self, target: &str) -> Duration {
        let ms = self
            .target_debounce_ms
            .get(target)
            .copied()
            .unwrap_or(self.debounce_ms);
        Duration::from_millis(ms)
    }

    /// Trailing quiet period as a [`Duration`].
    pub fn pending_quiet(&self) -> Duration {
        Duration::from_millis(self.pending_quiet_ms)
    }
}
