//! The validation suite capability.
//!
//! The orchestrator is agnostic to what a suite checks: it only needs a
//! single function-typed capability taking the current model snapshot and a
//! target key, and producing per-path errors and warnings. Suites run their
//! tests asynchronously and own their own timeouts.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use thiserror::Error;

use formwork_model::SuiteResult;

/// Suite execution error.
///
/// Absorbed by the orchestrator into a single synthetic error entry on the
/// affected target, never propagated through the event pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SuiteError {
    /// The suite reported a failure instead of producing a result.
    #[error("validation suite failed: {0}")]
    Failed(String),

    /// The suite's task crashed before settling.
    #[error("validation suite crashed: {0}")]
    Panicked(String),
}

/// Boxed future returned by a suite invocation.
pub type SuiteFuture = Pin<Box<dyn Future<Output = Result<SuiteResult, SuiteError>> + Send>>;

/// The externally supplied validation function.
///
/// `target` names the path (or root sentinel) whose validators should run;
/// `None` asks for a whole-model run covering every field. A suite is free
/// to compute more than the target — the orchestrator applies only the
/// entries relevant to the run's target.
pub trait ValidationSuite: Send + Sync + 'static {
    fn run(&self, model: Value, target: Option<String>) -> SuiteFuture;
}

impl<F, Fut> ValidationSuite for F
where
    F: Fn(Value, Option<String>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<SuiteResult, SuiteError>> + Send + 'static,
{
    fn run(&self, model: Value, target: Option<String>) -> SuiteFuture {
        Box::pin(self(model, target))
    }
}

/// The absent suite: every run is a no-op success.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSuite;

impl ValidationSuite for NoopSuite {
    fn run(&self, _model: Value, _target: Option<String>) -> SuiteFuture {
        Box::pin(async { Ok(SuiteResult::new()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn closures_are_suites() {
        let suite = |model: Value, target: Option<String>| async move {
            let mut result = SuiteResult::new();
            if target.as_deref() == Some("name") && model["name"] == json!("") {
                result.add_error("name", "Required");
            }
            Ok(result)
        };
        let result = suite
            .run(json!({"name": ""}), Some("name".to_string()))
            .await
            .expect("suite run");
        assert_eq!(result.errors_for("name"), &["Required"]);
    }

    #[tokio::test]
    async fn noop_suite_is_a_clean_pass() {
        let result = NoopSuite
            .run(json!({"anything": 1}), None)
            .await
            .expect("noop run");
        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 0);
    }
}
