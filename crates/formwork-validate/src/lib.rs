pub mod aggregate;
pub mod orchestrator;
pub mod suite;

pub use aggregate::{AggregatedIssues, collect};
pub use orchestrator::{Orchestrator, OrchestratorHandle};
pub use suite::{NoopSuite, SuiteError, SuiteFuture, ValidationSuite};
