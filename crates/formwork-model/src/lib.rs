pub mod graph;
pub mod issue;
pub mod options;
pub mod path;

pub use graph::{DependencyGraph, DependencyGraphBuilder};
pub use issue::{ROOT_KEY, Severity, SuiteResult};
pub use options::OrchestratorOptions;
pub use path::{FieldPath, Segment};
