pub mod error;
pub mod transcode;
pub mod tree;

pub use error::{Result, TreeError};
pub use transcode::{array_to_object, deep_array_to_object, object_to_array};
pub use tree::{ControlId, FormTree};
