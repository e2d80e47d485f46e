pub mod domain;
pub mod error;
pub mod tool;

pub use domain::message::{Message, Role};
pub use domain::record::ExecutionRecord;
pub use domain::run_error::{ErrorKind, ErrorRecord};
pub use error::CoreError;
pub use tool::{Tool, ToolInput, ToolOutput};
