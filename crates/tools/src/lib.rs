//! Tool implementations for the pipeline registry.
//!
//! Every tool folds its faults into a failure-shaped
//! [`ToolOutput`](pilot_core::ToolOutput); nothing here panics or returns a
//! transport error to the runner.

pub mod files;
pub mod script;
pub mod search;

pub use files::{ReadFile, WriteFile};
pub use script::{EvalScript, RunScript};
pub use search::{
    CreateSearchIndex, QuerySearchIndex, SearchApi, SearchConfig, SearchError,
    UploadToSearchIndex,
};
