use thiserror::Error;

use crate::oracle::OracleError;

/// Faults that end a run. Tool failures and malformed oracle decisions are
/// not errors at this level; they are captured inside the execution record
/// and routed on. The only faults that propagate are oracle transport
/// failures and record misuse.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Oracle call failed: {0}")]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Core(#[from] pilot_core::CoreError),
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
