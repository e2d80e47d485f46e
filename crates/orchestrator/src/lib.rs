pub mod context;
pub mod decision;
pub mod error;
pub mod oracle;
pub mod prompts;
pub mod registry;
pub mod runner;
pub mod stages;
pub mod state_machine;
pub mod testing;

pub use context::StageContext;
pub use error::{OrchestratorError, Result};
pub use oracle::{ChatOracle, DecisionOracle, OracleConfig, OracleError, OracleRequest, ScriptedOracle};
pub use registry::ToolRegistry;
pub use runner::{RunnerConfig, TaskRunner};
pub use state_machine::{OutputVerdict, RecoveryVerdict, Stage, StageMachine};
