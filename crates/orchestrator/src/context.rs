use std::sync::Arc;

use pilot_core::ExecutionRecord;

use crate::oracle::{DecisionOracle, OracleError, OracleRequest};
use crate::prompts::StagePrompts;
use crate::registry::ToolRegistry;
use crate::runner::RunnerConfig;

/// Shared collaborators handed to every stage function. The context itself
/// is immutable; all per-run state lives in the execution record.
pub struct StageContext {
    pub oracle: Arc<dyn DecisionOracle>,
    pub registry: Arc<ToolRegistry>,
    pub config: RunnerConfig,
}

impl StageContext {
    pub fn new(
        oracle: Arc<dyn DecisionOracle>,
        registry: Arc<ToolRegistry>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            oracle,
            registry,
            config,
        }
    }

    /// Consult the oracle with the record's narration so far plus a
    /// stage-specific instruction.
    pub async fn consult(
        &self,
        record: &ExecutionRecord,
        instruction: String,
    ) -> Result<String, OracleError> {
        let request = OracleRequest::new(
            StagePrompts::system(),
            record.history().to_vec(),
            instruction,
        );
        self.oracle.complete(request).await
    }
}
