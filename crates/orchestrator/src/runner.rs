//! Pipeline driver.
//!
//! The runner owns the stage loop: it executes stages in graph order,
//! dispatches on branching verdicts, and enforces the global step ceiling.
//! All per-run state lives in the [`ExecutionRecord`] it returns.

use std::sync::Arc;

use pilot_core::{ExecutionRecord, Role, ToolInput};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::context::StageContext;
use crate::error::Result;
use crate::oracle::DecisionOracle;
use crate::registry::ToolRegistry;
use crate::stages;
use crate::state_machine::{Stage, StageMachine};

const DEFAULT_MAX_STEPS: u32 = 25;
const DEFAULT_MAX_FIX_ATTEMPTS: u32 = 3;
const DEFAULT_TOOL: &str = "run_script";
const DEFAULT_TOOL_SOURCE: &str = "print('tool selection could not be parsed')";

/// Runner knobs. The defaults match the pipeline's intended operating point;
/// tests tighten the ceilings to keep scripted runs short.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Stage transitions granted to one run before finalize is forced.
    pub max_steps: u32,
    /// Recovery attempts granted before the error handler gives up.
    pub max_fix_attempts: u32,
    /// Tool substituted when a tool selection cannot be parsed.
    pub default_tool: String,
    pub default_tool_input: ToolInput,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        let mut default_tool_input = ToolInput::new();
        default_tool_input.insert(
            "source".to_string(),
            Value::String(DEFAULT_TOOL_SOURCE.to_string()),
        );
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            max_fix_attempts: DEFAULT_MAX_FIX_ATTEMPTS,
            default_tool: DEFAULT_TOOL.to_string(),
            default_tool_input,
        }
    }
}

impl RunnerConfig {
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_max_fix_attempts(mut self, max_fix_attempts: u32) -> Self {
        self.max_fix_attempts = max_fix_attempts;
        self
    }

    pub fn with_default_tool(mut self, tool: impl Into<String>, input: ToolInput) -> Self {
        self.default_tool = tool.into();
        self.default_tool_input = input;
        self
    }
}

/// Drives one task at a time through the stage graph.
pub struct TaskRunner {
    context: StageContext,
}

impl TaskRunner {
    pub fn new(
        oracle: Arc<dyn DecisionOracle>,
        registry: Arc<ToolRegistry>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            context: StageContext::new(oracle, registry, config),
        }
    }

    /// Run a task to completion. The returned record always carries a final
    /// output; every other outcome is an error.
    pub async fn run(&self, input: impl Into<String>) -> Result<ExecutionRecord> {
        let ctx = &self.context;
        let mut record = ExecutionRecord::new(input);
        info!(run_id = %record.id(), "Run started");

        let mut stage = Stage::Start;
        let mut steps = 0u32;

        loop {
            steps += 1;
            if steps > ctx.config.max_steps && stage != Stage::Finalize {
                warn!(
                    run_id = %record.id(),
                    steps,
                    abandoned_stage = stage.as_str(),
                    "Step ceiling reached, forcing finalize"
                );
                record.push_message(
                    Role::Assistant,
                    "I've reached the step limit for this task. I'll summarize what was \
                     accomplished so far."
                        .to_string(),
                );
                stage = Stage::Finalize;
            }
            debug!(run_id = %record.id(), step = steps, stage = stage.as_str(), "Entering stage");

            stage = match stage {
                Stage::Start => {
                    stages::start::run(ctx, &mut record);
                    Stage::Plan
                }
                Stage::Plan => {
                    stages::plan::run(ctx, &mut record).await?;
                    Stage::SelectTool
                }
                Stage::SelectTool => {
                    stages::select_tool::run(ctx, &mut record).await?;
                    Stage::ExecuteTool
                }
                Stage::ExecuteTool => {
                    stages::execute_tool::run(ctx, &mut record).await?;
                    Stage::InterpretOutput
                }
                Stage::InterpretOutput => {
                    let verdict = stages::interpret::run(ctx, &mut record).await?;
                    StageMachine::dispatch(verdict)
                }
                Stage::HandleError => {
                    let verdict = stages::handle_error::run(ctx, &mut record).await?;
                    StageMachine::dispatch_recovery(verdict)
                }
                Stage::Finalize => {
                    stages::finalize::run(ctx, &mut record).await?;
                    break;
                }
            };
        }

        Ok(record)
    }
}
