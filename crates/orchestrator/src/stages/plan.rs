use pilot_core::{ExecutionRecord, Role};
use tracing::{debug, info};

use crate::context::StageContext;
use crate::decision::parse_plan_lines;
use crate::error::Result;
use crate::prompts::StagePrompts;

/// Ask the oracle for a step-by-step plan and record it.
///
/// This stage never fails the run: if the oracle produces no usable lines
/// the plan is set to an empty sequence, which is a valid (degenerate) plan.
pub async fn run(ctx: &StageContext, record: &mut ExecutionRecord) -> Result<()> {
    let prompt = StagePrompts::planning(record, &ctx.registry);
    let response = ctx.consult(record, prompt).await?;

    let steps = parse_plan_lines(&response);
    info!(run_id = %record.id(), steps = steps.len(), "Plan created");
    if steps.is_empty() {
        debug!(run_id = %record.id(), "Oracle returned no usable plan lines");
    }

    record.set_plan(steps);
    record.push_message(
        Role::Assistant,
        format!("I'll help you with this. Here's my plan:\n\n{}", response),
    );
    Ok(())
}
