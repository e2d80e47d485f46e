use pilot_core::{ExecutionRecord, Role};
use tracing::info;

use crate::context::StageContext;
use crate::error::Result;
use crate::prompts::StagePrompts;

/// Ask the oracle for the final answer and close the record.
pub async fn run(ctx: &StageContext, record: &mut ExecutionRecord) -> Result<()> {
    let prompt = StagePrompts::final_output(record);
    let response = ctx.consult(record, prompt).await?;

    record.finish(response.clone())?;
    record.push_message(Role::Assistant, response);
    info!(run_id = %record.id(), "Run finished");
    Ok(())
}
