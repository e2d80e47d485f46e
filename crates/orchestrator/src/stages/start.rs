use pilot_core::{ExecutionRecord, Role};
use tracing::debug;

use crate::context::StageContext;

/// Seed the narration with the user's request.
pub fn run(_ctx: &StageContext, record: &mut ExecutionRecord) {
    debug!(run_id = %record.id(), "Starting run");
    let input = record.input().to_string();
    record.push_message(Role::User, input);
}
