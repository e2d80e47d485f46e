use pilot_core::{ErrorRecord, ExecutionRecord, Role};
use tracing::{info, warn};

use crate::context::StageContext;
use crate::decision::{parse_output_decision, truncate_middle};
use crate::error::Result;
use crate::prompts::StagePrompts;
use crate::state_machine::OutputVerdict;

const OUTPUT_HEAD_CHARS: usize = 250;
const OUTPUT_TAIL_CHARS: usize = 250;

/// Ask the oracle what the tool output means and where to go next.
///
/// An unparseable decision is logged and treated as `ContinuePlan`, so a
/// confused oracle keeps the run moving instead of wedging it.
pub async fn run(ctx: &StageContext, record: &mut ExecutionRecord) -> Result<OutputVerdict> {
    let prompt = StagePrompts::tool_processing(record);
    let response = ctx.consult(record, prompt).await?;

    let (verdict, reasoning) = match parse_output_decision(&response) {
        Ok(decision) => {
            if let Some(updated_plan) = decision.updated_plan {
                info!(
                    run_id = %record.id(),
                    steps = updated_plan.len(),
                    "Plan updated from tool output"
                );
                record.set_plan(updated_plan);
            }
            (decision.verdict, decision.reasoning)
        }
        Err(e) => {
            warn!(
                run_id = %record.id(),
                error = %e.reason,
                "Output decision unparseable, continuing with the plan"
            );
            record.log_error(ErrorRecord::decision_parse(e.reason, e.response));
            (
                OutputVerdict::ContinuePlan,
                "The tool output could not be interpreted, continuing with the plan.".to_string(),
            )
        }
    };

    let tool = record.current_tool().unwrap_or("(none)").to_string();
    let (status, rendered) = match record.tool_output() {
        Some(output) => (
            if output.success { "success" } else { "failure" },
            truncate_middle(&output.render(), OUTPUT_HEAD_CHARS, OUTPUT_TAIL_CHARS),
        ),
        None => ("failure", "(no output)".to_string()),
    };
    record.push_message(
        Role::Assistant,
        format!(
            "Tool {} execution result: {}\n\nOutput: {}\n\n{}",
            tool, status, rendered, reasoning
        ),
    );

    info!(run_id = %record.id(), verdict = ?verdict, "Tool output interpreted");
    Ok(verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_context;
    use pilot_core::{ErrorKind, ToolInput, ToolOutput};
    use serde_json::Value;

    fn record_after_execution(success: bool) -> ExecutionRecord {
        let mut record = ExecutionRecord::new("task");
        record.set_plan(vec!["Read the file".to_string()]);
        let mut input = ToolInput::new();
        input.insert("path".to_string(), Value::String("a.txt".to_string()));
        record.set_tool("read_file", input);
        if success {
            let mut data = ToolInput::new();
            data.insert("content".to_string(), Value::String("hello".to_string()));
            record.set_tool_output(ToolOutput::ok(data));
        } else {
            record.set_tool_output(ToolOutput::failure("File not found: a.txt"));
        }
        record
    }

    #[tokio::test]
    async fn test_generate_output_verdict() {
        let ctx = test_context(&[r#"{"decision": "generate_output", "reasoning": "all done"}"#]);
        let mut record = record_after_execution(true);

        let verdict = run(&ctx, &mut record).await.unwrap();

        assert_eq!(verdict, OutputVerdict::GenerateOutput);
        let narration = &record.history().last().unwrap().content;
        assert!(narration.contains("Tool read_file execution result: success"));
        assert!(narration.contains("all done"));
    }

    #[tokio::test]
    async fn test_updated_plan_replaces_plan() {
        let ctx = test_context(&[
            r#"{"decision": "continue_plan", "reasoning": "more to do", "updated_plan": ["Parse rows", "Summarize"]}"#,
        ]);
        let mut record = record_after_execution(true);

        let verdict = run(&ctx, &mut record).await.unwrap();

        assert_eq!(verdict, OutputVerdict::ContinuePlan);
        assert_eq!(record.plan().unwrap(), ["Parse rows", "Summarize"]);
    }

    #[tokio::test]
    async fn test_unparseable_decision_continues_plan() {
        let ctx = test_context(&["I have no idea."]);
        let mut record = record_after_execution(false);

        let verdict = run(&ctx, &mut record).await.unwrap();

        assert_eq!(verdict, OutputVerdict::ContinuePlan);
        assert_eq!(record.errors().len(), 1);
        assert_eq!(record.errors()[0].kind, ErrorKind::DecisionParse);
        let narration = &record.history().last().unwrap().content;
        assert!(narration.contains("Tool read_file execution result: failure"));
    }

    #[tokio::test]
    async fn test_report_error_verdict() {
        let ctx = test_context(&[r#"{"decision": "report_error", "reasoning": "tool failed"}"#]);
        let mut record = record_after_execution(false);

        let verdict = run(&ctx, &mut record).await.unwrap();

        assert_eq!(verdict, OutputVerdict::ReportError);
    }
}
