use pilot_core::{ErrorRecord, ExecutionRecord, Role};
use tracing::{info, warn};

use crate::context::StageContext;
use crate::decision::parse_error_solution;
use crate::error::Result;
use crate::prompts::StagePrompts;
use crate::state_machine::RecoveryVerdict;

/// Ask the oracle for a recovery and route back to execution or on to the
/// final answer.
///
/// The attempt counter is bumped before the ceiling check, so the ceiling
/// check sees the attempt it is about to grant. Once the counter exceeds the
/// configured maximum the stage gives up without consulting the oracle.
pub async fn run(ctx: &StageContext, record: &mut ExecutionRecord) -> Result<RecoveryVerdict> {
    let attempts = record.bump_fix_attempts();
    if attempts > ctx.config.max_fix_attempts {
        warn!(
            run_id = %record.id(),
            attempts,
            "Fix attempts exhausted, finalizing"
        );
        record.push_message(
            Role::Assistant,
            format!(
                "I was unable to fix the error after {} attempts. I'll summarize what happened instead.",
                ctx.config.max_fix_attempts
            ),
        );
        return Ok(RecoveryVerdict::Finalize);
    }

    let prompt = StagePrompts::error_handling(record);
    let response = ctx.consult(record, prompt).await?;

    match parse_error_solution(&response) {
        Ok(solution) => {
            info!(
                run_id = %record.id(),
                attempts,
                tool = %solution.updated_tool,
                "Recovery proposed"
            );
            let rendered_input = serde_json::to_string_pretty(&solution.updated_tool_input)
                .unwrap_or_else(|_| "{}".to_string());
            record.push_message(
                Role::Assistant,
                format!(
                    "I encountered an error. Here's how I'll fix it:\n\nAnalysis: {}\n\nSolution: {}\n\nI'll retry with the {} tool and these parameters: {}",
                    solution.error_analysis,
                    solution.solution,
                    solution.updated_tool,
                    rendered_input
                ),
            );
            record.set_tool(solution.updated_tool, solution.updated_tool_input);
            Ok(RecoveryVerdict::Retry)
        }
        Err(e) => {
            warn!(
                run_id = %record.id(),
                error = %e.reason,
                "Error solution unparseable, finalizing"
            );
            record.log_error(ErrorRecord::decision_parse(e.reason, e.response));
            record.push_message(
                Role::Assistant,
                "I could not work out a fix for the error. I'll summarize what happened instead."
                    .to_string(),
            );
            Ok(RecoveryVerdict::Finalize)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_context;
    use pilot_core::{ErrorKind, ToolInput};
    use serde_json::Value;

    fn failed_record() -> ExecutionRecord {
        let mut record = ExecutionRecord::new("task");
        let mut input = ToolInput::new();
        input.insert("path".to_string(), Value::String("a.txt".to_string()));
        record.set_tool("read_file", input.clone());
        record.log_error(ErrorRecord::tool_execution(
            "read_file",
            input,
            "File not found: a.txt",
            "trace",
        ));
        record
    }

    #[tokio::test]
    async fn test_solution_retries_with_updated_tool() {
        let ctx = test_context(&[
            r#"{"error_analysis": "wrong path", "solution": "use the full path", "updated_tool": "read_file", "updated_tool_input": {"path": "/data/a.txt"}}"#,
        ]);
        let mut record = failed_record();

        let verdict = run(&ctx, &mut record).await.unwrap();

        assert_eq!(verdict, RecoveryVerdict::Retry);
        assert_eq!(record.error_fix_attempts(), 1);
        assert_eq!(record.current_tool(), Some("read_file"));
        assert_eq!(
            record.tool_input().unwrap().get("path").unwrap().as_str(),
            Some("/data/a.txt")
        );
        assert!(record.history().last().unwrap().content.contains("wrong path"));
    }

    #[tokio::test]
    async fn test_unparseable_solution_finalizes() {
        let ctx = test_context(&["no JSON today"]);
        let mut record = failed_record();

        let verdict = run(&ctx, &mut record).await.unwrap();

        assert_eq!(verdict, RecoveryVerdict::Finalize);
        assert_eq!(record.errors().len(), 2);
        assert_eq!(record.errors()[1].kind, ErrorKind::DecisionParse);
    }

    #[tokio::test]
    async fn test_ceiling_finalizes_without_consulting_oracle() {
        let ctx = test_context(&[]);
        let mut record = failed_record();
        record.bump_fix_attempts();
        record.bump_fix_attempts();
        record.bump_fix_attempts();

        let verdict = run(&ctx, &mut record).await.unwrap();

        assert_eq!(verdict, RecoveryVerdict::Finalize);
        assert_eq!(record.error_fix_attempts(), 4);
        assert!(record
            .history()
            .last()
            .unwrap()
            .content
            .contains("unable to fix the error after 3 attempts"));
    }

    #[tokio::test]
    async fn test_third_attempt_still_consults_oracle() {
        let ctx = test_context(&[
            r#"{"error_analysis": "x", "solution": "y", "updated_tool": "read_file", "updated_tool_input": {}}"#,
        ]);
        let mut record = failed_record();
        record.bump_fix_attempts();
        record.bump_fix_attempts();

        let verdict = run(&ctx, &mut record).await.unwrap();

        assert_eq!(verdict, RecoveryVerdict::Retry);
        assert_eq!(record.error_fix_attempts(), 3);
    }
}
