use pilot_core::{ErrorRecord, ExecutionRecord, Role};
use tracing::{info, warn};

use crate::context::StageContext;
use crate::decision::parse_tool_selection;
use crate::error::Result;
use crate::prompts::StagePrompts;

/// Ask the oracle which tool to run next.
///
/// A malformed selection is logged as a decision-parse error and replaced by
/// the configured default tool, so the pipeline never halts on oracle
/// malformation.
pub async fn run(ctx: &StageContext, record: &mut ExecutionRecord) -> Result<()> {
    let prompt = StagePrompts::tool_selection(record, &ctx.registry);
    let response = ctx.consult(record, prompt).await?;

    match parse_tool_selection(&response) {
        Ok(selection) => {
            info!(
                run_id = %record.id(),
                tool = %selection.tool,
                "Tool selected"
            );
            let rendered_input = serde_json::to_string_pretty(&selection.tool_input)
                .unwrap_or_else(|_| "{}".to_string());
            record.set_tool(selection.tool.clone(), selection.tool_input);
            record.push_message(
                Role::Assistant,
                format!(
                    "I'll use the {} tool with these parameters: {}\n\nReasoning: {}",
                    selection.tool, rendered_input, selection.reasoning
                ),
            );
        }
        Err(e) => {
            warn!(
                run_id = %record.id(),
                error = %e.reason,
                "Tool selection unparseable, falling back to default tool"
            );
            record.log_error(ErrorRecord::decision_parse(e.reason, e.response));
            record.set_tool(
                ctx.config.default_tool.clone(),
                ctx.config.default_tool_input.clone(),
            );
            record.push_message(
                Role::Assistant,
                format!(
                    "I could not parse the tool selection, so I'll fall back to the {} tool.",
                    ctx.config.default_tool
                ),
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_context;
    use pilot_core::ErrorKind;

    #[tokio::test]
    async fn test_valid_selection_sets_tool() {
        let ctx = test_context(&[
            r#"```json
{"tool": "read_file", "tool_input": {"path": "data.csv"}, "reasoning": "need data"}
```"#,
        ]);
        let mut record = ExecutionRecord::new("task");

        run(&ctx, &mut record).await.unwrap();

        assert_eq!(record.current_tool(), Some("read_file"));
        assert!(record.tool_input().is_some());
        assert!(record.errors().is_empty());
        assert!(record.history()[0].content.contains("need data"));
    }

    #[tokio::test]
    async fn test_unparseable_selection_falls_back_to_default() {
        let ctx = test_context(&["no JSON here, sorry"]);
        let mut record = ExecutionRecord::new("task");

        run(&ctx, &mut record).await.unwrap();

        assert_eq!(record.errors().len(), 1);
        assert_eq!(record.errors()[0].kind, ErrorKind::DecisionParse);
        assert_eq!(
            record.errors()[0].raw.as_deref(),
            Some("no JSON here, sorry")
        );
        assert_eq!(
            record.current_tool(),
            Some(ctx.config.default_tool.as_str())
        );
        assert!(record.tool_input().is_some());
    }
}
