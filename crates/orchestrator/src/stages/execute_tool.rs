use pilot_core::{ErrorRecord, ExecutionRecord, ToolOutput};
use tracing::{info, warn};

use crate::context::StageContext;
use crate::error::Result;

/// Invoke the currently selected tool exactly once and store its output.
///
/// This stage never consults the oracle. An unknown tool name and a failing
/// invocation both land as a failure-shaped output; the interpret stage and
/// its oracle decide what happens next.
pub async fn run(ctx: &StageContext, record: &mut ExecutionRecord) -> Result<()> {
    let Some(name) = record.current_tool().map(str::to_string) else {
        record.set_tool_output(ToolOutput::failure("No tool selected"));
        return Ok(());
    };
    let input = record.tool_input().cloned().unwrap_or_default();

    let Some(tool) = ctx.registry.get(&name) else {
        warn!(run_id = %record.id(), tool = %name, "Requested tool is not registered");
        record.set_tool_output(ToolOutput::failure(format!(
            "Tool '{}' is not available. Available tools are: {}",
            name,
            ctx.registry.names().join(", ")
        )));
        return Ok(());
    };

    info!(run_id = %record.id(), tool = %name, "Executing tool");
    let output = tool.invoke(&input).await;

    if !output.success {
        let message = output
            .error
            .clone()
            .unwrap_or_else(|| "Tool reported failure without a message".to_string());
        warn!(run_id = %record.id(), tool = %name, error = %message, "Tool execution failed");
        record.log_error(ErrorRecord::tool_execution(
            &name,
            input,
            message,
            output.render(),
        ));
    }

    record.set_tool_output(output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::registry::ToolRegistry;
    use crate::testing::{test_context_with, FailingTool, OkTool};
    use pilot_core::{ErrorKind, ToolInput};
    use serde_json::Value;

    fn record_with_tool(name: &str) -> ExecutionRecord {
        let mut record = ExecutionRecord::new("task");
        let mut input = ToolInput::new();
        input.insert("path".to_string(), Value::String("a.txt".to_string()));
        record.set_tool(name, input);
        record
    }

    #[tokio::test]
    async fn test_successful_invocation_stores_output() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(OkTool::named("read_file")));
        let ctx = test_context_with(registry, &[]);
        let mut record = record_with_tool("read_file");

        run(&ctx, &mut record).await.unwrap();

        let output = record.tool_output().unwrap();
        assert!(output.success);
        assert!(record.errors().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tool_fails_without_error_entry() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(OkTool::named("read_file")));
        registry.register(Arc::new(OkTool::named("write_file")));
        let ctx = test_context_with(registry, &[]);
        let mut record = record_with_tool("teleport");

        run(&ctx, &mut record).await.unwrap();

        let output = record.tool_output().unwrap();
        assert!(!output.success);
        assert_eq!(
            output.error.as_deref(),
            Some("Tool 'teleport' is not available. Available tools are: read_file, write_file")
        );
        assert!(record.errors().is_empty());
    }

    #[tokio::test]
    async fn test_failing_tool_logs_execution_error() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(FailingTool::named("read_file", "disk on fire")));
        let ctx = test_context_with(registry, &[]);
        let mut record = record_with_tool("read_file");

        run(&ctx, &mut record).await.unwrap();

        assert!(!record.tool_output().unwrap().success);
        assert_eq!(record.errors().len(), 1);
        let error = &record.errors()[0];
        assert_eq!(error.kind, ErrorKind::ToolExecution);
        assert_eq!(error.message, "disk on fire");
        assert_eq!(error.tool.as_deref(), Some("read_file"));
        assert!(error.tool_input.is_some());
    }
}
