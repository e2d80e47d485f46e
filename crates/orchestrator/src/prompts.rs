use pilot_core::ExecutionRecord;

use crate::registry::ToolRegistry;

/// Prompt templates for each oracle consultation.
///
/// The tool list is rendered from the registry so the oracle only ever sees
/// tools that can actually be resolved.
pub struct StagePrompts;

impl StagePrompts {
    pub fn system() -> &'static str {
        "You are an assistant that accomplishes tasks by driving a fixed pipeline of tools.\n\
         You plan, pick one tool at a time, inspect its output, recover from errors, and\n\
         finish with a clear answer. Be thorough but concise."
    }

    pub fn planning(record: &ExecutionRecord, registry: &ToolRegistry) -> String {
        format!(
            r#"Based on the user's request, create a step-by-step plan to accomplish the task.
Be thorough but concise. Focus on how to use the available tools effectively.

Available tools:
{tools}

User's request: {input}

Answer with the plan only, one step per line. Lines starting with # are ignored."#,
            tools = registry.descriptions_block(),
            input = record.input()
        )
    }

    pub fn tool_selection(record: &ExecutionRecord, registry: &ToolRegistry) -> String {
        format!(
            r#"Based on the user's request and your plan, select the most appropriate tool to use next.

Available tools:
{tools}

Current plan:
{plan}

Select a tool from the available list and specify the required input parameters.
Respond in JSON format:
```json
{{
  "tool": "tool_name",
  "tool_input": {{
    "param1": "value1"
  }},
  "reasoning": "Brief explanation of why this tool was chosen"
}}
```"#,
            tools = registry.descriptions_block(),
            plan = render_plan(record)
        )
    }

    pub fn tool_processing(record: &ExecutionRecord) -> String {
        format!(
            r#"Process the output from the tool and determine the next steps.
If the tool execution was successful, update the plan and decide what to do next.
If there was an error, we'll need to handle it.

Tool used: {tool}
Tool input: {input}
Tool output: {output}

Current plan:
{plan}

Based on the tool output, decide what to do next:
1. Continue with the plan (if the tool executed successfully)
2. Report an error (if there was an error that needs handling)
3. Generate the final output (if we've completed the plan)

Respond in JSON format:
```json
{{
  "decision": "continue_plan | report_error | generate_output",
  "reasoning": "Brief explanation of your decision",
  "updated_plan": ["Step 1", "Step 2"]
}}
```
The "updated_plan" key is optional."#,
            tool = record.current_tool().unwrap_or("(none)"),
            input = render_tool_input(record),
            output = render_tool_output(record),
            plan = render_plan(record)
        )
    }

    pub fn error_handling(record: &ExecutionRecord) -> String {
        let errors = record
            .errors()
            .iter()
            .map(|e| format!("- [{}] {}", e.kind.as_str(), e.message))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"An error occurred during tool execution. Let's try to fix it and adapt our approach.

Tool used: {tool}
Tool input: {input}
Error: {output}

Current plan:
{plan}

Previous errors:
{errors}

Fix attempts so far: {attempts}

Analyze the error and provide a solution to fix it. Be adaptive in your approach.
If the error persists after multiple attempts, consider an alternative approach.

Respond in JSON format:
```json
{{
  "error_analysis": "Analysis of what went wrong",
  "solution": "Proposed solution",
  "updated_tool": "tool_name (same or different tool)",
  "updated_tool_input": {{
    "param1": "value1"
  }}
}}
```"#,
            tool = record.current_tool().unwrap_or("(none)"),
            input = render_tool_input(record),
            output = render_tool_output(record),
            plan = render_plan(record),
            errors = if errors.is_empty() { "(none)".to_string() } else { errors },
            attempts = record.error_fix_attempts()
        )
    }

    pub fn final_output(record: &ExecutionRecord) -> String {
        format!(
            r#"Based on all the interactions and tool executions, generate a comprehensive final response for the user.

User's original request: {input}

Plan executed:
{plan}

Provide a clear, concise summary of what was accomplished and any relevant results or outputs.
If there were any limitations or issues, mention them briefly along with any suggested next steps."#,
            input = record.input(),
            plan = render_plan(record)
        )
    }
}

fn render_plan(record: &ExecutionRecord) -> String {
    match record.plan() {
        Some(steps) if !steps.is_empty() => steps
            .iter()
            .enumerate()
            .map(|(i, step)| format!("{}. {}", i + 1, step))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => "(no plan)".to_string(),
    }
}

fn render_tool_input(record: &ExecutionRecord) -> String {
    record
        .tool_input()
        .and_then(|input| serde_json::to_string(input).ok())
        .unwrap_or_else(|| "{}".to_string())
}

fn render_tool_output(record: &ExecutionRecord) -> String {
    record
        .tool_output()
        .map(|output| output.render())
        .unwrap_or_else(|| "(no output)".to_string())
}
