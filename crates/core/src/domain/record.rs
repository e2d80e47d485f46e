use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::message::{Message, Role};
use crate::domain::run_error::ErrorRecord;
use crate::error::CoreError;
use crate::tool::{ToolInput, ToolOutput};

/// The mutable state of one task run, threaded through every pipeline stage.
///
/// The record is exclusively owned by the runner for the lifetime of a run
/// and is never shared across runs. Mutation goes through methods so the
/// record invariants hold at every observation point:
///
/// - `tool_input` is present iff `current_tool` is present
/// - `error_fix_attempts` never decreases
/// - `history` and `errors` are append-only
/// - `final_output` is set at most once
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    id: Uuid,
    input: String,
    history: Vec<Message>,
    plan: Option<Vec<String>>,
    current_tool: Option<String>,
    tool_input: Option<ToolInput>,
    tool_output: Option<ToolOutput>,
    errors: Vec<ErrorRecord>,
    error_fix_attempts: u32,
    final_output: Option<String>,
    created_at: DateTime<Utc>,
}

impl ExecutionRecord {
    /// Create a fresh record for one task submission.
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            input: input.into(),
            history: Vec::new(),
            plan: None,
            current_tool: None,
            tool_input: None,
            tool_output: None,
            errors: Vec::new(),
            error_fix_attempts: 0,
            final_output: None,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The original task text. Immutable after creation.
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn push_message(&mut self, role: Role, content: impl Into<String>) {
        self.history.push(Message::new(role, content));
    }

    pub fn plan(&self) -> Option<&[String]> {
        self.plan.as_deref()
    }

    /// Set or replace the plan wholesale. An empty plan is a valid plan.
    pub fn set_plan(&mut self, steps: Vec<String>) {
        self.plan = Some(steps);
    }

    pub fn current_tool(&self) -> Option<&str> {
        self.current_tool.as_deref()
    }

    pub fn tool_input(&self) -> Option<&ToolInput> {
        self.tool_input.as_ref()
    }

    /// Select a tool together with its parameters. This is the only way to
    /// populate `current_tool`/`tool_input`, which keeps them paired.
    pub fn set_tool(&mut self, name: impl Into<String>, input: ToolInput) {
        self.current_tool = Some(name.into());
        self.tool_input = Some(input);
    }

    pub fn tool_output(&self) -> Option<&ToolOutput> {
        self.tool_output.as_ref()
    }

    pub fn set_tool_output(&mut self, output: ToolOutput) {
        self.tool_output = Some(output);
    }

    pub fn errors(&self) -> &[ErrorRecord] {
        &self.errors
    }

    pub fn log_error(&mut self, record: ErrorRecord) {
        self.errors.push(record);
    }

    pub fn error_fix_attempts(&self) -> u32 {
        self.error_fix_attempts
    }

    /// Increment the fix-attempt counter and return the new value.
    pub fn bump_fix_attempts(&mut self) -> u32 {
        self.error_fix_attempts += 1;
        self.error_fix_attempts
    }

    pub fn final_output(&self) -> Option<&str> {
        self.final_output.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        self.final_output.is_some()
    }

    /// Set the final output. Fails if the run already finished; the pipeline
    /// must not run any stage past that point.
    pub fn finish(&mut self, output: impl Into<String>) -> Result<(), CoreError> {
        if self.final_output.is_some() {
            return Err(CoreError::FinalOutputAlreadySet(self.id));
        }
        self.final_output = Some(output.into());
        Ok(())
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
