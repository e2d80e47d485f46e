//! Shared helpers for stage and runner tests.

use std::sync::Arc;

use async_trait::async_trait;
use pilot_core::{Tool, ToolInput, ToolOutput};
use serde_json::Value;

use crate::context::StageContext;
use crate::oracle::ScriptedOracle;
use crate::registry::ToolRegistry;
use crate::runner::RunnerConfig;

/// Tool that reports success and echoes its input under an `echo` key.
pub struct OkTool {
    name: &'static str,
}

impl OkTool {
    pub fn named(name: &'static str) -> Self {
        Self { name }
    }
}

#[async_trait]
impl Tool for OkTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "Always succeeds"
    }

    async fn invoke(&self, input: &ToolInput) -> ToolOutput {
        let mut data = ToolInput::new();
        data.insert("echo".to_string(), Value::Object(input.clone()));
        ToolOutput::ok(data)
    }
}

/// Tool that always reports a failure-shaped output.
pub struct FailingTool {
    name: &'static str,
    message: &'static str,
}

impl FailingTool {
    pub fn named(name: &'static str, message: &'static str) -> Self {
        Self { name, message }
    }
}

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "Always fails"
    }

    async fn invoke(&self, _input: &ToolInput) -> ToolOutput {
        ToolOutput::failure(self.message)
    }
}

pub fn test_context(responses: &[&str]) -> StageContext {
    test_context_with(ToolRegistry::new(), responses)
}

pub fn test_context_with(registry: ToolRegistry, responses: &[&str]) -> StageContext {
    StageContext::new(
        Arc::new(ScriptedOracle::from_slices(responses)),
        Arc::new(registry),
        RunnerConfig::default(),
    )
}
