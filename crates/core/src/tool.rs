//! Tool boundary types.
//!
//! A tool is an external operation invoked by name with named parameters.
//! Faults never cross this boundary as errors: every failure is folded into
//! a failure-shaped [`ToolOutput`] so the pipeline can route on it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Named parameters for a tool invocation.
pub type ToolInput = Map<String, Value>;

/// Structured result of a tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    /// Required when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Tool-specific result fields, opaque to the pipeline.
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl ToolOutput {
    pub fn ok(data: Map<String, Value>) -> Self {
        Self {
            success: true,
            error: None,
            data,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            data: Map::new(),
        }
    }

    pub fn failure_with(error: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            data,
        }
    }

    /// Render the output as a JSON string for narration and oracle context.
    pub fn render(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                "{{\"success\": {}, \"error\": {:?}}}",
                self.success, self.error
            )
        })
    }
}

/// An external operation the pipeline can invoke by name.
///
/// Implementations must not panic and must not return transport errors:
/// any fault is reported as a failure-shaped [`ToolOutput`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// Registry name, unique per tool.
    fn name(&self) -> &str;

    /// One-line description shown to the decision oracle.
    fn description(&self) -> &str;

    async fn invoke(&self, input: &ToolInput) -> ToolOutput;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_output_has_no_error() {
        let mut data = Map::new();
        data.insert("output".to_string(), Value::String("42".to_string()));
        let out = ToolOutput::ok(data);
        assert!(out.success);
        assert!(out.error.is_none());
    }

    #[test]
    fn test_failure_output_carries_error() {
        let out = ToolOutput::failure("boom");
        assert!(!out.success);
        assert_eq!(out.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_render_flattens_data() {
        let mut data = Map::new();
        data.insert("rows".to_string(), Value::from(3));
        let rendered = ToolOutput::ok(data).render();
        assert!(rendered.contains("\"success\":true"));
        assert!(rendered.contains("\"rows\":3"));
    }
}
