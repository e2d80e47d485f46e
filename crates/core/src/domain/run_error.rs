use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The oracle response did not contain well-formed structured data.
    DecisionParse,
    /// A tool invocation raised a fault.
    ToolExecution,
    /// The requested tool name is absent from the registry.
    ToolNotFound,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DecisionParse => "decision_parse_error",
            Self::ToolExecution => "tool_execution_error",
            Self::ToolNotFound => "tool_not_found",
        }
    }
}

/// Structured error entry in a run's error log. The log is append-only and
/// never cleared during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub message: String,
    /// Tool that was being executed, when the error came from a tool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    /// Input the tool was invoked with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_input: Option<Map<String, Value>>,
    /// Raw diagnostic text: the unparseable oracle response, or a
    /// tool-provided trace.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl ErrorRecord {
    pub fn decision_parse(message: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::DecisionParse,
            message: message.into(),
            tool: None,
            tool_input: None,
            raw: Some(response.into()),
        }
    }

    pub fn tool_execution(
        tool: impl Into<String>,
        tool_input: Map<String, Value>,
        message: impl Into<String>,
        trace: impl Into<String>,
    ) -> Self {
        Self {
            kind: ErrorKind::ToolExecution,
            message: message.into(),
            tool: Some(tool.into()),
            tool_input: Some(tool_input),
            raw: Some(trace.into()),
        }
    }

    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        let tool = tool.into();
        Self {
            kind: ErrorKind::ToolNotFound,
            message: format!("Tool '{}' is not available", tool),
            tool: Some(tool),
            tool_input: None,
            raw: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_labels() {
        assert_eq!(ErrorKind::DecisionParse.as_str(), "decision_parse_error");
        assert_eq!(ErrorKind::ToolExecution.as_str(), "tool_execution_error");
        assert_eq!(ErrorKind::ToolNotFound.as_str(), "tool_not_found");
    }

    #[test]
    fn test_decision_parse_keeps_raw_response() {
        let record = ErrorRecord::decision_parse("expected key `tool`", "not json at all");
        assert_eq!(record.kind, ErrorKind::DecisionParse);
        assert_eq!(record.raw.as_deref(), Some("not json at all"));
        assert!(record.tool.is_none());
    }

    #[test]
    fn test_tool_execution_carries_context() {
        let mut input = Map::new();
        input.insert("path".to_string(), Value::String("/tmp/x".to_string()));
        let record = ErrorRecord::tool_execution("read_file", input, "io failure", "trace");
        assert_eq!(record.tool.as_deref(), Some("read_file"));
        assert!(record.tool_input.is_some());
        assert_eq!(record.raw.as_deref(), Some("trace"));
    }
}
