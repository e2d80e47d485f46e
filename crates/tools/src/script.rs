//! Script execution tools.
//!
//! Scripts run as a child process of the configured interpreter with a hard
//! wall-clock timeout. Exit status decides success; stdout and stderr are
//! captured into the output either way.

use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use pilot_core::{Tool, ToolInput, ToolOutput};
use serde_json::Value;
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Execute a script with the configured interpreter and report its output.
pub struct RunScript {
    interpreter: String,
    timeout: Duration,
}

impl RunScript {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Tool for RunScript {
    fn name(&self) -> &str {
        "run_script"
    }

    fn description(&self) -> &str {
        "Execute a script and return its output. Input: {\"source\": \"<script source>\"}"
    }

    async fn invoke(&self, input: &ToolInput) -> ToolOutput {
        let Some(source) = input.get("source").and_then(Value::as_str) else {
            return ToolOutput::failure("Missing required parameter: source");
        };
        run_source(&self.interpreter, source, self.timeout).await
    }
}

/// Execute a script written to answer a specific question.
///
/// Same execution path as [`RunScript`]; the question is echoed into the
/// output and a blank `answer` slot is added on success for the oracle to
/// interpret against.
pub struct EvalScript {
    interpreter: String,
    timeout: Duration,
}

impl EvalScript {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Tool for EvalScript {
    fn name(&self) -> &str {
        "eval_script"
    }

    fn description(&self) -> &str {
        "Execute a script to answer a question. Input: {\"source\": \"<script source>\", \"question\": \"<question>\"}"
    }

    async fn invoke(&self, input: &ToolInput) -> ToolOutput {
        let Some(source) = input.get("source").and_then(Value::as_str) else {
            return ToolOutput::failure("Missing required parameter: source");
        };
        let Some(question) = input.get("question").and_then(Value::as_str) else {
            return ToolOutput::failure("Missing required parameter: question");
        };

        let mut output = run_source(&self.interpreter, source, self.timeout).await;
        output
            .data
            .insert("question".to_string(), Value::String(question.to_string()));
        if output.success {
            output
                .data
                .insert("answer".to_string(), Value::String(String::new()));
        }
        output
    }
}

async fn run_source(interpreter: &str, source: &str, timeout: Duration) -> ToolOutput {
    let mut file = match tempfile::NamedTempFile::new() {
        Ok(file) => file,
        Err(e) => return ToolOutput::failure(format!("Failed to stage script: {}", e)),
    };
    if let Err(e) = file.write_all(source.as_bytes()) {
        return ToolOutput::failure(format!("Failed to stage script: {}", e));
    }

    debug!(interpreter, bytes = source.len(), "Running script");
    let command = tokio::process::Command::new(interpreter)
        .arg(file.path())
        .kill_on_drop(true)
        .output();

    let result = match tokio::time::timeout(timeout, command).await {
        Ok(result) => result,
        Err(_) => {
            return ToolOutput::failure(format!(
                "Script execution timed out after {}s",
                timeout.as_secs()
            ))
        }
    };

    let output = match result {
        Ok(output) => output,
        Err(e) => return ToolOutput::failure(format!("Failed to run {}: {}", interpreter, e)),
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    let status = output.status.code().unwrap_or(-1);

    let mut data = ToolInput::new();
    data.insert("output".to_string(), Value::String(stdout));
    data.insert("status".to_string(), Value::from(status));

    if output.status.success() {
        ToolOutput::ok(data)
    } else {
        let error = if stderr.trim().is_empty() {
            format!("Process exited with status {}", status)
        } else {
            stderr
        };
        ToolOutput::failure_with(error, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(pairs: &[(&str, Value)]) -> ToolInput {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_run_script_captures_stdout() {
        let tool = RunScript::new("sh");
        let output = tool.invoke(&input(&[("source", json!("echo hello"))])).await;

        assert!(output.success);
        assert_eq!(
            output.data.get("output").unwrap().as_str(),
            Some("hello\n")
        );
        assert_eq!(output.data.get("status").unwrap().as_i64(), Some(0));
    }

    #[tokio::test]
    async fn test_run_script_nonzero_exit_is_failure() {
        let tool = RunScript::new("sh");
        let output = tool
            .invoke(&input(&[("source", json!("echo doomed >&2; exit 3"))]))
            .await;

        assert!(!output.success);
        assert!(output.error.as_deref().unwrap().contains("doomed"));
        assert_eq!(output.data.get("status").unwrap().as_i64(), Some(3));
    }

    #[tokio::test]
    async fn test_run_script_missing_source() {
        let tool = RunScript::new("sh");
        let output = tool.invoke(&ToolInput::new()).await;

        assert!(!output.success);
        assert_eq!(
            output.error.as_deref(),
            Some("Missing required parameter: source")
        );
    }

    #[tokio::test]
    async fn test_run_script_timeout() {
        let tool = RunScript::new("sh").with_timeout(Duration::from_millis(200));
        let output = tool.invoke(&input(&[("source", json!("sleep 5"))])).await;

        assert!(!output.success);
        assert!(output.error.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_eval_script_echoes_question_and_answer_slot() {
        let tool = EvalScript::new("sh");
        let output = tool
            .invoke(&input(&[
                ("source", json!("echo 42")),
                ("question", json!("what is the answer?")),
            ]))
            .await;

        assert!(output.success);
        assert_eq!(
            output.data.get("question").unwrap().as_str(),
            Some("what is the answer?")
        );
        assert_eq!(output.data.get("answer").unwrap().as_str(), Some(""));
    }

    #[tokio::test]
    async fn test_eval_script_failure_has_no_answer_slot() {
        let tool = EvalScript::new("sh");
        let output = tool
            .invoke(&input(&[
                ("source", json!("exit 1")),
                ("question", json!("q")),
            ]))
            .await;

        assert!(!output.success);
        assert!(output.data.get("answer").is_none());
        assert!(output.data.get("question").is_some());
    }
}
