//! Pipeline stage graph.
//!
//! Most stages have a single fixed successor. `InterpretOutput` and
//! `HandleError` are the only branching stages; each produces a closed-set
//! verdict and the runner dispatches strictly on it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    Plan,
    SelectTool,
    ExecuteTool,
    InterpretOutput,
    HandleError,
    Finalize,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Plan => "plan",
            Self::SelectTool => "select_tool",
            Self::ExecuteTool => "execute_tool",
            Self::InterpretOutput => "interpret_output",
            Self::HandleError => "handle_error",
            Self::Finalize => "finalize",
        }
    }
}

/// Routing verdict produced by the interpret-output stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputVerdict {
    ContinuePlan,
    ReportError,
    GenerateOutput,
}

impl OutputVerdict {
    /// Map an oracle-provided label to a verdict. Absent or unrecognized
    /// labels continue the plan, which favors forward progress.
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(str::trim) {
            Some("report_error") => Self::ReportError,
            Some("generate_output") => Self::GenerateOutput,
            _ => Self::ContinuePlan,
        }
    }
}

/// Routing verdict produced by the handle-error stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryVerdict {
    /// Retry tool execution with the updated tool and parameters.
    Retry,
    /// Recovery exhausted or unparseable; go straight to finalize.
    Finalize,
}

pub struct StageMachine;

impl StageMachine {
    /// Fixed successor for non-branching stages. `Finalize` is terminal.
    pub fn successor(stage: Stage) -> Option<Stage> {
        match stage {
            Stage::Start => Some(Stage::Plan),
            Stage::Plan => Some(Stage::SelectTool),
            Stage::SelectTool => Some(Stage::ExecuteTool),
            Stage::ExecuteTool => Some(Stage::InterpretOutput),
            Stage::InterpretOutput | Stage::HandleError => None,
            Stage::Finalize => None,
        }
    }

    pub fn is_branching(stage: Stage) -> bool {
        matches!(stage, Stage::InterpretOutput | Stage::HandleError)
    }

    pub fn dispatch(verdict: OutputVerdict) -> Stage {
        match verdict {
            OutputVerdict::ContinuePlan => Stage::SelectTool,
            OutputVerdict::ReportError => Stage::HandleError,
            OutputVerdict::GenerateOutput => Stage::Finalize,
        }
    }

    pub fn dispatch_recovery(verdict: RecoveryVerdict) -> Stage {
        match verdict {
            RecoveryVerdict::Retry => Stage::ExecuteTool,
            RecoveryVerdict::Finalize => Stage::Finalize,
        }
    }
}
