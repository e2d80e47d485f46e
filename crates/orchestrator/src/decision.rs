//! Typed extraction of structured decisions from oracle free text.
//!
//! The oracle is asked to answer with a fenced JSON block, but responses
//! arrive as free text. Extraction follows a documented fallback chain:
//! labeled ```json fence, then the raw body, then the first `{` .. last `}`
//! slice. If none of those parse into the expected shape the caller gets a
//! [`DecisionError`] carrying the raw response, and each stage applies its
//! own fallback. Parsing is a pure function of the response text.

use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::state_machine::OutputVerdict;

#[derive(Debug, Error)]
#[error("Malformed oracle decision: {reason}")]
pub struct DecisionError {
    pub reason: String,
    /// The oracle response as received, for the error log.
    pub response: String,
}

/// Decision payload of the select-tool stage.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ToolSelection {
    pub tool: String,
    pub tool_input: Map<String, Value>,
    #[serde(default)]
    pub reasoning: String,
}

/// Decision payload of the interpret-output stage.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputDecision {
    pub verdict: OutputVerdict,
    pub reasoning: String,
    pub updated_plan: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawOutputDecision {
    #[serde(default)]
    decision: Option<String>,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    updated_plan: Option<Vec<String>>,
}

/// Decision payload of the handle-error stage.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ErrorSolution {
    #[serde(default)]
    pub error_analysis: String,
    #[serde(default)]
    pub solution: String,
    pub updated_tool: String,
    pub updated_tool_input: Map<String, Value>,
}

pub fn parse_tool_selection(response: &str) -> Result<ToolSelection, DecisionError> {
    parse_decision(response)
}

pub fn parse_output_decision(response: &str) -> Result<OutputDecision, DecisionError> {
    let raw: RawOutputDecision = parse_decision(response)?;
    Ok(OutputDecision {
        verdict: OutputVerdict::from_label(raw.decision.as_deref()),
        reasoning: raw.reasoning,
        updated_plan: raw.updated_plan,
    })
}

pub fn parse_error_solution(response: &str) -> Result<ErrorSolution, DecisionError> {
    parse_decision(response)
}

fn parse_decision<T: serde::de::DeserializeOwned>(response: &str) -> Result<T, DecisionError> {
    let mut last_err = None;

    for candidate in extraction_candidates(response) {
        match serde_json::from_str::<T>(candidate) {
            Ok(decision) => return Ok(decision),
            Err(e) => last_err = Some(e),
        }
    }

    Err(DecisionError {
        reason: last_err
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no structured data found".to_string()),
        response: response.to_string(),
    })
}

/// The fallback chain, in order: labeled fence, raw body, brace slice.
fn extraction_candidates(response: &str) -> Vec<&str> {
    let mut candidates = Vec::new();

    if let Some(fenced) = extract_fenced_block(response) {
        candidates.push(fenced);
    }

    candidates.push(response.trim());

    if let (Some(start), Some(end)) = (response.find('{'), response.rfind('}')) {
        if start < end {
            candidates.push(&response[start..=end]);
        }
    }

    candidates
}

fn extract_fenced_block(response: &str) -> Option<&str> {
    let start = response.find("```json")? + "```json".len();
    let rest = &response[start..];
    let end = rest.find("```")?;
    Some(rest[..end].trim())
}

/// Split oracle plan text into steps: one step per line, blank lines and
/// `#`-prefixed comment lines dropped. Leading ordinals and bullets
/// (`1.`, `2)`, `-`, `*`) are stripped so numbering stays a render concern.
pub fn parse_plan_lines(text: &str) -> Vec<String> {
    let prefix = Regex::new(r"^(?:\d+[.)]|[-*])\s+").ok();
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| match &prefix {
            Some(re) => re.replace(line, "").into_owned(),
            None => line.to_string(),
        })
        .collect()
}

/// Bound a long output representation to a prefix and suffix, counted in
/// characters. Strings at or under `head + tail` characters pass through
/// untouched.
pub fn truncate_middle(s: &str, head: usize, tail: usize) -> String {
    let total = s.chars().count();
    if total <= head + tail {
        return s.to_string();
    }
    let prefix: String = s.chars().take(head).collect();
    let suffix: String = s.chars().skip(total - tail).collect();
    format!("{}\n...\n{}", prefix, suffix)
}
