use serde_json::Value;

use super::{Tool, ToolError, reply_text, require_non_empty};
use crate::orchestrator::Orchestrator;
use crate::payload::RequestPayload;
use crate::render::{Segment, render};

pub const NO_EXPLANATION: &str =
    "Could not get a clear explanation. Try a different piece of code.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explanation {
    pub text: String,
    pub segments: Vec<Segment>,
}

pub fn build_request(code: &str) -> Result<RequestPayload, ToolError> {
    require_non_empty(code, "some code to explain")?;
    Ok(Tool::Explain.single_turn(code))
}

pub fn interpret(response: &Value) -> Result<Explanation, ToolError> {
    let text = reply_text(response)?.unwrap_or_else(|| NO_EXPLANATION.to_string());
    let segments = render(Some(&text));
    Ok(Explanation { text, segments })
}

pub async fn explain(orchestrator: &Orchestrator, code: &str) -> Result<Explanation, ToolError> {
    let payload = build_request(code)?;
    let response = orchestrator.send(&payload).await?;
    interpret(&response)
}
