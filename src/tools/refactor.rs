use serde_json::Value;

use super::{NO_CODE_REPLY, Tool, ToolError, extract_code_block, reply_text, require_non_empty};
use crate::orchestrator::Orchestrator;
use crate::payload::RequestPayload;

pub fn build_prompt(code: &str, instruction: &str) -> String {
    format!("ORIGINAL CODE:\n\n{code}\n\nMODIFICATION INSTRUCTION:\n\n{instruction}")
}

pub fn build_request(code: &str, instruction: &str) -> Result<RequestPayload, ToolError> {
    require_non_empty(code, "both the code and the modification instruction")?;
    require_non_empty(instruction, "both the code and the modification instruction")?;
    Ok(Tool::Refactor.single_turn(build_prompt(code, instruction)))
}

/// Code from the reply: the first fenced block, or the whole reply trimmed.
pub fn interpret(response: &Value) -> Result<String, ToolError> {
    let text = reply_text(response)?.unwrap_or_else(|| NO_CODE_REPLY.to_string());
    Ok(extract_code_block(&text))
}

pub async fn refactor(
    orchestrator: &Orchestrator,
    code: &str,
    instruction: &str,
) -> Result<String, ToolError> {
    let payload = build_request(code, instruction)?;
    let response = orchestrator.send(&payload).await?;
    interpret(&response)
}
