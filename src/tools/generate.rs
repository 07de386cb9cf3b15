use serde_json::Value;

use super::{NO_CODE_REPLY, Tool, ToolError, extract_code_block, reply_text, require_non_empty};
use crate::orchestrator::Orchestrator;
use crate::payload::RequestPayload;

pub fn build_request(prompt: &str) -> Result<RequestPayload, ToolError> {
    require_non_empty(prompt, "a prompt to generate code from")?;
    Ok(Tool::Generate.single_turn(prompt))
}

pub fn interpret(response: &Value) -> Result<String, ToolError> {
    let text = reply_text(response)?.unwrap_or_else(|| NO_CODE_REPLY.to_string());
    Ok(extract_code_block(&text))
}

pub async fn generate(orchestrator: &Orchestrator, prompt: &str) -> Result<String, ToolError> {
    let payload = build_request(prompt)?;
    let response = orchestrator.send(&payload).await?;
    interpret(&response)
}
