//! Request builders and reply interpreters for the four studio tools.
//!
//! Controllers hold no state between calls. The chat history is a
//! [`chat::Conversation`] value owned by the caller.

pub mod chat;
pub mod explain;
mod extract;
pub mod generate;
mod prompts;
pub mod refactor;

pub use extract::extract_code_block;

use serde::Deserialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::orchestrator::OrchestratorError;
use crate::payload::{BackendResponse, Content, RequestPayload};

/// Placeholder used by the code tools when the backend sent no text.
pub const NO_CODE_REPLY: &str = "Error generating response.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Explain,
    Refactor,
    Generate,
    Chat,
}

impl Tool {
    pub const ALL: [Tool; 4] = [Tool::Explain, Tool::Refactor, Tool::Generate, Tool::Chat];

    pub fn name(self) -> &'static str {
        match self {
            Self::Explain => "explain",
            Self::Refactor => "refactor",
            Self::Generate => "generate",
            Self::Chat => "chat",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Explain => "Code Explainer",
            Self::Refactor => "Code Refactor",
            Self::Generate => "Script Generator",
            Self::Chat => "Universal Chatbot",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Explain => "Explains any piece of code in detail.",
            Self::Refactor => "Converts or refactors code following a strict instruction.",
            Self::Generate => "Generates complete, working scripts.",
            Self::Chat => "Helps with general questions, ideas and creative content.",
        }
    }

    pub fn system_instruction(self) -> &'static str {
        match self {
            Self::Explain => prompts::EXPLAINER,
            Self::Refactor => prompts::REFACTOR,
            Self::Generate => prompts::GENERATOR,
            Self::Chat => prompts::CHATBOT,
        }
    }

    fn single_turn(self, text: impl Into<String>) -> RequestPayload {
        RequestPayload {
            contents: vec![Content::text(text)],
            system_instruction: self.system_instruction().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    EmptyInput(&'static str),
    Request(OrchestratorError),
    Backend {
        error: String,
        detail: Option<String>,
    },
    UnexpectedResponse(String),
}

impl Display for ToolError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyInput(what) => write!(f, "please provide {what}"),
            Self::Request(err) => write!(f, "request failed: {err}"),
            Self::Backend {
                error,
                detail: Some(detail),
            } => write!(f, "{error}: {detail}"),
            Self::Backend { error, detail: None } => write!(f, "{error}"),
            Self::UnexpectedResponse(msg) => {
                write!(f, "backend reply has an unexpected shape: {msg}")
            }
        }
    }
}

impl Error for ToolError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Request(err) => Some(err),
            _ => None,
        }
    }
}

impl From<OrchestratorError> for ToolError {
    fn from(err: OrchestratorError) -> Self {
        Self::Request(err)
    }
}

/// Reads the canonical `{success, text}` reply. `Ok(None)` means the backend
/// succeeded but produced no usable text.
fn reply_text(response: &Value) -> Result<Option<String>, ToolError> {
    let reply = BackendResponse::deserialize(response)
        .map_err(|err| ToolError::UnexpectedResponse(err.to_string()))?;

    if !reply.success {
        return Err(ToolError::Backend {
            error: reply
                .error
                .unwrap_or_else(|| "backend reported a failure".to_string()),
            detail: reply.detail,
        });
    }

    Ok(reply.text.filter(|text| !text.trim().is_empty()))
}

fn require_non_empty(value: &str, what: &'static str) -> Result<(), ToolError> {
    if value.trim().is_empty() {
        Err(ToolError::EmptyInput(what))
    } else {
        Ok(())
    }
}
