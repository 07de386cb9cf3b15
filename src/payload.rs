//! JSON shapes exchanged between tool controllers and the backend proxy.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub parts: Vec<Part>,
}

impl Content {
    /// Role-less single-part content, as sent by the one-shot tools.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            role: None,
            parts: vec![Part { text: text.into() }],
        }
    }

    pub fn with_role(role: Role, text: impl Into<String>) -> Self {
        Self {
            role: Some(role),
            parts: vec![Part { text: text.into() }],
        }
    }
}

/// Body of `POST /api`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPayload {
    pub contents: Vec<Content>,
    #[serde(default)]
    pub system_instruction: String,
}

/// Reply of `POST /api`: `{success: true, text}` or
/// `{success: false, error, detail}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl BackendResponse {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            success: true,
            text: Some(text.into()),
            error: None,
            detail: None,
        }
    }

    pub fn failure(error: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            success: false,
            text: None,
            error: Some(error.into()),
            detail: Some(detail.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BackendResponse, Content, RequestPayload, Role};
    use serde_json::json;

    #[test]
    fn one_shot_payload_omits_role() {
        let payload = RequestPayload {
            contents: vec![Content::text("fn main() {}")],
            system_instruction: "explain".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&payload).expect("serialize"),
            json!({
                "contents": [{"parts": [{"text": "fn main() {}"}]}],
                "systemInstruction": "explain"
            })
        );
    }

    #[test]
    fn chat_payload_carries_lowercase_roles() {
        let payload = RequestPayload {
            contents: vec![
                Content::with_role(Role::User, "hi"),
                Content::with_role(Role::Model, "hello"),
            ],
            system_instruction: String::new(),
        };
        let value = serde_json::to_value(&payload).expect("serialize");
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][1]["role"], "model");
    }

    #[test]
    fn request_payload_tolerates_missing_system_instruction() {
        let payload: RequestPayload =
            serde_json::from_value(json!({"contents": [{"parts": [{"text": "x"}]}]}))
                .expect("deserialize");
        assert!(payload.system_instruction.is_empty());
        assert_eq!(payload.contents[0].role, None);
    }

    #[test]
    fn failure_response_serializes_without_text() {
        let value = serde_json::to_value(BackendResponse::failure("boom", "detail"))
            .expect("serialize");
        assert_eq!(
            value,
            json!({"success": false, "error": "boom", "detail": "detail"})
        );
    }
}
