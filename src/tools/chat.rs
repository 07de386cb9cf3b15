use serde_json::Value;

use super::{Tool, ToolError, reply_text, require_non_empty};
use crate::orchestrator::Orchestrator;
use crate::payload::{Content, RequestPayload, Role};

pub const GREETING: &str =
    "Hi! I'm GBit-Gemini-AI. Ask me anything, or ask me to write some content or code!";
pub const NO_REPLY: &str = "Sorry, I couldn't generate a reply.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

/// Ordered chat history. Messages can only be appended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, role: Role, text: impl Into<String>) {
        self.messages.push(Message {
            role,
            text: text.into(),
        });
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    fn to_contents(&self) -> Vec<Content> {
        self.messages
            .iter()
            .map(|message| Content::with_role(message.role, message.text.clone()))
            .collect()
    }
}

/// Result of one chat exchange. The conversation is handed back in both the
/// success and the failure case; on failure it still holds the user message.
#[derive(Debug)]
pub struct ChatTurn {
    pub conversation: Conversation,
    pub reply: Result<String, ToolError>,
}

pub fn build_request(conversation: &Conversation) -> RequestPayload {
    RequestPayload {
        contents: conversation.to_contents(),
        system_instruction: Tool::Chat.system_instruction().to_string(),
    }
}

pub fn interpret(response: &Value) -> Result<String, ToolError> {
    Ok(reply_text(response)?.unwrap_or_else(|| NO_REPLY.to_string()))
}

pub async fn send_message(
    orchestrator: &Orchestrator,
    mut conversation: Conversation,
    message: &str,
) -> ChatTurn {
    if let Err(err) = require_non_empty(message, "a message") {
        return ChatTurn {
            conversation,
            reply: Err(err),
        };
    }

    conversation.push(Role::User, message.trim());
    let payload = build_request(&conversation);

    let reply = match orchestrator.send(&payload).await {
        Ok(response) => interpret(&response),
        Err(err) => Err(err.into()),
    };
    if let Ok(text) = &reply {
        conversation.push(Role::Model, text.clone());
    }

    ChatTurn {
        conversation,
        reply,
    }
}

#[cfg(test)]
mod tests {
    use super::{Conversation, NO_REPLY, build_request, interpret, send_message};
    use crate::orchestrator::fast_orchestrator;
    use crate::payload::Role;
    use crate::tools::ToolError;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn request_keeps_turn_order_and_roles() {
        let mut conversation = Conversation::new();
        conversation.push(Role::User, "hi");
        conversation.push(Role::Model, "hello!");
        conversation.push(Role::User, "write a haiku");

        let value = serde_json::to_value(build_request(&conversation)).expect("serialize");
        assert_eq!(
            value["contents"],
            json!([
                {"role": "user", "parts": [{"text": "hi"}]},
                {"role": "model", "parts": [{"text": "hello!"}]},
                {"role": "user", "parts": [{"text": "write a haiku"}]}
            ])
        );
    }

    #[test]
    fn interpret_uses_apology_when_text_missing() {
        assert_eq!(interpret(&json!({"success": true})).expect("reply"), NO_REPLY);
    }

    #[tokio::test]
    async fn blank_message_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let turn = send_message(
            &fast_orchestrator(format!("{}/api", server.uri()), 1),
            Conversation::new(),
            "   ",
        )
        .await;

        assert!(turn.conversation.is_empty());
        assert_eq!(turn.reply, Err(ToolError::EmptyInput("a message")));
    }

    #[tokio::test]
    async fn successful_turn_appends_user_and_model_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "first"}]},
                    {"role": "model", "parts": [{"text": "reply one"}]},
                    {"role": "user", "parts": [{"text": "second"}]}
                ]
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"success": true, "text": "reply two"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut conversation = Conversation::new();
        conversation.push(Role::User, "first");
        conversation.push(Role::Model, "reply one");

        let turn = send_message(
            &fast_orchestrator(format!("{}/api", server.uri()), 1),
            conversation,
            "  second  ",
        )
        .await;

        assert_eq!(turn.reply.as_deref(), Ok("reply two"));
        assert_eq!(turn.conversation.len(), 4);
        let last = turn.conversation.last().expect("last message");
        assert_eq!(last.role, Role::Model);
        assert_eq!(last.text, "reply two");
    }

    #[tokio::test]
    async fn failed_turn_keeps_user_message_in_history() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("down"))
            .expect(2)
            .mount(&server)
            .await;

        let turn = send_message(
            &fast_orchestrator(format!("{}/api", server.uri()), 2),
            Conversation::new(),
            "are you there?",
        )
        .await;

        assert!(matches!(turn.reply, Err(ToolError::Request(_))));
        assert_eq!(turn.conversation.len(), 1);
        assert_eq!(turn.conversation.messages()[0].text, "are you there?");
        assert_eq!(turn.conversation.messages()[0].role, Role::User);
    }
}
