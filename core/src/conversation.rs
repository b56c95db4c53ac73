//! Append-only conversation state for one orchestration run

use serde::Serialize;

use crate::llm::{ChatMessage, Role};
use crate::{AnalystError, Result};

/// Ordered message sequence owned by a single in-flight request.
///
/// Messages are only ever appended; the leading system instruction is fixed
/// when the conversation is created.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    /// Start a conversation from caller-supplied messages, injecting
    /// `system_prompt` unless the caller already opened with a system turn.
    ///
    /// Only the first message is inspected. System turns later in the
    /// sequence stay where the caller put them, after the injected prompt.
    pub fn with_system_prompt(system_prompt: &str, messages: Vec<ChatMessage>) -> Result<Self> {
        validate(&messages)?;

        let starts_with_system = messages
            .first()
            .map(|m| m.role == Role::System)
            .unwrap_or(false);

        let mut all = Vec::with_capacity(messages.len() + 1);
        if !starts_with_system {
            all.push(ChatMessage::system(system_prompt));
        }
        all.extend(messages);
        Ok(Self { messages: all })
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn into_messages(self) -> Vec<ChatMessage> {
        self.messages
    }
}

/// Check caller-supplied messages before they reach the model.
///
/// Every tool message must answer an invocation of the assistant message that
/// opens its run of tool messages.
pub fn validate(messages: &[ChatMessage]) -> Result<()> {
    if messages.is_empty() {
        return Err(AnalystError::InvalidConversation(
            "messages must not be empty".into(),
        ));
    }

    for (idx, msg) in messages.iter().enumerate() {
        if msg.role != Role::Tool {
            continue;
        }
        let call_id = msg.tool_call_id.as_deref().ok_or_else(|| {
            AnalystError::InvalidConversation(format!("messages[{idx}]: tool message without tool_call_id"))
        })?;

        let opener = messages[..idx].iter().rev().find(|m| m.role != Role::Tool);
        let answered = match opener {
            Some(prev) if prev.role == Role::Assistant => {
                prev.tool_calls().iter().any(|c| c.id == call_id)
            }
            _ => false,
        };
        if !answered {
            return Err(AnalystError::InvalidConversation(format!(
                "messages[{idx}]: tool_call_id '{call_id}' does not match the preceding assistant tool calls"
            )));
        }
    }
    Ok(())
}
