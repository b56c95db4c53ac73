//! OpenAI Chat Completions wire types
//!
//! These types are shared by the inbound HTTP surface and the outbound LLM
//! client, so they accept the loose shapes real clients send (content parts,
//! object-valued tool arguments) and serialize back to the canonical shape.

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Author of a conversation turn
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "developer")]
    System,
    User,
    Assistant,
    Tool,
}

/// One conversation turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default, deserialize_with = "deserialize_content")]
    pub content: Option<String>,
    /// Invocations requested by the model (assistant messages only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Invocation answered by this message (tool messages only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Provider-specific fields (`refusal`, `annotations`, `reasoning`, ...)
    #[serde(flatten, default)]
    pub extra: Map<String, Value>,
}

impl ChatMessage {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
            name: None,
            extra: Map::new(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Assistant turn that requests tool invocations and carries no text
    pub fn assistant_tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: None,
            tool_calls: Some(calls),
            tool_call_id: None,
            name: None,
            extra: Map::new(),
        }
    }

    /// Tool turn answering the invocation `call_id`
    pub fn tool(
        call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(call_id.into()),
            name: Some(name.into()),
            extra: Map::new(),
        }
    }

    /// Requested invocations, empty when there are none
    pub fn tool_calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or_default()
    }

    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }

    /// Copy limited to the request fields; response-only fields are rejected upstream
    pub fn to_request_form(&self) -> Self {
        Self {
            extra: Map::new(),
            ..self.clone()
        }
    }
}

/// One model-issued tool invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionCall,
}

impl ToolCall {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: function_kind(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionCall {
    pub name: String,
    /// Raw JSON text as produced by the model
    #[serde(default, deserialize_with = "deserialize_arguments")]
    pub arguments: String,
}

/// Function descriptor presented to the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn function(name: String, description: String, parameters: Value) -> Self {
        Self {
            kind: function_kind(),
            function: FunctionDefinition {
                name,
                description,
                parameters,
            },
        }
    }
}

/// How the model should use tools
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    /// Let the model decide whether to call a tool
    #[default]
    Auto,
    /// Require the model to call a tool at least once
    Required,
    /// Do not let the model call tools
    None,
}

/// Outbound Chat Completions request body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Chat Completions response; unknown fields are kept so the object can be
/// handed back to the caller as received
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletion {
    #[serde(default)]
    pub id: String,
    #[serde(default = "completion_object")]
    pub object: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub model: String,
    pub choices: Vec<Choice>,
    /// `usage`, `system_fingerprint` and anything else, as received
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: ChatMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatCompletion {
    /// Single-choice completion, mostly useful for fakes and tests
    pub fn from_message(id: impl Into<String>, model: impl Into<String>, message: ChatMessage) -> Self {
        let finish_reason = if message.tool_calls().is_empty() {
            "stop"
        } else {
            "tool_calls"
        };
        Self {
            id: id.into(),
            object: completion_object(),
            created: 0,
            model: model.into(),
            choices: vec![Choice {
                index: 0,
                message,
                finish_reason: Some(finish_reason.to_string()),
                extra: Map::new(),
            }],
            extra: Map::new(),
        }
    }

    pub fn first_message(&self) -> Option<&ChatMessage> {
        self.choices.first().map(|c| &c.message)
    }
}

fn function_kind() -> String {
    "function".to_string()
}

fn completion_object() -> String {
    "chat.completion".to_string()
}

// Accepts a string, null, or an array of content parts; text parts are joined.
fn deserialize_content<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Array(parts)) => {
            let text: Vec<&str> = parts
                .iter()
                .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                .collect();
            Ok(Some(text.join("\n")))
        }
        Some(other) => Err(de::Error::custom(format!(
            "unsupported message content: {other}"
        ))),
    }
}

// Some backends (Ollama) send arguments as a JSON object instead of a string.
fn deserialize_arguments<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s),
        Some(other) => Ok(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn content_parts_are_flattened_to_text() {
        let msg: ChatMessage = serde_json::from_value(json!({
            "role": "user",
            "content": [
                {"type": "text", "text": "Compare"},
                {"type": "image_url", "image_url": {"url": "http://x"}},
                {"type": "text", "text": "RTX 4090"}
            ]
        }))
        .unwrap();
        assert_eq!(msg.content.as_deref(), Some("Compare\nRTX 4090"));
    }

    #[test]
    fn developer_role_is_read_as_system() {
        let msg: ChatMessage =
            serde_json::from_value(json!({"role": "developer", "content": "be terse"})).unwrap();
        assert_eq!(msg.role, Role::System);
    }

    #[test]
    fn object_arguments_are_kept_as_json_text() {
        let call: ToolCall = serde_json::from_value(json!({
            "id": "call_1",
            "function": {"name": "check_market_prices", "arguments": {"model_keyword": "4090"}}
        }))
        .unwrap();
        assert_eq!(call.kind, "function");
        let args: Value = serde_json::from_str(&call.function.arguments).unwrap();
        assert_eq!(args["model_keyword"], "4090");
    }

    #[test]
    fn tool_message_serializes_call_reference() {
        let msg = ChatMessage::tool("call_9", "get_gpu_technical_specs", "[]");
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["role"], "tool");
        assert_eq!(v["tool_call_id"], "call_9");
        assert_eq!(v["name"], "get_gpu_technical_specs");
        assert!(v.get("tool_calls").is_none());
    }

    #[test]
    fn request_without_tools_omits_tool_fields() {
        let req = ChatRequest {
            model: "gpt-4o".into(),
            messages: vec![ChatMessage::user("hi")],
            tools: None,
            tool_choice: None,
            temperature: None,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert!(v.get("tools").is_none());
        assert!(v.get("tool_choice").is_none());
        assert!(v.get("temperature").is_none());
    }

    #[test]
    fn completion_keeps_unknown_fields() {
        let raw = json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "gpt-4o",
            "system_fingerprint": "fp_abc",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "hello"},
                "finish_reason": "stop",
                "logprobs": null
            }]
        });
        let completion: ChatCompletion = serde_json::from_value(raw).unwrap();
        assert_eq!(completion.first_message().unwrap().text(), "hello");

        let back = serde_json::to_value(&completion).unwrap();
        assert_eq!(back["system_fingerprint"], "fp_abc");
        assert!(back["choices"][0].get("logprobs").is_some());
    }

    #[test]
    fn completion_round_trips_message_and_usage_fields() {
        let raw = json!({
            "id": "chatcmpl-2",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "llama3.1",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "hi",
                    "refusal": null,
                    "annotations": [],
                    "reasoning": "user greeted me"
                },
                "finish_reason": "stop"
            }],
            "usage": null
        });
        let completion: ChatCompletion = serde_json::from_value(raw.clone()).unwrap();
        let message = completion.first_message().unwrap();
        assert_eq!(message.extra["reasoning"], "user greeted me");

        assert_eq!(serde_json::to_value(&completion).unwrap(), raw);
    }

    #[test]
    fn request_form_drops_response_only_fields() {
        let msg: ChatMessage = serde_json::from_value(json!({
            "role": "assistant",
            "content": null,
            "annotations": [],
            "tool_calls": [{"id": "c1", "type": "function",
                            "function": {"name": "check_market_prices", "arguments": "{}"}}]
        }))
        .unwrap();
        let v = serde_json::to_value(msg.to_request_form()).unwrap();
        assert!(v.get("annotations").is_none());
        assert_eq!(v["tool_calls"][0]["id"], "c1");
    }

    #[test]
    fn built_messages_carry_no_extra_fields() {
        let v = serde_json::to_value(ChatMessage::user("hi")).unwrap();
        assert_eq!(v, json!({"role": "user", "content": "hi"}));
    }
}
