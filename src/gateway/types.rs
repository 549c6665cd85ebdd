//! OpenAI-compatible request and response types.

use serde::{Deserialize, Serialize};

/// Chat completion request (OpenAI-compatible).
///
/// Fields the gateway does not inspect are carried in `extra` and forwarded
/// upstream untouched.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A chat message.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    pub role: String,
    pub content: MessageContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Message content: either a plain string or an array of content parts,
/// as some OpenAI clients send structured content.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// One element of an array-form message content.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ContentPart {
    Text(String),
    Fragment {
        #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
        kind: Option<String>,
        text: String,
    },
    Other(serde_json::Value),
}

impl ContentPart {
    /// Text carried by this part, if it is a text part.
    fn text(&self) -> Option<&str> {
        match self {
            ContentPart::Text(s) => Some(s),
            ContentPart::Fragment { kind, text } => match kind.as_deref() {
                None | Some("text") => Some(text),
                _ => None,
            },
            ContentPart::Other(_) => None,
        }
    }
}

impl MessageContent {
    /// Collapse array-form content into a single string: text parts are
    /// space-joined, non-text parts are dropped.
    pub fn normalize(&self) -> String {
        match self {
            MessageContent::Text(s) => s.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(ContentPart::text)
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

impl ChatCompletionRequest {
    /// Build the body forwarded upstream: the provider prefix is stripped
    /// from `model` and message content is normalized to plain strings.
    pub fn for_upstream(&self, upstream_model: &str) -> ChatCompletionRequest {
        let mut upstream = self.clone();
        upstream.model = upstream_model.to_string();
        for message in &mut upstream.messages {
            message.content = MessageContent::Text(message.content.normalize());
        }
        upstream
    }
}

/// One entry in the aggregated `/v1/models` listing.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelEntry {
    /// Prefixed id, `provider/model`
    pub id: String,
    pub object: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
    pub owned_by: String,
}

/// `/v1/models` response envelope (OpenAI-compatible).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelsResponse {
    pub object: String,
    pub data: Vec<ModelEntry>,
}

impl ModelsResponse {
    pub fn new(data: Vec<ModelEntry>) -> Self {
        Self {
            object: "list".to_string(),
            data,
        }
    }
}
