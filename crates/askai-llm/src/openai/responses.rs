use askai_context::is_reasoning_model;
use askai_types::{Message, ReasoningEffort};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::buffer_utils::SseLineParser;
use crate::error::ProviderError;

/// Build a streaming Responses API request body
///
/// System turns become `instructions`; every other turn goes to `input`.
pub fn build_responses_request(
    model: &str,
    instructions: Option<&str>,
    messages: &[Message],
    reasoning_effort: Option<ReasoningEffort>,
) -> Value {
    let input: Vec<Value> = messages
        .iter()
        .filter(|m| !m.is_system())
        .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
        .collect();

    let mut request = json!({
        "model": model,
        "input": input,
        "tools": [{ "type": "web_search_preview" }],
        "stream": true,
    });

    if let Some(obj) = request.as_object_mut() {
        if let Some(instructions) = instructions.filter(|s| !s.is_empty()) {
            obj.insert("instructions".to_string(), json!(instructions));
        }
        if let Some(effort) = reasoning_effort.filter(|_| is_reasoning_model(model)) {
            obj.insert("reasoning".to_string(), json!({ "effort": effort.as_str() }));
        }
    }

    request
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputItem {
    #[serde(rename = "type")]
    pub item_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletedResponse {
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// Server-sent events of the Responses API that matter here
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ResponseStreamEvent {
    #[serde(rename = "response.output_text.delta")]
    OutputTextDelta { delta: String },

    #[serde(rename = "response.output_item.added")]
    OutputItemAdded { item: OutputItem },

    #[serde(rename = "response.completed")]
    Completed { response: CompletedResponse },

    #[serde(rename = "response.failed")]
    Failed {
        #[serde(default)]
        response: Option<Value>,
    },

    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        error: Option<StreamErrorBody>,
    },

    #[serde(other)]
    Other,
}

impl ResponseStreamEvent {
    pub fn is_web_search(&self) -> bool {
        matches!(self, ResponseStreamEvent::OutputItemAdded { item } if item.item_type == "web_search_call")
    }
}

pub struct ResponsesSseParser;

impl SseLineParser for ResponsesSseParser {
    type Event = ResponseStreamEvent;

    fn parse_data_line(&self, data: &str) -> Result<Vec<Self::Event>, ProviderError> {
        serde_json::from_str::<ResponseStreamEvent>(data)
            .map(|event| vec![event])
            .map_err(|e| ProviderError::Stream(format!("Failed to parse response event: {}", e)))
    }
}
