//! Provider response normalization
//!
//! Maps OpenAI-compatible chat completions and Anthropic messages onto
//! [`NormalizedResponse`]. Only the fields needed for a trace are decoded;
//! anything else in the provider payload is ignored.

use serde::Deserialize;
use serde_json::Value;

use crate::types::{NormalizedResponse, Provider};

// ============================================================================
// OpenAI / OpenRouter wire shapes
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ChatCompletion {
    pub id: Option<String>,
    pub model: String,
    pub choices: Vec<ChatChoice>,
    pub usage: Option<CompletionUsage>,
    /// OpenRouter reports cost in dollars, top level or inside usage
    pub cost: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ChatChoice {
    pub message: Option<ChatMessage>,
    pub delta: Option<ChatMessage>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ChatMessage {
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct CompletionUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub cost: Option<f64>,
}

// ============================================================================
// Anthropic wire shapes
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct AnthropicMessage {
    pub id: Option<String>,
    pub model: String,
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<String>,
    pub usage: Option<AnthropicUsage>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ContentBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct AnthropicUsage {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub cache_creation_input_tokens: Option<u64>,
    pub cache_read_input_tokens: Option<u64>,
    pub server_tool_use: Option<Value>,
}

/// Map a provider stop reason onto the normalized vocabulary
///
/// Unknown values pass through unchanged.
pub fn map_stop_reason(reason: &str) -> String {
    match reason {
        "end_turn" | "stop_sequence" => "stop",
        "max_tokens" => "length",
        "tool_use" => "tool_calls",
        "pause_turn" => "pause",
        other => other,
    }
    .to_string()
}

fn dollars_to_cents(dollars: f64) -> f64 {
    dollars * 100.0
}

/// Normalize an OpenAI or OpenRouter chat completion
pub fn normalize_openai_response(response: &Value) -> NormalizedResponse {
    let completion = ChatCompletion::deserialize(response).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "Unrecognized chat completion shape");
        ChatCompletion::default()
    });

    let choice = completion.choices.first();
    let usage = completion.usage.as_ref();
    let cost = completion.cost.or_else(|| usage.and_then(|u| u.cost));

    NormalizedResponse {
        content: choice
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.clone()),
        input_tokens: usage.and_then(|u| u.prompt_tokens),
        output_tokens: usage.and_then(|u| u.completion_tokens),
        finish_reason: choice.and_then(|c| c.finish_reason.clone()),
        model: completion.model,
        cost_cents: cost.map(dollars_to_cents),
        response_id: completion.id,
    }
}

pub(crate) fn join_text(blocks: &[ContentBlock]) -> Option<String> {
    let mut text: Option<String> = None;
    for block in blocks {
        if let ContentBlock::Text { text: part } = block {
            text.get_or_insert_with(String::new).push_str(part);
        }
    }
    text
}

/// Normalize an Anthropic message
pub fn normalize_anthropic_response(response: &Value) -> NormalizedResponse {
    let message = AnthropicMessage::deserialize(response).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "Unrecognized Anthropic message shape");
        AnthropicMessage::default()
    });

    let usage = message.usage.as_ref();
    NormalizedResponse {
        content: join_text(&message.content),
        input_tokens: usage.and_then(|u| u.input_tokens),
        output_tokens: usage.and_then(|u| u.output_tokens),
        finish_reason: message.stop_reason.as_deref().map(map_stop_reason),
        model: message.model,
        cost_cents: None,
        response_id: message.id,
    }
}

/// Dispatch on provider wire format
pub fn normalize_response(provider: Provider, response: &Value) -> NormalizedResponse {
    match provider {
        Provider::Anthropic => normalize_anthropic_response(response),
        Provider::OpenAi | Provider::OpenRouter => normalize_openai_response(response),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_map_stop_reason() {
        assert_eq!(map_stop_reason("end_turn"), "stop");
        assert_eq!(map_stop_reason("stop_sequence"), "stop");
        assert_eq!(map_stop_reason("max_tokens"), "length");
        assert_eq!(map_stop_reason("tool_use"), "tool_calls");
        assert_eq!(map_stop_reason("refusal"), "refusal");
    }

    #[test]
    fn test_openai_response() {
        let response = json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "model": "gpt-4o-2024-08-06",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Hello there"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        });

        let normalized = normalize_openai_response(&response);
        assert_eq!(normalized.content.as_deref(), Some("Hello there"));
        assert_eq!(normalized.input_tokens, Some(12));
        assert_eq!(normalized.output_tokens, Some(3));
        assert_eq!(normalized.finish_reason.as_deref(), Some("stop"));
        assert_eq!(normalized.model, "gpt-4o-2024-08-06");
        assert_eq!(normalized.cost_cents, None);
        assert_eq!(normalized.response_id.as_deref(), Some("chatcmpl-123"));
    }

    #[test]
    fn test_openai_tool_call_has_null_content() {
        let response = json!({
            "model": "gpt-4o",
            "choices": [{
                "message": {"role": "assistant", "content": null, "tool_calls": []},
                "finish_reason": "tool_calls"
            }]
        });

        let normalized = normalize_openai_response(&response);
        assert_eq!(normalized.content, None);
        assert_eq!(normalized.input_tokens, None);
        assert_eq!(normalized.finish_reason.as_deref(), Some("tool_calls"));
    }

    #[test]
    fn test_openrouter_cost_converted_to_cents() {
        let response = json!({
            "model": "anthropic/claude-3.5-sonnet",
            "choices": [{"message": {"content": "ok"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 2},
            "cost": 0.0015
        });
        let normalized = normalize_openai_response(&response);
        let cost = normalized.cost_cents.unwrap();
        assert!((cost - 0.15).abs() < 1e-12);

        let nested = json!({
            "model": "m",
            "choices": [],
            "usage": {"prompt_tokens": 1, "completion_tokens": 1, "cost": 0.01}
        });
        let cost = normalize_openai_response(&nested).cost_cents.unwrap();
        assert!((cost - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_choices() {
        let normalized = normalize_openai_response(&json!({"model": "gpt-4o", "choices": []}));
        assert_eq!(normalized.content, None);
        assert_eq!(normalized.finish_reason, None);
    }

    #[test]
    fn test_anthropic_response_joins_text_blocks() {
        let response = json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "model": "claude-3-5-sonnet-20241022",
            "content": [
                {"type": "text", "text": "Hello, "},
                {"type": "tool_use", "id": "toolu_1", "name": "lookup", "input": {}},
                {"type": "text", "text": "world"}
            ],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 20, "output_tokens": 5}
        });

        let normalized = normalize_anthropic_response(&response);
        assert_eq!(normalized.content.as_deref(), Some("Hello, world"));
        assert_eq!(normalized.input_tokens, Some(20));
        assert_eq!(normalized.output_tokens, Some(5));
        assert_eq!(normalized.finish_reason.as_deref(), Some("stop"));
        assert_eq!(normalized.response_id.as_deref(), Some("msg_01"));
    }

    #[test]
    fn test_anthropic_without_text_blocks() {
        let response = json!({
            "model": "claude-3-5-haiku-latest",
            "content": [{"type": "tool_use", "id": "toolu_1", "name": "f", "input": {}}],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 1, "output_tokens": 1}
        });
        let normalized = normalize_anthropic_response(&response);
        assert_eq!(normalized.content, None);
        assert_eq!(normalized.finish_reason.as_deref(), Some("tool_calls"));
    }

    #[test]
    fn test_garbage_response_normalizes_to_empty() {
        let normalized = normalize_response(Provider::Anthropic, &json!("not an object"));
        assert_eq!(normalized, NormalizedResponse::default());
    }
}
