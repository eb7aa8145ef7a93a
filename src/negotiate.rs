use serde_json::Value;
use tracing::{debug, warn};

/// Reply used when a success response matches none of the known shapes.
pub const UNRECOGNIZED_REPLY: &str = "Sorry, I didn't understand your question.";

/// Response body layouts the negotiator understands, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyShape {
    /// `{ "choices": [ { "message": { "content": "..." } } ] }`
    Choices,
    /// `{ "response": "..." }`
    Response,
    /// `{ "data": { "reply": "..." } }`
    DataReply,
    /// `{ "code": 0, "data": { "output": "..." } }`
    CodeOutput,
    /// `"..."`
    BareString,
}

/// Try each known shape in turn; the first one whose fields are present wins.
pub fn negotiate_reply(body: &Value) -> Option<(ReplyShape, String)> {
    if let Some(content) = body
        .get("choices")
        .and_then(|choices| choices.as_array())
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(non_empty_str)
    {
        return Some((ReplyShape::Choices, content.to_string()));
    }

    if let Some(response) = body.get("response").and_then(non_empty_str) {
        return Some((ReplyShape::Response, response.to_string()));
    }

    let data = body.get("data");

    if let Some(reply) = data.and_then(|d| d.get("reply")).and_then(non_empty_str) {
        return Some((ReplyShape::DataReply, reply.to_string()));
    }

    if body.get("code").and_then(|c| c.as_i64()) == Some(0) {
        if let Some(output) = data.and_then(|d| d.get("output")).and_then(|o| o.as_str()) {
            return Some((ReplyShape::CodeOutput, output.to_string()));
        }
    }

    if let Some(text) = non_empty_str(body) {
        return Some((ReplyShape::BareString, text.to_string()));
    }

    None
}

/// Negotiate a reply, falling back to [`UNRECOGNIZED_REPLY`].
pub fn reply_or_fallback(body: &Value) -> String {
    match negotiate_reply(body) {
        Some((shape, reply)) => {
            debug!("Negotiated reply using {:?} shape", shape);
            reply
        }
        None => {
            warn!("Unrecognized chat API response shape: {}", body);
            UNRECOGNIZED_REPLY.to_string()
        }
    }
}

/// Parse a raw response body. Text that is not JSON is kept as a bare string.
pub fn parse_body(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.is_empty())
}
