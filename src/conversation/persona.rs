//! Demo personas and their offline canned replies.

use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::PayloadShape;
use crate::error::ChatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Assistant,
    Sales,
}

struct Persona {
    id: &'static str,
    name: &'static str,
    welcome: &'static str,
    payload: PayloadShape,
    keywords: &'static [(&'static [&'static str], &'static str)],
    pool: &'static [&'static str],
}

const ASSISTANT: Persona = Persona {
    id: "assistant",
    name: "Lingxi Assistant",
    welcome: "Hi! I'm Lingxi, your AI assistant. What can I help you with?",
    payload: PayloadShape::History,
    keywords: &[(
        &["hello", "你好", "您好"],
        "Hello! Glad to help. What can I do for you?",
    )],
    pool: &[
        "This is a simulated AI reply. Configure a real API endpoint to get live answers.",
        "I understand your question. Here is an example answer.",
        "Thanks for asking! Once deployed, I will be connected to a real AI service.",
        "This is a demo reply. Set LINGXI_API_URL to point at your chat endpoint.",
    ],
};

const SALES: Persona = Persona {
    id: "sales",
    name: "Sales Coach",
    welcome: "Hi! I'm your sales coach. Tell me about a customer or a deal and we'll work through it.",
    payload: PayloadShape::SingleTurn,
    keywords: &[
        (
            &["hello", "你好", "您好"],
            "Hello! Which customer conversation shall we prepare today?",
        ),
        (
            &["price", "pricing", "discount", "expensive", "价格"],
            "When price comes up, restate the value first: anchor on the outcome the customer cares about before discussing numbers.",
        ),
        (
            &["objection", "hesitant", "not interested", "异议"],
            "Treat the objection as a question. Ask what is behind it, then answer that concern specifically.",
        ),
        (
            &["close the deal", "closing", "contract", "成交"],
            "Summarize the agreed benefits, confirm there are no open concerns, then propose a concrete next step with a date.",
        ),
    ],
    pool: &[
        "This is a simulated coaching reply. Configure a real API endpoint for live coaching.",
        "Good question. Start by clarifying the customer's goal and timeline.",
        "Try framing your next message around the customer's biggest pain point.",
    ],
};

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Assistant, Mode::Sales];

    fn persona(self) -> &'static Persona {
        match self {
            Mode::Assistant => &ASSISTANT,
            Mode::Sales => &SALES,
        }
    }

    pub fn id(self) -> &'static str {
        self.persona().id
    }

    pub fn display_name(self) -> &'static str {
        self.persona().name
    }

    /// Greeting shown when the mode becomes active. Never part of the history.
    pub fn welcome(self) -> &'static str {
        self.persona().welcome
    }

    /// Request body layout this mode sends unless overridden by configuration.
    pub fn payload_shape(self) -> PayloadShape {
        self.persona().payload
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for Mode {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|mode| mode.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                ChatError::Config(format!(
                    "unknown mode '{}', expected one of: {}",
                    s,
                    Mode::ALL.map(Mode::id).join(", ")
                ))
            })
    }
}

/// Canned replies used when a loopback endpoint is unreachable.
pub struct CannedReplies;

impl CannedReplies {
    /// First keyword entry (in table order) whose keyword appears in `message`.
    pub fn keyword_reply(mode: Mode, message: &str) -> Option<&'static str> {
        let lowered = message.to_lowercase();
        mode.persona()
            .keywords
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| lowered.contains(*k)))
            .map(|(_, reply)| *reply)
    }

    pub fn pick<R: Rng + ?Sized>(mode: Mode, message: &str, rng: &mut R) -> &'static str {
        if let Some(reply) = Self::keyword_reply(mode, message) {
            return reply;
        }
        let pool = mode.persona().pool;
        pool.choose(rng).copied().unwrap_or_default()
    }

    pub fn pool(mode: Mode) -> &'static [&'static str] {
        mode.persona().pool
    }
}
