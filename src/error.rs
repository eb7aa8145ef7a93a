use thiserror::Error;

/// Errors produced by the conversation core and its collaborators.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("request to chat API failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("chat API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("a turn is already in flight")]
    TurnInFlight,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("voice input failed: {0}")]
    Voice(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ChatError {
    /// Whether the error came from talking to the remote API, as opposed to
    /// local misuse of the controller.
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, ChatError::Transport(_) | ChatError::Status { .. })
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
