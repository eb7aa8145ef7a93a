use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{ChatError, Result};

/// Optional speech-to-text capability, chosen once at startup.
#[async_trait]
pub trait VoiceInput: Send + Sync {
    fn is_available(&self) -> bool;

    /// Record one utterance. `Ok(None)` means nothing was recognized.
    async fn listen(&self) -> Result<Option<String>>;
}

/// Selected when no transcriber is configured.
pub struct Unsupported;

#[async_trait]
impl VoiceInput for Unsupported {
    fn is_available(&self) -> bool {
        false
    }

    async fn listen(&self) -> Result<Option<String>> {
        Err(ChatError::Voice("voice input is not supported here".to_string()))
    }
}

/// Runs an external command that records speech and prints the transcript on
/// stdout.
pub struct CommandTranscriber {
    command: String,
}

impl CommandTranscriber {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl VoiceInput for CommandTranscriber {
    fn is_available(&self) -> bool {
        true
    }

    async fn listen(&self) -> Result<Option<String>> {
        tracing::debug!("Running voice command: {}", self.command);

        let output = Command::new("bash")
            .arg("-c")
            .arg(&self.command)
            .output()
            .await
            .map_err(|e| ChatError::Voice(format!("failed to run voice command: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ChatError::Voice(format!(
                "voice command exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let transcript = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(Some(transcript).filter(|t| !t.is_empty()))
    }
}

pub fn select(command: Option<&str>) -> Box<dyn VoiceInput> {
    match command {
        Some(command) => Box::new(CommandTranscriber::new(command)),
        None => {
            tracing::debug!("No voice command configured, voice input is disabled");
            Box::new(Unsupported)
        }
    }
}
