use rustyline::{Config, Editor, Result};

use crate::conversation::Mode;

pub fn generate_prompt(mode: Mode) -> String {
    format!("[{}] > ", mode.id())
}

pub fn rl() -> Result<Editor<()>> {
    let config = Config::builder()
        .history_ignore_space(true)
        .completion_type(rustyline::CompletionType::List)
        .build();
    Editor::with_config(config)
}

/// Interpret a yes/no answer; anything but an explicit yes is a no.
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
