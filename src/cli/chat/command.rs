/// One line of user input, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    Clear,
    /// `/mode` alone lists the modes; `/mode <id>` switches.
    Mode(Option<String>),
    Voice,
    Message(String),
}

impl Command {
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        let mut words = trimmed.splitn(2, char::is_whitespace);
        match words.next().unwrap_or_default() {
            "/help" => Command::Help,
            "/quit" | "/exit" => Command::Quit,
            "/clear" => Command::Clear,
            "/voice" => Command::Voice,
            "/mode" => Command::Mode(
                words
                    .next()
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(str::to_string),
            ),
            _ => Command::Message(input.to_string()),
        }
    }
}
