pub mod command;
pub mod prompt;
pub mod session_store;
pub mod voice;

use std::io::Write;
use std::process::ExitCode;

use command::Command;
use crossterm::cursor::MoveToColumn;
use crossterm::style::Stylize;
use crossterm::terminal::{Clear, ClearType};
use eyre::Result;
use prompt::{generate_prompt, is_yes};
use rustyline::error::ReadlineError;
use rustyline::Editor;
use session_store::SessionStore;
use tracing::{debug, info};
use voice::VoiceInput;

use crate::api_client::{ApiClient, ChatTransport};
use crate::config::ChatConfig;
use crate::conversation::{Conversation, Mode, ReplySource, TurnOutcome, APOLOGY_TEXT};
use crate::render::{render_content_with, ImagePolicy};

const HELP_TEXT: &str = "
/clear        Clear the conversation history
/mode [id]    List personas, or switch to one (clears the conversation)
/help         Show this help dialogue
/quit         Quit the application
";

const VOICE_HELP: &str = "/voice        Dictate a message with the configured voice command\n";

pub struct ChatContext<T: ChatTransport = ApiClient> {
    output: Box<dyn Write>,
    input: Option<String>,
    interactive: bool,
    accept_all: bool,
    conversation: Conversation<T>,
    voice: Box<dyn VoiceInput>,
    session_store: SessionStore,
    image_policy: ImagePolicy,
    html: bool,
    editor: Option<Editor<()>>,
    /// Transcript for the next prompt, pre-filled for editing.
    dictated: Option<String>,
    transcript_lines: u64,
}

impl ChatContext<ApiClient> {
    pub fn new(
        output: Box<dyn Write>,
        config: &ChatConfig,
        input: Option<String>,
        interactive: bool,
        accept_all: bool,
    ) -> Result<Self> {
        let client = ApiClient::new(config)?;
        Ok(Self::with_transport(output, client, config, input, interactive, accept_all))
    }
}

impl<T: ChatTransport> ChatContext<T> {
    pub fn with_transport(
        output: Box<dyn Write>,
        transport: T,
        config: &ChatConfig,
        input: Option<String>,
        interactive: bool,
        accept_all: bool,
    ) -> Self {
        Self {
            output,
            input,
            interactive,
            accept_all,
            conversation: Conversation::new(transport, config.mode),
            voice: voice::select(config.voice_command.as_deref()),
            session_store: SessionStore::new(),
            image_policy: config.image_policy,
            html: config.html,
            editor: None,
            dictated: None,
            transcript_lines: 0,
        }
    }

    pub fn with_session_store(mut self, store: SessionStore) -> Self {
        self.session_store = store;
        self
    }

    pub async fn run(&mut self) -> Result<ExitCode> {
        if let Some(offset) = self.session_store.take_scroll_offset() {
            debug!("Previous session ended at transcript line {}", offset);
        }

        if self.interactive {
            self.print_welcome()?;
        }

        // Handle non-interactive mode (single query)
        if let Some(input) = self.input.take() {
            self.handle_input(&input).await?;
            return Ok(ExitCode::SUCCESS);
        }

        if self.interactive {
            self.run_interactive().await?;
        }

        self.session_store.save_scroll_offset(self.transcript_lines)?;

        Ok(ExitCode::SUCCESS)
    }

    fn print_welcome(&mut self) -> Result<()> {
        let mode = self.conversation.mode();
        writeln!(self.output, "\n{}\n", mode.display_name().bold())?;
        self.print_assistant(mode.welcome())?;
        writeln!(self.output, "\nType /help for commands.\n")?;
        Ok(())
    }

    async fn run_interactive(&mut self) -> Result<()> {
        self.editor = Some(prompt::rl()?);

        loop {
            let prompt_text = generate_prompt(self.conversation.mode());
            let initial = self.dictated.take();
            let Some(rl) = self.editor.as_mut() else {
                break;
            };

            let readline = match &initial {
                Some(text) => rl.readline_with_initial(&prompt_text, (text.as_str(), "")),
                None => rl.readline(&prompt_text),
            };

            match readline {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }

                    rl.add_history_entry(line.as_str());

                    match self.handle_input(&line).await {
                        Ok(true) => {}
                        Ok(false) => break,
                        Err(e) => writeln!(self.output, "Error: {}", e)?,
                    }
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
                Err(e) => {
                    writeln!(self.output, "Error: {}", e)?;
                    break;
                }
            }
        }

        Ok(())
    }

    /// Returns `false` when the user asked to quit.
    async fn handle_input(&mut self, input: &str) -> Result<bool> {
        match Command::parse(input) {
            Command::Help => {
                write!(self.output, "{}", HELP_TEXT)?;
                if self.voice.is_available() {
                    write!(self.output, "{}", VOICE_HELP)?;
                }
                writeln!(self.output)?;
            }
            Command::Quit => return Ok(false),
            Command::Clear => self.clear_chat()?,
            Command::Mode(None) => {
                let current = self.conversation.mode();
                for mode in Mode::ALL {
                    let marker = if mode == current { "*" } else { " " };
                    writeln!(self.output, "{} {:<10} {}", marker, mode.id(), mode.display_name())?;
                }
            }
            Command::Mode(Some(id)) => match id.parse::<Mode>() {
                Ok(mode) => {
                    let welcome = self.conversation.switch_mode(mode)?;
                    writeln!(self.output, "\n{}\n", mode.display_name().bold())?;
                    self.print_assistant(welcome)?;
                }
                Err(e) => writeln!(self.output, "{}", e)?,
            },
            Command::Voice => self.dictate().await?,
            Command::Message(text) => self.process_chat_input(&text).await?,
        }

        Ok(true)
    }

    fn clear_chat(&mut self) -> Result<()> {
        if !self.confirm("Clear the whole conversation? [y/N] ")? {
            return Ok(());
        }

        self.conversation.clear()?;
        self.print_welcome()?;
        writeln!(self.output, "Conversation cleared.")?;
        Ok(())
    }

    fn confirm(&mut self, question: &str) -> Result<bool> {
        if self.accept_all || !self.interactive {
            return Ok(true);
        }
        match self.editor.as_mut() {
            Some(rl) => match rl.readline(question) {
                Ok(answer) => Ok(is_yes(&answer)),
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(false),
                Err(e) => Err(e.into()),
            },
            None => Ok(true),
        }
    }

    async fn dictate(&mut self) -> Result<()> {
        if !self.voice.is_available() {
            writeln!(self.output, "Voice input is not supported in this environment.")?;
            return Ok(());
        }

        writeln!(self.output, "{}", "Listening...".dim())?;
        match self.voice.listen().await {
            Ok(Some(transcript)) => {
                if self.interactive {
                    self.dictated = Some(transcript);
                } else {
                    self.process_chat_input(&transcript).await?;
                }
            }
            Ok(None) => writeln!(self.output, "No speech recognized.")?,
            Err(e) => writeln!(self.output, "Voice input failed, please try again: {}", e)?,
        }
        Ok(())
    }

    async fn process_chat_input(&mut self, input: &str) -> Result<()> {
        let turn = match self.conversation.begin_turn(input) {
            Ok(Some(turn)) => turn,
            Ok(None) => return Ok(()),
            Err(e) => {
                writeln!(self.output, "{}", e)?;
                return Ok(());
            }
        };

        if !self.interactive {
            writeln!(self.output, "{} {}", "You:".bold(), turn.user_text())?;
        }

        show_loading(&mut self.output, self.interactive, true)?;
        let result = turn.complete().await;
        show_loading(&mut self.output, self.interactive, false)?;

        match result {
            Ok(TurnOutcome::Replied { reply, source }) => {
                if source == ReplySource::Canned {
                    info!("Answered with a canned reply");
                }
                self.print_assistant(&reply)?;
            }
            Ok(TurnOutcome::Ignored) => {}
            Err(_) => self.print_assistant(APOLOGY_TEXT)?,
        }

        Ok(())
    }

    fn print_assistant(&mut self, content: &str) -> Result<()> {
        let rendered = render_content_with(content, self.image_policy);
        let text = if self.html {
            rendered.to_html()
        } else {
            rendered.to_plain_text()
        };
        let label = format!("{}:", self.conversation.mode().display_name());
        writeln!(self.output, "{} {}", label.bold().cyan(), text)?;
        self.transcript_lines += text.lines().count().max(1) as u64;
        Ok(())
    }
}

fn show_loading(output: &mut Box<dyn Write>, interactive: bool, show: bool) -> Result<()> {
    if !interactive {
        return Ok(());
    }
    if show {
        write!(output, "{}", "Thinking...".dim())?;
        output.flush()?;
    } else {
        crossterm::execute!(output, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
    }
    Ok(())
}
