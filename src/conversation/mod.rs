//! The conversation controller.
//!
//! A [`Conversation`] owns the message log and runs at most one turn at a time:
//!
//! ```text
//! Idle --begin_turn--> Sending (PendingTurn) --complete--> Success | Failure --> Idle
//! ```
//!
//! [`PendingTurn`] is the `Sending` state. Dropping it, whether completed or
//! not, releases the in-flight guard.

pub mod persona;
pub mod state;

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info, warn};

pub use persona::{CannedReplies, Mode};
pub use state::{ConversationState, Message, Role};

use crate::api_client::ChatTransport;
use crate::error::{ChatError, Result};
use crate::negotiate::reply_or_fallback;

/// Shown to the user when a turn fails; never recorded in the history.
pub const APOLOGY_TEXT: &str = "Sorry, the service is temporarily unavailable. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    Remote,
    /// Local canned reply after a loopback endpoint failed.
    Canned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Blank input; nothing happened.
    Ignored,
    Replied { reply: String, source: ReplySource },
}

pub struct Conversation<T> {
    transport: T,
    state: Mutex<ConversationState>,
    in_flight: AtomicBool,
    rng: Mutex<StdRng>,
}

impl<T: ChatTransport> Conversation<T> {
    pub fn new(transport: T, mode: Mode) -> Self {
        Self {
            transport,
            state: Mutex::new(ConversationState::new(mode)),
            in_flight: AtomicBool::new(false),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Seed the canned-reply picker.
    pub fn with_seed(self, seed: u64) -> Self {
        *self.rng.lock() = StdRng::seed_from_u64(seed);
        self
    }

    pub fn mode(&self) -> Mode {
        self.state.lock().mode()
    }

    pub fn history(&self) -> Vec<Message> {
        self.state.lock().get_messages().to_vec()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Record the user's message and enter the `Sending` state.
    ///
    /// Returns `Ok(None)` for blank input. Fails with
    /// [`ChatError::TurnInFlight`] while another turn is outstanding.
    pub fn begin_turn(&self, text: &str) -> Result<Option<PendingTurn<'_, T>>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        self.acquire()?;

        let (history, mode) = {
            let mut state = self.state.lock();
            state.add_user_message(text);
            (state.get_messages().to_vec(), state.mode())
        };

        Ok(Some(PendingTurn {
            conversation: self,
            history,
            mode,
        }))
    }

    pub async fn submit_turn(&self, text: &str) -> Result<TurnOutcome> {
        match self.begin_turn(text)? {
            Some(turn) => turn.complete().await,
            None => Ok(TurnOutcome::Ignored),
        }
    }

    pub fn clear(&self) -> Result<()> {
        self.while_idle(|state| state.clear())?;
        info!("Conversation cleared");
        Ok(())
    }

    /// Switch persona. Clears the history and returns the new welcome text,
    /// which is for display only.
    pub fn switch_mode(&self, mode: Mode) -> Result<&'static str> {
        self.while_idle(|state| state.set_mode(mode))?;
        info!("Switched to {} mode", mode);
        Ok(mode.welcome())
    }

    fn acquire(&self) -> Result<()> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| ChatError::TurnInFlight)
    }

    /// Run `f` holding the in-flight guard, so no turn can start underneath it.
    fn while_idle<R>(&self, f: impl FnOnce(&mut ConversationState) -> R) -> Result<R> {
        self.acquire()?;
        let out = f(&mut self.state.lock());
        self.in_flight.store(false, Ordering::Release);
        Ok(out)
    }

    fn canned_reply(&self, mode: Mode, message: &str) -> &'static str {
        CannedReplies::pick(mode, message, &mut *self.rng.lock())
    }
}

/// A turn whose user message is recorded and whose request is not yet done.
pub struct PendingTurn<'a, T: ChatTransport> {
    conversation: &'a Conversation<T>,
    history: Vec<Message>,
    mode: Mode,
}

impl<T: ChatTransport> PendingTurn<'_, T> {
    pub fn user_text(&self) -> &str {
        self.history
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }

    /// The exact messages that will be sent.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub async fn complete(self) -> Result<TurnOutcome> {
        let conversation = self.conversation;

        let (reply, source) = match conversation.transport.send(self.mode, &self.history).await {
            Ok(body) => (reply_or_fallback(&body), ReplySource::Remote),
            Err(e) if e.is_transport_failure() && conversation.transport.is_loopback() => {
                warn!("Chat API unavailable ({}), using a canned reply", e);
                let reply = conversation.canned_reply(self.mode, self.user_text());
                (reply.to_string(), ReplySource::Canned)
            }
            Err(e) => {
                error!("Chat turn failed: {}", e);
                return Err(e);
            }
        };

        conversation.state.lock().add_assistant_message(&reply);

        Ok(TurnOutcome::Replied { reply, source })
    }
}

impl<T: ChatTransport> Drop for PendingTurn<'_, T> {
    fn drop(&mut self) {
        self.conversation.in_flight.store(false, Ordering::Release);
    }
}
