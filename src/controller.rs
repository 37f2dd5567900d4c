//! Request/response cycle for one conversation.
//!
//! A submission moves through [`Phase::Submitted`] and [`Phase::Awaiting`]
//! before it is [`Phase::Resolved`] and the controller returns to
//! [`Phase::Idle`]. The two halves are exposed separately
//! ([`TurnController::begin`] and [`TurnController::complete`]) so a host can
//! keep handling input while the model is thinking.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::llm::{InferenceClient, InferenceError};
use crate::storage::StoreError;
use crate::transcript::TranscriptStore;
use crate::turn::Turn;
use crate::view::View;

/// Shown on first run when nothing was stored.
pub const WELCOME_NOTICE: &str = "Welcome! Ask the model your first question.";
/// Shown after the conversation has been reset.
pub const RESET_NOTICE: &str = "New conversation started. Ask your first question!";
/// Appended as a system turn when the inference call fails.
pub const UNREACHABLE_NOTICE: &str =
    "Could not reach the inference service. Check that Ollama is running.";
/// Stands in for a successful reply without text.
pub const EMPTY_REPLY: &str = "Empty response.";
/// Shown when input arrives while a reply is still pending.
pub const BUSY_NOTICE: &str = "Still waiting for the previous reply.";

/// Where the controller is in the submission lifecycle.
///
/// `Submitted` and `Resolved` only last for the duration of
/// [`TurnController::begin`] and [`TurnController::complete`]; between calls
/// [`TurnController::phase`] reports either `Idle` or `Awaiting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for input.
    Idle,
    /// The user turn is being recorded. Never observed between calls.
    Submitted,
    /// The inference call is in flight.
    Awaiting,
    /// The reply (or failure) is being recorded. Never observed between calls.
    Resolved,
}

/// Errors that stop a submission from starting or finishing.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("a reply is still pending")]
    Busy,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// How a pending turn was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Blank input; nothing happened.
    Ignored,
    /// An assistant turn was appended.
    Replied,
    /// A system error turn was appended instead of a reply.
    Failed,
    /// The conversation was reset while the call was in flight; the
    /// outcome was dropped.
    Stale,
}

/// Ticket for a submission whose reply has not been applied yet.
#[derive(Debug)]
pub struct PendingTurn {
    generation: u64,
    prompt: String,
}

impl PendingTurn {
    /// Prompt to send to the model.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Owns one conversation: its transcript, the model client and the view.
pub struct TurnController {
    store: TranscriptStore,
    client: Arc<dyn InferenceClient>,
    view: Box<dyn View>,
    phase: Phase,
    generation: u64,
}

impl TurnController {
    pub fn new(
        store: TranscriptStore,
        client: Arc<dyn InferenceClient>,
        view: Box<dyn View>,
    ) -> Self {
        Self {
            store,
            client,
            view,
            phase: Phase::Idle,
            generation: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Incremented by every reset; replies from older generations are dropped.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn transcript(&self) -> &[Turn] {
        self.store.turns()
    }

    pub fn store(&self) -> &TranscriptStore {
        &self.store
    }

    /// Shared handle to the model client.
    pub fn client(&self) -> Arc<dyn InferenceClient> {
        self.client.clone()
    }

    /// Show a display-only notice.
    pub fn notice(&mut self, text: &str) {
        self.view.notice(text);
    }

    /// Restore the stored conversation and display it.
    ///
    /// When nothing was stored a welcome notice is shown instead; it is not
    /// added to the transcript.
    pub fn start(&mut self) -> Result<(), StoreError> {
        self.view.clear();
        match self.store.restore()? {
            Some(turns) => {
                info!(turns = turns.len(), "conversation restored");
                for turn in turns {
                    self.view.show(turn);
                }
            }
            None => {
                info!("no stored conversation");
                self.view.notice(WELCOME_NOTICE);
            }
        }
        Ok(())
    }

    /// Record a user submission and prepare the inference call.
    ///
    /// Blank input is ignored and yields `Ok(None)`. Only one submission may
    /// be in flight; a second one fails with [`SubmitError::Busy`].
    pub fn begin(&mut self, input: &str) -> Result<Option<PendingTurn>, SubmitError> {
        let text = input.trim();
        if text.is_empty() {
            return Ok(None);
        }
        if self.phase == Phase::Awaiting {
            return Err(SubmitError::Busy);
        }

        self.phase = Phase::Submitted;
        self.store.append(Turn::user(text));
        if let Err(e) = self.store.persist() {
            // Memory must not run ahead of storage.
            self.store.pop();
            self.phase = Phase::Idle;
            return Err(e.into());
        }
        if let Some(turn) = self.store.turns().last() {
            self.view.show(turn);
        }
        self.view.reset_input();
        self.view.set_busy(true);

        let pending = PendingTurn {
            generation: self.generation,
            prompt: self.store.to_prompt(),
        };
        self.phase = Phase::Awaiting;
        debug!(generation = pending.generation, "awaiting reply");
        Ok(Some(pending))
    }

    /// Apply the outcome of the inference call started by [`begin`](Self::begin).
    pub fn complete(
        &mut self,
        pending: PendingTurn,
        outcome: Result<String, InferenceError>,
    ) -> Result<Resolution, StoreError> {
        if pending.generation != self.generation {
            warn!(
                pending = pending.generation,
                current = self.generation,
                "dropping reply from a reset conversation"
            );
            return Ok(Resolution::Stale);
        }

        self.phase = Phase::Resolved;
        let (turn, resolution) = match outcome {
            Ok(reply) if reply.is_empty() => (Turn::assistant(EMPTY_REPLY), Resolution::Replied),
            Ok(reply) => (Turn::assistant(reply), Resolution::Replied),
            Err(e) => {
                error!(error = %e, "inference call failed");
                (Turn::system(UNREACHABLE_NOTICE), Resolution::Failed)
            }
        };
        self.view.show(&turn);
        self.store.append(turn);
        let saved = self.store.persist();
        self.view.set_busy(false);
        self.phase = Phase::Idle;
        saved?;
        Ok(resolution)
    }

    /// Run one full exchange: record `input`, call the model, record the reply.
    pub async fn submit(&mut self, input: &str) -> Result<Resolution, SubmitError> {
        let Some(pending) = self.begin(input)? else {
            return Ok(Resolution::Ignored);
        };
        let outcome = self.client.generate(pending.prompt()).await;
        Ok(self.complete(pending, outcome)?)
    }

    /// Forget the conversation, in memory and in storage.
    ///
    /// A reply still in flight is dropped when it arrives.
    pub fn reset(&mut self) -> Result<(), StoreError> {
        self.generation += 1;
        self.phase = Phase::Idle;
        self.view.set_busy(false);
        let cleared = self.store.clear();
        self.view.clear();
        self.view.reset_input();
        self.view.notice(RESET_NOTICE);
        info!(generation = self.generation, "conversation reset");
        cleared
    }
}

impl std::fmt::Debug for TurnController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnController")
            .field("store", &self.store)
            .field("phase", &self.phase)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
