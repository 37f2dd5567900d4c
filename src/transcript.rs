use tracing::{debug, warn};

use crate::storage::{Storage, StoreError};
use crate::turn::{Role, Turn};

/// Storage key the transcript is written under.
pub const HISTORY_KEY: &str = "conversationHistory";

/// Ordered conversation history mirrored into a [`Storage`] medium.
///
/// Turns are only ever appended; [`clear`](Self::clear) is the public way to
/// remove anything and it wipes both memory and storage. A turn that failed
/// to persist is taken back by the controller so memory never runs ahead of
/// storage.
pub struct TranscriptStore {
    turns: Vec<Turn>,
    storage: Box<dyn Storage>,
    key: String,
}

impl TranscriptStore {
    /// Create an empty store persisting under [`HISTORY_KEY`].
    pub fn new(storage: Box<dyn Storage>) -> Self {
        Self::with_key(storage, HISTORY_KEY)
    }

    /// Create an empty store persisting under `key`.
    pub fn with_key(storage: Box<dyn Storage>, key: impl Into<String>) -> Self {
        Self {
            turns: Vec::new(),
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Add `turn` to the end of the in-memory transcript.
    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Drop the latest turn again, used when it could not be saved.
    pub(crate) fn pop(&mut self) -> Option<Turn> {
        self.turns.pop()
    }

    /// Write the whole transcript to storage, replacing the previous value.
    pub fn persist(&mut self) -> Result<(), StoreError> {
        let json = serde_json::to_string(&self.turns)?;
        self.storage.set(&self.key, &json)?;
        debug!(key = %self.key, turns = self.turns.len(), "transcript saved");
        Ok(())
    }

    /// Load the transcript from storage.
    ///
    /// Returns `None` when nothing usable is stored, leaving the in-memory
    /// transcript empty. Values that do not decode as a list of turns are
    /// treated like a missing key.
    pub fn restore(&mut self) -> Result<Option<&[Turn]>, StoreError> {
        let Some(raw) = self.storage.get(&self.key)? else {
            debug!(key = %self.key, "no stored transcript");
            self.turns.clear();
            return Ok(None);
        };
        match serde_json::from_str::<Vec<Turn>>(&raw) {
            Ok(turns) => {
                debug!(key = %self.key, turns = turns.len(), "transcript loaded");
                self.turns = turns;
                Ok(Some(&self.turns))
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "ignoring unreadable stored transcript");
                self.turns.clear();
                Ok(None)
            }
        }
    }

    /// Empty the transcript and delete the stored copy.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.turns.clear();
        self.storage.remove(&self.key)?;
        debug!(key = %self.key, "transcript cleared");
        Ok(())
    }

    /// Flatten the conversation into the prompt sent to the model.
    ///
    /// Each user and assistant turn becomes `"<role>: <content>"`, joined by
    /// newlines in transcript order. System notices stay local.
    pub fn to_prompt(&self) -> String {
        self.turns
            .iter()
            .filter(|t| t.role != Role::System)
            .map(|t| format!("{}: {}", t.role, t.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl std::fmt::Debug for TranscriptStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriptStore")
            .field("key", &self.key)
            .field("turns", &self.turns)
            .finish_non_exhaustive()
    }
}
