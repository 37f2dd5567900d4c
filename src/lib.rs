//! Terminal chat front-end for a locally hosted language model.
//!
//! A [`TurnController`] owns one conversation. Each submission appends a user
//! turn to the [`TranscriptStore`], sends the flattened transcript to an
//! [`InferenceClient`] and appends the reply, saving after every change.
//!
//! ```
//! use std::sync::Arc;
//! use said::{MemoryStorage, TranscriptStore, TurnController};
//! use said::mock::{RecordingView, StaticInference};
//! # tokio_test::block_on(async {
//! let store = TranscriptStore::new(Box::new(MemoryStorage::new()));
//! let llm = Arc::new(StaticInference::new("hello"));
//! let mut chat = TurnController::new(store, llm, Box::new(RecordingView::new()));
//! chat.start().unwrap();
//! chat.submit("hi").await.unwrap();
//! assert_eq!(chat.store().to_prompt(), "user: hi\nassistant: hello");
//! # });
//! ```

pub mod config;
pub mod controller;
pub mod llm;
pub mod logging;
pub mod mock;
pub mod render;
pub mod repl;
pub mod storage;
pub mod transcript;
pub mod turn;
pub mod view;

pub use controller::{Phase, PendingTurn, Resolution, SubmitError, TurnController};
pub use llm::{InferenceClient, InferenceError, OllamaGenerate};
pub use storage::{FileStorage, MemoryStorage, Storage, StoreError};
pub use transcript::{HISTORY_KEY, TranscriptStore};
pub use turn::{Role, Turn};
pub use view::{TerminalView, View};
