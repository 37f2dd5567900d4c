//! Stand-ins for the model and the display, for tests and offline use.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::llm::{InferenceClient, InferenceError};
use crate::turn::Turn;
use crate::view::View;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Replies with a fixed text and remembers every prompt it was given.
#[derive(Clone, Default)]
pub struct StaticInference {
    reply: String,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl StaticInference {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            prompts: Arc::default(),
        }
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }
}

#[async_trait]
impl InferenceClient for StaticInference {
    async fn generate(&self, prompt: &str) -> Result<String, InferenceError> {
        lock(&self.prompts).push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

/// Always fails with an HTTP 503.
#[derive(Clone, Copy, Default)]
pub struct FailingInference;

#[async_trait]
impl InferenceClient for FailingInference {
    async fn generate(&self, _prompt: &str) -> Result<String, InferenceError> {
        Err(InferenceError::Status { status: 503 })
    }
}

/// What a [`RecordingView`] was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    Show(Turn),
    Notice(String),
    Clear,
    Busy(bool),
    ResetInput,
}

/// View that records calls instead of drawing. Clones share one log.
#[derive(Clone, Default)]
pub struct RecordingView {
    events: Arc<Mutex<Vec<ViewEvent>>>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ViewEvent> {
        lock(&self.events).clone()
    }

    /// Notices shown so far.
    pub fn notices(&self) -> Vec<String> {
        lock(&self.events)
            .iter()
            .filter_map(|e| match e {
                ViewEvent::Notice(n) => Some(n.clone()),
                _ => None,
            })
            .collect()
    }

    /// Whether the busy indicator is currently shown.
    pub fn busy(&self) -> bool {
        lock(&self.events)
            .iter()
            .rev()
            .find_map(|e| match e {
                ViewEvent::Busy(b) => Some(*b),
                _ => None,
            })
            .unwrap_or(false)
    }
}

impl View for RecordingView {
    fn show(&mut self, turn: &Turn) {
        lock(&self.events).push(ViewEvent::Show(turn.clone()));
    }

    fn notice(&mut self, text: &str) {
        lock(&self.events).push(ViewEvent::Notice(text.to_string()));
    }

    fn clear(&mut self) {
        lock(&self.events).push(ViewEvent::Clear);
    }

    fn set_busy(&mut self, busy: bool) {
        lock(&self.events).push(ViewEvent::Busy(busy));
    }

    fn reset_input(&mut self) {
        lock(&self.events).push(ViewEvent::ResetInput);
    }
}
