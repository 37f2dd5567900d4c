use std::sync::Arc;

use said::controller::{EMPTY_REPLY, RESET_NOTICE, UNREACHABLE_NOTICE, WELCOME_NOTICE};
use said::mock::{FailingInference, RecordingView, StaticInference, ViewEvent};
use said::{
    InferenceClient, InferenceError, MemoryStorage, Phase, Resolution, Role, Storage, SubmitError,
    TranscriptStore, Turn, TurnController, HISTORY_KEY,
};

fn controller(
    client: Arc<dyn InferenceClient>,
) -> (TurnController, MemoryStorage, RecordingView) {
    let storage = MemoryStorage::new();
    let view = RecordingView::new();
    let store = TranscriptStore::new(Box::new(storage.clone()));
    let c = TurnController::new(store, client, Box::new(view.clone()));
    (c, storage, view)
}

fn stored(storage: &MemoryStorage) -> Vec<Turn> {
    let raw = storage.get(HISTORY_KEY).unwrap().unwrap_or_else(|| "[]".into());
    serde_json::from_str(&raw).unwrap()
}

#[tokio::test]
async fn n_exchanges_alternate_user_and_assistant() {
    let llm = StaticInference::new("ok");
    let (mut c, storage, _) = controller(Arc::new(llm.clone()));
    for i in 0..4 {
        let res = c.submit(&format!("q{i}")).await.unwrap();
        assert_eq!(res, Resolution::Replied);
    }
    let turns = c.transcript();
    assert_eq!(turns.len(), 8);
    for (i, pair) in turns.chunks(2).enumerate() {
        assert_eq!(pair[0], Turn::user(format!("q{i}")));
        assert_eq!(pair[1], Turn::assistant("ok"));
    }
    assert_eq!(stored(&storage), turns);
    assert_eq!(c.phase(), Phase::Idle);
}

#[tokio::test]
async fn prompt_carries_full_history() {
    let llm = StaticInference::new("hello");
    let (mut c, _, _) = controller(Arc::new(llm.clone()));
    c.submit("hi").await.unwrap();
    c.submit("bye").await.unwrap();
    assert_eq!(
        llm.prompts(),
        vec![
            "user: hi".to_string(),
            "user: hi\nassistant: hello\nuser: bye".to_string()
        ]
    );
}

#[tokio::test]
async fn failure_appends_one_system_turn() {
    let (mut c, storage, view) = controller(Arc::new(FailingInference));
    let res = c.submit("hello?").await.unwrap();
    assert_eq!(res, Resolution::Failed);
    assert_eq!(
        c.transcript(),
        &[Turn::user("hello?"), Turn::system(UNREACHABLE_NOTICE)]
    );
    assert!(c.transcript().iter().all(|t| t.role != Role::Assistant));
    assert_eq!(stored(&storage), c.transcript());
    assert!(!view.busy());
}

#[tokio::test]
async fn empty_reply_uses_placeholder() {
    let (mut c, _, _) = controller(Arc::new(StaticInference::new("")));
    c.submit("hi").await.unwrap();
    assert_eq!(c.transcript()[1], Turn::assistant(EMPTY_REPLY));
}

#[tokio::test]
async fn blank_input_changes_nothing() {
    let llm = StaticInference::new("never");
    let (mut c, storage, view) = controller(Arc::new(llm.clone()));
    for input in ["", "   ", "\t\n"] {
        assert_eq!(c.submit(input).await.unwrap(), Resolution::Ignored);
    }
    assert!(c.transcript().is_empty());
    assert!(llm.prompts().is_empty());
    assert!(storage.get(HISTORY_KEY).unwrap().is_none());
    assert!(view.events().is_empty());
}

#[tokio::test]
async fn input_is_trimmed() {
    let (mut c, _, _) = controller(Arc::new(StaticInference::new("x")));
    c.submit("  spaced out \n").await.unwrap();
    assert_eq!(c.transcript()[0], Turn::user("spaced out"));
}

#[test]
fn phases_are_observable_between_halves() {
    let (mut c, storage, view) = controller(Arc::new(StaticInference::new("x")));
    assert_eq!(c.phase(), Phase::Idle);

    let pending = c.begin("hi").unwrap().unwrap();
    assert_eq!(c.phase(), Phase::Awaiting);
    assert_eq!(pending.prompt(), "user: hi");
    assert!(view.busy());
    assert_eq!(stored(&storage), vec![Turn::user("hi")]);

    let res = c.complete(pending, Ok("hello".into())).unwrap();
    assert_eq!(res, Resolution::Replied);
    assert_eq!(c.phase(), Phase::Idle);
    assert!(!view.busy());
}

#[test]
fn second_submission_while_awaiting_is_refused() {
    let (mut c, _, _) = controller(Arc::new(StaticInference::new("x")));
    let pending = c.begin("one").unwrap().unwrap();
    assert!(matches!(c.begin("two"), Err(SubmitError::Busy)));
    assert_eq!(c.transcript().len(), 1);
    c.complete(pending, Ok("r".into())).unwrap();
    assert!(c.begin("two").unwrap().is_some());
}

#[test]
fn reply_after_reset_is_dropped() {
    let (mut c, storage, view) = controller(Arc::new(StaticInference::new("x")));
    let pending = c.begin("hi").unwrap().unwrap();
    c.reset().unwrap();
    assert_eq!(c.phase(), Phase::Idle);
    assert!(!view.busy());

    let res = c.complete(pending, Ok("late".into())).unwrap();
    assert_eq!(res, Resolution::Stale);
    assert!(c.transcript().is_empty());
    assert!(storage.get(HISTORY_KEY).unwrap().is_none());
}

#[test]
fn failure_after_reset_is_dropped_too() {
    let (mut c, _, _) = controller(Arc::new(StaticInference::new("x")));
    let pending = c.begin("hi").unwrap().unwrap();
    c.reset().unwrap();
    let res = c
        .complete(pending, Err(InferenceError::Status { status: 500 }))
        .unwrap();
    assert_eq!(res, Resolution::Stale);
    assert!(c.transcript().is_empty());
}

#[tokio::test]
async fn reset_wipes_storage_and_shows_display_only_notice() {
    let (mut c, storage, view) = controller(Arc::new(StaticInference::new("x")));
    c.submit("hi").await.unwrap();
    c.reset().unwrap();

    assert!(c.transcript().is_empty());
    assert!(storage.get(HISTORY_KEY).unwrap().is_none());
    assert_eq!(view.notices(), vec![RESET_NOTICE.to_string()]);
    let events = view.events();
    let clear = events.iter().rposition(|e| *e == ViewEvent::Clear).unwrap();
    assert!(events[clear..].contains(&ViewEvent::ResetInput));

    let mut fresh = TranscriptStore::new(Box::new(storage));
    assert!(fresh.restore().unwrap().is_none());
}

#[test]
fn start_without_history_welcomes_without_persisting() {
    let (mut c, storage, view) = controller(Arc::new(StaticInference::new("x")));
    c.start().unwrap();
    assert_eq!(view.notices(), vec![WELCOME_NOTICE.to_string()]);
    assert!(c.transcript().is_empty());
    assert!(storage.get(HISTORY_KEY).unwrap().is_none());
}

#[tokio::test]
async fn start_replays_stored_conversation() {
    let storage = MemoryStorage::new();
    {
        let store = TranscriptStore::new(Box::new(storage.clone()));
        let mut first = TurnController::new(
            store,
            Arc::new(StaticInference::new("hello")),
            Box::new(RecordingView::new()),
        );
        first.submit("hi").await.unwrap();
    }

    let view = RecordingView::new();
    let store = TranscriptStore::new(Box::new(storage));
    let mut second = TurnController::new(
        store,
        Arc::new(StaticInference::new("again")),
        Box::new(view.clone()),
    );
    second.start().unwrap();
    assert_eq!(
        view.events(),
        vec![
            ViewEvent::Clear,
            ViewEvent::Show(Turn::user("hi")),
            ViewEvent::Show(Turn::assistant("hello")),
        ]
    );
    second.submit("more").await.unwrap();
    assert_eq!(second.transcript().len(), 4);
}

/// Storage whose next `set` fails once when armed.
#[derive(Clone, Default)]
struct FlakyStorage {
    inner: MemoryStorage,
    fail_next_set: Arc<std::sync::atomic::AtomicBool>,
}

impl Storage for FlakyStorage {
    fn get(&self, key: &str) -> Result<Option<String>, said::StoreError> {
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), said::StoreError> {
        if self
            .fail_next_set
            .swap(false, std::sync::atomic::Ordering::SeqCst)
        {
            return Err(said::StoreError::Io {
                path: "flaky".into(),
                source: std::io::Error::other("disk full"),
            });
        }
        self.inner.set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), said::StoreError> {
        self.inner.remove(key)
    }
}

#[tokio::test]
async fn unsaved_user_turn_is_rolled_back() {
    let storage = FlakyStorage::default();
    storage
        .fail_next_set
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let llm = StaticInference::new("ok");
    let view = RecordingView::new();
    let mut c = TurnController::new(
        TranscriptStore::new(Box::new(storage.clone())),
        Arc::new(llm.clone()),
        Box::new(view.clone()),
    );

    assert!(matches!(c.begin("first"), Err(SubmitError::Store(_))));
    assert!(c.transcript().is_empty());
    assert_eq!(c.phase(), Phase::Idle);
    assert!(storage.get(HISTORY_KEY).unwrap().is_none());
    assert!(view.events().is_empty());

    c.submit("second").await.unwrap();
    assert_eq!(llm.prompts(), vec!["user: second".to_string()]);
    assert_eq!(
        stored(&storage.inner),
        vec![Turn::user("second"), Turn::assistant("ok")]
    );
}
