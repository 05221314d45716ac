use anyhow::Result;
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use studyhall_chat::{ChatClient, ChatError, Notice, NoticeLevel};
use studyhall_store::{
    MemoryStorage, SessionStore, Storage, StoreError, StoreResult, SESSIONS_KEY,
};
use studyhall_stream::{
    AnswerSource, ByteStream, ScriptStep, ScriptedSource, StreamObserver, StreamOutcome,
};
use studyhall_types::{AskRequest, ChatMessage, Role, UnitSelection};

#[derive(Default)]
struct Recorder {
    updates: Vec<String>,
    finalized: usize,
}

impl StreamObserver for Recorder {
    fn on_update(&mut self, message: &ChatMessage) {
        self.updates.push(message.content.clone());
    }

    fn on_finalized(&mut self, _message: Option<&ChatMessage>, _outcome: &StreamOutcome) {
        self.finalized += 1;
    }
}

/// Serves a different script for each request, in order
struct SequenceSource {
    scripts: Mutex<Vec<ScriptedSource>>,
}

impl SequenceSource {
    fn new(mut scripts: Vec<ScriptedSource>) -> Self {
        scripts.reverse();
        Self {
            scripts: Mutex::new(scripts),
        }
    }
}

#[async_trait]
impl AnswerSource for SequenceSource {
    async fn open(&self, request: &AskRequest) -> Result<ByteStream> {
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop()
            .expect("no script left for request");
        script.open(request).await
    }
}

fn algorithms() -> UnitSelection {
    UnitSelection {
        unit_id: 5,
        unit_name: "Algorithms".to_string(),
        course_path: "Computer Science > Year 1 > Semester 2".to_string(),
    }
}

fn networks() -> UnitSelection {
    UnitSelection {
        unit_id: 6,
        unit_name: "Networks".to_string(),
        course_path: "Computer Science > Year 1 > Semester 2".to_string(),
    }
}

/// Memory storage that fails exactly one save, counted from 1
struct FlakyStorage {
    inner: MemoryStorage,
    saves: Arc<AtomicUsize>,
    fail_on: usize,
}

impl Storage for FlakyStorage {
    fn load(&self, key: &str) -> StoreResult<Option<String>> {
        self.inner.load(key)
    }

    fn save(&self, key: &str, value: &str) -> StoreResult<()> {
        if self.saves.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_on {
            return Err(StoreError::Io {
                path: format!("{}.json", key).into(),
                source: io::Error::new(io::ErrorKind::Other, "disk full"),
            });
        }
        self.inner.save(key, value)
    }
}

fn client_with(source: Arc<dyn AnswerSource>) -> (ChatClient, MemoryStorage) {
    let storage = MemoryStorage::new();
    let store = SessionStore::open(storage.clone()).unwrap();
    (ChatClient::new(store, source), storage)
}

#[tokio::test]
async fn test_first_question_creates_session_and_streams_answer() {
    let source = Arc::new(ScriptedSource::answering(&[
        "Recursion ",
        "is a function ",
        "calling itself.",
    ]));
    let (mut client, storage) = client_with(source.clone());
    client.select_unit(Some(algorithms()));
    let mut recorder = Recorder::default();

    let result = client.ask("What is recursion?", &mut recorder).await.unwrap();

    assert_eq!(result.outcome, StreamOutcome::Completed);
    assert_eq!(client.sessions().len(), 1);

    let session = client.current_session().unwrap();
    assert_eq!(session.id, result.session_id);
    assert_eq!(session.unit_id, 5);
    assert_eq!(session.course_path, "Computer Science > Year 1 > Semester 2");
    assert_eq!(session.messages.len(), 2);

    let question = &session.messages[0];
    assert_eq!(question.role, Role::User);
    assert_eq!(question.content, "What is recursion?");

    let answer = &session.messages[1];
    assert_eq!(answer.id, result.message_id);
    assert_eq!(answer.role, Role::Assistant);
    assert_eq!(answer.content, "Recursion is a function calling itself.");
    assert!(!answer.is_streaming);

    assert_eq!(
        recorder.updates,
        vec![
            "Recursion ".to_string(),
            "Recursion is a function ".to_string(),
            "Recursion is a function calling itself.".to_string(),
        ]
    );
    assert_eq!(recorder.finalized, 1);
    assert_eq!(
        source.requests(),
        vec![AskRequest {
            unit_id: 5,
            question: "What is recursion?".to_string(),
        }]
    );
    assert!(storage
        .get(SESSIONS_KEY)
        .unwrap()
        .contains("Recursion is a function calling itself."));
    assert!(client.drain_notices().is_empty());
}

#[tokio::test]
async fn test_follow_up_question_reuses_session() {
    let source = Arc::new(SequenceSource::new(vec![
        ScriptedSource::answering(&["First."]),
        ScriptedSource::answering(&["Second."]),
    ]));
    let (mut client, _) = client_with(source);
    client.select_unit(Some(algorithms()));

    let first = client.ask("Q1", &mut ()).await.unwrap();
    let second = client.ask("  Q2  ", &mut ()).await.unwrap();

    assert_eq!(first.session_id, second.session_id);
    let session = client.current_session().unwrap();
    let contents: Vec<&str> = session.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["Q1", "First.", "Q2", "Second."]);
}

#[tokio::test]
async fn test_validation_rejects_without_side_effects() {
    let source = Arc::new(ScriptedSource::answering(&["unused"]));
    let (mut client, storage) = client_with(source.clone());

    let err = client.ask("What is recursion?", &mut ()).await.unwrap_err();
    assert!(matches!(err, ChatError::NoUnitSelected));
    assert_eq!(client.drain_notices(), vec![Notice::error("Please select a unit")]);

    client.select_unit(Some(algorithms()));
    let err = client.ask("   \n", &mut ()).await.unwrap_err();
    assert!(matches!(err, ChatError::EmptyQuestion));
    assert_eq!(client.drain_notices(), vec![Notice::error("Please enter a question")]);

    assert!(client.sessions().is_empty());
    assert!(source.requests().is_empty());
    assert_eq!(storage.get(SESSIONS_KEY), None);
}

#[tokio::test]
async fn test_network_failure_keeps_partial_answer_and_notifies() {
    let source = Arc::new(ScriptedSource::new(vec![
        ScriptStep::Chunk(b"data: {\"token\": \"The \"}\n\n".to_vec()),
        ScriptStep::Chunk(b"data: {\"token\": \"answer \"}\n\n".to_vec()),
        ScriptStep::Error("connection reset".to_string()),
    ]));
    let (mut client, _) = client_with(source);
    client.select_unit(Some(algorithms()));

    let result = client.ask("What is recursion?", &mut ()).await.unwrap();

    assert!(result.outcome.is_failure());
    let answer = &client.current_session().unwrap().messages[1];
    assert_eq!(answer.content, "The answer ");
    assert!(!answer.is_streaming);

    let notices = client.drain_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert_eq!(notices[0].text, "Failed to get answer");
}

#[tokio::test]
async fn test_request_failure_finalizes_empty_answer() {
    let source = Arc::new(ScriptedSource::failing_open("Failed to get response: 500"));
    let (mut client, _) = client_with(source);
    client.select_unit(Some(algorithms()));

    let result = client.ask("What is recursion?", &mut ()).await.unwrap();

    assert_eq!(
        result.outcome,
        StreamOutcome::Failed("Failed to get response: 500".to_string())
    );
    let answer = &client.current_session().unwrap().messages[1];
    assert_eq!(answer.content, "");
    assert!(!answer.is_streaming);
    assert_eq!(client.drain_notices(), vec![Notice::error("Failed to get answer")]);
}

#[tokio::test]
async fn test_abort_handle_stops_running_answer() {
    let source = Arc::new(ScriptedSource::new(vec![
        ScriptStep::Chunk(b"data: {\"token\": \"Partial\"}\n\n".to_vec()),
        ScriptStep::Hang,
    ]));
    let (mut client, _) = client_with(source);
    client.select_unit(Some(algorithms()));

    let handle = client.abort_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();
    });

    let result = tokio::time::timeout(Duration::from_secs(5), client.ask("Q", &mut ()))
        .await
        .expect("abort must end the stream")
        .unwrap();

    assert_eq!(result.outcome, StreamOutcome::Cancelled);
    let answer = &client.current_session().unwrap().messages[1];
    assert_eq!(answer.content, "Partial");
    assert!(!answer.is_streaming);
    assert_eq!(client.drain_notices(), vec![Notice::info("Answer stopped")]);
    assert!(!client.abort_handle().is_aborted());
}

#[tokio::test]
async fn test_stale_abort_does_not_stop_next_answer() {
    let source = Arc::new(ScriptedSource::answering(&["Still here."]));
    let (mut client, _) = client_with(source);
    client.select_unit(Some(algorithms()));

    // Ctrl-C arriving after the previous answer already finished
    client.abort_handle().abort();

    let handle = client.abort_handle();
    assert!(!handle.is_aborted());

    let result = client.ask("Q", &mut ()).await.unwrap();
    assert_eq!(result.outcome, StreamOutcome::Completed);
    assert_eq!(client.current_session().unwrap().messages[1].content, "Still here.");
}

#[tokio::test]
async fn test_failed_save_of_answer_does_not_block_session() {
    let storage = FlakyStorage {
        inner: MemoryStorage::new(),
        saves: Arc::new(AtomicUsize::new(0)),
        // create session, add question, add answer
        fail_on: 3,
    };
    let store = SessionStore::open(storage).unwrap();
    let source = Arc::new(ScriptedSource::answering(&["Done."]));
    let mut client = ChatClient::new(store, source);
    client.select_unit(Some(algorithms()));

    let err = client.ask("Q1", &mut ()).await.unwrap_err();
    assert!(matches!(err, ChatError::Store(StoreError::Io { .. })));
    let session = client.current_session().unwrap();
    assert_eq!(session.messages.len(), 1);
    assert_eq!(session.streaming_message(), None);

    let result = client.ask("Q2", &mut ()).await.unwrap();
    assert_eq!(result.outcome, StreamOutcome::Completed);
    let session = client.current_session().unwrap();
    assert_eq!(session.messages.len(), 3);
    assert_eq!(session.messages[2].content, "Done.");
    assert!(!session.messages[2].is_streaming);
}

#[tokio::test]
async fn test_dropped_ask_is_recovered_by_next_question() {
    let source = Arc::new(SequenceSource::new(vec![
        ScriptedSource::new(vec![ScriptStep::Hang]),
        ScriptedSource::answering(&["Done."]),
    ]));
    let (mut client, _) = client_with(source);
    client.select_unit(Some(algorithms()));

    let timed_out = tokio::time::timeout(Duration::from_millis(50), client.ask("Q1", &mut ())).await;
    assert!(timed_out.is_err());

    let session_id = client.current_session().unwrap().id.clone();
    assert!(client.store().find_streaming(&session_id).is_some());

    let result = client.ask("Q2", &mut ()).await.unwrap();

    assert_eq!(result.outcome, StreamOutcome::Completed);
    let session = client.current_session().unwrap();
    assert_eq!(session.messages.len(), 4);
    assert_eq!(session.messages.iter().filter(|m| m.is_streaming).count(), 0);
    assert_eq!(session.messages[3].content, "Done.");
}

#[tokio::test]
async fn test_delete_session_pointer_semantics() {
    let source = Arc::new(SequenceSource::new(vec![
        ScriptedSource::answering(&["A"]),
        ScriptedSource::answering(&["B"]),
    ]));
    let (mut client, storage) = client_with(source);

    client.select_unit(Some(algorithms()));
    let first = client.ask("Q1", &mut ()).await.unwrap().session_id;
    client.new_session();
    let second = client.ask("Q2", &mut ()).await.unwrap().session_id;
    assert_ne!(first, second);
    assert_eq!(client.current_session().unwrap().id, second);

    client.delete_session(&first).unwrap();
    assert_eq!(client.current_session().unwrap().id, second);
    assert_eq!(client.drain_notices(), vec![Notice::success("Chat session deleted")]);

    client.delete_session(&second).unwrap();
    assert!(client.current_session().is_none());
    assert!(client.sessions().is_empty());
    assert_eq!(storage.get(SESSIONS_KEY).as_deref(), Some("[]"));
}

#[tokio::test]
async fn test_select_session_and_toggle_saved() {
    let source = Arc::new(SequenceSource::new(vec![
        ScriptedSource::answering(&["About algorithms."]),
        ScriptedSource::answering(&["About networks."]),
    ]));
    let (mut client, _) = client_with(source);

    client.select_unit(Some(algorithms()));
    let algo = client.ask("Q1", &mut ()).await.unwrap();

    // Switching unit leaves the open session
    client.select_unit(Some(networks()));
    assert!(client.current_session().is_none());
    let net = client.ask("Q2", &mut ()).await.unwrap();
    assert_ne!(algo.session_id, net.session_id);

    client.select_session(&algo.session_id).unwrap();
    assert_eq!(client.selected_unit(), Some(&algorithms()));

    assert!(client.toggle_saved(&algo.message_id).unwrap());
    assert!(!client.toggle_saved(&algo.message_id).unwrap());
    assert_eq!(
        client.drain_notices(),
        vec![Notice::success("Message saved"), Notice::success("Message unsaved")]
    );

    client.new_session();
    assert!(matches!(
        client.toggle_saved(&algo.message_id),
        Err(ChatError::NoActiveSession)
    ));
}
