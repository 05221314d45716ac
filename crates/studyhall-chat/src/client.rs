use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use studyhall_store::SessionStore;
use studyhall_stream::{
    subscribe_with_token, AbortHandle, AnswerSource, StreamController, StreamObserver, StreamOutcome,
};
use studyhall_types::{AskRequest, ChatMessage, ChatSession, MessageId, SessionId, UnitSelection};

use crate::error::ChatError;
use crate::notice::Notice;

/// Result of a question that made it past validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskOutcome {
    pub session_id: SessionId,
    pub message_id: MessageId,
    pub outcome: StreamOutcome,
}

/// Chat state for one user: the session store, the selected unit, the
/// answer source, and pending notices
pub struct ChatClient {
    store: SessionStore,
    source: Arc<dyn AnswerSource>,
    controller: StreamController,
    selected_unit: Option<UnitSelection>,
    notices: Vec<Notice>,
    abort: CancellationToken,
    verbose: bool,
}

impl ChatClient {
    pub fn new(store: SessionStore, source: Arc<dyn AnswerSource>) -> Self {
        Self {
            store,
            source,
            controller: StreamController::new(),
            selected_unit: None,
            notices: Vec::new(),
            abort: CancellationToken::new(),
            verbose: false,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn sessions(&self) -> &[ChatSession] {
        self.store.sessions()
    }

    pub fn current_session(&self) -> Option<&ChatSession> {
        self.store.active_session()
    }

    pub fn selected_unit(&self) -> Option<&UnitSelection> {
        self.selected_unit.as_ref()
    }

    /// Choose the unit for the next question. Picking a different unit than
    /// the open session's leaves that session.
    pub fn select_unit(&mut self, unit: Option<UnitSelection>) {
        let switches_unit = match (self.store.active_session(), &unit) {
            (Some(session), Some(unit)) => session.unit_id != unit.unit_id,
            _ => false,
        };
        if switches_unit {
            self.store.clear_active();
        }
        self.selected_unit = unit;
    }

    /// Open an existing session; its unit becomes the selected unit
    pub fn select_session(&mut self, session_id: &str) -> Result<(), ChatError> {
        self.store.select(session_id)?;
        if let Some(session) = self.store.session(session_id) {
            self.selected_unit = Some(UnitSelection {
                unit_id: session.unit_id,
                unit_name: session.unit_name.clone(),
                course_path: session.course_path.clone(),
            });
        }
        Ok(())
    }

    /// Leave the current session; the next question starts a new one
    pub fn new_session(&mut self) {
        self.store.clear_active();
    }

    pub fn delete_session(&mut self, session_id: &str) -> Result<(), ChatError> {
        self.store.delete_session(session_id)?;
        self.notices.push(Notice::success("Chat session deleted"));
        Ok(())
    }

    /// Flip the saved flag of a message in the current session
    pub fn toggle_saved(&mut self, message_id: &str) -> Result<bool, ChatError> {
        let session_id = self
            .store
            .active_id()
            .cloned()
            .ok_or(ChatError::NoActiveSession)?;
        let saved = self.store.toggle_saved(&session_id, message_id)?;
        self.notices
            .push(Notice::success(if saved { "Message saved" } else { "Message unsaved" }));
        Ok(saved)
    }

    /// Handle that aborts the next or currently running answer stream.
    ///
    /// An abort that fired while no answer was streaming is discarded here,
    /// so the returned handle is always live.
    pub fn abort_handle(&mut self) -> AbortHandle {
        if self.abort.is_cancelled() {
            self.abort = CancellationToken::new();
        }
        AbortHandle::from(self.abort.clone())
    }

    /// Notices raised since the last call
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn reject(&mut self, error: ChatError) -> ChatError {
        self.notices.push(Notice::error(error.to_string()));
        error
    }

    /// Ask a question about the selected unit and stream the answer into the
    /// current session, creating a session if none is open.
    ///
    /// Validation failures change nothing and raise a notice. Once the
    /// question is accepted the answer message always ends finalized, keeping
    /// whatever content arrived before a failure.
    pub async fn ask(
        &mut self,
        question: &str,
        observer: &mut dyn StreamObserver,
    ) -> Result<AskOutcome, ChatError> {
        let Some(unit) = self.selected_unit.clone() else {
            return Err(self.reject(ChatError::NoUnitSelected));
        };
        let question = question.trim();
        if question.is_empty() {
            return Err(self.reject(ChatError::EmptyQuestion));
        }

        // A previous ask future was dropped mid-stream
        if self.controller.is_streaming() {
            self.controller
                .finalize(&mut self.store, StreamOutcome::Cancelled, &mut ());
        }

        let active = self.store.active_id().cloned();
        if let Some(session_id) = &active {
            if self.store.find_streaming(session_id).is_some() {
                return Err(self.reject(ChatError::StreamInProgress));
            }
        }

        let session_id = match active {
            Some(session_id) => session_id,
            None => self
                .store
                .create_session(unit.unit_id, &unit.unit_name, &unit.course_path)?,
        };

        self.store
            .add_message(&session_id, ChatMessage::user(question))?;
        let answer = ChatMessage::streaming_assistant();
        let message_id = answer.id.clone();
        self.store.add_message(&session_id, answer)?;
        self.controller.begin(&session_id, &message_id)?;

        let request = AskRequest {
            unit_id: unit.unit_id,
            question: question.to_string(),
        };
        let mut subscription = subscribe_with_token(
            self.source.clone(),
            request,
            self.verbose,
            self.abort.child_token(),
        );
        let outcome = self
            .controller
            .run(&mut self.store, &mut subscription, observer)
            .await?;

        match &outcome {
            StreamOutcome::Failed(reason) => {
                log::error!("Failed to get answer: {}", reason);
                self.notices.push(Notice::error("Failed to get answer"));
            }
            StreamOutcome::Cancelled => self.notices.push(Notice::info("Answer stopped")),
            StreamOutcome::Completed | StreamOutcome::Ended => {}
        }

        if self.abort.is_cancelled() {
            self.abort = CancellationToken::new();
        }

        Ok(AskOutcome {
            session_id,
            message_id,
            outcome,
        })
    }
}

impl Drop for ChatClient {
    fn drop(&mut self) {
        self.abort.cancel();
    }
}
