use studyhall_types::{ChatMessage, ChatSession, MessagePatch, SessionId};

use crate::error::{StoreError, StoreResult};
use crate::storage::Storage;

/// Key under which the session list is persisted
pub const SESSIONS_KEY: &str = "chatSessions";

/// Owns the session list and its persistence.
///
/// All mutations are synchronous and are written to storage before they
/// return. `update_message` and `add_message` against a missing session or
/// message return an error instead of silently doing nothing.
///
/// If the save fails, `create_session`, `add_message` and `delete_session`
/// are undone in memory. A failed `update_message` keeps the change in
/// memory; the next successful save writes it.
pub struct SessionStore {
    storage: Box<dyn Storage>,
    sessions: Vec<ChatSession>,
    active: Option<SessionId>,
}

impl SessionStore {
    /// Load sessions from storage.
    ///
    /// Unreadable JSON is logged and the store starts empty; the unreadable
    /// payload is kept under `chatSessions.corrupt`. Messages left in
    /// streaming state by an interrupted process are finalized.
    pub fn open(storage: impl Storage + 'static) -> StoreResult<Self> {
        let storage: Box<dyn Storage> = Box::new(storage);
        let mut sessions = match storage.load(SESSIONS_KEY)? {
            Some(raw) => match serde_json::from_str::<Vec<ChatSession>>(&raw) {
                Ok(sessions) => sessions,
                Err(e) => {
                    log::error!("Error parsing saved chat sessions: {}", e);
                    storage.save(&format!("{}.corrupt", SESSIONS_KEY), &raw)?;
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let repaired = finalize_stale_streams(&mut sessions);

        let store = Self {
            storage,
            sessions,
            active: None,
        };
        if repaired > 0 {
            log::warn!("Finalized {} message(s) left streaming by a previous run", repaired);
            store.persist()?;
        }
        Ok(store)
    }

    fn persist(&self) -> StoreResult<()> {
        let json = serde_json::to_string(&self.sessions)?;
        self.storage.save(SESSIONS_KEY, &json)
    }

    /// Sessions, newest first
    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn session(&self, session_id: &str) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| s.id == session_id)
    }

    fn session_mut(&mut self, session_id: &str) -> StoreResult<&mut ChatSession> {
        self.sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| StoreError::SessionNotFound(session_id.to_string()))
    }

    pub fn message(&self, session_id: &str, message_id: &str) -> Option<&ChatMessage> {
        self.session(session_id)?.message(message_id)
    }

    /// The message currently streaming in `session_id`, if any
    pub fn find_streaming(&self, session_id: &str) -> Option<&ChatMessage> {
        self.session(session_id)?.streaming_message()
    }

    pub fn active_id(&self) -> Option<&SessionId> {
        self.active.as_ref()
    }

    pub fn active_session(&self) -> Option<&ChatSession> {
        self.active.as_deref().and_then(|id| self.session(id))
    }

    /// Make `session_id` the active session
    pub fn select(&mut self, session_id: &str) -> StoreResult<()> {
        if self.session(session_id).is_none() {
            return Err(StoreError::SessionNotFound(session_id.to_string()));
        }
        self.active = Some(session_id.to_string());
        Ok(())
    }

    pub fn clear_active(&mut self) {
        self.active = None;
    }

    /// Create a session for a unit; it is placed first and becomes active
    pub fn create_session(
        &mut self,
        unit_id: u64,
        unit_name: &str,
        course_path: &str,
    ) -> StoreResult<SessionId> {
        let session = ChatSession::new(unit_id, unit_name, course_path);
        let id = session.id.clone();
        self.sessions.insert(0, session);
        if let Err(e) = self.persist() {
            self.sessions.remove(0);
            return Err(e);
        }
        self.active = Some(id.clone());
        Ok(id)
    }

    /// Append a message to a session
    pub fn add_message(&mut self, session_id: &str, message: ChatMessage) -> StoreResult<()> {
        let session = self.session_mut(session_id)?;
        if message.is_streaming && session.streaming_message().is_some() {
            return Err(StoreError::StreamInProgress(session_id.to_string()));
        }
        session.messages.push(message);
        if let Err(e) = self.persist() {
            if let Ok(session) = self.session_mut(session_id) {
                session.messages.pop();
            }
            return Err(e);
        }
        Ok(())
    }

    /// Apply a partial update to one message
    pub fn update_message(
        &mut self,
        session_id: &str,
        message_id: &str,
        patch: &MessagePatch,
    ) -> StoreResult<()> {
        let session = self.session_mut(session_id)?;

        if patch.is_streaming == Some(true)
            && session
                .streaming_message()
                .map_or(false, |m| m.id != message_id)
        {
            return Err(StoreError::StreamInProgress(session_id.to_string()));
        }

        let message = session
            .message_mut(message_id)
            .ok_or_else(|| StoreError::MessageNotFound {
                session_id: session_id.to_string(),
                message_id: message_id.to_string(),
            })?;
        message.apply(patch);
        self.persist()
    }

    /// Flip the saved flag of a message and return the new value
    pub fn toggle_saved(&mut self, session_id: &str, message_id: &str) -> StoreResult<bool> {
        let saved = self
            .message(session_id, message_id)
            .map(|m| !m.saved)
            .ok_or_else(|| StoreError::MessageNotFound {
                session_id: session_id.to_string(),
                message_id: message_id.to_string(),
            })?;
        self.update_message(session_id, message_id, &MessagePatch::saved(saved))?;
        Ok(saved)
    }

    /// All saved messages paired with their session, newest session first
    pub fn saved_messages(&self) -> Vec<(&ChatSession, &ChatMessage)> {
        self.sessions
            .iter()
            .flat_map(|s| s.messages.iter().filter(|m| m.saved).map(move |m| (s, m)))
            .collect()
    }

    /// Remove a session. The active pointer is cleared only if it pointed
    /// at the deleted session.
    pub fn delete_session(&mut self, session_id: &str) -> StoreResult<()> {
        let index = self
            .sessions
            .iter()
            .position(|s| s.id == session_id)
            .ok_or_else(|| StoreError::SessionNotFound(session_id.to_string()))?;
        let removed = self.sessions.remove(index);
        if let Err(e) = self.persist() {
            self.sessions.insert(index, removed);
            return Err(e);
        }
        if self.active.as_deref() == Some(session_id) {
            self.active = None;
        }
        Ok(())
    }
}

fn finalize_stale_streams(sessions: &mut [ChatSession]) -> usize {
    let mut repaired = 0;
    for message in sessions.iter_mut().flat_map(|s| s.messages.iter_mut()) {
        if message.is_streaming {
            message.is_streaming = false;
            repaired += 1;
        }
    }
    repaired
}
