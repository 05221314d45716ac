//! Core types and structures for studyhall
//!
//! This crate provides the data model shared by the store, the streaming
//! consumer, the API client and the CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod catalog;

pub use catalog::{CatalogNode, UnitSelection};

// ============================================================================
// Identifiers
// ============================================================================

/// Opaque session identifier. Older persisted data may carry non-uuid ids.
pub type SessionId = String;

/// Opaque message identifier.
pub type MessageId = String;

/// Generate a fresh opaque identifier
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn is_false(value: &bool) -> bool {
    !*value
}

// ============================================================================
// Message Types
// ============================================================================

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}


/// Provenance metadata attached to an assistant answer by the backend
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Citation {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub heading: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pages: Option<Vec<u32>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub file: Option<String>,
}

impl Citation {
    /// Human readable one-line label, e.g. `notes.pdf · Recursion · p. 3, 4`
    pub fn label(&self) -> String {
        let mut parts = Vec::new();
        if let Some(file) = &self.file {
            parts.push(file.clone());
        }
        if let Some(heading) = &self.heading {
            parts.push(heading.clone());
        }
        if let Some(pages) = self.pages.as_ref().filter(|p| !p.is_empty()) {
            let pages: Vec<String> = pages.iter().map(|p| p.to_string()).collect();
            parts.push(format!("p. {}", pages.join(", ")));
        }
        if parts.is_empty() {
            "unknown source".to_string()
        } else {
            parts.join(" · ")
        }
    }
}

/// A single turn in a chat session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: MessageId,
    #[serde(rename = "type")]
    pub role: Role,
    #[serde(default)]
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub saved: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_streaming: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Citation>>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
            saved: false,
            is_streaming: false,
            citations: None,
        }
    }

    /// Empty assistant message in streaming state, filled in as tokens arrive
    pub fn streaming_assistant() -> Self {
        Self {
            id: new_id(),
            role: Role::Assistant,
            content: String::new(),
            timestamp: Utc::now(),
            saved: false,
            is_streaming: true,
            citations: None,
        }
    }

    /// Apply a partial update field by field
    pub fn apply(&mut self, patch: &MessagePatch) {
        if let Some(content) = &patch.content {
            self.content = content.clone();
        }
        if let Some(is_streaming) = patch.is_streaming {
            self.is_streaming = is_streaming;
        }
        if let Some(saved) = patch.saved {
            self.saved = saved;
        }
        if let Some(citations) = &patch.citations {
            self.citations = Some(citations.clone());
        }
    }
}

/// Partial update of a [`ChatMessage`]; `None` fields are left untouched
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MessagePatch {
    pub content: Option<String>,
    pub is_streaming: Option<bool>,
    pub saved: Option<bool>,
    pub citations: Option<Vec<Citation>>,
}

impl MessagePatch {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn finished() -> Self {
        Self {
            is_streaming: Some(false),
            ..Self::default()
        }
    }

    pub fn saved(saved: bool) -> Self {
        Self {
            saved: Some(saved),
            ..Self::default()
        }
    }

    pub fn citations(citations: Vec<Citation>) -> Self {
        Self {
            citations: Some(citations),
            ..Self::default()
        }
    }
}

// ============================================================================
// Session Types
// ============================================================================

/// A conversation about one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: SessionId,
    pub unit_id: u64,
    pub unit_name: String,
    pub course_path: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    pub timestamp: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(unit_id: u64, unit_name: impl Into<String>, course_path: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            unit_id,
            unit_name: unit_name.into(),
            course_path: course_path.into(),
            messages: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn message(&self, message_id: &str) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == message_id)
    }

    pub fn message_mut(&mut self, message_id: &str) -> Option<&mut ChatMessage> {
        self.messages.iter_mut().find(|m| m.id == message_id)
    }

    /// The message currently receiving tokens, if any
    pub fn streaming_message(&self) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.is_streaming)
    }

    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}

// ============================================================================
// Request Types
// ============================================================================

/// Body of `POST /ask/stream`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskRequest {
    pub unit_id: u64,
    pub question: String,
}
