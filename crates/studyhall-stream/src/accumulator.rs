use studyhall_types::{Citation, MessagePatch};

use crate::frame::Frame;

/// Running answer text for one assistant message.
///
/// Tokens are appended in delivery order. Repeated frames are not
/// deduplicated; the transport is trusted to deliver each frame once.
#[derive(Debug, Default)]
pub struct TokenAccumulator {
    content: String,
    citations: Option<Vec<Citation>>,
}

impl TokenAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a frame into the running state and return the patch to publish
    pub fn apply(&mut self, frame: &Frame) -> Option<MessagePatch> {
        match frame {
            Frame::Token { text, citations } => {
                if text.is_empty() && citations.is_none() {
                    return None;
                }
                self.content.push_str(text);
                let mut patch = MessagePatch::content(self.content.clone());
                if let Some(citations) = citations {
                    self.citations = Some(citations.clone());
                    patch.citations = Some(citations.clone());
                }
                Some(patch)
            }
            // Citations arrive as a full snapshot
            Frame::Citations(citations) => {
                self.citations = Some(citations.clone());
                Some(MessagePatch::citations(citations.clone()))
            }
            Frame::Done | Frame::Other(_) => None,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn citations(&self) -> Option<&[Citation]> {
        self.citations.as_deref()
    }

    pub fn reset(&mut self) {
        self.content.clear();
        self.citations = None;
    }
}
