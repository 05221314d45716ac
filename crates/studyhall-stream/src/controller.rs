use studyhall_store::{SessionStore, StoreError};
use studyhall_types::{ChatMessage, MessageId, MessagePatch, SessionId};

use crate::accumulator::TokenAccumulator;
use crate::error::StreamError;
use crate::frame::Frame;
use crate::subscription::{StreamEvent, Subscription};

/// How a stream ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The terminal `[DONE]` frame arrived
    Completed,
    /// The body closed without a terminal frame
    Ended,
    /// The request or the body failed; partial content is kept
    Failed(String),
    /// The stream was aborted by the client
    Cancelled,
}

impl StreamOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, StreamOutcome::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamPhase {
    Idle,
    Streaming {
        session_id: SessionId,
        message_id: MessageId,
    },
    Finalized(StreamOutcome),
}

/// Receives live updates while a stream is applied to the store
pub trait StreamObserver {
    fn on_open(&mut self) {}

    /// Called with the stored message after every applied patch
    fn on_update(&mut self, _message: &ChatMessage) {}

    /// Called exactly once per stream. `message` is `None` if the target
    /// message no longer exists.
    fn on_finalized(&mut self, _message: Option<&ChatMessage>, _outcome: &StreamOutcome) {}
}

impl StreamObserver for () {}

/// Drives one assistant message through `idle → streaming → finalized`
#[derive(Debug)]
pub struct StreamController {
    phase: StreamPhase,
    accumulator: TokenAccumulator,
}

impl Default for StreamController {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamController {
    pub fn new() -> Self {
        Self {
            phase: StreamPhase::Idle,
            accumulator: TokenAccumulator::new(),
        }
    }

    pub fn phase(&self) -> &StreamPhase {
        &self.phase
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self.phase, StreamPhase::Streaming { .. })
    }

    /// Text accumulated for the current or last stream
    pub fn content(&self) -> &str {
        self.accumulator.content()
    }

    /// Start streaming into `message_id`. Rejected while another stream is
    /// active so two streams never interleave into one message.
    pub fn begin(&mut self, session_id: &str, message_id: &str) -> Result<(), StreamError> {
        if let StreamPhase::Streaming { session_id, .. } = &self.phase {
            return Err(StreamError::AlreadyStreaming(session_id.clone()));
        }
        self.accumulator.reset();
        self.phase = StreamPhase::Streaming {
            session_id: session_id.to_string(),
            message_id: message_id.to_string(),
        };
        Ok(())
    }

    fn target(&self) -> Result<(SessionId, MessageId), StreamError> {
        match &self.phase {
            StreamPhase::Streaming {
                session_id,
                message_id,
            } => Ok((session_id.clone(), message_id.clone())),
            _ => Err(StreamError::NotStreaming),
        }
    }

    /// Apply one frame. Returns the outcome if the frame ends the stream.
    ///
    /// A missing target session or message is returned as an error; other
    /// store failures are logged and streaming continues.
    pub fn apply_frame(
        &mut self,
        store: &mut SessionStore,
        frame: &Frame,
        observer: &mut dyn StreamObserver,
    ) -> Result<Option<StreamOutcome>, StreamError> {
        let (session_id, message_id) = self.target()?;

        if *frame == Frame::Done {
            return Ok(Some(StreamOutcome::Completed));
        }
        if let Frame::Other(value) = frame {
            log::debug!("Ignoring unrecognized frame: {}", value);
        }

        let Some(patch) = self.accumulator.apply(frame) else {
            return Ok(None);
        };

        match store.update_message(&session_id, &message_id, &patch) {
            Ok(()) => {}
            Err(e @ (StoreError::SessionNotFound(_) | StoreError::MessageNotFound { .. })) => {
                return Err(e.into());
            }
            Err(e) => log::warn!("Failed to persist streamed update: {}", e),
        }

        if let Some(message) = store.message(&session_id, &message_id) {
            observer.on_update(message);
        }
        Ok(None)
    }

    /// Leave the streaming state and clear the message's streaming flag.
    /// Returns `false` (and changes nothing) if not currently streaming.
    pub fn finalize(
        &mut self,
        store: &mut SessionStore,
        outcome: StreamOutcome,
        observer: &mut dyn StreamObserver,
    ) -> bool {
        let (session_id, message_id) = match self.target() {
            Ok(target) => target,
            Err(_) => return false,
        };
        self.phase = StreamPhase::Finalized(outcome.clone());

        match store.update_message(&session_id, &message_id, &MessagePatch::finished()) {
            Ok(()) => {}
            Err(e @ (StoreError::SessionNotFound(_) | StoreError::MessageNotFound { .. })) => {
                log::debug!("Streamed message is gone at finalize: {}", e);
            }
            Err(e) => log::warn!("Failed to persist finalized message: {}", e),
        }

        observer.on_finalized(store.message(&session_id, &message_id), &outcome);
        true
    }

    /// Consume `subscription` until it ends, applying frames in wire order.
    /// The stream is stopped after `[DONE]` and when the target disappears.
    pub async fn run(
        &mut self,
        store: &mut SessionStore,
        subscription: &mut Subscription,
        observer: &mut dyn StreamObserver,
    ) -> Result<StreamOutcome, StreamError> {
        self.target()?;

        let outcome = loop {
            match subscription.next().await {
                Some(StreamEvent::Open) => observer.on_open(),
                Some(StreamEvent::Frame(frame)) => match self.apply_frame(store, &frame, observer) {
                    Ok(None) => {}
                    Ok(Some(outcome)) => break outcome,
                    Err(StreamError::Store(e)) => break StreamOutcome::Failed(e.to_string()),
                    Err(e) => return Err(e),
                },
                Some(StreamEvent::Error(message)) => break StreamOutcome::Failed(message),
                Some(StreamEvent::Closed) => break StreamOutcome::Ended,
                None if subscription.is_stopped() => break StreamOutcome::Cancelled,
                None => break StreamOutcome::Failed("answer stream stopped unexpectedly".to_string()),
            }
        };

        subscription.stop();
        self.finalize(store, outcome.clone(), observer);
        Ok(outcome)
    }
}
