use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use studyhall_logging::log_stream_chunk;
use studyhall_types::AskRequest;

use crate::frame::{Frame, FrameParser};
use crate::source::AnswerSource;

const EVENT_BUFFER: usize = 64;

/// Lifecycle events of one answer stream, in wire order
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// The request was accepted and the body is being read
    Open,
    Frame(Frame),
    /// Opening the request or reading the body failed; no further events
    Error(String),
    /// The body ended normally; no further events
    Closed,
}

/// Cloneable handle that stops a [`Subscription`] from anywhere
#[derive(Debug, Clone)]
pub struct AbortHandle(CancellationToken);

impl AbortHandle {
    pub fn abort(&self) {
        self.0.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.0.is_cancelled()
    }
}

impl From<CancellationToken> for AbortHandle {
    fn from(token: CancellationToken) -> Self {
        Self(token)
    }
}

/// A running answer stream.
///
/// The network body is owned by a background task that forwards parsed
/// frames over a channel. Stopping or dropping the subscription cancels the
/// task and closes the body.
pub struct Subscription {
    events: mpsc::Receiver<StreamEvent>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Open `source` for `request` and start reading on a background task
pub fn subscribe(source: Arc<dyn AnswerSource>, request: AskRequest, verbose: bool) -> Subscription {
    subscribe_with_token(source, request, verbose, CancellationToken::new())
}

/// Like [`subscribe`], cancelled when `cancel` is
pub fn subscribe_with_token(
    source: Arc<dyn AnswerSource>,
    request: AskRequest,
    verbose: bool,
    cancel: CancellationToken,
) -> Subscription {
    let (tx, events) = mpsc::channel(EVENT_BUFFER);
    let task = tokio::spawn(read_stream(source, request, verbose, tx, cancel.clone()));
    Subscription { events, cancel, task }
}

async fn read_stream(
    source: Arc<dyn AnswerSource>,
    request: AskRequest,
    verbose: bool,
    tx: mpsc::Sender<StreamEvent>,
    cancel: CancellationToken,
) {
    let opened = tokio::select! {
        _ = cancel.cancelled() => return,
        opened = source.open(&request) => opened,
    };

    let mut body = match opened {
        Ok(body) => body,
        Err(e) => {
            let _ = tx.send(StreamEvent::Error(format!("{:#}", e))).await;
            return;
        }
    };

    if tx.send(StreamEvent::Open).await.is_err() {
        return;
    }

    let mut parser = FrameParser::new();
    let mut chunk_counter = 0;

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return,
            next = body.next() => next,
        };

        let (frames, terminal) = match next {
            Some(Ok(bytes)) => {
                chunk_counter += 1;
                log_stream_chunk(chunk_counter, &String::from_utf8_lossy(&bytes), verbose);
                (parser.push(&bytes), None)
            }
            Some(Err(e)) => (Vec::new(), Some(StreamEvent::Error(format!("{:#}", e)))),
            None => (parser.finish(), Some(StreamEvent::Closed)),
        };

        for frame in frames {
            if tx.send(StreamEvent::Frame(frame)).await.is_err() {
                return;
            }
        }

        if let Some(event) = terminal {
            let _ = tx.send(event).await;
            return;
        }
    }
}

impl Subscription {
    /// Next event, or `None` once the stream is finished or stopped.
    /// After [`Subscription::stop`] no buffered events are returned.
    pub async fn next(&mut self) -> Option<StreamEvent> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            event = self.events.recv() => event,
        }
    }

    /// Abort the underlying request
    pub fn stop(&mut self) {
        self.cancel.cancel();
        self.events.close();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle(self.cancel.clone())
    }

    /// Whether the reader task has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
