//! Streaming chat session control.
//!
//! One submission drives exactly one HTTP request through a small state
//! machine:
//!
//! ```text
//! idle ──▶ pending ──▶ streaming ──▶ completed
//!            │             ├───────▶ errored
//!            │             ├───────▶ timedOut
//!            ├─────────────┴───────▶ aborted
//!            └──▶ errored | timedOut
//! ```
//!
//! The controller owns the transcript and refuses overlapping submissions,
//! so at any moment at most one worker is applying streamed records. Records
//! within a stream are applied strictly in arrival order; a wall-clock
//! deadline covers the whole request plus stream, and cancellation stops the
//! worker before it applies anything further.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tracing::debug;

use crate::api::ApiClient;
use crate::decode::{DecodeStats, StreamDecoder};
use crate::error::ChatError;
use crate::models::ChatRequest;
use crate::render::TokenSink;
use crate::transcript::{ChatTurn, Transcript};

/// Lifecycle of one chat submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Request sent, headers not yet received.
    Pending,
    /// Body being consumed.
    Streaming,
    Completed,
    Errored,
    TimedOut,
    Aborted,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Pending | SessionStatus::Streaming)
    }
}

/// Outcome of a finished session.
#[derive(Debug)]
pub struct SessionReport {
    pub status: SessionStatus,
    pub error: Option<ChatError>,
    /// Records decoded from the stream.
    pub records: u64,
    /// Malformed lines skipped while decoding.
    pub warnings: u64,
}

/// Result of a submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// A session was started for this prompt.
    Started,
    /// Another session is still pending or streaming; nothing happened.
    Busy,
    /// The prompt was empty or whitespace-only; nothing happened.
    EmptyPrompt,
}

/// Per-session tuning, resolved once before a conversation starts.
#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub model: String,
    pub collection: Option<String>,
    /// Wall-clock bound over the whole request + stream.
    pub stream_timeout: Duration,
}

struct ActiveSession {
    cancel_tx: mpsc::Sender<()>,
    handle: JoinHandle<SessionReport>,
}

/// Cancels an in-flight session. Safe to trigger from another task.
#[derive(Clone)]
pub struct CancelHandle {
    tx: mpsc::Sender<()>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        // A full channel already holds a pending cancel.
        let _ = self.tx.try_send(());
    }
}

/// Drives chat sessions and owns the conversation transcript.
///
/// The transcript sits behind a mutex only so the worker task can reach it;
/// the one-active-session rule keeps that mutex uncontended.
pub struct ChatController {
    api: ApiClient,
    options: ChatOptions,
    transcript: Arc<Mutex<Transcript>>,
    sink: Arc<dyn TokenSink>,
    active: Option<ActiveSession>,
}

impl ChatController {
    pub fn new(api: ApiClient, options: ChatOptions, sink: Arc<dyn TokenSink>) -> Self {
        Self {
            api,
            options,
            transcript: Arc::new(Mutex::new(Transcript::new())),
            sink,
            active: None,
        }
    }

    pub fn options(&self) -> &ChatOptions {
        &self.options
    }

    /// Whether a session is currently pending or streaming.
    pub fn is_busy(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.handle.is_finished())
    }

    /// Submit one prompt. The user turn is appended synchronously, before
    /// any network activity, so the transcript reflects input immediately.
    ///
    /// Rejected (without touching the transcript) while a session is active
    /// or when the prompt is blank.
    pub fn submit(&mut self, prompt: &str) -> Submission {
        if let Some(active) = &self.active {
            if !active.handle.is_finished() {
                debug!("submission rejected: a session is already active");
                return Submission::Busy;
            }
            // Finished but never awaited; its report is gone.
            self.active = None;
        }
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Submission::EmptyPrompt;
        }

        lock(&self.transcript).push_user_turn(prompt);

        let request = ChatRequest {
            model: self.options.model.clone(),
            prompt: prompt.to_string(),
            collection_name: self.options.collection.clone(),
        };
        let (cancel_tx, cancel_rx) = mpsc::channel(1);
        let handle = tokio::spawn(run_session(
            self.api.clone(),
            request,
            self.options.stream_timeout,
            Arc::clone(&self.transcript),
            Arc::clone(&self.sink),
            cancel_rx,
        ));
        self.active = Some(ActiveSession { cancel_tx, handle });
        Submission::Started
    }

    /// Wait for the active session to reach a terminal state.
    pub async fn wait(&mut self) -> Option<SessionReport> {
        self.wait_or_cancel(std::future::pending()).await
    }

    /// Wait for the active session, aborting it if `cancel` resolves first.
    pub async fn wait_or_cancel(&mut self, cancel: impl Future<Output = ()>) -> Option<SessionReport> {
        let ActiveSession {
            cancel_tx,
            mut handle,
        } = self.active.take()?;
        tokio::pin!(cancel);
        let report = tokio::select! {
            joined = &mut handle => join_report(joined),
            _ = &mut cancel => {
                let _ = cancel_tx.try_send(());
                join_report(handle.await)
            }
        };
        Some(report)
    }

    /// Abort the active session and wait for it to wind down.
    pub async fn abort(&mut self) -> Option<SessionReport> {
        let ActiveSession { cancel_tx, handle } = self.active.take()?;
        let _ = cancel_tx.try_send(());
        Some(join_report(handle.await))
    }

    /// Handle for cancelling the active session from another task.
    pub fn cancel_handle(&self) -> Option<CancelHandle> {
        self.active.as_ref().map(|active| CancelHandle {
            tx: active.cancel_tx.clone(),
        })
    }

    /// Snapshot of the conversation so far.
    pub fn transcript(&self) -> Vec<ChatTurn> {
        lock(&self.transcript).turns().to_vec()
    }
}

fn join_report(joined: Result<SessionReport, JoinError>) -> SessionReport {
    match joined {
        Ok(report) => report,
        Err(err) => {
            tracing::error!(%err, "chat session task failed");
            SessionReport {
                status: SessionStatus::Errored,
                error: None,
                records: 0,
                warnings: 0,
            }
        }
    }
}

/// A poisoned lock means a worker panicked mid-write; the current contents
/// are still used.
fn lock(transcript: &Mutex<Transcript>) -> MutexGuard<'_, Transcript> {
    transcript
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One request, driven to a terminal state.
async fn run_session(
    api: ApiClient,
    request: ChatRequest,
    timeout: Duration,
    transcript: Arc<Mutex<Transcript>>,
    sink: Arc<dyn TokenSink>,
    mut cancel_rx: mpsc::Receiver<()>,
) -> SessionReport {
    let deadline = Instant::now() + timeout;
    debug!(model = %request.model, "chat session pending");

    // Request out, wait for headers. Cancellation wins over a ready chunk
    // so an abort never applies more output.
    let response = tokio::select! {
        biased;
        _ = cancel_rx.recv() => {
            return settle(SessionStatus::Aborted, Some(ChatError::Cancelled), DecodeStats::default(), &transcript, &sink);
        }
        _ = tokio::time::sleep_until(deadline) => {
            return settle(SessionStatus::TimedOut, Some(ChatError::TimedOut { timeout }), DecodeStats::default(), &transcript, &sink);
        }
        result = api.open_chat_stream(&request, timeout) => match result {
            Ok(response) => response,
            Err(err) => {
                return settle(SessionStatus::Errored, Some(err), DecodeStats::default(), &transcript, &sink);
            }
        },
    };

    // Non-success: terminate without reading the body; no model turn is
    // created.
    if !response.status().is_success() {
        let err = ChatError::HttpStatus {
            status: response.status(),
        };
        return settle(
            SessionStatus::Errored,
            Some(err),
            DecodeStats::default(),
            &transcript,
            &sink,
        );
    }

    lock(&transcript).begin_model_turn();
    debug!("chat session streaming");

    let mut stream = response.bytes_stream();
    let mut decoder = StreamDecoder::new();

    let (status, error) = loop {
        tokio::select! {
            biased;
            _ = cancel_rx.recv() => {
                break (SessionStatus::Aborted, Some(ChatError::Cancelled));
            }
            _ = tokio::time::sleep_until(deadline) => {
                break (SessionStatus::TimedOut, Some(ChatError::TimedOut { timeout }));
            }
            chunk = stream.next() => match chunk {
                Some(Ok(bytes)) => {
                    // Decode-and-apply for this chunk's complete lines runs
                    // without suspension, in arrival order.
                    for record in decoder.feed(&bytes) {
                        if let Some(token) = record.response {
                            lock(&transcript).append_model_text(&token);
                            sink.token(&token);
                        }
                    }
                }
                Some(Err(source)) => {
                    break (SessionStatus::Errored, Some(ChatError::StreamRead { source }));
                }
                None => break (SessionStatus::Completed, None),
            },
        }
    };

    let stats = if status == SessionStatus::Completed {
        decoder.end()
    } else {
        decoder.stats()
    };
    settle(status, error, stats, &transcript, &sink)
}

/// Terminal bookkeeping shared by every exit path. Resolves the open model
/// turn exactly once, tells the sink the stream ended, and builds the
/// report.
fn settle(
    status: SessionStatus,
    error: Option<ChatError>,
    stats: DecodeStats,
    transcript: &Arc<Mutex<Transcript>>,
    sink: &Arc<dyn TokenSink>,
) -> SessionReport {
    let message = error.as_ref().and_then(ChatError::user_message);
    {
        let mut guard = lock(transcript);
        if guard.is_model_turn_open() {
            match status {
                SessionStatus::TimedOut => {
                    guard.fail_model_turn(
                        message.as_deref().unwrap_or("Request timed out. Please try again."),
                    );
                }
                SessionStatus::Errored => {
                    // Partial progress is kept; only a still-empty turn is
                    // replaced by the failure message.
                    let still_empty = guard.open_model_text() == Some("");
                    match message.as_deref() {
                        Some(msg) if still_empty => guard.fail_model_turn(msg),
                        _ => guard.close_model_turn(),
                    }
                }
                _ => guard.close_model_turn(),
            }
        }
    }
    sink.finished();
    debug!(
        ?status,
        records = stats.records,
        warnings = stats.warnings,
        "chat session finished"
    );
    SessionReport {
        status,
        error,
        records: stats.records,
        warnings: stats.warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::NullTokens;
    use crate::transcript::Role;

    fn make_controller(base_url: &str) -> ChatController {
        let api = ApiClient::new(base_url, Duration::from_secs(2)).unwrap();
        let options = ChatOptions {
            model: "llama3:latest".to_string(),
            collection: None,
            stream_timeout: Duration::from_secs(2),
        };
        ChatController::new(api, options, Arc::new(NullTokens))
    }

    /// An address nothing listens on.
    fn dead_endpoint() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}/api/v1")
    }

    #[tokio::test]
    async fn test_empty_prompt_is_rejected_without_a_turn() {
        let mut controller = make_controller("http://localhost:8000/api/v1");
        assert_eq!(controller.submit(""), Submission::EmptyPrompt);
        assert_eq!(controller.submit("   \t "), Submission::EmptyPrompt);
        assert!(controller.transcript().is_empty());
        assert!(!controller.is_busy());
    }

    #[tokio::test]
    async fn test_user_turn_appears_before_the_network_resolves() {
        let mut controller = make_controller(&dead_endpoint());
        assert_eq!(controller.submit("hi"), Submission::Started);
        // Synchronous append: visible before wait().
        let turns = controller.transcript();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].text, "hi");
        controller.wait().await;
    }

    #[tokio::test]
    async fn test_connection_failure_creates_no_model_turn() {
        let mut controller = make_controller(&dead_endpoint());
        assert_eq!(controller.submit("hi"), Submission::Started);
        let report = controller.wait().await.unwrap();

        assert_eq!(report.status, SessionStatus::Errored);
        assert!(matches!(report.error, Some(ChatError::Network { .. })));
        let turns = controller.transcript();
        assert_eq!(turns.len(), 1, "only the user turn: {turns:?}");
        assert!(!controller.is_busy());
    }

    #[tokio::test]
    async fn test_wait_without_session() {
        let mut controller = make_controller("http://localhost:8000/api/v1");
        assert!(controller.wait().await.is_none());
        assert!(controller.abort().await.is_none());
        assert!(controller.cancel_handle().is_none());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!SessionStatus::Pending.is_terminal());
        assert!(!SessionStatus::Streaming.is_terminal());
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Aborted.is_terminal());
        assert!(SessionStatus::TimedOut.is_terminal());
        assert!(SessionStatus::Errored.is_terminal());
    }
}
