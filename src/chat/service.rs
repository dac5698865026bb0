//! Session container: connects chat sessions to the backend binding.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{ApiError, HistoryRequest, PandasAiApi, QueryRequest};
use crate::chat::message::{ChatMessage, FailureKind, FollowUpQuestion, TurnFailure};
use crate::chat::screen::{ScreenModel, TopSlot};
use crate::chat::state::{ChatState, PendingTurn, SendRejected};
use crate::session::{Session, SessionStore};

/// Default upper bound for a whole turn, retries included.
pub const DEFAULT_TURN_DEADLINE: Duration = Duration::from_secs(90);

/// A finished turn, ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// The AI bubble for the turn (answer or failure).
    pub message: ChatMessage,
    /// Chips to show now. Empty after a failure or if a newer turn started.
    pub follow_ups: Vec<FollowUpQuestion>,
}

/// Result of asking for an older page.
#[derive(Debug, Clone, PartialEq)]
pub enum OlderPage {
    /// Another request is running the fetch.
    Unavailable,
    /// Messages to prepend (possibly none) and the new top slot.
    Page {
        messages: Vec<ChatMessage>,
        top: TopSlot,
    },
}

/// Owns the sessions and drives their backend calls.
pub struct ChatService {
    api: Arc<dyn PandasAiApi>,
    sessions: SessionStore,
    turn_deadline: Duration,
}

impl std::fmt::Debug for ChatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatService")
            .field("sessions", &self.sessions.len())
            .field("turn_deadline", &self.turn_deadline)
            .finish_non_exhaustive()
    }
}

impl ChatService {
    pub fn new(api: Arc<dyn PandasAiApi>, sessions: SessionStore) -> Self {
        Self {
            api,
            sessions,
            turn_deadline: DEFAULT_TURN_DEADLINE,
        }
    }

    /// Bound every turn, retries included, by `deadline`.
    #[must_use]
    pub fn with_turn_deadline(mut self, deadline: Duration) -> Self {
        self.turn_deadline = deadline;
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Start a session for a page load.
    pub fn open(&self, conversation_id: Option<String>) -> Session {
        let session = self.sessions.create(conversation_id);
        info!(
            name: "chat.session.opened",
            session_id = %session.id(),
            conversation_id = ?session.read(|s| s.conversation_id().map(str::to_owned)),
            "Chat session opened"
        );
        session
    }

    /// Look up a live session.
    pub fn session(&self, id: &str) -> Option<Session> {
        self.sessions.get(id)
    }

    /// Replace `old` with a fresh session on a new conversation.
    pub fn start_new_conversation(&self, old: &Session) -> Session {
        self.sessions.remove(old.id());
        debug!(name: "chat.session.closed", session_id = %old.id(), "Chat session replaced");
        self.open(None)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Sending
    // ─────────────────────────────────────────────────────────────────────

    /// Accept typed text and start the backend call in the background.
    pub fn submit(&self, session: &Session, text: &str) -> Result<PendingTurn, SendRejected> {
        let pending = session.update(|state| state.begin_send(text));
        self.accept(session, pending)
    }

    /// Send an on-screen follow-up chip.
    pub fn select_follow_up(
        &self,
        session: &Session,
        follow_up_id: &str,
    ) -> Result<PendingTurn, SendRejected> {
        let pending = session.update(|state| state.select_follow_up(follow_up_id));
        self.accept(session, pending)
    }

    fn accept(
        &self,
        session: &Session,
        pending: Result<PendingTurn, SendRejected>,
    ) -> Result<PendingTurn, SendRejected> {
        match &pending {
            Ok(turn) => {
                info!(
                    name: "chat.turn.started",
                    session_id = %session.id(),
                    turn = turn.turn,
                    query_length = turn.query.len(),
                    "Query accepted"
                );
                self.dispatch(session.clone(), turn.clone());
            }
            Err(reason) => {
                debug!(
                    name: "chat.turn.rejected",
                    session_id = %session.id(),
                    reason = ?reason,
                    "Query not accepted"
                );
            }
        }
        pending
    }

    fn dispatch(&self, session: Session, pending: PendingTurn) -> JoinHandle<()> {
        let api = Arc::clone(&self.api);
        let deadline = self.turn_deadline;

        tokio::spawn(async move {
            let request = QueryRequest {
                conversation_id: pending.conversation_id.clone(),
                query: pending.query.clone(),
            };
            let started = Instant::now();
            let outcome = tokio::time::timeout(deadline, api.send_query(&request))
                .await
                .unwrap_or(Err(ApiError::Timeout));
            let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

            match &outcome {
                Ok(reply) => info!(
                    name: "chat.turn.completed",
                    session_id = %session.id(),
                    turn = pending.turn,
                    elapsed_ms,
                    parts = reply.response.parts.len(),
                    follow_ups = reply.follow_ups.len(),
                    "Turn answered"
                ),
                Err(err) => warn!(
                    name: "chat.turn.failed",
                    session_id = %session.id(),
                    turn = pending.turn,
                    elapsed_ms,
                    kind = ?err.kind(),
                    error = %err,
                    "Turn failed"
                ),
            }

            session.update(|state| {
                state.complete_send(pending.turn, outcome.map_err(|e| e.to_failure()));
            });
            session.mark_turn_complete(pending.turn);
        })
    }

    /// Wait for `turn` to finish. `None` if the session never accepted it.
    pub async fn await_turn(&self, session: &Session, turn: u64) -> Option<TurnOutcome> {
        if turn == 0 || turn > session.read(ChatState::last_turn) {
            return None;
        }
        session.wait_for_turn(turn).await;
        session.read(|state| {
            let message = state.reply_for_turn(turn)?.clone();
            let latest = state.last_turn() == turn && !state.is_typing();
            Some(TurnOutcome {
                message,
                follow_ups: if latest {
                    state.follow_ups().to_vec()
                } else {
                    Vec::new()
                },
            })
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // History
    // ─────────────────────────────────────────────────────────────────────

    /// Run the initial history fetch if it is still pending, then describe
    /// the screen.
    pub async fn load_initial(&self, session: &Session) -> ScreenModel {
        if let Some(request) = session.update(ChatState::begin_initial_load) {
            self.run_history_fetch(session, request, "initial", |_, _| ())
                .await;
        }
        // The screen carries every message, older pages included.
        session.update(|state| {
            state.take_undelivered_older();
            ScreenModel::from_state(state)
        })
    }

    /// Fetch the next older page. Re-entrant calls while one is running get
    /// [`OlderPage::Unavailable`]. Otherwise the page carries any older
    /// messages an abandoned request recorded but never returned.
    pub async fn load_older(&self, session: &Session) -> OlderPage {
        let Some(request) = session.update(ChatState::begin_older_fetch) else {
            return session.update(|state| {
                if state.fetch_in_flight().is_some() {
                    OlderPage::Unavailable
                } else {
                    undelivered_page(state)
                }
            });
        };
        let page = self
            .run_history_fetch(session, request, "older", |state, _| {
                undelivered_page(state)
            })
            .await;
        page.unwrap_or_else(|| session.update(undelivered_page))
    }

    /// Fetch and record a history page in its own task, so the in-flight
    /// flag is cleared even when the caller is dropped mid-fetch.
    async fn run_history_fetch<R, F>(
        &self,
        session: &Session,
        request: HistoryRequest,
        page: &'static str,
        finish: F,
    ) -> Option<R>
    where
        F: FnOnce(&mut ChatState, Result<usize, TurnFailure>) -> R + Send + 'static,
        R: Send + 'static,
    {
        let api = Arc::clone(&self.api);
        let task_session = session.clone();
        let task = tokio::spawn(async move {
            let outcome = api.fetch_history(&request).await;
            task_session.update(|state| {
                let result = state.complete_history_fetch(outcome.map_err(|e| e.to_failure()));
                log_history(&task_session, page, &result);
                finish(state, result)
            })
        });

        match task.await {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(
                    name: "chat.history.aborted",
                    session_id = %session.id(),
                    page,
                    error = %err,
                    "History fetch task ended abnormally"
                );
                // No-op if the task recorded its outcome before failing.
                let _ = session.update(|state| {
                    state.complete_history_fetch(Err(TurnFailure {
                        kind: FailureKind::InvalidResponse,
                        message: "the history request was interrupted".to_string(),
                    }))
                });
                None
            }
        }
    }

    /// Periodically drop sessions idle longer than `idle_timeout`.
    pub fn spawn_sweeper(&self, idle_timeout: Duration, every: Duration) -> JoinHandle<()> {
        let sessions = self.sessions.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = sessions.cleanup_expired_with_timeout(idle_timeout);
                if removed > 0 {
                    info!(
                        name: "chat.session.swept",
                        removed,
                        remaining = sessions.len(),
                        "Idle chat sessions removed"
                    );
                }
            }
        })
    }
}

fn undelivered_page(state: &mut ChatState) -> OlderPage {
    OlderPage::Page {
        messages: state.take_undelivered_older(),
        top: TopSlot::for_state(state),
    }
}

fn log_history(session: &Session, page: &'static str, result: &Result<usize, TurnFailure>) {
    match result {
        Ok(added) => debug!(
            name: "chat.history.loaded",
            session_id = %session.id(),
            page,
            added,
            "History page loaded"
        ),
        Err(failure) => warn!(
            name: "chat.history.failed",
            session_id = %session.id(),
            page,
            kind = ?failure.kind,
            error = %failure.message,
            "History page failed"
        ),
    }
}
