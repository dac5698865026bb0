//! Per-session chat state.
//!
//! [`ChatState`] is a plain state machine: every transition is a short
//! synchronous method, and the network calls happen between a `begin_*` and
//! the matching `complete_*`. Callers hold the session lock only for the
//! transition itself.

use std::collections::HashSet;

use uuid::Uuid;

use crate::api::{HistoryCursor, HistoryPage, HistoryRequest, QueryReply};
use crate::chat::message::{ChatMessage, FollowUpQuestion, MAX_FOLLOW_UPS, TurnFailure};

/// A query that has been accepted and is waiting for the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTurn {
    /// Monotonic turn number within the session, starting at 1.
    pub turn: u64,
    pub query: String,
    pub conversation_id: Option<String>,
    /// Id of the user message inserted for this turn.
    pub query_id: String,
    /// Id the AI message for this turn will carry.
    pub reply_id: String,
}

/// Why a send was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRejected {
    /// Nothing to send.
    Empty,
    /// A query is already in flight.
    InFlight,
    /// The initial history has not been loaded yet.
    Loading,
    /// The selected follow-up is not on screen.
    UnknownFollowUp,
}

/// Which history fetch is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryFetch {
    /// First page, shown behind the full-screen skeleton.
    Initial,
    /// An older page, shown behind the top loader.
    Older,
}

#[derive(Debug, Clone, Copy)]
struct InFlightFetch {
    kind: HistoryFetch,
    turns_added_at_start: usize,
}

#[derive(Debug)]
struct HistoryState {
    /// Next older page; `None` once the start of the conversation is loaded.
    next: Option<HistoryCursor>,
    initial_done: bool,
    in_flight: Option<InFlightFetch>,
    /// Turns this session added to an existing backend conversation.
    turns_added: usize,
    last_error: Option<TurnFailure>,
    /// Older messages at the front that no page response has carried yet.
    undelivered: usize,
}

/// The state of one chat session.
#[derive(Debug)]
pub struct ChatState {
    conversation_id: Option<String>,
    messages: Vec<ChatMessage>,
    follow_ups: Vec<FollowUpQuestion>,
    history: HistoryState,
    pending: Option<PendingTurn>,
    next_turn: u64,
    /// Reply message id of each completed turn, in turn order.
    replies: Vec<String>,
    page_size: usize,
}

impl ChatState {
    /// Fresh state. A conversation id means there is history to load.
    #[must_use]
    pub fn new(conversation_id: Option<String>, page_size: usize) -> Self {
        let has_history = conversation_id.is_some();
        Self {
            conversation_id,
            messages: Vec::new(),
            follow_ups: Vec::new(),
            history: HistoryState {
                next: has_history.then_some(HistoryCursor::START),
                initial_done: !has_history,
                in_flight: None,
                turns_added: 0,
                last_error: None,
                undelivered: 0,
            },
            pending: None,
            next_turn: 1,
            replies: Vec::new(),
            page_size: page_size.max(1),
        }
    }

    #[must_use]
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Messages, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[must_use]
    pub fn message(&self, id: &str) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    #[must_use]
    pub fn follow_ups(&self) -> &[FollowUpQuestion] {
        &self.follow_ups
    }

    #[must_use]
    pub fn pending(&self) -> Option<&PendingTurn> {
        self.pending.as_ref()
    }

    /// True exactly between an accepted send and its completion.
    #[must_use]
    pub fn is_typing(&self) -> bool {
        self.pending.is_some()
    }

    /// The initial history page still has to be fetched.
    #[must_use]
    pub fn needs_initial_load(&self) -> bool {
        !self.history.initial_done
    }

    /// The initial history page is being fetched.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.fetch_in_flight() == Some(HistoryFetch::Initial)
    }

    /// An older history page is being fetched.
    #[must_use]
    pub fn is_scroll_loading(&self) -> bool {
        self.fetch_in_flight() == Some(HistoryFetch::Older)
    }

    #[must_use]
    pub fn fetch_in_flight(&self) -> Option<HistoryFetch> {
        self.history.in_flight.map(|f| f.kind)
    }

    /// Older messages are available on the backend.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.history.initial_done && self.history.next.is_some()
    }

    /// The last history fetch failed.
    #[must_use]
    pub fn history_error(&self) -> Option<&TurnFailure> {
        self.history.last_error.as_ref()
    }

    /// Number of the most recently accepted turn (0 before the first send).
    #[must_use]
    pub fn last_turn(&self) -> u64 {
        self.next_turn - 1
    }

    /// The AI message that completed `turn`, once it has completed.
    #[must_use]
    pub fn reply_for_turn(&self, turn: u64) -> Option<&ChatMessage> {
        let index = usize::try_from(turn.checked_sub(1)?).ok()?;
        self.replies.get(index).and_then(|id| self.message(id))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Sending
    // ─────────────────────────────────────────────────────────────────────

    /// Accept a query: insert it optimistically, clear the chips and start
    /// typing.
    pub fn begin_send(&mut self, text: &str) -> Result<PendingTurn, SendRejected> {
        let query = text.trim();
        if query.is_empty() {
            return Err(SendRejected::Empty);
        }
        if self.pending.is_some() {
            return Err(SendRejected::InFlight);
        }
        if !self.history.initial_done {
            return Err(SendRejected::Loading);
        }

        let message = ChatMessage::query(query);
        let query_id = message.id.clone();
        self.messages.push(message);
        self.follow_ups.clear();

        let pending = PendingTurn {
            turn: self.next_turn,
            query: query.to_string(),
            conversation_id: self.conversation_id.clone(),
            query_id,
            reply_id: Uuid::new_v4().to_string(),
        };
        self.next_turn += 1;
        self.pending = Some(pending.clone());
        Ok(pending)
    }

    /// Send the text of an on-screen follow-up chip.
    pub fn select_follow_up(&mut self, id: &str) -> Result<PendingTurn, SendRejected> {
        if self.pending.is_some() {
            return Err(SendRejected::InFlight);
        }
        let question = self
            .follow_ups
            .iter()
            .find(|f| f.id == id)
            .map(|f| f.question.clone())
            .ok_or(SendRejected::UnknownFollowUp)?;
        self.begin_send(&question)
    }

    /// Record the outcome of a turn. Returns the AI message that was
    /// appended, or `None` when `turn` is not the pending one.
    pub fn complete_send(
        &mut self,
        turn: u64,
        outcome: Result<QueryReply, TurnFailure>,
    ) -> Option<&ChatMessage> {
        if self.pending.as_ref().map(|p| p.turn) != Some(turn) {
            return None;
        }
        let pending = self.pending.take()?;

        let message = match outcome {
            Ok(reply) => {
                let continued = pending.conversation_id.is_some();
                if let Some(id) = reply.conversation_id {
                    self.conversation_id = Some(id);
                } else if self.conversation_id.is_none() {
                    self.conversation_id = pending.conversation_id.clone();
                }
                if continued {
                    self.history.turns_added += 1;
                    if self.history.in_flight.is_none() {
                        if let Some(cursor) = self.history.next.as_mut() {
                            cursor.skip += 1;
                        }
                    }
                }

                let mut follow_ups = reply.follow_ups;
                follow_ups.truncate(MAX_FOLLOW_UPS);
                self.follow_ups = follow_ups;

                ChatMessage::response(pending.reply_id, reply.response)
            }
            Err(failure) => ChatMessage::failed(pending.reply_id, failure),
        };

        self.replies.push(message.id.clone());
        self.messages.push(message);
        self.messages.last()
    }

    // ─────────────────────────────────────────────────────────────────────
    // History
    // ─────────────────────────────────────────────────────────────────────

    /// Start the initial history fetch, if one is needed and none is running.
    pub fn begin_initial_load(&mut self) -> Option<HistoryRequest> {
        if self.history.initial_done {
            return None;
        }
        self.begin_fetch(HistoryFetch::Initial)
    }

    /// Start fetching the next older page, if there is one and no fetch is
    /// running.
    pub fn begin_older_fetch(&mut self) -> Option<HistoryRequest> {
        if !self.history.initial_done {
            return None;
        }
        self.begin_fetch(HistoryFetch::Older)
    }

    fn begin_fetch(&mut self, kind: HistoryFetch) -> Option<HistoryRequest> {
        if self.history.in_flight.is_some() {
            return None;
        }
        let conversation_id = self.conversation_id.clone()?;
        let cursor = self.history.next?;

        self.history.in_flight = Some(InFlightFetch {
            kind,
            turns_added_at_start: self.history.turns_added,
        });
        Some(HistoryRequest {
            conversation_id,
            cursor,
            limit: self.page_size,
        })
    }

    /// Older messages recorded since the last page went out, oldest first.
    /// Each message is handed out once.
    pub fn take_undelivered_older(&mut self) -> Vec<ChatMessage> {
        let count = std::mem::take(&mut self.history.undelivered).min(self.messages.len());
        self.messages[..count].to_vec()
    }

    /// Record the outcome of the running history fetch. Returns how many
    /// messages were prepended.
    pub fn complete_history_fetch(
        &mut self,
        outcome: Result<HistoryPage, TurnFailure>,
    ) -> Result<usize, TurnFailure> {
        let Some(fetch) = self.history.in_flight.take() else {
            return Ok(0);
        };
        let shift = self.history.turns_added - fetch.turns_added_at_start;

        match outcome {
            Ok(page) => {
                if fetch.kind == HistoryFetch::Initial {
                    self.history.initial_done = true;
                }
                self.history.last_error = None;
                self.history.next = page.next_cursor.map(|c| HistoryCursor {
                    skip: c.skip + shift,
                });

                let known: HashSet<&str> = self.messages.iter().map(|m| m.id.as_str()).collect();
                let older: Vec<ChatMessage> = page
                    .messages
                    .into_iter()
                    .filter(|m| !known.contains(m.id.as_str()))
                    .collect();
                let count = older.len();
                self.messages.splice(0..0, older);
                if fetch.kind == HistoryFetch::Older {
                    self.history.undelivered += count;
                }
                Ok(count)
            }
            Err(failure) => {
                if let Some(cursor) = self.history.next.as_mut() {
                    cursor.skip += shift;
                }
                if fetch.kind == HistoryFetch::Initial {
                    // Show the conversation as-is; scrolling up retries.
                    self.history.initial_done = true;
                }
                self.history.last_error = Some(failure.clone());
                Err(failure)
            }
        }
    }
}
