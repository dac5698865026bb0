//! What the chat screen shows for a given [`ChatState`].

use crate::chat::message::{ChatMessage, FollowUpQuestion, TurnFailure};
use crate::chat::state::ChatState;

/// Prompt shown when the conversation is empty.
pub const EMPTY_PROMPT: &str = "How can I help you today?";

/// Top-level screen decision.
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenModel {
    /// Initial history not loaded yet: full-screen skeleton.
    Skeleton,
    /// The conversation itself.
    Conversation(ConversationView),
}

/// Content of a loaded conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationView {
    /// Messages, oldest first.
    pub messages: Vec<ChatMessage>,
    /// What sits above the oldest loaded message.
    pub top: TopSlot,
    /// Turn being typed, if any.
    pub typing_turn: Option<u64>,
    pub follow_ups: Vec<FollowUpQuestion>,
}

impl ConversationView {
    /// The empty prompt shows only for an empty list.
    #[must_use]
    pub fn shows_prompt(&self) -> bool {
        self.messages.is_empty()
    }
}

/// The slot above the oldest message.
#[derive(Debug, Clone, PartialEq)]
pub enum TopSlot {
    /// Start of the conversation reached.
    Nothing,
    /// Older messages exist; revealing the sentinel fetches them.
    Sentinel,
    /// An older page is in flight.
    Loading,
    /// The last older-page fetch failed; clicking retries.
    Failed(TurnFailure),
}

impl TopSlot {
    /// Slot for the current pagination state.
    #[must_use]
    pub fn for_state(state: &ChatState) -> Self {
        if state.is_scroll_loading() {
            Self::Loading
        } else if !state.has_more() {
            Self::Nothing
        } else if let Some(err) = state.history_error() {
            Self::Failed(err.clone())
        } else {
            Self::Sentinel
        }
    }
}

impl ScreenModel {
    #[must_use]
    pub fn from_state(state: &ChatState) -> Self {
        if state.needs_initial_load() {
            return Self::Skeleton;
        }
        Self::Conversation(ConversationView {
            messages: state.messages().to_vec(),
            top: TopSlot::for_state(state),
            typing_turn: state.pending().map(|p| p.turn),
            follow_ups: state.follow_ups().to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{HistoryCursor, HistoryPage};
    use crate::chat::message::{AiResponse, FailureKind};

    fn conversation(model: ScreenModel) -> ConversationView {
        match model {
            ScreenModel::Conversation(view) => view,
            ScreenModel::Skeleton => panic!("expected a conversation"),
        }
    }

    #[test]
    fn empty_state_shows_prompt() {
        let state = ChatState::new(None, 10);
        let view = conversation(ScreenModel::from_state(&state));
        assert!(view.shows_prompt());
        assert_eq!(view.top, TopSlot::Nothing);
    }

    #[test]
    fn non_empty_state_never_shows_prompt() {
        let mut state = ChatState::new(None, 10);
        let turn = state.begin_send("hello").unwrap().turn;

        let view = conversation(ScreenModel::from_state(&state));
        assert!(!view.shows_prompt());
        assert_eq!(view.typing_turn, Some(turn));
    }

    #[test]
    fn skeleton_until_initial_history_arrives() {
        let mut state = ChatState::new(Some("c".to_string()), 10);
        assert_eq!(ScreenModel::from_state(&state), ScreenModel::Skeleton);

        state.begin_initial_load().unwrap();
        assert_eq!(ScreenModel::from_state(&state), ScreenModel::Skeleton);

        state
            .complete_history_fetch(Ok(HistoryPage {
                messages: vec![ChatMessage::response("r", AiResponse::text("x"))],
                next_cursor: Some(HistoryCursor { skip: 1 }),
            }))
            .unwrap();
        let view = conversation(ScreenModel::from_state(&state));
        assert_eq!(view.top, TopSlot::Sentinel);
    }

    #[test]
    fn top_slot_tracks_older_fetches() {
        let mut state = ChatState::new(Some("c".to_string()), 1);
        state.begin_initial_load().unwrap();
        state
            .complete_history_fetch(Ok(HistoryPage {
                messages: vec![ChatMessage::response("r", AiResponse::text("x"))],
                next_cursor: Some(HistoryCursor { skip: 1 }),
            }))
            .unwrap();

        state.begin_older_fetch().unwrap();
        assert_eq!(TopSlot::for_state(&state), TopSlot::Loading);

        let failure = TurnFailure {
            kind: FailureKind::Timeout,
            message: "slow".to_string(),
        };
        let _ = state.complete_history_fetch(Err(failure.clone()));
        assert_eq!(TopSlot::for_state(&state), TopSlot::Failed(failure));
    }
}
