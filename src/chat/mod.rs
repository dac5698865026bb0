//! Chat session model.
//!
//! - [`message`]: the records shown in a conversation
//! - [`state`]: the per-session state machine (send guard, pagination, chips)
//! - [`screen`]: what the chat screen should show for a given state
//! - [`service`]: wires sessions to the backend binding

pub mod message;
pub mod screen;
pub mod service;
pub mod state;

pub use message::{
    AiResponse, ChatMessage, DataTable, FailureKind, FollowUpQuestion, MAX_FOLLOW_UPS,
    MessageBody, ResponsePart, TurnFailure,
};
pub use screen::ScreenModel;
pub use service::{ChatService, OlderPage, TurnOutcome};
pub use state::{ChatState, HistoryFetch, PendingTurn, SendRejected};
