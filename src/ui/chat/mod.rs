//! Chat-specific layout components.
//!
//! Every fragment is addressed by a fixed element id so HTMX responses can
//! target it directly or swap it out-of-band.

mod follow_ups;
mod header;
mod input;
mod message_list;
mod screen;
mod shell;

pub use follow_ups::FollowUpChips;
pub use header::ChatHeader;
pub use input::ChatInput;
pub use message_list::{EmptyPrompt, MessageList, PendingTurn, TopSlotView, TopSlotViewProps};
pub use screen::ChatScreen;
pub use shell::ChatShell;

/// Element ids shared by components and handlers.
pub mod ids {
    pub const SHELL: &str = "chat-shell";
    pub const SCREEN: &str = "chat-screen";
    pub const LIST: &str = "message-list";
    pub const TOP: &str = "history-top";
    pub const PROMPT: &str = "empty-prompt";
    pub const CHIPS: &str = "follow-ups";
    pub const INPUT: &str = "chat-input";

    /// CSS selector for an id.
    #[must_use]
    pub fn selector(id: &str) -> String {
        format!("#{id}")
    }
}

/// Browser-facing URLs of one session.
pub mod urls {
    #[must_use]
    pub fn screen(session_id: &str) -> String {
        format!("/chat/{session_id}/screen")
    }

    #[must_use]
    pub fn messages(session_id: &str) -> String {
        format!("/chat/{session_id}/messages")
    }

    #[must_use]
    pub fn follow_up(session_id: &str, follow_up_id: &str) -> String {
        format!("/chat/{session_id}/follow-ups/{follow_up_id}")
    }

    #[must_use]
    pub fn turn(session_id: &str, turn: u64) -> String {
        format!("/chat/{session_id}/turns/{turn}")
    }

    #[must_use]
    pub fn history(session_id: &str) -> String {
        format!("/chat/{session_id}/history")
    }

    #[must_use]
    pub fn new_conversation(session_id: &str) -> String {
        format!("/chat/{session_id}/new")
    }
}
