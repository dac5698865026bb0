//! Chat shell layout component.

use leptos::prelude::*;

use super::{ChatHeader, ChatInput, ChatScreen, FollowUpChips, ids};
use crate::chat::{FollowUpQuestion, ScreenModel};

/// Complete chat interface for one session:
/// - header with the new-conversation action
/// - scrolling screen
/// - follow-up chips
/// - input
#[component]
pub fn ChatShell(
    title: String,
    session_id: String,
    model: ScreenModel,
    #[prop(default = Vec::new())] follow_ups: Vec<FollowUpQuestion>,
    #[prop(default = false)] sending: bool,
) -> impl IntoView {
    view! {
        <div id={ids::SHELL} class="chat-shell" data-session={session_id.clone()}>
            <ChatHeader title=title session_id={session_id.clone()} />
            <ChatScreen session_id={session_id.clone()} model=model />
            <FollowUpChips session_id={session_id.clone()} follow_ups=follow_ups />
            <ChatInput session_id={session_id.clone()} sending=sending />
        </div>
    }
}
