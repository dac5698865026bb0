//! Chat screen: skeleton or conversation.

use leptos::prelude::*;

use super::{MessageList, ids, urls};
use crate::chat::ScreenModel;
use crate::ui::components::Skeleton;

/// The scrolling area of the chat.
///
/// The skeleton asks for the real screen as soon as it is on the page; the
/// answer replaces the whole element.
#[component]
pub fn ChatScreen(session_id: String, model: ScreenModel) -> impl IntoView {
    match model {
        ScreenModel::Skeleton => view! {
            <section
                id={ids::SCREEN}
                class="chat-screen"
                hx-get={urls::screen(&session_id)}
                hx-trigger="load delay:300ms"
                hx-swap="outerHTML"
            >
                <Skeleton />
            </section>
        }
        .into_any(),
        ScreenModel::Conversation(conversation) => view! {
            <section id={ids::SCREEN} class="chat-screen">
                <MessageList session_id=session_id conversation=conversation />
            </section>
        }
        .into_any(),
    }
}
