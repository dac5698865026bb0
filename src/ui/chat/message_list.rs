//! The message list and what sits around it.

use leptos::prelude::*;

use super::{ids, urls};
use crate::chat::screen::{ConversationView, EMPTY_PROMPT, TopSlot};
use crate::ui::components::{
    ButtonSize, ButtonVariant, MessageBubble, RefreshIcon, SparklesIcon, TopLoader, TypingBubble,
    button_class,
};

/// Messages oldest first, with the history slot above and the typing
/// bubble below. New bubbles are appended to this element.
#[component]
pub fn MessageList(session_id: String, conversation: ConversationView) -> impl IntoView {
    let prompt = conversation.shows_prompt();
    let typing = conversation.typing_turn;

    view! {
        <div id={ids::LIST} class="message-list" aria-live="polite">
            {TopSlotView(TopSlotViewProps {
                session_id: session_id.clone(),
                slot: conversation.top,
            })}
            {conversation
                .messages
                .into_iter()
                .map(|message| view! { <MessageBubble message=message /> })
                .collect_view()}
            {prompt.then(|| view! { <EmptyPrompt /> })}
            {typing.map(|turn| view! { <PendingTurn session_id=session_id turn=turn /> })}
        </div>
    }
}

/// Static prompt for an empty conversation.
#[component]
pub fn EmptyPrompt() -> impl IntoView {
    view! {
        <div id={ids::PROMPT} class="empty-prompt">
            <SparklesIcon class="empty-prompt-icon" />
            <p>{EMPTY_PROMPT}</p>
        </div>
    }
}

/// Polls again after a failed or unreachable long-poll. A 404 means the
/// turn is gone for good.
pub const TURN_TRIGGER: &str = "load, htmx:responseError[detail.xhr.status!=404] delay:2s, \
                                htmx:sendError delay:2s";

/// Typing bubble that long-polls its turn and is replaced by the answer.
#[component]
pub fn PendingTurn(session_id: String, turn: u64) -> impl IntoView {
    view! {
        <div
            id={format!("turn-{turn}")}
            hx-get={urls::turn(&session_id, turn)}
            hx-trigger=TURN_TRIGGER
            hx-swap="outerHTML"
        >
            <TypingBubble />
        </div>
    }
}

/// The element above the oldest loaded message.
#[component]
pub fn TopSlotView(session_id: String, slot: TopSlot) -> impl IntoView {
    let history = urls::history(&session_id);
    match slot {
        TopSlot::Nothing => view! {
            <div id={ids::TOP} class="history-start">"Start of conversation"</div>
        }
        .into_any(),
        // Revealing the sentinel fetches the next page and replaces it.
        TopSlot::Sentinel => view! {
            <div
                id={ids::TOP}
                class="history-sentinel"
                hx-get=history
                hx-trigger="intersect once"
                hx-swap="outerHTML"
            >
                <TopLoader indicator=true />
            </div>
        }
        .into_any(),
        // Another request owns the fetch. Each reply re-renders the slot,
        // so polling stops once the fetch lands.
        TopSlot::Loading => view! {
            <div
                id={ids::TOP}
                class="history-loading"
                hx-get=history
                hx-trigger="load delay:1s"
                hx-swap="outerHTML"
            >
                <TopLoader />
            </div>
        }
        .into_any(),
        TopSlot::Failed(failure) => view! {
            <div id={ids::TOP} class="history-error" role="alert">
                <span>"Could not load older messages: " {failure.message}</span>
                <button
                    type="button"
                    class={button_class(ButtonVariant::Ghost, ButtonSize::Sm, "")}
                    hx-get=history
                    hx-target={ids::selector(ids::TOP)}
                    hx-swap="outerHTML"
                >
                    <RefreshIcon />
                    <span>"Retry"</span>
                </button>
            </div>
        }
        .into_any(),
    }
}
