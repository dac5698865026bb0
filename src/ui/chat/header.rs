//! Chat header component.

use leptos::prelude::*;

use super::{ids, urls};
use crate::ui::components::{ButtonSize, ButtonVariant, Logo, PlusIcon, button_class};

/// Title bar with the "new conversation" action.
#[component]
pub fn ChatHeader(title: String, session_id: String) -> impl IntoView {
    view! {
        <header class="chat-header">
            <Logo title=title />
            <button
                type="button"
                class={button_class(ButtonVariant::Ghost, ButtonSize::Sm, "")}
                hx-post={urls::new_conversation(&session_id)}
                hx-target={ids::selector(ids::SHELL)}
                hx-swap="outerHTML"
                hx-push-url="/"
            >
                <PlusIcon />
                <span>"New conversation"</span>
            </button>
        </header>
    }
}
