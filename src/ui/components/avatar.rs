//! Avatar shown beside a bubble.

use leptos::prelude::*;

use super::{BotIcon, UserIcon};

/// Round avatar with the user or assistant icon.
#[component]
pub fn Avatar(
    /// Render the user's avatar instead of the assistant's.
    #[prop(default = false)]
    user: bool,
) -> impl IntoView {
    let (class, label) = if user {
        ("avatar avatar-user", "You")
    } else {
        ("avatar avatar-ai", "Assistant")
    };

    view! {
        <span class=class title=label>
            {if user {
                view! { <UserIcon /> }.into_any()
            } else {
                view! { <BotIcon /> }.into_any()
            }}
        </span>
    }
}
