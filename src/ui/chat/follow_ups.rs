use leptos::prelude::*;

use super::{ids, urls};
use crate::chat::FollowUpQuestion;
use crate::ui::components::{ButtonSize, ButtonVariant, button_class};

/// Suggested follow-up queries. Selecting one posts its id; the server
/// sends its text as the next query.
#[component]
pub fn FollowUpChips(
    session_id: String,
    follow_ups: Vec<FollowUpQuestion>,
    #[prop(default = false)] oob: bool,
) -> impl IntoView {
    view! {
        <div id={ids::CHIPS} class="follow-ups" hx-swap-oob={oob.then_some("true")}>
            {follow_ups
                .into_iter()
                .map(|f| {
                    view! {
                        <button
                            type="button"
                            class={button_class(ButtonVariant::Chip, ButtonSize::Sm, "")}
                            hx-post={urls::follow_up(&session_id, &f.id)}
                            hx-target={ids::selector(ids::LIST)}
                            hx-swap="beforeend"
                        >
                            {f.question}
                        </button>
                    }
                })
                .collect_view()}
        </div>
    }
}
