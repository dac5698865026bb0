//! Chat input component.

use leptos::prelude::*;

use super::{ids, urls};
use crate::ui::components::{Button, ButtonSize, ButtonVariant, LoaderIcon, SendIcon};

/// Text field and send button.
///
/// The button is disabled while `sending`; the server rejects duplicate
/// submissions regardless. Re-rendering the input also clears it.
#[component]
pub fn ChatInput(
    session_id: String,
    #[prop(default = false)] sending: bool,
    /// Render for an out-of-band swap.
    #[prop(default = false)]
    oob: bool,
) -> impl IntoView {
    view! {
        <div id={ids::INPUT} class="chat-input" hx-swap-oob={oob.then_some("true")}>
            <form
                class="chat-form"
                hx-post={urls::messages(&session_id)}
                hx-target={ids::selector(ids::LIST)}
                hx-swap="beforeend"
                hx-disabled-elt="find button"
            >
                <textarea
                    name="query"
                    class="chat-textarea"
                    rows="1"
                    placeholder="Ask a question about your data..."
                    aria-label="Your question"
                    required
                ></textarea>
                <Button
                    variant=ButtonVariant::Primary
                    size=ButtonSize::Icon
                    button_type="submit"
                    label="Send"
                    disabled=sending
                >
                    {if sending {
                        view! { <LoaderIcon /> }.into_any()
                    } else {
                        view! { <SendIcon /> }.into_any()
                    }}
                </Button>
            </form>
        </div>
    }
}
