//! HTML for each browser-facing response.
//!
//! Full pages use a `format!` shell; everything inside it is rendered from
//! Leptos components.

use leptos::prelude::*;

use super::chat::{ChatInput, ChatScreen, ChatShell, FollowUpChips, PendingTurn, TopSlotView, TopSlotViewProps, ids};
use super::components::MessageBubble;
use crate::chat::screen::TopSlot;
use crate::chat::{ChatMessage, ChatState, ScreenModel, TurnOutcome};
use crate::config::UiConfig;
use crate::session::Session;

/// Render a view to a string inside a throwaway reactive owner.
pub fn render<V: IntoView>(build: impl FnOnce() -> V) -> String {
    let owner = Owner::new();
    owner.with(|| build().to_html())
}

/// Escape text for the hand-written page shell.
fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Generate the HTML document around the chat shell.
#[must_use]
pub fn page(ui: &UiConfig, content: &str) -> String {
    let title = escape(&ui.title);
    let htmx = escape(&ui.htmx_src);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="description" content="Ask questions about your data in plain language">
    <title>{title}</title>
    <script src="{htmx}"></script>
    <link rel="stylesheet" href="/static/app.css">
</head>
<body>
    <main id="app">
        {content}
    </main>
</body>
</html>"#
    )
}

/// The whole chat for a session, as it currently stands.
#[must_use]
pub fn shell(title: &str, session: &Session) -> String {
    let (model, follow_ups, sending) = session.read(|state| {
        (
            ScreenModel::from_state(state),
            state.follow_ups().to_vec(),
            state.is_typing(),
        )
    });
    let session_id = session.id().to_string();
    let title = title.to_string();
    render(move || {
        view! {
            <ChatShell
                title=title
                session_id=session_id
                model=model
                follow_ups=follow_ups
                sending=sending
            />
        }
    })
}

/// The chat screen alone, after the initial load.
#[must_use]
pub fn screen(session_id: &str, model: ScreenModel) -> String {
    let session_id = session_id.to_string();
    render(move || view! { <ChatScreen session_id=session_id model=model /> })
}

/// Appended to the list when a query is accepted: the user bubble, a typing
/// bubble that waits for the answer, and out-of-band updates that disable
/// the input and clear the chips and the empty prompt.
#[must_use]
pub fn accepted_turn(session_id: &str, query: Option<ChatMessage>, turn: u64) -> String {
    let session_id = session_id.to_string();
    render(move || {
        view! {
            {query.map(|message| view! { <MessageBubble message=message /> })}
            <PendingTurn session_id={session_id.clone()} turn=turn />
            <div id={ids::PROMPT} hx-swap-oob="delete"></div>
            <FollowUpChips session_id={session_id.clone()} follow_ups={Vec::new()} oob=true />
            <ChatInput session_id=session_id sending=true oob=true />
        }
    })
}

/// Replaces a typing bubble once its turn is done.
#[must_use]
pub fn finished_turn(session_id: &str, outcome: TurnOutcome, sending: bool) -> String {
    let session_id = session_id.to_string();
    let TurnOutcome { message, follow_ups } = outcome;
    render(move || {
        view! {
            <MessageBubble message=message />
            <FollowUpChips session_id={session_id.clone()} follow_ups=follow_ups oob=true />
            <ChatInput session_id=session_id sending=sending oob=true />
        }
    })
}

/// Replaces the history slot: the new slot followed by the older messages.
#[must_use]
pub fn older_page(session_id: &str, messages: Vec<ChatMessage>, top: TopSlot) -> String {
    let session_id = session_id.to_string();
    render(move || {
        view! {
            {TopSlotView(TopSlotViewProps { session_id, slot: top })}
            {messages
                .into_iter()
                .map(|message| view! { <MessageBubble message=message /> })
                .collect_view()}
        }
    })
}

/// The history slot for the current state, without new messages.
#[must_use]
pub fn top_slot(session_id: &str, state: &ChatState) -> String {
    older_page(session_id, Vec::new(), TopSlot::for_state(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{HistoryCursor, HistoryPage};
    use crate::chat::{AiResponse, FailureKind, FollowUpQuestion, TurnFailure};
    use crate::session::SessionStore;

    fn ui() -> UiConfig {
        UiConfig {
            title: "Data <Chat>".to_string(),
            htmx_src: "/static/htmx.min.js".to_string(),
        }
    }

    #[test]
    fn page_escapes_title_and_embeds_content() {
        let html = page(&ui(), "<div id=\"x\"></div>");
        assert!(html.contains("<title>Data &lt;Chat&gt;</title>"));
        assert!(html.contains(r#"<script src="/static/htmx.min.js"></script>"#));
        assert!(html.contains("<div id=\"x\"></div>"));
    }

    #[test]
    fn new_session_shows_the_empty_prompt() {
        let store = SessionStore::new(10);
        let session = store.create(None);
        let html = shell("Chat", &session);

        assert!(html.contains("How can I help you today?"));
        assert!(html.contains(&format!("/chat/{}/messages", session.id())));
        assert!(!html.contains("skeleton"));
    }

    #[test]
    fn resumed_session_starts_with_the_skeleton() {
        let store = SessionStore::new(10);
        let session = store.create(Some("conv".to_string()));
        let html = shell("Chat", &session);

        assert!(html.contains("skeleton"));
        assert!(html.contains(&format!("/chat/{}/screen", session.id())));
        assert!(!html.contains("How can I help you today?"));
    }

    #[test]
    fn accepted_turn_polls_and_disables_input() {
        let html = accepted_turn("s1", Some(ChatMessage::query("hello <b>")), 3);

        assert!(html.contains("hello &lt;b&gt;"));
        assert!(html.contains("/chat/s1/turns/3"));
        assert!(html.contains("hx-swap-oob=\"delete\""));
        assert!(html.contains(" disabled"));
    }

    #[test]
    fn pending_turn_polls_again_after_errors() {
        let html = accepted_turn("s1", None, 1);

        assert!(html.contains("htmx:responseError[detail.xhr.status!=404] delay:2s"));
        assert!(html.contains("htmx:sendError delay:2s"));
    }

    #[test]
    fn loading_slot_polls_once_per_render() {
        let mut state = ChatState::new(Some("conv".to_string()), 2);
        state.begin_initial_load().unwrap();
        state
            .complete_history_fetch(Ok(HistoryPage {
                messages: vec![ChatMessage::query("recent")],
                next_cursor: Some(HistoryCursor { skip: 1 }),
            }))
            .unwrap();
        state.begin_older_fetch().unwrap();

        let html = top_slot("s1", &state);
        assert!(html.contains("history-loading"));
        assert!(html.contains("hx-trigger=\"load delay:1s\""));
        assert!(!html.contains("every"));

        state
            .complete_history_fetch(Ok(HistoryPage::default()))
            .unwrap();
        let html = top_slot("s1", &state);
        assert!(html.contains("Start of conversation"));
        assert!(!html.contains("hx-trigger"));
    }

    #[test]
    fn finished_turn_renders_answer_and_chips() {
        let outcome = TurnOutcome {
            message: ChatMessage::response("r1", AiResponse::text("hi")),
            follow_ups: vec![FollowUpQuestion::new("1", "more?")],
        };
        let html = finished_turn("s1", outcome, false);

        assert!(html.contains("hi"));
        assert!(html.contains("more?"));
        assert!(html.contains("/chat/s1/follow-ups/1"));
        assert!(!html.contains(" disabled"));
    }

    #[test]
    fn failed_turn_renders_the_error_bubble() {
        let outcome = TurnOutcome {
            message: ChatMessage::failed(
                "r1",
                TurnFailure {
                    kind: FailureKind::Timeout,
                    message: "backend too slow".to_string(),
                },
            ),
            follow_ups: Vec::new(),
        };
        let html = finished_turn("s1", outcome, false);

        assert!(html.contains("Unfortunately, I was not able to get your answers"));
        assert!(html.contains("backend too slow"));
        assert!(html.contains("Timed out"));
    }

    #[test]
    fn older_page_puts_the_slot_first() {
        let html = older_page(
            "s1",
            vec![ChatMessage::query("older question")],
            TopSlot::Sentinel,
        );
        let slot = html.find("history-top").unwrap();
        let message = html.find("older question").unwrap();
        assert!(slot < message);
        assert!(html.contains("intersect once"));
    }
}
