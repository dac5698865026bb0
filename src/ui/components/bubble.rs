//! Chat bubbles: one for the user, several AI variants.

use leptos::prelude::*;

use super::{AlertIcon, Avatar, Badge, BadgeVariant, TypingDots};
use crate::api::http::value_text;
use crate::chat::{AiResponse, ChatMessage, DataTable, MessageBody, ResponsePart, TurnFailure};

/// Lead-in of every error bubble.
pub const ERROR_LEAD: &str =
    "Unfortunately, I was not able to get your answers, because of the following error:";

/// Shown for an answer with no parts.
pub const EMPTY_RESULT: &str = "The query returned no results.";

fn dom_id(message_id: &str) -> String {
    format!("msg-{message_id}")
}

/// Any chat message, picking the matching bubble.
#[component]
pub fn MessageBubble(message: ChatMessage) -> impl IntoView {
    let id = dom_id(&message.id);
    let time = message.timestamp.format("%H:%M").to_string();
    match message.body {
        MessageBody::Query(text) => view! { <UserBubble id=id text=text time=time /> }.into_any(),
        MessageBody::Response(response) => {
            view! { <AiBubble id=id response=response time=time /> }.into_any()
        }
        MessageBody::Failed(failure) => {
            view! { <ErrorBubble id=id failure=failure time=time /> }.into_any()
        }
    }
}

#[component]
pub fn UserBubble(id: String, text: String, time: String) -> impl IntoView {
    view! {
        <div id=id class="message message-user">
            <div class="bubble bubble-user">
                <p class="bubble-text">{text}</p>
                <time class="bubble-time">{time}</time>
            </div>
            <Avatar user=true />
        </div>
    }
}

/// Successful answer. Renders every part in order.
#[component]
pub fn AiBubble(id: String, response: AiResponse, time: String) -> impl IntoView {
    let body = if response.is_empty() {
        view! { <p class="bubble-text bubble-empty">{EMPTY_RESULT}</p> }.into_any()
    } else {
        response
            .parts
            .into_iter()
            .map(|part| view! { <ResponsePartView part=part /> })
            .collect_view()
            .into_any()
    };

    view! {
        <div id=id class="message message-ai">
            <Avatar />
            <div class="bubble bubble-ai">
                {body}
                <time class="bubble-time">{time}</time>
            </div>
        </div>
    }
}

#[component]
fn ResponsePartView(part: ResponsePart) -> impl IntoView {
    match part {
        ResponsePart::Text(text) => view! { <p class="bubble-text">{text}</p> }.into_any(),
        ResponsePart::Number(number) => {
            view! { <p class="bubble-number">{number.to_string()}</p> }.into_any()
        }
        ResponsePart::Table(table) => view! { <TableView table=table /> }.into_any(),
        ResponsePart::Plot(src) => view! {
            <figure class="bubble-plot">
                <img src=src alt="Chart" loading="lazy" />
            </figure>
        }
        .into_any(),
    }
}

#[component]
fn TableView(table: DataTable) -> impl IntoView {
    let row_count = table.rows.len();
    view! {
        <div class="bubble-table">
            <table>
                <thead>
                    <tr>
                        {table
                            .headers
                            .into_iter()
                            .map(|h| view! { <th scope="col">{h}</th> })
                            .collect_view()}
                    </tr>
                </thead>
                <tbody>
                    {table
                        .rows
                        .into_iter()
                        .map(|row| {
                            view! {
                                <tr>
                                    {row
                                        .iter()
                                        .map(|cell| view! { <td>{value_text(cell)}</td> })
                                        .collect_view()}
                                </tr>
                            }
                        })
                        .collect_view()}
                </tbody>
            </table>
            <Badge variant=BadgeVariant::Secondary>{format!("{row_count} rows")}</Badge>
        </div>
    }
}

/// A turn that ended in an error.
#[component]
pub fn ErrorBubble(id: String, failure: TurnFailure, time: String) -> impl IntoView {
    view! {
        <div id=id class="message message-ai">
            <Avatar />
            <div class="bubble bubble-error" role="alert">
                <p class="bubble-text">
                    <AlertIcon class="bubble-error-icon" />
                    {ERROR_LEAD}
                </p>
                <p class="bubble-error-detail">{failure.message}</p>
                <Badge variant=BadgeVariant::Error>{failure.kind.label()}</Badge>
                <time class="bubble-time">{time}</time>
            </div>
        </div>
    }
}

/// Placeholder bubble while the assistant works.
#[component]
pub fn TypingBubble() -> impl IntoView {
    view! {
        <div class="message message-ai message-typing">
            <Avatar />
            <div class="bubble bubble-ai">
                <TypingDots />
            </div>
        </div>
    }
}
