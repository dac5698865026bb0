//! Loading placeholders: skeleton, top loader, typing dots.

use leptos::prelude::*;

use super::LoaderIcon;

/// Full-screen placeholder shown until the first history page arrives.
#[component]
pub fn Skeleton(
    /// Number of placeholder bubbles.
    #[prop(default = 4)]
    rows: usize,
) -> impl IntoView {
    view! {
        <div class="skeleton" aria-busy="true" aria-label="Loading conversation">
            {(0..rows)
                .map(|i| {
                    let side = if i % 2 == 0 { "skeleton-row right" } else { "skeleton-row left" };
                    view! {
                        <div class=side>
                            <span class="skeleton-avatar"></span>
                            <span class="skeleton-bubble"></span>
                        </div>
                    }
                })
                .collect_view()}
        </div>
    }
}

/// Spinner pinned above the oldest message while an older page loads.
#[component]
pub fn TopLoader(
    /// Only shown while an enclosing HTMX request is running.
    #[prop(default = false)]
    indicator: bool,
) -> impl IntoView {
    let class = if indicator { "top-loader htmx-indicator" } else { "top-loader" };
    view! {
        <div class=class role="status">
            <LoaderIcon />
            <span class="sr-only">"Loading older messages"</span>
        </div>
    }
}

/// Three animated dots.
#[component]
pub fn TypingDots() -> impl IntoView {
    view! {
        <span class="typing-dots" aria-label="Assistant is typing">
            <span></span>
            <span></span>
            <span></span>
        </span>
    }
}
