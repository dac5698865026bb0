//! Inline SVG icons.
//!
//! All icons share the same 24x24 stroke frame; each one only supplies its
//! paths.

use leptos::prelude::*;

/// Common icon size class.
const ICON_SIZE: &str = "h-4 w-4";

#[component]
fn IconFrame(class: String, children: Children) -> impl IntoView {
    view! {
        <svg
            xmlns="http://www.w3.org/2000/svg"
            viewBox="0 0 24 24"
            fill="none"
            stroke="currentColor"
            stroke-width="2"
            stroke-linecap="round"
            stroke-linejoin="round"
            aria-hidden="true"
            class=class
        >
            {children()}
        </svg>
    }
}

fn icon_class(extra: &str) -> String {
    format!("icon {ICON_SIZE} {extra}")
}

/// Send/arrow-right icon.
#[component]
pub fn SendIcon(#[prop(default = "")] class: &'static str) -> impl IntoView {
    view! {
        <IconFrame class={icon_class(class)}>
            <line x1="22" y1="2" x2="11" y2="13" />
            <polygon points="22 2 15 22 11 13 2 9 22 2" />
        </IconFrame>
    }
}

/// Spinner.
#[component]
pub fn LoaderIcon(#[prop(default = "")] class: &'static str) -> impl IntoView {
    view! {
        <IconFrame class={icon_class(&format!("animate-spin {class}"))}>
            <path d="M21 12a9 9 0 1 1-6.219-8.56" />
        </IconFrame>
    }
}

#[component]
pub fn UserIcon(#[prop(default = "")] class: &'static str) -> impl IntoView {
    view! {
        <IconFrame class={icon_class(class)}>
            <path d="M19 21v-2a4 4 0 0 0-4-4H9a4 4 0 0 0-4 4v2" />
            <circle cx="12" cy="7" r="4" />
        </IconFrame>
    }
}

#[component]
pub fn BotIcon(#[prop(default = "")] class: &'static str) -> impl IntoView {
    view! {
        <IconFrame class={icon_class(class)}>
            <rect x="3" y="11" width="18" height="10" rx="2" />
            <circle cx="12" cy="5" r="2" />
            <path d="M12 7v4" />
            <line x1="8" y1="16" x2="8" y2="16" />
            <line x1="16" y1="16" x2="16" y2="16" />
        </IconFrame>
    }
}

/// Sparkles, used by the logo.
#[component]
pub fn SparklesIcon(#[prop(default = "")] class: &'static str) -> impl IntoView {
    view! {
        <IconFrame class={icon_class(class)}>
            <path d="m12 3-1.912 5.813a2 2 0 0 1-1.275 1.275L3 12l5.813 1.912a2 2 0 0 1 1.275 1.275L12 21l1.912-5.813a2 2 0 0 1 1.275-1.275L21 12l-5.813-1.912a2 2 0 0 1-1.275-1.275L12 3Z" />
            <path d="M5 3v4" />
            <path d="M19 17v4" />
            <path d="M3 5h4" />
            <path d="M17 19h4" />
        </IconFrame>
    }
}

/// New conversation.
#[component]
pub fn PlusIcon(#[prop(default = "")] class: &'static str) -> impl IntoView {
    view! {
        <IconFrame class={icon_class(class)}>
            <line x1="12" y1="5" x2="12" y2="19" />
            <line x1="5" y1="12" x2="19" y2="12" />
        </IconFrame>
    }
}

/// Error marker.
#[component]
pub fn AlertIcon(#[prop(default = "")] class: &'static str) -> impl IntoView {
    view! {
        <IconFrame class={icon_class(class)}>
            <circle cx="12" cy="12" r="10" />
            <line x1="12" y1="8" x2="12" y2="12" />
            <line x1="12" y1="16" x2="12.01" y2="16" />
        </IconFrame>
    }
}

/// Retry.
#[component]
pub fn RefreshIcon(#[prop(default = "")] class: &'static str) -> impl IntoView {
    view! {
        <IconFrame class={icon_class(class)}>
            <path d="M21 12a9 9 0 0 1-15.5 6.2L3 16" />
            <path d="M3 21v-5h5" />
            <path d="M3 12a9 9 0 0 1 15.5-6.2L21 8" />
            <path d="M21 3v5h-5" />
        </IconFrame>
    }
}
