use leptos::prelude::*;

use super::SparklesIcon;

/// Brand mark and title.
#[component]
pub fn Logo(title: String) -> impl IntoView {
    view! {
        <a href="/" class="logo">
            <SparklesIcon class="logo-mark" />
            <span>{title}</span>
        </a>
    }
}
