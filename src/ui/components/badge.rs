//! Badge component for small labels.

use leptos::prelude::*;

/// Badge visual variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BadgeVariant {
    #[default]
    Default,
    /// Failure kind on an error bubble.
    Error,
    /// Muted metadata, e.g. a result type.
    Secondary,
}

impl BadgeVariant {
    /// Get CSS classes for this variant.
    #[must_use]
    pub fn classes(self) -> &'static str {
        match self {
            Self::Default => "badge",
            Self::Error => "badge badge-error",
            Self::Secondary => "badge badge-secondary",
        }
    }
}

/// Badge component for displaying status or labels.
///
/// # Example
///
/// ```rust,ignore
/// view! {
///     <Badge variant=BadgeVariant::Error>"Timed out"</Badge>
/// }
/// ```
#[component]
pub fn Badge(
    #[prop(default = BadgeVariant::Default)] variant: BadgeVariant,
    children: Children,
) -> impl IntoView {
    view! { <span class={variant.classes()}>{children()}</span> }
}
