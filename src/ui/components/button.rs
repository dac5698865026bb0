//! Button styles and the plain button component.

use leptos::prelude::*;

/// Button visual variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ButtonVariant {
    /// Primary action (send).
    #[default]
    Primary,
    /// Subtle header action.
    Ghost,
    /// Follow-up chip.
    Chip,
}

impl ButtonVariant {
    /// Get CSS classes for this variant.
    #[must_use]
    pub fn classes(self) -> &'static str {
        match self {
            Self::Primary => "btn-primary",
            Self::Ghost => "btn-ghost",
            Self::Chip => "btn-chip",
        }
    }
}

/// Button size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ButtonSize {
    Sm,
    #[default]
    Md,
    /// Icon-only button.
    Icon,
}

impl ButtonSize {
    /// Get CSS classes for this size.
    #[must_use]
    pub fn classes(self) -> &'static str {
        match self {
            Self::Sm => "btn-sm",
            Self::Md => "btn-md",
            Self::Icon => "btn-icon",
        }
    }
}

/// Full class list for a button. Shared with HTMX buttons that are written
/// out by hand because they carry request attributes.
#[must_use]
pub fn button_class(variant: ButtonVariant, size: ButtonSize, extra: &str) -> String {
    format!("btn {} {} {extra}", variant.classes(), size.classes())
        .trim_end()
        .to_string()
}

/// Button without HTMX attributes, e.g. a form's submit button.
///
/// # Example
///
/// ```rust,ignore
/// view! {
///     <Button button_type="submit" disabled=sending>
///         <SendIcon />
///     </Button>
/// }
/// ```
#[component]
pub fn Button(
    #[prop(default = ButtonVariant::Primary)] variant: ButtonVariant,
    #[prop(default = ButtonSize::Md)] size: ButtonSize,
    #[prop(default = false)] disabled: bool,
    /// Button type attribute.
    #[prop(default = "button")]
    button_type: &'static str,
    /// Accessible label for icon-only buttons.
    #[prop(default = "")]
    label: &'static str,
    #[prop(default = "")] class: &'static str,
    children: Children,
) -> impl IntoView {
    let aria_label = (!label.is_empty()).then_some(label);

    view! {
        <button
            type=button_type
            class={button_class(variant, size, class)}
            disabled=disabled
            aria-label=aria_label
        >
            {children()}
        </button>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_combine_variant_and_size() {
        assert_eq!(
            button_class(ButtonVariant::Chip, ButtonSize::Sm, ""),
            "btn btn-chip btn-sm"
        );
        assert_eq!(
            button_class(ButtonVariant::Primary, ButtonSize::Icon, "send"),
            "btn btn-primary btn-icon send"
        );
    }
}
