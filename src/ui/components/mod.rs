//! Stateless presentation components.
//!
//! # Components
//!
//! - [`MessageBubble`]: user or AI bubble for a [`crate::chat::ChatMessage`]
//! - [`TypingBubble`], [`Skeleton`], [`TopLoader`]: loading states
//! - [`Button`], [`Badge`], [`Avatar`], [`Logo`]
//! - [`icons`](self#icons): SVG icon components

mod avatar;
mod badge;
mod bubble;
mod button;
mod icons;
mod loader;
mod logo;

pub use avatar::Avatar;
pub use badge::{Badge, BadgeVariant};
pub use bubble::{
    AiBubble, ERROR_LEAD, EMPTY_RESULT, ErrorBubble, MessageBubble, TypingBubble, UserBubble,
};
pub use button::{Button, ButtonSize, ButtonVariant, button_class};
pub use icons::*;
pub use loader::{Skeleton, TopLoader, TypingDots};
pub use logo::Logo;
