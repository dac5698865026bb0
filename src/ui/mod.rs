//! Server-rendered UI.
//!
//! Leptos components render to HTML strings; HTMX attributes on them drive
//! every interaction.
//!
//! # Structure
//!
//! - [`components`]: stateless presentation components
//! - [`chat`]: chat layout (screen, input, chips, list)
//! - [`fragments`]: full pages and HTMX fragments returned by the handlers

pub mod chat;
pub mod components;
pub mod fragments;
