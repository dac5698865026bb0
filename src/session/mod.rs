//! Session management.
//!
//! A session is one page lifetime of chat: it is created when the chat page
//! is loaded and holds that page's [`ChatState`](crate::chat::ChatState).
//! Sessions live in memory only and are swept once idle.
//!
//! # Architecture
//!
//! - [`Session`]: shared handle to one chat state plus turn notifications
//! - [`SessionStore`]: thread-safe store for all active sessions
//!
//! # Example
//!
//! ```rust
//! use pandasai_chat::session::SessionStore;
//!
//! let store = SessionStore::new(20);
//! let session = store.create(None);
//! session.update(|state| state.begin_send("Hello!")).unwrap();
//!
//! assert!(session.read(|state| state.is_typing()));
//! ```

mod thread;

pub use thread::{DEFAULT_SESSION_TIMEOUT, Session, SessionStore};
