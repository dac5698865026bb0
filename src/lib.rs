//! PandasAI chat client
//!
//! A server-rendered chat for asking questions about data in plain language.
//! The server keeps each page's chat state in memory and proxies every call to
//! a PandasAI-compatible backend, so the API key never reaches the browser.
//!
//! # Architecture
//!
//! - **Server**: Axum router returning HTML fragments for HTMX
//! - **API binding**: `send_query` / `fetch_history` over HTTP with bounded retries
//! - **Sessions**: per-page chat state with a send guard and history paging
//! - **UI**: Leptos SSR components + HTMX
//!
//! # Modules
//!
//! - [`api`]: backend binding, HTTP client and retry policy
//! - [`chat`]: chat state machine and the service driving it
//! - [`session`]: session store
//! - [`ui`]: components and fragments
//! - [`server`]: routes and handlers

#![recursion_limit = "256"]
// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::implicit_hasher)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]
#![allow(clippy::must_use_candidate)]

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod rate_limit;
pub mod server;
pub mod session;
pub mod telemetry;
pub mod ui;

use crate::api::PandasAiApi;
use crate::chat::ChatService;
use crate::config::AppConfig;
use crate::rate_limit::AppRateLimiter;

use session::SessionStore;
use std::sync::Arc;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Sessions and the backend calls behind them.
    pub chat: Arc<ChatService>,
    /// Global Rate Limiter
    pub rate_limiter: Arc<AppRateLimiter>,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Wire the chat service to `api` using the limits in `config`.
    pub fn new(config: Arc<AppConfig>, api: Arc<dyn PandasAiApi>) -> Self {
        let sessions = SessionStore::new(config.backend.history_page_size);
        let chat = ChatService::new(api, sessions).with_turn_deadline(config.backend.turn_deadline());
        Self {
            chat: Arc::new(chat),
            rate_limiter: Arc::new(AppRateLimiter::from_config(&config.resilience)),
            config,
        }
    }
}
