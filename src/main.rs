//! PandasAI chat server
//!
//! Entry point: loads configuration, installs tracing, serves the chat.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tracing::info;

use pandasai_chat::config::AppConfig;
use pandasai_chat::{server, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present) before reading any settings
    let _ = dotenv();

    let config = AppConfig::load().context("Configuration error")?;

    // Initialize tracing (M-LOG-STRUCTURED)
    telemetry::init(&config.logging)?;

    info!(
        name: "config.loaded",
        host = %config.server.host,
        port = config.server.port,
        static_dir = %config.server.static_dir,
        rate_limit_enabled = config.resilience.rate_limit_enabled,
        "Configuration loaded"
    );

    server::start_server(Arc::new(config)).await
}
