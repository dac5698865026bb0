//! Tracing subscriber setup.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

/// Filter from `RUST_LOG`, falling back to the configured directives.
fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber: human-readable or JSON lines.
pub fn init(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = env_filter(config);
    if config.json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_target(true).with_current_span(false))
            .with(filter)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true))
            .with(filter)
            .try_init()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_directives_fall_back_to_info() {
        let filter = env_filter(&LoggingConfig {
            json: false,
            filter: "=[".to_string(),
        });
        // Either RUST_LOG from the environment or the fallback applies.
        assert!(!filter.to_string().is_empty());
    }
}
