use std::time::Duration;

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use url::Url;

use crate::api::RetryPolicy;

/// Environment prefix for layered settings, e.g. `PANDASAI_SERVER__PORT`.
const ENV_PREFIX: &str = "PANDASAI";

#[derive(Parser, Debug)]
#[command(author, version, about = "Server-rendered chat client for PandasAI", long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// PandasAI backend base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Enable rate limiting
    #[arg(long)]
    pub rate_limit_enabled: Option<bool>,

    /// Disable timeout middleware
    #[arg(long)]
    pub timeout_disabled: Option<bool>,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub retry: RetryConfig,
    pub resilience: ResilienceConfig,
    pub session: SessionConfig,
    pub ui: UiConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Directory served under `/static`.
    pub static_dir: String,
}

#[derive(Deserialize, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Per-request HTTP timeout.
    pub request_timeout_secs: u64,
    /// Upper bound for a whole turn, retries included.
    pub turn_deadline_secs: u64,
    /// Turns fetched per history page.
    pub history_page_size: usize,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("turn_deadline_secs", &self.turn_deadline_secs)
            .field("history_page_size", &self.history_page_size)
            .finish()
    }
}

impl BackendConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub fn turn_deadline(&self) -> Duration {
        Duration::from_secs(self.turn_deadline_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryConfig {
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResilienceConfig {
    pub rate_limit_enabled: bool,
    pub requests_per_second: u32,
    pub burst_size: u32,
    pub timeout_disabled: bool,
    /// Budget for a whole browser request, long-polls included.
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    pub idle_timeout_secs: u64,
    pub sweep_interval_secs: u64,
}

impl SessionConfig {
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct UiConfig {
    pub title: String,
    /// Where the page loads htmx from.
    pub htmx_src: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub json: bool,
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub filter: String,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        // 1. Defaults
        let mut builder = Config::builder()
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.static_dir", "static")?
            .set_default("backend.base_url", "http://localhost:8000")?
            .set_default("backend.request_timeout_secs", 60)?
            .set_default("backend.turn_deadline_secs", 180)?
            .set_default("backend.history_page_size", 10)?
            .set_default("retry.max_attempts", 3)?
            .set_default("retry.base_delay_ms", 500)?
            .set_default("retry.max_delay_ms", 8000)?
            .set_default("resilience.rate_limit_enabled", true)?
            .set_default("resilience.requests_per_second", 20)?
            .set_default("resilience.burst_size", 40)?
            .set_default("resilience.timeout_disabled", false)?
            .set_default("resilience.request_timeout_secs", 240)?
            .set_default("session.idle_timeout_secs", 30 * 60)?
            .set_default("session.sweep_interval_secs", 60)?
            .set_default("ui.title", "PandasAI Chat")?
            .set_default(
                "ui.htmx_src",
                "https://unpkg.com/htmx.org@2.0.8/dist/htmx.min.js",
            )?
            .set_default("logging.json", false)?
            .set_default("logging.filter", "info,pandasai_chat=debug,tower_http=info")?;

        // 2. Config file: explicit path must exist, the default one may not.
        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path)),
            None => builder.add_source(File::with_name("config").required(false)),
        };

        // 3. Environment, e.g. PANDASAI_SERVER__PORT=8080
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );
        if let Ok(url) = std::env::var("PANDASAI_BASE_URL") {
            builder = builder.set_override("backend.base_url", url)?;
        }
        if let Ok(key) = std::env::var("PANDASAI_API_KEY") {
            if !key.trim().is_empty() {
                builder = builder.set_override("backend.api_key", key)?;
            }
        }

        // 4. CLI flags
        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(url) = cli.base_url {
            builder = builder.set_override("backend.base_url", url)?;
        }
        if let Some(rl) = cli.rate_limit_enabled {
            builder = builder.set_override("resilience.rate_limit_enabled", rl)?;
        }
        if let Some(td) = cli.timeout_disabled {
            builder = builder.set_override("resilience.timeout_disabled", td)?;
        }
        if let Some(json) = cli.log_json {
            builder = builder.set_override("logging.json", json)?;
        }

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        let invalid = |msg: String| Err(config::ConfigError::Message(msg));

        match Url::parse(&self.backend.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return invalid(format!(
                    "backend.base_url must be http(s), got scheme {:?}",
                    url.scheme()
                ));
            }
            Err(e) => return invalid(format!("backend.base_url is not a valid URL: {e}")),
        }
        if self.backend.history_page_size == 0 {
            return invalid("backend.history_page_size must be at least 1".to_string());
        }
        if self.retry.max_attempts == 0 {
            return invalid("retry.max_attempts must be at least 1".to_string());
        }
        if self.resilience.rate_limit_enabled
            && (self.resilience.requests_per_second == 0 || self.resilience.burst_size == 0)
        {
            return invalid(
                "rate limiting needs non-zero requests_per_second and burst_size".to_string(),
            );
        }
        // A turn long-poll waits up to the turn deadline and must finish
        // before the request timeout cuts it off.
        if !self.resilience.timeout_disabled
            && self.backend.turn_deadline_secs >= self.resilience.request_timeout_secs
        {
            return invalid(format!(
                "backend.turn_deadline_secs ({}) must be below resilience.request_timeout_secs ({})",
                self.backend.turn_deadline_secs, self.resilience.request_timeout_secs
            ));
        }
        Ok(())
    }

    /// The whole-request timeout, or `None` when disabled.
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        (!self.resilience.timeout_disabled)
            .then(|| Duration::from_secs(self.resilience.request_timeout_secs))
    }
}
