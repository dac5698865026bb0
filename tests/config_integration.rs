use pandasai_chat::config::AppConfig;
use serial_test::serial;
use std::env;
use std::fs;
use std::io::Write;

const VARS: &[&str] = &[
    "CONFIG_FILE",
    "PORT",
    "PANDASAI_SERVER__PORT",
    "PANDASAI_BACKEND__HISTORY_PAGE_SIZE",
    "PANDASAI_RETRY__MAX_ATTEMPTS",
    "PANDASAI_BACKEND__TURN_DEADLINE_SECS",
    "PANDASAI_RESILIENCE__REQUEST_TIMEOUT_SECS",
    "PANDASAI_BASE_URL",
    "PANDASAI_API_KEY",
];

// Helper to clear environment variables that might interfere with tests
fn clear_env_vars() {
    for var in VARS {
        unsafe {
            env::remove_var(var);
        }
    }
}

fn load(args: &[&str]) -> Result<AppConfig, config::ConfigError> {
    let mut argv = vec!["pandasai-chat"];
    argv.extend_from_slice(args);
    AppConfig::load_from_args(argv)
}

fn yaml_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .expect("Failed to create temp config");
    file.write_all(content.as_bytes())
        .expect("Failed to write temp config");
    file
}

#[test]
#[serial]
fn test_default_config() {
    clear_env_vars();

    let config = load(&[]).expect("defaults should load");
    assert_eq!(config.server.port, 3000);
    assert_eq!(config.server.static_dir, "static");
    assert_eq!(config.backend.base_url, "http://localhost:8000");
    assert_eq!(config.backend.api_key, None);
    assert_eq!(config.backend.history_page_size, 10);
    assert_eq!(config.retry.max_attempts, 3);
    assert!(config.resilience.rate_limit_enabled);
    assert!(config.request_timeout().is_some());
    assert!(!config.logging.json);
}

#[test]
#[serial]
fn test_env_override() {
    clear_env_vars();
    unsafe {
        env::set_var("PANDASAI_SERVER__PORT", "9090");
        env::set_var("PANDASAI_BACKEND__HISTORY_PAGE_SIZE", "25");
    }

    let config = load(&[]).expect("Failed to load config");
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.backend.history_page_size, 25);

    clear_env_vars();
}

#[test]
#[serial]
fn test_backend_shortcuts() {
    clear_env_vars();
    unsafe {
        env::set_var("PANDASAI_BASE_URL", "https://pandas.example.com/api");
        env::set_var("PANDASAI_API_KEY", "sk-test");
    }

    let config = load(&[]).expect("Failed to load config");
    assert_eq!(config.backend.base_url, "https://pandas.example.com/api");
    assert_eq!(config.backend.api_key.as_deref(), Some("sk-test"));
    assert!(!format!("{config:?}").contains("sk-test"));

    clear_env_vars();
}

#[test]
#[serial]
fn test_file_load() {
    clear_env_vars();

    let file = yaml_file(
        r#"
server:
  port: 7070
backend:
  base_url: "http://pandas.internal:9000"
ui:
  title: "Sales Data"
"#,
    );
    let path = file.path().to_str().expect("utf-8 temp path");

    let config = load(&["--config", path]).expect("Failed to load config from file");
    assert_eq!(config.server.port, 7070);
    assert_eq!(config.backend.base_url, "http://pandas.internal:9000");
    assert_eq!(config.ui.title, "Sales Data");
    // Untouched sections keep their defaults.
    assert_eq!(config.retry.max_attempts, 3);
}

#[test]
#[serial]
fn test_config_file_from_env() {
    clear_env_vars();

    let file = yaml_file("server:\n  port: 7171\n");
    unsafe {
        env::set_var("CONFIG_FILE", file.path());
    }

    let config = load(&[]).expect("Failed to load config from CONFIG_FILE");
    assert_eq!(config.server.port, 7171);

    clear_env_vars();
}

#[test]
#[serial]
fn test_precedence_file_env_cli() {
    clear_env_vars();

    let file = yaml_file("server:\n  port: 7070\n  host: \"127.0.0.1\"\n");
    let path = file.path().to_str().expect("utf-8 temp path");
    unsafe {
        env::set_var("PANDASAI_SERVER__PORT", "8080");
    }

    // Env beats the file.
    let config = load(&["--config", path]).expect("Failed to load config");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.host, "127.0.0.1");

    // CLI beats env.
    let config = load(&["--config", path, "--port", "8181", "--rate-limit-enabled", "false"])
        .expect("Failed to load config");
    assert_eq!(config.server.port, 8181);
    assert!(!config.resilience.rate_limit_enabled);

    clear_env_vars();
}

#[test]
#[serial]
fn test_invalid_values_are_rejected() {
    clear_env_vars();
    unsafe {
        env::set_var("PANDASAI_RETRY__MAX_ATTEMPTS", "0");
    }
    assert!(load(&[]).is_err());
    clear_env_vars();

    assert!(load(&["--base-url", "not a url"]).is_err());
    assert!(load(&["--config", "/definitely/missing/config.yaml"]).is_err());
}

#[test]
#[serial]
fn test_turn_deadline_must_fit_the_request_timeout() {
    clear_env_vars();
    unsafe {
        env::set_var("PANDASAI_BACKEND__TURN_DEADLINE_SECS", "300");
    }
    let err = load(&[]).expect_err("a deadline past the 240s timeout");
    assert!(err.to_string().contains("turn_deadline_secs"));

    // Equal is still too long: the timeout layer fires first.
    unsafe {
        env::set_var("PANDASAI_BACKEND__TURN_DEADLINE_SECS", "30");
        env::set_var("PANDASAI_RESILIENCE__REQUEST_TIMEOUT_SECS", "30");
    }
    assert!(load(&[]).is_err());

    // Without the timeout layer any deadline goes.
    unsafe {
        env::set_var("PANDASAI_BACKEND__TURN_DEADLINE_SECS", "300");
    }
    let config = load(&["--timeout-disabled", "true"]).expect("no request timeout");
    assert_eq!(config.backend.turn_deadline_secs, 300);
    assert!(config.request_timeout().is_none());

    clear_env_vars();
}

#[test]
#[serial]
fn test_cwd_config_fallback() {
    clear_env_vars();

    // Create ./config.yaml
    let cwd_path = "config.yaml";
    fs::write(cwd_path, "server:\n  port: 6060\n").expect("Failed to write ./config.yaml");

    let config = load(&[]);

    fs::remove_file(cwd_path).expect("Failed to remove ./config.yaml");

    assert_eq!(config.expect("Failed to load config").server.port, 6060);
}
