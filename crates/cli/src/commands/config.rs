use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use toml::Value;
use zam_core::config::{AppConfig, LoadOptions};

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, value, env_keys) in effective_fields(&config) {
        let source = field_source(
            key_path,
            env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(key_path, &value, source));
    }
    lines.join("\n")
}

type Field = (&'static str, String, &'static [&'static str]);

fn effective_fields(config: &AppConfig) -> Vec<Field> {
    let api_key = redact_key(config.llm.api_key.as_ref().map(|key| key.expose_secret()));

    vec![
        ("database.url", config.database.url.clone(), &["ZAM_DATABASE_URL"]),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["ZAM_DATABASE_MAX_CONNECTIONS"],
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["ZAM_DATABASE_TIMEOUT_SECS"],
        ),
        ("llm.api_key", api_key, &["ZAM_LLM_API_KEY", "GEMINI_API_KEY"]),
        ("llm.base_url", config.llm.base_url.clone(), &["ZAM_LLM_BASE_URL"]),
        ("llm.models", config.llm.models.join(","), &["ZAM_LLM_MODELS"]),
        (
            "llm.retries_per_model",
            config.llm.retries_per_model.to_string(),
            &["ZAM_LLM_RETRIES_PER_MODEL"],
        ),
        (
            "llm.rate_limit_backoff_ms",
            config.llm.rate_limit_backoff_ms.to_string(),
            &["ZAM_LLM_RATE_LIMIT_BACKOFF_MS"],
        ),
        (
            "llm.request_timeout_secs",
            config.llm.request_timeout_secs.to_string(),
            &["ZAM_LLM_REQUEST_TIMEOUT_SECS"],
        ),
        ("llm.deadline_secs", config.llm.deadline_secs.to_string(), &["ZAM_LLM_DEADLINE_SECS"]),
        (
            "server.bind_address",
            config.server.bind_address.clone(),
            &["ZAM_SERVER_BIND_ADDRESS"],
        ),
        ("server.port", config.server.port.to_string(), &["ZAM_SERVER_PORT", "PORT"]),
        (
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["ZAM_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        (
            "server.cors_allow_any",
            config.server.cors_allow_any.to_string(),
            &["ZAM_SERVER_CORS_ALLOW_ANY"],
        ),
        ("rate_limit.enabled", config.rate_limit.enabled.to_string(), &["ZAM_RATE_LIMIT_ENABLED"]),
        (
            "rate_limit.requests_per_window",
            config.rate_limit.requests_per_window.to_string(),
            &["ZAM_RATE_LIMIT_REQUESTS_PER_WINDOW"],
        ),
        (
            "rate_limit.window_secs",
            config.rate_limit.window_secs.to_string(),
            &["ZAM_RATE_LIMIT_WINDOW_SECS"],
        ),
        (
            "sizing.default_avg_price",
            config.sizing.default_avg_price.to_string(),
            &["ZAM_SIZING_DEFAULT_AVG_PRICE"],
        ),
        (
            "sizing.default_market_reach_pct",
            config.sizing.default_market_reach_pct.to_string(),
            &["ZAM_SIZING_DEFAULT_MARKET_REACH_PCT"],
        ),
        (
            "sizing.default_market_share_pct",
            config.sizing.default_market_share_pct.to_string(),
            &["ZAM_SIZING_DEFAULT_MARKET_SHARE_PCT"],
        ),
        ("logging.level", config.logging.level.clone(), &["ZAM_LOGGING_LEVEL", "ZAM_LOG_LEVEL"]),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            &["ZAM_LOGGING_FORMAT", "ZAM_LOG_FORMAT"],
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("zam.toml"), PathBuf::from("config/zam.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_key(key: Option<&str>) -> String {
    match key.map(str::trim) {
        Some(key) if !key.is_empty() => "<redacted>".to_string(),
        _ => "<unset>".to_string(),
    }
}
