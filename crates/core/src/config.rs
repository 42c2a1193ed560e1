use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sizing::SizingConstants;

pub const DEFAULT_MODELS: [&str; 4] =
    ["gemini-2.5-flash", "gemini-2.5-pro", "gemini-2.0-flash", "gemini-1.5-flash"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
    /// Estimator heuristics; region factors are replaced by reference data.
    pub sizing: SizingConstants,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub models: Vec<String>,
    pub retries_per_model: u32,
    pub rate_limit_backoff_ms: u64,
    pub request_timeout_secs: u64,
    pub deadline_secs: u64,
}

impl LlmConfig {
    /// A blank key counts as absent.
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_ref().is_some_and(|key| !key.expose_secret().trim().is_empty())
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
    pub cors_allow_any: bool,
}

#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_window: u32,
    pub window_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub server_port: Option<u16>,
    pub rate_limit_enabled: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://zam.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                api_key: None,
                base_url: "https://generativelanguage.googleapis.com".to_string(),
                models: DEFAULT_MODELS.iter().map(|model| model.to_string()).collect(),
                retries_per_model: 1,
                rate_limit_backoff_ms: 1000,
                request_timeout_secs: 30,
                deadline_secs: 45,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 5000,
                graceful_shutdown_secs: 15,
                cors_allow_any: true,
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                requests_per_window: 3,
                window_secs: 24 * 60 * 60,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
            sizing: SizingConstants::default(),
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("zam.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(api_key) = llm.api_key {
                self.llm.api_key = Some(secret_value(api_key));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(models) = llm.models {
                self.llm.models = models;
            }
            if let Some(retries) = llm.retries_per_model {
                self.llm.retries_per_model = retries;
            }
            if let Some(backoff) = llm.rate_limit_backoff_ms {
                self.llm.rate_limit_backoff_ms = backoff;
            }
            if let Some(timeout) = llm.request_timeout_secs {
                self.llm.request_timeout_secs = timeout;
            }
            if let Some(deadline) = llm.deadline_secs {
                self.llm.deadline_secs = deadline;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
            if let Some(cors_allow_any) = server.cors_allow_any {
                self.server.cors_allow_any = cors_allow_any;
            }
        }

        if let Some(rate_limit) = patch.rate_limit {
            if let Some(enabled) = rate_limit.enabled {
                self.rate_limit.enabled = enabled;
            }
            if let Some(requests) = rate_limit.requests_per_window {
                self.rate_limit.requests_per_window = requests;
            }
            if let Some(window_secs) = rate_limit.window_secs {
                self.rate_limit.window_secs = window_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        if let Some(sizing) = patch.sizing {
            let target = &mut self.sizing;
            let numbers = [
                (sizing.consumer_base, &mut target.consumer_base),
                (sizing.business_base, &mut target.business_base),
                (sizing.small_business_share, &mut target.small_business_share),
                (sizing.mid_market_share, &mut target.mid_market_share),
                (sizing.enterprise_share, &mut target.enterprise_share),
                (sizing.default_avg_price, &mut target.default_avg_price),
                (sizing.default_market_reach_pct, &mut target.default_market_reach_pct),
                (sizing.default_market_share_pct, &mut target.default_market_share_pct),
            ];
            for (value, slot) in numbers {
                if let Some(value) = value {
                    *slot = value;
                }
            }
            if let Some(threshold) = sizing.small_business_max_employees {
                target.small_business_max_employees = threshold;
            }
            if let Some(threshold) = sizing.enterprise_min_employees {
                target.enterprise_min_employees = threshold;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("ZAM_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("ZAM_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("ZAM_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("ZAM_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("ZAM_DATABASE_TIMEOUT_SECS", &value)?;
        }

        // The conventional provider variable is honoured but the prefixed one wins.
        let api_key = read_env("ZAM_LLM_API_KEY").or_else(|| read_env("GEMINI_API_KEY"));
        if let Some(value) = api_key {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("ZAM_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("ZAM_LLM_MODELS") {
            self.llm.models = value
                .split(',')
                .map(str::trim)
                .filter(|model| !model.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(value) = read_env("ZAM_LLM_RETRIES_PER_MODEL") {
            self.llm.retries_per_model = parse_u32("ZAM_LLM_RETRIES_PER_MODEL", &value)?;
        }
        if let Some(value) = read_env("ZAM_LLM_RATE_LIMIT_BACKOFF_MS") {
            self.llm.rate_limit_backoff_ms = parse_u64("ZAM_LLM_RATE_LIMIT_BACKOFF_MS", &value)?;
        }
        if let Some(value) = read_env("ZAM_LLM_REQUEST_TIMEOUT_SECS") {
            self.llm.request_timeout_secs = parse_u64("ZAM_LLM_REQUEST_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("ZAM_LLM_DEADLINE_SECS") {
            self.llm.deadline_secs = parse_u64("ZAM_LLM_DEADLINE_SECS", &value)?;
        }

        if let Some(value) = read_env("ZAM_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        let port = read_env("ZAM_SERVER_PORT").map(|value| ("ZAM_SERVER_PORT", value));
        let port = port.or_else(|| read_env("PORT").map(|value| ("PORT", value)));
        if let Some((key, value)) = port {
            self.server.port = parse_u16(key, &value)?;
        }
        if let Some(value) = read_env("ZAM_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("ZAM_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }
        if let Some(value) = read_env("ZAM_SERVER_CORS_ALLOW_ANY") {
            self.server.cors_allow_any = parse_bool("ZAM_SERVER_CORS_ALLOW_ANY", &value)?;
        }

        if let Some(value) = read_env("ZAM_RATE_LIMIT_ENABLED") {
            self.rate_limit.enabled = parse_bool("ZAM_RATE_LIMIT_ENABLED", &value)?;
        }
        if let Some(value) = read_env("ZAM_RATE_LIMIT_REQUESTS_PER_WINDOW") {
            self.rate_limit.requests_per_window =
                parse_u32("ZAM_RATE_LIMIT_REQUESTS_PER_WINDOW", &value)?;
        }
        if let Some(value) = read_env("ZAM_RATE_LIMIT_WINDOW_SECS") {
            self.rate_limit.window_secs = parse_u64("ZAM_RATE_LIMIT_WINDOW_SECS", &value)?;
        }

        for (key, target) in [
            ("ZAM_SIZING_DEFAULT_AVG_PRICE", &mut self.sizing.default_avg_price),
            ("ZAM_SIZING_DEFAULT_MARKET_REACH_PCT", &mut self.sizing.default_market_reach_pct),
            ("ZAM_SIZING_DEFAULT_MARKET_SHARE_PCT", &mut self.sizing.default_market_share_pct),
        ] {
            if let Some(value) = read_env(key) {
                *target = parse_f64(key, &value)?;
            }
        }

        let log_level = read_env("ZAM_LOGGING_LEVEL").or_else(|| read_env("ZAM_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("ZAM_LOGGING_FORMAT").or_else(|| read_env("ZAM_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(api_key));
        }
        if let Some(base_url) = overrides.llm_base_url {
            self.llm.base_url = base_url;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(enabled) = overrides.rate_limit_enabled {
            self.rate_limit.enabled = enabled;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_llm(&self.llm)?;
        validate_server(&self.server)?;
        validate_rate_limit(&self.rate_limit)?;
        validate_logging(&self.logging)?;
        validate_sizing(&self.sizing)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("zam.toml"), PathBuf::from("config/zam.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || !matches!(chars.peek(), Some('{')) {
            output.push(ch);
            continue;
        }
        chars.next();

        let mut key = String::new();
        loop {
            match chars.next() {
                Some('}') => break,
                Some(next) => key.push(next),
                None => return Err(ConfigError::UnterminatedInterpolation),
            }
        }

        let value =
            env::var(&key).map_err(|_| ConfigError::MissingEnvInterpolation { var: key })?;
        output.push_str(&value);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    let base_url = llm.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "llm.base_url must start with http:// or https://".to_string(),
        ));
    }

    if llm.models.iter().all(|model| model.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "llm.models must name at least one model".to_string(),
        ));
    }

    if llm.retries_per_model > 5 {
        return Err(ConfigError::Validation(
            "llm.retries_per_model must be in range 0..=5".to_string(),
        ));
    }

    if llm.request_timeout_secs == 0 || llm.request_timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.request_timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if llm.deadline_secs == 0 || llm.deadline_secs > 600 {
        return Err(ConfigError::Validation(
            "llm.deadline_secs must be in range 1..=600".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_rate_limit(rate_limit: &RateLimitConfig) -> Result<(), ConfigError> {
    if !rate_limit.enabled {
        return Ok(());
    }

    if rate_limit.requests_per_window == 0 {
        return Err(ConfigError::Validation(
            "rate_limit.requests_per_window must be greater than zero".to_string(),
        ));
    }

    if rate_limit.window_secs == 0 {
        return Err(ConfigError::Validation(
            "rate_limit.window_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn validate_sizing(sizing: &SizingConstants) -> Result<(), ConfigError> {
    for (key, value) in [
        ("sizing.consumer_base", sizing.consumer_base),
        ("sizing.business_base", sizing.business_base),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigError::Validation(format!("{key} must be a non-negative number")));
        }
    }

    let bounded = [
        ("sizing.small_business_share", sizing.small_business_share, 1.0),
        ("sizing.mid_market_share", sizing.mid_market_share, 1.0),
        ("sizing.enterprise_share", sizing.enterprise_share, 1.0),
        ("sizing.default_market_reach_pct", sizing.default_market_reach_pct, 100.0),
        ("sizing.default_market_share_pct", sizing.default_market_share_pct, 100.0),
    ];
    for (key, value, max) in bounded {
        if !(0.0..=max).contains(&value) {
            return Err(ConfigError::Validation(format!("{key} must be between 0 and {max}")));
        }
    }

    if !sizing.default_avg_price.is_finite() || sizing.default_avg_price <= 0.0 {
        return Err(ConfigError::Validation(
            "sizing.default_avg_price must be a positive number".to_string(),
        ));
    }

    if sizing.small_business_max_employees > sizing.enterprise_min_employees {
        return Err(ConfigError::Validation(
            "sizing.small_business_max_employees must not exceed sizing.enterprise_min_employees"
                .to_string(),
        ));
    }

    Ok(())
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.trim().parse::<u16>().map_err(|_| invalid_override(key, value))
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| invalid_override(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().parse::<bool>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    llm: Option<LlmPatch>,
    server: Option<ServerPatch>,
    rate_limit: Option<RateLimitPatch>,
    logging: Option<LoggingPatch>,
    sizing: Option<SizingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    models: Option<Vec<String>>,
    retries_per_model: Option<u32>,
    rate_limit_backoff_ms: Option<u64>,
    request_timeout_secs: Option<u64>,
    deadline_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
    cors_allow_any: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct RateLimitPatch {
    enabled: Option<bool>,
    requests_per_window: Option<u32>,
    window_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct SizingPatch {
    consumer_base: Option<f64>,
    business_base: Option<f64>,
    small_business_max_employees: Option<u32>,
    enterprise_min_employees: Option<u32>,
    small_business_share: Option<f64>,
    mid_market_share: Option<f64>,
    enterprise_share: Option<f64>,
    default_avg_price: Option<f64>,
    default_market_reach_pct: Option<f64>,
    default_market_share_pct: Option<f64>,
}
