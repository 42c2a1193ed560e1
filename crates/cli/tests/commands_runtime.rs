use std::env;
use std::fs;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use zam_cli::commands::{config, estimate, migrate, seed};

const IN_MEMORY: &[(&str, &str)] =
    &[("ZAM_DATABASE_URL", "sqlite::memory:"), ("ZAM_DATABASE_MAX_CONNECTIONS", "1")];

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(IN_MEMORY, || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
        assert!(payload.get("data").is_none());
    });
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("ZAM_DATABASE_URL", "postgres://localhost/zam")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
        assert!(payload["message"].as_str().unwrap_or_default().contains("database.url"));
    });
}

#[test]
fn seed_reports_reference_counts() {
    with_env(IN_MEMORY, || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected seed success");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");
        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.contains("5 industries"), "unexpected message: {message}");
        assert!(message.contains("5 comparables"), "unexpected message: {message}");
    });
}

#[test]
fn seed_is_idempotent_against_a_file_database() {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = format!("sqlite://{}", dir.path().join("zam.db").display());

    with_env(&[("ZAM_DATABASE_URL", url.as_str())], || {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");

        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");
        let message = parse_payload(&second.output)["message"].as_str().unwrap_or_default().to_string();
        assert!(message.ends_with("(0 new rows)"), "unexpected message: {message}");
    });
}

#[test]
fn config_redacts_model_api_key_and_attributes_env() {
    with_env(
        &[
            ("ZAM_DATABASE_URL", "sqlite::memory:"),
            ("GEMINI_API_KEY", "AIza-super-secret"),
            ("ZAM_RATE_LIMIT_REQUESTS_PER_WINDOW", "7"),
        ],
        || {
            let output = config::run();

            assert!(!output.contains("super-secret"));
            assert!(output.contains("- llm.api_key = <redacted> (source: env (GEMINI_API_KEY))"));
            assert!(output
                .contains("- rate_limit.requests_per_window = 7 (source: env (ZAM_RATE_LIMIT_REQUESTS_PER_WINDOW))"));
            assert!(output.contains("- server.port = 5000 (source: default)"));
            assert!(output.contains("- sizing.default_market_share_pct = 2 (source: default)"));
        },
    );
}

#[test]
fn config_reports_unset_key() {
    with_env(IN_MEMORY, || {
        let output = config::run();
        assert!(output.contains("- llm.api_key = <unset> (source: default)"));
    });
}

#[test]
fn estimate_prints_baseline_for_wizard_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = dir.path().join("wizard.json");
    fs::write(
        &input,
        r#"{"formData": {"productName": "Ledgerly", "price": "100", "customerType": "b2b",
            "geography": "na", "maxEmployees": 20}}"#,
    )
    .expect("write wizard");

    with_env(&[], || {
        let result = estimate::run(&input);
        assert_eq!(result.exit_code, 0, "expected estimate success: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "estimate");
        assert_eq!(payload["message"], "TAM $4.20B / SAM $1.05B / SOM $21.00M");
        assert_eq!(payload["data"]["assumptions"]["totalAddressableUsers"], 42_000_000);
        assert_eq!(payload["data"]["logicSteps"][1], "Estimated 42,000,000 potential customers in NA.");
    });
}

#[test]
fn estimate_applies_configured_sizing() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = dir.path().join("wizard.json");
    fs::write(&input, r#"{"price": "100", "customerType": "b2b", "geography": "na", "maxEmployees": 20}"#)
        .expect("write wizard");

    with_env(&[("ZAM_SIZING_DEFAULT_MARKET_SHARE_PCT", "5")], || {
        let result = estimate::run(&input);
        assert_eq!(result.exit_code, 0, "expected estimate success: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["message"], "TAM $4.20B / SAM $1.05B / SOM $52.50M");
        assert_eq!(payload["data"]["assumptions"]["marketShare"], 5.0);
    });
}

#[test]
fn estimate_rejects_out_of_range_sizing() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = dir.path().join("wizard.json");
    fs::write(&input, r#"{"price": "100"}"#).expect("write wizard");

    with_env(&[("ZAM_SIZING_DEFAULT_MARKET_REACH_PCT", "250")], || {
        let result = estimate::run(&input);
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "config_validation");
        assert!(payload["message"].as_str().unwrap_or_default().contains("sizing.default_market_reach_pct"));
    });
}

#[test]
fn estimate_accepts_bare_wizard_answers() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = dir.path().join("bare.json");
    fs::write(&input, r#"{"productName": "Ledgerly", "industry": "fintech"}"#).expect("write");

    with_env(&[], || {
        let result = estimate::run(&input);
        assert_eq!(result.exit_code, 0, "expected estimate success: {}", result.output);
        assert!(parse_payload(&result.output)["data"]["metrics"]["tam"].as_f64().unwrap_or(0.0) > 0.0);
    });
}

#[test]
fn estimate_reports_missing_input_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let missing = dir.path().join("absent.json");

    with_env(&[], || {
        let result = estimate::run(&missing);
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "invalid_input");
        assert!(payload["message"].as_str().unwrap_or_default().contains("absent.json"));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    let keys = [
        "ZAM_DATABASE_URL",
        "ZAM_DATABASE_MAX_CONNECTIONS",
        "ZAM_DATABASE_TIMEOUT_SECS",
        "ZAM_LLM_API_KEY",
        "GEMINI_API_KEY",
        "ZAM_LLM_BASE_URL",
        "ZAM_LLM_MODELS",
        "ZAM_LLM_RETRIES_PER_MODEL",
        "ZAM_LLM_RATE_LIMIT_BACKOFF_MS",
        "ZAM_LLM_REQUEST_TIMEOUT_SECS",
        "ZAM_LLM_DEADLINE_SECS",
        "ZAM_SERVER_BIND_ADDRESS",
        "ZAM_SERVER_PORT",
        "PORT",
        "ZAM_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "ZAM_SERVER_CORS_ALLOW_ANY",
        "ZAM_RATE_LIMIT_ENABLED",
        "ZAM_RATE_LIMIT_REQUESTS_PER_WINDOW",
        "ZAM_RATE_LIMIT_WINDOW_SECS",
        "ZAM_SIZING_DEFAULT_AVG_PRICE",
        "ZAM_SIZING_DEFAULT_MARKET_REACH_PCT",
        "ZAM_SIZING_DEFAULT_MARKET_SHARE_PCT",
        "ZAM_LOGGING_LEVEL",
        "ZAM_LOGGING_FORMAT",
        "ZAM_LOG_LEVEL",
        "ZAM_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
