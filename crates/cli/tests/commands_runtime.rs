use std::env;
use std::sync::{Mutex, OnceLock};

use sarthi_cli::commands::{ask, doctor, migrate, seed};
use serde_json::Value;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("SARTHI_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_invalid_timeout() {
    with_env(
        &[("SARTHI_DATABASE_URL", "sqlite::memory:"), ("SARTHI_PIPELINE_CALL_TIMEOUT_MS", "abc")],
        || {
            let result = migrate::run();
            assert_eq!(result.exit_code, 2, "expected config validation failure code");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["status"], "error");
            assert_eq!(payload["error_class"], "config_validation");
        },
    );
}

#[test]
fn seed_lists_curated_entries_and_is_idempotent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}", dir.path().join("seed.db").display());

    with_env(&[("SARTHI_DATABASE_URL", &url)], || {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");
        let first_payload = parse_payload(&first.output);
        assert_eq!(first_payload["command"], "seed");
        assert_eq!(first_payload["status"], "ok");

        let message = first_payload["message"].as_str().unwrap_or("");
        assert!(message.contains("  - mustard/irrigation/*"));
        assert!(message.contains("  - mustard/irrigation/flowering"));
        assert!(message.contains("  - wheat/pest/*"));

        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");
        assert_eq!(first_payload["message"], parse_payload(&second.output)["message"]);
    });
}

#[test]
fn ask_answers_seeded_question_from_knowledge() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}", dir.path().join("ask.db").display());

    with_env(&[("SARTHI_DATABASE_URL", &url), ("SARTHI_LLM_PROVIDER", "disabled")], || {
        assert_eq!(seed::run().exit_code, 0);

        let result = ask::run("सरसों के लिए सिंचाई?", "");
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "ask");
        assert_eq!(payload["data"]["origin"], "knowledge");
        assert_eq!(payload["data"]["crop"], "mustard");
        assert_eq!(payload["data"]["location"], "Jaipur, Rajasthan");
        assert!(payload["message"].as_str().unwrap_or("").contains("25-30"));
    });
}

#[test]
fn ask_without_any_source_returns_static_fallback() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}", dir.path().join("empty.db").display());

    with_env(&[("SARTHI_DATABASE_URL", &url), ("SARTHI_LLM_PROVIDER", "disabled")], || {
        let result = ask::run("asdf qwerty zzz", "Kota");
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["origin"], "static_fallback");
        assert_eq!(payload["data"]["topic"], "other");
        assert_eq!(payload["data"]["states"][0], "Received");
        assert_eq!(payload["data"]["states"].as_array().map(Vec::len), Some(5));
    });
}

#[test]
fn doctor_flags_empty_knowledge_table() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}", dir.path().join("doctor.db").display());

    with_env(&[("SARTHI_DATABASE_URL", &url), ("SARTHI_LLM_PROVIDER", "disabled")], || {
        assert_eq!(migrate::run().exit_code, 0);

        let result = doctor::run(true);
        assert_eq!(result.exit_code, 1);

        let report = parse_payload(&result.output);
        assert_eq!(report["overall_status"], "fail");
        let checks = report["checks"].as_array().cloned().unwrap_or_default();
        let status_of = |name: &str| {
            checks
                .iter()
                .find(|check| check["name"] == name)
                .map(|check| check["status"].clone())
                .unwrap_or(Value::Null)
        };
        assert_eq!(status_of("database_connectivity"), "pass");
        assert_eq!(status_of("knowledge_table"), "fail");
        assert_eq!(status_of("inference_endpoint"), "skipped");

        assert_eq!(seed::run().exit_code, 0);
        assert_eq!(doctor::run(true).exit_code, 0);
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "SARTHI_DATABASE_URL",
        "SARTHI_DATABASE_MAX_CONNECTIONS",
        "SARTHI_DATABASE_TIMEOUT_SECS",
        "SARTHI_LLM_PROVIDER",
        "SARTHI_LLM_BASE_URL",
        "SARTHI_LLM_MODEL",
        "SARTHI_MARKET_SECONDARY",
        "SARTHI_MARKET_SECONDARY_URL",
        "SARTHI_MARKET_SECONDARY_API_KEY",
        "SARTHI_PIPELINE_CALL_TIMEOUT_MS",
        "SARTHI_PIPELINE_DEFAULT_LOCATION",
        "SARTHI_INTENT_KEYWORDS_PATH",
        "SARTHI_DELIVERY_GATEWAY_URL",
        "SARTHI_DELIVERY_GATEWAY_TOKEN",
        "SARTHI_LOGGING_LEVEL",
        "SARTHI_LOGGING_FORMAT",
        "SARTHI_LOG_LEVEL",
        "SARTHI_LOG_FORMAT",
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
