use std::time::Duration;

use crate::commands::CommandResult;
use sarthi_agent::OllamaClient;
use sarthi_core::config::{AppConfig, LlmProvider, LoadOptions};
use sarthi_db::{connect_with_settings, ping, KnowledgeRepository, SqlKnowledgeRepository};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Fail { 1 } else { 0 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => {
                    let (database, knowledge) = runtime.block_on(check_database(&config));
                    checks.push(database);
                    checks.push(knowledge);
                    checks.push(runtime.block_on(check_inference_endpoint(&config)));
                }
                Err(error) => {
                    for name in ["database_connectivity", "knowledge_table", "inference_endpoint"] {
                        checks.push(DoctorCheck {
                            name,
                            status: CheckStatus::Fail,
                            details: format!("failed to initialize async runtime: {error}"),
                        });
                    }
                }
            }
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["database_connectivity", "knowledge_table", "inference_endpoint"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let any_failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if any_failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if any_failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

async fn check_database(config: &AppConfig) -> (DoctorCheck, DoctorCheck) {
    let pool = match connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    {
        Ok(pool) => pool,
        Err(error) => {
            return (
                DoctorCheck {
                    name: "database_connectivity",
                    status: CheckStatus::Fail,
                    details: format!("failed to connect to database: {error}"),
                },
                DoctorCheck {
                    name: "knowledge_table",
                    status: CheckStatus::Skipped,
                    details: "skipped because the database is unreachable".to_string(),
                },
            );
        }
    };

    let database = match ping(&pool).await {
        Ok(()) => DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Pass,
            details: format!("connected using `{}`", config.database.url),
        },
        Err(error) => DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Fail,
            details: format!("database query failed: {error}"),
        },
    };

    let knowledge = match SqlKnowledgeRepository::new(pool.clone()).count().await {
        Ok(0) => DoctorCheck {
            name: "knowledge_table",
            status: CheckStatus::Fail,
            details: "knowledge table is empty; run `sarthi seed`".to_string(),
        },
        Ok(count) => DoctorCheck {
            name: "knowledge_table",
            status: CheckStatus::Pass,
            details: format!("{count} knowledge entries"),
        },
        Err(error) => DoctorCheck {
            name: "knowledge_table",
            status: CheckStatus::Fail,
            details: format!("knowledge table unreadable ({error}); run `sarthi migrate`"),
        },
    };

    pool.close().await;
    (database, knowledge)
}

async fn check_inference_endpoint(config: &AppConfig) -> DoctorCheck {
    if config.llm.provider == LlmProvider::Disabled {
        return DoctorCheck {
            name: "inference_endpoint",
            status: CheckStatus::Skipped,
            details: "generative provider disabled; unanswered questions get the static reply"
                .to_string(),
        };
    }

    let client = OllamaClient::new(
        &config.llm.base_url,
        &config.llm.model,
        Duration::from_secs(config.llm.timeout_secs.min(5)),
    );
    let outcome = match client {
        Ok(client) => client.model_available().await,
        Err(error) => Err(error),
    };

    match outcome {
        Ok(true) => DoctorCheck {
            name: "inference_endpoint",
            status: CheckStatus::Pass,
            details: format!("model `{}` is available at {}", config.llm.model, config.llm.base_url),
        },
        Ok(false) => DoctorCheck {
            name: "inference_endpoint",
            status: CheckStatus::Fail,
            details: format!("model `{}` is not pulled on {}", config.llm.model, config.llm.base_url),
        },
        Err(error) => DoctorCheck {
            name: "inference_endpoint",
            status: CheckStatus::Fail,
            details: format!("inference endpoint unreachable: {error:#}"),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
