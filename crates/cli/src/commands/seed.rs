use crate::commands::{current_thread_runtime, load_config, CommandFailure, CommandResult};
use sarthi_db::{connect_with_settings, migrations, KnowledgeSeedDataset};

pub fn run() -> CommandResult {
    match execute() {
        Ok(entries) => {
            let lines = entries.iter().map(|label| format!("  - {label}")).collect::<Vec<_>>();
            let message = format!(
                "knowledge seed loaded {} curated entries:\n{}",
                entries.len(),
                lines.join("\n")
            );
            CommandResult::success("seed", message)
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn execute() -> Result<Vec<String>, CommandFailure> {
    let config = load_config()?;
    let runtime = current_thread_runtime()?;

    runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let seed_result = KnowledgeSeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = KnowledgeSeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        pool.close().await;

        if verification.all_present {
            Ok(seed_result.entries_seeded)
        } else {
            Err(("seed_verification", verification_message(&verification.checks), 6u8))
        }
    })
}

fn verification_message(checks: &[(String, bool)]) -> String {
    let failed_checks = checks
        .iter()
        .filter_map(|(check, passed)| (!passed).then_some(check.as_str()))
        .collect::<Vec<_>>();
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
