pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "sarthi",
    about = "Agri-Sarthi operator CLI",
    long_about = "Inspect configuration, check readiness, prepare the knowledge database, and ask the advisory pipeline questions.",
    after_help = "Examples:\n  sarthi doctor --json\n  sarthi seed\n  sarthi ask --message \"सरसों के लिए सिंचाई?\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Upsert the curated Jaipur rabi knowledge entries and verify them")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, database, knowledge table and inference endpoint")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Run one question through the full advisory pipeline")]
    Ask {
        #[arg(long, help = "Question text, in Hindi or English")]
        message: String,
        #[arg(long, help = "Location label; defaults to pipeline.default_location")]
        location: Option<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Ask { message, location } => {
            commands::ask::run(&message, location.as_deref().unwrap_or_default())
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
