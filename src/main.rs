use chrono::Local;
use clap::Parser;
use expense_bot::args::{Args, Command};
use expense_bot::commands::{self, CommandRequest};
use expense_bot::{Config, DiscordConfig, Mode, Result, Store};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine; the environment may already be set.
    let dotenv = dotenvy::dotenv();

    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());
    match dotenv {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) => trace!("No .env file loaded: {e}"),
    }

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");

    // This allows for running the program without hitting the Google APIs. When
    // EXPENSE_BOT_IN_TEST_MODE is set and non-zero in length, then the mode will be Mode::Testing,
    // otherwise it will be Mode::Google.
    let mode = Mode::from_env();

    // Route to appropriate command handler
    let _: () = match args.command() {
        Command::Run => {
            // Everything is validated before connecting to anything.
            let config = Config::from_env()?;
            let discord = DiscordConfig::from_env()?;
            let store = Store::new(config, mode)?;
            commands::run(store, discord).await?.print()
        }

        Command::Expense(expense_args) => {
            let store = Store::new(Config::from_env()?, mode)?;
            let request = CommandRequest::Expense {
                description: expense_args.description().to_string(),
                amount: expense_args.amount(),
            };
            commands::execute(&store, request, Local::now())
                .await?
                .print()
        }

        Command::Report(report_args) => {
            let store = Store::new(Config::from_env()?, mode)?;
            let request = CommandRequest::Report {
                month: report_args.month().map(str::to_string),
            };
            commands::execute(&store, request, Local::now())
                .await?
                .print()
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
