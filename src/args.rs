//! These structs provide the CLI interface for the expense bot.

use crate::Amount;
use clap::{Parser, Subcommand};
use std::str::FromStr;
use tracing::level_filters::LevelFilter;

/// expense-bot: A Discord bot that logs expenses to a Google sheet.
///
/// Every month gets its own tab in the spreadsheet, named YYYY-MM, which is created the first time
/// an expense is logged in that month. Users log expenses with the /expense slash command and see
/// a month's total with /report.
///
/// Configuration is read from the environment, and from a .env file in the working directory if
/// there is one:
///
/// - SPREADSHEET_ID: the ID or URL of the Google sheet
/// - GOOGLE_CREDENTIALS: Google authorized_user credentials as JSON
/// - DISCORD_TOKEN, CLIENT_ID and GUILD_ID: needed by the run command
///
/// Set EXPENSE_BOT_IN_TEST_MODE to a non-empty value to use an in-memory sheet instead of Google.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Connect to Discord and serve the /expense and /report slash commands until Ctrl-C.
    Run,
    /// Log an expense in the current month's sheet, the same way /expense does.
    Expense(ExpenseArgs),
    /// Print the total spent in a month, the same way /report does.
    Report(ReportArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG. See the tracing-subscriber EnvFilter docs for the syntax.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,
}

impl Common {
    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }
}

/// (Not shown): Args for the `expense-bot expense` command.
#[derive(Debug, Parser, Clone)]
pub struct ExpenseArgs {
    /// What the money was spent on.
    #[arg(long)]
    description: String,

    /// How much was spent. Must be greater than zero.
    #[arg(long, value_parser = parse_positive_amount)]
    amount: Amount,
}

impl ExpenseArgs {
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }
}

/// (Not shown): Args for the `expense-bot report` command.
#[derive(Debug, Parser, Clone)]
pub struct ReportArgs {
    /// The month to report on, as YYYY-MM. Defaults to the current month.
    #[arg(long)]
    month: Option<String>,
}

impl ReportArgs {
    pub fn month(&self) -> Option<&str> {
        self.month.as_deref()
    }
}

fn parse_positive_amount(s: &str) -> Result<Amount, String> {
    let amount = Amount::from_str(s).map_err(|e| format!("{e:#}"))?;
    if !amount.is_positive() {
        return Err(format!("the amount must be greater than zero, got {s}"));
    }
    Ok(amount)
}
