//! Command handlers for the expense bot.
//!
//! This module contains the platform-free implementations of the `expense` and `report` commands,
//! and the `run` command that serves them over Discord.

mod expense;
mod report;
mod run;

use crate::error::ErrorType;
use crate::{Amount, Result, SheetName, Store};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

pub use expense::expense;
pub use report::report;
pub use run::run;

/// Sent when anything goes wrong while handling a command.
pub const GENERIC_FAILURE: &str = "An error occurred while processing your command.";

/// The names of the commands users can invoke.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandName {
    Expense,
    Report,
}

serde_plain::derive_display_from_serialize!(CommandName);
serde_plain::derive_fromstr_from_deserialize!(CommandName);

/// A command invocation with its options already extracted from the chat platform or the CLI.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandRequest {
    /// Log an expense in the current month's sheet.
    Expense { description: String, amount: Amount },
    /// Report the total of a month. `None` means the current month.
    Report { month: Option<String> },
}

impl CommandRequest {
    pub fn name(&self) -> CommandName {
        match self {
            CommandRequest::Expense { .. } => CommandName::Expense,
            CommandRequest::Report { .. } => CommandName::Report,
        }
    }
}

/// The output of a command. This lets the commands return a consistent reply to both the chat
/// platform and the command line.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Reply {
    /// A plain text reply. Ephemeral replies are only shown to the user who issued the command.
    Message { content: String, ephemeral: bool },
    /// A monthly total, rendered as a rich embed on Discord.
    Report { month: SheetName, total: Amount },
}

impl Reply {
    /// A plain reply visible to everyone in the channel.
    pub fn message(content: impl Into<String>) -> Self {
        Reply::Message {
            content: content.into(),
            ephemeral: false,
        }
    }

    /// A plain reply only the invoking user sees.
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Reply::Message {
            content: content.into(),
            ephemeral: true,
        }
    }

    /// The reply sent when a command fails.
    pub fn failure() -> Self {
        Self::ephemeral(GENERIC_FAILURE)
    }

    pub fn is_ephemeral(&self) -> bool {
        matches!(self, Reply::Message { ephemeral: true, .. })
    }

    /// The embed title, for replies that are rendered as embeds.
    pub fn title(&self) -> Option<String> {
        match self {
            Reply::Message { .. } => None,
            Reply::Report { month, .. } => Some(format!("Expense Report for {month}")),
        }
    }

    /// The text of the reply, or the body of the embed.
    pub fn body(&self) -> String {
        match self {
            Reply::Message { content, .. } => content.clone(),
            Reply::Report { total, .. } => format!("Total spent: {total}"),
        }
    }

    /// The whole reply as plain text.
    pub fn content(&self) -> String {
        match self.title() {
            Some(title) => format!("{title}\n{}", self.body()),
            None => self.body(),
        }
    }

    /// Print the reply to `info!` and its structure as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.content());
        if let Ok(json) = serde_json::to_string_pretty(self) {
            debug!("Command output:\n\n{json}\n\n");
        }
    }
}

/// Runs `request` as of `now`, returning any error to the caller.
pub async fn execute(store: &Store, request: CommandRequest, now: DateTime<Local>) -> Result<Reply> {
    match request {
        CommandRequest::Expense {
            description,
            amount,
        } => expense(store, &description, amount, now).await,
        CommandRequest::Report { month } => report(store, month.as_deref(), now).await,
    }
}

/// Runs `request` as of `now`. Errors are logged and answered with the generic failure reply; they
/// are never retried.
pub async fn handle(store: &Store, request: CommandRequest, now: DateTime<Local>) -> Reply {
    let name = request.name();
    match execute(store, request, now).await {
        Ok(reply) => reply,
        Err(e) => {
            log_failure(name, e.error_type(), &e);
            Reply::failure()
        }
    }
}

pub(crate) fn log_failure(name: CommandName, error_type: ErrorType, e: &dyn std::fmt::Display) {
    error!(command = %name, error_type = %error_type, "Error processing command: {e}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Call;
    use crate::test::TestEnv;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn march() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_reply_strings() {
        let reply = Reply::Report {
            month: SheetName::from_str("2024-03").unwrap(),
            total: Amount::from_str("30.25").unwrap(),
        };
        assert_eq!(reply.title().as_deref(), Some("Expense Report for 2024-03"));
        assert_eq!(reply.body(), "Total spent: Rs30.25");
        assert_eq!(reply.content(), "Expense Report for 2024-03\nTotal spent: Rs30.25");
        assert!(!reply.is_ephemeral());

        let failure = Reply::failure();
        assert!(failure.is_ephemeral());
        assert_eq!(failure.title(), None);
        assert_eq!(failure.content(), GENERIC_FAILURE);
    }

    #[test]
    fn test_command_names() {
        assert_eq!(CommandName::Expense.to_string(), "expense");
        assert_eq!(CommandName::from_str("report").unwrap(), CommandName::Report);
        assert!(CommandName::from_str("ping").is_err());
        let request = CommandRequest::Report { month: None };
        assert_eq!(request.name(), CommandName::Report);
    }

    #[tokio::test]
    async fn test_handle_converts_errors_to_generic_failure() {
        let env = TestEnv::new();
        env.fail_with("quota exceeded");
        let request = CommandRequest::Expense {
            description: "lunch".to_string(),
            amount: Amount::from_str("12.5").unwrap(),
        };
        let reply = handle(env.store(), request, march()).await;
        assert_eq!(reply, Reply::failure());
        // Not retried.
        assert_eq!(env.calls(), vec![Call::Titles]);
    }

    #[tokio::test]
    async fn test_execute_propagates_errors() {
        let env = TestEnv::new();
        env.fail_with("quota exceeded");
        let err = execute(
            env.store(),
            CommandRequest::Report {
                month: Some("2024-03".to_string()),
            },
            march(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Store);
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_handle_passes_replies_through() {
        let env = TestEnv::with_sheets(&[(
            "2024-03",
            &[&["Timestamp", "Description", "Amount"], &["t", "a", "10"]],
        )]);
        let reply = handle(env.store(), CommandRequest::Report { month: None }, march()).await;
        assert_eq!(reply.body(), "Total spent: Rs10.00");
    }
}
