//! Bot command handler.
//!
//! This module implements the `expense-bot run` command which connects to Discord and serves the
//! slash commands.

use crate::commands::Reply;
use crate::{bot, DiscordConfig, Result, Store};

/// Runs the Discord bot.
///
/// This launches a long-running process that only returns when the gateway connection ends or
/// the process receives Ctrl-C.
pub async fn run(store: Store, config: DiscordConfig) -> Result<Reply> {
    bot::run_bot(store, config).await?;
    Ok(Reply::message("Done running the Discord bot"))
}
