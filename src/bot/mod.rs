//! Discord bot implementation.
//!
//! This module connects to the Discord gateway, registers the `expense` and `report` slash commands
//! on the configured guild and answers command interactions using the platform-free handlers in
//! `crate::commands`.

mod interaction;

use crate::commands::{self, CommandName};
use crate::error::{ErrorType, IntoResult};
use crate::{DiscordConfig, Store};
use chrono::Local;
use serenity::all::{
    ApplicationId, Client, CommandInteraction, Context, EventHandler, GatewayIntents, GuildId,
    Interaction, Ready,
};
use tracing::{debug, error, info, warn};

/// The Discord event handler.
#[derive(Debug, Clone)]
pub(crate) struct ExpenseBot {
    store: Store,
    guild_id: GuildId,
}

impl ExpenseBot {
    pub(crate) fn new(store: Store, guild_id: GuildId) -> Self {
        Self { store, guild_id }
    }

    async fn on_command(&self, ctx: &Context, command: &CommandInteraction) {
        let name = match command.data.name.parse::<CommandName>() {
            Ok(name) => name,
            Err(_) => {
                debug!("Ignoring unknown command '{}'", command.data.name);
                return;
            }
        };
        info!(
            "Received /{name} from {} in guild {:?}",
            command.user.tag(),
            command.guild_id
        );

        let reply = match interaction::parse_request(name, &command.data.options) {
            Ok(request) => commands::handle(&self.store, request, Local::now()).await,
            Err(e) => {
                commands::log_failure(name, ErrorType::Validation, &format!("{e:#}"));
                commands::Reply::failure()
            }
        };
        interaction::respond(ctx, command, &reply).await;
    }
}

#[async_trait::async_trait]
impl EventHandler for ExpenseBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("Logged in as {}", ready.user.tag());
        match self
            .guild_id
            .set_commands(&ctx.http, interaction::command_definitions())
            .await
        {
            Ok(registered) => info!(
                "Registered {} command(s) on guild {}",
                registered.len(),
                self.guild_id
            ),
            Err(e) => error!("Unable to register commands on guild {}: {e}", self.guild_id),
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(command) => self.on_command(&ctx, &command).await,
            other => debug!("Ignoring {:?} interaction", other.kind()),
        }
    }
}

/// Runs the bot until the gateway connection ends or Ctrl-C is pressed.
///
/// # Arguments
/// - `store`: The spreadsheet store shared by all command invocations
/// - `config`: The Discord token, application ID and guild ID
///
pub(crate) async fn run_bot(store: Store, config: DiscordConfig) -> crate::Result<()> {
    let bot = ExpenseBot::new(store, GuildId::new(config.guild_id().get()));
    info!("Starting Discord bot...");

    let mut client = Client::builder(config.token(), GatewayIntents::GUILDS)
        .application_id(ApplicationId::new(config.application_id().get()))
        .event_handler(bot)
        .await
        .pub_result(ErrorType::Platform)?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl-C, shutting down");
                shard_manager.shutdown_all().await;
            }
            Err(e) => warn!("Unable to listen for Ctrl-C: {e}"),
        }
    });

    client.start().await.pub_result(ErrorType::Platform)?;
    info!("Discord bot shut down");
    Ok(())
}
