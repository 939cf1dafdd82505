//! Converting between Discord interactions and the platform-free command types.

use crate::commands::{CommandName, CommandRequest, Reply};
use crate::error::Res;
use crate::Amount;
use anyhow::{anyhow, bail, Context as _};
use rust_decimal::Decimal;
use serenity::all::{
    Colour, CommandDataOption, CommandDataOptionValue, CommandInteraction, CommandOptionType,
    Context, CreateCommand, CreateCommandOption, CreateEmbed, CreateEmbedFooter,
    CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateInteractionResponseMessage, Timestamp,
};
use tracing::{debug, error, warn};

const DESCRIPTION: &str = "description";
const AMOUNT: &str = "amount";
const MONTH: &str = "month";

/// The smallest amount Discord lets through.
const MIN_AMOUNT: f64 = 0.01;

/// Discord's green.
const REPORT_COLOUR: Colour = Colour::new(0x57F287);
const FOOTER: &str = "Expense Tracker Bot";

/// The slash commands registered on the guild.
pub(super) fn command_definitions() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new(CommandName::Expense.to_string())
            .description("Log an expense")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    DESCRIPTION,
                    "What the money was spent on",
                )
                .required(true),
            )
            .add_option(
                CreateCommandOption::new(CommandOptionType::Number, AMOUNT, "How much was spent")
                    .required(true)
                    .min_number_value(MIN_AMOUNT),
            ),
        CreateCommand::new(CommandName::Report.to_string())
            .description("Get the total spent in a month")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    MONTH,
                    "The month as YYYY-MM, defaults to the current month",
                )
                .required(false),
            ),
    ]
}

/// Extracts the `CommandRequest` for `name` from the interaction's options.
pub(super) fn parse_request(
    name: CommandName,
    options: &[CommandDataOption],
) -> Res<CommandRequest> {
    let options: Vec<(&str, &CommandDataOptionValue)> = options
        .iter()
        .map(|o| (o.name.as_str(), &o.value))
        .collect();
    parse_options(name, &options)
}

fn parse_options(
    name: CommandName,
    options: &[(&str, &CommandDataOptionValue)],
) -> Res<CommandRequest> {
    let find = |key: &str| {
        options
            .iter()
            .find(|(option, _)| *option == key)
            .map(|(_, value)| *value)
    };

    match name {
        CommandName::Expense => {
            let description = find(DESCRIPTION)
                .and_then(|v| v.as_str())
                .ok_or_else(|| anyhow!("Missing the {DESCRIPTION} option"))?
                .to_string();
            let amount = match find(AMOUNT) {
                Some(CommandDataOptionValue::Number(n)) => Amount::try_from(*n)?,
                // Integer options are accepted too in case the command was registered differently.
                Some(CommandDataOptionValue::Integer(n)) => Amount::from(Decimal::from(*n)),
                Some(other) => bail!("The {AMOUNT} option is not a number: {other:?}"),
                None => bail!("Missing the {AMOUNT} option"),
            };
            if !amount.is_positive() {
                bail!("The {AMOUNT} option must be positive, got {}", amount.value());
            }
            Ok(CommandRequest::Expense {
                description,
                amount,
            })
        }
        CommandName::Report => {
            let month = match find(MONTH) {
                None => None,
                Some(value) => Some(
                    value
                        .as_str()
                        .with_context(|| format!("The {MONTH} option is not a string"))?
                        .to_string(),
                ),
            };
            Ok(CommandRequest::Report { month })
        }
    }
}

fn embed(title: String, reply: &Reply) -> CreateEmbed {
    CreateEmbed::new()
        .title(title)
        .description(reply.body())
        .colour(REPORT_COLOUR)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(FOOTER))
}

fn response(reply: &Reply) -> CreateInteractionResponseMessage {
    let message = CreateInteractionResponseMessage::new().ephemeral(reply.is_ephemeral());
    match reply.title() {
        Some(title) => message.embed(embed(title, reply)),
        None => message.content(reply.body()),
    }
}

fn followup(reply: &Reply) -> CreateInteractionResponseFollowup {
    let message = CreateInteractionResponseFollowup::new().ephemeral(reply.is_ephemeral());
    match reply.title() {
        Some(title) => message.embed(embed(title, reply)),
        None => message.content(reply.body()),
    }
}

/// Sends `reply` as the interaction response. If the interaction was already acknowledged, or the
/// response fails for any other reason, a follow-up message is sent instead.
pub(super) async fn respond(ctx: &Context, command: &CommandInteraction, reply: &Reply) {
    let sent = command
        .create_response(&ctx.http, CreateInteractionResponse::Message(response(reply)))
        .await;
    let e = match sent {
        Ok(()) => {
            debug!("Replied to /{}", command.data.name);
            return;
        }
        Err(e) => e,
    };

    warn!("Unable to respond to /{}, sending a follow-up: {e}", command.data.name);
    if let Err(e) = command.create_followup(&ctx.http, followup(reply)).await {
        error!("Unable to send a follow-up for /{}: {e}", command.data.name);
    }
}
