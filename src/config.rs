//! Configuration handling.
//!
//! All configuration comes from the environment (a `.env` file is loaded into the environment by
//! the binary). Every required value is checked up front so that the bot fails fast, naming all of
//! the missing variables at once, instead of failing on its first command.

use crate::api::Credentials;
use crate::error::{ErrorType, IntoResult, Res};
use crate::Result;
use anyhow::{anyhow, bail, Context};
use std::fmt::{Debug, Formatter};
use std::num::NonZeroU64;

pub(crate) const SPREADSHEET_ID: &str = "SPREADSHEET_ID";
pub(crate) const GOOGLE_CREDENTIALS: &str = "GOOGLE_CREDENTIALS";
pub(crate) const DISCORD_TOKEN: &str = "DISCORD_TOKEN";
pub(crate) const CLIENT_ID: &str = "CLIENT_ID";
pub(crate) const GUILD_ID: &str = "GUILD_ID";

/// The spreadsheet side of the configuration: which spreadsheet, and how to authenticate with
/// Google.
#[derive(Debug, Clone)]
pub struct Config {
    spreadsheet_id: String,
    credentials: Credentials,
}

impl Config {
    /// Loads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration using `lookup` to find the value of each variable.
    ///
    /// `SPREADSHEET_ID` may be the bare ID or the full URL of the sheet, e.g.
    /// https://docs.google.com/spreadsheets/d/1a7Km9FxQwRbPt82JvN4LzYpH5OcGnWsT6iDuE3VhMjX/edit
    ///
    /// `GOOGLE_CREDENTIALS` is the JSON of Google `authorized_user` credentials.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let values = required(&lookup, &[SPREADSHEET_ID, GOOGLE_CREDENTIALS])
            .pub_result(ErrorType::Config)?;
        let [spreadsheet, credentials] = <[String; 2]>::try_from(values)
            .map_err(|_| anyhow!("Expected two configuration values"))
            .pub_result(ErrorType::Config)?;

        let spreadsheet_id = parse_spreadsheet_id(&spreadsheet)
            .with_context(|| format!("Invalid {SPREADSHEET_ID}"))
            .pub_result(ErrorType::Config)?
            .to_string();
        let credentials = Credentials::parse(&credentials)
            .with_context(|| format!("Invalid {GOOGLE_CREDENTIALS}"))
            .pub_result(ErrorType::Config)?;

        Ok(Self {
            spreadsheet_id,
            credentials,
        })
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    pub(crate) fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}

/// The chat platform side of the configuration.
#[derive(Clone)]
pub struct DiscordConfig {
    token: String,
    application_id: NonZeroU64,
    guild_id: NonZeroU64,
}

impl DiscordConfig {
    /// Loads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads `DISCORD_TOKEN`, `CLIENT_ID` (the application ID) and `GUILD_ID` (the server the
    /// slash commands are registered on) using `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let values = required(&lookup, &[DISCORD_TOKEN, CLIENT_ID, GUILD_ID])
            .pub_result(ErrorType::Config)?;
        let [token, application_id, guild_id] = <[String; 3]>::try_from(values)
            .map_err(|_| anyhow!("Expected three configuration values"))
            .pub_result(ErrorType::Config)?;

        Ok(Self {
            token,
            application_id: parse_id(CLIENT_ID, &application_id).pub_result(ErrorType::Config)?,
            guild_id: parse_id(GUILD_ID, &guild_id).pub_result(ErrorType::Config)?,
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn application_id(&self) -> NonZeroU64 {
        self.application_id
    }

    pub fn guild_id(&self) -> NonZeroU64 {
        self.guild_id
    }
}

impl Debug for DiscordConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &"<redacted>")
            .field("application_id", &self.application_id)
            .field("guild_id", &self.guild_id)
            .finish()
    }
}

/// Looks up every key in `keys`, returning their values in order. Keys that are unset or blank are
/// all reported together.
fn required<F>(lookup: &F, keys: &[&str]) -> Res<Vec<String>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut values = Vec::with_capacity(keys.len());
    let mut missing = Vec::new();
    for &key in keys {
        match lookup(key).map(|v| v.trim().to_string()) {
            Some(value) if !value.is_empty() => values.push(value),
            _ => missing.push(key),
        }
    }
    if !missing.is_empty() {
        bail!(
            "Missing one or more environment variables: {}",
            missing.join(", ")
        );
    }
    Ok(values)
}

fn parse_id(key: &str, value: &str) -> Res<NonZeroU64> {
    value
        .parse::<NonZeroU64>()
        .with_context(|| format!("{key} must be a non-zero numeric Discord ID, got '{value}'"))
}

/// Accepts either a bare spreadsheet ID or a Google Sheets URL, returning the ID.
fn parse_spreadsheet_id(value: &str) -> Res<&str> {
    if value.contains('/') {
        return extract_spreadsheet_id(value);
    }
    Ok(value)
}

/// Extracts the spreadsheet ID from a Google Sheets URL
///
/// # Arguments
/// * `url` - The Google Sheets URL (e.g., "https://docs.google.com/spreadsheets/d/SPREADSHEET_ID/...")
///
/// # Returns
/// The spreadsheet ID or an error if the URL format is invalid.
fn extract_spreadsheet_id(url: &str) -> Res<&str> {
    // URL format: https://docs.google.com/spreadsheets/d/SPREADSHEET_ID/...
    // or: https://docs.google.com/spreadsheets/d/SPREADSHEET_ID?foo=bar
    let parts: Vec<&str> = url.split('/').collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == "d" && i + 1 < parts.len() {
            // Remove any query parameters or fragments
            let id_part = parts[i + 1];
            let id = id_part
                .split(['?', '#'])
                .next()
                .unwrap_or(id_part);
            if id.is_empty() {
                break;
            }
            return Ok(id);
        }
    }
    Err(anyhow!(
        "Invalid Google Sheets URL format. Expected: https://docs.google.com/spreadsheets/d/SPREADSHEET_ID"
    ))
}
