//! Deserialization of the Google credential blob.
//!
//! The blob is the `authorized_user` JSON that Google tooling writes after a user grants access,
//! e.g. `gcloud auth application-default login`:
//!
//! ```json
//! {
//!   "type": "authorized_user",
//!   "client_id": "YOUR_CLIENT_ID.apps.googleusercontent.com",
//!   "client_secret": "YOUR_CLIENT_SECRET",
//!   "refresh_token": "YOUR_REFRESH_TOKEN"
//! }
//! ```

use crate::error::Res;
use anyhow::{bail, Context};
use serde::Deserialize;
use std::fmt::{Debug, Formatter};

const AUTHORIZED_USER: &str = "authorized_user";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// OAuth client credentials plus a long-lived refresh token.
#[derive(Clone, Eq, PartialEq, Deserialize)]
pub(crate) struct Credentials {
    #[serde(rename = "type", default)]
    credential_type: Option<String>,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    #[serde(default)]
    token_uri: Option<String>,
}

impl Credentials {
    /// Parses and validates the credential JSON.
    pub(crate) fn parse(json: &str) -> Res<Self> {
        let credentials: Credentials =
            serde_json::from_str(json).context("Unable to parse the Google credentials JSON")?;
        if let Some(t) = credentials.credential_type.as_deref() {
            if t != AUTHORIZED_USER {
                bail!(
                    "Google credentials of type '{t}' are not supported, expected \
                    '{AUTHORIZED_USER}' credentials with a refresh token"
                );
            }
        }
        if credentials.refresh_token.trim().is_empty() {
            bail!("The Google credentials have an empty refresh_token");
        }
        Ok(credentials)
    }

    pub(crate) fn client_id(&self) -> &str {
        &self.client_id
    }

    pub(crate) fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub(crate) fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    pub(crate) fn token_uri(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI)
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("token_uri", &self.token_uri())
            .finish()
    }
}
