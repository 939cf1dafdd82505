//! OAuth 2.0 access tokens for the Google Sheets API.
//!
//! The bot never runs a consent flow. The credential blob already holds a refresh token, which is
//! exchanged for short-lived access tokens as needed. Tokens are cached and shared by every clone
//! of the `TokenProvider`, so concurrent commands refresh at most once per expiry.

use crate::api::{Credentials, OAUTH_SCOPES};
use crate::error::Res;
use anyhow::Context;
use chrono::{DateTime, Utc};
use oauth2::basic::BasicClient;
use oauth2::{ClientId, ClientSecret, RefreshToken, Scope, TokenResponse, TokenUrl};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, trace};

/// Used when Google does not say how long a token lives.
const DEFAULT_LIFETIME_SECS: i64 = 3600;

/// Tokens this close to expiring are refreshed before use.
const EXPIRY_BUFFER_MINUTES: i64 = 5;

/// Hands out valid access tokens, refreshing them when needed.
#[derive(Debug, Clone)]
pub(crate) struct TokenProvider {
    credentials: Credentials,
    http: reqwest::Client,
    cached: Arc<Mutex<Option<AccessToken>>>,
}

impl TokenProvider {
    /// Validates the credentials. This does not contact Google.
    pub(crate) fn new(credentials: Credentials) -> Res<Self> {
        let _ = token_url(&credentials)?;

        // Following redirects here would open the client up to SSRF vulnerabilities.
        let http = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Unable to build the OAuth HTTP client")?;

        Ok(Self {
            credentials,
            http,
            cached: Arc::new(Mutex::new(None)),
        })
    }

    /// Returns an access token, refreshing it first if it is missing or about to expire.
    pub(crate) async fn token(&self) -> Res<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if !token.is_expired(Utc::now()) {
                trace!("Using the cached access token");
                return Ok(token.secret.clone());
            }
        }
        let token = self.refresh().await?;
        let secret = token.secret.clone();
        *cached = Some(token);
        Ok(secret)
    }

    async fn refresh(&self) -> Res<AccessToken> {
        debug!("Refreshing the Google access token");
        let client = BasicClient::new(ClientId::new(self.credentials.client_id().to_string()))
            .set_client_secret(ClientSecret::new(
                self.credentials.client_secret().to_string(),
            ))
            .set_token_uri(token_url(&self.credentials)?);

        let refresh_token = RefreshToken::new(self.credentials.refresh_token().to_string());
        let response = client
            .exchange_refresh_token(&refresh_token)
            .add_scopes(OAUTH_SCOPES.iter().map(|s| Scope::new(s.to_string())))
            .request_async(&self.http)
            .await
            .context("Failed to refresh the Google access token")?;

        let lifetime = response
            .expires_in()
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .unwrap_or_else(|| chrono::Duration::seconds(DEFAULT_LIFETIME_SECS));
        let token = AccessToken {
            secret: response.access_token().secret().to_string(),
            expires_at: Utc::now() + lifetime,
        };
        debug!("Access token valid until {}", token.expires_at);
        Ok(token)
    }
}

fn token_url(credentials: &Credentials) -> Res<TokenUrl> {
    TokenUrl::new(credentials.token_uri().to_string())
        .with_context(|| format!("Invalid token_uri '{}'", credentials.token_uri()))
}

#[derive(Clone)]
struct AccessToken {
    secret: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// True if the token is expired or will expire within the buffer.
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now + chrono::Duration::minutes(EXPIRY_BUFFER_MINUTES)
    }
}

impl Debug for AccessToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(token_uri: &str) -> Credentials {
        Credentials::parse(&format!(
            r#"{{"client_id":"id","client_secret":"secret","refresh_token":"refresh","token_uri":"{token_uri}"}}"#
        ))
        .unwrap()
    }

    #[test]
    fn test_new_rejects_bad_token_uri() {
        assert!(TokenProvider::new(credentials("not a url")).is_err());
        assert!(TokenProvider::new(credentials("https://oauth2.googleapis.com/token")).is_ok());
    }

    #[test]
    fn test_is_expired() {
        let now = Utc::now();
        let fresh = AccessToken {
            secret: "a".into(),
            expires_at: now + chrono::Duration::minutes(30),
        };
        assert!(!fresh.is_expired(now));

        let nearly = AccessToken {
            secret: "b".into(),
            expires_at: now + chrono::Duration::minutes(4),
        };
        assert!(nearly.is_expired(now));

        let stale = AccessToken {
            secret: "c".into(),
            expires_at: now - chrono::Duration::minutes(1),
        };
        assert!(stale.is_expired(now));
    }

    #[tokio::test]
    async fn test_cached_token_is_reused() {
        let provider = TokenProvider::new(credentials("https://oauth2.googleapis.com/token")).unwrap();
        *provider.cached.lock().await = Some(AccessToken {
            secret: "cached".into(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
        });
        let clone = provider.clone();
        assert_eq!(clone.token().await.unwrap(), "cached");
    }

    #[test]
    fn test_debug_redacts_token() {
        let token = AccessToken {
            secret: "ya29.secret".into(),
            expires_at: Utc::now(),
        };
        assert!(!format!("{token:?}").contains("ya29"));
    }
}
