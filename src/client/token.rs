//! Upstream token lifecycle
//!
//! Holds the bearer credential for the catalog metadata API. The token is
//! fetched lazily on first use, shared process-wide, and refreshed
//! reactively when a downstream call reports an authentication failure.
//! No expiry is tracked: the occasional extra round trip after an upstream
//! rotation is cheaper than proactive refresh machinery.

use chrono::{DateTime, Utc};
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::{Result, UpstreamError};

/// Default identity provider token endpoint (Twitch, which fronts IGDB)
pub const DEFAULT_AUTH_URL: &str = "https://id.twitch.tv/oauth2/token";

/// A bearer credential for the catalog API
#[derive(Debug, Clone)]
pub struct UpstreamToken {
    pub value: String,
    pub fetched_at: DateTime<Utc>,
}

/// Process-wide manager for the catalog bearer token.
///
/// A single instance is shared by everything that talks to the catalog.
/// The cached token lives under one mutex, so concurrent first callers
/// serialize on the credential exchange and converge on a single upstream
/// fetch rather than racing N redundant ones.
pub struct UpstreamTokenManager {
    http: HttpClient,
    auth_url: String,
    client_id: String,
    client_secret: String,
    state: Mutex<Option<UpstreamToken>>,
}

impl UpstreamTokenManager {
    pub fn new(
        http: HttpClient,
        auth_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            auth_url: auth_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            state: Mutex::new(None),
        }
    }

    /// Return the cached token, fetching one first if none is held.
    ///
    /// The lock is held across the fetch on purpose: that is the
    /// single-flight guarantee.
    pub async fn get_token(&self) -> Result<String> {
        let mut state = self.state.lock().await;

        if let Some(token) = state.as_ref() {
            return Ok(token.value.clone());
        }

        let token = self.fetch_token().await?;
        let value = token.value.clone();
        *state = Some(token);
        Ok(value)
    }

    /// Drop the cached token. Called by clients that received a 401; the
    /// next `get_token` performs a fresh exchange.
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        if state.take().is_some() {
            log::debug!("Upstream token invalidated");
        }
    }

    /// Seed a token without an exchange (tests, pre-warming)
    pub async fn prime(&self, value: impl Into<String>) {
        let mut state = self.state.lock().await;
        *state = Some(UpstreamToken {
            value: value.into(),
            fetched_at: Utc::now(),
        });
    }

    /// Perform the client-credentials exchange with the identity provider
    async fn fetch_token(&self) -> Result<UpstreamToken> {
        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
        }

        log::debug!("Fetching upstream token from {}", self.auth_url);

        let response = self
            .http
            .post(&self.auth_url)
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .map_err(UpstreamError::from)?;

        let status = response.status();
        match status {
            StatusCode::OK => {
                let body: TokenResponse = response.json().await.map_err(|e| {
                    UpstreamError::InvalidResponse(format!(
                        "Failed to parse token response: {}",
                        e
                    ))
                })?;

                Ok(UpstreamToken {
                    value: body.access_token,
                    fetched_at: Utc::now(),
                })
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(UpstreamError::Unauthorized.into())
            }
            status if status.is_client_error() => {
                let body = response.text().await.unwrap_or_default();
                Err(UpstreamError::ClientError {
                    status: status.as_u16(),
                    body,
                }
                .into())
            }
            status => Err(UpstreamError::ServerError(status.as_u16()).into()),
        }
    }
}
