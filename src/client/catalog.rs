//! Catalog + storefront requirements lookup
//!
//! Resolves a game's minimum hardware requirements in two hops: the catalog
//! metadata API (IGDB) yields the game's storefront listing, then the
//! storefront API (Steam) yields the machine-readable requirements blobs.
//! Raw requirements text is never cached here - refetching it is cheap
//! relative to the AI verdict it feeds.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;

use super::CatalogApi;
use super::token::UpstreamTokenManager;
use crate::error::{Error, Result, UpstreamError};
use crate::models::GameRequirements;

/// Catalog metadata API base URL (IGDB)
pub const DEFAULT_METADATA_URL: &str = "https://api.igdb.com/v4";

/// Storefront API base URL (Steam)
pub const DEFAULT_STOREFRONT_URL: &str = "https://store.steampowered.com";

/// external_games category value marking the target storefront
const STOREFRONT_CATEGORY: i64 = 1;

/// URL fragment identifying storefront listings when the category field is
/// absent or unreliable
const STOREFRONT_URL_MARKER: &str = "store.steampowered.com";

/// The storefront API throttles unauthenticated clients aggressively
const STOREFRONT_RATE_LIMIT_PER_SECOND: u32 = 4;

/// A storefront listing reference from the catalog metadata service
#[derive(Debug, Deserialize)]
struct ExternalGame {
    #[serde(default)]
    category: Option<i64>,
    #[serde(default)]
    uid: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl ExternalGame {
    fn category_matches(&self) -> bool {
        self.category == Some(STOREFRONT_CATEGORY)
    }

    fn url_matches(&self) -> bool {
        self.url
            .as_deref()
            .is_some_and(|u| u.contains(STOREFRONT_URL_MARKER))
    }
}

#[derive(Debug, Deserialize)]
struct CatalogGame {
    name: String,
    #[serde(default)]
    external_games: Option<Vec<ExternalGame>>,
}

/// The storefront publishes `pc_requirements` as an object, but as an empty
/// array when a title has none. Both shapes must parse.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RequirementsBlock {
    Fields {
        #[serde(default)]
        minimum: Option<String>,
        #[serde(default)]
        recommended: Option<String>,
    },
    Empty(Vec<serde_json::Value>),
}

impl RequirementsBlock {
    fn minimum(&self) -> Option<&str> {
        match self {
            RequirementsBlock::Fields { minimum, .. } => minimum.as_deref(),
            RequirementsBlock::Empty(_) => None,
        }
    }

    fn recommended(&self) -> Option<&str> {
        match self {
            RequirementsBlock::Fields { recommended, .. } => recommended.as_deref(),
            RequirementsBlock::Empty(_) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AppDetailsData {
    #[serde(default)]
    pc_requirements: Option<RequirementsBlock>,
}

#[derive(Debug, Deserialize)]
struct AppDetails {
    success: bool,
    #[serde(default)]
    data: Option<AppDetailsData>,
}

/// Client for the catalog metadata and storefront APIs
pub struct CatalogClient {
    http: HttpClient,
    metadata_url: String,
    storefront_url: String,
    client_id: String,
    tokens: Arc<UpstreamTokenManager>,
    storefront_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl CatalogClient {
    pub fn new(
        http: HttpClient,
        metadata_url: impl Into<String>,
        storefront_url: impl Into<String>,
        client_id: impl Into<String>,
        tokens: Arc<UpstreamTokenManager>,
    ) -> Self {
        let quota = Quota::per_second(
            std::num::NonZeroU32::new(STOREFRONT_RATE_LIMIT_PER_SECOND)
                .unwrap_or(std::num::NonZeroU32::MIN),
        );

        Self {
            http,
            metadata_url: metadata_url.into(),
            storefront_url: storefront_url.into(),
            client_id: client_id.into(),
            tokens,
            storefront_limiter: RateLimiter::direct(quota),
        }
    }

    /// Query the catalog metadata service for a game record.
    ///
    /// An authentication failure triggers exactly one token refresh + retry;
    /// a second 401 surfaces as `Unauthorized`.
    async fn fetch_catalog_game(&self, game_id: &str) -> Result<CatalogGame> {
        let query = format!(
            "fields name, external_games.category, external_games.uid, external_games.url; \
             where id = {};",
            game_id
        );

        let token = self.tokens.get_token().await?;
        match self.metadata_request(&query, &token).await {
            Err(Error::Upstream(UpstreamError::Unauthorized)) => {
                log::debug!("Catalog metadata returned 401, refreshing token and retrying once");
                self.tokens.invalidate().await;
                let token = self.tokens.get_token().await?;
                self.metadata_request(&query, &token).await
            }
            other => other,
        }
        .and_then(|mut games: Vec<CatalogGame>| {
            if games.is_empty() {
                Err(Error::NotFound(format!("game {} is not in the catalog", game_id)))
            } else {
                Ok(games.swap_remove(0))
            }
        })
    }

    async fn metadata_request(&self, query: &str, token: &str) -> Result<Vec<CatalogGame>> {
        let url = format!("{}/games", self.metadata_url);
        let response = self
            .http
            .post(&url)
            .header("Client-ID", &self.client_id)
            .header("Authorization", format!("Bearer {}", token))
            .body(query.to_string())
            .send()
            .await
            .map_err(UpstreamError::from)?;

        let status = response.status();
        match status {
            StatusCode::OK => response.json().await.map_err(|e| {
                UpstreamError::InvalidResponse(format!("Failed to parse catalog response: {}", e))
                    .into()
            }),
            StatusCode::UNAUTHORIZED => Err(UpstreamError::Unauthorized.into()),
            status if status.is_client_error() => {
                let body = response.text().await.unwrap_or_default();
                log::error!("Catalog metadata rejected query ({}): {}", status, body);
                Err(UpstreamError::ClientError {
                    status: status.as_u16(),
                    body,
                }
                .into())
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                log::error!("Catalog metadata server error ({}): {}", status, body);
                Err(UpstreamError::ServerError(status.as_u16()).into())
            }
        }
    }

    /// Pick the storefront listing from a game's external references.
    ///
    /// Precedence: an entry whose category marks the storefront wins; the
    /// URL-substring fallback is consulted only when no entry carries the
    /// category. Entries without a uid cannot be fetched and are skipped.
    fn resolve_store_app_id(externals: &[ExternalGame]) -> Option<String> {
        externals
            .iter()
            .find(|e| e.category_matches() && e.uid.is_some())
            .or_else(|| externals.iter().find(|e| e.url_matches() && e.uid.is_some()))
            .and_then(|e| e.uid.clone())
    }

    /// Fetch the storefront requirements record for a resolved app id
    async fn fetch_storefront_requirements(&self, app_id: &str) -> Result<AppDetails> {
        self.storefront_limiter.until_ready().await;

        let url = format!(
            "{}/api/appdetails?appids={}",
            self.storefront_url, app_id
        );
        let response = self.http.get(&url).send().await.map_err(UpstreamError::from)?;

        let status = response.status();
        if status.is_server_error() {
            return Err(UpstreamError::ServerError(status.as_u16()).into());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("Storefront rejected appdetails ({}): {}", status, body);
            return Err(UpstreamError::ClientError {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let mut body: HashMap<String, AppDetails> = response.json().await.map_err(|e| {
            UpstreamError::InvalidResponse(format!("Failed to parse storefront response: {}", e))
        })?;

        body.remove(app_id).ok_or_else(|| {
            UpstreamError::InvalidResponse(format!(
                "Storefront response missing app id {}",
                app_id
            ))
            .into()
        })
    }
}

#[async_trait]
impl CatalogApi for CatalogClient {
    async fn get_requirements(&self, game_id: &str) -> Result<GameRequirements> {
        // The id is interpolated into the metadata query body
        if game_id.is_empty() || !game_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::NotFound(format!(
                "game {:?} is not a valid catalog identifier",
                game_id
            )));
        }

        let game = self.fetch_catalog_game(game_id).await?;

        let store_app_id = game
            .external_games
            .as_deref()
            .and_then(Self::resolve_store_app_id)
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "game {} has no resolvable storefront listing",
                    game_id
                ))
            })?;

        let details = self.fetch_storefront_requirements(&store_app_id).await?;

        let requirements = match details {
            AppDetails {
                success: true,
                data: Some(data),
            } => data.pc_requirements,
            _ => None,
        };

        let minimum = requirements
            .as_ref()
            .and_then(|r| r.minimum())
            .map(str::to_string)
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "storefront record {} has no minimum requirements",
                    store_app_id
                ))
            })?;

        let recommended = requirements
            .as_ref()
            .and_then(|r| r.recommended())
            .map(str::to_string);

        Ok(GameRequirements {
            game_id: game_id.to_string(),
            name: game.name,
            store_app_id,
            minimum,
            recommended,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(server: &mockito::Server) -> CatalogClient {
        let tokens = Arc::new(UpstreamTokenManager::new(
            HttpClient::new(),
            format!("{}/oauth2/token", server.url()),
            "cid",
            "secret",
        ));
        CatalogClient::new(
            HttpClient::new(),
            server.url(),
            server.url(),
            "cid",
            tokens,
        )
    }

    fn metadata_body(externals: &str) -> String {
        format!(
            r#"[{{"id": 1942, "name": "The Witness", "external_games": {}}}]"#,
            externals
        )
    }

    const APPDETAILS_OK: &str = r#"{
        "210970": {
            "success": true,
            "data": {
                "pc_requirements": {
                    "minimum": "<strong>Minimum:</strong> Core i5, GTX 660, 4GB RAM",
                    "recommended": "Core i7, GTX 760, 8GB RAM"
                }
            }
        }
    }"#;

    #[tokio::test]
    async fn test_happy_path_resolves_requirements() {
        let mut server = mockito::Server::new_async().await;
        let c = client(&server);
        c.tokens.prime("tok").await;

        server
            .mock("POST", "/games")
            .match_header("client-id", "cid")
            .match_header("authorization", "Bearer tok")
            .with_body(metadata_body(
                r#"[{"category": 1, "uid": "210970", "url": "https://store.steampowered.com/app/210970"}]"#,
            ))
            .create_async()
            .await;
        server
            .mock("GET", "/api/appdetails?appids=210970")
            .with_body(APPDETAILS_OK)
            .create_async()
            .await;

        let reqs = c.get_requirements("1942").await.unwrap();
        assert_eq!(reqs.name, "The Witness");
        assert_eq!(reqs.store_app_id, "210970");
        assert!(reqs.minimum.contains("GTX 660"));
        assert!(reqs.recommended.unwrap().contains("GTX 760"));
    }

    #[tokio::test]
    async fn test_category_wins_over_url_fallback() {
        let externals = r#"[
            {"category": 5, "uid": "999", "url": "https://store.steampowered.com/app/999"},
            {"category": 1, "uid": "210970"}
        ]"#;
        let parsed: Vec<ExternalGame> =
            serde_json::from_str(externals).unwrap();
        assert_eq!(
            CatalogClient::resolve_store_app_id(&parsed).as_deref(),
            Some("210970")
        );
    }

    #[tokio::test]
    async fn test_url_fallback_when_category_absent() {
        let externals = r#"[
            {"uid": "111", "url": "https://example.com/game"},
            {"uid": "210970", "url": "https://store.steampowered.com/app/210970"}
        ]"#;
        let parsed: Vec<ExternalGame> = serde_json::from_str(externals).unwrap();
        assert_eq!(
            CatalogClient::resolve_store_app_id(&parsed).as_deref(),
            Some("210970")
        );
    }

    #[tokio::test]
    async fn test_entry_without_uid_is_skipped() {
        let externals = r#"[{"category": 1, "url": "https://store.steampowered.com/app/x"}]"#;
        let parsed: Vec<ExternalGame> = serde_json::from_str(externals).unwrap();
        assert_eq!(CatalogClient::resolve_store_app_id(&parsed), None);
    }

    #[tokio::test]
    async fn test_game_not_in_catalog() {
        let mut server = mockito::Server::new_async().await;
        let c = client(&server);
        c.tokens.prime("tok").await;

        server
            .mock("POST", "/games")
            .with_body("[]")
            .create_async()
            .await;

        let err = c.get_requirements("1942").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(err.to_string().contains("not in the catalog"));
    }

    #[tokio::test]
    async fn test_no_storefront_listing() {
        let mut server = mockito::Server::new_async().await;
        let c = client(&server);
        c.tokens.prime("tok").await;

        server
            .mock("POST", "/games")
            .with_body(metadata_body(r#"[{"category": 5, "uid": "999"}]"#))
            .create_async()
            .await;

        let err = c.get_requirements("1942").await.unwrap_err();
        assert!(err.to_string().contains("no resolvable storefront listing"));
    }

    #[tokio::test]
    async fn test_empty_requirements_array_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        let c = client(&server);
        c.tokens.prime("tok").await;

        server
            .mock("POST", "/games")
            .with_body(metadata_body(r#"[{"category": 1, "uid": "210970"}]"#))
            .create_async()
            .await;
        // Steam publishes an empty array instead of an object here
        server
            .mock("GET", "/api/appdetails?appids=210970")
            .with_body(r#"{"210970": {"success": true, "data": {"pc_requirements": []}}}"#)
            .create_async()
            .await;

        let err = c.get_requirements("1942").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(err.to_string().contains("no minimum requirements"));
    }

    #[tokio::test]
    async fn test_unsuccessful_storefront_record_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        let c = client(&server);
        c.tokens.prime("tok").await;

        server
            .mock("POST", "/games")
            .with_body(metadata_body(r#"[{"category": 1, "uid": "210970"}]"#))
            .create_async()
            .await;
        server
            .mock("GET", "/api/appdetails?appids=210970")
            .with_body(r#"{"210970": {"success": false}}"#)
            .create_async()
            .await;

        let err = c.get_requirements("1942").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_expired_token_refreshed_and_retried_once() {
        let mut server = mockito::Server::new_async().await;
        let c = client(&server);
        c.tokens.prime("stale").await;

        // Stale bearer is rejected; the fresh one succeeds
        let rejected = server
            .mock("POST", "/games")
            .match_header("authorization", "Bearer stale")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;
        let exchange = server
            .mock("POST", "/oauth2/token")
            .match_query(mockito::Matcher::Any)
            .with_body(r#"{"access_token": "fresh"}"#)
            .expect(1)
            .create_async()
            .await;
        let accepted = server
            .mock("POST", "/games")
            .match_header("authorization", "Bearer fresh")
            .with_body(metadata_body(r#"[{"category": 1, "uid": "210970"}]"#))
            .expect(1)
            .create_async()
            .await;
        server
            .mock("GET", "/api/appdetails?appids=210970")
            .with_body(APPDETAILS_OK)
            .create_async()
            .await;

        let reqs = c.get_requirements("1942").await.unwrap();
        assert_eq!(reqs.store_app_id, "210970");

        rejected.assert_async().await;
        exchange.assert_async().await;
        accepted.assert_async().await;
    }

    #[tokio::test]
    async fn test_persistent_401_surfaces_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        let c = client(&server);
        c.tokens.prime("stale").await;

        server
            .mock("POST", "/games")
            .with_status(401)
            .expect(2)
            .create_async()
            .await;
        server
            .mock("POST", "/oauth2/token")
            .match_query(mockito::Matcher::Any)
            .with_body(r#"{"access_token": "fresh"}"#)
            .create_async()
            .await;

        let err = c.get_requirements("1942").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Upstream(UpstreamError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_metadata_server_error() {
        let mut server = mockito::Server::new_async().await;
        let c = client(&server);
        c.tokens.prime("tok").await;

        server
            .mock("POST", "/games")
            .with_status(502)
            .create_async()
            .await;

        let err = c.get_requirements("1942").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Upstream(UpstreamError::ServerError(502))
        ));
    }

    #[tokio::test]
    async fn test_non_numeric_game_id_rejected_without_upstream_call() {
        let server = mockito::Server::new_async().await;
        let c = client(&server);

        let err = c.get_requirements("1942; fields *").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
