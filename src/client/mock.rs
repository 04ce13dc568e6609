//! Mock upstream clients for testing
//!
//! Hand-rolled mocks with call counting, so orchestration tests can assert
//! exactly how many upstream (and billable AI) calls a scenario performed.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{CatalogApi, VerdictApi};
use crate::error::{Error, Result, UpstreamError};
use crate::models::{Bottleneck, GameRequirements, HardwareProfile, PerformanceTier, Verdict};

/// Tracks upstream call counts for test verification
#[derive(Default, Debug, Clone)]
pub struct CallCounts {
    pub get_requirements: usize,
    pub analyze: usize,
}

/// Mock catalog client.
///
/// Games registered via `with_game` resolve; everything else is `NotFound`.
pub struct MockCatalogClient {
    games: HashMap<String, GameRequirements>,
    counts: Arc<Mutex<CallCounts>>,
    fail_with_server_error: bool,
}

impl MockCatalogClient {
    pub fn new() -> Self {
        Self {
            games: HashMap::new(),
            counts: Arc::new(Mutex::new(CallCounts::default())),
            fail_with_server_error: false,
        }
    }

    pub fn with_game(mut self, game_id: &str, name: &str, minimum: &str) -> Self {
        self.games.insert(
            game_id.to_string(),
            GameRequirements {
                game_id: game_id.to_string(),
                name: name.to_string(),
                store_app_id: format!("app-{}", game_id),
                minimum: minimum.to_string(),
                recommended: None,
            },
        );
        self
    }

    pub fn failing_with_server_error(mut self) -> Self {
        self.fail_with_server_error = true;
        self
    }

    pub async fn call_counts(&self) -> CallCounts {
        self.counts.lock().await.clone()
    }
}

impl Default for MockCatalogClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogApi for MockCatalogClient {
    async fn get_requirements(&self, game_id: &str) -> Result<GameRequirements> {
        self.counts.lock().await.get_requirements += 1;

        if self.fail_with_server_error {
            return Err(UpstreamError::ServerError(502).into());
        }

        self.games.get(game_id).cloned().ok_or_else(|| {
            Error::NotFound(format!(
                "game {} has no resolvable storefront listing",
                game_id
            ))
        })
    }
}

/// Mock verdict provider.
///
/// Returns a configured verdict (or a default passing one) and captures the
/// requirements excerpt of every call, so tests can assert the truncation
/// bound and prompt content.
pub struct MockVerdictClient {
    verdict: Verdict,
    error: Arc<Mutex<Option<UpstreamError>>>,
    counts: Arc<Mutex<CallCounts>>,
    captured_excerpts: Arc<Mutex<Vec<String>>>,
}

impl MockVerdictClient {
    pub fn new() -> Self {
        Self {
            verdict: Verdict {
                can_run: true,
                performance_tier: PerformanceTier::High,
                bottleneck: Bottleneck::None,
                recommendation: "Runs well at high settings.".to_string(),
            },
            error: Arc::new(Mutex::new(None)),
            counts: Arc::new(Mutex::new(CallCounts::default())),
            captured_excerpts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_verdict(mut self, verdict: Verdict) -> Self {
        self.verdict = verdict;
        self
    }

    /// Queue an error returned by the next `analyze` call (consumed on use)
    pub async fn inject_error(&self, error: UpstreamError) {
        *self.error.lock().await = Some(error);
    }

    pub async fn call_counts(&self) -> CallCounts {
        self.counts.lock().await.clone()
    }

    pub async fn captured_excerpts(&self) -> Vec<String> {
        self.captured_excerpts.lock().await.clone()
    }
}

impl Default for MockVerdictClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VerdictApi for MockVerdictClient {
    async fn analyze(
        &self,
        _profile: &HardwareProfile,
        requirements_excerpt: &str,
    ) -> Result<Verdict> {
        self.counts.lock().await.analyze += 1;
        self.captured_excerpts
            .lock()
            .await
            .push(requirements_excerpt.to_string());

        if let Some(err) = self.error.lock().await.take() {
            return Err(err.into());
        }

        Ok(self.verdict.clone())
    }
}
