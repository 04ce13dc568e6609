//! Upstream clients: catalog/storefront lookup, AI verdicts, token lifecycle

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{GameRequirements, HardwareProfile, Verdict};

pub mod ai;
pub mod catalog;
#[cfg(test)]
pub mod mock;
pub mod token;

pub use ai::OpenAiVerdictClient;
pub use catalog::CatalogClient;
#[cfg(test)]
#[allow(unused_imports)]
pub use mock::{MockCatalogClient, MockVerdictClient};
pub use token::{UpstreamToken, UpstreamTokenManager};

/// Requirements-resolution operations against the catalog + storefront APIs
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Resolve a game's canonical minimum-requirements record.
    ///
    /// Fails with `NotFound` when no storefront identifier resolves or the
    /// storefront record lacks a minimum-requirements field, so callers can
    /// short-circuit without spending an AI call.
    async fn get_requirements(&self, game_id: &str) -> Result<GameRequirements>;
}

/// AI compatibility verdict computation
#[async_trait]
pub trait VerdictApi: Send + Sync {
    /// Compute a verdict for a hardware profile against a bounded
    /// requirements excerpt. Implementations must require the full verdict
    /// shape and must not retry on failure.
    async fn analyze(
        &self,
        profile: &HardwareProfile,
        requirements_excerpt: &str,
    ) -> Result<Verdict>;
}
