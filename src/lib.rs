//! Hardware compatibility analysis for the game catalog platform.
//!
//! Decides, per (user, game) pair, whether a costly AI compatibility
//! verdict can be served from cache, must be recomputed, or must be
//! discarded because the user's hardware profile changed - together with
//! the upstream token lifecycle needed to reach the catalog and AI
//! providers.

pub mod analyzer;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod profile;

pub use analyzer::{CompatibilityAnalyzer, REQUIREMENTS_EXCERPT_CHARS, requirements_excerpt};
pub use cache::{AnalysisCache, AnalysisTtl, CacheStats};
pub use client::{
    CatalogApi, CatalogClient, OpenAiVerdictClient, UpstreamToken, UpstreamTokenManager,
    VerdictApi,
};
pub use config::Config;
pub use error::{CacheError, ConfigError, Error, Result, UpstreamError};
pub use models::{
    Analysis, AnalysisCacheEntry, AnalysisStatus, Bottleneck, GameRequirements, HardwareProfile,
    PerformanceTier, Verdict,
};
pub use profile::{HardwareProfileStore, StaticProfileStore};
