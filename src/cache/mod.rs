//! Persistent analysis cache
//!
//! SQLite-backed storage of computed verdicts, keyed by (user, game), each
//! entry carrying the hardware snapshot that produced it. Staleness against
//! the *current* profile is the orchestrator's concern; the store only
//! enforces absolute TTL expiry.

pub mod storage;

use std::time::Duration;

/// TTL configuration for cached analyses
pub struct AnalysisTtl;

impl AnalysisTtl {
    /// Verdicts expire 30 days after computation regardless of profile
    /// invalidation. Game requirements drift slowly; a month-old verdict
    /// for unchanged hardware is still directionally right.
    pub const VERDICT: Duration = Duration::from_secs(30 * 24 * 60 * 60);
}

pub use storage::{AnalysisCache, CacheStats};
