//! Compatibility analysis orchestration
//!
//! Per request the orchestrator walks CHECK_CACHE, then one of FRESH_HIT /
//! STALE / MISS, and on the recompute path FETCH_REQUIREMENTS,
//! COMPUTE_VERDICT, STORE. A fresh hit performs zero upstream calls; a
//! stale or missing entry costs one catalog lookup and one billable AI
//! call. Two concurrent misses for the same pair may both recompute - the
//! AI call is idempotent per identical inputs and the store is an upsert,
//! so the race costs at most one duplicate call and no inconsistency.

use std::sync::{Arc, Mutex};

use crate::cache::AnalysisCache;
use crate::client::{CatalogApi, VerdictApi};
use crate::error::{CacheError, Error, Result};
use crate::models::{Analysis, AnalysisCacheEntry, AnalysisStatus};
use crate::profile::HardwareProfileStore;

/// Bounded prefix of requirements text fed to the AI prompt.
///
/// Cost control: the full blob is never required for a directional verdict
/// and materially increases token spend.
pub const REQUIREMENTS_EXCERPT_CHARS: usize = 400;

/// Strip storefront markup and bound the requirements text for the prompt
pub fn requirements_excerpt(text: &str) -> String {
    let mut plain = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('<') {
        plain.push_str(&rest[..open]);
        let tail = &rest[open..];

        // Markup needs an element name and a closing '>'; a bare '<'
        // (as in "DirectX <11") is text
        let starts_tag = tail[1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '/');

        match tail.find('>') {
            Some(close) if starts_tag => {
                plain.push(' ');
                rest = &tail[close + 1..];
            }
            _ => {
                plain.push('<');
                rest = &tail[1..];
            }
        }
    }
    plain.push_str(rest);

    let collapsed = plain.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(REQUIREMENTS_EXCERPT_CHARS).collect()
}

/// Orchestrates cache lookup, staleness detection, requirements resolution,
/// AI verdict computation, and the cache write-back.
///
/// Holds no lock across a request's lifetime; the cache mutex guards only
/// individual synchronous store operations.
pub struct CompatibilityAnalyzer<P, C, A> {
    profiles: Arc<P>,
    catalog: Arc<C>,
    ai: Arc<A>,
    cache: Mutex<AnalysisCache>,
}

impl<P, C, A> CompatibilityAnalyzer<P, C, A>
where
    P: HardwareProfileStore,
    C: CatalogApi,
    A: VerdictApi,
{
    pub fn new(profiles: Arc<P>, catalog: Arc<C>, ai: Arc<A>, cache: AnalysisCache) -> Self {
        Self {
            profiles,
            catalog,
            ai,
            cache: Mutex::new(cache),
        }
    }

    /// Evaluate compatibility of a game against a user's current hardware.
    ///
    /// Returns a cached verdict when the stored snapshot still matches the
    /// user's profile; otherwise recomputes and upserts. A verdict computed
    /// against an outdated snapshot is never served.
    pub async fn evaluate(&self, user_id: &str, game_id: &str) -> Result<Analysis> {
        if user_id.is_empty() {
            return Err(Error::Unauthenticated);
        }

        let profile = self
            .profiles
            .get_profile(user_id)
            .await?
            .ok_or_else(|| Error::PreconditionFailed("no hardware profile on record".to_string()))?;

        if !profile.is_analyzable() {
            return Err(Error::PreconditionFailed(
                "set at least a CPU or GPU before requesting analysis".to_string(),
            ));
        }

        if let Some(entry) = self.cache_get(user_id, game_id) {
            if profile.matches_snapshot(&entry.snapshot) {
                log::debug!("Cache hit: analysis for ({}, {})", user_id, game_id);
                return Ok(Analysis {
                    verdict: entry.verdict,
                    cached: true,
                });
            }

            // Stale snapshot: remove the entry now so the recompute's upsert
            // cannot leave a duplicate behind
            log::debug!(
                "Hardware changed since analysis of ({}, {}), recomputing",
                user_id,
                game_id
            );
            self.cache_delete_one(user_id, game_id);
        }

        // NotFound from the catalog short-circuits here: no AI call, no
        // cache write
        let requirements = self.catalog.get_requirements(game_id).await?;
        let excerpt = requirements_excerpt(&requirements.minimum);
        let verdict = self.ai.analyze(&profile, &excerpt).await?;

        // The cache is an optimization, not a correctness dependency: a
        // failed write is logged and the fresh verdict still returned
        if let Err(e) = self.cache_put(user_id, game_id, &requirements.name, &profile, &verdict) {
            log::warn!(
                "Failed to cache analysis for ({}, {}): {}",
                user_id,
                game_id,
                e
            );
        }

        Ok(Analysis {
            verdict,
            cached: false,
        })
    }

    /// Read-only companion to `evaluate`: reports whether a cached verdict
    /// exists and whether the user's specs changed since it was computed,
    /// without spending any upstream call.
    pub async fn status(&self, user_id: &str, game_id: &str) -> Result<AnalysisStatus> {
        if user_id.is_empty() {
            return Err(Error::Unauthenticated);
        }

        let profile = self.profiles.get_profile(user_id).await?;

        Ok(match self.cache_get(user_id, game_id) {
            None => AnalysisStatus {
                has_cache: false,
                specs_changed: false,
                verdict: None,
            },
            Some(entry) => {
                // A missing or no-longer-analyzable profile cannot match the
                // snapshot that produced the verdict
                let specs_changed = match &profile {
                    Some(p) if p.is_analyzable() => !p.matches_snapshot(&entry.snapshot),
                    _ => true,
                };
                AnalysisStatus {
                    has_cache: true,
                    specs_changed,
                    verdict: Some(entry.verdict),
                }
            }
        })
    }

    /// Drop every cached verdict for a user.
    ///
    /// Called synchronously by the profile-update path; this is the cache's
    /// sole bulk invalidation trigger.
    pub fn invalidate_user(&self, user_id: &str) -> Result<usize> {
        let guard = self
            .cache
            .lock()
            .map_err(|_| CacheError::Io("cache lock poisoned".to_string()))?;
        let removed = guard.invalidate_for_user(user_id).map_err(Error::from)?;
        log::info!(
            "Invalidated {} cached analyses for user {}",
            removed,
            user_id
        );
        Ok(removed)
    }

    fn cache_get(&self, user_id: &str, game_id: &str) -> Option<AnalysisCacheEntry> {
        let guard = self.cache.lock().ok()?;
        match guard.get(user_id, game_id) {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Cache read failed for ({}, {}): {}", user_id, game_id, e);
                None
            }
        }
    }

    fn cache_delete_one(&self, user_id: &str, game_id: &str) {
        if let Ok(guard) = self.cache.lock()
            && let Err(e) = guard.delete_one(user_id, game_id)
        {
            log::warn!(
                "Failed to drop stale entry for ({}, {}): {}",
                user_id,
                game_id,
                e
            );
        }
    }

    fn cache_put(
        &self,
        user_id: &str,
        game_id: &str,
        game_name: &str,
        snapshot: &crate::models::HardwareProfile,
        verdict: &crate::models::Verdict,
    ) -> std::result::Result<(), CacheError> {
        let guard = self
            .cache
            .lock()
            .map_err(|_| CacheError::Io("cache lock poisoned".to_string()))?;
        guard.put(user_id, game_id, game_name, snapshot, verdict)
    }
}
