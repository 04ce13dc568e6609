//! SQLite-backed analysis cache
//!
//! One row per (user_id, game_id), enforced by the composite primary key.
//! `get` filters on `expires_at`, so a TTL-expired row can never be
//! observed by callers; `purge_expired` exists only to reclaim space.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::AnalysisTtl;
use crate::error::CacheError;
use crate::models::{AnalysisCacheEntry, HardwareProfile, Verdict};

/// Schema version - increment to trigger nuke-and-rebuild
const SCHEMA_VERSION: i32 = 1;

type Result<T> = std::result::Result<T, CacheError>;

/// Persistent store of computed compatibility verdicts
pub struct AnalysisCache {
    conn: Connection,
}

impl AnalysisCache {
    /// Open or create the cache at the default XDG cache location
    pub fn open() -> Result<Self> {
        let cache_dir = Self::cache_dir()?;
        Self::open_at(&cache_dir)
    }

    /// Get the cache directory path (~/.cache/rigcheck on Linux/macOS)
    pub fn cache_dir() -> Result<PathBuf> {
        let cache_base = dirs::cache_dir().ok_or(CacheError::NoHome)?;
        Ok(cache_base.join("rigcheck"))
    }

    /// Open the cache at a specific directory
    pub fn open_at(cache_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(cache_dir)
            .map_err(|e| CacheError::Io(format!("Failed to create cache dir: {}", e)))?;

        let db_path = cache_dir.join("analysis.db");
        let conn = Connection::open(&db_path)?;

        // Check schema version - nuke if mismatched
        let version: i32 = conn
            .pragma_query_value(None, "user_version", |r| r.get(0))
            .unwrap_or(0);

        if version != 0 && version != SCHEMA_VERSION {
            log::info!(
                "Analysis cache schema version mismatch ({} != {}), rebuilding",
                version,
                SCHEMA_VERSION
            );
            drop(conn);
            std::fs::remove_file(&db_path)
                .map_err(|e| CacheError::Io(format!("Failed to remove cache DB: {}", e)))?;
            return Self::open_at(cache_dir);
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS analysis_entries (
                user_id TEXT NOT NULL,
                game_id TEXT NOT NULL,
                game_name TEXT NOT NULL,
                snapshot TEXT NOT NULL,
                verdict TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL,
                PRIMARY KEY (user_id, game_id)
            );

            CREATE INDEX IF NOT EXISTS idx_user_id ON analysis_entries(user_id);
            CREATE INDEX IF NOT EXISTS idx_expires_at ON analysis_entries(expires_at);
            "#,
        )?;

        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        Ok(Self { conn })
    }

    /// Pure lookup of a live entry. No staleness logic beyond TTL filtering:
    /// snapshot comparison belongs to the orchestrator.
    pub fn get(&self, user_id: &str, game_id: &str) -> Result<Option<AnalysisCacheEntry>> {
        let now = Utc::now().timestamp();

        let row: Option<(String, String, String, i64)> = self
            .conn
            .query_row(
                "SELECT game_name, snapshot, verdict, created_at FROM analysis_entries
                 WHERE user_id = ?1 AND game_id = ?2 AND expires_at > ?3",
                params![user_id, game_id, now],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        let Some((game_name, snapshot_json, verdict_json, created_at)) = row else {
            return Ok(None);
        };

        // A row we cannot decode is useless; drop it and report a miss
        let (Ok(snapshot), Ok(verdict)) = (
            serde_json::from_str::<HardwareProfile>(&snapshot_json),
            serde_json::from_str::<Verdict>(&verdict_json),
        ) else {
            log::warn!(
                "Dropping undecodable cache entry for ({}, {})",
                user_id,
                game_id
            );
            let _ = self.delete_one(user_id, game_id);
            return Ok(None);
        };

        Ok(Some(AnalysisCacheEntry {
            user_id: user_id.to_string(),
            game_id: game_id.to_string(),
            game_name,
            snapshot,
            verdict,
            created_at: DateTime::from_timestamp(created_at, 0).unwrap_or_else(Utc::now),
        }))
    }

    /// Upsert an entry with the default TTL
    pub fn put(
        &self,
        user_id: &str,
        game_id: &str,
        game_name: &str,
        snapshot: &HardwareProfile,
        verdict: &Verdict,
    ) -> Result<()> {
        self.put_with_ttl(user_id, game_id, game_name, snapshot, verdict, AnalysisTtl::VERDICT)
    }

    /// Upsert an entry with an explicit TTL
    pub fn put_with_ttl(
        &self,
        user_id: &str,
        game_id: &str,
        game_name: &str,
        snapshot: &HardwareProfile,
        verdict: &Verdict,
        ttl: Duration,
    ) -> Result<()> {
        let now = Utc::now().timestamp();
        let expires = now + ttl.as_secs() as i64;

        let snapshot_json = serde_json::to_string(snapshot)
            .map_err(|e| CacheError::Io(format!("Failed to encode snapshot: {}", e)))?;
        let verdict_json = serde_json::to_string(verdict)
            .map_err(|e| CacheError::Io(format!("Failed to encode verdict: {}", e)))?;

        self.conn
            .execute(
                "INSERT OR REPLACE INTO analysis_entries
                 (user_id, game_id, game_name, snapshot, verdict, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    user_id,
                    game_id,
                    game_name,
                    snapshot_json,
                    verdict_json,
                    now,
                    expires
                ],
            )
            .map_err(|e| match e {
                // A concurrent writer holding the database maps to the one
                // write failure callers treat as non-fatal
                rusqlite::Error::SqliteFailure(inner, _)
                    if inner.code == ErrorCode::DatabaseBusy
                        || inner.code == ErrorCode::DatabaseLocked =>
                {
                    CacheError::Conflict
                }
                other => CacheError::Sqlite(other),
            })?;

        Ok(())
    }

    /// Delete all entries for a user.
    ///
    /// The sole bulk invalidation path, called when the user's hardware
    /// profile is updated.
    pub fn invalidate_for_user(&self, user_id: &str) -> Result<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM analysis_entries WHERE user_id = ?1",
            params![user_id],
        )?;
        Ok(deleted)
    }

    /// Delete a single entry. Orchestrator-internal: removes a stale
    /// snapshot ahead of a recompute so no duplicate lingers.
    pub fn delete_one(&self, user_id: &str, game_id: &str) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM analysis_entries WHERE user_id = ?1 AND game_id = ?2",
            params![user_id, game_id],
        )?;
        Ok(deleted > 0)
    }

    /// Remove expired rows. Space reclamation only; `get` never returns them.
    pub fn purge_expired(&self) -> Result<usize> {
        let now = Utc::now().timestamp();
        let purged = self.conn.execute(
            "DELETE FROM analysis_entries WHERE expires_at <= ?1",
            params![now],
        )?;
        Ok(purged)
    }

    /// Clear all entries
    pub fn clear_all(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM analysis_entries", [], |r| r.get(0))?;
        self.conn.execute("DELETE FROM analysis_entries", [])?;
        Ok(count as usize)
    }

    /// Get cache statistics
    pub fn stats(&self) -> Result<CacheStats> {
        let now = Utc::now().timestamp();

        let total_entries: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM analysis_entries", [], |r| r.get(0))?;

        let valid_entries: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM analysis_entries WHERE expires_at > ?1",
            [now],
            |r| r.get(0),
        )?;

        let users: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT user_id) FROM analysis_entries WHERE expires_at > ?1",
            [now],
            |r| r.get(0),
        )?;

        Ok(CacheStats {
            total_entries: total_entries as usize,
            valid_entries: valid_entries as usize,
            expired_entries: (total_entries - valid_entries) as usize,
            users: users as usize,
        })
    }
}

/// Statistics about cache state
#[derive(Debug)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub users: usize,
}
