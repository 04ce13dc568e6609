//! Hardware profile store seam
//!
//! The profile record is owned by the external user-profile service; the
//! analyzer only consumes a read contract.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::HardwareProfile;

/// Read-only view of a user's current hardware profile
#[async_trait]
pub trait HardwareProfileStore: Send + Sync {
    /// Fetch the current profile for a user, if one exists
    async fn get_profile(&self, user_id: &str) -> Result<Option<HardwareProfile>>;
}

/// In-memory profile store.
///
/// Backs the CLI (single local user, profile loaded from config) and is
/// handy for tests that need to mutate a profile mid-scenario.
#[derive(Default)]
pub struct StaticProfileStore {
    profiles: Mutex<HashMap<String, HardwareProfile>>,
}

impl StaticProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user's profile
    pub async fn set_profile(&self, user_id: &str, profile: HardwareProfile) {
        self.profiles
            .lock()
            .await
            .insert(user_id.to_string(), profile);
    }

    /// Remove a user's profile
    pub async fn clear_profile(&self, user_id: &str) {
        self.profiles.lock().await.remove(user_id);
    }
}

#[async_trait]
impl HardwareProfileStore for StaticProfileStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<HardwareProfile>> {
        Ok(self.profiles.lock().await.get(user_id).cloned())
    }
}
