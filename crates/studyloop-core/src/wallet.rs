//! Coin balance of the single local user.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::{Store, WriteBatch};

/// Key of the singleton profile record.
pub const PROFILE_ID: &str = "user";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub coins: u64,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            id: PROFILE_ID.to_string(),
            coins: 0,
        }
    }
}

impl UserProfile {
    pub(crate) fn credited(&self, coins: u64) -> UserProfile {
        UserProfile {
            coins: self.coins.saturating_add(coins),
            ..self.clone()
        }
    }
}

/// Read-only view over the profile collection.
pub struct UserWallet<'a, S: Store + ?Sized> {
    store: &'a S,
}

impl<'a, S: Store + ?Sized> UserWallet<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Load the profile, creating it with zero coins on first read.
    pub fn profile(&self) -> Result<UserProfile> {
        if let Some(profile) = self.store.get_profile()? {
            return Ok(profile);
        }
        let profile = UserProfile::default();
        self.store
            .commit(WriteBatch::new().upsert_profile(profile.clone()))?;
        tracing::info!("user profile created");
        Ok(profile)
    }

    pub fn balance(&self) -> Result<u64> {
        Ok(self.profile()?.coins)
    }
}
