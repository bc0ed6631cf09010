//! Self-service account operations: profile edits and refreshing the stats
//! of a linked coding profile.
//!
//! Stats come from a [`StatsSource`]. The bundled [`SimulatedStatsSource`]
//! drifts the stored numbers the way a live profile would; swap in a real
//! provider client behind the same trait.

pub mod handlers;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use rand::Rng;
use thiserror::Error;
use tracing::info;

use crate::models::user::{AccountStats, ExternalAccount, Platform, UserPatch};
use crate::store::{Store, StoreError};

/// Upper bound accepted for a reported solved count.
pub const MAX_SOLVED_COUNT: u32 = 100_000;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("unknown user")]
    UnknownUser,

    #[error("no linked {0:?} account")]
    UnknownAccount(Platform),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Fetches current stats for a linked profile.
#[async_trait]
pub trait StatsSource: Send + Sync {
    async fn fetch(&self, account: &ExternalAccount) -> AccountStats;
}

pub struct SimulatedStatsSource;

#[async_trait]
impl StatsSource for SimulatedStatsSource {
    async fn fetch(&self, account: &ExternalAccount) -> AccountStats {
        let mut rng = rand::thread_rng();
        AccountStats {
            solved_count: account
                .stats
                .solved_count
                .saturating_add(rng.gen_range(0..5))
                .min(MAX_SOLVED_COUNT),
            ranking: account
                .stats
                .ranking
                .saturating_sub(rng.gen_range(0..50))
                .max(1),
        }
    }
}

pub struct AccountSyncer {
    store: Arc<dyn Store>,
    source: Arc<dyn StatsSource>,
}

impl AccountSyncer {
    pub fn new(store: Arc<dyn Store>, source: Arc<dyn StatsSource>) -> Self {
        Self { store, source }
    }

    /// Refreshes the `platform` account of `user_id` and stamps `lastSynced`.
    pub async fn sync(
        &self,
        user_id: &str,
        platform: Platform,
    ) -> Result<ExternalAccount, SyncError> {
        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(SyncError::UnknownUser)?;

        let mut accounts = user.external_accounts;
        let account = accounts
            .iter_mut()
            .find(|a| a.platform == platform)
            .ok_or(SyncError::UnknownAccount(platform))?;

        account.stats = self.source.fetch(account).await;
        account.last_synced = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let synced = account.clone();

        self.store
            .mutate(
                user_id,
                UserPatch {
                    external_accounts: Some(accounts),
                    ..Default::default()
                },
            )
            .await?
            .ok_or(SyncError::UnknownUser)?;

        info!(
            %user_id,
            ?platform,
            solved = synced.stats.solved_count,
            "external account synced"
        );
        Ok(synced)
    }
}
