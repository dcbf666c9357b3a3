// Read-only surfaces over the ledger: balances, paginated history and
// referral statistics.

use crate::storage::{EntryFilter, LedgerStore};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;
use taskhive_common::{AccountId, EntryKind, LedgerEntry, RewardError, RewardResult};

/// Optional reporting window, `since` inclusive, `until` exclusive
#[derive(Debug, Clone, Copy, Default)]
pub struct Period {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

/// Aggregated referral statistics for one account
#[derive(Debug, Clone, Serialize)]
pub struct ReferralStats {
    pub total_referrals: u32,
    pub premium_referrals: u32,
    /// premium referrals / referrals, in basis points
    pub conversion_rate_bps: u32,
    /// Total referral income over the period
    pub total_earned: u64,
    /// Referral income per entry kind
    pub breakdown: IndexMap<EntryKind, u64>,
}

pub struct StatsService {
    storage: Arc<dyn LedgerStore>,
}

impl StatsService {
    pub fn new(storage: Arc<dyn LedgerStore>) -> Self {
        Self { storage }
    }

    /// Current spendable balance
    pub async fn get_balance(&self, account_id: AccountId) -> RewardResult<u64> {
        Ok(self
            .storage
            .get_account(account_id)
            .await?
            .ok_or(RewardError::AccountNotFound(account_id))?
            .balance)
    }

    /// Ledger history, newest first, filtered and paginated
    pub async fn get_ledger(
        &self,
        account_id: AccountId,
        filter: &EntryFilter,
    ) -> RewardResult<Vec<LedgerEntry>> {
        self.storage.entries(account_id, filter).await
    }

    /// Referral statistics for an account, optionally restricted to a
    /// period (the referral counters are lifetime; the earnings respect the
    /// period)
    pub async fn get_referral_stats(
        &self,
        account_id: AccountId,
        period: Option<Period>,
    ) -> RewardResult<ReferralStats> {
        let account = self
            .storage
            .get_account(account_id)
            .await?
            .ok_or(RewardError::AccountNotFound(account_id))?;
        let period = period.unwrap_or_default();

        let mut breakdown = IndexMap::new();
        let mut total_earned = 0u64;
        for kind in [
            EntryKind::ReferralReward,
            EntryKind::ReferralPremiumBonus,
            EntryKind::ReferralActivity,
        ] {
            let sum = self
                .storage
                .sum_amount(account_id, kind, period.since, period.until)
                .await?;
            total_earned = total_earned.saturating_add(sum);
            breakdown.insert(kind, sum);
        }

        Ok(ReferralStats {
            total_referrals: account.referrals_count,
            premium_referrals: account.premium_referrals_count,
            conversion_rate_bps: account.conversion_rate_bps(),
            total_earned,
            breakdown,
        })
    }
}
