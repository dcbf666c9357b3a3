// Account row: wallet state plus the referral-graph edge.

use crate::types::{AccountId, AccountLevel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One account per user: wallet balances, lifetime counters and the
/// back-reference to the referrer.
///
/// Accounts are never deleted, only soft-deactivated. All balance mutations
/// go through the account mutator so that every change is paired with a
/// ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    /// The account id (platform user id)
    pub id: AccountId,

    /// Spendable balance in currency units, never negative
    pub balance: u64,

    /// Reserved balance (e.g. funds locked behind pending checks), not
    /// spendable
    pub frozen_balance: u64,

    /// Tier derived from `balance`, recomputed on every mutation
    pub level: AccountLevel,

    /// Lifetime credited amount (monotonic)
    pub total_earned: u64,

    /// Lifetime debited amount (monotonic)
    pub total_spent: u64,

    /// The referrer's account id (None = no referrer / organic signup).
    /// One-time binding: once set it is never overwritten.
    pub referrer_id: Option<AccountId>,

    /// Cached count of direct referrals
    pub referrals_count: u32,

    /// Cached count of direct referrals that upgraded to premium
    pub premium_referrals_count: u32,

    /// Soft-deactivation flag; deactivated accounts reject mutations
    pub is_active: bool,

    /// Registration timestamp
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create a fresh account with a zero balance
    pub fn new(id: AccountId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            balance: 0,
            frozen_balance: 0,
            level: AccountLevel::Bronze,
            total_earned: 0,
            total_spent: 0,
            referrer_id: None,
            referrals_count: 0,
            premium_referrals_count: 0,
            is_active: true,
            created_at,
        }
    }

    /// Check if this account has a referrer
    pub fn has_referrer(&self) -> bool {
        self.referrer_id.is_some()
    }

    /// Recompute the level from the current balance
    pub fn recompute_level(&mut self) {
        self.level = AccountLevel::from_balance(self.balance);
    }

    /// Increment the direct referrals counter
    pub fn increment_referrals_count(&mut self) {
        self.referrals_count = self.referrals_count.saturating_add(1);
    }

    /// Increment the premium referrals counter
    pub fn increment_premium_referrals_count(&mut self) {
        self.premium_referrals_count = self.premium_referrals_count.saturating_add(1);
    }

    /// Referral conversion rate in basis points (premium referrals over all
    /// referrals, 10000 = 100%)
    ///
    /// Returns 0 for accounts without referrals.
    pub fn conversion_rate_bps(&self) -> u32 {
        if self.referrals_count == 0 {
            return 0;
        }
        ((self.premium_referrals_count as u64 * 10_000) / self.referrals_count as u64) as u32
    }

    /// Soft-deactivate the account
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> Account {
        Account::new(AccountId(1), Utc::now())
    }

    #[test]
    fn test_new_account_defaults() {
        let a = account();
        assert_eq!(a.balance, 0);
        assert_eq!(a.level, AccountLevel::Bronze);
        assert!(!a.has_referrer());
        assert!(a.is_active);
    }

    #[test]
    fn test_level_recompute() {
        let mut a = account();
        a.balance = 60_000;
        a.recompute_level();
        assert_eq!(a.level, AccountLevel::Gold);
        a.balance = 5_000;
        a.recompute_level();
        assert_eq!(a.level, AccountLevel::Bronze);
    }

    #[test]
    fn test_conversion_rate() {
        let mut a = account();
        assert_eq!(a.conversion_rate_bps(), 0);
        a.referrals_count = 4;
        a.premium_referrals_count = 1;
        assert_eq!(a.conversion_rate_bps(), 2_500); // 25%
    }
}
