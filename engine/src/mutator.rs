// Account mutator: the single write path for balances.
//
// Every balance change in the system goes through `apply_delta`: it
// serializes on the account lock, validates the delta, recomputes the level
// and totals, and commits the account row together with the ledger entry as
// one atomic unit. A ledger entry without its balance change (or the other
// way around) can never be observed.

use crate::locks::AccountLocks;
use crate::storage::LedgerStore;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use log::{debug, info};
use std::sync::Arc;
use taskhive_common::{
    Account, AccountId, Correlation, Direction, EntryKind, EntryStatus, LedgerEntry, RewardError,
    RewardOutcome, RewardResult, SkipReason,
};

/// Applies balance deltas to accounts with invariant checks
pub struct AccountMutator {
    storage: Arc<dyn LedgerStore>,
    locks: AccountLocks,
}

/// UTC day window containing `at`: `[start, end)`
pub fn day_bounds(at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = at.date_naive().and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

impl AccountMutator {
    pub fn new(storage: Arc<dyn LedgerStore>) -> Self {
        Self {
            storage,
            locks: AccountLocks::new(),
        }
    }

    /// Create a fresh account with a zero balance
    pub async fn create_account(&self, id: AccountId) -> RewardResult<Account> {
        let account = Account::new(id, Utc::now());
        self.storage.insert_account(account.clone()).await?;
        info!("account {} created", id);
        Ok(account)
    }

    /// Get an account, erroring if it does not exist
    pub async fn get_account_required(&self, id: AccountId) -> RewardResult<Account> {
        self.storage
            .get_account(id)
            .await?
            .ok_or(RewardError::AccountNotFound(id))
    }

    /// Current spendable balance
    pub async fn get_balance(&self, id: AccountId) -> RewardResult<u64> {
        Ok(self.get_account_required(id).await?.balance)
    }

    /// Apply a balance delta and record the matching ledger entry
    ///
    /// The direction is derived from `kind`. Runs under the account lock so
    /// concurrent deltas against the same account serialize; the snapshot
    /// pair (`balance_before`, `balance_after`) is therefore always exact.
    ///
    /// # Errors
    /// * `InsufficientBalance` - a debit exceeds the spendable balance
    /// * `AccountNotFound` / `AccountDeactivated` / `ZeroAmount`
    /// * `Storage` - nothing was committed, safe to retry
    pub async fn apply_delta(
        &self,
        account_id: AccountId,
        amount: u64,
        kind: EntryKind,
        correlation: Correlation,
    ) -> RewardResult<LedgerEntry> {
        let _guard = self.locks.acquire(account_id).await;
        self.apply_locked(account_id, amount, kind, correlation).await
    }

    /// Credit with an atomic daily-cap reservation
    ///
    /// Sums today's entries of `kind` and clamps the credit to the remaining
    /// cap, all inside the same critical section as the balance write, so two
    /// concurrent credits can never jointly exceed the cap.
    pub async fn apply_capped_credit(
        &self,
        account_id: AccountId,
        amount: u64,
        daily_cap: u64,
        kind: EntryKind,
        correlation: Correlation,
    ) -> RewardResult<RewardOutcome> {
        debug_assert_eq!(kind.direction(), Direction::Credit);
        let _guard = self.locks.acquire(account_id).await;

        let (day_start, day_end) = day_bounds(Utc::now());
        let spent_today = self
            .storage
            .sum_amount(account_id, kind, Some(day_start), Some(day_end))
            .await?;
        let remaining = daily_cap.saturating_sub(spent_today);
        let granted = amount.min(remaining);
        if granted == 0 {
            debug!(
                "cap exhausted for account {}: kind {}, cap {}, already {}",
                account_id, kind, daily_cap, spent_today
            );
            return Ok(RewardOutcome::Skipped(SkipReason::CapExhausted));
        }

        let entry = self
            .apply_locked(account_id, granted, kind, correlation)
            .await?;
        Ok(RewardOutcome::Issued(entry))
    }

    /// One-time referrer binding: sets `referrer_id` if not already bound.
    /// Returns false when a referrer is already set (later codes never
    /// overwrite the first binding).
    pub async fn set_referrer(
        &self,
        account_id: AccountId,
        referrer_id: AccountId,
    ) -> RewardResult<bool> {
        let _guard = self.locks.acquire(account_id).await;
        let mut account = self.get_account_required(account_id).await?;
        if account.has_referrer() {
            return Ok(false);
        }
        account.referrer_id = Some(referrer_id);
        self.storage.update_account(account).await?;
        Ok(true)
    }

    /// Bump the referrer's referral counters; returns the updated row.
    /// Serialized on the referrer's lock like any other row mutation.
    pub async fn increment_referral_counter(
        &self,
        referrer_id: AccountId,
        premium: bool,
    ) -> RewardResult<Account> {
        let _guard = self.locks.acquire(referrer_id).await;
        let mut referrer = self.get_account_required(referrer_id).await?;
        if premium {
            referrer.increment_premium_referrals_count();
        } else {
            referrer.increment_referrals_count();
        }
        self.storage.update_account(referrer.clone()).await?;
        Ok(referrer)
    }

    /// Soft-deactivate an account; further mutations are rejected
    pub async fn deactivate_account(&self, account_id: AccountId) -> RewardResult<()> {
        let _guard = self.locks.acquire(account_id).await;
        let mut account = self.get_account_required(account_id).await?;
        account.deactivate();
        self.storage.update_account(account).await?;
        info!("account {} deactivated", account_id);
        Ok(())
    }

    // Caller must hold the account lock
    async fn apply_locked(
        &self,
        account_id: AccountId,
        amount: u64,
        kind: EntryKind,
        correlation: Correlation,
    ) -> RewardResult<LedgerEntry> {
        if amount == 0 {
            return Err(RewardError::ZeroAmount);
        }

        let mut account = self.get_account_required(account_id).await?;
        if !account.is_active {
            return Err(RewardError::AccountDeactivated(account_id));
        }

        let balance_before = account.balance;
        let balance_after = match kind.direction() {
            Direction::Credit => {
                let after = balance_before
                    .checked_add(amount)
                    .ok_or(RewardError::BalanceOverflow(account_id))?;
                account.total_earned = account.total_earned.saturating_add(amount);
                after
            }
            Direction::Debit => {
                if amount > balance_before {
                    return Err(RewardError::InsufficientBalance {
                        need: amount,
                        have: balance_before,
                    });
                }
                account.total_spent = account.total_spent.saturating_add(amount);
                balance_before - amount
            }
        };

        account.balance = balance_after;
        account.recompute_level();

        let entry = LedgerEntry {
            id: 0, // assigned by the store
            account_id,
            kind,
            amount,
            balance_before,
            balance_after,
            status: EntryStatus::Completed,
            correlation,
            created_at: Utc::now(),
        };

        let entry = self.storage.commit_entry(account, entry).await?;
        info!(
            "account {}: {} {} ({} -> {}), entry {}",
            account_id, kind, amount, balance_before, balance_after, entry.id
        );
        Ok(entry)
    }
}
