// In-memory ledger store. Primary store for tests and single-process
// deployments; everything lives behind tokio RwLocks.

use super::{EntryFilter, LedgerStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::trace;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use taskhive_common::{
    Account, AccountId, Campaign, CampaignMembership, EarnedAchievement, EntryKind, LedgerEntry,
    RewardError, RewardResult,
};
use tokio::sync::RwLock;

/// In-memory [`LedgerStore`] implementation
///
/// The ledger is a flat append-only vector; per-account reads scan it in
/// reverse. Good enough for the volumes a single process handles, and the
/// scan order gives "newest first" for free.
pub struct MemoryStorage {
    accounts: Arc<RwLock<HashMap<AccountId, Account>>>,
    // Entries are append-only; ids are 1-based positions in this vector
    entries: Arc<RwLock<Vec<LedgerEntry>>>,
    earned: Arc<RwLock<HashSet<(AccountId, u64)>>>,
    earned_records: Arc<RwLock<Vec<EarnedAchievement>>>,
    campaigns: Arc<RwLock<HashMap<u64, Campaign>>>,
    memberships: Arc<RwLock<Vec<CampaignMembership>>>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            accounts: Arc::new(RwLock::new(HashMap::new())),
            entries: Arc::new(RwLock::new(Vec::new())),
            earned: Arc::new(RwLock::new(HashSet::new())),
            earned_records: Arc::new(RwLock::new(Vec::new())),
            campaigns: Arc::new(RwLock::new(HashMap::new())),
            memberships: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Total number of ledger entries across all accounts
    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl LedgerStore for MemoryStorage {
    async fn get_account(&self, id: AccountId) -> RewardResult<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(&id).cloned())
    }

    async fn insert_account(&self, account: Account) -> RewardResult<()> {
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&account.id) {
            return Err(RewardError::AccountAlreadyExists(account.id));
        }
        trace!("insert account {}", account.id);
        accounts.insert(account.id, account);
        Ok(())
    }

    async fn update_account(&self, account: Account) -> RewardResult<()> {
        let mut accounts = self.accounts.write().await;
        if !accounts.contains_key(&account.id) {
            return Err(RewardError::AccountNotFound(account.id));
        }
        accounts.insert(account.id, account);
        Ok(())
    }

    async fn commit_entry(
        &self,
        account: Account,
        mut entry: LedgerEntry,
    ) -> RewardResult<LedgerEntry> {
        // Hold both write locks for the whole commit so readers never see
        // the account row without its ledger entry or vice versa
        let mut accounts = self.accounts.write().await;
        let mut entries = self.entries.write().await;

        if !accounts.contains_key(&account.id) {
            return Err(RewardError::AccountNotFound(account.id));
        }

        entry.id = entries.len() as u64 + 1;
        trace!(
            "commit entry {} kind {} amount {} for account {}",
            entry.id,
            entry.kind,
            entry.amount,
            entry.account_id
        );
        accounts.insert(account.id, account);
        entries.push(entry.clone());
        Ok(entry)
    }

    async fn entries(
        &self,
        account_id: AccountId,
        filter: &EntryFilter,
    ) -> RewardResult<Vec<LedgerEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .rev()
            .filter(|e| e.account_id == account_id && filter.matches(e))
            .skip(filter.offset)
            .take(filter.effective_limit())
            .cloned()
            .collect())
    }

    async fn last_entry(&self, account_id: AccountId) -> RewardResult<Option<LedgerEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .rev()
            .find(|e| e.account_id == account_id)
            .cloned())
    }

    async fn sum_amount(
        &self,
        account_id: AccountId,
        kind: EntryKind,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> RewardResult<u64> {
        let entries = self.entries.read().await;
        let sum = entries
            .iter()
            .filter(|e| {
                e.account_id == account_id
                    && e.kind == kind
                    && since.map(|s| e.created_at >= s).unwrap_or(true)
                    && until.map(|u| e.created_at < u).unwrap_or(true)
            })
            .fold(0u64, |acc, e| acc.saturating_add(e.amount));
        Ok(sum)
    }

    async fn has_entry_for_related(
        &self,
        account_id: AccountId,
        kind: EntryKind,
        related: AccountId,
    ) -> RewardResult<bool> {
        let entries = self.entries.read().await;
        Ok(entries.iter().any(|e| {
            e.account_id == account_id
                && e.kind == kind
                && e.related_account() == Some(related)
        }))
    }

    async fn earned_achievements(
        &self,
        account_id: AccountId,
    ) -> RewardResult<Vec<EarnedAchievement>> {
        let records = self.earned_records.read().await;
        Ok(records
            .iter()
            .filter(|r| r.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn insert_earned_achievement(&self, earned: EarnedAchievement) -> RewardResult<bool> {
        // The set insert is the uniqueness guard; the record vector is the
        // queryable history
        let mut keys = self.earned.write().await;
        if !keys.insert((earned.account_id, earned.achievement_id)) {
            return Ok(false);
        }
        let mut records = self.earned_records.write().await;
        records.push(earned);
        Ok(true)
    }

    async fn put_campaign(&self, campaign: Campaign) -> RewardResult<()> {
        let mut campaigns = self.campaigns.write().await;
        campaigns.insert(campaign.id, campaign);
        Ok(())
    }

    async fn get_campaign(&self, id: u64) -> RewardResult<Option<Campaign>> {
        let campaigns = self.campaigns.read().await;
        Ok(campaigns.get(&id).cloned())
    }

    async fn insert_membership(&self, membership: CampaignMembership) -> RewardResult<bool> {
        let mut memberships = self.memberships.write().await;
        if memberships
            .iter()
            .any(|m| m.campaign_id == membership.campaign_id && m.account_id == membership.account_id)
        {
            return Ok(false);
        }
        memberships.push(membership);
        Ok(true)
    }

    async fn memberships_for(
        &self,
        account_id: AccountId,
    ) -> RewardResult<Vec<CampaignMembership>> {
        let memberships = self.memberships.read().await;
        Ok(memberships
            .iter()
            .filter(|m| m.account_id == account_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskhive_common::{Correlation, EntryStatus};

    fn account(id: u64) -> Account {
        Account::new(AccountId(id), Utc::now())
    }

    fn entry(account_id: u64, kind: EntryKind, amount: u64) -> LedgerEntry {
        LedgerEntry {
            id: 0,
            account_id: AccountId(account_id),
            kind,
            amount,
            balance_before: 0,
            balance_after: amount,
            status: EntryStatus::Completed,
            correlation: Correlation::None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_account_rejects_duplicate() {
        let storage = MemoryStorage::new();
        storage.insert_account(account(1)).await.unwrap();
        assert_eq!(
            storage.insert_account(account(1)).await,
            Err(RewardError::AccountAlreadyExists(AccountId(1)))
        );
    }

    #[tokio::test]
    async fn test_commit_assigns_monotonic_ids() {
        let storage = MemoryStorage::new();
        storage.insert_account(account(1)).await.unwrap();
        let a = storage.get_account(AccountId(1)).await.unwrap().unwrap();
        let e1 = storage
            .commit_entry(a.clone(), entry(1, EntryKind::Deposit, 10))
            .await
            .unwrap();
        let e2 = storage
            .commit_entry(a, entry(1, EntryKind::Deposit, 20))
            .await
            .unwrap();
        assert_eq!(e1.id, 1);
        assert_eq!(e2.id, 2);
        assert_eq!(storage.entry_count().await, 2);
    }

    #[tokio::test]
    async fn test_entries_newest_first_with_pagination() {
        let storage = MemoryStorage::new();
        storage.insert_account(account(1)).await.unwrap();
        let a = storage.get_account(AccountId(1)).await.unwrap().unwrap();
        for amount in [10, 20, 30] {
            storage
                .commit_entry(a.clone(), entry(1, EntryKind::Deposit, amount))
                .await
                .unwrap();
        }

        let filter = EntryFilter {
            limit: 2,
            ..Default::default()
        };
        let page = storage.entries(AccountId(1), &filter).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].amount, 30);
        assert_eq!(page[1].amount, 20);

        let filter = EntryFilter {
            offset: 2,
            ..Default::default()
        };
        let rest = storage.entries(AccountId(1), &filter).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].amount, 10);
    }

    #[tokio::test]
    async fn test_sum_amount_by_kind() {
        let storage = MemoryStorage::new();
        storage.insert_account(account(1)).await.unwrap();
        let a = storage.get_account(AccountId(1)).await.unwrap().unwrap();
        storage
            .commit_entry(a.clone(), entry(1, EntryKind::ReferralActivity, 40))
            .await
            .unwrap();
        storage
            .commit_entry(a.clone(), entry(1, EntryKind::ReferralActivity, 60))
            .await
            .unwrap();
        storage
            .commit_entry(a, entry(1, EntryKind::Deposit, 500))
            .await
            .unwrap();

        let sum = storage
            .sum_amount(AccountId(1), EntryKind::ReferralActivity, None, None)
            .await
            .unwrap();
        assert_eq!(sum, 100);
    }

    #[tokio::test]
    async fn test_earned_achievement_unique_pair() {
        let storage = MemoryStorage::new();
        let earned = EarnedAchievement {
            account_id: AccountId(1),
            achievement_id: 7,
            earned_at: Utc::now(),
        };
        assert!(storage
            .insert_earned_achievement(earned.clone())
            .await
            .unwrap());
        assert!(!storage.insert_earned_achievement(earned).await.unwrap());
        assert_eq!(
            storage.earned_achievements(AccountId(1)).await.unwrap().len(),
            1
        );
    }
}
