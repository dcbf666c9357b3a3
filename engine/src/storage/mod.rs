// Storage provider for the balance ledger.
//
// The trait is the persistence seam of the core: accounts, the append-only
// ledger, earned-achievement idempotency records and campaign memberships.
// The in-memory implementation lives in `memory`; production embedders plug
// a database-backed store behind the same trait.

mod memory;

pub use memory::MemoryStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use taskhive_common::{
    Account, AccountId, Campaign, CampaignMembership, EarnedAchievement, EntryKind, LedgerEntry,
    RewardResult,
};

/// Maximum number of ledger entries returned per page
pub const MAX_LEDGER_PAGE_SIZE: usize = 1000;

/// Filter for ledger reads
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    /// Only entries of this kind
    pub kind: Option<EntryKind>,
    /// Only entries created at or after this instant
    pub since: Option<DateTime<Utc>>,
    /// Only entries created strictly before this instant
    pub until: Option<DateTime<Utc>>,
    /// Pagination offset
    pub offset: usize,
    /// Page size; clamped to [`MAX_LEDGER_PAGE_SIZE`]. 0 means the maximum.
    pub limit: usize,
}

impl EntryFilter {
    /// Filter on a single entry kind
    pub fn by_kind(kind: EntryKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// Effective page size after clamping
    pub fn effective_limit(&self) -> usize {
        if self.limit == 0 {
            MAX_LEDGER_PAGE_SIZE
        } else {
            self.limit.min(MAX_LEDGER_PAGE_SIZE)
        }
    }

    /// Check an entry against the kind and time-range predicates
    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        if let Some(kind) = self.kind {
            if entry.kind != kind {
                return false;
            }
        }
        if let Some(since) = self.since {
            if entry.created_at < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if entry.created_at >= until {
                return false;
            }
        }
        true
    }
}

/// Storage provider for accounts, the ledger and the idempotency records
///
/// Callers serialize writes to one account through the account lock registry;
/// the store itself only guarantees that `commit_entry` persists the account
/// row and the ledger entry as one atomic unit.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    // ===== Accounts =====

    /// Get an account by id
    async fn get_account(&self, id: AccountId) -> RewardResult<Option<Account>>;

    /// Insert a fresh account
    ///
    /// # Errors
    /// * `AccountAlreadyExists` - an account with this id is already stored
    async fn insert_account(&self, account: Account) -> RewardResult<()>;

    /// Overwrite an existing account row (non-balance fields, e.g. the
    /// referrer binding or the referral counters)
    ///
    /// # Errors
    /// * `AccountNotFound` - no account with this id exists
    async fn update_account(&self, account: Account) -> RewardResult<()>;

    /// Atomically persist a mutated account row together with the ledger
    /// entry recording the mutation. Both writes succeed or neither does.
    ///
    /// The entry id is assigned by the store; the returned entry carries it.
    async fn commit_entry(
        &self,
        account: Account,
        entry: LedgerEntry,
    ) -> RewardResult<LedgerEntry>;

    // ===== Ledger reads =====

    /// Ledger entries for one account, newest first, filtered and paginated
    async fn entries(
        &self,
        account_id: AccountId,
        filter: &EntryFilter,
    ) -> RewardResult<Vec<LedgerEntry>>;

    /// The most recent ledger entry for an account, if any
    async fn last_entry(&self, account_id: AccountId) -> RewardResult<Option<LedgerEntry>>;

    /// Sum of entry amounts of one kind for an account within an optional
    /// time range (`since` inclusive, `until` exclusive)
    async fn sum_amount(
        &self,
        account_id: AccountId,
        kind: EntryKind,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> RewardResult<u64>;

    /// Check whether an entry of `kind` with `related` as counterparty
    /// exists for the account. Used as the premium-bonus idempotency probe.
    async fn has_entry_for_related(
        &self,
        account_id: AccountId,
        kind: EntryKind,
        related: AccountId,
    ) -> RewardResult<bool>;

    // ===== Achievements =====

    /// All earned-achievement records for an account
    async fn earned_achievements(
        &self,
        account_id: AccountId,
    ) -> RewardResult<Vec<EarnedAchievement>>;

    /// Insert an earned-achievement record if the `(account, achievement)`
    /// pair is not yet present. Returns false on duplicate, which callers
    /// treat as a benign no-op.
    async fn insert_earned_achievement(&self, earned: EarnedAchievement) -> RewardResult<bool>;

    // ===== Campaigns =====

    /// Create or replace a campaign definition
    async fn put_campaign(&self, campaign: Campaign) -> RewardResult<()>;

    /// Get a campaign by id
    async fn get_campaign(&self, id: u64) -> RewardResult<Option<Campaign>>;

    /// Insert a one-time membership record. Returns false if the account
    /// already joined this campaign.
    async fn insert_membership(&self, membership: CampaignMembership) -> RewardResult<bool>;

    /// All memberships of an account
    async fn memberships_for(
        &self,
        account_id: AccountId,
    ) -> RewardResult<Vec<CampaignMembership>>;
}
