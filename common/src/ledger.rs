// Immutable ledger entry types: the append-only audit trail of every
// balance-affecting event.

use crate::types::{AccountId, ActivityType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// Unique, monotonically increasing ledger entry id, assigned by the store
pub type EntryId = u64;

/// Kind of balance-affecting event
///
/// The kind fully determines the direction of the balance change, so a
/// ledger entry cannot record a credit under a debit kind or vice versa.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntryKind {
    /// Balance top-up from an external payment
    Deposit,
    /// Reward for a completed task
    TaskReward,
    /// Payment for publishing a task
    TaskPayment,
    /// One-time reward for referring a new user
    ReferralReward,
    /// One-time bonus when a referral upgrades to premium
    ReferralPremiumBonus,
    /// Percentage reward from a referral's activity
    ReferralActivity,
    /// One-time achievement unlock reward
    AchievementReward,
    /// Peer-to-peer check sent
    CheckSent,
    /// Peer-to-peer check received
    CheckReceived,
    /// Bonus distributed by an administrator
    AdminBonus,
    /// Refund of a previously debited amount
    Refund,
    /// Platform commission
    Commission,
}

/// Whether an entry credits or debits the account balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    Credit,
    Debit,
}

impl EntryKind {
    /// Direction of the balance change for this kind
    pub fn direction(&self) -> Direction {
        match self {
            Self::Deposit
            | Self::TaskReward
            | Self::ReferralReward
            | Self::ReferralPremiumBonus
            | Self::ReferralActivity
            | Self::AchievementReward
            | Self::CheckReceived
            | Self::AdminBonus
            | Self::Refund => Direction::Credit,
            Self::TaskPayment | Self::CheckSent | Self::Commission => Direction::Debit,
        }
    }

    /// Check if this kind is part of the referral reward family
    pub fn is_referral_reward(&self) -> bool {
        matches!(
            self,
            Self::ReferralReward | Self::ReferralPremiumBonus | Self::ReferralActivity
        )
    }
}

/// Entry lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntryStatus {
    Pending,
    Completed,
    Failed,
}

/// Typed correlation attached to a ledger entry
///
/// A closed set of variants instead of a free-form metadata bag: each entry
/// kind carries at most one correlation shape, so reporting can attribute
/// rewards without parsing untyped payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Correlation {
    /// No related object
    None,
    /// Entry caused by a task execution
    Task { task_id: u64 },
    /// Entry caused by a peer-to-peer check
    Check { check_id: u64 },
    /// Entry caused by a referral event; `activity_type` is set for
    /// activity-percentage rewards only
    Referral {
        referred_id: AccountId,
        #[serde(skip_serializing_if = "Option::is_none")]
        activity_type: Option<ActivityType>,
    },
    /// Entry caused by an achievement unlock
    Achievement { achievement_id: u64 },
    /// Entry boosted or granted by a campaign
    Campaign { campaign_id: u64 },
    /// Entry issued manually by an administrator
    Admin { admin_id: AccountId, reason: String },
}

impl Correlation {
    /// The counterparty account, if the correlation names one
    pub fn related_account(&self) -> Option<AccountId> {
        match self {
            Self::Referral { referred_id, .. } => Some(*referred_id),
            Self::Admin { admin_id, .. } => Some(*admin_id),
            _ => None,
        }
    }
}

/// One immutable, balance-affecting audit record
///
/// `balance_before` and `balance_after` are snapshots taken at commit time:
/// the ordered entries of an account form its exact balance history without
/// replay. An entry is only ever written together with the matching account
/// mutation, in one atomic unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Store-assigned id, monotonic per store
    pub id: EntryId,

    /// The account whose balance changed
    pub account_id: AccountId,

    /// Event kind; determines the direction
    pub kind: EntryKind,

    /// Amount moved, strictly positive
    pub amount: u64,

    /// Balance snapshot before the mutation
    pub balance_before: u64,

    /// Balance snapshot after the mutation
    pub balance_after: u64,

    /// Entry lifecycle status
    pub status: EntryStatus,

    /// Typed correlation to the causing object
    pub correlation: Correlation,

    /// Commit timestamp
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Direction of this entry, derived from its kind
    pub fn direction(&self) -> Direction {
        self.kind.direction()
    }

    /// Verify the balance snapshot arithmetic:
    /// `balance_after == balance_before ± amount` depending on direction.
    pub fn is_consistent(&self) -> bool {
        if self.amount == 0 {
            return false;
        }
        match self.direction() {
            Direction::Credit => self
                .balance_before
                .checked_add(self.amount)
                .map(|after| after == self.balance_after)
                .unwrap_or(false),
            Direction::Debit => self
                .balance_before
                .checked_sub(self.amount)
                .map(|after| after == self.balance_after)
                .unwrap_or(false),
        }
    }

    /// The counterparty account, if any
    pub fn related_account(&self) -> Option<AccountId> {
        self.correlation.related_account()
    }
}
