// Error taxonomy for the reward economy.

use crate::ledger::LedgerEntry;
use crate::types::AccountId;
use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;

/// Errors that abort a reward or ledger operation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RewardError {
    /// Debit exceeds the spendable balance. Fatal to the triggering
    /// operation, never retried by the core.
    #[error("Insufficient balance: need {need}, have {have}")]
    InsufficientBalance { need: u64, have: u64 },

    /// Account does not exist
    #[error("Account {0} not found")]
    AccountNotFound(AccountId),

    /// Account already exists (registration replay)
    #[error("Account {0} already exists")]
    AccountAlreadyExists(AccountId),

    /// Account is soft-deactivated and rejects mutations
    #[error("Account {0} is deactivated")]
    AccountDeactivated(AccountId),

    /// Amount must be strictly positive
    #[error("Amount must be positive")]
    ZeroAmount,

    /// Crediting would overflow the balance counter
    #[error("Balance overflow for account {0}")]
    BalanceOverflow(AccountId),

    /// Binding this referrer would create a cycle in the referral graph
    #[error("Circular reference detected in referral chain")]
    CircularReference,

    /// Reward configuration failed validation and was not applied
    #[error("Invalid reward configuration")]
    InvalidRewardConfig,

    /// Campaign does not exist
    #[error("Campaign {0} not found")]
    CampaignNotFound(u64),

    /// Campaign window is not active
    #[error("Campaign {0} is not active")]
    CampaignNotActive(u64),

    /// Account does not meet the campaign's eligibility conditions
    #[error("Account {account} is not eligible for campaign {campaign}")]
    CampaignNotEligible { campaign: u64, account: AccountId },

    /// Account already joined this campaign
    #[error("Account {account} already joined campaign {campaign}")]
    CampaignAlreadyJoined { campaign: u64, account: AccountId },

    /// Underlying store failed; nothing was committed, safe to retry
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for reward operations
pub type RewardResult<T> = Result<T, RewardError>;

/// Why a reward path intentionally issued nothing
///
/// A skip is not a failure: the triggering operation (registration, task
/// completion, upgrade) still succeeds. Typed so operators and tests can
/// tell "nothing happened, as designed" from "something broke".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    /// Referral code did not resolve to an account
    InvalidCode,
    /// Code resolves to the registering account itself
    SelfReferral,
    /// Account already has a referrer bound; later codes are ignored
    AlreadyReferred,
    /// Account has no referrer, nothing to reward
    NoReferrer,
    /// The referrer account is deactivated and cannot receive rewards
    ReferrerInactive,
    /// Idempotency record already exists (premium bonus, achievement)
    AlreadyRewarded,
    /// Computed reward floored to zero
    ZeroReward,
    /// Daily activity cap already exhausted
    CapExhausted,
}

/// Outcome of a reward-issuing path: either the committed ledger entry or a
/// typed reason why nothing was issued
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewardOutcome {
    Issued(LedgerEntry),
    Skipped(SkipReason),
}

impl RewardOutcome {
    /// The issued entry, if any
    pub fn issued(&self) -> Option<&LedgerEntry> {
        match self {
            Self::Issued(entry) => Some(entry),
            Self::Skipped(_) => None,
        }
    }

    /// The skip reason, if nothing was issued
    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::Issued(_) => None,
            Self::Skipped(reason) => Some(*reason),
        }
    }

    pub fn is_issued(&self) -> bool {
        matches!(self, Self::Issued(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RewardError::InsufficientBalance { need: 150, have: 100 };
        assert_eq!(err.to_string(), "Insufficient balance: need 150, have 100");

        let err = RewardError::AccountNotFound(AccountId(5));
        assert_eq!(err.to_string(), "Account 5 not found");
    }

    #[test]
    fn test_skip_reason_display() {
        assert_eq!(SkipReason::SelfReferral.to_string(), "self_referral");
        assert_eq!(SkipReason::CapExhausted.to_string(), "cap_exhausted");
    }

    #[test]
    fn test_outcome_accessors() {
        let skipped = RewardOutcome::Skipped(SkipReason::NoReferrer);
        assert!(!skipped.is_issued());
        assert_eq!(skipped.skip_reason(), Some(SkipReason::NoReferrer));
        assert!(skipped.issued().is_none());
    }
}
