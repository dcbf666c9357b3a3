// Core identifier and enumeration types shared across the reward economy.

use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumIter};

/// Balance threshold for the silver level
pub const SILVER_THRESHOLD: u64 = 10_000;
/// Balance threshold for the gold level
pub const GOLD_THRESHOLD: u64 = 50_000;
/// Balance threshold for the premium level
pub const PREMIUM_THRESHOLD: u64 = 100_000;

/// Unique account identifier
///
/// Accounts are keyed by the platform user id. The ledger never hands out
/// ids itself; registration assigns them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub u64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for AccountId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Kind of referral activity that generates a percentage reward for the
/// referrer
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActivityType {
    /// The referral completed a rewarded task
    TaskCompletion,
    /// The referral topped up their balance
    BalanceTopUp,
}

/// Account tier derived from the current balance
///
/// The level governs reward rates for the account as a *referrer*: it is
/// re-evaluated on every balance mutation, never cached across events.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AccountLevel {
    Bronze,
    Silver,
    Gold,
    Premium,
}

impl AccountLevel {
    /// Derive the level from a balance using the threshold table
    pub fn from_balance(balance: u64) -> Self {
        if balance >= PREMIUM_THRESHOLD {
            Self::Premium
        } else if balance >= GOLD_THRESHOLD {
            Self::Gold
        } else if balance >= SILVER_THRESHOLD {
            Self::Silver
        } else {
            Self::Bronze
        }
    }
}

impl Default for AccountLevel {
    fn default() -> Self {
        Self::Bronze
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_thresholds() {
        assert_eq!(AccountLevel::from_balance(0), AccountLevel::Bronze);
        assert_eq!(AccountLevel::from_balance(9_999), AccountLevel::Bronze);
        assert_eq!(AccountLevel::from_balance(10_000), AccountLevel::Silver);
        assert_eq!(AccountLevel::from_balance(49_999), AccountLevel::Silver);
        assert_eq!(AccountLevel::from_balance(50_000), AccountLevel::Gold);
        assert_eq!(AccountLevel::from_balance(100_000), AccountLevel::Premium);
        assert_eq!(AccountLevel::from_balance(u64::MAX), AccountLevel::Premium);
    }

    #[test]
    fn test_account_id_display() {
        assert_eq!(AccountId(42).to_string(), "42");
    }

    #[test]
    fn test_activity_type_serde() {
        let json = serde_json::to_string(&ActivityType::TaskCompletion).unwrap();
        assert_eq!(json, "\"task_completion\"");
        let back: ActivityType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ActivityType::TaskCompletion);
    }
}
