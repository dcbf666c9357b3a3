// Time-boxed promotional campaigns: multiplier overlays on top of the base
// reward configuration.

use crate::account::Account;
use crate::types::AccountLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Neutral multiplier in basis points (10000 = 1.0x)
pub const BPS_ONE: u32 = 10_000;

/// Multipliers applied to the base reward amounts, in basis points
/// (10000 = 1.0x, 15000 = 1.5x). Applied before flooring.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CampaignMultipliers {
    pub registration_bps: u32,
    pub premium_bonus_bps: u32,
    pub activity_bps: u32,
}

impl Default for CampaignMultipliers {
    fn default() -> Self {
        Self {
            registration_bps: BPS_ONE,
            premium_bonus_bps: BPS_ONE,
            activity_bps: BPS_ONE,
        }
    }
}

/// Conditions an account must meet to join a campaign
///
/// Eligibility is checked once, at join time, not at every reward
/// computation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CampaignEligibility {
    /// Minimum direct referrals required
    pub min_referrals: u32,

    /// Required exact level, if any
    pub target_level: Option<AccountLevel>,

    /// Whether the account itself must be premium
    pub requires_premium: bool,
}

impl CampaignEligibility {
    /// Check whether an account meets these conditions
    pub fn is_met_by(&self, account: &Account) -> bool {
        if account.referrals_count < self.min_referrals {
            return false;
        }
        if let Some(level) = self.target_level {
            if account.level != level {
                return false;
            }
        }
        if self.requires_premium && account.level != AccountLevel::Premium {
            return false;
        }
        true
    }
}

/// A time-boxed promotion boosting referral rewards for its members
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Campaign {
    pub id: u64,
    pub name: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub multipliers: CampaignMultipliers,
    pub eligibility: CampaignEligibility,
}

impl Campaign {
    /// Check whether the campaign window covers the given instant
    pub fn is_active(&self, at: DateTime<Utc>) -> bool {
        self.starts_at <= at && at < self.ends_at
    }
}

/// One-time membership record: an account joined a campaign
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CampaignMembership {
    pub campaign_id: u64,
    pub account_id: crate::types::AccountId,
    pub joined_at: DateTime<Utc>,
}

/// Apply a basis-point multiplier to a base amount, flooring the result.
/// Widened to u128 so large amounts cannot overflow.
pub fn apply_bps(amount: u64, bps: u32) -> u64 {
    ((amount as u128 * bps as u128) / BPS_ONE as u128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AccountId;
    use chrono::Duration;

    fn campaign(now: DateTime<Utc>) -> Campaign {
        Campaign {
            id: 1,
            name: "summer boost".to_string(),
            starts_at: now - Duration::hours(1),
            ends_at: now + Duration::hours(1),
            multipliers: CampaignMultipliers {
                registration_bps: 15_000,
                premium_bonus_bps: BPS_ONE,
                activity_bps: 20_000,
            },
            eligibility: CampaignEligibility {
                min_referrals: 2,
                target_level: None,
                requires_premium: false,
            },
        }
    }

    #[test]
    fn test_window() {
        let now = Utc::now();
        let c = campaign(now);
        assert!(c.is_active(now));
        assert!(!c.is_active(now - Duration::hours(2)));
        assert!(!c.is_active(c.ends_at)); // end is exclusive
    }

    #[test]
    fn test_eligibility() {
        let now = Utc::now();
        let c = campaign(now);
        let mut account = Account::new(AccountId(1), now);
        assert!(!c.eligibility.is_met_by(&account));
        account.referrals_count = 2;
        assert!(c.eligibility.is_met_by(&account));

        let mut premium_only = c.eligibility.clone();
        premium_only.requires_premium = true;
        assert!(!premium_only.is_met_by(&account));
        account.balance = 150_000;
        account.recompute_level();
        assert!(premium_only.is_met_by(&account));
    }

    #[test]
    fn test_apply_bps() {
        assert_eq!(apply_bps(1_000, BPS_ONE), 1_000);
        assert_eq!(apply_bps(1_000, 15_000), 1_500);
        // Floors after multiplication
        assert_eq!(apply_bps(333, 15_000), 499);
        assert_eq!(apply_bps(u64::MAX, BPS_ONE), u64::MAX);
    }
}
