// Achievement catalog types and the earned-achievement idempotency record.

use crate::types::AccountId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unlock requirement checked against an account's cumulative referral
/// statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "threshold", rename_all = "snake_case")]
pub enum AchievementRequirement {
    /// At least N direct referrals
    ReferralsCount(u32),
    /// At least N currency units earned from referral rewards, lifetime
    TotalReferralEarned(u64),
    /// Conversion rate (premium referrals / referrals) of at least N basis
    /// points; only evaluated once the account has referrals at all
    ConversionRateBps(u32),
}

/// Statistics snapshot the requirements are evaluated against
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferralSnapshot {
    pub referrals_count: u32,
    pub total_referral_earned: u64,
    pub conversion_rate_bps: u32,
}

impl AchievementRequirement {
    /// Check whether the requirement is satisfied by the snapshot
    pub fn is_met(&self, stats: &ReferralSnapshot) -> bool {
        match *self {
            Self::ReferralsCount(threshold) => stats.referrals_count >= threshold,
            Self::TotalReferralEarned(threshold) => stats.total_referral_earned >= threshold,
            Self::ConversionRateBps(threshold) => {
                stats.referrals_count > 0 && stats.conversion_rate_bps >= threshold
            }
        }
    }
}

/// One unlockable achievement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: u64,
    pub title: String,
    pub requirement: AchievementRequirement,
    /// One-time reward issued on unlock (0 = title only)
    pub reward: u64,
}

/// Idempotency record: `(account_id, achievement_id)` is unique, preventing
/// double-award under concurrent evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarnedAchievement {
    pub account_id: AccountId,
    pub achievement_id: u64,
    pub earned_at: DateTime<Utc>,
}

/// Built-in achievement catalog
pub fn default_catalog() -> Vec<Achievement> {
    let achievement = |id, title: &str, requirement, reward| Achievement {
        id,
        title: title.to_string(),
        requirement,
        reward,
    };

    vec![
        achievement(
            1,
            "First Invite",
            AchievementRequirement::ReferralsCount(1),
            250,
        ),
        achievement(
            2,
            "Team Builder",
            AchievementRequirement::ReferralsCount(10),
            2_000,
        ),
        achievement(
            3,
            "Network Mogul",
            AchievementRequirement::ReferralsCount(50),
            15_000,
        ),
        achievement(
            4,
            "Referral Earner",
            AchievementRequirement::TotalReferralEarned(10_000),
            1_000,
        ),
        achievement(
            5,
            "Referral Tycoon",
            AchievementRequirement::TotalReferralEarned(100_000),
            10_000,
        ),
        achievement(
            6,
            "Closer",
            AchievementRequirement::ConversionRateBps(5_000),
            5_000,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requirements() {
        let stats = ReferralSnapshot {
            referrals_count: 10,
            total_referral_earned: 12_000,
            conversion_rate_bps: 3_000,
        };
        assert!(AchievementRequirement::ReferralsCount(10).is_met(&stats));
        assert!(!AchievementRequirement::ReferralsCount(11).is_met(&stats));
        assert!(AchievementRequirement::TotalReferralEarned(10_000).is_met(&stats));
        assert!(AchievementRequirement::ConversionRateBps(3_000).is_met(&stats));
        assert!(!AchievementRequirement::ConversionRateBps(3_001).is_met(&stats));
    }

    #[test]
    fn test_conversion_rate_needs_referrals() {
        // 0/0 must not unlock a conversion achievement
        let stats = ReferralSnapshot::default();
        assert!(!AchievementRequirement::ConversionRateBps(0).is_met(&stats));
    }

    #[test]
    fn test_default_catalog_ids_unique() {
        let catalog = default_catalog();
        let mut ids: Vec<u64> = catalog.iter().map(|a| a.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), catalog.len());
    }
}
