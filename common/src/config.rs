// Reward configuration: per-level reward amounts, activity percentages and
// daily caps. Pure data, read by the reward engine at event time and
// hot-swappable without restart.

use crate::types::{AccountLevel, ActivityType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

/// Fixed multiplier applied to the registration reward when a referral
/// upgrades to premium and no explicit bonus amount is configured
pub const DEFAULT_PREMIUM_BONUS_MULTIPLIER: u64 = 2;

/// Reward parameters for one account level
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LevelRewards {
    /// One-time reward paid to the referrer when a referral registers
    pub registration_reward: u64,

    /// One-time bonus paid to the referrer when a referral upgrades to
    /// premium. `None` means "2x the registration reward", the default
    /// policy.
    pub premium_bonus: Option<u64>,

    /// Activity reward percentage per activity type (whole percent, 5 = 5%)
    pub activity_percent: IndexMap<ActivityType, u8>,

    /// Maximum total of activity rewards payable per calendar day (UTC)
    pub daily_activity_cap: u64,
}

impl LevelRewards {
    /// Effective premium-upgrade bonus: explicit value if configured,
    /// otherwise the 2x registration default
    pub fn effective_premium_bonus(&self) -> u64 {
        self.premium_bonus.unwrap_or_else(|| {
            self.registration_reward
                .saturating_mul(DEFAULT_PREMIUM_BONUS_MULTIPLIER)
        })
    }

    /// Activity percentage for a given activity type (0 if unconfigured)
    pub fn activity_percent(&self, activity: ActivityType) -> u8 {
        self.activity_percent.get(&activity).copied().unwrap_or(0)
    }
}

/// Per-level reward table
///
/// Read-only at reward-computation time. Embedders hold it behind a lock and
/// may replace it wholesale to hot-reload rates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RewardConfig {
    pub levels: IndexMap<AccountLevel, LevelRewards>,
}

impl RewardConfig {
    /// Rewards for a given level
    ///
    /// Falls back to the bronze row if a level is missing from a partially
    /// loaded configuration, so a reward computation never hard-fails on a
    /// config gap.
    pub fn for_level(&self, level: AccountLevel) -> &LevelRewards {
        self.levels
            .get(&level)
            .or_else(|| self.levels.get(&AccountLevel::Bronze))
            .expect("reward config must define at least the bronze level")
    }

    /// Validate the table: every level present, percentages sane
    pub fn is_valid(&self) -> bool {
        AccountLevel::iter().all(|level| {
            self.levels
                .get(&level)
                .map(|r| r.activity_percent.values().all(|&p| p <= 100))
                .unwrap_or(false)
        })
    }
}

impl Default for RewardConfig {
    fn default() -> Self {
        let row = |registration: u64, task: u8, top_up: u8, cap: u64| LevelRewards {
            registration_reward: registration,
            premium_bonus: None,
            activity_percent: IndexMap::from([
                (ActivityType::TaskCompletion, task),
                (ActivityType::BalanceTopUp, top_up),
            ]),
            daily_activity_cap: cap,
        };

        Self {
            levels: IndexMap::from([
                (AccountLevel::Bronze, row(1_000, 5, 3, 500)),
                (AccountLevel::Silver, row(1_500, 7, 5, 1_500)),
                (AccountLevel::Gold, row(2_000, 10, 7, 5_000)),
                (AccountLevel::Premium, row(3_000, 15, 10, 10_000)),
            ]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = RewardConfig::default();
        assert!(config.is_valid());
        let bronze = config.for_level(AccountLevel::Bronze);
        assert_eq!(bronze.registration_reward, 1_000);
        assert_eq!(bronze.activity_percent(ActivityType::TaskCompletion), 5);
        assert_eq!(bronze.daily_activity_cap, 500);
    }

    #[test]
    fn test_premium_bonus_defaults_to_double() {
        let config = RewardConfig::default();
        let gold = config.for_level(AccountLevel::Gold);
        assert_eq!(gold.effective_premium_bonus(), 4_000);

        let mut explicit = gold.clone();
        explicit.premium_bonus = Some(5_000);
        assert_eq!(explicit.effective_premium_bonus(), 5_000);
    }

    #[test]
    fn test_missing_level_falls_back_to_bronze() {
        let mut config = RewardConfig::default();
        config.levels.shift_remove(&AccountLevel::Premium);
        assert!(!config.is_valid());
        let row = config.for_level(AccountLevel::Premium);
        assert_eq!(row.registration_reward, 1_000);
    }

    #[test]
    fn test_unconfigured_activity_percent_is_zero() {
        let mut config = RewardConfig::default();
        let bronze = config
            .levels
            .get_mut(&AccountLevel::Bronze)
            .unwrap();
        bronze.activity_percent.shift_remove(&ActivityType::BalanceTopUp);
        assert_eq!(
            config
                .for_level(AccountLevel::Bronze)
                .activity_percent(ActivityType::BalanceTopUp),
            0
        );
    }
}
