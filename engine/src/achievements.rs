// Achievement evaluator.
//
// Scans an account's cumulative referral statistics against the catalog and
// issues one-time rewards. The `(account, achievement)` uniqueness of the
// earned-achievement record is the idempotency guard: a duplicate insert is
// a benign no-op, so concurrent evaluation never double-awards.

use crate::mutator::AccountMutator;
use crate::notifier::{notify_best_effort, NotificationKind, Notifier};
use crate::storage::LedgerStore;
use chrono::Utc;
use log::{debug, info};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use taskhive_common::{
    Account, AccountId, Achievement, Correlation, EarnedAchievement, EntryKind, ReferralSnapshot,
    RewardResult,
};
use tokio::sync::RwLock;

pub struct AchievementEvaluator {
    storage: Arc<dyn LedgerStore>,
    mutator: Arc<AccountMutator>,
    notifier: Arc<dyn Notifier>,
    catalog: RwLock<Vec<Achievement>>,
}

impl AchievementEvaluator {
    pub fn new(
        storage: Arc<dyn LedgerStore>,
        mutator: Arc<AccountMutator>,
        notifier: Arc<dyn Notifier>,
        catalog: Vec<Achievement>,
    ) -> Self {
        Self {
            storage,
            mutator,
            notifier,
            catalog: RwLock::new(catalog),
        }
    }

    /// Replace the achievement catalog without restart
    pub async fn set_catalog(&self, catalog: Vec<Achievement>) {
        *self.catalog.write().await = catalog;
    }

    /// Evaluate all not-yet-earned achievements for an account and award the
    /// newly unlocked ones. Returns only what this call earned; repeated
    /// calls with unchanged stats return an empty list.
    pub async fn check_achievements(
        &self,
        account_id: AccountId,
    ) -> RewardResult<Vec<EarnedAchievement>> {
        let account = self.mutator.get_account_required(account_id).await?;
        let stats = self.snapshot(&account).await?;

        let already: HashSet<u64> = self
            .storage
            .earned_achievements(account_id)
            .await?
            .into_iter()
            .map(|earned| earned.achievement_id)
            .collect();

        let catalog = self.catalog.read().await.clone();
        let mut newly_earned = Vec::new();
        for achievement in catalog {
            if already.contains(&achievement.id) || !achievement.requirement.is_met(&stats) {
                continue;
            }

            let earned = EarnedAchievement {
                account_id,
                achievement_id: achievement.id,
                earned_at: Utc::now(),
            };
            // The unique-pair insert is the award decision; losing the race
            // to a concurrent evaluation is not an error
            if !self.storage.insert_earned_achievement(earned.clone()).await? {
                debug!(
                    "achievement {} already recorded for {}, skipping",
                    achievement.id, account_id
                );
                continue;
            }

            if achievement.reward > 0 {
                self.mutator
                    .apply_delta(
                        account_id,
                        achievement.reward,
                        EntryKind::AchievementReward,
                        Correlation::Achievement {
                            achievement_id: achievement.id,
                        },
                    )
                    .await?;
            }

            info!(
                "achievement unlocked: {} ({:?}) by account {}, reward {}",
                achievement.id, achievement.title, account_id, achievement.reward
            );
            notify_best_effort(
                self.notifier.as_ref(),
                account_id,
                NotificationKind::AchievementUnlocked,
                json!({
                    "achievement_id": achievement.id,
                    "title": achievement.title,
                    "reward": achievement.reward,
                }),
            )
            .await;
            newly_earned.push(earned);
        }
        Ok(newly_earned)
    }

    // Cumulative referral statistics the requirements run against
    async fn snapshot(&self, account: &Account) -> RewardResult<ReferralSnapshot> {
        let mut total_referral_earned = 0u64;
        for kind in [
            EntryKind::ReferralReward,
            EntryKind::ReferralPremiumBonus,
            EntryKind::ReferralActivity,
        ] {
            let sum = self.storage.sum_amount(account.id, kind, None, None).await?;
            total_referral_earned = total_referral_earned.saturating_add(sum);
        }
        Ok(ReferralSnapshot {
            referrals_count: account.referrals_count,
            total_referral_earned,
            conversion_rate_bps: account.conversion_rate_bps(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::NullNotifier;
    use crate::storage::MemoryStorage;
    use taskhive_common::achievement::AchievementRequirement;

    fn catalog() -> Vec<Achievement> {
        vec![
            Achievement {
                id: 1,
                title: "First Invite".to_string(),
                requirement: AchievementRequirement::ReferralsCount(1),
                reward: 250,
            },
            Achievement {
                id: 2,
                title: "Big Earner".to_string(),
                requirement: AchievementRequirement::TotalReferralEarned(5_000),
                reward: 1_000,
            },
            Achievement {
                id: 3,
                title: "Title Only".to_string(),
                requirement: AchievementRequirement::ReferralsCount(2),
                reward: 0,
            },
        ]
    }

    fn setup() -> (AchievementEvaluator, Arc<AccountMutator>, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let mutator = Arc::new(AccountMutator::new(storage.clone()));
        let evaluator = AchievementEvaluator::new(
            storage.clone(),
            mutator.clone(),
            Arc::new(NullNotifier),
            catalog(),
        );
        (evaluator, mutator, storage)
    }

    #[tokio::test]
    async fn test_unlocks_and_rewards_once() {
        let (evaluator, mutator, _storage) = setup();
        mutator.create_account(AccountId(1)).await.unwrap();
        mutator
            .increment_referral_counter(AccountId(1), false)
            .await
            .unwrap();

        let earned = evaluator.check_achievements(AccountId(1)).await.unwrap();
        assert_eq!(earned.len(), 1);
        assert_eq!(earned[0].achievement_id, 1);
        assert_eq!(mutator.get_balance(AccountId(1)).await.unwrap(), 250);

        // Idempotent: nothing new without a state change
        let again = evaluator.check_achievements(AccountId(1)).await.unwrap();
        assert!(again.is_empty());
        assert_eq!(mutator.get_balance(AccountId(1)).await.unwrap(), 250);
    }

    #[tokio::test]
    async fn test_zero_reward_achievement_earns_no_entry() {
        let (evaluator, mutator, storage) = setup();
        mutator.create_account(AccountId(1)).await.unwrap();
        for _ in 0..2 {
            mutator
                .increment_referral_counter(AccountId(1), false)
                .await
                .unwrap();
        }

        let earned = evaluator.check_achievements(AccountId(1)).await.unwrap();
        let ids: Vec<u64> = earned.iter().map(|e| e.achievement_id).collect();
        assert!(ids.contains(&3));
        // Only achievement 1 paid anything
        assert_eq!(mutator.get_balance(AccountId(1)).await.unwrap(), 250);
        assert_eq!(storage.entry_count().await, 1);
    }

    #[tokio::test]
    async fn test_earned_threshold_uses_referral_kinds_only() {
        let (evaluator, mutator, _storage) = setup();
        mutator.create_account(AccountId(1)).await.unwrap();
        // A large deposit is not referral income
        mutator
            .apply_delta(AccountId(1), 50_000, EntryKind::Deposit, Correlation::None)
            .await
            .unwrap();
        let earned = evaluator.check_achievements(AccountId(1)).await.unwrap();
        assert!(earned.iter().all(|e| e.achievement_id != 2));

        // Referral income crosses the threshold
        mutator
            .apply_delta(
                AccountId(1),
                5_000,
                EntryKind::ReferralReward,
                Correlation::Referral {
                    referred_id: AccountId(2),
                    activity_type: None,
                },
            )
            .await
            .unwrap();
        let earned = evaluator.check_achievements(AccountId(1)).await.unwrap();
        assert_eq!(earned.len(), 1);
        assert_eq!(earned[0].achievement_id, 2);
    }

    #[tokio::test]
    async fn test_concurrent_evaluation_awards_once() {
        let (evaluator, mutator, _storage) = setup();
        let evaluator = Arc::new(evaluator);
        mutator.create_account(AccountId(1)).await.unwrap();
        mutator
            .increment_referral_counter(AccountId(1), false)
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let evaluator = evaluator.clone();
            handles.push(tokio::spawn(async move {
                evaluator.check_achievements(AccountId(1)).await.unwrap()
            }));
        }
        let mut total_awards = 0;
        for handle in handles {
            total_awards += handle.await.unwrap().len();
        }
        assert_eq!(total_awards, 1);
        assert_eq!(mutator.get_balance(AccountId(1)).await.unwrap(), 250);
    }
}
