// Referral reward engine.
//
// Evaluates referral lifecycle events (registration, premium upgrade,
// referral activity) against current account state and issues rewards
// through the account mutator. Rewards are computed from the *referrer's*
// level, re-evaluated at event time, so a referrer's rate changes the moment
// their balance crosses a threshold.

use crate::campaign::{CampaignService, RewardFamily};
use crate::locks::AccountLocks;
use crate::mutator::AccountMutator;
use crate::notifier::{notify_best_effort, NotificationKind, Notifier};
use crate::storage::LedgerStore;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use log::{debug, info};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::json;
use std::sync::Arc;
use taskhive_common::{
    campaign::{apply_bps, BPS_ONE},
    AccountId, ActivityType, Correlation, EntryKind, RewardConfig, RewardError, RewardOutcome,
    RewardResult, SkipReason,
};
use tokio::sync::RwLock;

/// Maximum ancestor-walk depth for cycle prevention
pub const MAX_REFERRAL_DEPTH: u8 = 100;

/// Length of generated referral codes
pub const REFERRAL_CODE_LENGTH: usize = 8;

/// Read-only referral code lookup, provided by the platform
#[async_trait]
pub trait ReferralCodeResolver: Send + Sync {
    /// Resolve a code to the owning account, or None if unknown
    async fn resolve(&self, code: &str) -> Option<AccountId>;
}

/// In-memory code registry; doubles as a code generator
#[derive(Default)]
pub struct MemoryCodeResolver {
    codes: DashMap<String, AccountId>,
}

impl MemoryCodeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an explicit code for an account
    pub fn register(&self, code: &str, account_id: AccountId) {
        self.codes.insert(code.to_string(), account_id);
    }

    /// Generate and register a random alphanumeric code for an account
    pub fn generate(&self, account_id: AccountId) -> String {
        loop {
            let code: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(REFERRAL_CODE_LENGTH)
                .map(char::from)
                .collect();
            if !self.codes.contains_key(&code) {
                self.codes.insert(code.clone(), account_id);
                return code;
            }
        }
    }
}

#[async_trait]
impl ReferralCodeResolver for MemoryCodeResolver {
    async fn resolve(&self, code: &str) -> Option<AccountId> {
        self.codes.get(code).map(|entry| *entry.value())
    }
}

/// Computes and issues referral rewards
///
/// All dependencies are injected; the engine holds no state of its own
/// beyond an idempotency lock registry keyed by the referred account.
pub struct ReferralEngine {
    storage: Arc<dyn LedgerStore>,
    mutator: Arc<AccountMutator>,
    config: Arc<RwLock<RewardConfig>>,
    campaigns: Arc<CampaignService>,
    resolver: Arc<dyn ReferralCodeResolver>,
    notifier: Arc<dyn Notifier>,
    // Serializes the probe-then-issue idempotency sections per referred
    // account (premium upgrade, registration binding)
    guards: AccountLocks,
}

impl ReferralEngine {
    pub fn new(
        storage: Arc<dyn LedgerStore>,
        mutator: Arc<AccountMutator>,
        config: Arc<RwLock<RewardConfig>>,
        campaigns: Arc<CampaignService>,
        resolver: Arc<dyn ReferralCodeResolver>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            storage,
            mutator,
            config,
            campaigns,
            resolver,
            notifier,
            guards: AccountLocks::new(),
        }
    }

    /// Registration with a referral code: bind the referrer edge and pay the
    /// one-time registration reward.
    ///
    /// Invalid codes and self-referrals are silent skips: the registration
    /// itself already succeeded, only the reward is withheld.
    pub async fn process_registration(
        &self,
        new_account_id: AccountId,
        referral_code: &str,
    ) -> RewardResult<RewardOutcome> {
        let Some(referrer_id) = self.resolver.resolve(referral_code).await else {
            debug!(
                "registration of {}: code {:?} did not resolve, no reward",
                new_account_id, referral_code
            );
            return Ok(RewardOutcome::Skipped(SkipReason::InvalidCode));
        };
        if referrer_id == new_account_id {
            debug!("registration of {}: self-referral blocked", new_account_id);
            return Ok(RewardOutcome::Skipped(SkipReason::SelfReferral));
        }

        // Guard both ends of the new edge, lower id first, so two accounts
        // registering with each other's codes cannot both pass the cycle
        // walk before either binding commits
        let _guards = self.acquire_pair(new_account_id, referrer_id).await;

        let new_account = self.mutator.get_account_required(new_account_id).await?;
        if new_account.has_referrer() {
            return Ok(RewardOutcome::Skipped(SkipReason::AlreadyReferred));
        }
        match self.storage.get_account(referrer_id).await? {
            None => {
                debug!(
                    "registration of {}: code {:?} points at unknown account {}",
                    new_account_id, referral_code, referrer_id
                );
                return Ok(RewardOutcome::Skipped(SkipReason::InvalidCode));
            }
            Some(referrer) if !referrer.is_active => {
                debug!(
                    "registration of {}: referrer {} is deactivated, no binding",
                    new_account_id, referrer_id
                );
                return Ok(RewardOutcome::Skipped(SkipReason::ReferrerInactive));
            }
            Some(_) => {}
        }
        self.ensure_no_cycle(new_account_id, referrer_id).await?;

        if !self.mutator.set_referrer(new_account_id, referrer_id).await? {
            return Ok(RewardOutcome::Skipped(SkipReason::AlreadyReferred));
        }
        let referrer = self
            .mutator
            .increment_referral_counter(referrer_id, false)
            .await?;

        let base = {
            let config = self.config.read().await;
            config.for_level(referrer.level).registration_reward
        };
        let (bps, campaign_id) = self
            .campaigns
            .multiplier_for(referrer_id, RewardFamily::Registration, Utc::now())
            .await?;
        let amount = apply_bps(base, bps);
        if amount == 0 {
            return Ok(RewardOutcome::Skipped(SkipReason::ZeroReward));
        }

        let entry = self
            .mutator
            .apply_delta(
                referrer_id,
                amount,
                EntryKind::ReferralReward,
                Correlation::Referral {
                    referred_id: new_account_id,
                    activity_type: None,
                },
            )
            .await?;

        info!(
            "referral registration: {} referred by {}, reward {} (level {})",
            new_account_id, referrer_id, amount, referrer.level
        );
        notify_best_effort(
            self.notifier.as_ref(),
            referrer_id,
            NotificationKind::ReferralReward,
            json!({
                "amount": amount,
                "referred_id": new_account_id,
                "campaign_id": campaign_id,
            }),
        )
        .await;

        Ok(RewardOutcome::Issued(entry))
    }

    /// Premium upgrade of a referred account: one-time bonus to the referrer
    ///
    /// Idempotent per `(referrer, referred)` pair: the existing
    /// `referral_premium_bonus` ledger entry is the idempotency record.
    pub async fn process_premium_upgrade(
        &self,
        account_id: AccountId,
    ) -> RewardResult<RewardOutcome> {
        let account = self.mutator.get_account_required(account_id).await?;
        let Some(referrer_id) = account.referrer_id else {
            return Ok(RewardOutcome::Skipped(SkipReason::NoReferrer));
        };

        // Probe and issue under the referred account's guard so two
        // concurrent upgrade events cannot both pass the probe
        let _guard = self.guards.acquire(account_id).await;

        if self
            .storage
            .has_entry_for_related(referrer_id, EntryKind::ReferralPremiumBonus, account_id)
            .await?
        {
            debug!(
                "premium upgrade of {}: bonus already issued to {}",
                account_id, referrer_id
            );
            return Ok(RewardOutcome::Skipped(SkipReason::AlreadyRewarded));
        }

        let referrer = self.mutator.get_account_required(referrer_id).await?;
        if !referrer.is_active {
            debug!(
                "premium upgrade of {}: referrer {} is deactivated, no bonus",
                account_id, referrer_id
            );
            return Ok(RewardOutcome::Skipped(SkipReason::ReferrerInactive));
        }

        let base = {
            let config = self.config.read().await;
            config.for_level(referrer.level).effective_premium_bonus()
        };
        let (bps, campaign_id) = self
            .campaigns
            .multiplier_for(referrer_id, RewardFamily::PremiumBonus, Utc::now())
            .await?;
        let amount = apply_bps(base, bps);
        if amount == 0 {
            return Ok(RewardOutcome::Skipped(SkipReason::ZeroReward));
        }

        let entry = self
            .mutator
            .apply_delta(
                referrer_id,
                amount,
                EntryKind::ReferralPremiumBonus,
                Correlation::Referral {
                    referred_id: account_id,
                    activity_type: None,
                },
            )
            .await?;
        // The bonus entry is the idempotency record; the counter only moves
        // once that record exists
        self.mutator
            .increment_referral_counter(referrer_id, true)
            .await?;

        info!(
            "premium upgrade: {} upgraded, bonus {} to referrer {}",
            account_id, amount, referrer_id
        );
        notify_best_effort(
            self.notifier.as_ref(),
            referrer_id,
            NotificationKind::ReferralPremiumBonus,
            json!({
                "amount": amount,
                "referred_id": account_id,
                "campaign_id": campaign_id,
            }),
        )
        .await;

        Ok(RewardOutcome::Issued(entry))
    }

    /// Rewarded activity of a referred account: percentage of the base
    /// amount to the referrer, clamped to the referrer's daily cap
    pub async fn process_activity(
        &self,
        account_id: AccountId,
        activity: ActivityType,
        base_amount: u64,
    ) -> RewardResult<RewardOutcome> {
        let account = self.mutator.get_account_required(account_id).await?;
        let Some(referrer_id) = account.referrer_id else {
            return Ok(RewardOutcome::Skipped(SkipReason::NoReferrer));
        };
        let referrer = self.mutator.get_account_required(referrer_id).await?;
        if !referrer.is_active {
            debug!(
                "activity of {}: referrer {} is deactivated, no reward",
                account_id, referrer_id
            );
            return Ok(RewardOutcome::Skipped(SkipReason::ReferrerInactive));
        }

        let (percent, daily_cap) = {
            let config = self.config.read().await;
            let rewards = config.for_level(referrer.level);
            (rewards.activity_percent(activity), rewards.daily_activity_cap)
        };
        let (bps, campaign_id) = self
            .campaigns
            .multiplier_for(referrer_id, RewardFamily::Activity, Utc::now())
            .await?;

        // Multiplier applies before the single floor division
        let amount = ((base_amount as u128 * percent as u128 * bps as u128)
            / (100u128 * BPS_ONE as u128)) as u64;
        if amount == 0 {
            debug!(
                "activity of {} ({}): reward floored to zero for referrer {}",
                account_id, activity, referrer_id
            );
            return Ok(RewardOutcome::Skipped(SkipReason::ZeroReward));
        }

        let outcome = self
            .mutator
            .apply_capped_credit(
                referrer_id,
                amount,
                daily_cap,
                EntryKind::ReferralActivity,
                Correlation::Referral {
                    referred_id: account_id,
                    activity_type: Some(activity),
                },
            )
            .await?;

        if let RewardOutcome::Issued(entry) = &outcome {
            info!(
                "referral activity: {} {} base {}, reward {} to {}",
                account_id, activity, base_amount, entry.amount, referrer_id
            );
            notify_best_effort(
                self.notifier.as_ref(),
                referrer_id,
                NotificationKind::ReferralActivityReward,
                json!({
                    "amount": entry.amount,
                    "referred_id": account_id,
                    "activity_type": activity,
                    "campaign_id": campaign_id,
                }),
            )
            .await;
        }
        Ok(outcome)
    }

    // Acquire the guards of both accounts in id order so concurrent
    // registrations touching the same pair never deadlock
    async fn acquire_pair(
        &self,
        a: AccountId,
        b: AccountId,
    ) -> (tokio::sync::OwnedMutexGuard<()>, tokio::sync::OwnedMutexGuard<()>) {
        if a < b {
            let first = self.guards.acquire(a).await;
            let second = self.guards.acquire(b).await;
            (first, second)
        } else {
            let first = self.guards.acquire(b).await;
            let second = self.guards.acquire(a).await;
            (first, second)
        }
    }

    // Walk the referrer's ancestor chain; binding `referrer_id` to
    // `account_id` must not make the account its own ancestor. The walk is
    // bounded; a chain deeper than MAX_REFERRAL_DEPTH is treated as
    // cycle-free beyond the bound.
    async fn ensure_no_cycle(
        &self,
        account_id: AccountId,
        referrer_id: AccountId,
    ) -> RewardResult<()> {
        let mut cursor = referrer_id;
        for _ in 0..MAX_REFERRAL_DEPTH {
            if cursor == account_id {
                return Err(RewardError::CircularReference);
            }
            match self.storage.get_account(cursor).await? {
                Some(account) => match account.referrer_id {
                    Some(next) => cursor = next,
                    None => return Ok(()),
                },
                None => return Ok(()),
            }
        }
        Ok(())
    }
}
