// Reward service facade: wires the event triggers coming from the platform
// collaborators (registration, premium upgrade, rewarded activity) to the
// referral engine, and runs the achievement evaluator after every event that
// can move referral statistics.
//
// Everything is injected at construction; there is no process-wide state.

use crate::achievements::AchievementEvaluator;
use crate::admin::AdminService;
use crate::campaign::CampaignService;
use crate::mutator::AccountMutator;
use crate::notifier::Notifier;
use crate::referral::{ReferralCodeResolver, ReferralEngine};
use crate::stats::StatsService;
use crate::storage::LedgerStore;
use log::warn;
use std::sync::Arc;
use taskhive_common::{
    achievement::default_catalog, Account, AccountId, ActivityType, Campaign, CampaignMembership,
    RewardConfig, RewardError, RewardOutcome, RewardResult,
};
use tokio::sync::RwLock;

pub struct RewardService {
    mutator: Arc<AccountMutator>,
    config: Arc<RwLock<RewardConfig>>,
    campaigns: Arc<CampaignService>,
    referral: ReferralEngine,
    achievements: AchievementEvaluator,
    stats: StatsService,
    admin: AdminService,
}

impl RewardService {
    pub fn new(
        storage: Arc<dyn LedgerStore>,
        config: RewardConfig,
        resolver: Arc<dyn ReferralCodeResolver>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let mutator = Arc::new(AccountMutator::new(storage.clone()));
        let config = Arc::new(RwLock::new(config));
        let campaigns = Arc::new(CampaignService::new(storage.clone()));
        let referral = ReferralEngine::new(
            storage.clone(),
            mutator.clone(),
            config.clone(),
            campaigns.clone(),
            resolver,
            notifier.clone(),
        );
        let achievements = AchievementEvaluator::new(
            storage.clone(),
            mutator.clone(),
            notifier.clone(),
            default_catalog(),
        );
        let stats = StatsService::new(storage);
        let admin = AdminService::new(mutator.clone(), notifier);

        Self {
            mutator,
            config,
            campaigns,
            referral,
            achievements,
            stats,
            admin,
        }
    }

    /// Replace the reward configuration without restart
    ///
    /// # Errors
    /// * `InvalidRewardConfig` - the table failed validation; the previous
    ///   configuration stays in effect
    pub async fn set_config(&self, config: RewardConfig) -> RewardResult<()> {
        if !config.is_valid() {
            return Err(RewardError::InvalidRewardConfig);
        }
        *self.config.write().await = config;
        Ok(())
    }

    // ===== Event triggers =====

    /// A user registered, optionally with a referral code
    ///
    /// The account is created unconditionally; a bad code only withholds the
    /// referral reward, never the registration.
    pub async fn on_registration(
        &self,
        account_id: AccountId,
        referral_code: Option<&str>,
    ) -> RewardResult<Account> {
        let account = self.mutator.create_account(account_id).await?;
        if let Some(code) = referral_code {
            self.referral.process_registration(account_id, code).await?;
        }
        // Referrer binding may have happened; return the current row. The
        // referrer's stats moved with the binding even when the reward was
        // skipped, so the achievement check keys off the binding, not the
        // reward.
        let account = self.mutator.get_account_required(account.id).await?;
        if let Some(referrer_id) = account.referrer_id {
            self.evaluate_referrer(referrer_id).await;
        }
        Ok(account)
    }

    /// A user upgraded to premium
    pub async fn on_premium_upgrade(&self, account_id: AccountId) -> RewardResult<RewardOutcome> {
        let outcome = self.referral.process_premium_upgrade(account_id).await?;
        if let Some(entry) = outcome.issued() {
            self.evaluate_referrer(entry.account_id).await;
        }
        Ok(outcome)
    }

    /// A user performed a rewarded activity (task completion, balance
    /// top-up) with the given base amount
    pub async fn on_activity(
        &self,
        account_id: AccountId,
        activity: ActivityType,
        base_amount: u64,
    ) -> RewardResult<RewardOutcome> {
        let outcome = self
            .referral
            .process_activity(account_id, activity, base_amount)
            .await?;
        if let Some(entry) = outcome.issued() {
            self.evaluate_referrer(entry.account_id).await;
        }
        Ok(outcome)
    }

    /// Join a campaign; eligibility is checked against the account's current
    /// state
    pub async fn join_campaign(
        &self,
        account_id: AccountId,
        campaign_id: u64,
    ) -> RewardResult<CampaignMembership> {
        let account = self.mutator.get_account_required(account_id).await?;
        self.campaigns.join(&account, campaign_id).await
    }

    /// Register a campaign definition
    pub async fn register_campaign(&self, campaign: Campaign) -> RewardResult<()> {
        self.campaigns.register_campaign(campaign).await
    }

    // ===== Component accessors =====

    pub fn mutator(&self) -> &Arc<AccountMutator> {
        &self.mutator
    }

    pub fn referral(&self) -> &ReferralEngine {
        &self.referral
    }

    pub fn achievements(&self) -> &AchievementEvaluator {
        &self.achievements
    }

    pub fn stats(&self) -> &StatsService {
        &self.stats
    }

    pub fn admin(&self) -> &AdminService {
        &self.admin
    }

    // Achievement evaluation must not fail the committed reward; a storage
    // hiccup here is logged and the next event retries naturally
    async fn evaluate_referrer(&self, referrer_id: AccountId) {
        if let Err(e) = self.achievements.check_achievements(referrer_id).await {
            warn!("achievement check for {} failed: {}", referrer_id, e);
        }
    }
}
