// Campaign service: time-boxed reward multipliers on top of the base
// configuration.
//
// Eligibility is checked once at join time. After that, an active membership
// simply contributes its multiplier whenever the member earns a reward of
// the boosted family.

use crate::storage::LedgerStore;
use chrono::{DateTime, Utc};
use log::info;
use std::sync::Arc;
use taskhive_common::{
    campaign::BPS_ONE, Account, AccountId, Campaign, CampaignMembership, RewardError, RewardResult,
};

/// Which base reward a campaign multiplier applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardFamily {
    Registration,
    PremiumBonus,
    Activity,
}

pub struct CampaignService {
    storage: Arc<dyn LedgerStore>,
}

impl CampaignService {
    pub fn new(storage: Arc<dyn LedgerStore>) -> Self {
        Self { storage }
    }

    /// Create or replace a campaign definition
    pub async fn register_campaign(&self, campaign: Campaign) -> RewardResult<()> {
        info!(
            "campaign {} registered: {} ({} - {})",
            campaign.id, campaign.name, campaign.starts_at, campaign.ends_at
        );
        self.storage.put_campaign(campaign).await
    }

    /// Join a campaign
    ///
    /// Checks the time window and the eligibility conditions against the
    /// account's current state, then records the one-time membership.
    ///
    /// # Errors
    /// * `CampaignNotFound` / `CampaignNotActive` / `CampaignNotEligible`
    /// * `CampaignAlreadyJoined` - membership is one-time
    pub async fn join(
        &self,
        account: &Account,
        campaign_id: u64,
    ) -> RewardResult<CampaignMembership> {
        let campaign = self
            .storage
            .get_campaign(campaign_id)
            .await?
            .ok_or(RewardError::CampaignNotFound(campaign_id))?;

        let now = Utc::now();
        if !campaign.is_active(now) {
            return Err(RewardError::CampaignNotActive(campaign_id));
        }
        if !campaign.eligibility.is_met_by(account) {
            return Err(RewardError::CampaignNotEligible {
                campaign: campaign_id,
                account: account.id,
            });
        }

        let membership = CampaignMembership {
            campaign_id,
            account_id: account.id,
            joined_at: now,
        };
        if !self.storage.insert_membership(membership.clone()).await? {
            return Err(RewardError::CampaignAlreadyJoined {
                campaign: campaign_id,
                account: account.id,
            });
        }

        info!("account {} joined campaign {}", account.id, campaign_id);
        Ok(membership)
    }

    /// Best multiplier (basis points) among the account's active campaign
    /// memberships for the given reward family, together with the campaign
    /// that provides it. `BPS_ONE` when no active membership boosts it.
    pub async fn multiplier_for(
        &self,
        account_id: AccountId,
        family: RewardFamily,
        at: DateTime<Utc>,
    ) -> RewardResult<(u32, Option<u64>)> {
        let mut best = (BPS_ONE, None);
        for membership in self.storage.memberships_for(account_id).await? {
            let Some(campaign) = self.storage.get_campaign(membership.campaign_id).await? else {
                continue;
            };
            if !campaign.is_active(at) {
                continue;
            }
            let bps = match family {
                RewardFamily::Registration => campaign.multipliers.registration_bps,
                RewardFamily::PremiumBonus => campaign.multipliers.premium_bonus_bps,
                RewardFamily::Activity => campaign.multipliers.activity_bps,
            };
            if bps > best.0 {
                best = (bps, Some(campaign.id));
            }
        }
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use chrono::Duration;
    use taskhive_common::{CampaignEligibility, CampaignMultipliers};

    fn campaign(id: u64, registration_bps: u32, min_referrals: u32) -> Campaign {
        let now = Utc::now();
        Campaign {
            id,
            name: format!("campaign-{}", id),
            starts_at: now - Duration::hours(1),
            ends_at: now + Duration::hours(1),
            multipliers: CampaignMultipliers {
                registration_bps,
                ..Default::default()
            },
            eligibility: CampaignEligibility {
                min_referrals,
                ..Default::default()
            },
        }
    }

    async fn setup() -> (CampaignService, Account) {
        let storage = Arc::new(MemoryStorage::new());
        let account = Account::new(AccountId(1), Utc::now());
        storage.insert_account(account.clone()).await.unwrap();
        (CampaignService::new(storage), account)
    }

    #[tokio::test]
    async fn test_join_checks_eligibility_at_join_time() {
        let (service, mut account) = setup().await;
        service.register_campaign(campaign(1, 15_000, 3)).await.unwrap();

        let err = service.join(&account, 1).await.unwrap_err();
        assert_eq!(
            err,
            RewardError::CampaignNotEligible {
                campaign: 1,
                account: AccountId(1)
            }
        );

        account.referrals_count = 3;
        service.join(&account, 1).await.unwrap();

        // Membership is one-time
        let err = service.join(&account, 1).await.unwrap_err();
        assert_eq!(
            err,
            RewardError::CampaignAlreadyJoined {
                campaign: 1,
                account: AccountId(1)
            }
        );
    }

    #[tokio::test]
    async fn test_join_rejects_closed_window() {
        let (service, account) = setup().await;
        let mut expired = campaign(1, 15_000, 0);
        expired.ends_at = Utc::now() - Duration::minutes(5);
        service.register_campaign(expired).await.unwrap();

        let err = service.join(&account, 1).await.unwrap_err();
        assert_eq!(err, RewardError::CampaignNotActive(1));
    }

    #[tokio::test]
    async fn test_multiplier_picks_best_active() {
        let (service, account) = setup().await;
        service.register_campaign(campaign(1, 12_000, 0)).await.unwrap();
        service.register_campaign(campaign(2, 20_000, 0)).await.unwrap();
        service.join(&account, 1).await.unwrap();
        service.join(&account, 2).await.unwrap();

        let (bps, campaign_id) = service
            .multiplier_for(AccountId(1), RewardFamily::Registration, Utc::now())
            .await
            .unwrap();
        assert_eq!(bps, 20_000);
        assert_eq!(campaign_id, Some(2));

        // Families the campaigns do not boost stay neutral
        let (bps, campaign_id) = service
            .multiplier_for(AccountId(1), RewardFamily::Activity, Utc::now())
            .await
            .unwrap();
        assert_eq!(bps, BPS_ONE);
        assert_eq!(campaign_id, None);
    }

    #[tokio::test]
    async fn test_multiplier_without_membership_is_neutral() {
        let (service, _account) = setup().await;
        service.register_campaign(campaign(1, 15_000, 0)).await.unwrap();
        let (bps, _) = service
            .multiplier_for(AccountId(1), RewardFamily::Registration, Utc::now())
            .await
            .unwrap();
        assert_eq!(bps, BPS_ONE);
    }
}
