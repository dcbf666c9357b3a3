// Administrative bonus distribution.

use crate::mutator::AccountMutator;
use crate::notifier::{notify_best_effort, NotificationKind, Notifier};
use log::{info, warn};
use serde_json::json;
use std::sync::Arc;
use taskhive_common::{AccountId, Correlation, EntryKind, RewardError};

/// Result of a best-effort batch distribution
#[derive(Debug, Default)]
pub struct DistributionReport {
    pub successful: Vec<AccountId>,
    pub failed: Vec<(AccountId, RewardError)>,
}

impl DistributionReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct AdminService {
    mutator: Arc<AccountMutator>,
    notifier: Arc<dyn Notifier>,
}

impl AdminService {
    pub fn new(mutator: Arc<AccountMutator>, notifier: Arc<dyn Notifier>) -> Self {
        Self { mutator, notifier }
    }

    /// Credit `amount` to each account in the batch
    ///
    /// Best effort: each account's credit is independently atomic and a
    /// failure (unknown or deactivated account) does not abort the rest of
    /// the batch.
    pub async fn distribute_bonus(
        &self,
        accounts: &[AccountId],
        amount: u64,
        reason: &str,
        admin_id: AccountId,
    ) -> DistributionReport {
        let mut report = DistributionReport::default();
        for &account_id in accounts {
            let result = self
                .mutator
                .apply_delta(
                    account_id,
                    amount,
                    EntryKind::AdminBonus,
                    Correlation::Admin {
                        admin_id,
                        reason: reason.to_string(),
                    },
                )
                .await;
            match result {
                Ok(_) => {
                    notify_best_effort(
                        self.notifier.as_ref(),
                        account_id,
                        NotificationKind::AdminBonus,
                        json!({ "amount": amount, "reason": reason }),
                    )
                    .await;
                    report.successful.push(account_id);
                }
                Err(e) => {
                    warn!("bonus to account {} failed: {}", account_id, e);
                    report.failed.push((account_id, e));
                }
            }
        }
        info!(
            "bonus distribution by {}: {} ok, {} failed, amount {} ({})",
            admin_id,
            report.successful.len(),
            report.failed.len(),
            amount,
            reason
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::NullNotifier;
    use crate::storage::MemoryStorage;

    #[tokio::test]
    async fn test_partial_failure_does_not_abort_batch() {
        let storage = Arc::new(MemoryStorage::new());
        let mutator = Arc::new(AccountMutator::new(storage));
        let admin = AdminService::new(mutator.clone(), Arc::new(NullNotifier));

        mutator.create_account(AccountId(1)).await.unwrap();
        mutator.create_account(AccountId(3)).await.unwrap();

        let report = admin
            .distribute_bonus(
                &[AccountId(1), AccountId(2), AccountId(3)],
                500,
                "launch promo",
                AccountId(999),
            )
            .await;

        assert_eq!(report.successful, vec![AccountId(1), AccountId(3)]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, AccountId(2));
        assert!(!report.all_succeeded());

        assert_eq!(mutator.get_balance(AccountId(1)).await.unwrap(), 500);
        assert_eq!(mutator.get_balance(AccountId(3)).await.unwrap(), 500);
    }
}
