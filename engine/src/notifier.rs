// Outbound notification seam.
//
// The core only needs a fire-and-forget "tell this user something happened"
// capability; delivery (messenger, push, email) lives outside. A failed
// notification is logged and never rolls back a committed reward.

use async_trait::async_trait;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::Display;
use taskhive_common::AccountId;

/// What the notification is about; the payload carries the specifics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
    ReferralReward,
    ReferralPremiumBonus,
    ReferralActivityReward,
    AchievementUnlocked,
    AdminBonus,
}

/// Outbound notification contract
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification to one account. Best effort.
    async fn notify(
        &self,
        account_id: AccountId,
        kind: NotificationKind,
        payload: Value,
    ) -> anyhow::Result<()>;
}

/// Notifier that drops everything, for embedders without a delivery channel
#[derive(Debug, Default)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify(
        &self,
        _account_id: AccountId,
        _kind: NotificationKind,
        _payload: Value,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Fire a notification, swallowing and logging any delivery failure
pub(crate) async fn notify_best_effort(
    notifier: &dyn Notifier,
    account_id: AccountId,
    kind: NotificationKind,
    payload: Value,
) {
    if let Err(e) = notifier.notify(account_id, kind, payload).await {
        warn!("failed to notify account {} about {}: {:#}", account_id, kind, e);
    }
}
