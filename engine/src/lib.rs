// TaskHive reward economy - balance ledger and referral reward engine.
//
// The write path is a single funnel: event triggers enter the referral
// engine, amounts come from the hot-swappable reward config (boosted by
// campaign memberships), and every balance change goes through the account
// mutator, which commits the account row and the audit ledger entry as one
// atomic unit under a per-account lock.

pub mod achievements;
pub mod admin;
pub mod campaign;
pub mod locks;
pub mod mutator;
pub mod notifier;
pub mod referral;
pub mod service;
pub mod stats;
pub mod storage;

pub use achievements::AchievementEvaluator;
pub use admin::{AdminService, DistributionReport};
pub use campaign::{CampaignService, RewardFamily};
pub use mutator::AccountMutator;
pub use notifier::{NotificationKind, Notifier, NullNotifier};
pub use referral::{MemoryCodeResolver, ReferralCodeResolver, ReferralEngine};
pub use service::RewardService;
pub use stats::{Period, ReferralStats, StatsService};
pub use storage::{EntryFilter, LedgerStore, MemoryStorage};
