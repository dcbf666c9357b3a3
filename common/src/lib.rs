// TaskHive reward economy - shared data model.
//
// This crate holds the pure data types of the balance ledger and referral
// reward engine: accounts, immutable ledger entries, the per-level reward
// configuration, campaigns, achievements and the error taxonomy. It performs
// no I/O; all state lives behind the stores in `taskhive_engine`.

pub mod account;
pub mod achievement;
pub mod campaign;
pub mod config;
pub mod error;
pub mod ledger;
pub mod types;

pub use account::Account;
pub use achievement::{Achievement, AchievementRequirement, EarnedAchievement, ReferralSnapshot};
pub use campaign::{Campaign, CampaignEligibility, CampaignMembership, CampaignMultipliers};
pub use config::{LevelRewards, RewardConfig};
pub use error::{RewardError, RewardOutcome, RewardResult, SkipReason};
pub use ledger::{Correlation, Direction, EntryId, EntryKind, EntryStatus, LedgerEntry};
pub use types::{AccountId, AccountLevel, ActivityType};
