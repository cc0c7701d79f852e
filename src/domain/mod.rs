//! Typed domain facades consumed by the presentation layer.
//!
//! Each facade composes cached transport reads with orchestrated on-chain
//! writes; confirmed writes invalidate the caches they affect, and wallet
//! disconnects evict user-scoped entries through session-event hooks.

/// Proposals and voting
mod governance;
/// Talent pools and staked membership
mod pools;
/// Reputation scores
mod reputation;
/// Skill tokens
mod skills;
/// Entity wire types
mod types;

pub use governance::GovernanceFacade;
pub use pools::PoolsFacade;
pub use reputation::ReputationFacade;
pub use skills::SkillsFacade;
pub use types::{CreateSkillParams, Proposal, ReputationScore, Skill, TalentPool};
