use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A minted skill token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
	pub token_id: String,
	pub owner: String,
	pub name: String,
	pub category: String,
	pub level: u8,
	#[serde(default)]
	pub endorsements: u32,
	#[serde(default)]
	pub minted_at: Option<DateTime<Utc>>,
}

/// Parameters for minting a new skill token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSkillParams {
	pub name: String,
	pub category: String,
	pub level: u8,
	#[serde(default)]
	pub evidence_uri: Option<String>,
}

/// A staking pool gathering talent around a set of required skills.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TalentPool {
	pub pool_id: String,
	pub title: String,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub required_skills: Vec<String>,
	pub stake_amount: u64,
	#[serde(default)]
	pub member_count: u32,
	pub open: bool,
}

/// A governance proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
	pub proposal_id: String,
	pub title: String,
	pub proposer: String,
	#[serde(default)]
	pub votes_for: u64,
	#[serde(default)]
	pub votes_against: u64,
	#[serde(default)]
	pub closes_at: Option<DateTime<Utc>>,
	#[serde(default)]
	pub executed: bool,
}

/// Aggregated reputation for one account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationScore {
	pub account: String,
	pub score: u64,
	#[serde(default)]
	pub rank: Option<u32>,
	#[serde(default)]
	pub last_evaluated: Option<DateTime<Utc>>,
}
