use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Platform snowflake ids
pub type UserId = u64;
pub type RoleId = u64;
pub type ChannelId = u64;
pub type MessageId = u64;

/// Weekly contest phase, derived from the controller's owned state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContestPhase {
    Idle,
    SubmissionOpen,
    VotingOpen,
}

/// Monthly rollup sub-phase, derived from the durable descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthlyPhase {
    Idle,
    Open,
}

/// A submitted photo reduced to what the tally needs.
///
/// Reconstructed fresh from a voting thread's history on every close;
/// never persisted. `votes` is already adjusted for the service's own
/// seed reaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub author_id: UserId,
    pub author_mention: String,
    pub image_url: String,
    pub votes: u32,
}

/// One weekly winner, recorded at weekly close and consumed by the
/// monthly rollup in blocks of four weeks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyWinnerEntry {
    pub author_id: UserId,
    pub author_mention: String,
    pub image_url: String,
    pub votes: u32,
    pub week_no: u32,
    pub created_at: DateTime<Utc>,
}

/// Descriptor of the currently running monthly contest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveMonthlyContest {
    pub thread_id: ChannelId,
    pub thread_jump_url: String,
    pub opened_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub closed: bool,
}
