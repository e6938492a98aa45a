//! Contest lifecycle: shared state, submission gating, vote tallying and
//! the weekly/monthly phase transitions.

pub mod admin;
mod monthly;
mod submission;
mod tally;
mod weekly;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

pub use monthly::{MonthlyCloseOutcome, MonthlyOpenOutcome};
pub use submission::Decision;
pub use tally::{tally, TallyOutcome};
pub use weekly::{VotingOpenOutcome, WeeklyCloseOutcome};

use crate::chat::{ChatApi, ThreadHandle};
use crate::config::ContestConfig;
use crate::store::{MonthlyRollup, WinnerLedger};
use crate::types::*;

/// How far back the photo channel and voting threads are scanned
const HISTORY_FETCH_LIMIT: u32 = 100;

/// Shared contest state. One instance per community, held in an `Arc` and
/// cloned into the scheduler tasks; transitions are assumed to run one at
/// a time.
pub struct ContestState {
    pub config: ContestConfig,
    pub chat: Arc<dyn ChatApi>,
    pub winners: WinnerLedger,
    pub rollup: MonthlyRollup,
    /// Per-cycle photo count per participant, reset when voting opens
    submission_counts: RwLock<HashMap<UserId, u32>>,
    /// Accepted post -> author, so a deletion can free the author's slot
    accepted_posts: RwLock<HashMap<MessageId, UserId>>,
    /// Start of the current submission window (`last_photo_call`)
    last_photo_call: RwLock<Option<DateTime<Utc>>>,
    /// Currently open weekly voting thread
    voting_thread: RwLock<Option<ThreadHandle>>,
}

impl ContestState {
    pub fn new(
        config: ContestConfig,
        chat: Arc<dyn ChatApi>,
        winners: WinnerLedger,
        rollup: MonthlyRollup,
    ) -> Self {
        Self {
            config,
            chat,
            winners,
            rollup,
            submission_counts: RwLock::new(HashMap::new()),
            accepted_posts: RwLock::new(HashMap::new()),
            last_photo_call: RwLock::new(None),
            voting_thread: RwLock::new(None),
        }
    }

    /// Current weekly phase, derived from the owned state
    pub async fn phase(&self) -> ContestPhase {
        if self.voting_thread.read().await.is_some() {
            ContestPhase::VotingOpen
        } else if self.last_photo_call.read().await.is_some() {
            ContestPhase::SubmissionOpen
        } else {
            ContestPhase::Idle
        }
    }

    /// Current monthly sub-phase, derived from the durable descriptor
    pub async fn monthly_phase(&self) -> MonthlyPhase {
        match self.rollup.active().await {
            Some(active) if !active.closed => MonthlyPhase::Open,
            _ => MonthlyPhase::Idle,
        }
    }

    pub async fn last_photo_call(&self) -> Option<DateTime<Utc>> {
        *self.last_photo_call.read().await
    }
}
