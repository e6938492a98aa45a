//! Administrative operations.
//!
//! The command surface itself (slash-command registration, permission
//! checks) lives with the embedding process; these are the operations it
//! triggers. The four phase triggers are the transition methods on
//! [`ContestState`] (`open_submission_window`, `open_voting`,
//! `close_voting_and_announce`, `close_monthly_contest`).

use super::ContestState;
use crate::store::RemovalOutcome;
use crate::types::UserId;

impl ContestState {
    /// Make a past weekly winner eligible again. Admin-gated upstream.
    pub async fn remove_weekly_winner(&self, user: UserId) -> RemovalOutcome {
        let outcome = self.winners.remove_weekly_winner(user).await;
        tracing::info!(user, ?outcome, "weekly winner removal requested");
        outcome
    }

    /// Make a past monthly winner eligible again. Admin-gated upstream.
    pub async fn remove_monthly_winner(&self, user: UserId) -> RemovalOutcome {
        let outcome = self.winners.remove_monthly_winner(user).await;
        tracing::info!(user, ?outcome, "monthly winner removal requested");
        outcome
    }
}
