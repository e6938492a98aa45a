use chrono::Utc;

use super::weekly::reconstruct_candidates;
use super::{tally, ContestState, TallyOutcome, HISTORY_FETCH_LIMIT};
use crate::chat::{ChatResult, OutgoingMessage, ThreadHandle};
use crate::messages;
use crate::types::{ActiveMonthlyContest, Candidate};

/// Outcome of the monthly dueness check
#[derive(Debug)]
pub enum MonthlyOpenOutcome {
    Disabled,
    /// A monthly contest is already running
    AlreadyOpen,
    /// Fewer than four weeks have accumulated since the last rollup
    NotDue,
    Opened {
        thread: ThreadHandle,
        entries: usize,
    },
}

/// Outcome of the monthly close
#[derive(Debug)]
pub enum MonthlyCloseOutcome {
    /// No monthly contest is running; nothing to do
    NothingOpen,
    NoCandidates,
    NoEligibleWinners,
    Winners {
        winners: Vec<Candidate>,
        max_votes: u32,
    },
}

impl ContestState {
    /// Open the monthly contest if a full block of four weekly winners has
    /// accumulated. The block is consumed as soon as the venue exists, so
    /// the gate cannot re-fire while the contest runs.
    pub async fn maybe_open_monthly_contest(&self) -> ChatResult<MonthlyOpenOutcome> {
        if !self.config.monthly_enabled {
            return Ok(MonthlyOpenOutcome::Disabled);
        }
        if self.rollup.active().await.is_some() {
            return Ok(MonthlyOpenOutcome::AlreadyOpen);
        }
        if !self.rollup.is_due().await {
            return Ok(MonthlyOpenOutcome::NotDue);
        }

        let now = Utc::now();
        let thread = self
            .chat
            .create_thread(
                self.config.results_channel_id,
                &messages::monthly_thread_name(now.date_naive()),
            )
            .await?;

        let Some(entries) = self.rollup.consume_due_block().await else {
            // Raced with another opener; the empty thread stays behind
            tracing::warn!("monthly block vanished between dueness check and consumption");
            return Ok(MonthlyOpenOutcome::NotDue);
        };

        self.chat
            .send_message(
                thread.id,
                OutgoingMessage::text(messages::monthly_intro(&self.config.monthly_vote_emoji)),
            )
            .await?;

        // Seed the four weekly winners; one bad entry must not lose the rest
        for entry in &entries {
            match self
                .chat
                .send_message(
                    thread.id,
                    OutgoingMessage::text(messages::candidate_post(entry.author_id))
                        .with_image(entry.image_url.as_str()),
                )
                .await
            {
                Ok(sent) => {
                    if let Err(e) = self
                        .chat
                        .add_reaction(thread.id, sent.id, &self.config.monthly_vote_emoji)
                        .await
                    {
                        tracing::warn!("could not seed monthly vote reaction on {}: {e}", sent.id);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "could not seed monthly candidate for week {}: {e}",
                        entry.week_no
                    );
                }
            }
        }

        let ends_at = now + self.config.monthly_vote_duration;
        self.rollup
            .set_active(ActiveMonthlyContest {
                thread_id: thread.id,
                thread_jump_url: thread.jump_url.clone(),
                opened_at: now,
                ends_at,
                closed: false,
            })
            .await;

        if let Err(e) = self
            .chat
            .send_message(
                self.config.results_channel_id,
                OutgoingMessage::text(messages::monthly_opened(&thread.jump_url)),
            )
            .await
        {
            tracing::warn!("could not announce monthly contest: {e}");
        }

        tracing::info!(thread = thread.id, %ends_at, entries = entries.len(), "monthly contest open");
        Ok(MonthlyOpenOutcome::Opened {
            thread,
            entries: entries.len(),
        })
    }

    /// Close the running monthly contest: tally against past monthly
    /// winners, announce, lock the venue without archiving, clear the
    /// descriptor. Closing with nothing active is a safe no-op.
    pub async fn close_monthly_contest(&self) -> ChatResult<MonthlyCloseOutcome> {
        let active = match self.rollup.active().await {
            Some(active) if !active.closed => active,
            _ => {
                tracing::info!("monthly close requested but no contest is open");
                return Ok(MonthlyCloseOutcome::NothingOpen);
            }
        };

        let history = self
            .chat
            .recent_messages(active.thread_id, HISTORY_FETCH_LIMIT)
            .await?;
        let candidates = reconstruct_candidates(&history, &self.config.monthly_vote_emoji);

        let excluded = self.winners.monthly_winners().await;
        let outcome = match tally(&candidates, &excluded) {
            TallyOutcome::NoCandidates => {
                self.chat
                    .send_message(
                        self.config.results_channel_id,
                        OutgoingMessage::text(messages::no_photos_this_week()),
                    )
                    .await?;
                MonthlyCloseOutcome::NoCandidates
            }
            TallyOutcome::NoEligibleWinners => {
                self.chat
                    .send_message(
                        self.config.results_channel_id,
                        OutgoingMessage::text(messages::no_eligible_winner()),
                    )
                    .await?;
                MonthlyCloseOutcome::NoEligibleWinners
            }
            TallyOutcome::Winners { winners, max_votes } => {
                let mentions: Vec<String> =
                    winners.iter().map(|w| w.author_mention.clone()).collect();
                self.chat
                    .send_message(
                        self.config.results_channel_id,
                        OutgoingMessage::text(messages::monthly_winners(&mentions, max_votes)),
                    )
                    .await?;

                for winner in &winners {
                    if let Err(e) = self
                        .chat
                        .send_message(
                            self.config.results_channel_id,
                            OutgoingMessage::text(messages::candidate_post(winner.author_id))
                                .with_image(winner.image_url.as_str()),
                        )
                        .await
                    {
                        tracing::warn!(
                            "could not repost monthly winning photo of {}: {e}",
                            winner.author_id
                        );
                    }
                }

                let ids: Vec<_> = winners.iter().map(|w| w.author_id).collect();
                self.winners.add_monthly_winners(&ids).await;
                tracing::info!(?ids, max_votes, "monthly winners recorded");

                MonthlyCloseOutcome::Winners { winners, max_votes }
            }
        };

        // Lock but keep the thread visible
        self.chat.lock_thread(active.thread_id, false).await?;
        self.rollup.clear_active().await;

        Ok(outcome)
    }
}
