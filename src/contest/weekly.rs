use chrono::Utc;

use super::{tally, ContestState, TallyOutcome, HISTORY_FETCH_LIMIT};
use crate::chat::{ChannelMessage, ChatResult, OutgoingMessage, ThreadHandle};
use crate::messages;
use crate::types::Candidate;

/// Outcome of the voting-open transition
#[derive(Debug)]
pub enum VotingOpenOutcome {
    /// No submission window was ever announced; nothing to do
    NotAnnounced,
    /// The window held no photos; an empty venue was still created
    NoPhotos { thread: ThreadHandle },
    Opened {
        thread: ThreadHandle,
        candidates: usize,
    },
}

/// Outcome of the weekly close
#[derive(Debug)]
pub enum WeeklyCloseOutcome {
    /// No voting thread is open; nothing to do
    NothingOpen,
    NoCandidates,
    NoEligibleWinners,
    Winners {
        winners: Vec<Candidate>,
        max_votes: u32,
        week_no: u32,
    },
}

impl ContestState {
    /// Announce the submission window and start a new cycle. Safe to call
    /// again mid-window: it simply re-announces and resets the marker.
    pub async fn open_submission_window(&self) -> ChatResult<()> {
        let announcement = messages::weekly_announcement(
            self.config.reporter_role_id,
            self.config.reporter_bordeaux_role_id,
        );
        self.chat
            .send_message(
                self.config.photo_channel_id,
                OutgoingMessage::text(announcement).with_role_mentions(),
            )
            .await?;

        let now = Utc::now();
        *self.last_photo_call.write().await = Some(now);
        tracing::info!(%now, "submission window open");
        Ok(())
    }

    /// Close the submission window and open the voting thread: gather this
    /// cycle's photos, post one candidate message per photo with the vote
    /// reaction, then reset the per-cycle submission state.
    pub async fn open_voting(&self) -> ChatResult<VotingOpenOutcome> {
        let Some(window_start) = *self.last_photo_call.read().await else {
            tracing::info!("voting requested but no window was announced");
            return Ok(VotingOpenOutcome::NotAnnounced);
        };

        let history = self
            .chat
            .recent_messages(self.config.photo_channel_id, HISTORY_FETCH_LIMIT)
            .await?;

        // History arrives newest first; candidates are posted in
        // submission order.
        let mut photos: Vec<(&ChannelMessage, &str)> = history
            .iter()
            .filter(|m| !m.author_is_bot && m.timestamp >= window_start)
            .filter_map(|m| m.first_image().map(|url| (m, url)))
            .collect();
        photos.reverse();

        let thread = self
            .chat
            .create_thread(
                self.config.photo_channel_id,
                &messages::voting_thread_name(Utc::now().date_naive()),
            )
            .await?;

        if photos.is_empty() {
            tracing::info!("no photos were submitted this cycle");
            self.chat
                .send_message(
                    thread.id,
                    OutgoingMessage::text(messages::no_photos_this_week()),
                )
                .await?;
            self.finish_voting_open(&thread).await;
            return Ok(VotingOpenOutcome::NoPhotos { thread });
        }

        self.chat
            .send_message(
                thread.id,
                OutgoingMessage::text(messages::voting_intro(&self.config.vote_emoji)),
            )
            .await?;

        // One failed photo must not lose the rest of the batch
        let mut posted = 0;
        for (message, image_url) in photos {
            match self
                .chat
                .send_message(
                    thread.id,
                    OutgoingMessage::text(messages::candidate_post(message.author_id))
                        .with_image(image_url),
                )
                .await
            {
                Ok(sent) => {
                    posted += 1;
                    if let Err(e) = self
                        .chat
                        .add_reaction(thread.id, sent.id, &self.config.vote_emoji)
                        .await
                    {
                        tracing::warn!("could not seed vote reaction on {}: {e}", sent.id);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "could not post candidate for {}: {e}",
                        message.author_id
                    );
                }
            }
        }

        self.finish_voting_open(&thread).await;
        tracing::info!(candidates = posted, thread = thread.id, "voting open");
        Ok(VotingOpenOutcome::Opened {
            thread,
            candidates: posted,
        })
    }

    async fn finish_voting_open(&self, thread: &ThreadHandle) {
        self.reset_submissions().await;
        *self.last_photo_call.write().await = None;
        *self.voting_thread.write().await = Some(thread.clone());
    }

    /// Close the voting thread, announce the result and record winners.
    /// Closing with no open thread is a safe no-op.
    pub async fn close_voting_and_announce(&self) -> ChatResult<WeeklyCloseOutcome> {
        let Some(thread) = self.voting_thread.read().await.clone() else {
            tracing::info!("weekly close requested but no voting thread is open");
            return Ok(WeeklyCloseOutcome::NothingOpen);
        };

        let history = self.chat.recent_messages(thread.id, HISTORY_FETCH_LIMIT).await?;
        let candidates = reconstruct_candidates(&history, &self.config.vote_emoji);

        let excluded = self.winners.weekly_winners().await;
        let outcome = match tally(&candidates, &excluded) {
            TallyOutcome::NoCandidates => {
                self.chat
                    .send_message(
                        self.config.results_channel_id,
                        OutgoingMessage::text(messages::no_photos_this_week()),
                    )
                    .await?;
                WeeklyCloseOutcome::NoCandidates
            }
            TallyOutcome::NoEligibleWinners => {
                self.chat
                    .send_message(
                        self.config.results_channel_id,
                        OutgoingMessage::text(messages::no_eligible_winner()),
                    )
                    .await?;
                WeeklyCloseOutcome::NoEligibleWinners
            }
            TallyOutcome::Winners { winners, max_votes } => {
                let mentions: Vec<String> =
                    winners.iter().map(|w| w.author_mention.clone()).collect();
                self.chat
                    .send_message(
                        self.config.results_channel_id,
                        OutgoingMessage::text(messages::weekly_winners(&mentions, max_votes)),
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
                            "could not repost winning photo of {}: {e}",
                            winner.author_id
                        );
                    }
                }

                let ids: Vec<_> = winners.iter().map(|w| w.author_id).collect();
                self.winners.add_weekly_winners(&ids).await;
                let week_no = self.rollup.record_week(&winners, Utc::now()).await;
                tracing::info!(?ids, max_votes, week_no, "weekly winners recorded");

                WeeklyCloseOutcome::Winners {
                    winners,
                    max_votes,
                    week_no,
                }
            }
        };

        // Lock but keep the thread visible
        self.chat.lock_thread(thread.id, false).await?;

        if matches!(outcome, WeeklyCloseOutcome::Winners { .. }) {
            if let Err(e) = self
                .chat
                .send_message(
                    self.config.results_channel_id,
                    OutgoingMessage::text(messages::results_backlink(&thread.jump_url)),
                )
                .await
            {
                tracing::warn!("could not post results backlink: {e}");
            }
        }

        *self.voting_thread.write().await = None;

        if matches!(outcome, WeeklyCloseOutcome::Winners { .. }) && self.config.monthly_enabled {
            match self.maybe_open_monthly_contest().await {
                Ok(monthly) => tracing::info!(?monthly, "monthly check after weekly close"),
                Err(e) => tracing::error!("monthly contest could not be opened: {e}"),
            }
        }

        Ok(outcome)
    }
}

/// Rebuild the candidate list from a voting thread's history. Only the
/// service's own candidate posts qualify; anything else (vote chatter, an
/// unparseable author mention, a post whose image went missing) is dropped
/// silently.
pub(super) fn reconstruct_candidates(
    history: &[ChannelMessage],
    vote_emoji: &str,
) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = history
        .iter()
        .filter(|m| m.author_is_bot)
        .filter_map(|m| {
            let author_id = messages::parse_candidate_author(&m.content)?;
            let Some(image_url) = m.first_image() else {
                tracing::debug!("candidate post {} has no image, dropped", m.id);
                return None;
            };
            // The raw count includes the service's own seed reaction
            let votes = m.reaction_count(vote_emoji).saturating_sub(1);
            Some(Candidate {
                author_id,
                author_mention: format!("<@{author_id}>"),
                image_url: image_url.to_string(),
                votes,
            })
        })
        .collect();
    candidates.reverse();
    candidates
}
