use super::ContestState;
use crate::chat::ChannelMessage;
use crate::messages;
use crate::types::*;

/// Decision for one submission attempt, evaluated in rule order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    RejectNoImage,
    RejectMultipleImages,
    RejectAlreadySubmitted,
}

/// The submission rules: exactly one image, at most one accepted post per
/// participant per window. Counts are not incremented on rejection.
fn decide(already_submitted: bool, image_count: usize) -> Decision {
    match image_count {
        0 => Decision::RejectNoImage,
        1 if already_submitted => Decision::RejectAlreadySubmitted,
        1 => Decision::Accept,
        _ => Decision::RejectMultipleImages,
    }
}

impl ContestState {
    /// Handle a new message in the photo channel during the submission
    /// window. Returns `None` when the message is not subject to the rules
    /// (bot-authored, or no window is open). Rejected posts are removed and
    /// their author is told why in private; a failed removal or DM never
    /// propagates.
    pub async fn handle_message(&self, message: &ChannelMessage) -> Option<Decision> {
        if message.author_is_bot {
            return None;
        }
        if self.phase().await != ContestPhase::SubmissionOpen {
            return None;
        }

        let author = message.author_id;
        let already = {
            let counts = self.submission_counts.read().await;
            counts.get(&author).copied().unwrap_or(0) >= 1
        };

        let decision = decide(already, message.image_attachment_count());
        match decision {
            Decision::Accept => {
                self.submission_counts.write().await.insert(author, 1);
                self.accepted_posts.write().await.insert(message.id, author);
                tracing::info!(author, message = message.id, "photo accepted");
            }
            rejection => {
                tracing::info!(author, message = message.id, ?rejection, "photo rejected");
                if let Err(e) = self
                    .chat
                    .delete_message(self.config.photo_channel_id, message.id)
                    .await
                {
                    tracing::warn!("could not remove rejected post {}: {e}", message.id);
                }

                let dm = match rejection {
                    Decision::RejectNoImage => messages::dm_no_image(),
                    Decision::RejectMultipleImages => messages::dm_multiple_images(),
                    Decision::RejectAlreadySubmitted => messages::dm_already_submitted(),
                    Decision::Accept => unreachable!(),
                };
                if let Err(e) = self.chat.direct_message(author, &dm).await {
                    tracing::debug!("could not DM {author}: {e}");
                }
            }
        }

        Some(decision)
    }

    /// Handle a message deletion in the photo channel. When an accepted
    /// submission disappears its author gets their slot back.
    pub async fn handle_message_deleted(&self, message: MessageId) {
        if let Some(author) = self.accepted_posts.write().await.remove(&message) {
            self.submission_counts.write().await.insert(author, 0);
            tracing::info!(author, message, "accepted photo removed, slot freed");
        }
    }

    /// Drop all per-cycle submission tracking (voting-open transition)
    pub(super) async fn reset_submissions(&self) {
        self.submission_counts.write().await.clear();
        self.accepted_posts.write().await.clear();
    }
}
