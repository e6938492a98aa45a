//! End-to-end contest flows against an in-memory chat platform.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use photoweek::chat::{
    Attachment, ChannelMessage, ChatApi, ChatError, ChatResult, OutgoingMessage, Reaction,
    SentMessage, ThreadHandle,
};
use photoweek::config::ContestConfig;
use photoweek::contest::{
    ContestState, Decision, MonthlyCloseOutcome, MonthlyOpenOutcome, VotingOpenOutcome,
    WeeklyCloseOutcome,
};
use photoweek::store::{MonthlyRollup, RemovalOutcome, WinnerLedger};
use photoweek::types::{ChannelId, ContestPhase, MessageId, MonthlyPhase, UserId};

const BOT_ID: UserId = 999_000;
const PHOTO_CHANNEL: ChannelId = 300;
const RESULTS_CHANNEL: ChannelId = 400;

#[derive(Default)]
struct MockInner {
    channels: HashMap<ChannelId, Vec<ChannelMessage>>,
    threads: Vec<ChannelId>,
    /// thread -> archived flag
    locked: HashMap<ChannelId, bool>,
    dms: Vec<(UserId, String)>,
    deleted: Vec<(ChannelId, MessageId)>,
    next_id: u64,
}

/// In-memory stand-in for the chat platform
struct MockChat {
    inner: Mutex<MockInner>,
}

impl MockChat {
    fn new() -> Self {
        Self {
            inner: Mutex::new(MockInner {
                next_id: 1000,
                ..MockInner::default()
            }),
        }
    }

    fn alloc_id(inner: &mut MockInner) -> u64 {
        inner.next_id += 1;
        inner.next_id
    }

    /// A user posts a message with the given number of image attachments
    fn push_user_post(&self, channel: ChannelId, author: UserId, images: usize) -> ChannelMessage {
        let mut inner = self.inner.lock().unwrap();
        let id = Self::alloc_id(&mut inner);
        let message = ChannelMessage {
            id,
            author_id: author,
            author_is_bot: false,
            content: String::new(),
            timestamp: Utc::now(),
            attachments: (0..images)
                .map(|n| Attachment {
                    url: format!("https://cdn.test/{author}/{id}-{n}.jpg"),
                    content_type: Some("image/jpeg".to_string()),
                })
                .collect(),
            embed_image: None,
            reactions: Vec::new(),
        };
        inner.channels.entry(channel).or_default().push(message.clone());
        message
    }

    /// Additional votes land on an existing message
    fn react(&self, channel: ChannelId, message: MessageId, emoji: &str, count: u32) {
        let mut inner = self.inner.lock().unwrap();
        let msg = inner
            .channels
            .get_mut(&channel)
            .and_then(|msgs| msgs.iter_mut().find(|m| m.id == message))
            .expect("message to react to");
        match msg.reactions.iter_mut().find(|r| r.emoji == emoji) {
            Some(reaction) => reaction.count += count,
            None => msg.reactions.push(Reaction {
                emoji: emoji.to_string(),
                count,
            }),
        }
    }

    fn messages(&self, channel: ChannelId) -> Vec<ChannelMessage> {
        self.inner
            .lock()
            .unwrap()
            .channels
            .get(&channel)
            .cloned()
            .unwrap_or_default()
    }

    fn threads(&self) -> Vec<ChannelId> {
        self.inner.lock().unwrap().threads.clone()
    }

    fn locked(&self, thread: ChannelId) -> Option<bool> {
        self.inner.lock().unwrap().locked.get(&thread).copied()
    }

    fn dms(&self) -> Vec<(UserId, String)> {
        self.inner.lock().unwrap().dms.clone()
    }

    fn deleted(&self) -> Vec<(ChannelId, MessageId)> {
        self.inner.lock().unwrap().deleted.clone()
    }

    fn candidate_posts(&self, thread: ChannelId) -> Vec<ChannelMessage> {
        self.messages(thread)
            .into_iter()
            .filter(|m| m.content.starts_with("Photo de"))
            .collect()
    }
}

#[async_trait]
impl ChatApi for MockChat {
    async fn send_message(
        &self,
        channel: ChannelId,
        message: OutgoingMessage,
    ) -> ChatResult<SentMessage> {
        let mut inner = self.inner.lock().unwrap();
        let id = Self::alloc_id(&mut inner);
        inner.channels.entry(channel).or_default().push(ChannelMessage {
            id,
            author_id: BOT_ID,
            author_is_bot: true,
            content: message.content,
            timestamp: Utc::now(),
            attachments: Vec::new(),
            embed_image: message.image_url,
            reactions: Vec::new(),
        });
        Ok(SentMessage { id })
    }

    async fn create_thread(&self, channel: ChannelId, _name: &str) -> ChatResult<ThreadHandle> {
        let mut inner = self.inner.lock().unwrap();
        let id = Self::alloc_id(&mut inner);
        inner.channels.entry(id).or_default();
        inner.threads.push(id);
        Ok(ThreadHandle {
            id,
            jump_url: format!("https://discord.test/{channel}/{id}"),
        })
    }

    async fn recent_messages(
        &self,
        channel: ChannelId,
        limit: u32,
    ) -> ChatResult<Vec<ChannelMessage>> {
        // Newest first, like the platform
        let mut messages = self.messages(channel);
        messages.reverse();
        messages.truncate(limit as usize);
        Ok(messages)
    }

    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> ChatResult<()> {
        self.react(channel, message, emoji, 1);
        Ok(())
    }

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> ChatResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let msgs = inner
            .channels
            .get_mut(&channel)
            .ok_or(ChatError::ChannelNotFound(channel))?;
        msgs.retain(|m| m.id != message);
        inner.deleted.push((channel, message));
        Ok(())
    }

    async fn lock_thread(&self, thread: ChannelId, archive: bool) -> ChatResult<()> {
        self.inner.lock().unwrap().locked.insert(thread, archive);
        Ok(())
    }

    async fn direct_message(&self, user: UserId, content: &str) -> ChatResult<()> {
        self.inner.lock().unwrap().dms.push((user, content.to_string()));
        Ok(())
    }
}

fn test_state(dir: &tempfile::TempDir) -> (Arc<ContestState>, Arc<MockChat>) {
    let chat = Arc::new(MockChat::new());
    let config = ContestConfig {
        reporter_role_id: 11,
        reporter_bordeaux_role_id: 12,
        photo_channel_id: PHOTO_CHANNEL,
        results_channel_id: RESULTS_CHANNEL,
        monthly_vote_duration: chrono::Duration::minutes(60),
        ..ContestConfig::default()
    };
    let winners = WinnerLedger::load(dir.path().join("winners.json"));
    let rollup = MonthlyRollup::load(dir.path().join("monthly.json"));
    let state = Arc::new(ContestState::new(config, chat.clone(), winners, rollup));
    (state, chat)
}

/// Drive one full weekly cycle: announce, one accepted photo from `author`,
/// voting open, `votes` votes on the single candidate, close.
async fn run_cycle(
    state: &ContestState,
    chat: &MockChat,
    author: UserId,
    votes: u32,
) -> WeeklyCloseOutcome {
    state.open_submission_window().await.unwrap();

    let post = chat.push_user_post(PHOTO_CHANNEL, author, 1);
    assert_eq!(state.handle_message(&post).await, Some(Decision::Accept));

    let thread = match state.open_voting().await.unwrap() {
        VotingOpenOutcome::Opened { thread, candidates } => {
            assert_eq!(candidates, 1);
            thread
        }
        other => panic!("expected voting to open, got {other:?}"),
    };

    let candidate = &chat.candidate_posts(thread.id)[0];
    chat.react(thread.id, candidate.id, "📸", votes);

    state.close_voting_and_announce().await.unwrap()
}

#[tokio::test]
async fn test_full_weekly_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let (state, chat) = test_state(&dir);

    // 1. Announce the submission window
    assert_eq!(state.phase().await, ContestPhase::Idle);
    state.open_submission_window().await.unwrap();
    assert_eq!(state.phase().await, ContestPhase::SubmissionOpen);

    let announcement = &chat.messages(PHOTO_CHANNEL)[0];
    assert!(announcement.content.contains("<@&11>"));
    assert!(announcement.content.contains("<@&12>"));

    // 2. Two participants submit, one tries to cheat
    let alice_post = chat.push_user_post(PHOTO_CHANNEL, 1, 1);
    let bob_post = chat.push_user_post(PHOTO_CHANNEL, 2, 1);
    assert_eq!(state.handle_message(&alice_post).await, Some(Decision::Accept));
    assert_eq!(state.handle_message(&bob_post).await, Some(Decision::Accept));

    let second = chat.push_user_post(PHOTO_CHANNEL, 1, 1);
    assert_eq!(
        state.handle_message(&second).await,
        Some(Decision::RejectAlreadySubmitted)
    );
    assert!(chat.deleted().contains(&(PHOTO_CHANNEL, second.id)));
    assert_eq!(chat.dms().len(), 1);

    let text_only = chat.push_user_post(PHOTO_CHANNEL, 3, 0);
    assert_eq!(
        state.handle_message(&text_only).await,
        Some(Decision::RejectNoImage)
    );

    let double = chat.push_user_post(PHOTO_CHANNEL, 4, 2);
    assert_eq!(
        state.handle_message(&double).await,
        Some(Decision::RejectMultipleImages)
    );

    // 3. Open voting: a thread with one candidate post per accepted photo,
    // each seeded with the vote reaction
    let thread = match state.open_voting().await.unwrap() {
        VotingOpenOutcome::Opened { thread, candidates } => {
            assert_eq!(candidates, 2);
            thread
        }
        other => panic!("expected voting to open, got {other:?}"),
    };
    assert_eq!(state.phase().await, ContestPhase::VotingOpen);
    assert!(state.last_photo_call().await.is_none());

    let candidates = chat.candidate_posts(thread.id);
    assert_eq!(candidates.len(), 2);
    // Posted in submission order
    assert!(candidates[0].content.contains("<@1>"));
    assert!(candidates[1].content.contains("<@2>"));
    for candidate in &candidates {
        assert_eq!(candidate.reaction_count("📸"), 1);
    }

    // 4. Votes come in: Bob 3, Alice 1
    chat.react(thread.id, candidates[0].id, "📸", 1);
    chat.react(thread.id, candidates[1].id, "📸", 3);

    // 5. Close: Bob wins with 3 votes (seed reaction not counted)
    match state.close_voting_and_announce().await.unwrap() {
        WeeklyCloseOutcome::Winners {
            winners,
            max_votes,
            week_no,
        } => {
            assert_eq!(max_votes, 3);
            assert_eq!(week_no, 1);
            assert_eq!(winners.len(), 1);
            assert_eq!(winners[0].author_id, 2);
        }
        other => panic!("expected winners, got {other:?}"),
    }

    assert_eq!(state.phase().await, ContestPhase::Idle);
    assert_eq!(chat.locked(thread.id), Some(false), "locked, not archived");
    assert!(state.winners.weekly_winners().await.contains(&2));
    assert_eq!(state.rollup.week_no().await, 1);

    let results: Vec<String> = chat
        .messages(RESULTS_CHANNEL)
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert!(results.iter().any(|c| c.contains("<@2>") && c.contains("3 vote(s)")));
    assert!(results.iter().any(|c| c.contains(&thread.jump_url)));
}

#[tokio::test]
async fn test_deleted_photo_frees_the_slot() {
    let dir = tempfile::tempdir().unwrap();
    let (state, chat) = test_state(&dir);
    state.open_submission_window().await.unwrap();

    let post = chat.push_user_post(PHOTO_CHANNEL, 1, 1);
    assert_eq!(state.handle_message(&post).await, Some(Decision::Accept));

    let retry = chat.push_user_post(PHOTO_CHANNEL, 1, 1);
    assert_eq!(
        state.handle_message(&retry).await,
        Some(Decision::RejectAlreadySubmitted)
    );

    // The author removes their accepted photo and can submit again
    state.handle_message_deleted(post.id).await;
    let second_try = chat.push_user_post(PHOTO_CHANNEL, 1, 1);
    assert_eq!(state.handle_message(&second_try).await, Some(Decision::Accept));
}

#[tokio::test]
async fn test_guard_ignores_messages_outside_window() {
    let dir = tempfile::tempdir().unwrap();
    let (state, chat) = test_state(&dir);

    let post = chat.push_user_post(PHOTO_CHANNEL, 1, 1);
    assert_eq!(state.handle_message(&post).await, None);
}

#[tokio::test]
async fn test_open_voting_requires_announcement() {
    let dir = tempfile::tempdir().unwrap();
    let (state, chat) = test_state(&dir);

    match state.open_voting().await.unwrap() {
        VotingOpenOutcome::NotAnnounced => {}
        other => panic!("expected NotAnnounced, got {other:?}"),
    }
    assert!(chat.threads().is_empty());
}

#[tokio::test]
async fn test_empty_week_still_opens_a_venue() {
    let dir = tempfile::tempdir().unwrap();
    let (state, chat) = test_state(&dir);
    state.open_submission_window().await.unwrap();

    let thread = match state.open_voting().await.unwrap() {
        VotingOpenOutcome::NoPhotos { thread } => thread,
        other => panic!("expected NoPhotos, got {other:?}"),
    };
    assert!(chat
        .messages(thread.id)
        .iter()
        .any(|m| m.content.contains("Aucune photo")));

    // Closing the empty venue announces the negative outcome and locks it
    match state.close_voting_and_announce().await.unwrap() {
        WeeklyCloseOutcome::NoCandidates => {}
        other => panic!("expected NoCandidates, got {other:?}"),
    }
    assert_eq!(chat.locked(thread.id), Some(false));
    assert_eq!(state.rollup.week_no().await, 0);
}

#[tokio::test]
async fn test_close_with_nothing_open_is_a_noop() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _chat) = test_state(&dir);

    match state.close_voting_and_announce().await.unwrap() {
        WeeklyCloseOutcome::NothingOpen => {}
        other => panic!("expected NothingOpen, got {other:?}"),
    }
    match state.close_monthly_contest().await.unwrap() {
        MonthlyCloseOutcome::NothingOpen => {}
        other => panic!("expected NothingOpen, got {other:?}"),
    }
}

#[tokio::test]
async fn test_past_winner_is_excluded() {
    let dir = tempfile::tempdir().unwrap();
    let (state, chat) = test_state(&dir);
    state.winners.add_weekly_winners(&[1]).await;

    match run_cycle(&state, &chat, 1, 5).await {
        WeeklyCloseOutcome::NoEligibleWinners => {}
        other => panic!("expected NoEligibleWinners, got {other:?}"),
    }

    // No week is recorded without a winner
    assert_eq!(state.rollup.week_no().await, 0);
    assert!(chat
        .messages(RESULTS_CHANNEL)
        .iter()
        .any(|m| m.content.contains("déjà gagné")));
}

#[tokio::test]
async fn test_tie_produces_two_winners() {
    let dir = tempfile::tempdir().unwrap();
    let (state, chat) = test_state(&dir);
    state.open_submission_window().await.unwrap();

    for author in [1, 2] {
        let post = chat.push_user_post(PHOTO_CHANNEL, author, 1);
        assert_eq!(state.handle_message(&post).await, Some(Decision::Accept));
    }

    let thread = match state.open_voting().await.unwrap() {
        VotingOpenOutcome::Opened { thread, .. } => thread,
        other => panic!("expected voting to open, got {other:?}"),
    };

    for candidate in chat.candidate_posts(thread.id) {
        chat.react(thread.id, candidate.id, "📸", 4);
    }

    match state.close_voting_and_announce().await.unwrap() {
        WeeklyCloseOutcome::Winners {
            winners, max_votes, ..
        } => {
            assert_eq!(max_votes, 4);
            assert_eq!(winners.len(), 2);
        }
        other => panic!("expected winners, got {other:?}"),
    }

    assert!(chat
        .messages(RESULTS_CHANNEL)
        .iter()
        .any(|m| m.content.contains("Égalité")));
    // One week, two entries
    assert_eq!(state.rollup.week_no().await, 1);
}

#[tokio::test]
async fn test_monthly_contest_opens_after_four_weeks() {
    let dir = tempfile::tempdir().unwrap();
    let (state, chat) = test_state(&dir);

    for week in 1..=3u64 {
        match run_cycle(&state, &chat, week, 2).await {
            WeeklyCloseOutcome::Winners { week_no, .. } => assert_eq!(week_no, week as u32),
            other => panic!("expected winners, got {other:?}"),
        }
        assert_eq!(state.monthly_phase().await, MonthlyPhase::Idle);
    }

    // Not due yet after three weeks
    match state.maybe_open_monthly_contest().await.unwrap() {
        MonthlyOpenOutcome::NotDue => {}
        other => panic!("expected NotDue, got {other:?}"),
    }

    // The fourth close rolls up automatically
    match run_cycle(&state, &chat, 4, 2).await {
        WeeklyCloseOutcome::Winners { week_no, .. } => assert_eq!(week_no, 4),
        other => panic!("expected winners, got {other:?}"),
    }

    assert_eq!(state.monthly_phase().await, MonthlyPhase::Open);
    assert_eq!(state.rollup.last_monthly_week_no().await, 4);

    let active = state.rollup.active().await.expect("active monthly contest");
    assert!(!active.closed);
    assert_eq!(
        active.ends_at - active.opened_at,
        chrono::Duration::minutes(60)
    );

    // The monthly venue holds the four weekly winners, seeded for voting
    let seeded = chat.candidate_posts(active.thread_id);
    assert_eq!(seeded.len(), 4);
    for post in &seeded {
        assert_eq!(post.reaction_count("🏆"), 1);
    }

    // Re-checking while open does not fire again
    match state.maybe_open_monthly_contest().await.unwrap() {
        MonthlyOpenOutcome::AlreadyOpen => {}
        other => panic!("expected AlreadyOpen, got {other:?}"),
    }
}

#[tokio::test]
async fn test_monthly_close_records_winner() {
    let dir = tempfile::tempdir().unwrap();
    let (state, chat) = test_state(&dir);

    for week in 1..=4u64 {
        run_cycle(&state, &chat, week, 2).await;
    }
    let active = state.rollup.active().await.expect("active monthly contest");

    // Week 2's photo takes the month
    let seeded = chat.candidate_posts(active.thread_id);
    chat.react(active.thread_id, seeded[1].id, "🏆", 3);

    match state.close_monthly_contest().await.unwrap() {
        MonthlyCloseOutcome::Winners { winners, max_votes } => {
            assert_eq!(max_votes, 3);
            assert_eq!(winners.len(), 1);
            assert_eq!(winners[0].author_id, 2);
        }
        other => panic!("expected winners, got {other:?}"),
    }

    assert_eq!(state.monthly_phase().await, MonthlyPhase::Idle);
    assert!(state.rollup.active().await.is_none());
    assert!(state.winners.monthly_winners().await.contains(&2));
    // Weekly and monthly exclusions stay disjoint
    assert!(state.winners.weekly_winners().await.contains(&2));
    assert_eq!(chat.locked(active.thread_id), Some(false));
}

#[tokio::test]
async fn test_admin_removal_restores_eligibility() {
    let dir = tempfile::tempdir().unwrap();
    let (state, chat) = test_state(&dir);

    match run_cycle(&state, &chat, 1, 2).await {
        WeeklyCloseOutcome::Winners { .. } => {}
        other => panic!("expected winners, got {other:?}"),
    }

    // Same author cannot win again...
    match run_cycle(&state, &chat, 1, 2).await {
        WeeklyCloseOutcome::NoEligibleWinners => {}
        other => panic!("expected NoEligibleWinners, got {other:?}"),
    }

    // ...until an administrator removes them from the ledger
    assert_eq!(state.remove_weekly_winner(1).await, RemovalOutcome::Removed);
    assert_eq!(state.remove_weekly_winner(1).await, RemovalOutcome::NotAMember);

    match run_cycle(&state, &chat, 1, 2).await {
        WeeklyCloseOutcome::Winners { winners, .. } => assert_eq!(winners[0].author_id, 1),
        other => panic!("expected winners, got {other:?}"),
    }
}

#[tokio::test]
async fn test_reannounce_resets_the_window() {
    let dir = tempfile::tempdir().unwrap();
    let (state, chat) = test_state(&dir);

    state.open_submission_window().await.unwrap();
    let first_marker = state.last_photo_call().await.unwrap();

    // An early photo, then a re-announcement
    let early = chat.push_user_post(PHOTO_CHANNEL, 1, 1);
    state.handle_message(&early).await;
    state.open_submission_window().await.unwrap();

    let second_marker = state.last_photo_call().await.unwrap();
    assert!(second_marker >= first_marker);
    assert_eq!(chat.messages(PHOTO_CHANNEL).iter().filter(|m| m.author_is_bot).count(), 2);
}
