//! Boundary to the chat platform.
//!
//! The contest only ever talks to the platform through [`ChatApi`]; the
//! REST implementation is [`DiscordApi`]. The real-time gateway side
//! (event push, authentication handshake) is owned by the embedding
//! process, which forwards message-created and message-deleted
//! notifications into the contest state.

mod discord;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use discord::DiscordApi;

use crate::types::{ChannelId, MessageId, UserId};

/// Result type for chat platform operations
pub type ChatResult<T> = Result<T, ChatError>;

/// Errors that can occur when talking to the chat platform
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("channel {0} not found")]
    ChannelNotFound(ChannelId),

    #[error("response decoding failed: {0}")]
    Decode(String),
}

/// A message to be posted to a channel or thread
#[derive(Debug, Clone, Default)]
pub struct OutgoingMessage {
    pub content: String,
    /// Rendered as an embedded image under the content
    pub image_url: Option<String>,
    /// Whether role mentions in the content should actually ping
    pub mention_roles: bool,
}

impl OutgoingMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn with_role_mentions(mut self) -> Self {
        self.mention_roles = true;
        self
    }
}

/// An attachment on a historical message
#[derive(Debug, Clone)]
pub struct Attachment {
    pub url: String,
    pub content_type: Option<String>,
}

impl Attachment {
    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("image/"))
    }
}

/// A reaction aggregate on a historical message
#[derive(Debug, Clone)]
pub struct Reaction {
    pub emoji: String,
    pub count: u32,
}

/// A message read back from a channel's history
#[derive(Debug, Clone)]
pub struct ChannelMessage {
    pub id: MessageId,
    pub author_id: UserId,
    pub author_is_bot: bool,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub attachments: Vec<Attachment>,
    /// First embedded image, if any (the service posts candidates this way)
    pub embed_image: Option<String>,
    pub reactions: Vec<Reaction>,
}

impl ChannelMessage {
    /// Number of image attachments (what the submission rules count)
    pub fn image_attachment_count(&self) -> usize {
        self.attachments.iter().filter(|a| a.is_image()).count()
    }

    /// First image carried by the message, embed or attachment
    pub fn first_image(&self) -> Option<&str> {
        self.embed_image
            .as_deref()
            .or_else(|| self.attachments.iter().find(|a| a.is_image()).map(|a| a.url.as_str()))
    }

    /// Total reaction count for the given emoji (0 if absent)
    pub fn reaction_count(&self, emoji: &str) -> u32 {
        self.reactions
            .iter()
            .find(|r| r.emoji == emoji)
            .map(|r| r.count)
            .unwrap_or(0)
    }
}

/// Confirmation for a message the service posted
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub id: MessageId,
}

/// A thread created by the service
#[derive(Debug, Clone)]
pub struct ThreadHandle {
    pub id: ChannelId,
    pub jump_url: String,
}

/// Operations the contest needs from the chat platform
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Post a message to a channel or thread
    async fn send_message(
        &self,
        channel: ChannelId,
        message: OutgoingMessage,
    ) -> ChatResult<SentMessage>;

    /// Create a public thread under a channel
    async fn create_thread(&self, channel: ChannelId, name: &str) -> ChatResult<ThreadHandle>;

    /// Most recent messages of a channel or thread, newest first
    async fn recent_messages(
        &self,
        channel: ChannelId,
        limit: u32,
    ) -> ChatResult<Vec<ChannelMessage>>;

    /// React to a message as the service itself
    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> ChatResult<()>;

    /// Remove a message from a channel
    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> ChatResult<()>;

    /// Lock a thread; `archive` additionally hides it from the channel
    async fn lock_thread(&self, thread: ChannelId, archive: bool) -> ChatResult<()>;

    /// Send a private message to a user
    async fn direct_message(&self, user: UserId, content: &str) -> ChatResult<()>;
}
