use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::*;

const API_BASE: &str = "https://discord.com/api/v10";

/// Public thread channel type in the Discord REST API
const PUBLIC_THREAD: u8 = 11;

/// Discord REST implementation of [`ChatApi`]
pub struct DiscordApi {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl DiscordApi {
    pub fn new(token: String) -> Self {
        Self::with_base_url(token, API_BASE.to_string())
    }

    pub fn with_base_url(token: String, base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client");

        Self {
            client,
            token,
            base_url,
        }
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.token)
    }

    async fn check(response: reqwest::Response) -> ChatResult<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[derive(Debug, Serialize)]
struct CreateMessageBody {
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    embeds: Option<Vec<EmbedBody>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    allowed_mentions: Option<AllowedMentions>,
}

#[derive(Debug, Serialize)]
struct EmbedBody {
    image: EmbedImageBody,
}

#[derive(Debug, Serialize)]
struct EmbedImageBody {
    url: String,
}

#[derive(Debug, Serialize)]
struct AllowedMentions {
    parse: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
struct CreateThreadBody {
    name: String,
    #[serde(rename = "type")]
    kind: u8,
}

#[derive(Debug, Serialize)]
struct ModifyThreadBody {
    locked: bool,
    archived: bool,
}

#[derive(Debug, Serialize)]
struct CreateDmBody {
    recipient_id: String,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    id: String,
    author: ApiUser,
    #[serde(default)]
    content: String,
    timestamp: String,
    #[serde(default)]
    attachments: Vec<ApiAttachment>,
    #[serde(default)]
    embeds: Vec<ApiEmbed>,
    #[serde(default)]
    reactions: Vec<ApiReaction>,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    id: String,
    #[serde(default)]
    bot: bool,
}

#[derive(Debug, Deserialize)]
struct ApiAttachment {
    url: String,
    content_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiEmbed {
    image: Option<ApiEmbedImage>,
}

#[derive(Debug, Deserialize)]
struct ApiEmbedImage {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ApiReaction {
    emoji: ApiEmoji,
    count: u32,
}

#[derive(Debug, Deserialize)]
struct ApiEmoji {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiChannel {
    id: String,
    guild_id: Option<String>,
}

fn parse_snowflake(raw: &str) -> ChatResult<u64> {
    raw.parse()
        .map_err(|_| ChatError::Decode(format!("invalid snowflake: {raw}")))
}

impl TryFrom<ApiMessage> for ChannelMessage {
    type Error = ChatError;

    fn try_from(msg: ApiMessage) -> ChatResult<Self> {
        let timestamp = chrono::DateTime::parse_from_rfc3339(&msg.timestamp)
            .map_err(|e| ChatError::Decode(format!("invalid timestamp: {e}")))?
            .with_timezone(&chrono::Utc);

        Ok(ChannelMessage {
            id: parse_snowflake(&msg.id)?,
            author_id: parse_snowflake(&msg.author.id)?,
            author_is_bot: msg.author.bot,
            content: msg.content,
            timestamp,
            attachments: msg
                .attachments
                .into_iter()
                .map(|a| Attachment {
                    url: a.url,
                    content_type: a.content_type,
                })
                .collect(),
            embed_image: msg.embeds.into_iter().find_map(|e| e.image.map(|i| i.url)),
            reactions: msg
                .reactions
                .into_iter()
                .filter_map(|r| {
                    r.emoji.name.map(|emoji| Reaction {
                        emoji,
                        count: r.count,
                    })
                })
                .collect(),
        })
    }
}

#[async_trait]
impl ChatApi for DiscordApi {
    async fn send_message(
        &self,
        channel: ChannelId,
        message: OutgoingMessage,
    ) -> ChatResult<SentMessage> {
        let body = CreateMessageBody {
            content: message.content,
            embeds: message.image_url.map(|url| {
                vec![EmbedBody {
                    image: EmbedImageBody { url },
                }]
            }),
            allowed_mentions: message.mention_roles.then(|| AllowedMentions {
                parse: vec!["roles"],
            }),
        };

        let url = format!("{}/channels/{}/messages", self.base_url, channel);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth())
            .json(&body)
            .send()
            .await?;

        let sent: ApiMessage = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| ChatError::Decode(e.to_string()))?;

        Ok(SentMessage {
            id: parse_snowflake(&sent.id)?,
        })
    }

    async fn create_thread(&self, channel: ChannelId, name: &str) -> ChatResult<ThreadHandle> {
        let url = format!("{}/channels/{}/threads", self.base_url, channel);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth())
            .json(&CreateThreadBody {
                name: name.to_string(),
                kind: PUBLIC_THREAD,
            })
            .send()
            .await?;

        let thread: ApiChannel = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| ChatError::Decode(e.to_string()))?;

        let jump_url = match thread.guild_id.as_deref() {
            Some(guild_id) => format!("https://discord.com/channels/{guild_id}/{}", thread.id),
            None => format!("https://discord.com/channels/@me/{}", thread.id),
        };

        Ok(ThreadHandle {
            id: parse_snowflake(&thread.id)?,
            jump_url,
        })
    }

    async fn recent_messages(
        &self,
        channel: ChannelId,
        limit: u32,
    ) -> ChatResult<Vec<ChannelMessage>> {
        let url = format!(
            "{}/channels/{}/messages?limit={}",
            self.base_url, channel, limit
        );
        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth())
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ChatError::ChannelNotFound(channel));
        }

        let messages: Vec<ApiMessage> = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| ChatError::Decode(e.to_string()))?;

        messages.into_iter().map(TryInto::try_into).collect()
    }

    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> ChatResult<()> {
        let url = format!(
            "{}/channels/{}/messages/{}/reactions/{}/@me",
            self.base_url,
            channel,
            message,
            percent_encode(emoji)
        );
        let response = self
            .client
            .put(&url)
            .header("Authorization", self.auth())
            .header("Content-Length", "0")
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> ChatResult<()> {
        let url = format!(
            "{}/channels/{}/messages/{}",
            self.base_url, channel, message
        );
        let response = self
            .client
            .delete(&url)
            .header("Authorization", self.auth())
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn lock_thread(&self, thread: ChannelId, archive: bool) -> ChatResult<()> {
        let url = format!("{}/channels/{}", self.base_url, thread);
        let response = self
            .client
            .patch(&url)
            .header("Authorization", self.auth())
            .json(&ModifyThreadBody {
                locked: true,
                archived: archive,
            })
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn direct_message(&self, user: UserId, content: &str) -> ChatResult<()> {
        // DMs go through a per-recipient channel that must be opened first
        let url = format!("{}/users/@me/channels", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth())
            .json(&CreateDmBody {
                recipient_id: user.to_string(),
            })
            .send()
            .await?;

        let dm: ApiChannel = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| ChatError::Decode(e.to_string()))?;

        self.send_message(
            parse_snowflake(&dm.id)?,
            OutgoingMessage::text(content),
        )
        .await?;
        Ok(())
    }
}

/// Minimal percent-encoding for reaction emoji in URL paths
/// (avoiding an additional dependency)
fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len() * 3);
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
