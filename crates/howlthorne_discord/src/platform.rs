//! The slice of Discord the leaderboard publisher needs.

use async_trait::async_trait;
use howlthorne_core::UserId;
use serenity::{
    all::{ChannelId, CreateEmbed, CreateMessage, EditMessage, MessageId},
    http::Http,
};
use std::sync::Arc;
use tracing::debug;

use crate::error::{DiscordError, Result};
use crate::helpers::{NetworkPolicy, is_unknown_resource, with_retry, with_timeout};

#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Display tag of a user.
    async fn user_tag(&self, user: UserId) -> Result<String>;

    /// Posts a message and returns its id.
    async fn send(&self, channel: u64, message: CreateMessage) -> Result<u64>;

    /// Replaces the embed of an earlier message. A deleted message is
    /// [`DiscordError::MessageNotFound`].
    async fn edit_embed(&self, channel: u64, message: u64, embed: CreateEmbed) -> Result<()>;
}

// serenity's id constructors panic on 0, so ids are checked first.

fn serenity_user(user: UserId) -> Result<serenity::all::UserId> {
    match user.get() {
        0 => Err(DiscordError::UserNotFound {
            user_id: 0,
            attempts: 0,
            cause: None,
        }),
        id => Ok(serenity::all::UserId::new(id)),
    }
}

fn serenity_channel(channel: u64) -> Result<ChannelId> {
    match channel {
        0 => Err(DiscordError::ChannelNotFound {
            channel_id: 0,
            cause: None,
        }),
        id => Ok(ChannelId::new(id)),
    }
}

/// [`ChatPlatform`] over serenity's HTTP client.
#[derive(Clone)]
pub struct SerenityPlatform {
    http: Arc<Http>,
    policy: NetworkPolicy,
}

impl SerenityPlatform {
    pub fn new(http: Arc<Http>, policy: NetworkPolicy) -> Self {
        Self { http, policy }
    }

    pub fn policy(&self) -> &NetworkPolicy {
        &self.policy
    }
}

#[async_trait]
impl ChatPlatform for SerenityPlatform {
    async fn user_tag(&self, user: UserId) -> Result<String> {
        let id = serenity_user(user)?;
        let http = &self.http;
        let timeout = self.policy.timeout;
        let attempts = self.policy.attempts;

        let fetched = with_retry("fetch user", &self.policy, move || async move {
            match tokio::time::timeout(timeout, http.get_user(id)).await {
                Ok(Ok(found)) => Ok(found),
                Ok(Err(cause)) if is_unknown_resource(&cause) => Err(DiscordError::UserNotFound {
                    user_id: user.get(),
                    attempts,
                    cause: Some(cause),
                }),
                Ok(Err(cause)) => Err(DiscordError::TransientNetwork {
                    operation: "fetch user",
                    cause,
                }),
                Err(_) => Err(DiscordError::Timeout {
                    operation: "fetch user",
                    timeout,
                }),
            }
        })
        .await?;

        Ok(fetched.tag())
    }

    async fn send(&self, channel: u64, message: CreateMessage) -> Result<u64> {
        let channel_id = serenity_channel(channel)?;
        let sent = match tokio::time::timeout(
            self.policy.timeout,
            channel_id.send_message(&self.http, message),
        )
        .await
        {
            Ok(Ok(sent)) => sent,
            Ok(Err(cause)) if is_unknown_resource(&cause) => {
                return Err(DiscordError::ChannelNotFound {
                    channel_id: channel,
                    cause: Some(cause),
                });
            }
            Ok(Err(cause)) => {
                return Err(DiscordError::MessageSendFailed {
                    destination: format!("channel {channel}"),
                    cause,
                });
            }
            Err(_) => {
                return Err(DiscordError::Timeout {
                    operation: "send message",
                    timeout: self.policy.timeout,
                });
            }
        };
        debug!(channel, message = sent.id.get(), "message sent");
        Ok(sent.id.get())
    }

    async fn edit_embed(&self, channel: u64, message: u64, embed: CreateEmbed) -> Result<()> {
        let channel_id = serenity_channel(channel)?;
        if message == 0 {
            return Err(DiscordError::MessageNotFound {
                channel_id: channel,
                message_id: 0,
                cause: serenity::Error::Other("message id 0 is never valid"),
            });
        }
        let edit = channel_id.edit_message(
            &self.http,
            MessageId::new(message),
            EditMessage::new().embed(embed),
        );
        match with_timeout("edit message", self.policy.timeout, edit).await {
            Ok(_) => Ok(()),
            Err(DiscordError::TransientNetwork { cause, .. }) if is_unknown_resource(&cause) => {
                Err(DiscordError::MessageNotFound {
                    channel_id: channel,
                    message_id: message,
                    cause,
                })
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform() -> SerenityPlatform {
        SerenityPlatform::new(Arc::new(Http::new("")), NetworkPolicy::default())
    }

    #[tokio::test]
    async fn test_zero_user_is_not_found() {
        let error = platform().user_tag(UserId(0)).await.unwrap_err();
        assert!(matches!(error, DiscordError::UserNotFound { user_id: 0, .. }));
    }

    #[tokio::test]
    async fn test_zero_channel_is_not_found() {
        let error = platform()
            .send(0, CreateMessage::new().content("hello"))
            .await
            .unwrap_err();
        assert!(matches!(error, DiscordError::ChannelNotFound { channel_id: 0, .. }));

        let error = platform()
            .edit_embed(0, 5, CreateEmbed::new())
            .await
            .unwrap_err();
        assert!(error.is_not_found());
    }

    #[tokio::test]
    async fn test_zero_message_id_counts_as_deleted() {
        let error = platform()
            .edit_embed(5, 0, CreateEmbed::new())
            .await
            .unwrap_err();
        assert!(matches!(error, DiscordError::MessageNotFound { message_id: 0, .. }));
    }
}
