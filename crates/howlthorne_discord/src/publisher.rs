//! Keeps the standings message and the champion announcement current.

use async_trait::async_trait;
use howlthorne_core::{
    ChampionChange, CoreError, Ledger, RefreshTarget, Standing, UserId,
    config::ChannelsConfig,
    standings::{compute_standings, detect_champion_change},
    store::LeaderboardMessageDocument,
};
use serenity::all::{CreateEmbed, CreateMessage};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::embeds;
use crate::error::{DiscordError, Result};
use crate::platform::ChatPlatform;

pub struct LeaderboardPublisher {
    ledger: Arc<Ledger>,
    platform: Arc<dyn ChatPlatform>,
    channels: ChannelsConfig,
    size: usize,
}

impl LeaderboardPublisher {
    pub fn new(
        ledger: Arc<Ledger>,
        platform: Arc<dyn ChatPlatform>,
        channels: ChannelsConfig,
        size: usize,
    ) -> Self {
        Self {
            ledger,
            platform,
            channels,
            size,
        }
    }

    /// One refresh pass. The champion record is updated even when no
    /// channel is configured, so a later announcement never repeats.
    pub async fn publish(&self) -> Result<ChampionChange> {
        let standings = compute_standings(&self.ledger, self.size);
        let change = detect_champion_change(&self.ledger, &standings).await?;

        match self.channels.leaderboard {
            Some(channel) => {
                let rows = self.tag_rows(&standings).await;
                self.post_standings(channel, embeds::standings(&rows)).await?;
            }
            None => debug!("no leaderboard channel configured, skipping standings"),
        }

        if let ChampionChange::NewChampion(user) = change {
            self.announce_champion(user).await;
        }
        Ok(change)
    }

    async fn tag_rows(&self, standings: &[Standing]) -> Vec<(Standing, String)> {
        let mut rows = Vec::with_capacity(standings.len());
        for standing in standings {
            let tag = match self.platform.user_tag(standing.user).await {
                Ok(tag) => tag,
                Err(e) => {
                    warn!(user = %standing.user, error = %e, "could not resolve user for standings");
                    embeds::unknown_user(standing.user)
                }
            };
            rows.push((*standing, tag));
        }
        rows
    }

    /// Edits the cached message, or sends a fresh one when there is none or
    /// Discord no longer has it.
    async fn post_standings(&self, channel: u64, embed: CreateEmbed) -> Result<()> {
        let document = &self.ledger.store().leaderboard_message;
        let cached = match document.load().await {
            Ok(doc) => doc.and_then(|d| d.message_id.parse::<u64>().ok()),
            Err(e) => {
                warn!(error = %e, "leaderboard message id unreadable, sending a new message");
                None
            }
        };

        if let Some(message) = cached {
            match self.platform.edit_embed(channel, message, embed.clone()).await {
                Ok(()) => {
                    debug!(channel, message, "standings message edited");
                    return Ok(());
                }
                Err(DiscordError::MessageNotFound { .. }) => {
                    info!(channel, message, "standings message is gone, sending a new one");
                }
                Err(e) => return Err(e),
            }
        }

        let sent = self
            .platform
            .send(channel, CreateMessage::new().embed(embed))
            .await?;
        document
            .save(&LeaderboardMessageDocument {
                message_id: sent.to_string(),
            })
            .await?;
        info!(channel, message = sent, "standings message sent");
        Ok(())
    }

    async fn announce_champion(&self, user: UserId) {
        let Some(channel) = self.channels.champion else {
            debug!(%user, "no champion channel configured, skipping announcement");
            return;
        };

        let tag = self
            .platform
            .user_tag(user)
            .await
            .unwrap_or_else(|_| embeds::unknown_user(user));
        let message = embeds::champion_announcement(&tag, embeds::random_champion_gif());
        match self.platform.send(channel, message).await {
            Ok(_) => info!(%user, channel, "champion announced"),
            Err(e) => error!(%user, channel, error = %e, "failed to announce champion"),
        }
    }
}

#[async_trait]
impl RefreshTarget for LeaderboardPublisher {
    async fn refresh(&self) -> howlthorne_core::Result<()> {
        match self.publish().await {
            Ok(_) => Ok(()),
            Err(DiscordError::Core(e)) => Err(e),
            Err(e) => Err(CoreError::refresh_failed("leaderboard could not be published", e)),
        }
    }
}
