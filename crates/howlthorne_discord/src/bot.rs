use howlthorne_core::{BotConfig, Ledger, LedgerStore, RefreshScheduler};
use serenity::{
    Client,
    all::{GatewayIntents, ShardManager},
};
use std::sync::Arc;
use tracing::info;

use crate::error::{DiscordError, Result};
use crate::handler::Handler;
use crate::helpers::NetworkPolicy;
use crate::platform::SerenityPlatform;
use crate::publisher::LeaderboardPublisher;

/// Gateway intents the prefix commands and slot menus need.
pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT
}

/// A connected-but-not-started bot with its ledger and refresh scheduler.
pub struct HowlthorneBot {
    client: Client,
    ledger: Arc<Ledger>,
    scheduler: Arc<RefreshScheduler>,
}

/// Stops the bot from outside the gateway loop.
#[derive(Clone)]
pub struct ShutdownHandle {
    scheduler: Arc<RefreshScheduler>,
    shards: Arc<ShardManager>,
}

impl ShutdownHandle {
    /// Drops any pending refresh, then closes every shard.
    pub async fn shutdown(&self) {
        self.scheduler.shutdown();
        self.shards.shutdown_all().await;
        info!("all shards shut down");
    }
}

impl HowlthorneBot {
    /// Loads the ledger from disk and wires the client, the leaderboard
    /// publisher and the scheduler together.
    pub async fn build(config: BotConfig) -> Result<Self> {
        let config = Arc::new(config);
        let ledger = Arc::new(Ledger::load(LedgerStore::new(&config.storage)).await?);
        info!(
            entries = ledger.len(),
            data_dir = %config.storage.data_dir.display(),
            "ledger loaded"
        );

        let handler = Handler::new(ledger.clone(), config.clone());
        let client = Client::builder(&config.discord.token, intents())
            .event_handler(handler)
            .await
            .map_err(|cause| DiscordError::client_build_failed(cause, &config.discord.token))?;

        let platform = SerenityPlatform::new(client.http.clone(), NetworkPolicy::from(&config.network));
        let publisher = LeaderboardPublisher::new(
            ledger.clone(),
            Arc::new(platform),
            config.channels.clone(),
            config.leaderboard.size,
        );
        let scheduler = Arc::new(RefreshScheduler::new(
            config.leaderboard.quiet_period(),
            Arc::new(publisher),
        ));
        ledger.attach_scheduler(&scheduler);

        Ok(Self {
            client,
            ledger,
            scheduler,
        })
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            scheduler: self.scheduler.clone(),
            shards: self.client.shard_manager.clone(),
        }
    }

    /// Runs the gateway until every shard stops.
    pub async fn run(mut self) -> Result<()> {
        info!("Starting Discord bot...");
        self.client
            .start()
            .await
            .map_err(|cause| DiscordError::GatewayFailed { cause })?;
        self.scheduler.shutdown();
        info!("Discord bot stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intents_cover_message_content() {
        let intents = intents();
        assert!(intents.contains(GatewayIntents::MESSAGE_CONTENT));
        assert!(intents.contains(GatewayIntents::GUILD_MESSAGES));
        assert!(!intents.contains(GatewayIntents::DIRECT_MESSAGES));
    }
}
