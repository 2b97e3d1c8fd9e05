use howlthorne_core::config::NetworkConfig;
use serenity::{
    client::Context,
    http::HttpError,
    model::{
        channel::{Channel, Message},
        permissions::Permissions,
    },
};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{DiscordError, Result};

/// Timeout and retry settings for calls to Discord.
#[derive(Debug, Clone, Copy)]
pub struct NetworkPolicy {
    pub timeout: Duration,
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for NetworkPolicy {
    fn default() -> Self {
        Self::from(&NetworkConfig::default())
    }
}

impl From<&NetworkConfig> for NetworkPolicy {
    fn from(config: &NetworkConfig) -> Self {
        Self {
            timeout: config.request_timeout(),
            attempts: config.user_fetch_attempts.max(1),
            backoff: config.retry_backoff(),
        }
    }
}

/// Runs one Discord call under `limit`. Hangs become [`DiscordError::Timeout`],
/// failures [`DiscordError::TransientNetwork`].
pub async fn with_timeout<T, F>(operation: &'static str, limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = serenity::Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(cause)) => Err(DiscordError::TransientNetwork { operation, cause }),
        Err(_) => Err(DiscordError::Timeout {
            operation,
            timeout: limit,
        }),
    }
}

/// Retries transient failures with exponential backoff. Anything else is
/// returned straight away.
pub async fn with_retry<T, F, Fut>(
    operation: &'static str,
    policy: &NetworkPolicy,
    mut call: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut delay = policy.backoff;
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.attempts => {
                warn!(
                    operation,
                    attempt,
                    retry_in_ms = delay.as_millis() as u64,
                    error = %e,
                    "Discord call failed, retrying"
                );
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// True when Discord answered 404 for the resource.
pub fn is_unknown_resource(error: &serenity::Error) -> bool {
    match error {
        serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) => {
            response.status_code.as_u16() == 404
        }
        _ => false,
    }
}

/// Whether the author may run staff commands: listed as an admin, or holding
/// Manage Roles in the channel.
pub async fn has_elevated_permission(
    ctx: &Context,
    msg: &Message,
    admin_users: &[u64],
    policy: &NetworkPolicy,
) -> bool {
    if admin_users.contains(&msg.author.id.get()) {
        debug!(user = %msg.author.id, "configured admin");
        return true;
    }

    let Some(guild_id) = msg.guild_id else {
        // No roles outside a guild
        return false;
    };

    let channel = match with_timeout(
        "fetch channel",
        policy.timeout,
        msg.channel_id.to_channel(ctx),
    )
    .await
    {
        Ok(Channel::Guild(channel)) => channel,
        Ok(_) => return false,
        Err(e) => {
            warn!(channel = %msg.channel_id, error = %e, "failed to get channel info");
            return false;
        }
    };

    let guild = match with_timeout("fetch guild", policy.timeout, ctx.http.get_guild(guild_id)).await
    {
        Ok(guild) => guild,
        Err(e) => {
            warn!(guild = %guild_id, error = %e, "failed to get guild");
            return false;
        }
    };

    let member = match with_timeout(
        "fetch member",
        policy.timeout,
        guild.member(&ctx.http, msg.author.id),
    )
    .await
    {
        Ok(member) => member,
        Err(e) => {
            warn!(user = %msg.author.id, error = %e, "failed to get guild member");
            return false;
        }
    };

    let permissions = guild.user_permissions_in(&channel, &member);
    let allowed = permissions.contains(Permissions::MANAGE_ROLES);
    if !allowed {
        info!(
            user = %msg.author.id,
            channel = %msg.channel_id,
            ?permissions,
            "lacks MANAGE_ROLES"
        );
    }
    allowed
}
