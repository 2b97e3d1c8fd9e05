use howlthorne_core::{
    BotConfig, CoreError, Ledger, LedgerKey, Slot, UserId,
    config::AnnouncementConfig,
    standings::class_leaderboard,
};
use serenity::{
    all::{
        ComponentInteraction, ComponentInteractionDataKind, CreateInteractionResponse,
        CreateInteractionResponseMessage, CreateMessage, Interaction,
    },
    async_trait,
    client::{Context, EventHandler},
    model::{channel::Message, gateway::Ready},
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::command::{self, Command, CommandKind};
use crate::embeds;
use crate::error::{DiscordError, Result};
use crate::helpers::{NetworkPolicy, has_elevated_permission, with_timeout};
use crate::platform::{ChatPlatform, SerenityPlatform};

/// Gateway event handler: prefix commands and the `mystats` slot menu.
pub struct Handler {
    ledger: Arc<Ledger>,
    config: Arc<BotConfig>,
    policy: NetworkPolicy,
}

impl Handler {
    pub fn new(ledger: Arc<Ledger>, config: Arc<BotConfig>) -> Self {
        let policy = NetworkPolicy::from(&config.network);
        Self {
            ledger,
            config,
            policy,
        }
    }

    fn prefix(&self) -> &str {
        &self.config.discord.prefix
    }

    fn platform(&self, ctx: &Context) -> SerenityPlatform {
        SerenityPlatform::new(ctx.http.clone(), self.policy)
    }

    async fn tag_of(&self, ctx: &Context, user: UserId) -> String {
        match self.platform(ctx).user_tag(user).await {
            Ok(tag) => tag,
            Err(e) => {
                warn!(%user, error = %e, "could not resolve user");
                embeds::unknown_user(user)
            }
        }
    }

    async fn run(&self, ctx: &Context, msg: &Message, invocation: command::Invocation) -> Result<()> {
        let kind = invocation.kind;
        if kind.requires_elevation()
            && !has_elevated_permission(ctx, msg, &self.config.discord.admin_users, &self.policy)
                .await
        {
            return Err(DiscordError::PermissionDenied {
                user_id: msg.author.id.get(),
                command: kind.name().to_string(),
                required_permission: "MANAGE_ROLES".to_string(),
            });
        }

        let command = invocation.into_command(self.prefix())?;
        let author = UserId(msg.author.id.get());
        info!(command = kind.name(), %author, "running command");

        match command {
            Command::Help => {
                self.send_embed(ctx, msg, embeds::help(self.prefix())).await
            }
            Command::GivePoints { key, class, amount } => {
                let change = self.ledger.grant(key, class, amount).await?;
                self.send_embed(ctx, msg, embeds::grant_reply(&change, amount))
                    .await?;
                if should_announce(kind, amount, &self.config.announcements) {
                    self.announce(ctx, embeds::award_announcement(&change, amount))
                        .await;
                }
                Ok(())
            }
            Command::TakePoints { key, class, amount } => {
                let change = self.ledger.deduct(key, class, amount).await?;
                self.send_embed(ctx, msg, embeds::deduct_reply(&change, amount))
                    .await?;
                if should_announce(kind, amount, &self.config.announcements) {
                    self.announce(ctx, embeds::deduction_announcement(&change, amount))
                        .await;
                }
                Ok(())
            }
            Command::RemoveUser { target } => {
                let summary = self.ledger.remove_user(target).await?;
                let target_tag = self.tag_of(ctx, target).await;
                if summary.is_empty() {
                    return self
                        .reply(ctx, msg, &embeds::nothing_to_remove(&target_tag))
                        .await;
                }

                let actor_tag = msg.author.tag();
                self.send_embed(
                    ctx,
                    msg,
                    embeds::removal_reply(&summary, &target_tag, &actor_tag),
                )
                .await?;
                if should_announce(kind, 0, &self.config.announcements) {
                    self.announce(
                        ctx,
                        embeds::removal_announcement(&summary, &target_tag, &actor_tag),
                    )
                    .await;
                }
                Ok(())
            }
            Command::Diagnostic { target } => {
                let entries = self.ledger.user_entries(target);
                let target_tag = self.tag_of(ctx, target).await;
                for line in embeds::diagnostic_keys(target, &entries) {
                    info!(user = %target, entry = %line, "ledger entry");
                }
                self.reply(ctx, msg, &embeds::diagnostic_summary(&target_tag, &entries))
                    .await
            }
            Command::RenameSlot { slot, name } => {
                let name = self
                    .ledger
                    .rename_slot(LedgerKey::new(author, slot), &name)
                    .await?;
                self.send_embed(ctx, msg, embeds::rename_reply(slot, &name))
                    .await
            }
            Command::Progress { target, slot } => {
                let user = target.unwrap_or(author);
                let username = self.display_name(ctx, msg, user).await;
                let key = LedgerKey::new(user, slot);
                let profile = self.ledger.query_profile(key);
                if !embeds::has_points(&profile) {
                    return self
                        .reply(ctx, msg, &embeds::no_points_in_slot(&username, slot))
                        .await;
                }
                let slot_name = self.ledger.slot_display_name(key);
                self.send_embed(ctx, msg, embeds::progress(&username, &slot_name, &profile))
                    .await
            }
            Command::Leaderboard { class } => {
                let standings = class_leaderboard(&self.ledger, class, self.config.leaderboard.size);
                let platform = self.platform(ctx);
                let mut rows = Vec::with_capacity(standings.len());
                for standing in standings {
                    let name = platform.user_tag(standing.key.user).await.ok();
                    rows.push((standing, name));
                }
                self.send_embed(ctx, msg, embeds::class_leaderboard(class, &rows))
                    .await
            }
            Command::ClassInfo { class } => {
                self.send_embed(ctx, msg, embeds::class_info(class)).await
            }
            Command::MyStats { target } => {
                let user = target.unwrap_or(author);
                let username = self.display_name(ctx, msg, user).await;
                let names: Vec<(Slot, String)> = Slot::ALL
                    .iter()
                    .map(|slot| {
                        (*slot, self.ledger.slot_display_name(LedgerKey::new(user, *slot)))
                    })
                    .collect();
                let message = CreateMessage::new()
                    .embed(embeds::grimoire(&username))
                    .components(vec![embeds::slot_menu(user, &names)]);
                self.send(ctx, msg, message).await
            }
        }
    }

    async fn display_name(&self, ctx: &Context, msg: &Message, user: UserId) -> String {
        if user.get() == msg.author.id.get() {
            msg.author.name.clone()
        } else {
            self.tag_of(ctx, user).await
        }
    }

    async fn send(&self, ctx: &Context, msg: &Message, message: CreateMessage) -> Result<()> {
        with_timeout(
            "send reply",
            self.policy.timeout,
            msg.channel_id.send_message(&ctx.http, message),
        )
        .await?;
        Ok(())
    }

    async fn send_embed(
        &self,
        ctx: &Context,
        msg: &Message,
        embed: serenity::all::CreateEmbed,
    ) -> Result<()> {
        self.send(ctx, msg, CreateMessage::new().embed(embed)).await
    }

    async fn reply(&self, ctx: &Context, msg: &Message, content: &str) -> Result<()> {
        with_timeout("reply", self.policy.timeout, msg.reply(&ctx.http, content)).await?;
        Ok(())
    }

    /// Posts to the announcements channel. Failures are logged only.
    async fn announce(&self, ctx: &Context, message: CreateMessage) {
        let Some(channel) = self.config.channels.announcements else {
            debug!("no announcements channel configured");
            return;
        };
        if let Err(e) = self.platform(ctx).send(channel, message).await {
            warn!(channel, error = %e, "announcement failed");
        }
    }

    /// Turns a failed command into a reply. Nothing here rolls back ledger
    /// changes that already reached disk.
    async fn report(&self, ctx: &Context, msg: &Message, kind: CommandKind, error: DiscordError) {
        match &error {
            DiscordError::PermissionDenied { user_id, .. } => {
                info!(user = user_id, command = kind.name(), "permission denied");
            }
            DiscordError::InvalidCommandSyntax { .. }
            | DiscordError::Core(CoreError::Validation(_)) => {
                debug!(command = kind.name(), error = %error, "invalid input");
            }
            DiscordError::Core(core) if core.is_persistence() => {
                error!(command = kind.name(), error = ?core, "failed to persist ledger");
            }
            other => {
                error!(command = kind.name(), error = ?other, "command failed");
            }
        }

        let reply = reply_for(&error, kind, self.prefix());
        if let Err(e) = self.reply(ctx, msg, &reply).await {
            warn!(command = kind.name(), error = %e, "could not deliver error reply");
        }
    }

    async fn select_slot(
        &self,
        ctx: &Context,
        component: &ComponentInteraction,
        owner: UserId,
    ) -> Result<()> {
        if component.user.id.get() != owner.get() {
            let refusal = CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(embeds::RECORD_REFUSAL)
                    .ephemeral(true),
            );
            return with_timeout(
                "refuse slot menu",
                self.policy.timeout,
                component.create_response(&ctx.http, refusal),
            )
            .await;
        }

        let ComponentInteractionDataKind::StringSelect { values } = &component.data.kind else {
            return Ok(());
        };
        let Some(slot) = values.first().and_then(|v| v.parse::<Slot>().ok()) else {
            warn!(values = ?values, "slot menu sent an unknown option");
            return Ok(());
        };

        let key = LedgerKey::new(owner, slot);
        let profile = self.ledger.query_profile(key);
        let embed = if embeds::has_points(&profile) {
            embeds::progress(
                &component.user.name,
                &self.ledger.slot_display_name(key),
                &profile,
            )
        } else {
            embeds::nothing_yet(slot)
        };

        let update = CreateInteractionResponse::UpdateMessage(
            CreateInteractionResponseMessage::new()
                .embed(embed)
                .components(vec![]),
        );
        with_timeout(
            "show slot record",
            self.policy.timeout,
            component.create_response(&ctx.http, update),
        )
        .await
    }
}

/// Whether a successful command posts to the announcements channel.
/// Removals are always announced; grants and deductions only from their
/// configured amount upwards.
pub fn should_announce(kind: CommandKind, amount: u32, config: &AnnouncementConfig) -> bool {
    if !config.enabled {
        return false;
    }
    match kind {
        CommandKind::GivePoints => amount >= config.min_give_amount,
        CommandKind::TakePoints => amount >= config.min_take_amount,
        CommandKind::RemoveUser => true,
        _ => false,
    }
}

/// Reply shown to the author when `kind` failed with `error`.
pub fn reply_for(error: &DiscordError, kind: CommandKind, prefix: &str) -> String {
    match error {
        DiscordError::PermissionDenied { .. } => kind.denied_reply().to_string(),
        DiscordError::InvalidCommandSyntax {
            expected_format, ..
        } => expected_format.clone(),
        DiscordError::Core(CoreError::Validation(_)) => kind.usage(prefix),
        DiscordError::Core(core) if core.is_persistence() => embeds::SAVE_FAILURE.to_string(),
        _ => embeds::GENERIC_FAILURE.to_string(),
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            user = %ready.user.name,
            guilds = ready.guilds.len(),
            entries = self.ledger.len(),
            "connected to Discord"
        );
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        let Some(invocation) = command::parse(&msg.content, self.prefix()) else {
            return;
        };

        let kind = invocation.kind;
        if let Err(e) = self.run(&ctx, &msg, invocation).await {
            self.report(&ctx, &msg, kind, e).await;
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Component(component) = interaction else {
            return;
        };
        let Some(owner) = embeds::parse_slot_menu_id(&component.data.custom_id) else {
            return;
        };

        if let Err(e) = self.select_slot(&ctx, &component, owner).await {
            error!(%owner, error = %e, "slot menu interaction failed");
        }
    }
}
