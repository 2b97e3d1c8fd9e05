//! Howlthorne Discord - Bot Surface
//!
//! Prefix commands, the `mystats` slot menu and the self-updating standings
//! message, all on top of the ledger in `howlthorne-core`.

pub mod bot;
pub mod command;
pub mod embeds;
pub mod error;
pub mod handler;
pub mod helpers;
pub mod platform;
pub mod publisher;

pub use bot::{HowlthorneBot, ShutdownHandle};
pub use command::{Command, CommandKind, Invocation};
pub use error::{DiscordError, Result};
pub use handler::Handler;
pub use helpers::NetworkPolicy;
pub use platform::{ChatPlatform, SerenityPlatform};
pub use publisher::LeaderboardPublisher;

// Re-export serenity for convenience
pub use serenity;
