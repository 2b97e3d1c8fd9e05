//! Configuration loading.
//!
//! Values come from a TOML file when one exists, then environment variables
//! override individual fields. With no file the whole config is built from
//! the environment.

use serde::{Deserialize, Serialize};
use std::{env, path::Path, path::PathBuf, time::Duration};

use crate::error::{CoreError, Result};
use crate::id::UserId;

/// Main configuration for the bot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub leaderboard: LeaderboardConfig,
    #[serde(default)]
    pub announcements: AnnouncementConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Discord bot token
    #[serde(default)]
    pub token: String,
    /// Command prefix for text commands
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Users treated as admins regardless of their guild permissions
    #[serde(default)]
    pub admin_users: Vec<u64>,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            prefix: default_prefix(),
            admin_users: Vec::new(),
        }
    }
}

impl DiscordConfig {
    pub fn is_admin(&self, user: UserId) -> bool {
        self.admin_users.contains(&user.get())
    }
}

/// Channels the bot posts to on its own. Anything left unset is skipped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelsConfig {
    /// Where the global standings message lives
    #[serde(default)]
    pub leaderboard: Option<u64>,
    /// Where new champions are announced
    #[serde(default)]
    pub champion: Option<u64>,
    /// Where awards, deductions and removals are announced
    #[serde(default)]
    pub announcements: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_progress_file")]
    pub progress_file: String,
    #[serde(default = "default_slot_names_file")]
    pub slot_names_file: String,
    #[serde(default = "default_leaderboard_message_file")]
    pub leaderboard_message_file: String,
    #[serde(default = "default_champion_file")]
    pub champion_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            progress_file: default_progress_file(),
            slot_names_file: default_slot_names_file(),
            leaderboard_message_file: default_leaderboard_message_file(),
            champion_file: default_champion_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardConfig {
    /// Quiet period between the first mutation and the refresh
    #[serde(default = "default_quiet_period_secs")]
    pub quiet_period_secs: u64,
    /// Number of ranks shown
    #[serde(default = "default_leaderboard_size")]
    pub size: usize,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            quiet_period_secs: default_quiet_period_secs(),
            size: default_leaderboard_size(),
        }
    }
}

impl LeaderboardConfig {
    pub fn quiet_period(&self) -> Duration {
        Duration::from_secs(self.quiet_period_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnouncementConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Smallest grant that gets announced
    #[serde(default = "default_min_give_amount")]
    pub min_give_amount: u32,
    /// Smallest deduction that gets announced
    #[serde(default = "default_min_take_amount")]
    pub min_take_amount: u32,
}

impl Default for AnnouncementConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_give_amount: default_min_give_amount(),
            min_take_amount: default_min_take_amount(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Upper bound on any single call to the Discord API
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Attempts made for idempotent lookups such as fetching a user
    #[serde(default = "default_user_fetch_attempts")]
    pub user_fetch_attempts: u32,
    /// First retry delay; doubles on every further attempt
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            user_fetch_attempts: default_user_fetch_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl NetworkConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for the daily rolling log file
    #[serde(default = "default_log_directory")]
    pub directory: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
        }
    }
}

fn default_prefix() -> String {
    "!".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_progress_file() -> String {
    "progress.json".to_string()
}

fn default_slot_names_file() -> String {
    "slotNames.json".to_string()
}

fn default_leaderboard_message_file() -> String {
    "leaderboardMessage.json".to_string()
}

fn default_champion_file() -> String {
    "firstPlace.json".to_string()
}

fn default_quiet_period_secs() -> u64 {
    15
}

fn default_leaderboard_size() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_min_give_amount() -> u32 {
    5
}

fn default_min_take_amount() -> u32 {
    3
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_user_fetch_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    250
}

fn default_log_directory() -> PathBuf {
    PathBuf::from("logs")
}

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "HOWLTHORNE_CONFIG";
/// Config file used when nothing else is specified
pub const DEFAULT_CONFIG_PATH: &str = "howlthorne.toml";

impl BotConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.discord.token.trim().is_empty() {
            return Err(CoreError::config_invalid(
                "discord.token",
                "Set DISCORD_TOKEN or discord.token in the config file",
            ));
        }

        if self.discord.prefix.trim().is_empty() {
            return Err(CoreError::config_invalid(
                "discord.prefix",
                "The command prefix cannot be empty",
            ));
        }

        if self.leaderboard.quiet_period_secs == 0 {
            return Err(CoreError::config_invalid(
                "leaderboard.quiet_period_secs",
                "Use at least one second so bursts of changes are coalesced",
            ));
        }

        if self.leaderboard.size == 0 {
            return Err(CoreError::config_invalid(
                "leaderboard.size",
                "The leaderboard must show at least one rank",
            ));
        }

        for (field, channel) in [
            ("channels.leaderboard", self.channels.leaderboard),
            ("channels.champion", self.channels.champion),
            ("channels.announcements", self.channels.announcements),
        ] {
            if channel == Some(0) {
                return Err(CoreError::config_invalid(
                    field,
                    "Channel ids are never 0; remove the entry to disable this channel",
                ));
            }
        }

        if self.network.request_timeout_secs == 0 {
            return Err(CoreError::config_invalid(
                "network.request_timeout_secs",
                "A zero timeout would fail every Discord call",
            ));
        }

        Ok(())
    }

    /// Load configuration from the given path, `HOWLTHORNE_CONFIG`, or
    /// `howlthorne.toml`, falling back to environment variables only.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(
                env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string()),
            ),
        };

        if config_path.exists() {
            let contents =
                std::fs::read_to_string(&config_path).map_err(|cause| CoreError::ConfigNotFound {
                    path: config_path.display().to_string(),
                    cause,
                })?;
            let config = Self::from_toml(&contents, &config_path)?;
            Ok(config.override_from_env())
        } else {
            Ok(Self::from_env())
        }
    }

    pub fn from_toml(contents: &str, origin: &Path) -> Result<Self> {
        toml::from_str(contents).map_err(|cause| CoreError::ConfigParseFailed {
            path: origin.display().to_string(),
            cause,
        })
    }

    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self::default().override_from_env()
    }

    /// Override config values with environment variables
    fn override_from_env(mut self) -> Self {
        if let Ok(token) = env::var("DISCORD_TOKEN") {
            self.discord.token = token;
        }
        if let Ok(prefix) = env::var("HOWLTHORNE_PREFIX") {
            self.discord.prefix = prefix;
        }
        if let Ok(admins) = env::var("HOWLTHORNE_ADMIN_USERS") {
            self.discord.admin_users = admins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
        }

        if let Ok(dir) = env::var("HOWLTHORNE_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }

        if let Some(id) = env_id("LEADERBOARD_CHANNEL_ID") {
            self.channels.leaderboard = Some(id);
        }
        if let Some(id) = env_id("CHAMPION_CHANNEL_ID") {
            self.channels.champion = Some(id);
        }
        if let Some(id) = env_id("ANNOUNCEMENTS_CHANNEL_ID") {
            self.channels.announcements = Some(id);
        }

        self
    }
}

fn env_id(name: &str) -> Option<u64> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Helper to load dotenv file if it exists
pub fn load_dotenv() {
    if let Ok(path) = env::var("DOTENV_PATH") {
        dotenvy::from_path(&path).ok();
    } else {
        dotenvy::dotenv().ok();
    }
}
