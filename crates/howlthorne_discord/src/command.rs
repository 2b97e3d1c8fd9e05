//! Prefix command parsing.
//!
//! A message is split on whitespace after the prefix; the first word picks
//! the command (case-insensitive) and the rest are its arguments. Anything
//! that is not a known command word yields `None` and is ignored.

use howlthorne_core::{ClassId, LedgerKey, Slot, UserId, ValidationError, parse_amount};

use crate::error::DiscordError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Help,
    GivePoints,
    TakePoints,
    RemoveUser,
    Diagnostic,
    RenameSlot,
    Progress,
    Leaderboard,
    ClassInfo,
    MyStats,
}

impl CommandKind {
    pub fn from_word(word: &str) -> Option<Self> {
        let kind = match word.to_lowercase().as_str() {
            "help" => Self::Help,
            "givepoints" => Self::GivePoints,
            "takepoints" => Self::TakePoints,
            "removeuser" => Self::RemoveUser,
            "diagnostic" => Self::Diagnostic,
            "renameslot" => Self::RenameSlot,
            "progress" => Self::Progress,
            "leaderboard" => Self::Leaderboard,
            "classinfo" => Self::ClassInfo,
            "mystats" => Self::MyStats,
            _ => return None,
        };
        Some(kind)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::GivePoints => "givepoints",
            Self::TakePoints => "takepoints",
            Self::RemoveUser => "removeuser",
            Self::Diagnostic => "diagnostic",
            Self::RenameSlot => "renameslot",
            Self::Progress => "progress",
            Self::Leaderboard => "leaderboard",
            Self::ClassInfo => "classinfo",
            Self::MyStats => "mystats",
        }
    }

    /// Commands only staff may run.
    pub fn requires_elevation(&self) -> bool {
        matches!(
            self,
            Self::GivePoints | Self::TakePoints | Self::RemoveUser | Self::Diagnostic
        )
    }

    /// Reply sent to someone without the needed permission.
    pub fn denied_reply(&self) -> &'static str {
        match self {
            Self::GivePoints => "🚫 You don't have permission to give points.",
            Self::TakePoints => "🚫 You don't have permission to take points.",
            Self::RemoveUser => {
                "🚫 You don't have permission to remove users from the leaderboard."
            }
            Self::Diagnostic => "🚫 You don't have permission to use diagnostic commands.",
            _ => "🚫 You don't have permission to do that.",
        }
    }

    /// Usage hint shown when arguments don't parse.
    pub fn usage(&self, prefix: &str) -> String {
        match self {
            Self::Help => format!("ℹ️ Usage: `{prefix}help`"),
            Self::GivePoints => {
                format!("ℹ️ Usage: `{prefix}givepoints @user <slot 1-3> <class> <amount>`")
            }
            Self::TakePoints => {
                format!("ℹ️ Usage: `{prefix}takepoints @user <slot 1-3> <class> <amount>`")
            }
            Self::RemoveUser => format!("ℹ️ Usage: `{prefix}removeuser @user`"),
            Self::Diagnostic => format!("ℹ️ Usage: `{prefix}diagnostic @user`"),
            Self::RenameSlot => format!("ℹ️ Usage: `{prefix}renameslot <slot 1-3> <new name>`"),
            Self::Progress => format!("ℹ️ Usage: `{prefix}progress [@user] <slot 1-3>`"),
            Self::Leaderboard => format!(
                "ℹ️ Invalid class. Use `{prefix}classinfo <class>` for valid options."
            ),
            Self::ClassInfo => format!(
                "ℹ️ Invalid class. Options: {}",
                ClassId::names().join(", ")
            ),
            Self::MyStats => format!("ℹ️ Usage: `{prefix}mystats [@user]`"),
        }
    }
}

/// A fully validated command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    GivePoints {
        key: LedgerKey,
        class: ClassId,
        amount: u32,
    },
    TakePoints {
        key: LedgerKey,
        class: ClassId,
        amount: u32,
    },
    RemoveUser {
        target: UserId,
    },
    Diagnostic {
        target: UserId,
    },
    RenameSlot {
        slot: Slot,
        name: String,
    },
    Progress {
        target: Option<UserId>,
        slot: Slot,
    },
    Leaderboard {
        class: ClassId,
    },
    ClassInfo {
        class: ClassId,
    },
    MyStats {
        target: Option<UserId>,
    },
}

/// Why the arguments were rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    Missing(&'static str),
    NotAMention(String),
    Invalid(ValidationError),
}

impl From<ValidationError> for ArgumentError {
    fn from(e: ValidationError) -> Self {
        Self::Invalid(e)
    }
}

/// Result of reading one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub kind: CommandKind,
    pub raw: String,
    pub parsed: Result<Command, ArgumentError>,
}

impl Invocation {
    /// The validated command, or a syntax diagnostic carrying the usage line.
    pub fn into_command(self, prefix: &str) -> Result<Command, DiscordError> {
        self.parsed.map_err(|reason| {
            tracing::debug!(command = self.kind.name(), ?reason, "rejected arguments");
            DiscordError::invalid_command(self.kind.name(), self.raw, self.kind.usage(prefix))
        })
    }
}

/// Reads a message. `None` means it isn't addressed to the bot.
pub fn parse(content: &str, prefix: &str) -> Option<Invocation> {
    let body = content.strip_prefix(prefix)?;
    let mut words = body.split_whitespace();
    let kind = CommandKind::from_word(words.next()?)?;
    let args: Vec<&str> = words.collect();

    Some(Invocation {
        kind,
        raw: content.to_string(),
        parsed: parse_args(kind, &args),
    })
}

fn parse_args(kind: CommandKind, args: &[&str]) -> Result<Command, ArgumentError> {
    let command = match kind {
        CommandKind::Help => Command::Help,
        CommandKind::GivePoints | CommandKind::TakePoints => {
            let target = mention_arg(args.first().copied())?;
            let slot: Slot = required(args.get(1), "slot")?.parse()?;
            let class: ClassId = required(args.get(2), "class")?.parse()?;
            let amount = parse_amount(required(args.get(3), "amount")?)?;
            let key = LedgerKey::new(target, slot);
            if kind == CommandKind::GivePoints {
                Command::GivePoints { key, class, amount }
            } else {
                Command::TakePoints { key, class, amount }
            }
        }
        CommandKind::RemoveUser => Command::RemoveUser {
            target: mention_arg(args.first().copied())?,
        },
        CommandKind::Diagnostic => Command::Diagnostic {
            target: mention_arg(args.first().copied())?,
        },
        CommandKind::RenameSlot => {
            let slot: Slot = required(args.first(), "slot")?.parse()?;
            let name = args.get(1..).unwrap_or_default().join(" ");
            if name.trim().is_empty() {
                return Err(ValidationError::EmptySlotName.into());
            }
            Command::RenameSlot { slot, name }
        }
        CommandKind::Progress => {
            let (target, rest) = match args.first().and_then(|a| parse_mention(a)) {
                Some(user) => (Some(user), &args[1..]),
                None => (None, args),
            };
            let slot: Slot = required(rest.first(), "slot")?.parse()?;
            Command::Progress { target, slot }
        }
        CommandKind::Leaderboard => Command::Leaderboard {
            class: required(args.first(), "class")?.parse()?,
        },
        CommandKind::ClassInfo => Command::ClassInfo {
            class: required(args.first(), "class")?.parse()?,
        },
        CommandKind::MyStats => match args.first() {
            None => Command::MyStats { target: None },
            Some(arg) => Command::MyStats {
                target: Some(
                    parse_mention(arg).ok_or_else(|| ArgumentError::NotAMention(arg.to_string()))?,
                ),
            },
        },
    };
    Ok(command)
}

fn required<'a>(arg: Option<&&'a str>, what: &'static str) -> Result<&'a str, ArgumentError> {
    arg.copied().ok_or(ArgumentError::Missing(what))
}

fn mention_arg(arg: Option<&str>) -> Result<UserId, ArgumentError> {
    let arg = arg.ok_or(ArgumentError::Missing("user"))?;
    parse_mention(arg).ok_or_else(|| ArgumentError::NotAMention(arg.to_string()))
}

/// Parses `<@id>` or `<@!id>`.
pub fn parse_mention(token: &str) -> Option<UserId> {
    let inner = token.strip_prefix("<@")?.strip_suffix('>')?;
    let digits = inner.strip_prefix('!').unwrap_or(inner);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<UserId>().ok()
}
