//! Every embed and message body the bot sends.
//!
//! Builders here are pure: callers resolve user tags and ledger data first,
//! so the layouts can be checked without a Discord connection.

use howlthorne_core::{
    ClassId, ClassScore, ClassStanding, LedgerKey, MAX_POINTS, PointChange, RemovalSummary,
    Slot, Standing, UserId, class::LIBRARIAN_PORTRAIT,
};
use rand::seq::SliceRandom;
use serenity::all::{
    Colour, CreateActionRow, CreateAllowedMentions, CreateEmbed, CreateEmbedFooter, CreateMessage,
    CreateSelectMenu, CreateSelectMenuKind, CreateSelectMenuOption, ReactionType, Timestamp,
};

pub const GENERIC_FAILURE: &str =
    "⚠️ An error occurred while processing your command. Please try again.";
pub const SAVE_FAILURE: &str = "❌ Failed to save changes. Please try again.";
pub const RECORD_REFUSAL: &str = "🕯️ Only you may open your own record.";

const HEADMISTRESS_SIGNATURE: &str = "— Headmistress Delayna Morwyn ✨";
const SLOT_MENU_PREFIX: &str = "select_slot_";

/// Celebration images attached to champion announcements.
pub const CHAMPION_GIFS: [&str; 9] = [
    "https://media.giphy.com/media/KXGltmsUaqkVi/giphy.gif",
    "https://media.giphy.com/media/EizX1bK3LlD20/giphy.gif",
    "https://media.giphy.com/media/tESfFtsS3sGCk/giphy.gif",
    "https://media.giphy.com/media/mSKMcT3Xqe8s8/giphy.gif",
    "https://media.giphy.com/media/720g7C1jz13wI/giphy.gif",
    "https://media.giphy.com/media/zeeYz6iGGoaA0/giphy.gif",
    "https://media.giphy.com/media/1127pePUDTiKAg/giphy.gif",
    "https://media.giphy.com/media/3otPoTggaYFNd1FdAI/giphy.gif",
    "https://media.giphy.com/media/QaVl2PZGYsxBC/giphy.gif",
];

pub fn random_champion_gif() -> &'static str {
    CHAMPION_GIFS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(CHAMPION_GIFS[0])
}

fn mention(user: UserId) -> String {
    format!("<@{user}>")
}

pub fn help(prefix: &str) -> CreateEmbed {
    let p = prefix;
    CreateEmbed::new()
        .title("📜 Command Guide")
        .colour(Colour::new(0xc0392b))
        .field(
            "🎓 Student Commands",
            format!(
                "`{p}mystats` — View your characters in a dropdown menu.\n\
                 `{p}progress <slot>` — View your own slot's progress.\n\
                 `{p}classinfo <class>` — Learn about a class.\n\
                 `{p}renameslot <slot> <new name>` — Rename your character slot.\n\
                 `{p}leaderboard <class>` — Show the top 10 characters for a class."
            ),
            false,
        )
        .field(
            "🧙 Admin Extras",
            format!(
                "`{p}givepoints @user <slot> <class> <amount>` — Give points to a specific character slot.\n\
                 `{p}takepoints @user <slot> <class> <amount>` — Remove points from a character slot.\n\
                 `{p}removeuser @user` — Completely remove a user from the leaderboard.\n\
                 `{p}diagnostic @user` — Log a user's raw ledger entries.\n\
                 `{p}mystats @user` — View another user's slots.\n\
                 `{p}progress @user <slot>` — View another user's slot progress."
            ),
            false,
        )
        .footer(
            CreateEmbedFooter::new(format!("All classes cap at {MAX_POINTS} points. 📚"))
                .icon_url(LIBRARIAN_PORTRAIT),
        )
        .timestamp(Timestamp::now())
}

/// Reply to a grant, signed by the class mentor.
pub fn grant_reply(change: &PointChange, amount: u32) -> CreateEmbed {
    let info = change.class.info();
    CreateEmbed::new()
        .colour(info.color)
        .title(format!("{} {}", info.icon, info.name))
        .description(format!(
            "Gave **{amount} points** to {}'s slot {}.\n\
             New total: **{} / {MAX_POINTS}**\n\n*{}*",
            mention(change.key.user),
            change.key.slot,
            change.current,
            info.praise
        ))
        .thumbnail(info.portrait)
        .footer(CreateEmbedFooter::new(format!(
            "From your mentor, {}",
            info.mentor
        )))
        .timestamp(Timestamp::now())
}

pub fn deduct_reply(change: &PointChange, amount: u32) -> CreateEmbed {
    let info = change.class.info();
    CreateEmbed::new()
        .colour(info.color)
        .title(format!("{} {}", info.icon, info.name))
        .description(format!(
            "Removed **{amount} points** from {}'s slot {}.\n\
             New total: **{} / {MAX_POINTS}**\n\n*{}*",
            mention(change.key.user),
            change.key.slot,
            change.current,
            info.scold
        ))
        .thumbnail(info.portrait)
        .timestamp(Timestamp::now())
}

pub fn award_announcement(change: &PointChange, amount: u32) -> CreateMessage {
    let info = change.class.info();
    let embed = CreateEmbed::new()
        .colour(Colour::new(0x27ae60))
        .title("🌟 Points Awarded!")
        .description(format!(
            "{} has been awarded **{amount} {}** points!\n\n\
             *\"Excellence recognized and rewarded.\"*\n\n— Awarded by {}",
            mention(change.key.user),
            info.name,
            info.mentor
        ))
        .field("📚 Subject", info.name, true)
        .field("🎯 Amount", format!("+{amount}"), true)
        .field("🏆 New Total", format!("{}/{MAX_POINTS}", change.current), true)
        .field("📋 Slot", change.key.slot.to_string(), true)
        .thumbnail(info.portrait)
        .timestamp(Timestamp::now());

    CreateMessage::new()
        .content(format!("🎉 {} congratulations!", mention(change.key.user)))
        .embed(embed)
}

pub fn deduction_announcement(change: &PointChange, amount: u32) -> CreateMessage {
    let info = change.class.info();
    let embed = CreateEmbed::new()
        .colour(Colour::new(0xe74c3c))
        .title("⚠️ Points Deducted")
        .description(format!(
            "{} has had **{amount} {}** points deducted.\n\n\
             *\"Actions have consequences in the halls of learning.\"*\n\n— Deducted by {}",
            mention(change.key.user),
            info.name,
            info.mentor
        ))
        .field("📚 Subject", info.name, true)
        .field("🎯 Amount", format!("-{amount}"), true)
        .field("🏆 Remaining", format!("{}/{MAX_POINTS}", change.current), true)
        .field("📋 Slot", change.key.slot.to_string(), true)
        .thumbnail(info.portrait)
        .timestamp(Timestamp::now());

    CreateMessage::new()
        .content(format!("⚠️ {} - points deducted", mention(change.key.user)))
        .embed(embed)
}

pub fn nothing_to_remove(target_tag: &str) -> String {
    format!("ℹ️ {target_tag} has no entries in the leaderboard to remove.")
}

pub fn removal_reply(summary: &RemovalSummary, target_tag: &str, actor_tag: &str) -> CreateEmbed {
    let mut totals = format!(
        "• **{}** character slots cleared\n• **{}** total points removed",
        summary.slots_cleared, summary.total_removed
    );
    if summary.was_champion {
        totals.push_str("\n• Was previously **first place** 👑");
    }

    let mut embed = CreateEmbed::new()
        .colour(Colour::new(0xe74c3c))
        .title("🗑️ User Removed from House Ledger")
        .description(format!(
            "**{target_tag}** has been completely removed from the House Ledger."
        ))
        .field("📊 Removal Summary", totals, false);

    if !summary.per_slot.is_empty() {
        let details = summary
            .per_slot
            .iter()
            .map(|(slot, points)| format!("Slot {slot}: {points} points"))
            .collect::<Vec<_>>()
            .join("\n");
        embed = embed.field("🎭 Slots Affected", details, false);
    }

    embed
        .footer(CreateEmbedFooter::new(format!("Removed by {actor_tag}")))
        .timestamp(Timestamp::now())
}

pub fn removal_announcement(
    summary: &RemovalSummary,
    target_tag: &str,
    actor_tag: &str,
) -> CreateMessage {
    let embed = CreateEmbed::new()
        .colour(Colour::new(0x95a5a6))
        .title("📋 Administrative Action")
        .description(format!(
            "**{target_tag}** has been removed from the House Ledger by administrative decision.\n\n\
             *\"Sometimes the slate must be wiped clean for a fresh beginning.\"*\n\n\
             {HEADMISTRESS_SIGNATURE}"
        ))
        .field("🎭 Slots Cleared", summary.slots_cleared.to_string(), true)
        .field("📊 Points Removed", summary.total_removed.to_string(), true)
        .field("👤 Removed By", actor_tag, true)
        .timestamp(Timestamp::now());

    CreateMessage::new().embed(embed)
}

pub fn rename_reply(slot: Slot, name: &str) -> CreateEmbed {
    CreateEmbed::new()
        .colour(Colour::new(0x3498db))
        .title("✏️ Slot Renamed")
        .description(format!("Slot {slot} is now called **{name}**."))
        .timestamp(Timestamp::now())
}

/// True when the profile holds at least one positive score.
pub fn has_points(profile: &ClassScore) -> bool {
    profile.values().any(|v| *v > 0)
}

pub fn no_points_in_slot(username: &str, slot: Slot) -> String {
    format!("{username} has no points recorded in slot {slot}.")
}

/// A slot's scores across every class, zeros included.
pub fn progress(username: &str, slot_name: &str, profile: &ClassScore) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .colour(Colour::new(0x7d3c98))
        .title(format!("📘 {username} — {slot_name} Progress"))
        .description("⚗️ These scores are inked by glowing hand and whispered ink…\n")
        .footer(CreateEmbedFooter::new("Grimoire sealed upon reading 📌"))
        .timestamp(Timestamp::now());

    for class in ClassId::ALL {
        let info = class.info();
        let value = profile.get(&class).copied().unwrap_or(0);
        embed = embed.field(
            format!("{} {}", info.icon, info.name),
            format!("**{value} / {MAX_POINTS}**"),
            true,
        );
    }
    embed
}

pub fn nothing_yet(slot: Slot) -> CreateEmbed {
    CreateEmbed::new()
        .colour(Colour::new(0x7f8c8d))
        .title("📕 Nothing Yet…")
        .description(format!(
            "Slot {slot} holds no known record.\n\n✨ Perhaps it is waiting to be written."
        ))
        .timestamp(Timestamp::now())
}

/// Per-class top list. `rows` pairs each standing with its holder's name.
pub fn class_leaderboard(class: ClassId, rows: &[(ClassStanding, Option<String>)]) -> CreateEmbed {
    let info = class.info();
    let mut embed = CreateEmbed::new()
        .colour(info.color)
        .title(format!("🏆 Leaderboard — {}", info.name))
        .timestamp(Timestamp::now());

    if rows.is_empty() {
        embed = embed.description("No scholar has earned points in this class yet.");
    }

    for (row, name) in rows {
        let label = match name {
            Some(name) => format!("{name} (Slot {})", row.key.slot),
            None => format!("Unknown User (Slot {})", row.key.slot),
        };
        embed = embed.field(label, format!("**{} pts**", row.score), false);
    }
    embed
}

pub fn class_info(class: ClassId) -> CreateEmbed {
    let info = class.info();
    CreateEmbed::new()
        .colour(info.color)
        .title(format!("{} {}", info.icon, info.name))
        .description(info.description)
        .field("🧑‍🏫 Mentor", info.mentor, true)
        .field("🏅 Cap", format!("{MAX_POINTS} points"), true)
        .thumbnail(info.portrait)
        .timestamp(Timestamp::now())
}

/// Cover of the `mystats` record book.
pub fn grimoire(username: &str) -> CreateEmbed {
    CreateEmbed::new()
        .colour(Colour::new(0xb49fcc))
        .title("📖 ━━ Grimoire of Achievements ━━")
        .description(format!(
            "✨ Within this living book are the records of {username}'s enchanted studies.\n\n\
             📂 Use the dropdown below to unveil their progress."
        ))
        .footer(
            CreateEmbedFooter::new("Inscribed by the Academy's Recordkeeper ✎")
                .icon_url(LIBRARIAN_PORTRAIT),
        )
        .timestamp(Timestamp::now())
}

pub fn slot_menu_id(target: UserId) -> String {
    format!("{SLOT_MENU_PREFIX}{target}")
}

/// Owner of a slot menu, from its custom id.
pub fn parse_slot_menu_id(custom_id: &str) -> Option<UserId> {
    custom_id.strip_prefix(SLOT_MENU_PREFIX)?.parse().ok()
}

fn slot_emoji(slot: Slot) -> &'static str {
    match slot.get() {
        1 => "🔮",
        2 => "📚",
        _ => "🌙",
    }
}

/// Drop-down of the three slots. `names` is indexed by slot order.
pub fn slot_menu(target: UserId, names: &[(Slot, String)]) -> CreateActionRow {
    let options = names
        .iter()
        .map(|(slot, name)| {
            CreateSelectMenuOption::new(format!("Slot {slot} — {name}"), slot.to_string())
                .emoji(ReactionType::Unicode(slot_emoji(*slot).to_string()))
        })
        .collect();

    CreateActionRow::SelectMenu(
        CreateSelectMenu::new(slot_menu_id(target), CreateSelectMenuKind::String { options })
            .placeholder("📜 Choose a character to reveal their magical record…"),
    )
}

/// The global standings message.
pub fn standings(rows: &[(Standing, String)]) -> CreateEmbed {
    const MEDALS: [&str; 3] = ["🥇", "🥈", "🥉"];

    let mut embed = CreateEmbed::new()
        .colour(Colour::new(0x8e44ad))
        .title("🏆 The House Ledger")
        .description("✨ The top scholars of the realm, inscribed in gilded ink...")
        .thumbnail(ClassId::Oddities.info().portrait)
        .footer(CreateEmbedFooter::new(
            "Updated by magic every time points are granted.",
        ))
        .timestamp(Timestamp::now());

    for (rank, (standing, tag)) in rows.iter().enumerate() {
        let marker = MEDALS
            .get(rank)
            .map(|m| m.to_string())
            .unwrap_or_else(|| format!("#{}", rank + 1));
        embed = embed.field(
            format!("{marker} — {tag}"),
            format!("**{} points**", standing.total),
            false,
        );
    }
    embed
}

pub fn unknown_user(user: UserId) -> String {
    format!("Unknown ({user})")
}

/// `@everyone` ping with the champion embed and a celebration image.
pub fn champion_announcement(champion_tag: &str, gif: &str) -> CreateMessage {
    let announcement = CreateEmbed::new()
        .colour(Colour::new(0xf1c40f))
        .title("📣 A New Champion Emerges!")
        .description(format!(
            "@everyone\n\n**{champion_tag}** has risen to the top of the House Ledger! 🏆\n\n\
             “By the stars and scrolls, their brilliance now lights the path. \
             Let all scholars strive to match their spark.”\n\n{HEADMISTRESS_SIGNATURE}"
        ))
        .timestamp(Timestamp::now());
    let image = CreateEmbed::new().image(gif);

    CreateMessage::new()
        .content("@everyone")
        .embeds(vec![announcement, image])
        .allowed_mentions(CreateAllowedMentions::new().everyone(true))
}

pub fn diagnostic_summary(target_tag: &str, entries: &[(Slot, ClassScore)]) -> String {
    let total: u64 = entries
        .iter()
        .flat_map(|(_, scores)| scores.values())
        .map(|v| u64::from(*v))
        .sum();
    format!(
        "🔍 Diagnostic complete! {target_tag} has {} ledger entr{} holding {total} points. \
         Check the logs for details.",
        entries.len(),
        if entries.len() == 1 { "y" } else { "ies" }
    )
}

/// Raw document keys for a user's entries, for logs.
pub fn diagnostic_keys(user: UserId, entries: &[(Slot, ClassScore)]) -> Vec<String> {
    entries
        .iter()
        .map(|(slot, _)| LedgerKey::new(user, *slot).to_document_key())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    fn json(embed: &CreateEmbed) -> Value {
        serde_json::to_value(embed).unwrap()
    }

    fn change(previous: u32, current: u32) -> PointChange {
        PointChange {
            key: LedgerKey::new(UserId(42), Slot::new(2).unwrap()),
            class: ClassId::Flora,
            previous,
            current,
        }
    }

    #[test]
    fn test_grant_reply_carries_mentor_praise() {
        let value = json(&grant_reply(&change(10, 25), 15));
        assert_eq!(value["title"], "🌿 Nature's Friend");
        let description = value["description"].as_str().unwrap();
        assert!(description.contains("Gave **15 points** to <@42>'s slot 2."));
        assert!(description.contains("**25 / 100**"));
        assert!(description.contains("Let your connection grow"));
        assert_eq!(
            value["footer"]["text"],
            "From your mentor, Florence Thistlewhim, Nature's Friend"
        );
    }

    #[test]
    fn test_deduct_reply_scolds() {
        let value = json(&deduct_reply(&change(25, 20), 5));
        let description = value["description"].as_str().unwrap();
        assert!(description.starts_with("Removed **5 points** from <@42>'s slot 2."));
        assert!(description.contains("Even the roots recoil"));
    }

    #[test]
    fn test_standings_use_medals_then_ranks() {
        let rows: Vec<(Standing, String)> = (1..=5)
            .map(|i| {
                (
                    Standing {
                        user: UserId(i),
                        total: 100 - i,
                    },
                    format!("scholar{i}"),
                )
            })
            .collect();
        let value = json(&standings(&rows));
        assert_eq!(value["title"], "🏆 The House Ledger");

        let names: Vec<&str> = value["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "🥇 — scholar1",
                "🥈 — scholar2",
                "🥉 — scholar3",
                "#4 — scholar4",
                "#5 — scholar5"
            ]
        );
        assert_eq!(value["fields"][0]["value"], "**99 points**");
    }

    #[test]
    fn test_progress_lists_every_class() {
        let profile: ClassScore = [(ClassId::Arts, 40)].into_iter().collect();
        let value = json(&progress("wren", "Nightshade", &profile));
        assert_eq!(value["title"], "📘 wren — Nightshade Progress");
        let fields = value["fields"].as_array().unwrap();
        assert_eq!(fields.len(), ClassId::ALL.len());
        assert_eq!(fields[2]["value"], "**40 / 100**");
        assert_eq!(fields[0]["value"], "**0 / 100**");
    }

    #[test]
    fn test_removal_reply_mentions_champion() {
        let summary = RemovalSummary {
            user: UserId(9),
            slots_cleared: 2,
            total_removed: 70,
            per_slot: vec![(Slot::new(1).unwrap(), 70)],
            was_champion: true,
        };
        let value = json(&removal_reply(&summary, "wren", "headmistress"));
        let summary_field = value["fields"][0]["value"].as_str().unwrap();
        assert!(summary_field.contains("**2** character slots cleared"));
        assert!(summary_field.contains("first place"));
        assert_eq!(value["fields"][1]["value"], "Slot 1: 70 points");
    }

    #[test]
    fn test_slot_menu_id_round_trip() {
        let id = slot_menu_id(UserId(1234));
        assert_eq!(id, "select_slot_1234");
        assert_eq!(parse_slot_menu_id(&id), Some(UserId(1234)));
        assert_eq!(parse_slot_menu_id("other_menu"), None);
    }

    #[test]
    fn test_champion_gif_comes_from_pool() {
        assert!(CHAMPION_GIFS.contains(&random_champion_gif()));
    }

    #[test]
    fn test_diagnostic_summary_pluralises() {
        let scores: ClassScore = [(ClassId::History, 12)].into_iter().collect();
        let one = vec![(Slot::new(1).unwrap(), scores)];
        assert!(diagnostic_summary("wren", &one).contains("1 ledger entry holding 12 points"));
        assert_eq!(diagnostic_keys(UserId(5), &one), vec!["5_slot1".to_string()]);
    }
}
