//! Ranked views derived from the ledger.

use std::collections::HashMap;
use tracing::info;

use crate::class::ClassId;
use crate::error::Result;
use crate::id::{LedgerKey, UserId};
use crate::ledger::{ClassScore, Ledger};

/// Ranks shown when no size is configured.
pub const DEFAULT_SIZE: usize = 10;

/// One row of the global standings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Standing {
    pub user: UserId,
    pub total: u64,
}

/// One row of a per-class leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassStanding {
    pub key: LedgerKey,
    pub score: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChampionChange {
    /// Nobody has any points.
    NoStandings,
    Unchanged(UserId),
    /// A different user now holds rank 1. Already recorded.
    NewChampion(UserId),
}

/// Per-user totals across every slot and class, highest first. Equal totals
/// are ordered by ascending user id.
pub fn compute_standings(ledger: &Ledger, size: usize) -> Vec<Standing> {
    rank_totals(ledger.snapshot(), size)
}

fn rank_totals(entries: Vec<(LedgerKey, ClassScore)>, size: usize) -> Vec<Standing> {
    let mut totals: HashMap<UserId, u64> = HashMap::new();
    for (key, scores) in entries {
        let sum: u64 = scores.values().map(|v| u64::from(*v)).sum();
        *totals.entry(key.user).or_default() += sum;
    }

    let mut standings: Vec<Standing> = totals
        .into_iter()
        .map(|(user, total)| Standing { user, total })
        .collect();
    standings.sort_by(|a, b| b.total.cmp(&a.total).then(a.user.cmp(&b.user)));
    standings.truncate(size);
    standings
}

/// Best characters in one class. Zero scores are left out.
pub fn class_leaderboard(ledger: &Ledger, class: ClassId, size: usize) -> Vec<ClassStanding> {
    let mut rows: Vec<ClassStanding> = ledger
        .snapshot()
        .into_iter()
        .filter_map(|(key, scores)| {
            let score = scores.get(&class).copied().unwrap_or(0);
            (score > 0).then_some(ClassStanding { key, score })
        })
        .collect();
    rows.sort_by(|a, b| b.score.cmp(&a.score).then(a.key.cmp(&b.key)));
    rows.truncate(size);
    rows
}

/// Compares rank 1 against the stored champion and records a new one.
///
/// The record is durable before this returns, so calling it again without
/// an intervening mutation yields [`ChampionChange::Unchanged`]. A rank 1
/// with zero points still counts as a champion.
pub async fn detect_champion_change(
    ledger: &Ledger,
    standings: &[Standing],
) -> Result<ChampionChange> {
    let Some(top) = standings.first() else {
        return Ok(ChampionChange::NoStandings);
    };

    if ledger.record_champion(top.user).await? {
        info!(user = %top.user, total = top.total, "new champion");
        Ok(ChampionChange::NewChampion(top.user))
    } else {
        Ok(ChampionChange::Unchanged(top.user))
    }
}
