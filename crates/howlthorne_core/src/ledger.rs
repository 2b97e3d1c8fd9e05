//! The in-memory point ledger and its write-through persistence.
//!
//! Entries live in a [`DashMap`] keyed by [`LedgerKey`]; a grant or deduct is
//! a read-modify-write under that key's shard lock. Every mutation rewrites
//! the backing document before returning and only then asks the refresh
//! scheduler for a leaderboard update.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock, Weak};
use tracing::{debug, info, warn};

use crate::class::{ClassId, MAX_POINTS};
use crate::error::{Result, ValidationError};
use crate::id::{LedgerKey, Slot, UserId};
use crate::scheduler::RefreshScheduler;
use crate::store::{ChampionDocument, LedgerStore, PointsDocument, SlotNamesDocument};

/// Scores of one character, per class.
pub type ClassScore = BTreeMap<ClassId, u32>;

/// Parses a point amount: a non-negative whole number.
pub fn parse_amount(raw: &str) -> std::result::Result<u32, ValidationError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| ValidationError::InvalidAmount {
            given: raw.to_string(),
        })
}

/// Result of a grant or deduct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointChange {
    pub key: LedgerKey,
    pub class: ClassId,
    pub previous: u32,
    pub current: u32,
}

impl PointChange {
    /// Signed difference actually applied after clamping.
    pub fn applied(&self) -> i64 {
        i64::from(self.current) - i64::from(self.previous)
    }
}

/// What `remove_user` took away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalSummary {
    pub user: UserId,
    pub slots_cleared: usize,
    pub total_removed: u64,
    /// Subtotals of the removed slots that held any points.
    pub per_slot: Vec<(Slot, u64)>,
    pub was_champion: bool,
}

impl RemovalSummary {
    fn nothing(user: UserId) -> Self {
        Self {
            user,
            slots_cleared: 0,
            total_removed: 0,
            per_slot: Vec::new(),
            was_champion: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slots_cleared == 0
    }
}

fn score_total(scores: &ClassScore) -> u64 {
    scores.values().map(|v| u64::from(*v)).sum()
}

/// The ledger engine.
#[derive(Debug)]
pub struct Ledger {
    entries: DashMap<LedgerKey, ClassScore>,
    slot_names: DashMap<LedgerKey, String>,
    champion: Mutex<Option<UserId>>,
    store: LedgerStore,
    scheduler: OnceLock<Weak<RefreshScheduler>>,
}

impl Ledger {
    /// Builds the ledger from whatever is on disk. Malformed documents are
    /// quarantined and replaced by empty ones; bad keys and unknown classes
    /// are dropped with a warning; out-of-range scores are clamped.
    pub async fn load(store: LedgerStore) -> Result<Self> {
        let entries = DashMap::new();
        if let Some(points) = store.points.load_or_quarantine().await? {
            for (raw_key, raw_scores) in points {
                let Some(key) = LedgerKey::from_document_key(&raw_key) else {
                    warn!(key = %raw_key, "skipping unrecognised ledger key");
                    continue;
                };
                entries.insert(key, sanitize_scores(&raw_key, raw_scores));
            }
        }

        let slot_names = DashMap::new();
        if let Some(names) = store.slot_names.load_or_quarantine().await? {
            for (raw_key, name) in names {
                match LedgerKey::from_slot_name_key(&raw_key) {
                    Some(key) => {
                        slot_names.insert(key, name);
                    }
                    None => warn!(key = %raw_key, "skipping unrecognised slot name key"),
                }
            }
        }

        let champion = match store.champion.load_or_quarantine().await? {
            Some(doc) => match doc.first_place_id.parse::<UserId>() {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!(error = %e, "ignoring unreadable champion record");
                    None
                }
            },
            None => None,
        };

        info!(
            entries = entries.len(),
            slot_names = slot_names.len(),
            champion = ?champion,
            "ledger loaded"
        );

        Ok(Self {
            entries,
            slot_names,
            champion: Mutex::new(champion),
            store,
            scheduler: OnceLock::new(),
        })
    }

    /// Connects the scheduler that mutations notify. Only the first call
    /// has an effect. The ledger does not keep the scheduler alive.
    pub fn attach_scheduler(&self, scheduler: &Arc<RefreshScheduler>) {
        if self.scheduler.set(Arc::downgrade(scheduler)).is_err() {
            warn!("refresh scheduler already attached");
        }
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    /// Adds `amount`, capped at [`MAX_POINTS`].
    pub async fn grant(&self, key: LedgerKey, class: ClassId, amount: u32) -> Result<PointChange> {
        let change = self.apply(key, class, |old| old.saturating_add(amount).min(MAX_POINTS));
        debug!(%key, %class, amount, previous = change.previous, current = change.current, "grant");
        self.persist_points().await?;
        self.schedule_refresh();
        Ok(change)
    }

    /// Subtracts `amount`, floored at zero.
    pub async fn deduct(&self, key: LedgerKey, class: ClassId, amount: u32) -> Result<PointChange> {
        let change = self.apply(key, class, |old| old.saturating_sub(amount));
        debug!(%key, %class, amount, previous = change.previous, current = change.current, "deduct");
        self.persist_points().await?;
        self.schedule_refresh();
        Ok(change)
    }

    fn apply(&self, key: LedgerKey, class: ClassId, f: impl FnOnce(u32) -> u32) -> PointChange {
        let mut entry = self.entries.entry(key).or_default();
        let score = entry.entry(class).or_insert(0);
        let previous = *score;
        *score = f(previous).min(MAX_POINTS);
        PointChange {
            key,
            class,
            previous,
            current: *score,
        }
    }

    /// Deletes every slot the user owns. Display names survive.
    pub async fn remove_user(&self, user: UserId) -> Result<RemovalSummary> {
        let mut summary = RemovalSummary::nothing(user);
        for slot in Slot::ALL {
            if let Some((_, scores)) = self.entries.remove(&LedgerKey::new(user, slot)) {
                let subtotal = score_total(&scores);
                summary.slots_cleared += 1;
                summary.total_removed += subtotal;
                if subtotal > 0 {
                    summary.per_slot.push((slot, subtotal));
                }
            }
        }

        if summary.is_empty() {
            debug!(%user, "remove_user: no entries");
            return Ok(summary);
        }

        self.persist_points().await?;

        summary.was_champion = self.clear_champion_if(user).await?;

        info!(
            %user,
            slots_cleared = summary.slots_cleared,
            total_removed = summary.total_removed,
            was_champion = summary.was_champion,
            "user removed from ledger"
        );
        self.schedule_refresh();
        Ok(summary)
    }

    /// Scores for one slot; empty when the slot was never touched.
    pub fn query_profile(&self, key: LedgerKey) -> ClassScore {
        self.entries
            .get(&key)
            .map(|scores| scores.clone())
            .unwrap_or_default()
    }

    pub async fn rename_slot(&self, key: LedgerKey, name: &str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptySlotName.into());
        }
        self.slot_names.insert(key, name.to_string());
        self.store
            .slot_names
            .save_with(|| self.slot_names_document())
            .await?;
        debug!(%key, name, "slot renamed");
        Ok(name.to_string())
    }

    /// Custom name of the slot, or `"Character {slot}"`.
    pub fn slot_display_name(&self, key: LedgerKey) -> String {
        self.slot_names
            .get(&key)
            .map(|name| name.clone())
            .unwrap_or_else(|| key.slot.default_name())
    }

    /// Every slot the user has an entry for, in slot order.
    pub fn user_entries(&self, user: UserId) -> Vec<(Slot, ClassScore)> {
        Slot::ALL
            .into_iter()
            .filter_map(|slot| {
                self.entries
                    .get(&LedgerKey::new(user, slot))
                    .map(|scores| (slot, scores.clone()))
            })
            .collect()
    }

    /// Copy of every entry, for aggregation.
    pub fn snapshot(&self) -> Vec<(LedgerKey, ClassScore)> {
        self.entries
            .iter()
            .map(|item| (*item.key(), item.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored rank-1 user from the last refresh.
    pub fn champion(&self) -> Option<UserId> {
        *self.champion.lock()
    }

    /// Records `user` as champion unless it already is. Returns whether the
    /// record changed.
    pub async fn record_champion(&self, user: UserId) -> Result<bool> {
        {
            let mut current = self.champion.lock();
            if *current == Some(user) {
                return Ok(false);
            }
            *current = Some(user);
        }
        self.store
            .champion
            .save_with(|| ChampionDocument {
                first_place_id: user.to_string(),
            })
            .await?;
        info!(%user, "champion recorded");
        Ok(true)
    }

    async fn clear_champion_if(&self, user: UserId) -> Result<bool> {
        {
            let mut current = self.champion.lock();
            if *current != Some(user) {
                return Ok(false);
            }
            *current = None;
        }
        self.store.champion.remove().await?;
        Ok(true)
    }

    fn schedule_refresh(&self) {
        if let Some(scheduler) = self.scheduler.get().and_then(Weak::upgrade) {
            scheduler.schedule();
        }
    }

    async fn persist_points(&self) -> Result<()> {
        self.store
            .points
            .save_with(|| self.points_document())
            .await
    }

    fn points_document(&self) -> PointsDocument {
        self.entries
            .iter()
            .map(|item| {
                let scores = item
                    .value()
                    .iter()
                    .map(|(class, score)| (class.as_str().to_string(), i64::from(*score)))
                    .collect();
                (item.key().to_document_key(), scores)
            })
            .collect()
    }

    fn slot_names_document(&self) -> SlotNamesDocument {
        self.slot_names
            .iter()
            .map(|item| (item.key().slot_name_key(), item.value().clone()))
            .collect()
    }
}

fn sanitize_scores(raw_key: &str, raw: BTreeMap<String, i64>) -> ClassScore {
    let mut scores = ClassScore::new();
    for (class, value) in raw {
        let Ok(class_id) = class.parse::<ClassId>() else {
            warn!(key = raw_key, class = %class, "dropping unknown class");
            continue;
        };
        let clamped = value.clamp(0, i64::from(MAX_POINTS));
        if clamped != value {
            warn!(key = raw_key, class = %class, value, clamped, "clamping out-of-range score");
        }
        scores.insert(class_id, clamped as u32);
    }
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(user: u64, slot: u8) -> LedgerKey {
        LedgerKey::new(UserId(user), Slot::new(slot).unwrap())
    }

    async fn empty_ledger(dir: &std::path::Path) -> Ledger {
        Ledger::load(LedgerStore::in_dir(dir)).await.unwrap()
    }

    #[test]
    fn test_parse_amount_is_strict() {
        assert_eq!(parse_amount("15"), Ok(15));
        assert!(parse_amount("-5").is_err());
        assert!(parse_amount("5abc").is_err());
        assert!(parse_amount("").is_err());
    }

    #[tokio::test]
    async fn test_grant_clamps_at_cap() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = empty_ledger(dir.path()).await;

        ledger.grant(key(1, 1), ClassId::Alchemy, 30).await.unwrap();
        let change = ledger.grant(key(1, 1), ClassId::Alchemy, 90).await.unwrap();

        assert_eq!(change.previous, 30);
        assert_eq!(change.current, 100);
        assert_eq!(change.applied(), 70);
    }

    #[tokio::test]
    async fn test_deduct_on_fresh_key_floors_at_zero() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = empty_ledger(dir.path()).await;

        let change = ledger.deduct(key(2, 2), ClassId::Flora, 50).await.unwrap();
        assert_eq!((change.previous, change.current), (0, 0));
        assert_eq!(ledger.query_profile(key(2, 2)).get(&ClassId::Flora), Some(&0));
    }

    #[tokio::test]
    async fn test_mutations_are_written_through() {
        let dir = tempfile::tempdir().unwrap();
        {
            let ledger = empty_ledger(dir.path()).await;
            ledger.grant(key(5, 3), ClassId::Arts, 12).await.unwrap();
            ledger.rename_slot(key(5, 3), "  Nightshade ").await.unwrap();
        }

        let raw = std::fs::read_to_string(dir.path().join("progress.json")).unwrap();
        assert!(raw.contains("\"5_slot3\""));
        assert!(raw.contains("\"arts\": 12"));

        let reloaded = empty_ledger(dir.path()).await;
        assert_eq!(reloaded.query_profile(key(5, 3)).get(&ClassId::Arts), Some(&12));
        assert_eq!(reloaded.slot_display_name(key(5, 3)), "Nightshade");
    }

    #[tokio::test]
    async fn test_rename_rejects_blank_name() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = empty_ledger(dir.path()).await;
        let err = ledger.rename_slot(key(1, 1), "   ").await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::CoreError::Validation(ValidationError::EmptySlotName)
        ));
        assert_eq!(ledger.slot_display_name(key(1, 1)), "Character 1");
    }

    #[tokio::test]
    async fn test_load_sanitizes_bad_data() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("progress.json"),
            r#"{
                "9_slot1": { "hexcraft": 250, "alchemy": -4, "necromancy": 7 },
                "9_slot7": { "arts": 3 },
                "not-a-key": {}
            }"#,
        )
        .unwrap();

        let ledger = empty_ledger(dir.path()).await;
        assert_eq!(ledger.len(), 1);

        let profile = ledger.query_profile(key(9, 1));
        assert_eq!(profile.get(&ClassId::Hexcraft), Some(&100));
        assert_eq!(profile.get(&ClassId::Alchemy), Some(&0));
        assert_eq!(profile.len(), 2);
    }

    #[tokio::test]
    async fn test_remove_user_without_entries_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = empty_ledger(dir.path()).await;

        let summary = ledger.remove_user(UserId(77)).await.unwrap();
        assert!(summary.is_empty());
        assert_eq!(summary.total_removed, 0);
        assert!(!dir.path().join("progress.json").exists());
    }

    #[tokio::test]
    async fn test_remove_user_reports_subtotals_and_keeps_names() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = empty_ledger(dir.path()).await;

        ledger.grant(key(3, 1), ClassId::History, 10).await.unwrap();
        ledger.grant(key(3, 1), ClassId::Flora, 5).await.unwrap();
        ledger.deduct(key(3, 2), ClassId::Arts, 1).await.unwrap();
        ledger.grant(key(3, 3), ClassId::Oddities, 40).await.unwrap();
        ledger.grant(key(4, 1), ClassId::Oddities, 40).await.unwrap();
        ledger.rename_slot(key(3, 1), "Wren").await.unwrap();

        let summary = ledger.remove_user(UserId(3)).await.unwrap();
        assert_eq!(summary.slots_cleared, 3);
        assert_eq!(summary.total_removed, 55);
        assert_eq!(
            summary.per_slot,
            vec![(Slot::new(1).unwrap(), 15), (Slot::new(3).unwrap(), 40)]
        );
        assert!(ledger.user_entries(UserId(3)).is_empty());
        assert_eq!(ledger.user_entries(UserId(4)).len(), 1);
        assert_eq!(ledger.slot_display_name(key(3, 1)), "Wren");
    }

    #[tokio::test]
    async fn test_champion_record_only_changes_on_new_user() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = empty_ledger(dir.path()).await;

        assert!(ledger.record_champion(UserId(8)).await.unwrap());
        assert!(!ledger.record_champion(UserId(8)).await.unwrap());

        let reloaded = empty_ledger(dir.path()).await;
        assert_eq!(reloaded.champion(), Some(UserId(8)));
    }

    #[tokio::test]
    async fn test_removing_champion_clears_record() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = empty_ledger(dir.path()).await;
        ledger.grant(key(8, 1), ClassId::Arts, 9).await.unwrap();
        ledger.record_champion(UserId(8)).await.unwrap();

        let summary = ledger.remove_user(UserId(8)).await.unwrap();
        assert!(summary.was_champion);
        assert_eq!(ledger.champion(), None);
        assert!(!dir.path().join("firstPlace.json").exists());
    }
}
