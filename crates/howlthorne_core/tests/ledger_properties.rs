//! Integration tests for the ledger, standings and refresh scheduling
//!
//! These exercise the public API end to end against a temporary data
//! directory, including the champion hand-over after a removal.

use async_trait::async_trait;
use howlthorne_core::{
    ChampionChange, ClassId, Ledger, LedgerKey, LedgerStore, MAX_POINTS, RefreshScheduler,
    RefreshTarget, Result, Slot, UserId,
    standings::{DEFAULT_SIZE, class_leaderboard, compute_standings, detect_champion_change},
};
use pretty_assertions::assert_eq;
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn key(user: u64, slot: u8) -> LedgerKey {
    LedgerKey::new(UserId(user), Slot::new(slot).unwrap())
}

async fn ledger_in(dir: &tempfile::TempDir) -> Arc<Ledger> {
    Arc::new(Ledger::load(LedgerStore::in_dir(dir.path())).await.unwrap())
}

fn grand_total(ledger: &Ledger) -> u64 {
    compute_standings(ledger, usize::MAX)
        .iter()
        .map(|s| s.total)
        .sum()
}

#[tokio::test]
async fn scores_stay_within_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = ledger_in(&dir).await;

    let mut rng = StdRng::seed_from_u64(0x9e37_79b9);
    for _ in 0..300 {
        let slot = rng.gen_range(1..=3);
        let class = ClassId::ALL[rng.gen_range(0..ClassId::ALL.len())];
        let amount = rng.gen_range(0..140);
        let k = key(rng.gen_range(1..=4), slot);

        let change = if rng.gen_bool(0.5) {
            ledger.grant(k, class, amount).await.unwrap()
        } else {
            ledger.deduct(k, class, amount).await.unwrap()
        };
        assert!(change.current <= MAX_POINTS);
    }

    for (_, scores) in ledger.snapshot() {
        assert!(scores.values().all(|v| *v <= MAX_POINTS));
    }
}

#[tokio::test]
async fn clamping_is_lossy_at_the_boundary() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = ledger_in(&dir).await;
    let k = key(1, 1);

    ledger.grant(k, ClassId::Hexcraft, 95).await.unwrap();
    let up = ledger.grant(k, ClassId::Hexcraft, 10).await.unwrap();
    assert_eq!(up.current, 100);

    let down = ledger.deduct(k, ClassId::Hexcraft, 10).await.unwrap();
    assert_eq!(down.current, 90);
}

#[tokio::test]
async fn zero_amount_still_persists() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = ledger_in(&dir).await;

    let change = ledger.grant(key(6, 2), ClassId::Arts, 0).await.unwrap();
    assert_eq!((change.previous, change.current), (0, 0));
    assert!(dir.path().join("progress.json").exists());
}

#[tokio::test]
async fn remove_user_reduces_total_by_removed_sum() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = ledger_in(&dir).await;

    ledger.grant(key(1, 1), ClassId::Alchemy, 40).await.unwrap();
    ledger.grant(key(1, 2), ClassId::Flora, 25).await.unwrap();
    ledger.grant(key(2, 1), ClassId::Arts, 60).await.unwrap();
    ledger.grant(key(3, 3), ClassId::History, 15).await.unwrap();

    let before = grand_total(&ledger);
    let summary = ledger.remove_user(UserId(1)).await.unwrap();
    let after = grand_total(&ledger);

    assert_eq!(summary.total_removed, 65);
    assert_eq!(before - after, summary.total_removed);
    assert!(
        compute_standings(&ledger, DEFAULT_SIZE)
            .iter()
            .all(|s| s.user != UserId(1))
    );
}

#[tokio::test]
async fn standings_are_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = ledger_in(&dir).await;
    for user in 1..=12u64 {
        ledger
            .grant(key(user, 1), ClassId::Oddities, (user * 7 % 50) as u32)
            .await
            .unwrap();
    }

    let first = compute_standings(&ledger, DEFAULT_SIZE);
    let second = compute_standings(&ledger, DEFAULT_SIZE);
    assert_eq!(first, second);
    assert_eq!(first.len(), DEFAULT_SIZE);
}

#[tokio::test]
async fn class_leaderboard_skips_zero_scores() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = ledger_in(&dir).await;

    ledger.grant(key(1, 1), ClassId::Flora, 20).await.unwrap();
    ledger.grant(key(1, 2), ClassId::Flora, 35).await.unwrap();
    ledger.grant(key(2, 1), ClassId::Flora, 20).await.unwrap();
    ledger.deduct(key(3, 1), ClassId::Flora, 5).await.unwrap();
    ledger.grant(key(4, 1), ClassId::Arts, 90).await.unwrap();

    let rows: Vec<(u64, u8, u32)> = class_leaderboard(&ledger, ClassId::Flora, DEFAULT_SIZE)
        .iter()
        .map(|r| (r.key.user.get(), r.key.slot.get(), r.score))
        .collect();
    assert_eq!(rows, vec![(1, 2, 35), (1, 1, 20), (2, 1, 20)]);
}

#[tokio::test]
async fn champion_change_fires_once() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = ledger_in(&dir).await;

    assert_eq!(
        detect_champion_change(&ledger, &[]).await.unwrap(),
        ChampionChange::NoStandings
    );

    ledger.grant(key(10, 1), ClassId::Arts, 80).await.unwrap();
    ledger.grant(key(20, 1), ClassId::Arts, 100).await.unwrap();
    ledger.grant(key(20, 2), ClassId::Flora, 20).await.unwrap();

    let standings = compute_standings(&ledger, DEFAULT_SIZE);
    assert_eq!(
        detect_champion_change(&ledger, &standings).await.unwrap(),
        ChampionChange::NewChampion(UserId(20))
    );
    assert_eq!(
        detect_champion_change(&ledger, &standings).await.unwrap(),
        ChampionChange::Unchanged(UserId(20))
    );

    let summary = ledger.remove_user(UserId(20)).await.unwrap();
    assert!(summary.was_champion);

    let standings = compute_standings(&ledger, DEFAULT_SIZE);
    assert_eq!(
        detect_champion_change(&ledger, &standings).await.unwrap(),
        ChampionChange::NewChampion(UserId(10))
    );
    assert_eq!(
        detect_champion_change(&ledger, &standings).await.unwrap(),
        ChampionChange::Unchanged(UserId(10))
    );
}

#[tokio::test]
async fn champion_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    {
        let ledger = ledger_in(&dir).await;
        ledger.grant(key(5, 1), ClassId::History, 10).await.unwrap();
        let standings = compute_standings(&ledger, DEFAULT_SIZE);
        detect_champion_change(&ledger, &standings).await.unwrap();
    }

    let ledger = ledger_in(&dir).await;
    let standings = compute_standings(&ledger, DEFAULT_SIZE);
    assert_eq!(
        detect_champion_change(&ledger, &standings).await.unwrap(),
        ChampionChange::Unchanged(UserId(5))
    );
}

#[tokio::test]
async fn slot_names_default_until_renamed() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = ledger_in(&dir).await;

    ledger.rename_slot(key(7, 3), "Nightshade").await.unwrap();
    assert_eq!(ledger.slot_display_name(key(7, 3)), "Nightshade");
    assert_eq!(ledger.slot_display_name(key(7, 1)), "Character 1");
    assert!(ledger.query_profile(key(7, 3)).is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_grants_on_one_key_are_not_lost() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = ledger_in(&dir).await;

    let tasks: Vec<_> = (0..20)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            tokio::spawn(async move { ledger.grant(key(1, 1), ClassId::Alchemy, 3).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(
        ledger.query_profile(key(1, 1)).get(&ClassId::Alchemy),
        Some(&60)
    );
    let reloaded = ledger_in(&dir).await;
    assert_eq!(
        reloaded.query_profile(key(1, 1)).get(&ClassId::Alchemy),
        Some(&60)
    );
}

struct StandingsRefresh {
    ledger: Arc<Ledger>,
    runs: AtomicUsize,
    announced: parking_lot::Mutex<Vec<UserId>>,
}

#[async_trait]
impl RefreshTarget for StandingsRefresh {
    async fn refresh(&self) -> Result<()> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let standings = compute_standings(&self.ledger, DEFAULT_SIZE);
        if let ChampionChange::NewChampion(user) =
            detect_champion_change(&self.ledger, &standings).await?
        {
            self.announced.lock().push(user);
        }
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn mutation_burst_triggers_single_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = ledger_in(&dir).await;
    let target = Arc::new(StandingsRefresh {
        ledger: Arc::clone(&ledger),
        runs: AtomicUsize::new(0),
        announced: parking_lot::Mutex::new(Vec::new()),
    });
    let scheduler = Arc::new(RefreshScheduler::new(
        Duration::from_secs(15),
        target.clone(),
    ));
    ledger.attach_scheduler(&scheduler);

    for amount in [5, 10, 15, 20] {
        ledger.grant(key(1, 1), ClassId::Alchemy, amount).await.unwrap();
    }
    assert!(scheduler.is_pending());

    tokio::time::sleep(Duration::from_secs(16)).await;
    tokio::task::yield_now().await;

    assert_eq!(target.runs.load(Ordering::SeqCst), 1);
    assert_eq!(*target.announced.lock(), vec![UserId(1)]);

    scheduler.shutdown();
    ledger.grant(key(2, 1), ClassId::Alchemy, 99).await.unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(target.runs.load(Ordering::SeqCst), 1);
}
