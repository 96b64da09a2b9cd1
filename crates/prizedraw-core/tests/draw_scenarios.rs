//! End-to-end draw scenarios against an on-disk store and a JSON roster.

use std::fs;
use std::sync::{Arc, Barrier};
use std::thread;

use prizedraw_core::config::AppConfig;
use prizedraw_core::engine::DrawEngine;
use prizedraw_core::roster::{JsonRosterProvider, RosterProvider};
use prizedraw_core::store::{SqliteStateStore, StateStore};
use prizedraw_core::tier::{PrizeTier, TierTable};
use prizedraw_core::DrawError;
use tempfile::TempDir;

/// Writes a roster of `count` participants with photos and opens an engine
/// over it using the default configuration.
fn setup(count: u32, totals: &TierTable, seed: u64) -> (Arc<DrawEngine<SqliteStateStore>>, TempDir) {
    let dir = TempDir::new().expect("temp dir");
    let photo_dir = dir.path().join("static").join("images");
    fs::create_dir_all(&photo_dir).expect("photo dir");

    let participants: Vec<_> = (1..=count)
        .map(|id| {
            let photo = format!("{id}.jpg");
            fs::write(photo_dir.join(&photo), b"jpg").expect("photo");
            serde_json::json!({ "id": id, "name": format!("Participant {id}"), "photo": photo })
        })
        .collect();
    let roster_path = dir.path().join("participants.json");
    fs::write(&roster_path, serde_json::to_vec(&participants).unwrap()).expect("roster");

    let config = AppConfig::default();
    let roster = JsonRosterProvider::new(&roster_path, &photo_dir)
        .load_roster()
        .expect("load roster");
    let store = SqliteStateStore::open(dir.path().join("lottery.db"), totals).expect("store");
    let engine = DrawEngine::with_seed(store, roster, config.draw.override_rule.rule(), seed);
    (Arc::new(engine), dir)
}

fn draw_and_commit(engine: &DrawEngine<SqliteStateStore>) -> u32 {
    let proposal = engine.propose().expect("propose");
    engine
        .commit(proposal.winner.id, proposal.tier)
        .expect("commit");
    proposal.winner.id
}

#[test]
fn small_tier_exhaustion_activates_medium_on_twenty_first_draw() {
    let (engine, _dir) = setup(80, &TierTable::default(), 3);

    for _ in 0..20 {
        assert_eq!(engine.propose().unwrap().tier, PrizeTier::Small);
        draw_and_commit(&engine);
    }

    let status = engine.status().unwrap();
    assert_eq!(status.remaining.small, 0);
    assert_eq!(status.current_tier, Some(PrizeTier::Medium));

    let proposal = engine.propose().unwrap();
    assert_eq!(proposal.draw_index, 21);
    assert_eq!(proposal.tier, PrizeTier::Medium);
}

#[test]
fn full_cycle_awards_every_prize_in_order_with_override() {
    let (engine, _dir) = setup(80, &TierTable::default(), 11);

    let mut sequence = Vec::new();
    for draw in 1..=35u64 {
        let proposal = engine.propose().unwrap();
        assert_eq!(proposal.draw_index, draw);
        if draw == 34 {
            assert_eq!(proposal.winner.id, 57);
        } else {
            assert_ne!(proposal.winner.id, 57);
        }
        sequence.push(proposal.tier);
        engine.commit(proposal.winner.id, proposal.tier).unwrap();
    }

    assert!(sequence.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(sequence.iter().filter(|t| **t == PrizeTier::Small).count(), 20);
    assert_eq!(sequence.iter().filter(|t| **t == PrizeTier::Medium).count(), 10);
    assert_eq!(sequence.iter().filter(|t| **t == PrizeTier::Big).count(), 5);

    assert!(matches!(engine.propose(), Err(DrawError::PoolExhausted)));
    assert_eq!(engine.winners().unwrap().len(), 35);
}

#[test]
fn override_participant_only_eligible_off_trigger_is_no_eligible() {
    let (engine, _dir) = setup(60, &TierTable::default(), 5);
    for id in (1..=60).filter(|id| *id != 57) {
        engine.mark_absent(id).unwrap();
    }

    let roster_len = engine.roster().len();
    assert!(roster_len > 0);
    assert!(matches!(
        engine.propose(),
        Err(DrawError::NoEligibleParticipants { draw_index: 1 })
    ));
}

#[test]
fn concurrent_engines_contending_for_last_unit() {
    let (engine, _dir) = setup(10, &TierTable::full(1, 0, 0), 9);
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = [3u32, 4]
        .into_iter()
        .map(|id| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                engine.commit(id, PrizeTier::Small)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.iter().any(|r| matches!(
        r,
        Err(DrawError::TierExhausted { .. } | DrawError::DuplicateWinner { .. })
    )));
    assert_eq!(engine.status().unwrap().remaining.small, 0);
    assert_eq!(engine.draw_count().unwrap(), 1);
}

#[test]
fn concurrent_proposals_commit_each_prize_once() {
    let (engine, _dir) = setup(40, &TierTable::full(5, 0, 0), 21);
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut committed = 0;
                for _ in 0..5 {
                    let Ok(proposal) = engine.propose() else {
                        break;
                    };
                    if engine.commit(proposal.winner.id, proposal.tier).is_ok() {
                        committed += 1;
                    }
                }
                committed
            })
        })
        .collect();

    let committed: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(committed, 5);

    let tiers = engine.store().read_tier_status().unwrap();
    assert_eq!(tiers.small.remaining, 0);
    assert_eq!(engine.store().read_winners().unwrap().len(), 5);
    assert_eq!(engine.draw_count().unwrap(), 5);
}

#[test]
fn reset_after_mixed_activity_restores_initial_state() {
    let (engine, dir) = setup(50, &TierTable::default(), 8);
    for _ in 0..12 {
        draw_and_commit(&engine);
    }
    engine.mark_absent(50).unwrap();
    let _ = engine.mark_absent(49);

    engine.reset().unwrap();
    drop(engine);

    // Reopen to prove the reset is durable.
    let store = SqliteStateStore::open(dir.path().join("lottery.db"), &TierTable::default()).unwrap();
    let snapshot = store.snapshot().unwrap();
    assert_eq!(snapshot.tiers, TierTable::default());
    assert_eq!(snapshot.draw_count, 0);
    assert!(snapshot.winners.is_empty());
    assert!(snapshot.absent.is_empty());
}

#[test]
fn mark_absent_twice_leaves_set_unchanged() {
    let (engine, _dir) = setup(5, &TierTable::default(), 1);
    engine.mark_absent(2).unwrap();

    assert!(matches!(
        engine.mark_absent(2),
        Err(DrawError::AlreadyAbsent { participant_id: 2 })
    ));
    assert_eq!(engine.absent().unwrap(), vec![2]);
}
