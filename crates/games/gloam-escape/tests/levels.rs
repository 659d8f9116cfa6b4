//! Scenario tests driving whole sessions over the checked-in levels.

use gloam_core::Simulation;
use gloam_core::test_helpers::{assert_same_state, run_frames, run_frames_with};
use gloam_escape::adversary::BossMode;
use gloam_escape::flow::FlowPhase;
use gloam_escape::{
    EscapeConfig, LevelTemplate, Session, SessionPhase, SimEvent, SpawnKind, load_level_from_file,
};

fn level_path(name: &str) -> String {
    format!("{}/../../../levels/{name}.json", env!("CARGO_MANIFEST_DIR"))
}

fn load(name: &str) -> LevelTemplate {
    load_level_from_file(level_path(name)).unwrap()
}

fn session_for(name: &str) -> Session {
    let mut session = Session::new(EscapeConfig::default());
    session.start_level(load(name)).unwrap();
    session
}

#[test]
fn checked_in_levels_validate() {
    let vault = load("vault");
    assert_eq!(vault.adversaries.len(), 4);
    assert!(vault.flow.is_some());
    assert!(!vault.final_level);

    let arena = load("boss_arena");
    assert!(arena.final_level);
    assert_eq!(arena.adversaries.iter().filter(|a| a.is_boss()).count(), 1);
}

#[test]
fn vault_flow_blocks_on_the_crooked_tile_and_drains() {
    let mut session = session_for("vault");
    assert!(session.start_flow());
    assert!(!session.start_flow(), "already running");

    let (events, now) = run_frames(&mut session, 120, 0.0);
    assert!(events.contains(&SimEvent::FlowStarted));
    // The start tile pours east into a tile standing north-south.
    assert!(events.contains(&SimEvent::FlowBlocked { col: 0, row: 0 }));
    assert!(!events.contains(&SimEvent::FlowSolved));

    assert!(session.reset_flow());
    let (events, _) = run_frames(&mut session, 120, now);
    assert!(events.contains(&SimEvent::FlowEmptied));
    let flow = session.state().flow.as_ref().unwrap();
    assert_eq!(flow.state.phase, FlowPhase::Idle);
    assert!(flow.tiles.iter().all(|t| !t.locked));
}

#[test]
fn vault_flow_solves_once_the_gap_is_turned() {
    let mut session = session_for("vault");
    assert!(session.rotate_tile(1, 0, 1));
    assert!(!session.rotate_tile(0, 0, 1), "start tile is fixed");
    assert!(!session.rotate_tile(1, 0, 2), "one quarter turn at a time");
    assert!(session.start_flow());
    assert!(!session.rotate_tile(2, 0, 1), "rotation is refused while flowing");

    let (events, _) = run_frames(&mut session, 200, 0.0);
    assert!(events.contains(&SimEvent::FlowSolved));
    assert!(session.state().flow.as_ref().unwrap().is_solved());
}

#[test]
fn vault_idle_runs_are_deterministic() {
    let mut a = session_for("vault");
    let mut b = session_for("vault");
    let (ea, _) = run_frames(&mut a, 600, 0.0);
    let (eb, _) = run_frames(&mut b, 600, 0.0);
    assert_eq!(ea, eb);
    assert_same_state(&a, &b);
    assert_eq!(a.phase(), SessionPhase::Playing);
}

#[test]
fn vault_snake_follows_its_pit() {
    let mut session = session_for("vault");
    let mut emerged_seen = false;
    run_frames_with(&mut session, 400, 0.0, 16.0, |s, _| {
        let snake = &s.state().adversaries[2];
        emerged_seen |= snake.is_harmful();
    });
    assert!(emerged_seen, "the pit wakes after 2.5 s");
}

#[test]
fn boss_charges_into_boulder_and_releases_minion() {
    let mut session = session_for("boss_arena");
    session.update(16.0, 0.0);
    let boss = session.state().boss().unwrap();
    assert_eq!(boss.boss_brain().unwrap().mode, BossMode::Recovering);

    let mut now = 16.0;
    let mut events = Vec::new();
    for _ in 0..900 {
        events.extend(session.update(16.0, now));
        now += 16.0;
        if events.iter().any(|e| matches!(e, SimEvent::BoulderHit { .. })) {
            break;
        }
    }
    assert!(events.contains(&SimEvent::BoulderHit { id: 1, hits: 1 }));
    let minion = events.iter().find_map(|e| match e {
        SimEvent::Spawned { id, request } if request.kind == SpawnKind::Minion => Some(*id),
        _ => None,
    });
    let minion = minion.expect("first hit on a boulder releases a minion");
    let state = session.state();
    let spawned = state.adversaries.iter().find(|a| a.id == minion).unwrap();
    assert!(!state.boulders[0].rect.overlaps(&spawned.body.rect));
    assert_eq!(state.boulders[0].hits, 1);
    assert!(!state.boulders[0].destroyed);
}

#[test]
fn boss_arena_state_survives_a_save_round_trip() {
    let mut session = session_for("boss_arena");
    run_frames(&mut session, 250, 0.0);
    let saved = session.serialize_state();

    let mut restored = Session::new(EscapeConfig::default());
    restored.apply_state(&saved);
    assert_eq!(restored.phase(), session.phase());
    assert_same_state(&session, &restored);
}
