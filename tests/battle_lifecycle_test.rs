//! Integration test: Battle session lifecycle
//!
//! Covers starting, stopping and toggling sessions, status and log queries,
//! zone changes and the errors a tick can report.

use std::sync::Arc;

use autobattle::battle::{BattleManager, LogKind, Repositories};
use autobattle::character::Character;
use autobattle::core::{BattleError, EngineConfig, ErrorKind};
use autobattle::monsters::MonsterTemplate;
use autobattle::repository::{
    InMemoryCharacterRepository, InMemorySkillRepository, InMemoryStrategyRepository,
    InMemoryZoneRepository,
};
use autobattle::zones::{Zone, STARTER_ZONE_ID};

const USER: u64 = 7;

struct Harness {
    manager: BattleManager,
    zones: Arc<InMemoryZoneRepository>,
}

fn harness(config: EngineConfig) -> Harness {
    let zones = Arc::new(InMemoryZoneRepository::with_starter_data());
    let skills = Arc::new(InMemorySkillRepository::with_warrior_catalogue());
    let manager = BattleManager::new(
        Repositories {
            characters: Arc::new(InMemoryCharacterRepository::new()),
            zones: zones.clone(),
            strategies: Arc::new(InMemoryStrategyRepository::new()),
            skills: skills.clone(),
            passives: skills,
        },
        config,
    );
    Harness { manager, zones }
}

fn hero() -> Character {
    let mut c = Character::new(1, USER, "Varian");
    c.max_hp = 500;
    c.hp = 500;
    c
}

fn training_pool() -> Vec<MonsterTemplate> {
    vec![MonsterTemplate {
        zone_id: "training".into(),
        hp: 10_000,
        physical_attack: 0,
        ..MonsterTemplate::new("dummy", "Training Dummy", 1)
    }]
}

// ============================================================================
// Start / stop / toggle
// ============================================================================

#[test]
fn test_unknown_user_reads_as_idle() {
    let h = harness(EngineConfig::seeded(1));
    let status = h.manager.get_battle_status(USER);
    assert!(!status.is_running);
    assert!(!status.is_resting);
    assert!(status.zone_id.is_none());
    assert!(status.enemies.is_empty());
    assert_eq!(status.battle_count, 0);
    assert!(h.manager.get_battle_logs(USER, 10).is_empty());
}

#[test]
fn test_start_is_idempotent() {
    let h = harness(EngineConfig::seeded(1));
    assert!(h.manager.start_battle(USER));
    assert!(h.manager.start_battle(USER));

    assert!(h.manager.get_battle_status(USER).is_running);
    let starts = h
        .manager
        .get_battle_logs(USER, 50)
        .iter()
        .filter(|e| e.message == "Auto-battle started")
        .count();
    assert_eq!(starts, 1);
}

#[test]
fn test_stop_and_toggle() {
    let h = harness(EngineConfig::seeded(1));

    // Stopping a session that never existed is a no-op
    h.manager.stop_battle(USER);
    assert!(h.manager.get_battle_logs(USER, 10).is_empty());

    h.manager.start_battle(USER);
    h.manager.stop_battle(USER);
    assert!(!h.manager.get_battle_status(USER).is_running);

    assert!(h.manager.toggle_battle(USER));
    assert!(h.manager.get_battle_status(USER).is_running);
    assert!(!h.manager.toggle_battle(USER));
    assert!(!h.manager.get_battle_status(USER).is_running);

    let last = h.manager.get_battle_logs(USER, 1);
    assert_eq!(last.len(), 1);
    assert_eq!(last[0].message, "Auto-battle paused");
    assert_eq!(last[0].kind, LogKind::System);
}

#[test]
fn test_sessions_are_per_user() {
    let h = harness(EngineConfig::seeded(1));
    h.manager.start_battle(USER);
    assert!(h.manager.get_battle_status(USER).is_running);
    assert!(!h.manager.get_battle_status(USER + 1).is_running);
}

// ============================================================================
// Log retention
// ============================================================================

#[test]
fn test_log_keeps_only_newest_entries() {
    let config = EngineConfig {
        log_capacity: 5,
        ..EngineConfig::seeded(1)
    };
    let h = harness(config);
    for _ in 0..10 {
        h.manager.toggle_battle(USER);
    }

    let logs = h.manager.get_battle_logs(USER, 100);
    assert_eq!(logs.len(), 5);
    // Ten toggles end on a stop
    assert_eq!(logs[4].message, "Auto-battle paused");
    assert_eq!(logs[3].message, "Auto-battle started");

    let tail = h.manager.get_battle_logs(USER, 2);
    assert_eq!(tail, logs[3..].to_vec());
}

// ============================================================================
// Zones
// ============================================================================

#[test]
fn test_change_zone_checks_level_band() {
    let h = harness(EngineConfig::seeded(1));

    let err = h.manager.change_zone(USER, "westfall", 1, None).unwrap_err();
    assert!(matches!(err, BattleError::LevelTooLow { min_level: 8, .. }));
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let err = h
        .manager
        .change_zone(USER, STARTER_ZONE_ID, 25, None)
        .unwrap_err();
    assert!(matches!(err, BattleError::LevelTooHigh { max_level: 10, .. }));

    let err = h.manager.change_zone(USER, "atlantis", 5, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(!err.is_retryable());

    // Nothing was recorded for the failed attempts
    assert!(h.manager.get_battle_status(USER).zone_id.is_none());

    h.manager.change_zone(USER, "westfall", 8, None).unwrap();
    let status = h.manager.get_battle_status(USER);
    assert_eq!(status.zone_id.as_deref(), Some("westfall"));
    let logs = h.manager.get_battle_logs(USER, 10);
    assert!(logs.iter().any(|e| e.message == "Entered Westfall"));
}

#[test]
fn test_change_zone_checks_faction() {
    let h = harness(EngineConfig::seeded(1));
    h.zones.add_zone(
        Zone {
            faction: Some("horde".into()),
            ..Zone::new("orgrimmar", "Orgrimmar", 1, 60)
        },
        training_pool(),
    );

    let err = h.manager.change_zone(USER, "orgrimmar", 10, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    let err = h
        .manager
        .change_zone(USER, "orgrimmar", 10, Some("alliance"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    h.manager
        .change_zone(USER, "orgrimmar", 10, Some("horde"))
        .unwrap();
    assert_eq!(
        h.manager.get_battle_status(USER).zone_id.as_deref(),
        Some("orgrimmar")
    );
}

#[test]
fn test_change_zone_drops_engagement() {
    let h = harness(EngineConfig::seeded(4));
    h.zones
        .add_zone(Zone::new("training", "Training Grounds", 1, 10), training_pool());
    let mut party = vec![hero()];

    h.manager.change_zone(USER, "training", 1, None).unwrap();
    h.manager.start_battle(USER);
    let result = h.manager.execute_tick(USER, &mut party).unwrap();
    assert!(!result.enemies.is_empty());
    assert_eq!(result.battle_count, 1);

    h.manager
        .change_zone(USER, STARTER_ZONE_ID, 1, None)
        .unwrap();
    let status = h.manager.get_battle_status(USER);
    assert!(status.enemies.is_empty());
    assert!(status.is_running);
    assert_eq!(status.zone_id.as_deref(), Some(STARTER_ZONE_ID));
}

// ============================================================================
// Tick errors
// ============================================================================

#[test]
fn test_empty_roster_is_rejected() {
    let h = harness(EngineConfig::seeded(1));
    h.manager.start_battle(USER);
    let err = h.manager.execute_tick(USER, &mut []).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[test]
fn test_idle_tick_changes_nothing() {
    let h = harness(EngineConfig::seeded(1));
    let mut party = vec![hero()];
    let result = h.manager.execute_tick(USER, &mut party).unwrap();
    assert!(!result.is_running);
    assert!(result.enemies.is_empty());
    assert_eq!(result.battle_count, 0);
    assert_eq!(party[0], hero());
}

#[test]
fn test_empty_spawn_pool_reports_not_found() {
    let h = harness(EngineConfig::seeded(1));
    h.zones
        .add_zone(Zone::new("void", "The Void", 1, 10), Vec::new());
    let mut party = vec![hero()];

    h.manager.change_zone(USER, "void", 1, None).unwrap();
    h.manager.start_battle(USER);
    let err = h.manager.execute_tick(USER, &mut party).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let status = h.manager.get_battle_status(USER);
    assert!(status.enemies.is_empty());
    assert_eq!(status.battle_count, 0);
    assert_eq!(status.round, 0);
    assert!(status.is_running);
    assert_eq!(party[0], hero());
}

#[test]
fn test_default_zone_is_used_without_change_zone() {
    let h = harness(EngineConfig::seeded(2).with_default_zone("westfall"));
    let mut party = vec![hero()];
    party[0].level = 12;

    h.manager.start_battle(USER);
    let result = h.manager.execute_tick(USER, &mut party).unwrap();
    assert!(!result.enemies.is_empty());
    let status = h.manager.get_battle_status(USER);
    assert_eq!(status.zone_id.as_deref(), Some("westfall"));
    assert!(result
        .logs
        .iter()
        .any(|e| e.kind == LogKind::Encounter && e.message.ends_with("in Westfall")));
}
