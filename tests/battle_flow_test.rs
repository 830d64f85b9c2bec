//! Integration test: Encounter, victory, rest and defeat
//!
//! Drives whole fights through `execute_tick_at` with a controlled clock
//! and checks rewards, rest timing and what gets written back.

use std::sync::Arc;

use autobattle::battle::{
    party_rest_seconds, BattleManager, BattleTickResult, LogKind, Repositories,
};
use autobattle::character::{Character, ResourceType};
use autobattle::core::EngineConfig;
use autobattle::monsters::MonsterTemplate;
use autobattle::repository::{
    CharacterRepository, InMemoryCharacterRepository, InMemorySkillRepository,
    InMemoryStrategyRepository, InMemoryZoneRepository,
};
use autobattle::skills::LearnedSkill;
use autobattle::zones::{Zone, STARTER_ZONE_ID};
use chrono::{DateTime, Duration, TimeZone, Utc};

const USER: u64 = 1;

struct Harness {
    manager: BattleManager,
    characters: Arc<InMemoryCharacterRepository>,
    skills: Arc<InMemorySkillRepository>,
}

fn harness(config: EngineConfig, pool: Vec<MonsterTemplate>, party: &[Character]) -> Harness {
    let zones = Arc::new(InMemoryZoneRepository::with_starter_data());
    zones.add_zone(Zone::new("training", "Training Grounds", 1, 10), pool);
    let characters = Arc::new(InMemoryCharacterRepository::with_characters(
        party.iter().cloned(),
    ));
    let skills = Arc::new(InMemorySkillRepository::with_warrior_catalogue());
    let manager = BattleManager::new(
        Repositories {
            characters: characters.clone(),
            zones,
            strategies: Arc::new(InMemoryStrategyRepository::new()),
            skills: skills.clone(),
            passives: skills.clone(),
        },
        config,
    );
    manager.change_zone(USER, "training", 1, None).unwrap();
    Harness {
        manager,
        characters,
        skills,
    }
}

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
}

fn hero(id: u64, hp: i32, attack: i32) -> Character {
    let mut c = Character::new(id, USER, format!("Hero{id}"));
    c.max_hp = hp;
    c.hp = hp;
    c.physical_attack = attack;
    c.dodge_rate = 0.0;
    c
}

/// Monsters that die to any hit and barely scratch back.
fn dummies(exp: i64, gold: i64) -> Vec<MonsterTemplate> {
    vec![MonsterTemplate {
        zone_id: "training".into(),
        hp: 1,
        physical_attack: 0,
        dodge_rate: 0.0,
        crit_rate: 0.0,
        exp_reward: exp,
        gold_min: gold,
        gold_max: gold,
        ..MonsterTemplate::new("dummy", "Training Dummy", 1)
    }]
}

/// One monster that hits far harder than anything can survive.
fn executioner() -> Vec<MonsterTemplate> {
    vec![MonsterTemplate {
        zone_id: "training".into(),
        hp: 100_000,
        physical_attack: 5_000,
        dodge_rate: 0.0,
        crit_rate: 0.0,
        ..MonsterTemplate::new("executioner", "Executioner", 1)
    }]
}

/// Tick once per second until `done` holds, returning the final result and
/// its timestamp.
fn run_until(
    h: &Harness,
    party: &mut [Character],
    mut now: DateTime<Utc>,
    max_ticks: usize,
    done: impl Fn(&BattleTickResult) -> bool,
) -> (BattleTickResult, DateTime<Utc>) {
    for _ in 0..max_ticks {
        now += Duration::seconds(1);
        let result = h.manager.execute_tick_at(USER, party, now).unwrap();
        if done(&result) {
            return (result, now);
        }
    }
    panic!("condition not reached within {max_ticks} ticks");
}

fn has_summary(result: &BattleTickResult) -> bool {
    result.logs.iter().any(|e| e.kind == LogKind::Summary)
}

// ============================================================================
// Encounter flow
// ============================================================================

#[test]
fn test_first_ticks_spawn_then_present() {
    let mut party = vec![hero(1, 1000, 500)];
    let h = harness(EngineConfig::seeded(11), dummies(10, 5), &party);
    h.manager.start_battle(USER);

    let first = h
        .manager
        .execute_tick_at(USER, &mut party, start_time())
        .unwrap();
    assert!((1..=3).contains(&first.enemies.len()));
    assert_eq!(first.round, 1);
    assert_eq!(first.battle_count, 1);
    assert!(first.logs.iter().any(|e| e.kind == LogKind::Encounter));

    // The next tick only presents the encounter
    let second = h
        .manager
        .execute_tick_at(USER, &mut party, start_time() + Duration::seconds(1))
        .unwrap();
    assert!(second.logs.is_empty());
    assert_eq!(second.enemies, first.enemies);
}

#[test]
fn test_rage_starts_each_fight_empty() {
    let mut warrior = hero(1, 1000, 500);
    warrior.resource_type = ResourceType::Rage;
    warrior.resource = 80;
    warrior.max_resource = 30;
    let mut party = vec![warrior];
    let h = harness(EngineConfig::seeded(3), dummies(1, 1), &party);
    h.manager.start_battle(USER);

    h.manager
        .execute_tick_at(USER, &mut party, start_time())
        .unwrap();
    assert_eq!(party[0].resource, 0);
    assert_eq!(party[0].max_resource, 100);
}

// ============================================================================
// Victory and rest
// ============================================================================

#[test]
fn test_victory_rewards_persist_and_rest() {
    let mut wounded = hero(1, 1000, 500);
    wounded.hp = 500;
    let mut party = vec![wounded];
    let h = harness(EngineConfig::seeded(5), dummies(10, 5), &party);
    h.manager.start_battle(USER);

    let (result, won_at) = run_until(&h, &mut party, start_time(), 60, has_summary);
    assert!(result
        .logs
        .iter()
        .any(|e| e.kind == LogKind::Summary && e.message.starts_with("Victory")));
    assert!(result.session_kills >= 1);
    assert_eq!(result.session_exp, 10 * result.session_kills as i64);
    assert_eq!(result.session_gold, 5 * result.session_kills as i64);
    assert_eq!(party[0].total_kills, result.session_kills);

    // Half HP missing at 0.5s per percent: at least 25s
    let seconds = party_rest_seconds(&party, h.manager.config());
    assert!(seconds >= 25.0);
    assert!(result.is_running);
    assert!(result.is_resting);
    assert_eq!(
        result.rest_until,
        Some(won_at + Duration::milliseconds((seconds * 1000.0).round() as i64))
    );

    assert_eq!(h.characters.battle_writes(), 1);
    let stored = h.characters.get_by_id(1).unwrap();
    assert_eq!(stored.total_kills, result.session_kills);
    assert_eq!(stored.exp, party[0].exp);

    // One second of regeneration: 2% of max HP
    let hp_before = party[0].hp;
    let partial = h
        .manager
        .execute_tick_at(USER, &mut party, won_at + Duration::seconds(1))
        .unwrap();
    assert!(partial.is_resting);
    assert_eq!(party[0].hp, hp_before + 20);

    // At the deadline everyone is topped up and the session resumes
    let until = result.rest_until.unwrap();
    let done = h.manager.execute_tick_at(USER, &mut party, until).unwrap();
    assert!(!done.is_resting);
    assert!(done.is_running);
    assert!(done.rest_until.is_none());
    assert_eq!(party[0].hp, party[0].max_hp);
    assert_eq!(party[0].resource, party[0].max_resource);
    assert_eq!(h.characters.battle_writes(), 2);
    assert!(done.logs.iter().any(|e| e.message.starts_with("Rest complete")));

    // And the next tick starts a new fight
    let next = h
        .manager
        .execute_tick_at(USER, &mut party, until + Duration::seconds(1))
        .unwrap();
    assert_eq!(next.battle_count, 2);
    assert!(!next.enemies.is_empty());
}

#[test]
fn test_no_rest_when_nothing_is_missing() {
    let mut party = vec![hero(1, 1000, 500)];
    let h = harness(EngineConfig::fast_rest().with_seed(9), dummies(1, 1), &party);
    h.manager.start_battle(USER);

    let (result, _) = run_until(&h, &mut party, start_time(), 60, has_summary);
    assert!(!result.is_resting);
    assert!(result.is_running);
}

#[test]
fn test_kill_exp_levels_up() {
    let mut party = vec![hero(1, 1000, 500)];
    let h = harness(EngineConfig::seeded(21), dummies(100, 1), &party);
    h.manager.start_battle(USER);

    let (result, _) = run_until(&h, &mut party, start_time(), 60, has_summary);
    assert!(party[0].level >= 2);
    assert!(party[0].max_hp >= 1010);
    assert!(party[0].exp < party[0].exp_to_next);
    assert_eq!(h.characters.get_by_id(1).unwrap().level, party[0].level);

    let logs = h.manager.get_battle_logs(USER, 200);
    assert!(logs
        .iter()
        .any(|e| e.kind == LogKind::Levelup && e.message == "Hero1 reached level 2!"));
    assert!(result.session_exp >= 100);
}

#[test]
fn test_failed_writes_are_reported_not_fatal() {
    let mut party = vec![hero(1, 1000, 500)];
    let h = harness(EngineConfig::seeded(13), dummies(1, 1), &party);
    h.characters.set_fail_writes(true);
    h.manager.start_battle(USER);

    let (result, _) = run_until(&h, &mut party, start_time(), 60, has_summary);
    assert!(result
        .logs
        .iter()
        .any(|e| e.kind == LogKind::Error && e.message == "Failed to save progress for Hero1"));
    assert_eq!(h.characters.battle_writes(), 0);
    assert!(result.is_running);
}

// ============================================================================
// Defeat and recovery
// ============================================================================

#[test]
fn test_party_wipe_stops_and_records_death() {
    let mut party = vec![hero(1, 10, 1)];
    let h = harness(EngineConfig::fast_rest().with_seed(17), executioner(), &party);
    h.manager.start_battle(USER);

    let (result, lost_at) = run_until(&h, &mut party, start_time(), 30, |r| !r.is_running);
    assert!(result.logs.iter().any(|e| e.kind == LogKind::Death));
    assert!(result
        .logs
        .iter()
        .any(|e| e.kind == LogKind::Summary && e.message.starts_with("Defeat")));
    assert!(result.enemies.is_empty());

    assert!(party[0].is_dead);
    assert_eq!(party[0].hp, 0);
    assert_eq!(party[0].total_deaths, 1);
    assert_eq!(h.characters.death_writes(), 1);
    let stored = h.characters.get_by_id(1).unwrap();
    assert!(stored.is_dead);
    assert_eq!(stored.total_deaths, 1);

    let status = h.manager.get_battle_status(USER);
    assert!(!status.is_running);
    assert!(!status.is_resting);

    // Restarting rests the fallen back to half HP before fighting again
    h.manager.start_battle(USER);
    let resting = h
        .manager
        .execute_tick_at(USER, &mut party, lost_at + Duration::seconds(1))
        .unwrap();
    assert!(resting.is_resting);
    assert!(resting.enemies.is_empty());

    let revived = h
        .manager
        .execute_tick_at(USER, &mut party, lost_at + Duration::seconds(2))
        .unwrap();
    assert!(!revived.is_resting);
    assert!(party[0].is_alive());
    assert!(!party[0].is_dead);
    assert_eq!(party[0].hp, 5);
}

#[test]
fn test_fallen_member_is_revived_before_next_fight() {
    let mut fallen = hero(2, 40, 10);
    fallen.hp = 0;
    fallen.is_dead = true;
    let mut party = vec![hero(1, 1000, 500), fallen];
    let h = harness(EngineConfig::fast_rest().with_seed(23), dummies(1, 1), &party);
    h.manager.start_battle(USER);

    let resting = h
        .manager
        .execute_tick_at(USER, &mut party, start_time())
        .unwrap();
    assert!(resting.is_resting);
    assert_eq!(resting.battle_count, 0);

    let back = h
        .manager
        .execute_tick_at(USER, &mut party, start_time() + Duration::seconds(1))
        .unwrap();
    assert!(!back.is_resting);
    assert!(party[1].is_alive());
    assert_eq!(party[1].hp, 20);

    let fight = h
        .manager
        .execute_tick_at(USER, &mut party, start_time() + Duration::seconds(2))
        .unwrap();
    assert_eq!(fight.battle_count, 1);
    assert!(!fight.enemies.is_empty());
}

// ============================================================================
// Skills in the fallback path
// ============================================================================

#[test]
fn test_learned_skill_is_used_without_strategy() {
    let mut party = vec![hero(1, 1000, 50)];
    let h = harness(EngineConfig::seeded(31), training_post(), &party);
    h.skills.learn_skill(1, LearnedSkill::new("heroic_strike", 1));
    h.manager.start_battle(USER);

    let (result, _) = run_until(&h, &mut party, start_time(), 30, |r| {
        r.logs.iter().any(|e| e.message.starts_with("Hero1 "))
    });
    assert!(result
        .logs
        .iter()
        .any(|e| e.message == "Hero1 uses Heroic Strike"));
    assert_eq!(party[0].resource, 35);
}

/// A sturdy target that hits for the minimum.
fn training_post() -> Vec<MonsterTemplate> {
    vec![MonsterTemplate {
        zone_id: "training".into(),
        hp: 100_000,
        physical_attack: 0,
        dodge_rate: 0.0,
        crit_rate: 0.0,
        ..MonsterTemplate::new("post", "Training Post", 1)
    }]
}

#[test]
fn test_spawns_stay_in_level_window() {
    let mut party = vec![hero(1, 1000, 500)];
    let h = harness(EngineConfig::seeded(2), dummies(1, 1), &party);
    h.manager.change_zone(USER, STARTER_ZONE_ID, 1, None).unwrap();
    h.manager.start_battle(USER);
    let result = h
        .manager
        .execute_tick_at(USER, &mut party, start_time())
        .unwrap();
    assert!(result
        .enemies
        .iter()
        .all(|e| ["kobold_vermin", "young_wolf"].contains(&e.template_id.as_str())));
}
