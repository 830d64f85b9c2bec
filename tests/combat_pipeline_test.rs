//! Integration test: Turn pipelines
//!
//! Drives single-enemy fights through `execute_tick_at` and checks the
//! incoming-hit pipeline (shields, resistances, low-HP reduction,
//! survival, counters, reflects), stuns on both sides, periodic kills,
//! monster guards and the per-battle statistics.

use std::sync::Arc;

use autobattle::battle::{BattleManager, BattleTickResult, Repositories};
use autobattle::buffs::{BuffSpec, BuffStat};
use autobattle::character::Character;
use autobattle::combat::DamageType;
use autobattle::core::EngineConfig;
use autobattle::monsters::{
    AiType, MonsterSkill, MonsterSkillDef, MonsterSkillType, MonsterTemplate,
};
use autobattle::passives::{PassiveDefinition, PassiveKind, PassiveStat};
use autobattle::repository::{
    InMemoryCharacterRepository, InMemorySkillRepository, InMemoryStrategyRepository,
    InMemoryZoneRepository,
};
use autobattle::skills::{LearnedSkill, SkillKind};
use autobattle::zones::Zone;
use chrono::{DateTime, Duration, TimeZone, Utc};

const USER: u64 = 1;
const LONG: u32 = 10_000;

/// One running fight with its own clock and every log line seen so far.
struct Fight {
    manager: BattleManager,
    now: DateTime<Utc>,
    logs: Vec<String>,
}

impl Fight {
    fn tick(&mut self, party: &mut [Character]) -> BattleTickResult {
        self.now += Duration::seconds(1);
        let result = self.manager.execute_tick_at(USER, party, self.now).unwrap();
        self.logs
            .extend(result.logs.iter().map(|e| e.message.clone()));
        result
    }

    fn run(&mut self, party: &mut [Character], ticks: usize) -> BattleTickResult {
        let mut last = self.tick(party);
        for _ in 1..ticks {
            last = self.tick(party);
        }
        last
    }

    fn run_until(
        &mut self,
        party: &mut [Character],
        max_ticks: usize,
        done: impl Fn(&BattleTickResult) -> bool,
    ) -> BattleTickResult {
        for _ in 0..max_ticks {
            let result = self.tick(party);
            if done(&result) {
                return result;
            }
        }
        panic!("condition not reached within {max_ticks} ticks");
    }

    fn count(&self, pred: impl Fn(&str) -> bool) -> usize {
        self.logs.iter().filter(|m| pred(m.as_str())).count()
    }

    fn position(&self, pred: impl Fn(&str) -> bool) -> Option<usize> {
        self.logs.iter().position(|m| pred(m.as_str()))
    }
}

fn says(result: &BattleTickResult, prefix: &str) -> bool {
    result.logs.iter().any(|e| e.message.starts_with(prefix))
}

fn single_enemy(seed: u64) -> EngineConfig {
    EngineConfig {
        party_size_spread: 0,
        ..EngineConfig::seeded(seed)
    }
}

/// Build the engine around `pool`, let `setup` learn passives, then start
/// and spawn. Returns the fight just after the encounter tick.
fn fight(
    config: EngineConfig,
    pool: Vec<MonsterTemplate>,
    party: &mut [Character],
    setup: impl FnOnce(&InMemorySkillRepository),
) -> Fight {
    let zones = Arc::new(InMemoryZoneRepository::with_starter_data());
    zones.add_zone(Zone::new("training", "Training Grounds", 1, 10), pool);
    let skills = Arc::new(InMemorySkillRepository::with_warrior_catalogue());
    setup(skills.as_ref());
    let manager = BattleManager::new(
        Repositories {
            characters: Arc::new(InMemoryCharacterRepository::with_characters(
                party.iter().cloned(),
            )),
            zones,
            strategies: Arc::new(InMemoryStrategyRepository::new()),
            skills: skills.clone(),
            passives: skills,
        },
        config,
    );
    manager.change_zone(USER, "training", 1, None).unwrap();
    manager.start_battle(USER);

    let mut fight = Fight {
        manager,
        now: Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap(),
        logs: Vec::new(),
    };
    let spawned = fight.tick(party);
    assert_eq!(spawned.enemies.len(), 1);
    fight
}

fn no_passives(_: &InMemorySkillRepository) {}

/// A hero with no defenses, dodge or crit, so every number is exact.
fn hero(hp: i32, attack: i32) -> Character {
    let mut c = Character::new(1, USER, "Hero1");
    c.max_hp = hp;
    c.hp = hp;
    c.physical_attack = attack;
    c.physical_defense = 0;
    c.magic_defense = 0;
    c.dodge_rate = 0.0;
    c.phys_crit_rate = 0.0;
    c.spell_crit_rate = 0.0;
    c
}

/// A monster that never dodges or crits and hits for exactly `attack`.
fn brute(hp: i32, attack: i32) -> MonsterTemplate {
    MonsterTemplate {
        zone_id: "training".into(),
        hp,
        physical_attack: attack,
        physical_defense: 0,
        magic_defense: 0,
        dodge_rate: 0.0,
        crit_rate: 0.0,
        ..MonsterTemplate::new("brute", "Brute", 1)
    }
}

fn stat_passive(id: &str, stat: PassiveStat, value: f64) -> PassiveDefinition {
    PassiveDefinition {
        id: id.into(),
        name: id.into(),
        kind: PassiveKind::StatMod,
        stat: Some(stat),
        base_value: value,
        level_scaling: 0.0,
    }
}

fn enemy_id(fight: &Fight) -> String {
    fight.manager.get_battle_status(USER).enemies[0].id.clone()
}

// ============================================================================
// Monster guard
// ============================================================================

#[test]
fn test_monster_guard_refreshes_instead_of_compounding() {
    let harden = MonsterSkill::new(
        MonsterSkillDef {
            id: "harden".into(),
            name: "Harden".into(),
            kind: SkillKind::Buff,
            damage_type: DamageType::Physical,
            base_value: 50.0,
            resource_cost: 0,
        },
        MonsterSkillType::Defense,
        1,
        1,
    );
    let golem = MonsterTemplate {
        physical_defense: 10,
        ai_type: AiType::Defensive,
        skills: vec![harden],
        ..brute(100_000, 0)
    };
    let mut party = vec![hero(10_000, 40)];
    let mut fight = fight(single_enemy(3), vec![golem], &mut party, no_passives);
    let id = enemy_id(&fight);

    let last = fight.run(&mut party, 60);
    assert!(fight.count(|m| m == "Brute uses Harden and hardens its defenses") >= 20);
    assert_eq!(last.enemies[0].physical_defense, 10);
    assert_eq!(fight.manager.buffs().enemy_defense_modifier(&id), 50.0);
    assert_eq!(fight.manager.buffs().get_enemy_debuffs(&id).len(), 1);

    // 40 - 10 unguarded, 40 - 15 once the guard is up
    let first_guard = fight.position(|m| m.contains("hardens")).unwrap();
    let hits: Vec<&String> = fight.logs[first_guard..]
        .iter()
        .filter(|m| m.starts_with("Hero1 attacks"))
        .collect();
    assert!(!hits.is_empty());
    assert!(hits.iter().all(|m| m.as_str() == "Hero1 attacks Brute for 25"));
}

// ============================================================================
// Counters and reflects
// ============================================================================

#[test]
fn test_revenge_procs_near_its_chance() {
    let mut party = vec![hero(10_000, 1)];
    let mut fight = fight(single_enemy(41), vec![brute(100_000, 1)], &mut party, |repo| {
        repo.learn_passive(1, LearnedSkill::new("revenge", 1));
    });

    fight.run(&mut party, 220);
    let hits = fight.count(|m| m.starts_with("Brute's attack hits Hero1"));
    let procs = fight.count(|m| m.starts_with("Hero1 retaliates"));
    assert!(hits >= 90, "only {hits} hits");
    // 10% chance per hit
    assert!(procs * 100 >= hits * 3, "{procs} procs over {hits} hits");
    assert!(procs * 100 <= hits * 20, "{procs} procs over {hits} hits");
}

#[test]
fn test_retaliation_buff_counters_every_hit() {
    let mut party = vec![hero(10_000, 40)];
    let mut fight = fight(single_enemy(5), vec![brute(100_000, 20)], &mut party, no_passives);
    fight.manager.buffs().apply_buff(
        1,
        BuffSpec::buff("retaliation", "Retaliation", BuffStat::CounterAttack, 50.0, LONG),
    );

    fight.run(&mut party, 20);
    let hits = fight.count(|m| m.starts_with("Brute's attack hits Hero1"));
    assert!(hits > 0);
    assert_eq!(
        fight.count(|m| m == "Hero1 counter-attacks 20 damage to Brute"),
        hits
    );
}

#[test]
fn test_reflect_buff_and_passive_add_up() {
    let mut party = vec![hero(10_000, 1)];
    let mut fight = fight(single_enemy(7), vec![brute(100_000, 20)], &mut party, |repo| {
        repo.learn_passive(1, LearnedSkill::new("spell_reflection", 1));
    });
    fight.manager.buffs().apply_buff(
        1,
        BuffSpec::buff("shield_reflection", "Shield Reflection", BuffStat::Reflect, 30.0, LONG),
    );

    fight.run_until(&mut party, 20, |r| says(r, "Hero1 reflects"));
    // (30% + 5%) of 20
    assert!(fight.logs.iter().any(|m| m == "Hero1 reflects 7 damage to Brute"));
}

#[test]
fn test_reflect_passive_alone() {
    let mut party = vec![hero(10_000, 1)];
    let mut fight = fight(single_enemy(8), vec![brute(100_000, 20)], &mut party, |repo| {
        repo.learn_passive(1, LearnedSkill::new("spell_reflection", 3));
    });

    fight.run_until(&mut party, 20, |r| says(r, "Hero1 reflects"));
    // 10% of 20
    assert!(fight.logs.iter().any(|m| m == "Hero1 reflects 2 damage to Brute"));
}

// ============================================================================
// Mitigation
// ============================================================================

#[test]
fn test_survival_fires_once_per_battle() {
    let mut party = vec![hero(100, 1)];
    let mut fight = fight(single_enemy(9), vec![brute(100_000, 5_000)], &mut party, |repo| {
        repo.learn_passive(1, LearnedSkill::new("die_by_the_sword", 1));
    });

    let saved = fight.run_until(&mut party, 20, |r| says(r, "Hero1 refuses to fall!"));
    assert!(saved.is_running);
    assert_eq!(party[0].hp, 1);
    assert!(fight.logs.iter().any(|m| m == "Brute's attack hits Hero1 for 99"));

    let lost = fight.run_until(&mut party, 20, |r| !r.is_running);
    assert!(says(&lost, "Hero1 has fallen"));
    assert_eq!(fight.count(|m| m == "Hero1 refuses to fall!"), 1);
    assert!(party[0].is_dead);
}

#[test]
fn test_last_stand_threshold_scales_with_level() {
    // 28% HP: under the rank 1 threshold (30%), over rank 2 (25%)
    let mut party = vec![hero(1000, 1)];
    party[0].hp = 280;
    let mut rank_one = fight(single_enemy(12), vec![brute(100_000, 100)], &mut party, |repo| {
        repo.learn_passive(1, LearnedSkill::new("last_bastion", 1));
    });
    rank_one.run_until(&mut party, 20, |r| says(r, "Brute's attack hits"));
    assert_eq!(
        rank_one.position(|m| m.starts_with("Brute's attack hits")),
        rank_one.position(|m| m == "Brute's attack hits Hero1 for 75")
    );

    let mut party = vec![hero(1000, 1)];
    party[0].hp = 280;
    let mut rank_two = fight(single_enemy(12), vec![brute(100_000, 100)], &mut party, |repo| {
        repo.learn_passive(1, LearnedSkill::new("last_bastion", 2));
    });
    rank_two.run_until(&mut party, 20, |r| says(r, "Brute's attack hits"));
    assert!(rank_two.logs.iter().any(|m| m == "Brute's attack hits Hero1 for 100"));

    // Now at 18%: 35% off
    rank_two.run_until(&mut party, 20, |r| says(r, "Brute's attack hits"));
    assert!(rank_two.logs.iter().any(|m| m == "Brute's attack hits Hero1 for 65"));
}

#[test]
fn test_shield_absorbs_before_hp() {
    let mut party = vec![hero(1000, 1)];
    let mut fight = fight(single_enemy(14), vec![brute(100_000, 20)], &mut party, no_passives);
    fight.manager.buffs().apply_buff(
        1,
        BuffSpec::buff("unbreakable_barrier", "Barrier", BuffStat::Shield, 30.0, LONG),
    );

    fight.run_until(&mut party, 20, |r| says(r, "Brute's attack hits"));
    assert!(fight.logs.iter().any(|m| m == "Brute's attack hits Hero1 for 0, 20 absorbed"));
    assert_eq!(party[0].hp, 1000);

    let second = fight.run_until(&mut party, 20, |r| says(r, "Brute's attack hits"));
    assert!(fight.logs.iter().any(|m| m == "Brute's attack hits Hero1 for 10, 10 absorbed"));
    assert_eq!(party[0].hp, 990);
    assert!(!fight.manager.buffs().has_buff(1, "unbreakable_barrier"));

    let stats = second.battle_stats.get(1).unwrap();
    assert_eq!(stats.damage_absorbed, 30);
    assert_eq!(stats.damage_taken, 10);
    assert_eq!(stats.hits_taken, 2);
}

#[test]
fn test_toughness_shields_and_resists_spells() {
    let caster = MonsterTemplate {
        attack_type: DamageType::Fire,
        magic_attack: 100,
        ..brute(100_000, 0)
    };
    let mut party = vec![hero(1000, 1)];
    let mut fight = fight(single_enemy(15), vec![caster], &mut party, |repo| {
        repo.learn_passive(1, LearnedSkill::new("toughness", 1));
    });
    // 5% of max HP as a shield for the fight
    assert!(fight.logs.iter().any(|m| m == "Hero1 is shielded for 50"));
    assert_eq!(fight.manager.buffs().get_buff_value(1, BuffStat::Shield), 50.0);

    // 100 fire, 5% resisted, then the shield soaks 50
    fight.run_until(&mut party, 20, |r| says(r, "Brute's attack hits"));
    assert!(fight.logs.iter().any(|m| m == "Brute's attack hits Hero1 for 45, 50 absorbed"));
    assert_eq!(party[0].hp, 955);
}

// ============================================================================
// Stuns
// ============================================================================

#[test]
fn test_stunned_character_skips_turn() {
    let mut party = vec![hero(1000, 10)];
    let mut fight = fight(single_enemy(16), vec![brute(100_000, 1)], &mut party, no_passives);
    fight
        .manager
        .buffs()
        .apply_buff(1, BuffSpec::debuff("stun", "Stunned", BuffStat::Stun, 1.0, 1));

    let stunned = fight.run_until(&mut party, 10, |r| says(r, "Hero1 is stunned and cannot act"));
    assert!(!says(&stunned, "Hero1 attacks"));
    assert!(!fight.manager.buffs().has_buff_stat(1, BuffStat::Stun));

    fight.run_until(&mut party, 10, |r| says(r, "Hero1 attacks"));
    assert!(fight.position(|m| m.starts_with("Hero1 attacks"))
        > fight.position(|m| m == "Hero1 is stunned and cannot act"));
}

#[test]
fn test_stunned_monster_skips_turns() {
    let mut party = vec![hero(1000, 1)];
    let mut fight = fight(single_enemy(17), vec![brute(100_000, 5)], &mut party, no_passives);
    let id = enemy_id(&fight);
    fight
        .manager
        .buffs()
        .apply_enemy_debuff(&id, BuffSpec::debuff("stun", "Stunned", BuffStat::Stun, 1.0, 2));

    fight.run_until(&mut party, 20, |r| says(r, "Brute's attack hits"));
    let skips: Vec<usize> = fight
        .logs
        .iter()
        .enumerate()
        .filter(|(_, m)| m.as_str() == "Brute is stunned and cannot act")
        .map(|(i, _)| i)
        .collect();
    assert_eq!(skips.len(), 2);
    let first_hit = fight.position(|m| m.starts_with("Brute's attack hits")).unwrap();
    assert!(skips.iter().all(|&i| i < first_hit));
    assert!(!fight.manager.buffs().is_enemy_stunned(&id));
}

#[test]
fn test_control_skill_stuns_the_target() {
    let mut party = vec![hero(1000, 1)];
    let mut fight = fight(single_enemy(18), vec![basher()], &mut party, no_passives);

    fight.run_until(&mut party, 20, |r| says(r, "Hero1 is stunned and cannot act"));
    assert!(fight.logs.iter().any(|m| m == "Hero1 is stunned"));
    assert!(fight.logs.iter().any(|m| m.starts_with("Brute's Bash hits Hero1")));
    let stats = fight.manager.get_battle_status(USER).battle_stats;
    assert!(stats.get(1).unwrap().cc_received >= 1);
}

#[test]
fn test_cc_immunity_blocks_control_stun() {
    let mut party = vec![hero(1000, 1)];
    let mut fight = fight(single_enemy(18), vec![basher()], &mut party, no_passives);
    fight.manager.buffs().apply_buff(
        1,
        BuffSpec::buff("avatar_cc_immune", "Avatar", BuffStat::CcImmune, 1.0, LONG),
    );

    let last = fight.run(&mut party, 20);
    assert!(fight.count(|m| m.starts_with("Brute's Bash hits Hero1")) > 0);
    assert_eq!(fight.count(|m| m.starts_with("Hero1 is stunned")), 0);
    assert!(fight.count(|m| m.starts_with("Hero1 attacks")) > 0);
    assert_eq!(last.battle_stats.get(1).unwrap().cc_received, 0);
}

/// Bashes every turn; each bash stuns for a round.
fn basher() -> MonsterTemplate {
    let bash = MonsterSkill::new(
        MonsterSkillDef {
            id: "bash".into(),
            name: "Bash".into(),
            kind: SkillKind::Attack,
            damage_type: DamageType::Physical,
            base_value: 0.0,
            resource_cost: 0,
        },
        MonsterSkillType::Control,
        1,
        0,
    );
    MonsterTemplate {
        skills: vec![bash],
        ..brute(100_000, 5)
    }
}

// ============================================================================
// Periodic kills
// ============================================================================

#[test]
fn test_periodic_kill_credits_the_party() {
    let mut party = vec![hero(1000, 1)];
    let mut fight = fight(single_enemy(19), vec![brute(50, 1)], &mut party, no_passives);
    let id = enemy_id(&fight);
    fight.manager.buffs().apply_enemy_debuff(
        &id,
        BuffSpec::dot("dot_bleed", "Bleed", 1000.0, 5, 0, DamageType::Physical),
    );

    let won = fight.run_until(&mut party, 20, |r| says(r, "Victory"));
    assert!(fight.logs.iter().any(|m| m.starts_with("Brute suffers")));
    assert!(fight.logs.iter().any(|m| m.starts_with("Brute is slain! Hero1 gains")));
    assert_eq!(party[0].total_kills, 1);
    assert_eq!(won.session_kills, 1);
    assert_eq!(won.battle_stats.get(1).unwrap().kills, 1);
    assert!(fight.manager.buffs().get_enemy_debuffs(&id).is_empty());
}

// ============================================================================
// Dodge and crit passives
// ============================================================================

#[test]
fn test_dodge_passive_dodges_and_is_counted() {
    let mut party = vec![hero(10_000, 1)];
    let mut fight = fight(single_enemy(21), vec![brute(100_000, 1)], &mut party, |repo| {
        repo.add_passive(stat_passive("evasion", PassiveStat::DodgeRate, 50.0));
        repo.learn_passive(1, LearnedSkill::new("evasion", 1));
    });

    let last = fight.run(&mut party, 200);
    let dodges = fight.count(|m| m == "Hero1 dodges Brute's attack");
    let hits = fight.count(|m| m.starts_with("Brute's attack hits Hero1"));
    let swings = dodges + hits;
    assert!(swings >= 80);
    assert!(dodges * 4 >= swings && dodges * 4 <= swings * 3, "{dodges} of {swings}");
    assert_eq!(last.battle_stats.get(1).unwrap().dodges as usize, dodges);
}

#[test]
fn test_school_crit_passive_only_boosts_its_school() {
    let mut party = vec![hero(10_000, 10)];
    let mut physical = fight(single_enemy(22), vec![brute(100_000, 1)], &mut party, |repo| {
        repo.add_passive(stat_passive("precision", PassiveStat::PhysCritRate, 50.0));
        repo.learn_passive(1, LearnedSkill::new("precision", 1));
    });
    physical.run(&mut party, 200);
    let swings = physical.count(|m| m.starts_with("Hero1 attacks"));
    let crits = physical.count(|m| m == "Hero1 attacks Brute for 15 (critical)");
    assert!(swings >= 80);
    assert!(crits * 4 >= swings && crits * 4 <= swings * 3, "{crits} of {swings}");

    let mut party = vec![hero(10_000, 10)];
    let mut spell = fight(single_enemy(22), vec![brute(100_000, 1)], &mut party, |repo| {
        repo.add_passive(stat_passive("arcane_focus", PassiveStat::SpellCritRate, 50.0));
        repo.learn_passive(1, LearnedSkill::new("arcane_focus", 1));
    });
    spell.run(&mut party, 100);
    assert!(spell.count(|m| m.starts_with("Hero1 attacks")) > 0);
    assert_eq!(spell.count(|m| m.ends_with("(critical)")), 0);
}

// ============================================================================
// Battle statistics
// ============================================================================

#[test]
fn test_battle_stats_follow_the_fight() {
    let config = EngineConfig {
        party_size_spread: 0,
        ..EngineConfig::fast_rest().with_seed(23)
    };
    let mut party = vec![hero(1000, 10)];
    let mut fight = fight(config, vec![brute(30, 5)], &mut party, no_passives);

    let won = fight.run_until(&mut party, 20, |r| says(r, "Victory"));
    let hits_taken = fight.count(|m| m.starts_with("Brute's attack hits Hero1"));
    let stats = won.battle_stats.get(1).unwrap();
    assert_eq!(stats.damage_dealt, 30);
    assert_eq!(stats.physical_damage_dealt, 30);
    assert_eq!(stats.kills, 1);
    assert_eq!(stats.deaths, 0);
    assert_eq!(stats.hits_taken as usize, hits_taken);
    assert_eq!(stats.damage_taken, 5 * hits_taken as i64);
    assert!(says(&won, "Top damage: Hero1 (30)"));
    assert_eq!(fight.manager.get_battle_status(USER).battle_stats, won.battle_stats);

    // The next encounter starts from zero
    let next = fight.run_until(&mut party, 5, |r| says(r, "Encountered"));
    assert_eq!(next.battle_stats.get(1), Some(&Default::default()));
}
