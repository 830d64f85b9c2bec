//! Integration test: Strategy-driven turns
//!
//! Runs characters with stored battle strategies against a training post
//! and checks which action the engine took on their first turn.

use std::sync::Arc;

use autobattle::battle::{BattleManager, BattleTickResult, Repositories};
use autobattle::character::Character;
use autobattle::core::EngineConfig;
use autobattle::monsters::MonsterTemplate;
use autobattle::repository::{
    InMemoryCharacterRepository, InMemorySkillRepository, InMemoryStrategyRepository,
    InMemoryZoneRepository,
};
use autobattle::skills::LearnedSkill;
use autobattle::strategy::{
    BattleStrategy, ConditionKind, ConditionalRule, Operator, RuleAction, RuleCondition,
};
use autobattle::zones::Zone;

const USER: u64 = 3;

struct Harness {
    manager: BattleManager,
    strategies: Arc<InMemoryStrategyRepository>,
    skills: Arc<InMemorySkillRepository>,
}

fn harness(seed: u64) -> Harness {
    let zones = Arc::new(InMemoryZoneRepository::new());
    zones.add_zone(
        Zone::new("training", "Training Grounds", 1, 10),
        vec![MonsterTemplate {
            zone_id: "training".into(),
            hp: 100_000,
            physical_attack: 0,
            dodge_rate: 0.0,
            crit_rate: 0.0,
            ..MonsterTemplate::new("post", "Training Post", 1)
        }],
    );
    let strategies = Arc::new(InMemoryStrategyRepository::new());
    let skills = Arc::new(InMemorySkillRepository::with_warrior_catalogue());
    let manager = BattleManager::new(
        Repositories {
            characters: Arc::new(InMemoryCharacterRepository::new()),
            zones,
            strategies: strategies.clone(),
            skills: skills.clone(),
            passives: skills.clone(),
        },
        EngineConfig::seeded(seed).with_default_zone("training"),
    );
    Harness {
        manager,
        strategies,
        skills,
    }
}

fn varian(hp: i32, resource: i32) -> Character {
    let mut c = Character::new(1, USER, "Varian");
    c.max_hp = 100;
    c.hp = hp;
    c.max_resource = 100;
    c.resource = resource;
    c.physical_attack = 40;
    c.dodge_rate = 0.0;
    c
}

fn active(mut strategy: BattleStrategy) -> BattleStrategy {
    strategy.is_active = true;
    strategy
}

/// Ticks until Varian has acted and returns that tick's result.
fn first_action(h: &Harness, party: &mut [Character]) -> BattleTickResult {
    h.manager.start_battle(USER);
    for _ in 0..30 {
        let result = h.manager.execute_tick(USER, party).unwrap();
        if result.logs.iter().any(|e| e.message.starts_with("Varian ")) {
            return result;
        }
    }
    panic!("Varian never acted");
}

fn used(result: &BattleTickResult, skill_name: &str) -> bool {
    let expected = format!("Varian uses {skill_name}");
    result.logs.iter().any(|e| e.message == expected)
}

fn attacked(result: &BattleTickResult) -> bool {
    result
        .logs
        .iter()
        .any(|e| e.message.starts_with("Varian attacks Training Post"))
}

// ============================================================================
// Resource gate
// ============================================================================

#[test]
fn test_low_resource_falls_back_to_normal_attack() {
    let h = harness(1);
    h.skills.learn_skill(1, LearnedSkill::new("heroic_strike", 1));
    let mut strategy = active(BattleStrategy::default_for(1, "Gate"));
    strategy.skill_priority = vec!["heroic_strike".into()];
    h.strategies.set_active(strategy);

    // 10% resource is under the 20% gate even though the skill is affordable
    let mut party = vec![varian(100, 15)];
    let result = first_action(&h, &mut party);
    assert!(attacked(&result));
    assert!(!used(&result, "Heroic Strike"));
    assert_eq!(party[0].resource, 15);
}

#[test]
fn test_skill_priority_above_the_gate() {
    let h = harness(2);
    h.skills.learn_skill(1, LearnedSkill::new("heroic_strike", 1));
    let mut strategy = active(BattleStrategy::default_for(1, "Gate"));
    strategy.skill_priority = vec!["heroic_strike".into()];
    h.strategies.set_active(strategy);

    let mut party = vec![varian(100, 60)];
    let result = first_action(&h, &mut party);
    assert!(used(&result, "Heroic Strike"));
    assert_eq!(party[0].resource, 45);
}

#[test]
fn test_urgent_rule_bypasses_the_gate() {
    let h = harness(3);
    h.skills.learn_skill(1, LearnedSkill::new("heroic_strike", 1));
    h.skills.learn_skill(1, LearnedSkill::new("shield_wall", 1));
    // Starter strategy: shield wall under 30% HP
    h.strategies
        .set_active(active(BattleStrategy::default_for(1, "Default")));

    let mut party = vec![varian(20, 0)];
    let result = first_action(&h, &mut party);
    assert!(used(&result, "Shield Wall"));
    assert!(h.manager.buffs().has_buff(1, "shield_wall"));
}

// ============================================================================
// Rules
// ============================================================================

#[test]
fn test_first_matching_rule_wins() {
    let h = harness(4);
    for id in ["heroic_strike", "battle_shout"] {
        h.skills.learn_skill(1, LearnedSkill::new(id, 1));
    }
    let mut strategy = active(BattleStrategy::default_for(1, "Rules"));
    strategy.conditional_rules = vec![
        ConditionalRule::new(
            "shout_first",
            1,
            RuleCondition::compare(ConditionKind::BattleRound, Operator::Ge, 1.0),
            RuleAction::use_skill("battle_shout"),
        ),
        ConditionalRule::new(
            "strike",
            2,
            RuleCondition::always(),
            RuleAction::use_skill("heroic_strike"),
        ),
    ];
    h.strategies.set_active(strategy);

    let mut party = vec![varian(100, 100)];
    let result = first_action(&h, &mut party);
    assert!(used(&result, "Battle Shout"));
    assert!(!used(&result, "Heroic Strike"));
    assert!(h.manager.buffs().has_buff(1, "battle_shout"));
}

#[test]
fn test_normal_attack_rule() {
    let h = harness(5);
    h.skills.learn_skill(1, LearnedSkill::new("heroic_strike", 1));
    let mut strategy = active(BattleStrategy::default_for(1, "Frugal"));
    strategy.conditional_rules = vec![ConditionalRule::new(
        "save",
        1,
        RuleCondition::always(),
        RuleAction::NormalAttack {
            comment: "save resource".into(),
        },
    )];
    strategy.skill_priority = vec!["heroic_strike".into()];
    h.strategies.set_active(strategy);

    let mut party = vec![varian(100, 100)];
    let result = first_action(&h, &mut party);
    assert!(attacked(&result));
    assert_eq!(party[0].resource, 100);
}

#[test]
fn test_inactive_strategy_is_ignored() {
    let h = harness(6);
    let mut strategy = BattleStrategy::default_for(1, "Off");
    strategy.conditional_rules = vec![ConditionalRule::new(
        "save",
        1,
        RuleCondition::always(),
        RuleAction::NormalAttack {
            comment: String::new(),
        },
    )];
    h.strategies.set_active(strategy);
    h.skills.learn_skill(1, LearnedSkill::new("heroic_strike", 1));

    // Without an active strategy the built-in selection spends resource
    let mut party = vec![varian(100, 100)];
    let result = first_action(&h, &mut party);
    assert!(used(&result, "Heroic Strike"));
}

#[test]
fn test_strategy_from_json() {
    let h = harness(7);
    h.skills.learn_skill(1, LearnedSkill::new("heroic_strike", 1));
    let strategy: BattleStrategy = serde_json::from_str(
        r#"{
            "character_id": 1,
            "name": "Stored",
            "is_active": true,
            "resource_threshold": 0,
            "conditional_rules": [
                {
                    "id": "rule_1",
                    "priority": 1,
                    "condition": {"type": "target_hp_percent", "operator": ">", "value": 50},
                    "action": {"type": "use_skill", "skill_id": "heroic_strike"}
                }
            ]
        }"#,
    )
    .unwrap();
    h.strategies.set_active(strategy);

    let mut party = vec![varian(100, 100)];
    let result = first_action(&h, &mut party);
    assert!(used(&result, "Heroic Strike"));
}
