//! Built-in warrior skill catalogue.

use super::types::*;
use crate::buffs::BuffStat;
use crate::combat::DamageType;

fn attack(id: &str, name: &str, cost: i32, cooldown: u32, ratio: f64) -> SkillDefinition {
    SkillDefinition {
        id: id.into(),
        name: name.into(),
        kind: SkillKind::Attack,
        target: SkillTarget::Enemy,
        damage_type: DamageType::Physical,
        resource_cost: cost,
        cooldown,
        formula: DamageFormula::Scaled { ratio },
        level_scaling: 0.1,
        level_cooldowns: Vec::new(),
        ignores_dodge: false,
        use_condition: None,
        effects: Vec::new(),
    }
}

fn self_cast(id: &str, name: &str, cost: i32, cooldown: u32, effects: Vec<SkillEffect>) -> SkillDefinition {
    SkillDefinition {
        kind: SkillKind::Buff,
        target: SkillTarget::SelfOnly,
        formula: DamageFormula::NoDamage,
        level_scaling: 0.0,
        effects,
        ..attack(id, name, cost, cooldown, 0.0)
    }
}

fn self_buff(effect_id: &str, name: &str, stat: BuffStat, value: f64, duration: u32) -> SkillEffect {
    SkillEffect::SelfBuff {
        effect_id: effect_id.into(),
        name: name.into(),
        stat,
        value,
        duration,
    }
}

/// Every skill a warrior can learn.
pub fn warrior_skills() -> Vec<SkillDefinition> {
    vec![
        attack("heroic_strike", "Heroic Strike", 15, 0, 1.5),
        SkillDefinition {
            effects: vec![SkillEffect::TargetDebuff {
                effect_id: "mortal_strike".into(),
                name: "Mortal Wound".into(),
                stat: BuffStat::HealingReceived,
                value: -50.0,
                duration: 3,
            }],
            ..attack("mortal_strike", "Mortal Strike", 30, 2, 2.0)
        },
        SkillDefinition {
            use_condition: Some(SkillUseCondition::TargetHpBelow { percent: 20.0 }),
            level_scaling: 0.5,
            ..attack("execute", "Execute", 20, 0, 3.5)
        },
        SkillDefinition {
            target: SkillTarget::EnemyAll,
            effects: vec![SkillEffect::AllEnemiesDebuff {
                effect_id: "whirlwind_armor".into(),
                name: "Sundered".into(),
                stat: BuffStat::Defense,
                value: 10.0,
                duration: 2,
            }],
            ..attack("whirlwind", "Whirlwind", 25, 3, 0.8)
        },
        SkillDefinition {
            effects: vec![SkillEffect::HealDamagePercent { percent: 20.0 }],
            ..attack("bloodthirst", "Bloodthirst", 20, 2, 1.3)
        },
        SkillDefinition {
            effects: vec![SkillEffect::TargetDot {
                effect_id: "dot_bleed".into(),
                name: "Rend".into(),
                attack_percent: 25.0,
                duration: 4,
                interval: 1,
            }],
            ..attack("rend", "Rend", 10, 0, 0.5)
        },
        SkillDefinition {
            effects: vec![SkillEffect::TargetDebuff {
                effect_id: "sunder_armor".into(),
                name: "Sunder Armor".into(),
                stat: BuffStat::Defense,
                value: 20.0,
                duration: 4,
            }],
            ..attack("sunder_armor", "Sunder Armor", 10, 0, 0.6)
        },
        SkillDefinition {
            formula: DamageFormula::AttackDefenseBlend {
                attack: 1.0,
                defense: 0.5,
            },
            ..attack("shield_slam", "Shield Slam", 15, 2, 0.0)
        },
        SkillDefinition {
            ignores_dodge: true,
            effects: vec![
                SkillEffect::ResourceGain { amount: 15 },
                SkillEffect::Stun {
                    chance: 1.0,
                    duration: 1,
                },
            ],
            ..attack("charge", "Charge", 0, 5, 0.5)
        },
        SkillDefinition {
            kind: SkillKind::Debuff,
            formula: DamageFormula::NoDamage,
            target: SkillTarget::EnemyAll,
            level_scaling: 0.0,
            effects: vec![SkillEffect::AllEnemiesDebuff {
                effect_id: "demoralizing_shout".into(),
                name: "Demoralized".into(),
                stat: BuffStat::Attack,
                value: -15.0,
                duration: 4,
            }],
            ..attack("demoralizing_shout", "Demoralizing Shout", 10, 4, 0.0)
        },
        self_cast(
            "battle_shout",
            "Battle Shout",
            10,
            5,
            vec![self_buff("battle_shout", "Battle Shout", BuffStat::Attack, 15.0, 5)],
        ),
        self_cast(
            "shield_block",
            "Shield Block",
            10,
            3,
            vec![self_buff("shield_block", "Shield Block", BuffStat::PhysicalDamageTaken, -40.0, 2)],
        ),
        self_cast(
            "shield_wall",
            "Shield Wall",
            0,
            6,
            vec![self_buff("shield_wall", "Shield Wall", BuffStat::DamageTaken, -60.0, 2)],
        ),
        self_cast(
            "last_stand",
            "Last Stand",
            0,
            8,
            vec![SkillEffect::HealMaxHpPercent { percent: 30.0 }],
        ),
        self_cast(
            "unbreakable_barrier",
            "Unbreakable Barrier",
            20,
            6,
            vec![SkillEffect::ShieldMaxHpPercent {
                effect_id: "unbreakable_barrier".into(),
                name: "Unbreakable Barrier".into(),
                percent: 25.0,
                duration: 4,
            }],
        ),
        self_cast(
            "shield_reflection",
            "Shield Reflection",
            15,
            5,
            vec![self_buff("shield_reflection", "Shield Reflection", BuffStat::Reflect, 30.0, 2)],
        ),
        self_cast(
            "retaliation",
            "Retaliation",
            20,
            6,
            vec![self_buff("retaliation", "Retaliation", BuffStat::CounterAttack, 50.0, 3)],
        ),
        self_cast(
            "recklessness",
            "Recklessness",
            0,
            8,
            vec![
                self_buff("recklessness_crit", "Recklessness", BuffStat::CritRate, 30.0, 3),
                SkillEffect::SelfBuff {
                    effect_id: "recklessness_damage".into(),
                    name: "Recklessness".into(),
                    stat: BuffStat::DamageTaken,
                    value: 20.0,
                    duration: 3,
                },
            ],
        ),
        self_cast(
            "avatar",
            "Avatar",
            0,
            10,
            vec![
                self_buff("avatar", "Avatar", BuffStat::Attack, 30.0, 3),
                self_buff("avatar_cc_immune", "Avatar", BuffStat::CcImmune, 1.0, 3),
            ],
        ),
    ]
}

pub fn find_warrior_skill(skill_id: &str) -> Option<SkillDefinition> {
    warrior_skills().into_iter().find(|s| s.id == skill_id)
}
