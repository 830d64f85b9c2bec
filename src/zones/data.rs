//! Zone definitions and the built-in starter catalogue.

use serde::{Deserialize, Serialize};

use crate::combat::DamageType;
use crate::monsters::{
    AiType, MonsterSkill, MonsterSkillDef, MonsterSkillType, MonsterTemplate, MonsterType,
};
use crate::skills::SkillKind;

/// A level-banded area defining a monster spawn pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub min_level: u32,
    pub max_level: u32,
    /// Restricts entry to one faction when set
    #[serde(default)]
    pub faction: Option<String>,
    /// Reward multipliers; values ≤ 0 read as 1.0
    #[serde(default = "one")]
    pub exp_multiplier: f64,
    #[serde(default = "one")]
    pub gold_multiplier: f64,
}

fn one() -> f64 {
    1.0
}

impl Zone {
    pub fn new(id: impl Into<String>, name: impl Into<String>, min_level: u32, max_level: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            min_level,
            max_level,
            faction: None,
            exp_multiplier: 1.0,
            gold_multiplier: 1.0,
        }
    }

    pub fn exp_multiplier(&self) -> f64 {
        if self.exp_multiplier > 0.0 {
            self.exp_multiplier
        } else {
            1.0
        }
    }

    pub fn gold_multiplier(&self) -> f64 {
        if self.gold_multiplier > 0.0 {
            self.gold_multiplier
        } else {
            1.0
        }
    }
}

/// Starting zone id used when a session has no zone yet.
pub const STARTER_ZONE_ID: &str = "elwynn";

/// Zones shipped with the demo data set.
pub fn get_all_zones() -> Vec<Zone> {
    vec![
        Zone {
            description: "Rolling farmland troubled by kobolds and wolves.".into(),
            ..Zone::new(STARTER_ZONE_ID, "Elwynn Forest", 1, 10)
        },
        Zone {
            description: "Abandoned farms overrun by the Defias Brotherhood.".into(),
            exp_multiplier: 1.2,
            gold_multiplier: 1.2,
            ..Zone::new("westfall", "Westfall", 8, 20)
        },
        Zone {
            description: "A blighted forest where the dead walk.".into(),
            exp_multiplier: 1.5,
            gold_multiplier: 1.3,
            ..Zone::new("duskwood", "Duskwood", 18, 30)
        },
    ]
}

/// Monster pool for a starter zone; empty for unknown ids.
pub fn get_zone_monsters(zone_id: &str) -> Vec<MonsterTemplate> {
    match zone_id {
        STARTER_ZONE_ID => vec![
            with_zone(
                zone_id,
                MonsterTemplate {
                    spawn_weight: 10,
                    ai_type: AiType::Balanced,
                    ..MonsterTemplate::new("kobold_vermin", "Kobold Vermin", 2)
                },
            ),
            with_zone(
                zone_id,
                MonsterTemplate {
                    spawn_weight: 8,
                    speed: 14,
                    ai_type: AiType::Aggressive,
                    skills: vec![MonsterSkill::new(
                        skill_def("savage_bite", "Savage Bite", SkillKind::Attack, 60.0, 10),
                        MonsterSkillType::Attack,
                        5,
                        3,
                    )],
                    ..MonsterTemplate::new("young_wolf", "Young Wolf", 3)
                },
            ),
            with_zone(
                zone_id,
                MonsterTemplate {
                    monster_type: MonsterType::Boss,
                    spawn_weight: 1,
                    hp: 320,
                    physical_attack: 18,
                    ai_type: AiType::Special,
                    skills: vec![
                        MonsterSkill::new(
                            skill_def("cleave", "Cleave", SkillKind::Attack, 80.0, 20),
                            MonsterSkillType::Special,
                            8,
                            4,
                        ),
                        MonsterSkill::new(
                            skill_def("gnoll_fury", "Gnoll Fury", SkillKind::Heal, 15.0, 30),
                            MonsterSkillType::Heal,
                            3,
                            6,
                        ),
                    ],
                    ..MonsterTemplate::new("hogger", "Hogger", 8)
                },
            ),
        ],
        "westfall" => vec![
            with_zone(
                zone_id,
                MonsterTemplate {
                    spawn_weight: 10,
                    ai_type: AiType::Aggressive,
                    ..MonsterTemplate::new("defias_thug", "Defias Thug", 12)
                },
            ),
            with_zone(
                zone_id,
                MonsterTemplate {
                    spawn_weight: 6,
                    magic_attack: 30,
                    attack_type: DamageType::Fire,
                    ai_type: AiType::Defensive,
                    skills: vec![MonsterSkill::new(
                        skill_def("frost_armor", "Frost Armor", SkillKind::Buff, 20.0, 20),
                        MonsterSkillType::Defense,
                        4,
                        5,
                    )],
                    ..MonsterTemplate::new("defias_conjurer", "Defias Conjurer", 14)
                },
            ),
        ],
        "duskwood" => vec![with_zone(
            zone_id,
            MonsterTemplate {
                spawn_weight: 10,
                monster_type: MonsterType::Elite,
                hp: 420,
                ai_type: AiType::Defensive,
                ..MonsterTemplate::new("skeletal_warrior", "Skeletal Warrior", 22)
            },
        )],
        _ => Vec::new(),
    }
}

fn with_zone(zone_id: &str, mut template: MonsterTemplate) -> MonsterTemplate {
    template.zone_id = zone_id.to_string();
    template
}

fn skill_def(id: &str, name: &str, kind: SkillKind, base_value: f64, cost: i32) -> MonsterSkillDef {
    MonsterSkillDef {
        id: id.into(),
        name: name.into(),
        kind,
        damage_type: DamageType::Physical,
        base_value,
        resource_cost: cost,
    }
}
