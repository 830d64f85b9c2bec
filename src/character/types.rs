use serde::{Deserialize, Serialize};

pub type CharacterId = u64;
pub type UserId = u64;

/// Class-typed resource pool gating skill use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    #[default]
    Mana,
    Rage,
    Energy,
}

impl ResourceType {
    pub fn display_name(&self) -> &'static str {
        match self {
            ResourceType::Mana => "mana",
            ResourceType::Rage => "rage",
            ResourceType::Energy => "energy",
        }
    }

    /// Rage starts empty each fight and does not count toward rest time.
    pub fn is_rage(&self) -> bool {
        matches!(self, ResourceType::Rage)
    }
}

/// A player character as the engine sees it.
///
/// The roster is owned by the caller; the engine mutates it in place each
/// tick and writes state-changing outcomes back through the character
/// repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub user_id: UserId,
    pub name: String,
    #[serde(default)]
    pub class_id: String,
    pub level: u32,
    pub exp: i64,
    pub exp_to_next: i64,

    pub hp: i32,
    pub max_hp: i32,
    pub resource: i32,
    pub max_resource: i32,
    #[serde(default)]
    pub resource_type: ResourceType,

    pub strength: i32,
    pub agility: i32,
    pub intellect: i32,
    pub stamina: i32,
    pub spirit: i32,

    pub physical_attack: i32,
    pub magic_attack: i32,
    pub physical_defense: i32,
    pub magic_defense: i32,
    pub phys_crit_rate: f64,
    pub phys_crit_damage: f64,
    pub spell_crit_rate: f64,
    pub spell_crit_damage: f64,
    pub dodge_rate: f64,

    #[serde(default)]
    pub total_kills: u64,
    #[serde(default)]
    pub total_deaths: u64,
    #[serde(default)]
    pub is_dead: bool,
}

impl Character {
    /// Level 1 character with neutral stats. Callers usually follow up with
    /// [`recalculate_derived`](crate::character::recalculate_derived).
    pub fn new(id: CharacterId, user_id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            user_id,
            name: name.into(),
            class_id: String::new(),
            level: 1,
            exp: 0,
            exp_to_next: crate::core::constants::BASE_EXP_TO_NEXT,
            hp: 100,
            max_hp: 100,
            resource: 50,
            max_resource: 50,
            resource_type: ResourceType::Mana,
            strength: 10,
            agility: 10,
            intellect: 10,
            stamina: 10,
            spirit: 10,
            physical_attack: 10,
            magic_attack: 10,
            physical_defense: 5,
            magic_defense: 5,
            phys_crit_rate: 0.05,
            phys_crit_damage: 1.5,
            spell_crit_rate: 0.05,
            spell_crit_damage: 1.5,
            dodge_rate: 0.05,
            total_kills: 0,
            total_deaths: 0,
            is_dead: false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0 && !self.is_dead
    }

    /// HP as a 0-100 percentage.
    pub fn hp_percent(&self) -> f64 {
        if self.max_hp <= 0 {
            return 0.0;
        }
        self.hp as f64 / self.max_hp as f64 * 100.0
    }

    /// Resource as a 0-100 percentage; an empty pool reads as 0.
    pub fn resource_percent(&self) -> f64 {
        if self.max_resource <= 0 {
            return 0.0;
        }
        self.resource as f64 / self.max_resource as f64 * 100.0
    }

    pub fn take_damage(&mut self, amount: i32) {
        self.hp = self.hp.saturating_sub(amount.max(0)).max(0);
    }

    /// Heals up to max HP, returning the amount actually restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.hp;
        self.hp = self.hp.saturating_add(amount.max(0)).min(self.max_hp);
        self.hp - before
    }

    /// Adds resource up to the pool size, returning the amount gained.
    pub fn gain_resource(&mut self, amount: i32) -> i32 {
        let before = self.resource;
        self.resource = self.resource.saturating_add(amount.max(0)).min(self.max_resource);
        self.resource - before
    }

    pub fn spend_resource(&mut self, amount: i32) {
        self.resource = self.resource.saturating_sub(amount.max(0)).max(0);
    }

    pub fn missing_hp(&self) -> i32 {
        (self.max_hp - self.hp).max(0)
    }
}
