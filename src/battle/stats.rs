//! Per-battle combat statistics.
//!
//! Reset at every encounter and filled in by the turn pipelines. The last
//! battle's numbers stay readable until the next spawn.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::character::CharacterId;
use crate::combat::DamageType;

/// What one character did and suffered during a battle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterBattleStats {
    pub damage_dealt: i64,
    pub physical_damage_dealt: i64,
    pub magic_damage_dealt: i64,
    pub crit_count: u32,
    pub crit_damage: i64,
    pub max_crit: i32,

    pub damage_taken: i64,
    pub physical_damage_taken: i64,
    pub magic_damage_taken: i64,
    pub damage_absorbed: i64,
    pub hits_taken: u32,
    pub dodges: u32,

    pub healing_done: i64,
    pub overhealing: i64,
    pub periodic_healing: i64,

    pub skill_uses: u32,
    pub skill_misses: u32,
    pub resource_used: i64,
    pub resource_generated: i64,

    pub kills: u32,
    pub deaths: u32,
    pub cc_applied: u32,
    pub cc_received: u32,

    /// Per skill id
    pub skills: BTreeMap<String, SkillUsageStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillUsageStats {
    pub uses: u32,
    pub hits: u32,
    pub crits: u32,
    pub total_damage: i64,
    pub resource_cost: i64,
}

/// One landed skill cast, as recorded after all of its targets resolved.
#[derive(Debug, Clone, Copy)]
pub struct SkillCast<'a> {
    pub skill_id: &'a str,
    pub cost: i32,
    pub damage: i32,
    pub hits: u32,
    pub is_crit: bool,
    /// Damaging skill that connected with nothing
    pub missed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BattleStats {
    pub characters: BTreeMap<CharacterId, CharacterBattleStats>,
}

impl BattleStats {
    /// Forget the previous battle and seed an entry per participant.
    pub fn begin(&mut self, participants: impl IntoIterator<Item = CharacterId>) {
        self.characters.clear();
        for id in participants {
            self.characters.entry(id).or_default();
        }
    }

    pub fn get(&self, character_id: CharacterId) -> Option<&CharacterBattleStats> {
        self.characters.get(&character_id)
    }

    fn entry(&mut self, character_id: CharacterId) -> &mut CharacterBattleStats {
        self.characters.entry(character_id).or_default()
    }

    pub fn record_damage_dealt(
        &mut self,
        character_id: CharacterId,
        damage: i32,
        damage_type: DamageType,
        is_crit: bool,
    ) {
        if damage <= 0 {
            return;
        }
        let stats = self.entry(character_id);
        let amount = damage as i64;
        stats.damage_dealt += amount;
        if damage_type.is_physical() {
            stats.physical_damage_dealt += amount;
        } else {
            stats.magic_damage_dealt += amount;
        }
        if is_crit {
            stats.crit_count += 1;
            stats.crit_damage += amount;
            stats.max_crit = stats.max_crit.max(damage);
        }
    }

    pub fn record_damage_taken(
        &mut self,
        character_id: CharacterId,
        damage: i32,
        damage_type: DamageType,
        absorbed: i32,
    ) {
        let stats = self.entry(character_id);
        let amount = damage.max(0) as i64;
        stats.hits_taken += 1;
        stats.damage_taken += amount;
        if damage_type.is_physical() {
            stats.physical_damage_taken += amount;
        } else {
            stats.magic_damage_taken += amount;
        }
        stats.damage_absorbed += absorbed.max(0) as i64;
    }

    /// `requested` is what the heal tried to restore; the rest of it
    /// counts as overhealing.
    pub fn record_healing(
        &mut self,
        character_id: CharacterId,
        healed: i32,
        requested: i32,
        periodic: bool,
    ) {
        let stats = self.entry(character_id);
        let healed = healed.max(0) as i64;
        stats.healing_done += healed;
        stats.overhealing += (requested.max(0) as i64 - healed).max(0);
        if periodic {
            stats.periodic_healing += healed;
        }
    }

    pub fn record_skill_cast(&mut self, character_id: CharacterId, cast: SkillCast<'_>) {
        let stats = self.entry(character_id);
        stats.skill_uses += 1;
        stats.resource_used += cast.cost.max(0) as i64;
        if cast.missed {
            stats.skill_misses += 1;
        }
        let usage = stats.skills.entry(cast.skill_id.to_string()).or_default();
        usage.uses += 1;
        usage.hits += cast.hits;
        usage.total_damage += cast.damage.max(0) as i64;
        usage.resource_cost += cast.cost.max(0) as i64;
        if cast.is_crit && cast.hits > 0 {
            usage.crits += 1;
        }
    }

    pub fn record_resource_generated(&mut self, character_id: CharacterId, amount: i32) {
        if amount > 0 {
            self.entry(character_id).resource_generated += amount as i64;
        }
    }

    pub fn record_dodge(&mut self, character_id: CharacterId) {
        self.entry(character_id).dodges += 1;
    }

    pub fn record_kill(&mut self, character_id: CharacterId) {
        self.entry(character_id).kills += 1;
    }

    pub fn record_death(&mut self, character_id: CharacterId) {
        self.entry(character_id).deaths += 1;
    }

    pub fn record_cc_applied(&mut self, character_id: CharacterId) {
        self.entry(character_id).cc_applied += 1;
    }

    pub fn record_cc_received(&mut self, character_id: CharacterId) {
        self.entry(character_id).cc_received += 1;
    }

    pub fn total_damage_dealt(&self) -> i64 {
        self.characters.values().map(|s| s.damage_dealt).sum()
    }

    /// The biggest damage dealer, lowest id on ties. `None` until someone
    /// has dealt damage.
    pub fn top_damage(&self) -> Option<(CharacterId, i64)> {
        self.characters
            .iter()
            .filter(|(_, s)| s.damage_dealt > 0)
            .fold(None, |best: Option<(CharacterId, i64)>, (id, s)| match best {
                Some((_, top)) if top >= s.damage_dealt => best,
                _ => Some((*id, s.damage_dealt)),
            })
    }
}
