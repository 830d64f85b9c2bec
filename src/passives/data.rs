//! Built-in warrior passive catalogue.

use super::types::*;

fn passive(
    id: &str,
    name: &str,
    kind: PassiveKind,
    stat: Option<PassiveStat>,
    base_value: f64,
    level_scaling: f64,
) -> PassiveDefinition {
    PassiveDefinition {
        id: id.into(),
        name: name.into(),
        kind,
        stat,
        base_value,
        level_scaling,
    }
}

/// Every passive a warrior can unlock.
pub fn warrior_passives() -> Vec<PassiveDefinition> {
    use PassiveKind::*;
    vec![
        passive("weapon_mastery", "Weapon Mastery", StatMod, Some(PassiveStat::Attack), 5.0, 2.5),
        passive("toughness", "Toughness", StatMod, Some(PassiveStat::HpDefenseResistance), 5.0, 2.0),
        passive("defiance", "Defiance", StatMod, Some(PassiveStat::ThreatAndDefense), 10.0, 5.0),
        passive("cruelty", "Cruelty", StatMod, Some(PassiveStat::CritRate), 2.0, 1.0),
        passive("anger_management", "Anger Management", RageGeneration, None, 10.0, 5.0),
        passive("blood_craze", "Blood Craze", OnHitHeal, None, 1.0, 0.5),
        passive("unbridled_wrath", "Unbridled Wrath", OnHitResource, None, 2.0, 1.0),
        passive("bloodthirsty_crits", "Bloodthirsty", OnCritHeal, None, 10.0, 5.0),
        passive("deep_wounds_rage", "Deep Wounds", OnCritResource, None, 5.0, 2.0),
        passive("victory_rush", "Victory Rush", OnKillHeal, None, 10.0, 5.0),
        passive("sudden_death", "Sudden Death", OnKillResource, None, 10.0, 5.0),
        passive("focused_rage", "Focused Rage", OnSkillUseResource, None, 2.0, 1.0),
        passive("revenge", "Revenge", CounterAttack, None, 10.0, 5.0),
        passive("spell_reflection", "Spell Reflection", Reflect, None, 5.0, 2.5),
        passive("enrage", "Enrage", LowHpFrenzy, None, 20.0, 5.0),
        passive("last_bastion", "Last Bastion", LowHpDamageReduction, None, 15.0, 5.0),
        passive("die_by_the_sword", "Die by the Sword", Survival, None, 1.0, 0.0),
    ]
}

pub fn find_warrior_passive(passive_id: &str) -> Option<PassiveDefinition> {
    warrior_passives().into_iter().find(|p| p.id == passive_id)
}
