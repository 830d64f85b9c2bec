use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::character::{Character, CharacterId};
use crate::combat::{calculate_speed, Combatant};
use crate::monsters::Monster;

/// Who acts in a turn slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Actor {
    Character(CharacterId),
    Monster(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnSlot {
    pub actor: Actor,
    pub speed: i32,
}

/// Speed-sorted queue of every living participant. Equal speeds land in
/// random order.
pub fn build_turn_order(
    characters: &[Character],
    enemies: &[Monster],
    rng: &mut impl Rng,
) -> Vec<TurnSlot> {
    let mut order: Vec<TurnSlot> = characters
        .iter()
        .filter(|c| c.is_alive())
        .map(|c| TurnSlot {
            actor: Actor::Character(c.id),
            speed: calculate_speed(Some(c as &dyn Combatant)),
        })
        .chain(enemies.iter().filter(|e| e.is_alive()).map(|e| TurnSlot {
            actor: Actor::Monster(e.id.clone()),
            speed: calculate_speed(Some(e as &dyn Combatant)),
        }))
        .collect();

    // Shuffle first so the stable sort breaks ties randomly.
    order.shuffle(rng);
    order.sort_by(|a, b| b.speed.cmp(&a.speed));
    order
}

/// Remove a fallen participant, keeping `index` on the same next actor.
pub fn remove_actor(order: &mut Vec<TurnSlot>, index: &mut usize, actor: &Actor) {
    if let Some(pos) = order.iter().position(|slot| &slot.actor == actor) {
        order.remove(pos);
        if pos < *index {
            *index -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monsters::MonsterTemplate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn hero(id: CharacterId, agility: i32) -> Character {
        let mut c = Character::new(id, 1, format!("Hero {id}"));
        c.agility = agility;
        c
    }

    fn enemy(speed: i32) -> Monster {
        let mut template = MonsterTemplate::new("wolf", "Wolf", 2);
        template.speed = speed;
        template.spawn()
    }

    #[test]
    fn test_order_is_non_increasing_and_alive_only() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut dead = hero(3, 99);
        dead.hp = 0;
        let characters = vec![hero(1, 12), hero(2, 30), dead];
        let mut slain = enemy(50);
        slain.hp = 0;
        let enemies = vec![enemy(20), slain, enemy(5)];

        let order = build_turn_order(&characters, &enemies, &mut rng);
        assert_eq!(order.len(), 4);
        assert!(order.windows(2).all(|w| w[0].speed >= w[1].speed));
        assert_eq!(order[0].actor, Actor::Character(2));
        assert!(!order.iter().any(|s| s.actor == Actor::Character(3)));
    }

    #[test]
    fn test_ties_are_shuffled() {
        let characters: Vec<_> = (1..=6).map(|id| hero(id, 10)).collect();
        let mut first_actors = std::collections::HashSet::new();
        for seed in 0..30 {
            let mut rng = StdRng::seed_from_u64(seed);
            let order = build_turn_order(&characters, &[], &mut rng);
            first_actors.insert(order[0].actor.clone());
        }
        assert!(first_actors.len() > 1);
    }

    #[test]
    fn test_remove_actor_keeps_cursor() {
        let mut order = vec![
            TurnSlot { actor: Actor::Character(1), speed: 30 },
            TurnSlot { actor: Actor::Monster("a".into()), speed: 20 },
            TurnSlot { actor: Actor::Character(2), speed: 10 },
        ];
        let mut index = 2;
        remove_actor(&mut order, &mut index, &Actor::Monster("a".into()));
        assert_eq!(index, 1);
        assert_eq!(order[index].actor, Actor::Character(2));

        remove_actor(&mut order, &mut index, &Actor::Monster("missing".into()));
        assert_eq!(order.len(), 2);
    }
}
