//! Simple priority-ordered mob AI: a list of behaviors per mob, the
//! highest-priority one whose `tick` yields a result wins movement.

pub mod behavior;
pub mod mob_behaviors;

use crate::entity::{Entity, EntityTable, Vec3};
use behavior::{Behavior, BehaviorContext};
use mob_behaviors::{ChaseBehavior, WanderBehavior};

pub struct MobBrain {
    pub entity_id: i32,
    behaviors: Vec<Box<dyn Behavior>>,
}

impl MobBrain {
    pub fn hostile(entity_id: i32, seed: u32) -> Self {
        MobBrain {
            entity_id,
            behaviors: vec![
                Box::new(ChaseBehavior {
                    aggro_range_sq: 256.0,
                }),
                Box::new(WanderBehavior::new(seed, 60, 6.0)),
            ],
        }
    }

    pub fn passive(entity_id: i32, seed: u32) -> Self {
        MobBrain {
            entity_id,
            behaviors: vec![Box::new(WanderBehavior::new(seed, 100, 8.0))],
        }
    }

    fn tick(&mut self, ctx: &BehaviorContext) -> behavior::BehaviorOutput {
        self.behaviors.sort_by_key(|b| b.priority());
        for b in self.behaviors.iter_mut() {
            let out = b.tick(ctx);
            if out.move_to.is_some() || out.set_target.is_some() || out.clear_target {
                return out;
            }
        }
        behavior::BehaviorOutput::default()
    }
}

/// The per-tick AI step: nearest-player lookup, behavior evaluation, then
/// velocity toward the chosen goal. Collision is the caller's job.
pub fn tick_mobs(
    brains: &mut [MobBrain],
    entities: &mut EntityTable,
    players: &[(i32, Vec3)],
    current_tick: u64,
    speed: f64,
) {
    for brain in brains.iter_mut() {
        let Some(mob) = entities.get(brain.entity_id) else {
            continue;
        };
        let mob_position = mob.position;

        let nearest = players
            .iter()
            .map(|&(id, pos)| (id, pos, mob_position.distance_sq(pos)))
            .min_by(|a, b| a.2.total_cmp(&b.2));

        let ctx = BehaviorContext {
            mob_position,
            mob_speed: speed,
            current_tick,
            nearest_player: nearest,
        };
        let out = brain.tick(&ctx);

        let Some(entity) = entities.get_mut(brain.entity_id) else {
            continue;
        };
        apply_output(entity, out, speed, current_tick);
    }
}

fn apply_output(entity: &mut Entity, out: behavior::BehaviorOutput, speed: f64, tick: u64) {
    if out.clear_target {
        entity.target_player = None;
    }
    if let Some(target) = out.set_target {
        entity.target_player = Some(target);
    }
    if let Some(yaw) = out.look_at_yaw {
        entity.yaw = yaw;
    }
    if let Some(goal) = out.move_to {
        let dx = goal.x - entity.position.x;
        let dz = goal.z - entity.position.z;
        let dist = (dx * dx + dz * dz).sqrt();
        if dist > 0.01 {
            entity.velocity = Vec3::new((dx / dist) * speed, 0.0, (dz / dist) * speed);
        } else {
            entity.velocity = Vec3::ZERO;
        }
    }
    entity.last_tick = tick;
}
