//! The two concrete behaviors: chase a nearby player, or wander
//! aimlessly when none is in range.

use crate::entity::Vec3;

use super::behavior::{Behavior, BehaviorContext, BehaviorOutput};

/// Close in on the nearest player within `aggro_range_sq`. Higher
/// priority than wandering so it always wins while a target is in range.
#[derive(Debug)]
pub struct ChaseBehavior {
    pub aggro_range_sq: f64,
}

impl Behavior for ChaseBehavior {
    fn priority(&self) -> u32 {
        0
    }

    fn tick(&mut self, ctx: &BehaviorContext) -> BehaviorOutput {
        match ctx.nearest_player {
            Some((player_id, pos, dist_sq)) if dist_sq <= self.aggro_range_sq => {
                let dx = pos.x - ctx.mob_position.x;
                let dz = pos.z - ctx.mob_position.z;
                let yaw = dz.atan2(dx).to_degrees() as f32;
                BehaviorOutput {
                    move_to: Some(pos),
                    look_at_yaw: Some(yaw),
                    set_target: Some(player_id),
                    clear_target: false,
                }
            }
            _ => BehaviorOutput {
                clear_target: true,
                ..Default::default()
            },
        }
    }
}

/// A pseudo-random walk: every `interval_ticks`, pick a new nearby point
/// and head toward it. Lower priority than chasing.
#[derive(Debug)]
pub struct WanderBehavior {
    pub interval_ticks: u64,
    pub radius: f64,
    state: u32,
    target: Option<Vec3>,
    next_repick: u64,
}

impl WanderBehavior {
    pub fn new(seed: u32, interval_ticks: u64, radius: f64) -> Self {
        WanderBehavior {
            interval_ticks,
            radius,
            state: seed | 1,
            target: None,
            next_repick: 0,
        }
    }

    fn pick_target(&mut self, origin: Vec3) -> Vec3 {
        let dx = (embercraft_world::hash::xorshift32(&mut self.state) % 2001) as f64 / 1000.0 - 1.0;
        let dz = (embercraft_world::hash::xorshift32(&mut self.state) % 2001) as f64 / 1000.0 - 1.0;
        Vec3::new(
            origin.x + dx * self.radius,
            origin.y,
            origin.z + dz * self.radius,
        )
    }
}

impl Behavior for WanderBehavior {
    fn priority(&self) -> u32 {
        10
    }

    fn tick(&mut self, ctx: &BehaviorContext) -> BehaviorOutput {
        if self.target.is_none() || ctx.current_tick >= self.next_repick {
            self.target = Some(self.pick_target(ctx.mob_position));
            self.next_repick = ctx.current_tick + self.interval_ticks;
        }
        BehaviorOutput {
            move_to: self.target,
            ..Default::default()
        }
    }
}
