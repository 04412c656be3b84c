//! Priority-based behavior trait for mob AI.

use crate::entity::Vec3;

/// Read-only snapshot of the world state relevant to one mob's tick.
pub struct BehaviorContext {
    pub mob_position: Vec3,
    pub mob_speed: f64,
    pub current_tick: u64,
    /// `(player_id, position, distance_sq)` of the nearest player, if any.
    pub nearest_player: Option<(i32, Vec3, f64)>,
}

/// The movement and targeting a behavior wants to apply this tick.
#[derive(Debug, Default, Clone, Copy)]
pub struct BehaviorOutput {
    pub move_to: Option<Vec3>,
    pub look_at_yaw: Option<f32>,
    pub set_target: Option<i32>,
    pub clear_target: bool,
}

/// A single behavior in the priority list. Lower `priority()` wins when
/// more than one behavior wants to drive movement this tick.
pub trait Behavior {
    fn priority(&self) -> u32;
    fn tick(&mut self, ctx: &BehaviorContext) -> BehaviorOutput;
}
