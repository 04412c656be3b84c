//! The fixed ~20 Hz world tick (§4.8): advance day/night, run fluid flow,
//! tick mobs, and signal when a time broadcast is due. Packet processing
//! itself happens off the transport's readable events, not here — this
//! module only advances state that isn't driven by any one session.

use std::time::Duration;

use embercraft_game::ai::{tick_mobs, MobBrain};
use embercraft_game::entity::Vec3;
use embercraft_world::block::{AIR, LAVA, WATER};

use crate::world_state::WorldState;

/// Nominal tick period. 50ms gives 20 ticks per second.
pub const TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Time packets go out on a coarser cadence than the tick itself.
const TIME_BROADCAST_INTERVAL_TICKS: u64 = 20;

/// A day is 24000 `time_of_day` units, matching vanilla's clock.
const DAY_LENGTH_TICKS: i64 = 24_000;

/// Fluid spread is capped per tick so a large flood doesn't blow the
/// per-tick latency budget; unflowed cells simply flow on a later tick.
const MAX_FLUID_SPREAD_PER_TICK: usize = 256;

/// A mob that moved this tick, in the shape the caller needs to broadcast
/// `CB_ENTITY_TELEPORT` to every player.
pub struct MobMovement {
    pub entity_id: i32,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
}

pub struct TickOutcome {
    /// `true` on ticks where a time broadcast should go out to every player.
    pub broadcast_time: bool,
    pub moved_mobs: Vec<MobMovement>,
}

pub struct TickScheduler {
    pub tick_counter: u64,
}

impl TickScheduler {
    pub fn new() -> Self {
        TickScheduler { tick_counter: 0 }
    }
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Advance the world by exactly one tick. `recent_changes` is the set of
/// block coordinates edited since the previous tick; fluid flow only scans
/// cells adjacent to those. Returns `true` on ticks where a time broadcast
/// should be sent to every player.
pub fn run_world_tick(
    scheduler: &mut TickScheduler,
    world: &mut WorldState,
    brains: &mut [MobBrain],
    players: &[(i32, Vec3)],
    recent_changes: &[(i32, u8, i32)],
) -> TickOutcome {
    scheduler.tick_counter += 1;
    world.world_age += 1;
    world.time_of_day = (world.time_of_day + 1) % DAY_LENGTH_TICKS;

    if world.fluid_flow_enabled {
        run_fluid_flow(world, recent_changes);
    }

    let mob_speed = 0.1;
    tick_mobs(brains, &mut world.entities, players, scheduler.tick_counter, mob_speed);
    let moved_mobs = move_and_collide_mobs(world);
    world.entities.remove_dead();

    TickOutcome {
        broadcast_time: scheduler.tick_counter % TIME_BROADCAST_INTERVAL_TICKS == 0,
        moved_mobs,
    }
}

/// Walk every mob with nonzero horizontal velocity one step, clamped to
/// the generated surface so mobs don't sink into or float above terrain.
/// Two passes: the first reads positions and velocities, the second writes
/// the result, so computing `surface_height_at` (an immutable borrow of
/// `world`) never overlaps a mutable borrow of `world.entities`.
fn move_and_collide_mobs(world: &mut WorldState) -> Vec<MobMovement> {
    let steps: Vec<(i32, f64, f64)> = world
        .entities
        .iter()
        .filter(|e| e.velocity.x != 0.0 || e.velocity.z != 0.0)
        .map(|e| (e.id, e.position.x + e.velocity.x, e.position.z + e.velocity.z))
        .collect();

    let mut moved = Vec::with_capacity(steps.len());
    for (id, new_x, new_z) in steps {
        let ground = world.surface_height_at(new_x.floor() as i32, new_z.floor() as i32);
        let Some(entity) = world.entities.get_mut(id) else {
            continue;
        };
        entity.position.x = new_x;
        entity.position.z = new_z;
        entity.position.y = (ground + 1) as f64;
        moved.push(MobMovement {
            entity_id: id,
            x: entity.position.x,
            y: entity.position.y,
            z: entity.position.z,
            yaw: entity.yaw,
        });
    }
    moved
}

const NEIGHBORS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// A minimal fluid step: every active source adjacent to a recent edit
/// spreads one cell into orthogonally-adjacent air at the same height.
/// Vertical falling and pressure-based leveling are out of scope here.
fn run_fluid_flow(world: &mut WorldState, recent_changes: &[(i32, u8, i32)]) {
    let mut spread = 0usize;
    'outer: for &(x, y, z) in recent_changes {
        let source = world.block_at(x, y, z);
        if source != WATER && source != LAVA {
            continue;
        }
        for (dx, dz) in NEIGHBORS {
            if spread >= MAX_FLUID_SPREAD_PER_TICK {
                break 'outer;
            }
            let (nx, nz) = (x + dx, z + dz);
            if world.block_at(nx, y, nz) == AIR {
                let _ = world.set_block(nx, y, nz, source);
                spread += 1;
            }
        }
    }
}
