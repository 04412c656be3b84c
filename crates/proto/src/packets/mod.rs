//! Packet definitions for every connection state.
//!
//! Packet IDs are scoped per (state, direction) exactly as the real
//! protocol does; the same numeric ID can mean different things in two
//! different states or directions.

pub mod configuration;
pub mod handshake;
pub mod login;
pub mod play;
pub mod status;

/// Serverbound packet IDs in the `play` state that carry player movement.
/// The stale-packet drain (§4.6) is allowed to discard all but the most
/// recent of these while a send is blocked.
pub const PLAY_SB_MOVEMENT_IDS: std::ops::RangeInclusive<i32> =
    play::SB_MOVE_POSITION..=play::SB_MOVE_STATUS_ONLY;
