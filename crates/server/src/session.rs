//! Per-client session state and the stale-packet drain that protects a
//! slow link from an unbounded backlog of movement packets.

use std::collections::HashSet;
use std::time::Instant;

use bytes::BytesMut;

use embercraft_game::inventory::PlayerInventory;
use embercraft_proto::packets::PLAY_SB_MOVEMENT_IDS;
use embercraft_proto::state::ConnectionState;

use crate::net::ConnId;

pub struct Session {
    pub id: ConnId,
    pub state: ConnectionState,
    pub protocol_version: i32,
    pub username: String,
    pub uuid: u128,
    pub entity_id: i32,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
    pub on_ground: bool,
    pub view_distance: u8,
    pub inventory: PlayerInventory,
    pub last_keepalive_sent: Instant,
    pub last_keepalive_received: Instant,
    pub pending_keepalive_id: Option<i64>,
    pub pending_teleport_id: Option<i32>,
    pub spawn_sent: bool,
    pub loaded_chunks: HashSet<(i32, i32)>,
}

impl Session {
    pub fn new(id: ConnId, entity_id: i32) -> Self {
        let now = Instant::now();
        Session {
            id,
            state: ConnectionState::Handshake,
            protocol_version: 0,
            username: String::new(),
            uuid: 0,
            entity_id,
            x: 0.0,
            y: 0.0,
            z: 0.0,
            yaw: 0.0,
            pitch: 0.0,
            on_ground: false,
            view_distance: 8,
            inventory: PlayerInventory::new(),
            last_keepalive_sent: now,
            last_keepalive_received: now,
            pending_keepalive_id: None,
            pending_teleport_id: None,
            spawn_sent: false,
            loaded_chunks: HashSet::new(),
        }
    }
}

/// Collapse runs of consecutive movement packets (ids in
/// [`PLAY_SB_MOVEMENT_IDS`]) at the front of `buf` down to the last packet
/// in each run. Non-movement packets, and a movement packet that isn't
/// immediately followed by another movement packet, are left untouched.
/// Stops at the first unparseable or partial frame, leaving the remainder
/// of the buffer for the next read to complete.
pub fn drain_stale_movement(buf: &mut BytesMut) {
    let mut frames = Vec::new();
    let mut offset = 0usize;
    loop {
        match embercraft_proto::framing::peek_frame_at(&buf[..], offset) {
            Ok(Some(span)) => {
                offset += span.total_len;
                frames.push(span);
            }
            _ => break,
        }
    }

    if frames.len() < 2 {
        return;
    }

    let mut keep = vec![true; frames.len()];
    for i in 0..frames.len() - 1 {
        let is_move = PLAY_SB_MOVEMENT_IDS.contains(&frames[i].packet_id);
        let next_is_move = PLAY_SB_MOVEMENT_IDS.contains(&frames[i + 1].packet_id);
        if is_move && next_is_move {
            keep[i] = false;
        }
    }

    let tail_start = frames
        .last()
        .map(|f| f.offset + f.total_len)
        .unwrap_or(0);

    let mut rebuilt = BytesMut::with_capacity(buf.len());
    for (i, span) in frames.iter().enumerate() {
        if keep[i] {
            rebuilt.extend_from_slice(&buf[span.offset..span.offset + span.total_len]);
        }
    }
    rebuilt.extend_from_slice(&buf[tail_start..]);
    *buf = rebuilt;
}
