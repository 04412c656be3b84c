//! `play` state packets: gameplay, chunk streaming, movement, keepalive.

use bytes::{Buf, BufMut, Bytes};

use crate::binary::{pack_position, read_string, unpack_position, write_string};
use crate::codec::{WireDecode, WireEncode};
use crate::error::CodecError;
use crate::varint::{VarInt, ZigZagVarInt};

// Clientbound IDs.
pub const CB_DISCONNECT: i32 = 0x00;
pub const CB_LOGIN_PLAY: i32 = 0x01;
pub const CB_BLOCK_UPDATE: i32 = 0x09;
pub const CB_CHUNK_DATA: i32 = 0x24;
pub const CB_SET_TIME: i32 = 0x27;
pub const CB_SPAWN_POSITION: i32 = 0x25;
pub const CB_ENTITY_TELEPORT: i32 = 0x2A;
pub const CB_KEEPALIVE: i32 = 0x1F;
pub const CB_SYNCHRONIZE_PLAYER_POSITION: i32 = 0x3E;

// Serverbound IDs. Movement occupies the contiguous range the stale-drain
// rule (§4.6) is allowed to thin out.
pub const SB_CONFIRM_TELEPORTATION: i32 = 0x00;
pub const SB_MOVE_POSITION: i32 = 0x1D;
pub const SB_MOVE_POSITION_AND_ROTATION: i32 = 0x1E;
pub const SB_MOVE_ROTATION: i32 = 0x1F;
pub const SB_MOVE_STATUS_ONLY: i32 = 0x20;
pub const SB_KEEPALIVE: i32 = 0x1A;
pub const SB_PLAYER_ACTION: i32 = 0x28;
pub const SB_CLICK_CONTAINER: i32 = 0x12;

pub const MAX_DIMENSION_NAME_LEN: usize = 64;

fn get_f64(buf: &mut impl Buf) -> Result<f64, CodecError> {
    f64::decode(buf)
}
fn get_f32(buf: &mut impl Buf) -> Result<f32, CodecError> {
    f32::decode(buf)
}
fn get_bool(buf: &mut impl Buf) -> Result<bool, CodecError> {
    Ok(u8::decode(buf)? != 0)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disconnect {
    pub reason: String,
}
pub const MAX_DISCONNECT_REASON_LEN: usize = 4096;
impl WireEncode for Disconnect {
    fn encode(&self, buf: &mut impl BufMut) {
        write_string(buf, &self.reason);
    }
}
impl WireDecode for Disconnect {
    fn decode(buf: &mut impl Buf) -> Result<Self, CodecError> {
        Ok(Disconnect {
            reason: read_string(buf, MAX_DISCONNECT_REASON_LEN)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoginPlay {
    pub entity_id: i32,
    pub hardcore: bool,
    pub dimension: String,
    pub view_distance: i32,
    pub spawn_x: f64,
    pub spawn_y: f64,
    pub spawn_z: f64,
}

impl WireEncode for LoginPlay {
    fn encode(&self, buf: &mut impl BufMut) {
        buf.put_i32(self.entity_id);
        buf.put_u8(self.hardcore as u8);
        write_string(buf, &self.dimension);
        VarInt(self.view_distance).encode(buf);
        buf.put_f64(self.spawn_x);
        buf.put_f64(self.spawn_y);
        buf.put_f64(self.spawn_z);
    }
}

impl WireDecode for LoginPlay {
    fn decode(buf: &mut impl Buf) -> Result<Self, CodecError> {
        Ok(LoginPlay {
            entity_id: i32::decode(buf)?,
            hardcore: get_bool(buf)?,
            dimension: read_string(buf, MAX_DIMENSION_NAME_LEN)?,
            view_distance: VarInt::decode(buf)?.0,
            spawn_x: get_f64(buf)?,
            spawn_y: get_f64(buf)?,
            spawn_z: get_f64(buf)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAlive {
    pub id: i64,
}
impl WireEncode for KeepAlive {
    fn encode(&self, buf: &mut impl BufMut) {
        buf.put_i64(self.id);
    }
}
impl WireDecode for KeepAlive {
    fn decode(buf: &mut impl Buf) -> Result<Self, CodecError> {
        Ok(KeepAlive { id: i64::decode(buf)? })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnPosition {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}
impl WireEncode for SpawnPosition {
    fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u64(pack_position(self.x, self.y, self.z));
    }
}
impl WireDecode for SpawnPosition {
    fn decode(buf: &mut impl Buf) -> Result<Self, CodecError> {
        let packed = u64::decode(buf)?;
        let (x, y, z) = unpack_position(packed);
        Ok(SpawnPosition { x, y, z })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynchronizePlayerPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
    pub flags: u8,
    pub teleport_id: i32,
}
impl WireEncode for SynchronizePlayerPosition {
    fn encode(&self, buf: &mut impl BufMut) {
        buf.put_f64(self.x);
        buf.put_f64(self.y);
        buf.put_f64(self.z);
        buf.put_f32(self.yaw);
        buf.put_f32(self.pitch);
        buf.put_u8(self.flags);
        VarInt(self.teleport_id).encode(buf);
    }
}
impl WireDecode for SynchronizePlayerPosition {
    fn decode(buf: &mut impl Buf) -> Result<Self, CodecError> {
        Ok(SynchronizePlayerPosition {
            x: get_f64(buf)?,
            y: get_f64(buf)?,
            z: get_f64(buf)?,
            yaw: get_f32(buf)?,
            pitch: get_f32(buf)?,
            flags: u8::decode(buf)?,
            teleport_id: VarInt::decode(buf)?.0,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetTime {
    pub world_age: i64,
    pub time_of_day: i64,
}
impl WireEncode for SetTime {
    fn encode(&self, buf: &mut impl BufMut) {
        buf.put_i64(self.world_age);
        buf.put_i64(self.time_of_day);
    }
}
impl WireDecode for SetTime {
    fn decode(buf: &mut impl Buf) -> Result<Self, CodecError> {
        Ok(SetTime {
            world_age: i64::decode(buf)?,
            time_of_day: i64::decode(buf)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockUpdate {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub block_id: i32,
}
impl WireEncode for BlockUpdate {
    fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u64(pack_position(self.x, self.y, self.z));
        VarInt(self.block_id).encode(buf);
    }
}
impl WireDecode for BlockUpdate {
    fn decode(buf: &mut impl Buf) -> Result<Self, CodecError> {
        let (x, y, z) = unpack_position(u64::decode(buf)?);
        Ok(BlockUpdate {
            x,
            y,
            z,
            block_id: VarInt::decode(buf)?.0,
        })
    }
}

/// One chunk section's worth of data plus the biome it belongs to, ready to
/// be streamed verbatim from the chunk cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkData {
    pub chunk_x: i32,
    pub chunk_z: i32,
    pub chunk_y: i32,
    pub biome: u8,
    pub section: Bytes,
}
impl WireEncode for ChunkData {
    fn encode(&self, buf: &mut impl BufMut) {
        buf.put_i32(self.chunk_x);
        buf.put_i32(self.chunk_z);
        buf.put_i32(self.chunk_y);
        buf.put_u8(self.biome);
        VarInt(self.section.len() as i32).encode(buf);
        buf.put_slice(&self.section);
    }
}
impl WireDecode for ChunkData {
    fn decode(buf: &mut impl Buf) -> Result<Self, CodecError> {
        let chunk_x = i32::decode(buf)?;
        let chunk_z = i32::decode(buf)?;
        let chunk_y = i32::decode(buf)?;
        let biome = u8::decode(buf)?;
        let len = VarInt::decode(buf)?.0.max(0) as usize;
        if buf.remaining() < len {
            return Err(CodecError::ShortRead {
                needed: len,
                available: buf.remaining(),
            });
        }
        Ok(ChunkData {
            chunk_x,
            chunk_z,
            chunk_y,
            biome,
            section: buf.copy_to_bytes(len),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityTeleport {
    pub entity_id: i32,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: u8,
    pub pitch: u8,
    pub on_ground: bool,
}
impl WireEncode for EntityTeleport {
    fn encode(&self, buf: &mut impl BufMut) {
        ZigZagVarInt(self.entity_id).encode(buf);
        buf.put_f64(self.x);
        buf.put_f64(self.y);
        buf.put_f64(self.z);
        buf.put_u8(self.yaw);
        buf.put_u8(self.pitch);
        buf.put_u8(self.on_ground as u8);
    }
}
impl WireDecode for EntityTeleport {
    fn decode(buf: &mut impl Buf) -> Result<Self, CodecError> {
        Ok(EntityTeleport {
            entity_id: ZigZagVarInt::decode(buf)?.0,
            x: get_f64(buf)?,
            y: get_f64(buf)?,
            z: get_f64(buf)?,
            yaw: u8::decode(buf)?,
            pitch: u8::decode(buf)?,
            on_ground: get_bool(buf)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmTeleportation {
    pub teleport_id: i32,
}
impl WireEncode for ConfirmTeleportation {
    fn encode(&self, buf: &mut impl BufMut) {
        VarInt(self.teleport_id).encode(buf);
    }
}
impl WireDecode for ConfirmTeleportation {
    fn decode(buf: &mut impl Buf) -> Result<Self, CodecError> {
        Ok(ConfirmTeleportation {
            teleport_id: VarInt::decode(buf)?.0,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovePlayerPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub on_ground: bool,
}
impl WireEncode for MovePlayerPosition {
    fn encode(&self, buf: &mut impl BufMut) {
        buf.put_f64(self.x);
        buf.put_f64(self.y);
        buf.put_f64(self.z);
        buf.put_u8(self.on_ground as u8);
    }
}
impl WireDecode for MovePlayerPosition {
    fn decode(buf: &mut impl Buf) -> Result<Self, CodecError> {
        Ok(MovePlayerPosition {
            x: get_f64(buf)?,
            y: get_f64(buf)?,
            z: get_f64(buf)?,
            on_ground: get_bool(buf)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovePlayerPositionAndRotation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
    pub on_ground: bool,
}
impl WireEncode for MovePlayerPositionAndRotation {
    fn encode(&self, buf: &mut impl BufMut) {
        buf.put_f64(self.x);
        buf.put_f64(self.y);
        buf.put_f64(self.z);
        buf.put_f32(self.yaw);
        buf.put_f32(self.pitch);
        buf.put_u8(self.on_ground as u8);
    }
}
impl WireDecode for MovePlayerPositionAndRotation {
    fn decode(buf: &mut impl Buf) -> Result<Self, CodecError> {
        Ok(MovePlayerPositionAndRotation {
            x: get_f64(buf)?,
            y: get_f64(buf)?,
            z: get_f64(buf)?,
            yaw: get_f32(buf)?,
            pitch: get_f32(buf)?,
            on_ground: get_bool(buf)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovePlayerRotation {
    pub yaw: f32,
    pub pitch: f32,
    pub on_ground: bool,
}
impl WireEncode for MovePlayerRotation {
    fn encode(&self, buf: &mut impl BufMut) {
        buf.put_f32(self.yaw);
        buf.put_f32(self.pitch);
        buf.put_u8(self.on_ground as u8);
    }
}
impl WireDecode for MovePlayerRotation {
    fn decode(buf: &mut impl Buf) -> Result<Self, CodecError> {
        Ok(MovePlayerRotation {
            yaw: get_f32(buf)?,
            pitch: get_f32(buf)?,
            on_ground: get_bool(buf)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovePlayerStatusOnly {
    pub on_ground: bool,
}
impl WireEncode for MovePlayerStatusOnly {
    fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.on_ground as u8);
    }
}
impl WireDecode for MovePlayerStatusOnly {
    fn decode(buf: &mut impl Buf) -> Result<Self, CodecError> {
        Ok(MovePlayerStatusOnly {
            on_ground: get_bool(buf)?,
        })
    }
}

/// Digging / block-breaking action. `status` follows vanilla semantics:
/// 0 = started digging, 1 = cancelled, 2 = finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerAction {
    pub status: i32,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub face: i8,
    pub sequence: i32,
}
impl WireEncode for PlayerAction {
    fn encode(&self, buf: &mut impl BufMut) {
        VarInt(self.status).encode(buf);
        buf.put_u64(pack_position(self.x, self.y, self.z));
        buf.put_i8(self.face);
        ZigZagVarInt(self.sequence).encode(buf);
    }
}
impl WireDecode for PlayerAction {
    fn decode(buf: &mut impl Buf) -> Result<Self, CodecError> {
        let status = VarInt::decode(buf)?.0;
        let (x, y, z) = unpack_position(u64::decode(buf)?);
        let face = i8::decode(buf)?;
        let sequence = ZigZagVarInt::decode(buf)?.0;
        Ok(PlayerAction {
            status,
            x,
            y,
            z,
            face,
            sequence,
        })
    }
}

/// Click a single inventory slot: place or clear the stack at `slot`.
/// `item_id == 0` clears the slot regardless of `count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickContainer {
    pub slot: i16,
    pub button: i8,
    pub item_id: u8,
    pub count: u8,
}
impl WireEncode for ClickContainer {
    fn encode(&self, buf: &mut impl BufMut) {
        buf.put_i16(self.slot);
        buf.put_i8(self.button);
        buf.put_u8(self.item_id);
        buf.put_u8(self.count);
    }
}
impl WireDecode for ClickContainer {
    fn decode(buf: &mut impl Buf) -> Result<Self, CodecError> {
        Ok(ClickContainer {
            slot: i16::decode(buf)?,
            button: i8::decode(buf)?,
            item_id: u8::decode(buf)?,
            count: u8::decode(buf)?,
        })
    }
}
