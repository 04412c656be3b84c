//! World persistence: world seed, clock, block changes, and player records
//! serialized to a single little-endian file on clean shutdown and at a
//! periodic interval. Loading tolerates truncation by rolling back to
//! whatever state was in memory before the load was attempted.

use std::io::{self, Read, Write};
use std::path::Path;

use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;

use embercraft_game::inventory::{ItemStack, PlayerInventory, INVENTORY_SIZE};
use embercraft_world::blockchange::BlockChangeIndex;

const MAGIC: &[u8; 4] = b"ECFT";
const FORMAT_VERSION: u16 = 1;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("not an embercraft save file (bad magic)")]
    BadMagic,

    #[error("unsupported save format version {0}")]
    UnsupportedVersion(u16),

    #[error("save file truncated: needed {needed} more bytes, had {available}")]
    Truncated { needed: usize, available: usize },
}

#[derive(Debug, Clone)]
pub struct PlayerRecord {
    pub username: String,
    pub uuid: u128,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
    pub inventory: [ItemStack; INVENTORY_SIZE],
}

pub struct SaveData {
    pub seed: i64,
    pub world_age: i64,
    pub time_of_day: i64,
    pub block_changes: Vec<(i32, u8, i32, u8)>,
    pub players: Vec<PlayerRecord>,
}

fn need(buf: &BytesMut, n: usize) -> Result<(), PersistenceError> {
    if buf.remaining() < n {
        Err(PersistenceError::Truncated {
            needed: n,
            available: buf.remaining(),
        })
    } else {
        Ok(())
    }
}

fn get_string(buf: &mut BytesMut) -> Result<String, PersistenceError> {
    need(buf, 2)?;
    let len = buf.get_u16_le() as usize;
    need(buf, len)?;
    let bytes = buf.split_to(len);
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn put_string(buf: &mut BytesMut, s: &str) {
    buf.put_u16_le(s.len().min(u16::MAX as usize) as u16);
    buf.extend_from_slice(&s.as_bytes()[..s.len().min(u16::MAX as usize)]);
}

/// Serialize `SaveData` into the on-disk little-endian layout.
pub fn encode(data: &SaveData) -> BytesMut {
    let mut buf = BytesMut::new();
    buf.extend_from_slice(MAGIC);
    buf.put_u16_le(FORMAT_VERSION);
    buf.put_i64_le(data.seed);
    buf.put_i64_le(data.world_age);
    buf.put_i64_le(data.time_of_day);

    buf.put_u32_le(data.block_changes.len() as u32);
    for &(x, y, z, block) in &data.block_changes {
        buf.put_i32_le(x);
        buf.put_u8(y);
        buf.put_i32_le(z);
        buf.put_u8(block);
    }

    buf.put_u32_le(data.players.len() as u32);
    for player in &data.players {
        put_string(&mut buf, &player.username);
        buf.put_u128_le(player.uuid);
        buf.put_f64_le(player.x);
        buf.put_f64_le(player.y);
        buf.put_f64_le(player.z);
        buf.put_f32_le(player.yaw);
        buf.put_f32_le(player.pitch);
        for item in &player.inventory {
            buf.put_u8(item.item_id);
            buf.put_u8(item.count);
        }
    }

    buf
}

/// Parse the on-disk layout. A truncated trailing record is an error, not
/// a partial result — the caller should keep the previous in-memory state.
pub fn decode(mut buf: BytesMut) -> Result<SaveData, PersistenceError> {
    need(&buf, 4)?;
    let magic = buf.split_to(4);
    if &magic[..] != MAGIC {
        return Err(PersistenceError::BadMagic);
    }

    need(&buf, 2)?;
    let version = buf.get_u16_le();
    if version != FORMAT_VERSION {
        return Err(PersistenceError::UnsupportedVersion(version));
    }

    need(&buf, 24)?;
    let seed = buf.get_i64_le();
    let world_age = buf.get_i64_le();
    let time_of_day = buf.get_i64_le();

    need(&buf, 4)?;
    let change_count = buf.get_u32_le() as usize;
    let mut block_changes = Vec::with_capacity(change_count);
    for _ in 0..change_count {
        need(&buf, 10)?;
        let x = buf.get_i32_le();
        let y = buf.get_u8();
        let z = buf.get_i32_le();
        let block = buf.get_u8();
        block_changes.push((x, y, z, block));
    }

    need(&buf, 4)?;
    let player_count = buf.get_u32_le() as usize;
    let mut players = Vec::with_capacity(player_count);
    for _ in 0..player_count {
        let username = get_string(&mut buf)?;
        need(&buf, 16 + 8 * 3 + 4 * 2)?;
        let uuid = buf.get_u128_le();
        let x = buf.get_f64_le();
        let y = buf.get_f64_le();
        let z = buf.get_f64_le();
        let yaw = buf.get_f32_le();
        let pitch = buf.get_f32_le();
        need(&buf, INVENTORY_SIZE * 2)?;
        let mut inventory = [ItemStack::default(); INVENTORY_SIZE];
        for slot in inventory.iter_mut() {
            slot.item_id = buf.get_u8();
            slot.count = buf.get_u8();
        }
        players.push(PlayerRecord {
            username,
            uuid,
            x,
            y,
            z,
            yaw,
            pitch,
            inventory,
        });
    }

    Ok(SaveData {
        seed,
        world_age,
        time_of_day,
        block_changes,
        players,
    })
}

pub fn save_to_file<P: AsRef<Path>>(path: P, data: &SaveData) -> Result<(), PersistenceError> {
    let encoded = encode(data);
    let tmp_path = path.as_ref().with_extension("dat.tmp");
    {
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(&encoded)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Load a save file. Returns `Ok(None)` if the path doesn't exist yet (a
/// brand new world), and an error on a present-but-corrupt/truncated file.
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Option<SaveData>, PersistenceError> {
    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    let mut buf = BytesMut::with_capacity(bytes.len());
    buf.extend_from_slice(&bytes);
    decode(buf).map(Some)
}

pub fn block_changes_from_overlay(overlay: &BlockChangeIndex, cx_range: i32) -> Vec<(i32, u8, i32, u8)> {
    let mut out = Vec::with_capacity(overlay.len());
    for cx in -cx_range..=cx_range {
        for cz in -cx_range..=cx_range {
            out.extend(overlay.overrides_in_chunk(cx, cz).map(|(x, y, z, block)| (x, y, z, block)));
        }
    }
    out
}

/// Apply loaded block-change records onto an in-memory overlay.
pub fn apply_block_changes(overlay: &mut BlockChangeIndex, records: &[(i32, u8, i32, u8)]) {
    for &(x, y, z, block) in records {
        let _ = overlay.set(x, z, y, block);
    }
}

pub fn player_record_from(inv: &PlayerInventory, username: &str, uuid: u128, x: f64, y: f64, z: f64, yaw: f32, pitch: f32) -> PlayerRecord {
    PlayerRecord {
        username: username.to_string(),
        uuid,
        x,
        y,
        z,
        yaw,
        pitch,
        inventory: inv.slots,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SaveData {
        SaveData {
            seed: 42,
            world_age: 1000,
            time_of_day: 6000,
            block_changes: vec![(1, 64, -2, 5), (-100, 200, 300, 9)],
            players: vec![PlayerRecord {
                username: "Steve".into(),
                uuid: 0xDEAD_BEEF,
                x: 1.5,
                y: 64.0,
                z: -3.25,
                yaw: 90.0,
                pitch: 0.0,
                inventory: [ItemStack::default(); INVENTORY_SIZE],
            }],
        }
    }

    #[test]
    fn encode_then_decode_roundtrips() {
        let data = sample();
        let encoded = encode(&data);
        let decoded = decode(encoded).unwrap();
        assert_eq!(decoded.seed, 42);
        assert_eq!(decoded.world_age, 1000);
        assert_eq!(decoded.block_changes.len(), 2);
        assert_eq!(decoded.players.len(), 1);
        assert_eq!(decoded.players[0].username, "Steve");
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(b"NOPE");
        buf.put_u16_le(FORMAT_VERSION);
        assert!(matches!(decode(buf), Err(PersistenceError::BadMagic)));
    }

    #[test]
    fn truncated_file_reports_truncation_not_panic() {
        let data = sample();
        let mut encoded = encode(&data);
        encoded.truncate(encoded.len() - 5);
        assert!(matches!(decode(encoded), Err(PersistenceError::Truncated { .. })));
    }

    #[test]
    fn missing_file_returns_none_not_error() {
        let result = load_from_file("/nonexistent/path/world.dat").unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn save_then_load_file_roundtrips() {
        let dir = std::env::temp_dir().join(format!("embercraft-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("world.dat");
        let data = sample();
        save_to_file(&path, &data).unwrap();
        let loaded = load_from_file(&path).unwrap().unwrap();
        assert_eq!(loaded.seed, data.seed);
        assert_eq!(loaded.block_changes, data.block_changes);
        let _ = std::fs::remove_file(&path);
        let _ = std::fs::remove_dir(&dir);
    }
}
