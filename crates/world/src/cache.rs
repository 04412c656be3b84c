//! Open-addressed LRU cache of generated chunk sections, keyed by
//! `(chunk_x, chunk_z, chunk_y)`. Probing is bounded: once `MAX_PROBE`
//! slots have been checked without finding the key or an empty slot, the
//! oldest entry among the probed slots is evicted to make room.

use crate::block::{is_never_baked, BlockId};
use crate::blockchange::BlockChangeIndex;
use crate::chunk::ChunkSection;
use crate::error::WorldError;
use crate::terrain::{self, Biome, TerrainConfig};

pub const MAX_PROBE: usize = 32;

pub type SectionKey = (i32, i32, i32);

struct Slot {
    key: Option<SectionKey>,
    section: ChunkSection,
    biome: Biome,
    generation: u64,
}

impl Slot {
    fn vacant() -> Self {
        Slot {
            key: None,
            section: ChunkSection::empty(),
            biome: Biome::Plains,
            generation: 0,
        }
    }
}

/// A fixed-capacity open-addressed cache. `capacity` should be a power of
/// two for the modulo-free probe sequence, but any positive value works.
pub struct SectionCache {
    slots: Vec<Slot>,
    capacity: usize,
    clock: u64,
}

fn hash_key(key: SectionKey) -> u64 {
    let (x, z, y) = key;
    let packed = (x as u64 & 0xFFFF_FFFF) | ((z as u64 & 0xFFFF_FFFF) << 32);
    crate::hash::splitmix64(packed ^ ((y as i64 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)))
}

impl SectionCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        SectionCache {
            slots: (0..capacity).map(|_| Slot::vacant()).collect(),
            capacity,
            clock: 0,
        }
    }

    fn probe_start(&self, key: SectionKey) -> usize {
        (hash_key(key) as usize) % self.capacity
    }

    pub fn get(&mut self, key: SectionKey) -> Option<(Biome, &ChunkSection)> {
        let start = self.probe_start(key);
        for i in 0..MAX_PROBE.min(self.capacity) {
            let idx = (start + i) % self.capacity;
            if self.slots[idx].key == Some(key) {
                self.clock += 1;
                self.slots[idx].generation = self.clock;
                return Some((self.slots[idx].biome, &self.slots[idx].section));
            }
            if self.slots[idx].key.is_none() {
                return None;
            }
        }
        None
    }

    /// Insert or replace the section for `key`. If every probed slot is
    /// occupied, evicts the least-recently-used entry among them.
    pub fn put(
        &mut self,
        key: SectionKey,
        biome: Biome,
        section: ChunkSection,
    ) -> Result<(), WorldError> {
        let start = self.probe_start(key);
        let probe_len = MAX_PROBE.min(self.capacity);

        let mut victim = None;
        let mut victim_generation = u64::MAX;

        for i in 0..probe_len {
            let idx = (start + i) % self.capacity;
            if self.slots[idx].key == Some(key) || self.slots[idx].key.is_none() {
                self.clock += 1;
                self.slots[idx] = Slot {
                    key: Some(key),
                    section,
                    biome,
                    generation: self.clock,
                };
                return Ok(());
            }
            if self.slots[idx].generation < victim_generation {
                victim_generation = self.slots[idx].generation;
                victim = Some(idx);
            }
        }

        let idx = victim.ok_or(WorldError::CacheProbeExhausted)?;
        self.clock += 1;
        self.slots[idx] = Slot {
            key: Some(key),
            section,
            biome,
            generation: self.clock,
        };
        Ok(())
    }

    pub fn invalidate(&mut self, key: SectionKey) {
        let start = self.probe_start(key);
        for i in 0..MAX_PROBE.min(self.capacity) {
            let idx = (start + i) % self.capacity;
            if self.slots[idx].key == Some(key) {
                self.slots[idx] = Slot::vacant();
                return;
            }
            if self.slots[idx].key.is_none() {
                return;
            }
        }
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = Slot::vacant();
        }
        self.clock = 0;
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.key.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Generate a fresh section for `(cx, cy, cz)`, baking in terrain but
/// skipping never-baked blocks (torches, optionally chests), which are
/// always re-applied from the block-change overlay afterwards.
fn generate_section(
    cfg: &TerrainConfig,
    cx: i32,
    cy: i32,
    cz: i32,
    chests_enabled: bool,
) -> (ChunkSection, Biome) {
    let anchor = terrain::compute_anchor(cfg, cx, cz);
    let feature = terrain::compute_feature(cfg, &anchor);

    let mut section = ChunkSection::empty();
    for local_y in 0..16usize {
        let world_y = (cy * 16 + local_y as i32).clamp(0, 255) as u8;
        for local_z in 0..16usize {
            let world_z = cz * 16 + local_z as i32;
            for local_x in 0..16usize {
                let world_x = cx * 16 + local_x as i32;
                let block: BlockId =
                    terrain::terrain_at(cfg, &anchor, &feature, world_x, world_y, world_z);
                if is_never_baked(block, chests_enabled) {
                    continue;
                }
                section.set(local_x, local_y, local_z, block);
            }
        }
    }

    (section, anchor.biome)
}

fn apply_overlay(section: &mut ChunkSection, overlay: &BlockChangeIndex, cx: i32, cz: i32, chests_enabled: bool) {
    for (x, y, z, block) in overlay.overrides_in_chunk(cx, cz) {
        if is_never_baked(block, chests_enabled) {
            continue;
        }
        let local_x = x.rem_euclid(16) as usize;
        let local_z = z.rem_euclid(16) as usize;
        let local_y = (y as usize) % 16;
        section.set(local_x, local_y, local_z, block);
    }
}

impl SectionCache {
    /// The composite operation: on a cache hit, copy the cached bytes and
    /// re-apply any overlapping block changes; on a miss, generate from
    /// terrain, apply changes, and install the result in the cache.
    pub fn build_section(
        &mut self,
        cfg: &TerrainConfig,
        overlay: &BlockChangeIndex,
        key: SectionKey,
        chests_enabled: bool,
    ) -> Result<(Biome, ChunkSection), WorldError> {
        let (cx, cy, cz) = key;
        if let Some((biome, cached)) = self.get(key) {
            let mut section = cached.clone();
            apply_overlay(&mut section, overlay, cx, cz, chests_enabled);
            return Ok((biome, section));
        }

        let (mut section, biome) = generate_section(cfg, cx, cy, cz, chests_enabled);
        self.put(key, biome, section.clone())?;
        apply_overlay(&mut section, overlay, cx, cz, chests_enabled);
        Ok((biome, section))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_roundtrips() {
        let mut cache = SectionCache::new(64);
        let section = ChunkSection::filled(1);
        cache.put((0, 0, 0), Biome::Plains, section).unwrap();
        assert!(cache.get((0, 0, 0)).is_some());
        assert_eq!(cache.get((0, 0, 0)).unwrap().1.get(0, 0, 0), 1);
    }

    #[test]
    fn missing_key_returns_none() {
        let mut cache = SectionCache::new(64);
        assert!(cache.get((1, 2, 3)).is_none());
    }

    #[test]
    fn invalidate_removes_entry() {
        let mut cache = SectionCache::new(64);
        cache
            .put((5, 5, 5), Biome::Plains, ChunkSection::empty())
            .unwrap();
        cache.invalidate((5, 5, 5));
        assert!(cache.get((5, 5, 5)).is_none());
    }

    #[test]
    fn eviction_prefers_least_recently_used_among_probed_slots() {
        let mut cache = SectionCache::new(1);
        cache
            .put((0, 0, 0), Biome::Plains, ChunkSection::filled(1))
            .unwrap();
        cache
            .put((1, 0, 0), Biome::Plains, ChunkSection::filled(2))
            .unwrap();
        // Capacity 1: the second insert must evict the first.
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clear_empties_cache() {
        let mut cache = SectionCache::new(8);
        for i in 0..8 {
            cache
                .put((i, 0, 0), Biome::Plains, ChunkSection::empty())
                .unwrap();
        }
        assert_eq!(cache.len(), 8);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn build_section_skips_never_baked_blocks() {
        let cfg = TerrainConfig::default();
        let overlay = BlockChangeIndex::new();
        let mut cache = SectionCache::new(64);
        let (_, section) = cache.build_section(&cfg, &overlay, (0, 4, 0), false).unwrap();
        for b in section.bytes.iter() {
            assert!(!is_never_baked(*b, false));
        }
    }

    #[test]
    fn build_section_reapplies_overlay_on_cache_hit() {
        let cfg = TerrainConfig::default();
        let mut overlay = BlockChangeIndex::new();
        let mut cache = SectionCache::new(64);

        // Prime the cache with a miss.
        cache.build_section(&cfg, &overlay, (0, 4, 0), false).unwrap();

        overlay.set(3, 3, 70, crate::block::DIAMOND_BLOCK).unwrap();
        let (_, section) = cache.build_section(&cfg, &overlay, (0, 4, 0), false).unwrap();
        assert_eq!(section.get(3, 70 % 16, 3), crate::block::DIAMOND_BLOCK);
    }
}
