//! Process-wide mutable world state: the chunk cache, the block-change
//! overlay, and the mob table. Mutated only from the main loop, never
//! across a suspension point.

use embercraft_game::entity::{EntityTable, Vec3};
use embercraft_game::inventory::{ItemStack, Recipe, RecipeBook};
use embercraft_world::block::{self, BlockId};
use embercraft_world::blockchange::BlockChangeIndex;
use embercraft_world::cache::SectionCache;
use embercraft_world::chunk::{world_to_chunk, ChunkSection};
use embercraft_world::terrain::{self, Biome, TerrainConfig};
use embercraft_world::WorldError;

/// Vertical sections in a column: world Y runs `0..256` in 16-block
/// sections, matching the `u8` voxel Y domain `terrain_at` resolves over.
pub const WORLD_SECTIONS_Y: i32 = 16;

pub struct WorldState {
    pub terrain: TerrainConfig,
    pub cache: SectionCache,
    pub overlay: BlockChangeIndex,
    pub entities: EntityTable,
    pub world_age: i64,
    pub time_of_day: i64,
    pub chests_enabled: bool,
    pub fluid_flow_enabled: bool,
    pub recipes: RecipeBook,
}

impl WorldState {
    pub fn new(terrain: TerrainConfig, chunk_cache_size: usize, chests_enabled: bool, fluid_flow_enabled: bool) -> Self {
        let mut recipes = RecipeBook::new();
        recipes.register(Recipe {
            inputs: [block::COAL_ORE, block::COAL_ORE, block::COAL_ORE, block::COAL_ORE],
            output: ItemStack::new(block::TORCH, 4),
        });

        WorldState {
            terrain,
            cache: SectionCache::new(chunk_cache_size),
            overlay: BlockChangeIndex::new(),
            entities: EntityTable::new(),
            world_age: 0,
            time_of_day: 0,
            chests_enabled,
            fluid_flow_enabled,
            recipes,
        }
    }

    /// The block at a single world coordinate, without materializing a
    /// whole section — used for reachability checks and single-block
    /// queries that don't justify a cache round trip.
    pub fn block_at(&self, x: i32, y: u8, z: i32) -> BlockId {
        if let Some(b) = self.overlay.get(x, z, y) {
            return b;
        }
        let cx = world_to_chunk(x);
        let cz = world_to_chunk(z);
        let anchor = terrain::compute_anchor(&self.terrain, cx, cz);
        let feature = terrain::compute_feature(&self.terrain, &anchor);
        terrain::terrain_at(&self.terrain, &anchor, &feature, x, y, z)
    }

    /// Apply a player edit: record it in the overlay and invalidate the
    /// containing cached section so the next `section_for` rebuilds it.
    pub fn set_block(&mut self, x: i32, y: u8, z: i32, block: BlockId) -> Result<(), WorldError> {
        self.overlay.set(x, z, y, block)?;
        let key = (world_to_chunk(x), (y as i32) / 16, world_to_chunk(z));
        self.cache.invalidate(key);
        Ok(())
    }

    /// The composite cache/overlay operation a client's chunk stream pulls
    /// from: hit or miss, always current with the overlay.
    pub fn section_for(&mut self, cx: i32, cy: i32, cz: i32) -> Result<(Biome, ChunkSection), WorldError> {
        self.cache
            .build_section(&self.terrain, &self.overlay, (cx, cy, cz), self.chests_enabled)
    }

    pub fn spawn_point(&self) -> Vec3 {
        let height = terrain::height_at(&self.terrain, 0, 0);
        Vec3::new(0.5, (height + 1) as f64, 0.5)
    }

    /// The generated surface height at a column, used by mob movement to
    /// stay on the ground without materializing a whole section.
    pub fn surface_height_at(&self, x: i32, z: i32) -> i32 {
        terrain::height_at(&self.terrain, x, z)
    }
}
