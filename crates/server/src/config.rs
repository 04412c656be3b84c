//! Server configuration, loaded from `server.toml`.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: Box<toml::de::Error>,
    },
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub server: ServerSection,
    pub world: WorldSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub limits: LimitsSection,
    #[serde(default)]
    pub gameplay: GameplaySection,
    #[serde(default)]
    pub persistence: PersistenceSection,
}

#[derive(Debug, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_players")]
    pub max_players: u32,
    #[serde(default = "default_view_distance")]
    pub view_distance: u8,
}

fn default_address() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    25565
}
fn default_max_players() -> u32 {
    20
}
fn default_view_distance() -> u8 {
    8
}

impl Default for ServerSection {
    fn default() -> Self {
        ServerSection {
            address: default_address(),
            port: default_port(),
            max_players: default_max_players(),
            view_distance: default_view_distance(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WorldSection {
    #[serde(default = "default_seed")]
    pub seed: i64,
    #[serde(default = "default_terrain_base_height")]
    pub terrain_base_height: i32,
    #[serde(default = "default_cave_base_depth")]
    pub cave_base_depth: i32,
    #[serde(default = "default_biome_size")]
    pub biome_size: i32,
    #[serde(default = "default_biome_radius")]
    pub biome_radius: i32,
}

fn default_seed() -> i64 {
    0
}
fn default_terrain_base_height() -> i32 {
    64
}
fn default_cave_base_depth() -> i32 {
    32
}
fn default_biome_size() -> i32 {
    32
}
fn default_biome_radius() -> i32 {
    10
}

impl Default for WorldSection {
    fn default() -> Self {
        WorldSection {
            seed: default_seed(),
            terrain_base_height: default_terrain_base_height(),
            cave_base_depth: default_cave_base_depth(),
            biome_size: default_biome_size(),
            biome_radius: default_biome_radius(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PersistenceSection {
    #[serde(default = "default_save_path")]
    pub save_path: String,
    #[serde(default = "default_autosave_interval_secs")]
    pub autosave_interval_secs: u64,
}

fn default_save_path() -> String {
    "world.dat".into()
}
fn default_autosave_interval_secs() -> u64 {
    300
}

impl Default for PersistenceSection {
    fn default() -> Self {
        PersistenceSection {
            save_path: default_save_path(),
            autosave_interval_secs: default_autosave_interval_secs(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingSection {
    fn default() -> Self {
        LoggingSection {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LimitsSection {
    #[serde(default = "default_max_block_changes")]
    pub max_block_changes: usize,
    #[serde(default = "default_packet_buffer_size")]
    pub packet_buffer_size: usize,
    #[serde(default = "default_max_recv_buf_len")]
    pub max_recv_buf_len: usize,
    #[serde(default = "default_network_timeout_ms")]
    pub network_timeout_ms: u64,
    #[serde(default = "default_keepalive_interval_ms")]
    pub keepalive_interval_ms: u64,
    #[serde(default = "default_keepalive_timeout_ms")]
    pub keepalive_timeout_ms: u64,
    #[serde(default = "default_chunk_cache_size")]
    pub chunk_cache_size: usize,
}

fn default_max_block_changes() -> usize {
    1 << 20
}
fn default_packet_buffer_size() -> usize {
    2 * 1024
}
fn default_max_recv_buf_len() -> usize {
    64 * 1024
}
fn default_network_timeout_ms() -> u64 {
    30_000
}
fn default_keepalive_interval_ms() -> u64 {
    10_000
}
fn default_keepalive_timeout_ms() -> u64 {
    30_000
}
fn default_chunk_cache_size() -> usize {
    4096
}

impl Default for LimitsSection {
    fn default() -> Self {
        LimitsSection {
            max_block_changes: default_max_block_changes(),
            packet_buffer_size: default_packet_buffer_size(),
            max_recv_buf_len: default_max_recv_buf_len(),
            network_timeout_ms: default_network_timeout_ms(),
            keepalive_interval_ms: default_keepalive_interval_ms(),
            keepalive_timeout_ms: default_keepalive_timeout_ms(),
            chunk_cache_size: default_chunk_cache_size(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GameplaySection {
    #[serde(default)]
    pub allow_chests: bool,
    #[serde(default)]
    pub do_fluid_flow: bool,
    #[serde(default)]
    pub enable_optin_mob_interpolation: bool,
}

impl ServerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().display().to_string();
        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path_str.clone(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path_str,
            source: Box::new(source),
        })
    }
}
