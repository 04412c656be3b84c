//! World-engine errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("block-change index is full")]
    BlockChangeIndexFull,

    #[error("coordinate out of range: y={0}")]
    CoordinateOutOfRange(i32),

    #[error("chunk cache entry could not be placed within the probe window")]
    CacheProbeExhausted,
}
