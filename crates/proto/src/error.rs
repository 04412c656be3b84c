//! Wire-format errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed varint: continuation bit set past the maximum length")]
    MalformedVarint,

    #[error("short read: needed {needed} more bytes, had {available}")]
    ShortRead { needed: usize, available: usize },

    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,

    #[error("packet id 0x{0:02X} is not valid for the current connection state")]
    InvalidPacketForState(i32),

    #[error("unknown packet id 0x{0:02X}")]
    UnknownPacketId(i32),

    #[error("declared packet length {0} exceeds the configured maximum")]
    OversizedLength(i32),
}
