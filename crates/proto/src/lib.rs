//! Minecraft Java Edition wire protocol (protocol version 772): varints,
//! big-endian primitives, packet framing, and packet definitions for the
//! handshake/status/login/configuration/play states.

pub mod binary;
pub mod codec;
pub mod error;
pub mod framing;
pub mod packets;
pub mod state;
pub mod varint;

/// The protocol version this crate speaks (Minecraft Java Edition 1.21.8).
pub const PROTOCOL_VERSION: i32 = 772;

/// Compression is never negotiated; the server always advertises this value.
pub const COMPRESSION_DISABLED: i32 = -1;
