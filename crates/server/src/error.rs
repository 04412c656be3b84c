//! Session and transport errors. A session error terminates one
//! connection; the server logs and continues.

use thiserror::Error;

use embercraft_proto::error::CodecError;
use embercraft_world::WorldError;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no progress within the network timeout")]
    Timeout,

    #[error("peer reset the connection")]
    Reset,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    World(#[from] WorldError),

    #[error("packet {0:#04x} is not valid in the current connection state")]
    UnexpectedPacket(i32),

    #[error("session closed: {0}")]
    Closed(&'static str),

    #[error("protocol violation: {0}")]
    Protocol(&'static str),

    #[error("no keepalive reply within the configured timeout")]
    KeepaliveTimeout,

    #[error("block-change index is full")]
    WorldFull,
}

/// Classify a `WorldError` surfaced while handling a packet: block-change
/// overflow gets `WorldFull` so the disconnect reason is specific, anything
/// else keeps flowing through the transparent `World` variant.
pub fn classify_world_error(err: WorldError) -> SessionError {
    match err {
        WorldError::BlockChangeIndexFull => SessionError::WorldFull,
        other => SessionError::World(other),
    }
}
