//! `handshake` state: a single serverbound packet.

use bytes::{Buf, BufMut};

use crate::binary::{read_string, write_string};
use crate::codec::{WireDecode, WireEncode};
use crate::error::CodecError;
use crate::varint::VarInt;

pub const SB_HANDSHAKE: i32 = 0x00;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub protocol_version: i32,
    pub server_address: String,
    pub server_port: u16,
    /// 1 = status, 2 = login.
    pub next_state: i32,
}

impl WireEncode for Handshake {
    fn encode(&self, buf: &mut impl BufMut) {
        VarInt(self.protocol_version).encode(buf);
        write_string(buf, &self.server_address);
        buf.put_u16(self.server_port);
        VarInt(self.next_state).encode(buf);
    }
}

impl WireDecode for Handshake {
    fn decode(buf: &mut impl Buf) -> Result<Self, CodecError> {
        let protocol_version = VarInt::decode(buf)?.0;
        let server_address = read_string(buf, 255)?;
        if buf.remaining() < 2 {
            return Err(CodecError::ShortRead {
                needed: 2,
                available: buf.remaining(),
            });
        }
        let server_port = buf.get_u16();
        let next_state = VarInt::decode(buf)?.0;
        Ok(Handshake {
            protocol_version,
            server_address,
            server_port,
            next_state,
        })
    }
}
