//! `configuration` state: opaque registry data loaded at startup by an
//! external collaborator (see spec §6) and transmitted verbatim.

use bytes::{Buf, BufMut, Bytes};

use crate::codec::{WireDecode, WireEncode};
use crate::error::CodecError;
use crate::varint::VarInt;

pub const CB_DISCONNECT: i32 = 0x00;
pub const CB_REGISTRY_DATA: i32 = 0x03;
pub const CB_FINISH_CONFIGURATION: i32 = 0x07;
pub const SB_ACKNOWLEDGE_FINISH_CONFIGURATION: i32 = 0x03;

/// One registry/tag dump, sent through unparsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryData {
    pub raw: Bytes,
}

impl WireEncode for RegistryData {
    fn encode(&self, buf: &mut impl BufMut) {
        VarInt(self.raw.len() as i32).encode(buf);
        buf.put_slice(&self.raw);
    }
}

impl WireDecode for RegistryData {
    fn decode(buf: &mut impl Buf) -> Result<Self, CodecError> {
        let len = VarInt::decode(buf)?.0;
        if len < 0 {
            return Err(CodecError::ShortRead {
                needed: 0,
                available: buf.remaining(),
            });
        }
        let len = len as usize;
        if buf.remaining() < len {
            return Err(CodecError::ShortRead {
                needed: len,
                available: buf.remaining(),
            });
        }
        Ok(RegistryData {
            raw: buf.copy_to_bytes(len),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FinishConfiguration;

impl WireEncode for FinishConfiguration {
    fn encode(&self, _buf: &mut impl BufMut) {}
}

impl WireDecode for FinishConfiguration {
    fn decode(_buf: &mut impl Buf) -> Result<Self, CodecError> {
        Ok(FinishConfiguration)
    }
}

pub type AcknowledgeFinishConfiguration = FinishConfiguration;
