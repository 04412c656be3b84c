//! `status` state: JSON server-list-ping description and echoed pings.

use bytes::{Buf, BufMut};

use crate::binary::{read_string, write_string};
use crate::codec::{WireDecode, WireEncode};
use crate::error::CodecError;

pub const SB_STATUS_REQUEST: i32 = 0x00;
pub const SB_PING_REQUEST: i32 = 0x01;
pub const CB_STATUS_RESPONSE: i32 = 0x00;
pub const CB_PONG_RESPONSE: i32 = 0x01;

/// Maximum length of the status JSON document we will read back (we only
/// ever read our own output in tests, but the cap mirrors real clients'
/// expectations for a well-behaved server).
pub const MAX_STATUS_JSON_LEN: usize = 32 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusRequest;

impl WireEncode for StatusRequest {
    fn encode(&self, _buf: &mut impl BufMut) {}
}

impl WireDecode for StatusRequest {
    fn decode(_buf: &mut impl Buf) -> Result<Self, CodecError> {
        Ok(StatusRequest)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResponse {
    pub json: String,
}

impl WireEncode for StatusResponse {
    fn encode(&self, buf: &mut impl BufMut) {
        write_string(buf, &self.json);
    }
}

impl WireDecode for StatusResponse {
    fn decode(buf: &mut impl Buf) -> Result<Self, CodecError> {
        Ok(StatusResponse {
            json: read_string(buf, MAX_STATUS_JSON_LEN)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingRequest {
    pub payload: i64,
}

impl WireEncode for PingRequest {
    fn encode(&self, buf: &mut impl BufMut) {
        buf.put_i64(self.payload);
    }
}

impl WireDecode for PingRequest {
    fn decode(buf: &mut impl Buf) -> Result<Self, CodecError> {
        if buf.remaining() < 8 {
            return Err(CodecError::ShortRead {
                needed: 8,
                available: buf.remaining(),
            });
        }
        Ok(PingRequest {
            payload: buf.get_i64(),
        })
    }
}

pub type PongResponse = PingRequest;

/// Build the status JSON document for a server-list ping.
pub fn build_status_json(
    protocol_version: i32,
    version_name: &str,
    motd: &str,
    max_players: u32,
    online_players: u32,
) -> String {
    format!(
        "{{\"version\":{{\"name\":\"{version_name}\",\"protocol\":{protocol_version}}},\
         \"players\":{{\"max\":{max_players},\"online\":{online_players},\"sample\":[]}},\
         \"description\":{{\"text\":\"{motd}\"}}}}"
    )
}
