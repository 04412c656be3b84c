//! `login` state.

use bytes::{Buf, BufMut};

use crate::binary::{read_string, write_string};
use crate::codec::{WireDecode, WireEncode};
use crate::error::CodecError;

pub const SB_LOGIN_START: i32 = 0x00;
pub const CB_DISCONNECT: i32 = 0x00;
pub const CB_LOGIN_SUCCESS: i32 = 0x02;

pub const MAX_USERNAME_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginStart {
    pub username: String,
    pub uuid: u128,
}

impl WireEncode for LoginStart {
    fn encode(&self, buf: &mut impl BufMut) {
        write_string(buf, &self.username);
        buf.put_u128(self.uuid);
    }
}

impl WireDecode for LoginStart {
    fn decode(buf: &mut impl Buf) -> Result<Self, CodecError> {
        let username = read_string(buf, MAX_USERNAME_LEN)?;
        if buf.remaining() < 16 {
            return Err(CodecError::ShortRead {
                needed: 16,
                available: buf.remaining(),
            });
        }
        Ok(LoginStart {
            username,
            uuid: buf.get_u128(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSuccess {
    pub uuid: u128,
    pub username: String,
}

impl WireEncode for LoginSuccess {
    fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u128(self.uuid);
        write_string(buf, &self.username);
    }
}

impl WireDecode for LoginSuccess {
    fn decode(buf: &mut impl Buf) -> Result<Self, CodecError> {
        if buf.remaining() < 16 {
            return Err(CodecError::ShortRead {
                needed: 16,
                available: buf.remaining(),
            });
        }
        let uuid = buf.get_u128();
        let username = read_string(buf, MAX_USERNAME_LEN)?;
        Ok(LoginSuccess { uuid, username })
    }
}

/// Sent on any fatal error in any state; carries a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disconnect {
    pub reason: String,
}

pub const MAX_DISCONNECT_REASON_LEN: usize = 4096;

impl WireEncode for Disconnect {
    fn encode(&self, buf: &mut impl BufMut) {
        write_string(buf, &self.reason);
    }
}

impl WireDecode for Disconnect {
    fn decode(buf: &mut impl Buf) -> Result<Self, CodecError> {
        Ok(Disconnect {
            reason: read_string(buf, MAX_DISCONNECT_REASON_LEN)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn login_start_roundtrip() {
        let ls = LoginStart {
            username: "Tester".into(),
            uuid: 0xDEAD_BEEF_u128,
        };
        let mut buf = BytesMut::new();
        ls.encode(&mut buf);
        let mut frozen = buf.freeze();
        assert_eq!(LoginStart::decode(&mut frozen).unwrap(), ls);
    }

    #[test]
    fn login_success_carries_same_uuid() {
        let ls = LoginStart {
            username: "Tester".into(),
            uuid: 42,
        };
        let success = LoginSuccess {
            uuid: ls.uuid,
            username: ls.username.clone(),
        };
        let mut buf = BytesMut::new();
        success.encode(&mut buf);
        let mut frozen = buf.freeze();
        let decoded = LoginSuccess::decode(&mut frozen).unwrap();
        assert_eq!(decoded.uuid, ls.uuid);
        assert_eq!(decoded.username, ls.username);
    }
}
