//! Encode/decode traits shared by every wire type and packet.

use bytes::{Buf, BufMut};

use crate::error::CodecError;

/// Encode a value onto a buffer in wire format.
pub trait WireEncode {
    fn encode(&self, buf: &mut impl BufMut);
}

/// Decode a value from a buffer in wire format.
pub trait WireDecode: Sized {
    fn decode(buf: &mut impl Buf) -> Result<Self, CodecError>;
}

fn need(buf: &impl Buf, needed: usize) -> Result<(), CodecError> {
    if buf.remaining() < needed {
        Err(CodecError::ShortRead {
            needed,
            available: buf.remaining(),
        })
    } else {
        Ok(())
    }
}

macro_rules! impl_be_prim {
    ($ty:ty, $get:ident, $put:ident) => {
        impl WireEncode for $ty {
            fn encode(&self, buf: &mut impl BufMut) {
                buf.$put(*self);
            }
        }

        impl WireDecode for $ty {
            fn decode(buf: &mut impl Buf) -> Result<Self, CodecError> {
                need(buf, std::mem::size_of::<$ty>())?;
                Ok(buf.$get())
            }
        }
    };
}

impl_be_prim!(u8, get_u8, put_u8);
impl_be_prim!(i8, get_i8, put_i8);
impl_be_prim!(u16, get_u16, put_u16);
impl_be_prim!(i16, get_i16, put_i16);
impl_be_prim!(u32, get_u32, put_u32);
impl_be_prim!(i32, get_i32, put_i32);
impl_be_prim!(u64, get_u64, put_u64);
impl_be_prim!(i64, get_i64, put_i64);
impl_be_prim!(f32, get_f32, put_f32);
impl_be_prim!(f64, get_f64, put_f64);
