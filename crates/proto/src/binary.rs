//! Length-prefixed strings and the packed block-position encoding.

use bytes::{Buf, BufMut};

use crate::codec::{WireDecode, WireEncode};
use crate::error::CodecError;
use crate::varint::VarInt;

/// Write a `VarInt` length followed by the UTF-8 bytes of `s`.
pub fn write_string(buf: &mut impl BufMut, s: &str) {
    VarInt(s.len() as i32).encode(buf);
    buf.put_slice(s.as_bytes());
}

/// Read a length-prefixed UTF-8 string, truncating (by reading and
/// discarding the tail) if the declared length exceeds `max_len` bytes.
pub fn read_string(buf: &mut impl Buf, max_len: usize) -> Result<String, CodecError> {
    let len = VarInt::decode(buf)?.0;
    if len < 0 {
        return Err(CodecError::InvalidUtf8);
    }
    let len = len as usize;
    if buf.remaining() < len {
        return Err(CodecError::ShortRead {
            needed: len,
            available: buf.remaining(),
        });
    }

    let keep = len.min(max_len);
    let mut kept = vec![0u8; keep];
    buf.copy_to_slice(&mut kept);
    // Discard the truncated tail so framing stays aligned with the wire.
    buf.advance(len - keep);

    String::from_utf8(kept).map_err(|_| CodecError::InvalidUtf8)
}

/// Pack a block position into the compact 8-byte wire form:
/// `((x & 0x3FFFFFF) << 38) | ((z & 0x3FFFFFF) << 12) | (y & 0xFFF)`.
///
/// `x` and `z` must fit in 26 signed bits, `y` in 12 signed bits.
pub fn pack_position(x: i32, y: i32, z: i32) -> u64 {
    let xu = (x as i64 & 0x3FF_FFFF) as u64;
    let zu = (z as i64 & 0x3FF_FFFF) as u64;
    let yu = (y as i64 & 0xFFF) as u64;
    (xu << 38) | (zu << 12) | yu
}

/// Inverse of [`pack_position`], sign-extending each field back to `i32`.
pub fn unpack_position(packed: u64) -> (i32, i32, i32) {
    let mut x = (packed >> 38) as i64;
    let mut z = ((packed >> 12) & 0x3FF_FFFF) as i64;
    let mut y = (packed & 0xFFF) as i64;

    if x >= 1 << 25 {
        x -= 1 << 26;
    }
    if z >= 1 << 25 {
        z -= 1 << 26;
    }
    if y >= 1 << 11 {
        y -= 1 << 12;
    }

    (x as i32, y as i32, z as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn string_roundtrip() {
        let mut buf = BytesMut::new();
        write_string(&mut buf, "Steve");
        let mut frozen = buf.freeze();
        assert_eq!(read_string(&mut frozen, 64).unwrap(), "Steve");
    }

    #[test]
    fn string_truncation_discards_tail() {
        let mut buf = BytesMut::new();
        write_string(&mut buf, "hello world");
        buf.put_u8(0xAB); // sentinel byte following the string on the wire
        let mut frozen = buf.freeze();
        assert_eq!(read_string(&mut frozen, 5).unwrap(), "hello");
        // The tail of the string was discarded, so the sentinel is next.
        assert_eq!(frozen.get_u8(), 0xAB);
    }

    #[test]
    fn position_packing_roundtrip_exhaustive_sample() {
        let xs = [-(1 << 25), -1, 0, 1, (1 << 25) - 1];
        let ys = [-(1 << 11), -1, 0, 1, (1 << 11) - 1];
        let zs = [-(1 << 25), -1, 0, 1, (1 << 25) - 1];
        for &x in &xs {
            for &y in &ys {
                for &z in &zs {
                    let packed = pack_position(x, y, z);
                    assert_eq!(unpack_position(packed), (x, y, z));
                }
            }
        }
    }

    #[test]
    fn position_packing_matches_spec_formula() {
        let packed = pack_position(1, 2, 3);
        let expected = ((1i64 & 0x3FF_FFFF) << 38) as u64
            | ((3i64 & 0x3FF_FFFF) << 12) as u64
            | (2i64 & 0xFFF) as u64;
        assert_eq!(packed, expected);
    }
}
