//! Varint-length-prefixed packet framing, independent of any socket.
//!
//! Every packet on the wire is `VarInt(length)` followed by `length` bytes
//! of `VarInt(packet_id) + payload`. This module only ever looks at bytes
//! already sitting in a buffer — the server crate owns pulling those bytes
//! off a non-blocking socket.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::codec::{WireDecode, WireEncode};
use crate::error::CodecError;
use crate::varint::{peek_varint_len, VarInt};

/// Largest declared packet length we will ever accept. Guards against a
/// malicious or corrupt length prefix causing an unbounded allocation.
pub const MAX_PACKET_LEN: i32 = 2 * 1024 * 1024;

/// A single decoded packet: its id and payload (the payload still needs to
/// be parsed by the packet codec for the current connection state).
#[derive(Debug)]
pub struct PacketFrame {
    pub id: i32,
    pub payload: Bytes,
}

/// Describes a complete frame found in `buf` without consuming it:
/// the byte offset of its first byte (the length varint) and its total
/// length on the wire (length-prefix bytes + payload bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSpan {
    pub offset: usize,
    pub total_len: usize,
    pub packet_id: i32,
}

/// Look for one complete frame starting at `buf[offset..]` without
/// consuming anything. Returns `Ok(None)` if the buffer doesn't yet hold a
/// full length prefix or a full payload for the frame starting there.
pub fn peek_frame_at(buf: &[u8], offset: usize) -> Result<Option<FrameSpan>, CodecError> {
    let slice = &buf[offset..];
    if slice.is_empty() {
        return Ok(None);
    }
    let len_prefix_bytes = match peek_varint_len(slice) {
        Ok(n) => n,
        Err(CodecError::ShortRead { .. }) => return Ok(None),
        Err(e) => return Err(e),
    };
    let mut cursor = &slice[..];
    let declared_len = VarInt::decode(&mut cursor)?.0;
    if declared_len < 0 || declared_len > MAX_PACKET_LEN {
        return Err(CodecError::OversizedLength(declared_len));
    }
    let declared_len = declared_len as usize;
    let total_len = len_prefix_bytes + declared_len;
    if slice.len() < total_len {
        return Ok(None);
    }

    let payload = &slice[len_prefix_bytes..total_len];
    let mut payload_cursor = payload;
    let packet_id = VarInt::decode(&mut payload_cursor)?.0;

    Ok(Some(FrameSpan {
        offset,
        total_len,
        packet_id,
    }))
}

/// Pull the next complete packet out of the front of `buf`, if any, and
/// advance `buf` past it. Returns `Ok(None)` when more bytes are needed.
pub fn try_read_packet(buf: &mut BytesMut) -> Result<Option<PacketFrame>, CodecError> {
    let span = match peek_frame_at(buf, 0)? {
        Some(span) => span,
        None => return Ok(None),
    };

    let len_prefix_bytes = peek_varint_len(buf)?;
    let mut frame_bytes = buf.split_to(span.total_len);
    frame_bytes.advance(len_prefix_bytes);
    let id = VarInt::decode(&mut frame_bytes)?;

    Ok(Some(PacketFrame {
        id: id.0,
        payload: frame_bytes.freeze(),
    }))
}

/// Write one complete framed packet (`VarInt length` + `VarInt id` + body).
pub fn write_packet(out: &mut BytesMut, id: i32, body: &[u8]) {
    let mut id_and_body = BytesMut::with_capacity(5 + body.len());
    VarInt(id).encode(&mut id_and_body);
    id_and_body.extend_from_slice(body);

    VarInt(id_and_body.len() as i32).encode(out);
    out.extend_from_slice(&id_and_body);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_roundtrips() {
        let mut buf = BytesMut::new();
        write_packet(&mut buf, 0x42, b"payload-bytes");
        let frame = try_read_packet(&mut buf).unwrap().unwrap();
        assert_eq!(frame.id, 0x42);
        assert_eq!(&frame.payload[..], b"payload-bytes");
        assert!(buf.is_empty());
    }

    #[test]
    fn partial_frame_returns_none() {
        let mut full = BytesMut::new();
        write_packet(&mut full, 1, b"hello world");
        let mut partial = BytesMut::from(&full[..full.len() - 2]);
        assert!(try_read_packet(&mut partial).unwrap().is_none());
    }

    #[test]
    fn multiple_frames_in_one_buffer() {
        let mut buf = BytesMut::new();
        write_packet(&mut buf, 1, b"one");
        write_packet(&mut buf, 2, b"two");
        let first = try_read_packet(&mut buf).unwrap().unwrap();
        let second = try_read_packet(&mut buf).unwrap().unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(&first.payload[..], b"one");
        assert_eq!(second.id, 2);
        assert_eq!(&second.payload[..], b"two");
        assert!(buf.is_empty());
    }

    #[test]
    fn oversized_length_is_rejected() {
        let mut buf = BytesMut::new();
        VarInt(MAX_PACKET_LEN + 1).encode(&mut buf);
        assert!(matches!(
            try_read_packet(&mut buf),
            Err(CodecError::OversizedLength(_))
        ));
    }

    #[test]
    fn peek_frame_at_does_not_consume() {
        let mut buf = BytesMut::new();
        write_packet(&mut buf, 7, b"abc");
        let before = buf.len();
        let span = peek_frame_at(&buf, 0).unwrap().unwrap();
        assert_eq!(buf.len(), before);
        assert_eq!(span.packet_id, 7);
        assert_eq!(span.total_len, buf.len());
    }

    #[test]
    fn framing_idempotence_matches_direct_field_writes() {
        // Writing via packet_start/write*/flush-equivalent (write_packet)
        // must equal writing each field by hand.
        let mut via_helper = BytesMut::new();
        write_packet(&mut via_helper, 5, b"xy");

        let mut manual = BytesMut::new();
        let mut id_and_body = BytesMut::new();
        VarInt(5).encode(&mut id_and_body);
        id_and_body.extend_from_slice(b"xy");
        VarInt(id_and_body.len() as i32).encode(&mut manual);
        manual.extend_from_slice(&id_and_body);

        assert_eq!(via_helper, manual);
    }
}
