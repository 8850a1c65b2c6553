// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Frame header layout and splitting.

use crate::codec::wire::WireError;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Bytes occupied by the frame header: one kind byte plus a u32 LE length.
pub const HEADER_LEN: usize = 5;

/// Upper bound on a single frame payload. A header announcing more than
/// this poisons the channel: the length field can no longer be trusted,
/// so there is no safe way to resynchronize.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Frame discriminator on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// A frame carrying one encoded value
    Data = 0x01,
    /// The source will send nothing further on this stream
    Close = 0x02,
}

impl FrameKind {
    fn from_u8(byte: u8) -> Result<Self, WireError> {
        match byte {
            0x01 => Ok(FrameKind::Data),
            0x02 => Ok(FrameKind::Close),
            other => Err(WireError::UnknownKind(other)),
        }
    }
}

/// Append one frame (header + payload) to `out`.
pub fn encode_frame(kind: FrameKind, payload: &[u8], out: &mut BytesMut) {
    out.put_u8(kind as u8);
    out.put_u32_le(payload.len() as u32);
    out.put_slice(payload);
}

/// Peek the kind of the frame starting at the head of `bytes`, if any.
pub fn peek_kind(bytes: &[u8]) -> Option<FrameKind> {
    bytes.first().and_then(|b| FrameKind::from_u8(*b).ok())
}

/// Split one complete frame off the front of `buf`.
///
/// Returns `Ok(None)` when the buffer does not yet hold a complete frame
/// (the buffer is untouched). On `Err(WireError::UnknownKind)` the frame
/// was well-delimited and has been consumed; on `Err(WireError::Oversize)`
/// nothing was consumed and the buffer contents cannot be trusted.
pub fn split_frame(buf: &mut BytesMut) -> Result<Option<(FrameKind, Bytes)>, WireError> {
    if buf.len() < HEADER_LEN {
        return Ok(None);
    }
    let len = u32::from_le_bytes([buf[1], buf[2], buf[3], buf[4]]) as usize;
    if len > MAX_FRAME_LEN {
        return Err(WireError::Oversize(len));
    }
    if buf.len() < HEADER_LEN + len {
        return Ok(None);
    }
    let kind = FrameKind::from_u8(buf[0]);
    let mut frame = buf.split_to(HEADER_LEN + len);
    frame.advance(HEADER_LEN);
    match kind {
        Ok(kind) => Ok(Some((kind, frame.freeze()))),
        Err(e) => Err(e),
    }
}
