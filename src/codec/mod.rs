// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Wire framing and typed value encoding for streams.
//!
//! Every value that crosses a stream is carried in a self-delimiting frame:
//!
//! ```text
//! [kind: u8][len: u32 LE][payload: len bytes]
//! ```
//!
//! `kind` distinguishes data frames from the close marker a source emits
//! when it will send nothing further. Payloads are encoded by the [`Wire`]
//! trait: fixed-width little-endian for integer primitives, count-prefixed
//! elements for sequences, and JSON (via [`Json`]) for arbitrary serde
//! aggregates. The same layout is used by every output/input handle pair.
//!
//! The read side is [`DecodeBuffer`], which accumulates inbound bytes and
//! answers tri-state reads: a decoded value, "not enough bytes yet", or
//! "the peer will send nothing further". A complete-but-undecodable frame
//! is skipped deterministically and surfaced as [`ReadState::Corrupt`].

pub mod frame;

mod decode;
mod wire;

pub use decode::{DecodeBuffer, ReadState};
pub use frame::FrameKind;
pub use wire::{Json, Wire, WireError};

use bytes::{Bytes, BytesMut};

/// Encode one value as a complete data frame.
pub fn encode_data<T: Wire>(value: &T) -> Bytes {
    let mut payload = BytesMut::new();
    value.encode(&mut payload);
    let mut out = BytesMut::with_capacity(frame::HEADER_LEN + payload.len());
    frame::encode_frame(FrameKind::Data, &payload, &mut out);
    out.freeze()
}

/// Encode the close marker a source emits when it is done with a stream.
pub fn encode_close() -> Bytes {
    let mut out = BytesMut::with_capacity(frame::HEADER_LEN);
    frame::encode_frame(FrameKind::Close, &[], &mut out);
    out.freeze()
}
