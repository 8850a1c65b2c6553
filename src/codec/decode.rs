// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::codec::frame::{self, FrameKind, HEADER_LEN};
use crate::codec::wire::{Wire, WireError};
use bytes::BytesMut;

/// Outcome of one read attempt against a [`DecodeBuffer`].
#[derive(Debug)]
pub enum ReadState<T> {
    /// One complete value was decoded; the buffer advanced past its frame.
    Ready(T),
    /// No complete frame is buffered yet; wait for more input.
    Pending,
    /// The peer will send nothing further on this channel.
    Closed,
    /// A complete frame was present but did not decode. The frame has been
    /// skipped; the next read continues with whatever follows it.
    Corrupt(WireError),
}

/// Accumulates the inbound byte stream of one channel and decodes it frame
/// by frame.
///
/// The read cursor advances past a frame only when that frame has been
/// fully consumed: a `Pending` result leaves the buffer untouched. An
/// oversize frame header poisons the buffer, since the announced length
/// can no longer be trusted; the remaining bytes are discarded and the
/// channel reads as closed from then on.
#[derive(Debug, Default)]
pub struct DecodeBuffer {
    buf: BytesMut,
    closed: bool,
    poisoned: bool,
}

impl DecodeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw framed bytes arriving from the peer.
    pub fn extend(&mut self, bytes: &[u8]) {
        if !self.poisoned {
            self.buf.extend_from_slice(bytes);
        }
    }

    /// Record that the peer is gone, whether or not a close frame arrived.
    pub fn mark_closed(&mut self) {
        self.closed = true;
    }

    /// True once the close marker (or a forced close) has been observed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// True when a complete frame is buffered and a read would not pend.
    pub fn has_frame(&self) -> bool {
        if self.poisoned || self.buf.len() < HEADER_LEN {
            return false;
        }
        let len = u32::from_le_bytes([self.buf[1], self.buf[2], self.buf[3], self.buf[4]]) as usize;
        len > frame::MAX_FRAME_LEN || self.buf.len() >= HEADER_LEN + len
    }

    /// Bytes currently buffered.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Drop everything buffered, keeping the closed flag.
    pub fn discard(&mut self) {
        self.buf.clear();
    }

    /// Attempt to decode exactly one value.
    pub fn read<T: Wire>(&mut self) -> ReadState<T> {
        loop {
            if self.poisoned {
                return ReadState::Closed;
            }
            match frame::split_frame(&mut self.buf) {
                Ok(Some((FrameKind::Data, payload))) => {
                    return match T::decode(&payload) {
                        Ok(value) => ReadState::Ready(value),
                        Err(e) => ReadState::Corrupt(e),
                    };
                }
                Ok(Some((FrameKind::Close, _))) => {
                    self.closed = true;
                }
                Ok(None) => {
                    return if self.closed {
                        ReadState::Closed
                    } else {
                        ReadState::Pending
                    };
                }
                Err(e @ WireError::Oversize(_)) => {
                    self.poisoned = true;
                    self.buf.clear();
                    return ReadState::Corrupt(e);
                }
                Err(e) => return ReadState::Corrupt(e),
            }
        }
    }
}
