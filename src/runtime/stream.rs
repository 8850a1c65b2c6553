use crate::codec::{self, DecodeBuffer, ReadState, Wire};
use crate::graph::{StreamId, VertexId};
use bytes::Bytes;
use std::collections::VecDeque;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One framed delivery into a vertex's mailbox.
pub(crate) struct StreamEvent {
    pub stream: StreamId,
    pub bytes: Bytes,
}

/// The write half of a stream, owned by its source vertex.
///
/// `send` frames the value into a local pending queue and never blocks the
/// calling callback; the vertex event loop flushes pending frames between
/// callback invocations, suspending if the destination's mailbox is full.
pub struct OutputStream {
    id: StreamId,
    dst: VertexId,
    tx: mpsc::Sender<StreamEvent>,
    pending: VecDeque<Bytes>,
    closed: bool,
    sent: u64,
}

impl OutputStream {
    pub(crate) fn new(id: StreamId, dst: VertexId, tx: mpsc::Sender<StreamEvent>) -> Self {
        Self {
            id,
            dst,
            tx,
            pending: VecDeque::new(),
            closed: false,
            sent: 0,
        }
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Enqueue one value for in-order delivery to the destination vertex.
    /// Sending on a closed stream is a programming error.
    pub fn send<T: Wire>(&mut self, value: &T) {
        if self.closed {
            panic!("send on closed stream {}", self.id);
        }
        self.pending.push_back(codec::encode_data(value));
        self.sent += 1;
    }

    /// Mark end-of-stream. The destination observes the closed condition
    /// after every previously sent value. Idempotent.
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.pending.push_back(codec::encode_close());
        }
    }

    pub(crate) fn sent(&self) -> u64 {
        self.sent
    }

    /// Push pending frames into the destination mailbox, suspending while
    /// it is full. A destination that already completed has no reader;
    /// its frames are dropped, matching the discard-after-deregistration
    /// contract.
    pub(crate) async fn flush(&mut self, shutdown: &CancellationToken) {
        while let Some(frame) = self.pending.pop_front() {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    self.pending.clear();
                    return;
                }
                sent = self.tx.send(StreamEvent { stream: self.id, bytes: frame }) => {
                    if sent.is_err() {
                        tracing::trace!(
                            stream = %self.id,
                            dst = %self.dst,
                            "destination completed; dropping remaining frames"
                        );
                        self.pending.clear();
                        return;
                    }
                }
            }
        }
    }
}

/// The read half of a stream, owned by its destination vertex and handed
/// to the registered callback on every invocation.
pub struct InputStream {
    id: StreamId,
    chan: DecodeBuffer,
}

impl InputStream {
    pub(crate) fn new(id: StreamId) -> Self {
        Self {
            id,
            chan: DecodeBuffer::new(),
        }
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Attempt to decode the next value sent on this stream.
    pub fn read<T: Wire>(&mut self) -> ReadState<T> {
        self.chan.read()
    }

    pub(crate) fn push(&mut self, bytes: &[u8]) {
        self.chan.extend(bytes);
    }

    pub(crate) fn mark_closed(&mut self) {
        self.chan.mark_closed();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.chan.is_closed()
    }

    pub(crate) fn has_frame(&self) -> bool {
        self.chan.has_frame()
    }

    pub(crate) fn buffered_len(&self) -> usize {
        self.chan.buffered_len()
    }

    pub(crate) fn discard(&mut self) {
        self.chan.discard();
    }
}
