use crate::codec::{frame, FrameKind};
use crate::errors::ExecutionError;
use crate::graph::{StreamId, VertexId};
use crate::observability::messages::vertex::{
    CallbackRemoved, StreamClosed, VertexActivated, VertexCompleted,
};
use crate::observability::messages::StructuredLog;
use crate::runtime::{InputStream, Signal, StartFn, StreamEvent, StreamFn, Vertex};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use std::sync::Arc;

/// One inbound stream of a vertex: its decode state, the registered
/// callback (if any), and whether the close notification was delivered.
pub(crate) struct InputSlot {
    stream: InputStream,
    callback: Option<StreamFn>,
    close_notified: bool,
}

impl InputSlot {
    pub(crate) fn new(stream: InputStream, callback: Option<StreamFn>) -> Self {
        Self {
            stream,
            callback,
            close_notified: false,
        }
    }
}

/// Counters a vertex reports when it quiesces.
pub(crate) struct VertexStats {
    pub vertex: VertexId,
    pub frames_in: u64,
    pub frames_out: u64,
}

enum Action {
    /// Run the callback: a value may be ready, or `closing` marks the
    /// final end-of-stream notification.
    Invoke { callback: StreamFn, closing: bool },
    /// Callback deregistered; whatever arrived is discarded.
    Drain,
    Idle,
}

/// The event loop of one vertex: the single thread of control on which
/// every callback of that vertex runs. Exclusivity of the vertex context
/// falls out of this loop never invoking two callbacks at once.
pub(crate) struct VertexWorker {
    id: VertexId,
    start: Option<StartFn>,
    vertex: Vertex,
    inputs: HashMap<StreamId, InputSlot>,
    rx: mpsc::Receiver<StreamEvent>,
    budget: Arc<Semaphore>,
    shutdown: CancellationToken,
    frames_in: u64,
}

impl VertexWorker {
    pub(crate) fn new(
        id: VertexId,
        start: Option<StartFn>,
        vertex: Vertex,
        inputs: HashMap<StreamId, InputSlot>,
        rx: mpsc::Receiver<StreamEvent>,
        budget: Arc<Semaphore>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            id,
            start,
            vertex,
            inputs,
            rx,
            budget,
            shutdown,
            frames_in: 0,
        }
    }

    pub(crate) async fn run(mut self) -> Result<VertexStats, ExecutionError> {
        VertexActivated { vertex: self.id }.log();

        if let Some(mut start) = self.start.take() {
            let permit = Self::acquire(&self.budget, self.id).await?;
            start(&mut self.vertex);
            drop(permit);
            self.flush_outputs().await;
        }

        while !self.done() {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    self.close_all_inputs();
                    self.deliver_pending_closes().await?;
                    break;
                }
                event = self.rx.recv() => match event {
                    Some(event) => self.handle_event(event).await?,
                    None => {
                        // every upstream sender is gone without a close
                        // frame; treat the remaining streams as closed
                        self.close_all_inputs();
                        self.deliver_pending_closes().await?;
                    }
                },
            }
        }

        self.vertex.close_outputs();
        self.flush_outputs().await;

        let stats = VertexStats {
            vertex: self.id,
            frames_in: self.frames_in,
            frames_out: self.vertex.frames_out(),
        };
        VertexCompleted {
            vertex: stats.vertex,
            frames_in: stats.frames_in,
            frames_out: stats.frames_out,
        }
        .log();
        Ok(stats)
    }

    /// A vertex is done once no stream can ever invoke a callback again.
    fn done(&self) -> bool {
        self.inputs.values().all(|slot| slot.callback.is_none())
    }

    async fn handle_event(&mut self, event: StreamEvent) -> Result<(), ExecutionError> {
        let Some(slot) = self.inputs.get_mut(&event.stream) else {
            return Err(ExecutionError::Internal {
                message: format!(
                    "vertex {} received a frame for unknown stream {}",
                    self.id, event.stream
                ),
            });
        };
        match frame::peek_kind(&event.bytes) {
            Some(FrameKind::Close) => slot.stream.mark_closed(),
            Some(FrameKind::Data) => {
                self.frames_in += 1;
                slot.stream.push(&event.bytes);
            }
            // unrecognized kind byte: buffer it so the callback observes
            // the corrupt frame instead of the engine hiding it
            None => slot.stream.push(&event.bytes),
        }
        self.pump(event.stream).await
    }

    /// Dispatch buffered values and close notifications for one stream
    /// until it has nothing actionable left.
    async fn pump(&mut self, stream_id: StreamId) -> Result<(), ExecutionError> {
        loop {
            let Some(slot) = self.inputs.get_mut(&stream_id) else {
                return Ok(());
            };

            let action = if let Some(callback) = slot.callback.take() {
                if slot.stream.has_frame() {
                    Action::Invoke {
                        callback,
                        closing: false,
                    }
                } else if slot.stream.is_closed() && !slot.close_notified {
                    Action::Invoke {
                        callback,
                        closing: true,
                    }
                } else {
                    slot.callback = Some(callback);
                    Action::Idle
                }
            } else if slot.stream.buffered_len() > 0 {
                Action::Drain
            } else {
                Action::Idle
            };

            match action {
                Action::Idle => return Ok(()),
                Action::Drain => {
                    slot.stream.discard();
                    return Ok(());
                }
                Action::Invoke {
                    mut callback,
                    closing,
                } => {
                    let buffered_before = slot.stream.buffered_len();
                    let permit = Self::acquire(&self.budget, self.id).await?;
                    let signal = callback(&mut self.vertex, &mut slot.stream);
                    drop(permit);

                    let consumed = slot.stream.buffered_len() != buffered_before;
                    let mut rearmed = false;
                    if closing {
                        // the close notification is final; the callback is
                        // deregistered whatever it returned
                        slot.close_notified = true;
                        StreamClosed {
                            vertex: self.id,
                            stream: stream_id,
                        }
                        .log();
                    } else {
                        match signal {
                            Signal::Continue => {
                                slot.callback = Some(callback);
                                rearmed = true;
                            }
                            Signal::Remove => {
                                CallbackRemoved {
                                    vertex: self.id,
                                    stream: stream_id,
                                }
                                .log();
                            }
                        }
                    }

                    self.flush_outputs().await;

                    if rearmed && !consumed {
                        // a callback that consumed nothing waits for the
                        // next arrival instead of spinning on this frame
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn deliver_pending_closes(&mut self) -> Result<(), ExecutionError> {
        let stream_ids: Vec<StreamId> = self.inputs.keys().copied().collect();
        for stream_id in stream_ids {
            self.pump(stream_id).await?;
        }
        Ok(())
    }

    fn close_all_inputs(&mut self) {
        for slot in self.inputs.values_mut() {
            slot.stream.mark_closed();
        }
    }

    async fn flush_outputs(&mut self) {
        for output in self.vertex.outputs_mut() {
            output.flush(&self.shutdown).await;
        }
    }

    async fn acquire(
        budget: &Arc<Semaphore>,
        vertex: VertexId,
    ) -> Result<OwnedSemaphorePermit, ExecutionError> {
        budget
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ExecutionError::Internal {
                message: format!("container budget closed while vertex {vertex} was waiting"),
            })
    }
}
