//! Event-driven graph executor.
//!
//! The executor takes a frozen topology and drives it to quiescence:
//!
//! 1. **Configured**: the graph validated and placements checked; nothing
//!    is running yet.
//! 2. **Running**: one tokio task per vertex. Each task runs its start
//!    callback once, then loops on the vertex's mailbox, dispatching
//!    arriving frames to the matching registered stream callback. A
//!    vertex's callbacks never overlap; different vertices run freely in
//!    parallel, bounded per container by a semaphore holding the
//!    container's declared CPU budget.
//! 3. **Draining**: every vertex quiesced (all callbacks deregistered or
//!    all streams closed, outbound frames flushed); channels and budgets
//!    are released.
//! 4. **Terminated**: `run` resolves with an [`ExecutionReport`].
//!
//! # Delivery model
//!
//! Every stream's output half writes framed values into the destination
//! vertex's bounded mailbox. Because a stream has exactly one producer
//! task and the mailbox preserves per-sender order, delivery is FIFO per
//! stream; no ordering holds across different streams feeding the same
//! vertex. A full mailbox suspends the sender between its callback
//! invocations, it never drops frames.
//!
//! # Completion
//!
//! Quiescence is explicit: a vertex exits its loop when no input stream
//! can ever invoke a callback again, emits close markers on all of its
//! output streams, and reports its counters. The executor joins every
//! vertex task and only then releases resources, so `run` returning means
//! the whole graph is down.
//!
//! # Failure
//!
//! A panicking callback kills only its own vertex task. Under
//! [`FailurePolicy::FailFast`] the executor cancels the remaining
//! vertices and fails the run; under [`FailurePolicy::BestEffort`] it
//! emits close markers on the dead vertex's output streams so downstream
//! callbacks observe end-of-stream, lets the rest of the graph drain, and
//! lists the casualty in the report.

use crate::config::{consts, ExecutorOptions};
use crate::errors::{ConfigError, ExecutionError, FailurePolicy};
use crate::graph::{Graph, StreamId, VertexId};
use crate::graph::topology::Topology;
use crate::observability::messages::engine::{
    ExecutionCompleted, ExecutionFailed, ExecutionStarted, StateChanged,
};
use crate::observability::messages::vertex::VertexFailed;
use crate::observability::messages::StructuredLog;
use crate::codec::encode_close;
use crate::engine::worker::{InputSlot, VertexWorker};
use crate::runtime::{InputStream, OutputStream, StreamEvent, Vertex};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Executor lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Configured,
    Running,
    Draining,
    Terminated,
}

impl State {
    pub fn as_str(self) -> &'static str {
        match self {
            State::Configured => "configured",
            State::Running => "running",
            State::Draining => "draining",
            State::Terminated => "terminated",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters describing one completed run.
#[derive(Debug)]
pub struct ExecutionReport {
    /// Vertices instantiated for the run
    pub vertices: usize,
    /// Data frames delivered into vertex mailboxes
    pub frames_delivered: u64,
    /// Vertices that died mid-run (best-effort policy only)
    pub failed: Vec<VertexId>,
    /// Wall time from running to terminated
    pub duration: Duration,
}

/// Runtime driving a frozen graph to completion.
pub struct Executor {
    topology: Topology,
    options: ExecutorOptions,
    shutdown: CancellationToken,
}

impl Executor {
    /// Freeze and validate `graph` with default options. Placement
    /// violations surface here; the executor never starts running.
    pub fn new(graph: Graph) -> Result<Self, ConfigError> {
        Self::with_options(graph, ExecutorOptions::default())
    }

    /// Freeze and validate `graph` with explicit tuning options.
    pub fn with_options(graph: Graph, options: ExecutorOptions) -> Result<Self, ConfigError> {
        let topology = graph.freeze(&options)?;
        Ok(Self {
            topology,
            options,
            shutdown: CancellationToken::new(),
        })
    }

    /// Handle for forcing a shutdown from outside the graph. Cancelling
    /// it closes every vertex's input streams; callbacks observe the
    /// closed condition and the graph drains.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run the graph to termination. Resolves once every vertex task has
    /// been joined and resources are released.
    pub async fn run(self) -> Result<ExecutionReport, ExecutionError> {
        let Executor {
            topology,
            options,
            shutdown,
        } = self;

        let started = Instant::now();
        let mut state = State::Configured;
        transition(&mut state, State::Running);
        ExecutionStarted {
            vertices: topology.vertices.len(),
            streams: topology.streams.len(),
            containers: topology.containers.len(),
        }
        .log();

        let policy = options.failure_policy.unwrap_or_default();
        let capacity = options
            .channel_capacity
            .unwrap_or(consts::DEFAULT_CHANNEL_CAPACITY)
            .max(1);

        let vertex_count = topology.vertices.len();
        let mut senders = Vec::with_capacity(vertex_count);
        let mut receivers = Vec::with_capacity(vertex_count);
        for _ in 0..vertex_count {
            let (tx, rx) = mpsc::channel::<StreamEvent>(capacity);
            senders.push(tx);
            receivers.push(rx);
        }

        let budgets: Vec<Arc<Semaphore>> = topology
            .containers
            .iter()
            .map(|container| Arc::new(Semaphore::new(container.cpus as usize)))
            .collect();

        let Topology {
            vertices,
            streams,
            placement,
            ..
        } = topology;

        let mut outputs: Vec<HashMap<StreamId, OutputStream>> =
            (0..vertex_count).map(|_| HashMap::new()).collect();
        let mut inputs: Vec<HashMap<StreamId, InputSlot>> =
            (0..vertex_count).map(|_| HashMap::new()).collect();
        // under best-effort the executor keeps a sender per stream so it
        // can close a dead vertex's streams on its behalf
        let mut closers: Vec<Vec<(StreamId, mpsc::Sender<StreamEvent>)>> =
            (0..vertex_count).map(|_| Vec::new()).collect();

        for spec in streams {
            let src = spec.src.index();
            let dst = spec.dst.index();
            outputs[src].insert(
                spec.id,
                OutputStream::new(spec.id, spec.dst, senders[dst].clone()),
            );
            if policy == FailurePolicy::BestEffort {
                closers[src].push((spec.id, senders[dst].clone()));
            }
            inputs[dst].insert(spec.id, InputSlot::new(InputStream::new(spec.id), spec.on));
        }
        drop(senders);

        let mut join_set = JoinSet::new();
        let mut task_vertices: HashMap<tokio::task::Id, VertexId> = HashMap::new();
        for (((spec, outs), ins), rx) in vertices
            .into_iter()
            .zip(outputs)
            .zip(inputs)
            .zip(receivers)
        {
            let vertex_id = spec.id;
            let budget = budgets[placement[vertex_id.index()].index()].clone();
            let worker = VertexWorker::new(
                vertex_id,
                spec.start,
                Vertex::new(vertex_id, outs),
                ins,
                rx,
                budget,
                shutdown.clone(),
            );
            let handle = join_set.spawn(worker.run());
            task_vertices.insert(handle.id(), vertex_id);
        }

        let mut frames_delivered = 0u64;
        let mut failed: Vec<VertexId> = Vec::new();
        let mut fatal: Option<ExecutionError> = None;

        while let Some(joined) = join_set.join_next_with_id().await {
            match joined {
                Ok((_, Ok(stats))) => {
                    frames_delivered += stats.frames_in;
                }
                Ok((task, Err(error))) => {
                    match task_vertices.get(&task).copied() {
                        Some(vertex) => {
                            absorb_failure(
                                policy, &shutdown, &mut closers, &mut failed, &mut fatal, vertex,
                                error,
                            )
                            .await;
                        }
                        None => {
                            fatal.get_or_insert(error);
                        }
                    }
                }
                Err(join_error) => {
                    let task = join_error.id();
                    match task_vertices.get(&task).copied() {
                        Some(vertex) => {
                            let error = ExecutionError::VertexPanicked {
                                vertex,
                                message: join_error.to_string(),
                            };
                            absorb_failure(
                                policy, &shutdown, &mut closers, &mut failed, &mut fatal, vertex,
                                error,
                            )
                            .await;
                        }
                        None => {
                            fatal.get_or_insert(ExecutionError::Internal {
                                message: format!("joined a task no vertex owns: {join_error}"),
                            });
                        }
                    }
                }
            }
        }

        transition(&mut state, State::Draining);
        drop(closers);
        drop(budgets);

        let report = ExecutionReport {
            vertices: vertex_count,
            frames_delivered,
            failed,
            duration: started.elapsed(),
        };
        transition(&mut state, State::Terminated);

        match fatal {
            Some(error) => {
                ExecutionFailed { error: &error }.log();
                Err(error)
            }
            None => {
                ExecutionCompleted {
                    vertices: report.vertices,
                    frames: report.frames_delivered,
                    duration: report.duration,
                }
                .log();
                Ok(report)
            }
        }
    }
}

fn transition(state: &mut State, to: State) {
    StateChanged {
        from: state.as_str(),
        to: to.as_str(),
    }
    .log();
    *state = to;
}

/// Record a dead vertex according to the failure policy: fail-fast cancels
/// the rest of the graph, best-effort closes the casualty's output streams
/// so downstream vertices observe end-of-stream and keep draining.
async fn absorb_failure(
    policy: FailurePolicy,
    shutdown: &CancellationToken,
    closers: &mut [Vec<(StreamId, mpsc::Sender<StreamEvent>)>],
    failed: &mut Vec<VertexId>,
    fatal: &mut Option<ExecutionError>,
    vertex: VertexId,
    error: ExecutionError,
) {
    VertexFailed {
        vertex,
        error: &error,
    }
    .log();
    match policy {
        FailurePolicy::FailFast => {
            shutdown.cancel();
            if fatal.is_none() {
                *fatal = Some(error);
            }
        }
        FailurePolicy::BestEffort => {
            failed.push(vertex);
            for (stream, tx) in closers[vertex.index()].drain(..) {
                let _ = tx
                    .send(StreamEvent {
                        stream,
                        bytes: encode_close(),
                    })
                    .await;
            }
        }
    }
}
