// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Graph building surface.
//!
//! A [`Graph`] records vertices, the directed streams between them, and
//! container placements, then freezes into a [`topology::Topology`] when
//! handed to the executor. Builder handles are cheap clones that stay
//! usable inside vertex callbacks; once the graph is frozen every builder
//! operation fails fast.
//!
//! ```
//! use the_millrace::graph::Graph;
//!
//! let mut graph = Graph::new();
//! let producer = graph.vertex();
//! let consumer = graph.vertex();
//! let stream = graph.stream(&producer, &consumer);
//! graph.container().add(&producer).add(&consumer).cpu(2);
//!
//! assert_eq!(stream.src(), producer.id());
//! assert_eq!(stream.dst(), consumer.id());
//! ```

pub(crate) mod topology;

use crate::config::ExecutorOptions;
use crate::errors::ConfigError;
use crate::runtime::{InputStream, Signal, Vertex};
use std::fmt;
use std::sync::{Arc, Mutex};
use topology::{Blueprint, Topology};

/// Identity of a vertex, unique within its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub(crate) usize);

impl VertexId {
    pub(crate) fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Identity of a stream, unique within its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub(crate) usize);

impl StreamId {
    pub(crate) fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Identity of a container, unique within its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(pub(crate) usize);

impl ContainerId {
    pub(crate) fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

type SharedBlueprint = Arc<Mutex<Option<Blueprint>>>;

fn with_blueprint<R>(cell: &SharedBlueprint, op: &str, f: impl FnOnce(&mut Blueprint) -> R) -> R {
    let mut guard = cell.lock().expect("graph lock poisoned");
    match guard.as_mut() {
        Some(blueprint) => f(blueprint),
        None => panic!("graph is frozen: cannot {op}"),
    }
}

/// Builder recording the static topology of a dataflow graph.
pub struct Graph {
    cell: SharedBlueprint,
}

impl Graph {
    pub fn new() -> Self {
        Self {
            cell: Arc::new(Mutex::new(Some(Blueprint::default()))),
        }
    }

    /// Allocate a new vertex.
    pub fn vertex(&mut self) -> VertexBuilder {
        let id = with_blueprint(&self.cell, "create a vertex", Blueprint::add_vertex);
        VertexBuilder {
            id,
            cell: self.cell.clone(),
        }
    }

    /// Allocate a directed stream between two vertices of this graph.
    ///
    /// Panics if either handle belongs to a different graph; that is a
    /// programming error, not a recoverable condition.
    pub fn stream(&mut self, src: &VertexBuilder, dst: &VertexBuilder) -> StreamBuilder {
        for endpoint in [src, dst] {
            if !Arc::ptr_eq(&self.cell, &endpoint.cell) {
                panic!("vertex {} does not belong to this graph", endpoint.id);
            }
        }
        let id = with_blueprint(&self.cell, "create a stream", |bp| {
            bp.add_stream(src.id, dst.id)
        });
        StreamBuilder {
            id,
            src: src.id,
            dst: dst.id,
            cell: self.cell.clone(),
        }
    }

    /// Open a new container slot for placement declarations.
    pub fn container(&mut self) -> ContainerBuilder {
        let id = with_blueprint(&self.cell, "create a container", Blueprint::add_container);
        ContainerBuilder {
            id,
            cell: self.cell.clone(),
        }
    }

    /// Freeze the topology and validate placements. Consumes the graph;
    /// builder handles outliving the freeze fail fast on use.
    pub(crate) fn freeze(self, options: &ExecutorOptions) -> Result<Topology, ConfigError> {
        let blueprint = self
            .cell
            .lock()
            .expect("graph lock poisoned")
            .take()
            .unwrap_or_default();
        blueprint.freeze(options)
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a vertex under construction.
#[derive(Clone)]
pub struct VertexBuilder {
    id: VertexId,
    cell: SharedBlueprint,
}

impl VertexBuilder {
    pub fn id(&self) -> VertexId {
        self.id
    }

    /// Register the start callback, invoked exactly once when the executor
    /// activates this vertex. Registering twice is a programming error.
    pub fn on<F>(&self, start: F) -> &Self
    where
        F: FnMut(&mut Vertex) + Send + 'static,
    {
        with_blueprint(&self.cell, "register a start callback", |bp| {
            bp.set_start(self.id, Box::new(start))
        });
        self
    }
}

/// Handle to a stream under construction.
#[derive(Clone)]
pub struct StreamBuilder {
    id: StreamId,
    src: VertexId,
    dst: VertexId,
    cell: SharedBlueprint,
}

impl StreamBuilder {
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// The vertex that owns this stream's output half.
    pub fn src(&self) -> VertexId {
        self.src
    }

    /// The vertex that owns this stream's input half.
    pub fn dst(&self) -> VertexId {
        self.dst
    }

    /// Register the callback invoked whenever a value may be ready on this
    /// stream. The callback runs with exclusive access to the destination
    /// vertex's context. Registering twice is a programming error.
    pub fn on<F>(&self, callback: F) -> &Self
    where
        F: FnMut(&mut Vertex, &mut InputStream) -> Signal + Send + 'static,
    {
        with_blueprint(&self.cell, "register a stream callback", |bp| {
            bp.set_stream_callback(self.id, Box::new(callback))
        });
        self
    }
}

/// Builder declaring one resource-bounded placement slot.
pub struct ContainerBuilder {
    id: ContainerId,
    cell: SharedBlueprint,
}

impl ContainerBuilder {
    pub fn id(&self) -> ContainerId {
        self.id
    }

    /// Assign a vertex to this container. A vertex belongs to at most one
    /// container; conflicts are reported when the graph is frozen.
    pub fn add(self, vertex: &VertexBuilder) -> Self {
        if !Arc::ptr_eq(&self.cell, &vertex.cell) {
            panic!("vertex {} does not belong to this graph", vertex.id);
        }
        with_blueprint(&self.cell, "assign a vertex to a container", |bp| {
            bp.add_member(self.id, vertex.id)
        });
        self
    }

    /// Declare this container's CPU budget.
    pub fn cpu(self, cpus: u32) -> Self {
        with_blueprint(&self.cell, "set a container budget", |bp| {
            bp.set_cpus(self.id, cpus)
        });
        self
    }
}
