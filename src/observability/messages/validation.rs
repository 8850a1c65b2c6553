// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for graph freeze and placement events.

use crate::graph::VertexId;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// The topology froze and passed placement validation.
///
/// # Log Level
/// `info!` - Important operational event
pub struct TopologyFrozen {
    pub vertices: usize,
    pub streams: usize,
    pub containers: usize,
}

impl Display for TopologyFrozen {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Topology frozen: {} vertices, {} streams, {} containers",
            self.vertices, self.streams, self.containers
        )
    }
}

impl StructuredLog for TopologyFrozen {
    fn log(&self) {
        tracing::info!(
            vertices = self.vertices,
            streams = self.streams,
            containers = self.containers,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "topology_frozen",
            span_name = name,
            vertices = self.vertices,
            streams = self.streams,
            containers = self.containers,
        )
    }
}

/// An isolated vertex had no container and was given a singleton slot.
///
/// # Log Level
/// `debug!` - Diagnostic detail
pub struct ImplicitPlacement {
    pub vertex: VertexId,
}

impl Display for ImplicitPlacement {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Vertex {} has no streams and no container; placing it in a singleton container",
            self.vertex
        )
    }
}

impl StructuredLog for ImplicitPlacement {
    fn log(&self) {
        tracing::debug!(vertex = %self.vertex, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("implicit_placement", span_name = name, vertex = %self.vertex)
    }
}
