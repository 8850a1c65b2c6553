// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for vertex lifecycle and callback events.

use crate::graph::{StreamId, VertexId};
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A vertex was activated and its start callback is about to run.
///
/// # Log Level
/// `debug!` - Diagnostic detail
pub struct VertexActivated {
    pub vertex: VertexId,
}

impl Display for VertexActivated {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Vertex {} activated", self.vertex)
    }
}

impl StructuredLog for VertexActivated {
    fn log(&self) {
        tracing::debug!(vertex = %self.vertex, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("vertex_activated", span_name = name, vertex = %self.vertex)
    }
}

/// A vertex quiesced: no live input callbacks and nothing left to send.
///
/// # Log Level
/// `debug!` - Diagnostic detail
pub struct VertexCompleted {
    pub vertex: VertexId,
    pub frames_in: u64,
    pub frames_out: u64,
}

impl Display for VertexCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Vertex {} completed: {} frames in, {} frames out",
            self.vertex, self.frames_in, self.frames_out
        )
    }
}

impl StructuredLog for VertexCompleted {
    fn log(&self) {
        tracing::debug!(
            vertex = %self.vertex,
            frames_in = self.frames_in,
            frames_out = self.frames_out,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "vertex_completed",
            span_name = name,
            vertex = %self.vertex,
            frames_in = self.frames_in,
            frames_out = self.frames_out,
        )
    }
}

/// A vertex died mid-run and its streams are being closed on its behalf.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct VertexFailed<'a> {
    pub vertex: VertexId,
    pub error: &'a dyn std::error::Error,
}

impl Display for VertexFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Vertex {} failed: {}", self.vertex, self.error)
    }
}

impl StructuredLog for VertexFailed<'_> {
    fn log(&self) {
        tracing::error!(vertex = %self.vertex, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "vertex_failed",
            span_name = name,
            vertex = %self.vertex,
            error = %self.error,
        )
    }
}

/// A stream callback deregistered itself.
///
/// # Log Level
/// `trace!` - High-volume diagnostic detail
pub struct CallbackRemoved {
    pub vertex: VertexId,
    pub stream: StreamId,
}

impl Display for CallbackRemoved {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Vertex {} removed its callback for stream {}",
            self.vertex, self.stream
        )
    }
}

impl StructuredLog for CallbackRemoved {
    fn log(&self) {
        tracing::trace!(vertex = %self.vertex, stream = %self.stream, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::trace_span!(
            "callback_removed",
            span_name = name,
            vertex = %self.vertex,
            stream = %self.stream,
        )
    }
}

/// The close notification for a stream was delivered to its callback.
///
/// # Log Level
/// `trace!` - High-volume diagnostic detail
pub struct StreamClosed {
    pub vertex: VertexId,
    pub stream: StreamId,
}

impl Display for StreamClosed {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Vertex {} observed stream {} closed",
            self.vertex, self.stream
        )
    }
}

impl StructuredLog for StreamClosed {
    fn log(&self) {
        tracing::trace!(vertex = %self.vertex, stream = %self.stream, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::trace_span!(
            "stream_closed",
            span_name = name,
            vertex = %self.vertex,
            stream = %self.stream,
        )
    }
}
