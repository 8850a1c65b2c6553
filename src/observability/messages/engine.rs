// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for executor lifecycle and execution events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Execution started: the graph validated and every vertex is spawning.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ExecutionStarted {
    pub vertices: usize,
    pub streams: usize,
    pub containers: usize,
}

impl Display for ExecutionStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting graph execution: {} vertices, {} streams, {} containers",
            self.vertices, self.streams, self.containers
        )
    }
}

impl StructuredLog for ExecutionStarted {
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
            "execution",
            span_name = name,
            vertices = self.vertices,
            streams = self.streams,
            containers = self.containers,
        )
    }
}

/// Execution completed: every vertex quiesced and resources are released.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ExecutionCompleted {
    pub vertices: usize,
    pub frames: u64,
    pub duration: std::time::Duration,
}

impl Display for ExecutionCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Graph execution completed: {} vertices, {} frames delivered in {:?}",
            self.vertices, self.frames, self.duration
        )
    }
}

impl StructuredLog for ExecutionCompleted {
    fn log(&self) {
        tracing::info!(
            vertices = self.vertices,
            frames = self.frames,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "execution_completed",
            span_name = name,
            vertices = self.vertices,
            frames = self.frames,
            duration = ?self.duration,
        )
    }
}

/// Execution failed with error.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct ExecutionFailed<'a> {
    pub error: &'a dyn std::error::Error,
}

impl Display for ExecutionFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Graph execution failed: {}", self.error)
    }
}

impl StructuredLog for ExecutionFailed<'_> {
    fn log(&self) {
        tracing::error!(
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "execution_failed",
            span_name = name,
            error = %self.error,
        )
    }
}

/// Executor moved between lifecycle states.
///
/// # Log Level
/// `debug!` - Diagnostic detail
pub struct StateChanged<'a> {
    pub from: &'a str,
    pub to: &'a str,
}

impl Display for StateChanged<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Executor state {} -> {}", self.from, self.to)
    }
}

impl StructuredLog for StateChanged<'_> {
    fn log(&self) {
        tracing::debug!(
            from = self.from,
            to = self.to,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "state_changed",
            span_name = name,
            from = self.from,
            to = self.to,
        )
    }
}
