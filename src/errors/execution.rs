// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Runtime error types and the vertex failure policy.

use crate::graph::VertexId;
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur while a graph is running.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// A vertex callback panicked; the vertex and its streams are dead.
    #[error("vertex {vertex} panicked during execution: {message}")]
    VertexPanicked { vertex: VertexId, message: String },

    /// An engine invariant was broken. Always a bug, never user error.
    #[error("internal engine error: {message}")]
    Internal { message: String },
}

/// How the executor reacts when a vertex dies mid-run.
///
/// * `FailFast` - cancel every remaining vertex and fail the run.
/// * `BestEffort` - close the dead vertex's output streams so downstream
///   vertices observe end-of-stream, let the rest of the graph drain, and
///   report the failure in the execution report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    FailFast,
    BestEffort,
}
