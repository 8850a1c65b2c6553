// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.

use tracing::Span;

pub mod engine;
pub mod validation;
pub mod vertex;

/// A loggable event: emits itself through `tracing` with structured
/// fields, or opens a span carrying the same fields.
pub trait StructuredLog {
    fn log(&self);

    fn span(&self, name: &str) -> Span;
}
