// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! Message types follow a struct-based pattern with a `Display`
//! implementation to keep diagnostic strings out of the engine code and
//! the log output consistent. Messages are organized by subsystem:
//!
//! * `messages::engine` - executor lifecycle and state transitions
//! * `messages::vertex` - vertex activation, completion, and callbacks
//! * `messages::validation` - graph freeze and placement events

pub mod messages;
