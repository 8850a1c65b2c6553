// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod codec;      // wire framing + typed value encoding
pub mod config;     // executor options + loader
pub mod engine;     // the executor and per-vertex event loops
pub mod errors;     // error handling
pub mod graph;      // graph builder + frozen topology
pub mod observability;
pub mod runtime;    // vertex context + stream endpoint halves
