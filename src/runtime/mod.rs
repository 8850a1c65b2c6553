// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod stream;
mod vertex;

pub use stream::{InputStream, OutputStream};
pub use vertex::Vertex;

pub(crate) use stream::StreamEvent;

/// Control signal returned by a stream callback: keep it registered, or
/// deregister it so it is never invoked again for that stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Continue,
    Remove,
}

pub(crate) type StartFn = Box<dyn FnMut(&mut Vertex) + Send + 'static>;
pub(crate) type StreamFn = Box<dyn FnMut(&mut Vertex, &mut InputStream) -> Signal + Send + 'static>;
