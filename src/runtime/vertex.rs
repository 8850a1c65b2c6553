use crate::graph::{StreamBuilder, StreamId, VertexId};
use crate::runtime::OutputStream;
use std::any::Any;
use std::collections::HashMap;

/// Runtime context of one vertex, handed exclusively to that vertex's own
/// callbacks. No other vertex can reach it.
pub struct Vertex {
    id: VertexId,
    /// Type-erased vertex-local state. Set once by the start callback,
    /// read and mutated only by this vertex's own callbacks, which never
    /// run concurrently with each other.
    pub any: Box<dyn Any + Send>,
    outputs: HashMap<StreamId, OutputStream>,
}

impl Vertex {
    pub(crate) fn new(id: VertexId, outputs: HashMap<StreamId, OutputStream>) -> Self {
        Self {
            id,
            any: Box::new(()),
            outputs,
        }
    }

    pub fn id(&self) -> VertexId {
        self.id
    }

    /// The output half of a stream this vertex sources. Asking for a
    /// stream owned by another vertex is a programming error.
    pub fn ostream(&mut self, stream: &StreamBuilder) -> &mut OutputStream {
        if stream.src() != self.id {
            panic!(
                "vertex {} is not the source of stream {}",
                self.id,
                stream.id()
            );
        }
        match self.outputs.get_mut(&stream.id()) {
            Some(output) => output,
            None => panic!("stream {} is not wired to vertex {}", stream.id(), self.id),
        }
    }

    /// Replace the vertex-local state slot.
    pub fn set_state<T: Send + 'static>(&mut self, state: T) {
        self.any = Box::new(state);
    }

    /// Borrow the vertex-local state, panicking on a type mismatch the
    /// same way a failed downcast would in the callbacks that own it.
    pub fn state_mut<T: Send + 'static>(&mut self) -> &mut T {
        let id = self.id;
        match self.any.downcast_mut::<T>() {
            Some(state) => state,
            None => panic!(
                "local state of vertex {} is not a {}",
                id,
                std::any::type_name::<T>()
            ),
        }
    }

    pub(crate) fn outputs_mut(&mut self) -> impl Iterator<Item = &mut OutputStream> {
        self.outputs.values_mut()
    }

    pub(crate) fn close_outputs(&mut self) {
        for output in self.outputs.values_mut() {
            output.close();
        }
    }

    pub(crate) fn frames_out(&self) -> u64 {
        self.outputs.values().map(OutputStream::sent).sum()
    }
}
