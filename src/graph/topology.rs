use crate::config::{consts, ExecutorOptions};
use crate::errors::ConfigError;
use crate::graph::{ContainerId, StreamId, VertexId};
use crate::observability::messages::validation::{ImplicitPlacement, TopologyFrozen};
use crate::observability::messages::StructuredLog;
use crate::runtime::{StartFn, StreamFn};

pub(crate) struct VertexSpec {
    pub id: VertexId,
    pub start: Option<StartFn>,
}

impl std::fmt::Debug for VertexSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VertexSpec")
            .field("id", &self.id)
            .field("start", &self.start.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

pub(crate) struct StreamSpec {
    pub id: StreamId,
    pub src: VertexId,
    pub dst: VertexId,
    pub on: Option<StreamFn>,
}

impl std::fmt::Debug for StreamSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSpec")
            .field("id", &self.id)
            .field("src", &self.src)
            .field("dst", &self.dst)
            .field("on", &self.on.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

struct ContainerDecl {
    id: ContainerId,
    cpus: Option<u32>,
    members: Vec<VertexId>,
}

/// A validated container: declared budget plus resolved membership.
#[derive(Debug)]
pub(crate) struct Container {
    pub id: ContainerId,
    pub cpus: u32,
    pub members: Vec<VertexId>,
}

/// The frozen form of a graph: immutable topology plus placements, ready
/// for the executor to instantiate.
#[derive(Debug)]
pub(crate) struct Topology {
    pub vertices: Vec<VertexSpec>,
    pub streams: Vec<StreamSpec>,
    pub containers: Vec<Container>,
    /// Container assignment per vertex, indexed by vertex.
    pub placement: Vec<ContainerId>,
}

/// Mutable recording state behind the [`super::Graph`] builder surface.
#[derive(Default)]
pub(crate) struct Blueprint {
    vertices: Vec<VertexSpec>,
    streams: Vec<StreamSpec>,
    containers: Vec<ContainerDecl>,
}

impl Blueprint {
    pub(crate) fn add_vertex(&mut self) -> VertexId {
        let id = VertexId(self.vertices.len());
        self.vertices.push(VertexSpec { id, start: None });
        id
    }

    pub(crate) fn add_stream(&mut self, src: VertexId, dst: VertexId) -> StreamId {
        let id = StreamId(self.streams.len());
        self.streams.push(StreamSpec {
            id,
            src,
            dst,
            on: None,
        });
        id
    }

    pub(crate) fn add_container(&mut self) -> ContainerId {
        let id = ContainerId(self.containers.len());
        self.containers.push(ContainerDecl {
            id,
            cpus: None,
            members: Vec::new(),
        });
        id
    }

    pub(crate) fn set_start(&mut self, vertex: VertexId, start: StartFn) {
        let spec = &mut self.vertices[vertex.index()];
        if spec.start.is_some() {
            panic!("start callback already registered for {vertex}");
        }
        spec.start = Some(start);
    }

    pub(crate) fn set_stream_callback(&mut self, stream: StreamId, callback: StreamFn) {
        let spec = &mut self.streams[stream.index()];
        if spec.on.is_some() {
            panic!("stream callback already registered for {stream}");
        }
        spec.on = Some(callback);
    }

    pub(crate) fn add_member(&mut self, container: ContainerId, vertex: VertexId) {
        self.containers[container.index()].members.push(vertex);
    }

    pub(crate) fn set_cpus(&mut self, container: ContainerId, cpus: u32) {
        self.containers[container.index()].cpus = Some(cpus);
    }

    /// Validate placements and produce the immutable topology.
    ///
    /// Checks run in a fixed order so a broken graph fails the same way
    /// every time: zero budgets, conflicting assignments, unplaced
    /// stream endpoints, then per-container capacity.
    pub(crate) fn freeze(self, options: &ExecutorOptions) -> Result<Topology, ConfigError> {
        let default_cpus = options
            .default_container_cpus
            .unwrap_or(consts::DEFAULT_CONTAINER_CPUS)
            .max(1);

        let mut containers: Vec<Container> = Vec::with_capacity(self.containers.len());
        for decl in &self.containers {
            let cpus = decl.cpus.unwrap_or(default_cpus);
            if cpus == 0 {
                return Err(ConfigError::ZeroCapacity {
                    container: decl.id,
                });
            }
            containers.push(Container {
                id: decl.id,
                cpus,
                members: decl.members.clone(),
            });
        }

        let mut placement: Vec<Option<ContainerId>> = vec![None; self.vertices.len()];
        for container in &containers {
            for member in &container.members {
                if placement[member.index()].is_some() {
                    return Err(ConfigError::DoublePlacement { vertex: *member });
                }
                placement[member.index()] = Some(container.id);
            }
        }

        let mut referenced = vec![false; self.vertices.len()];
        for stream in &self.streams {
            referenced[stream.src.index()] = true;
            referenced[stream.dst.index()] = true;
        }

        for vertex in &self.vertices {
            if placement[vertex.id.index()].is_some() {
                continue;
            }
            if referenced[vertex.id.index()] {
                return Err(ConfigError::UnplacedVertex { vertex: vertex.id });
            }
            // an isolated vertex still needs a scheduling slot; give it a
            // budget-of-default singleton container
            let id = ContainerId(containers.len());
            containers.push(Container {
                id,
                cpus: default_cpus,
                members: vec![vertex.id],
            });
            placement[vertex.id.index()] = Some(id);
            ImplicitPlacement { vertex: vertex.id }.log();
        }

        for container in &containers {
            let demand = container.members.len() as u32;
            if demand > container.cpus {
                return Err(ConfigError::OverCapacity {
                    container: container.id,
                    cpus: container.cpus,
                    demand,
                });
            }
        }

        let placement: Vec<ContainerId> = placement
            .into_iter()
            .map(|slot| slot.unwrap_or(ContainerId(0)))
            .collect();

        TopologyFrozen {
            vertices: self.vertices.len(),
            streams: self.streams.len(),
            containers: containers.len(),
        }
        .log();

        Ok(Topology {
            vertices: self.vertices,
            streams: self.streams,
            containers,
            placement,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ExecutorOptions;
    use crate::errors::ConfigError;
    use crate::graph::Graph;

    fn options() -> ExecutorOptions {
        ExecutorOptions::default()
    }

    #[test]
    fn over_capacity_fails_deterministically() {
        for _ in 0..3 {
            let mut graph = Graph::new();
            let a = graph.vertex();
            let b = graph.vertex();
            graph.stream(&a, &b);
            let container = graph.container().add(&a).add(&b).cpu(1);
            let container_id = container.id();

            let err = graph.freeze(&options()).unwrap_err();
            assert_eq!(
                err,
                ConfigError::OverCapacity {
                    container: container_id,
                    cpus: 1,
                    demand: 2,
                }
            );
        }
    }

    #[test]
    fn double_placement_is_rejected() {
        let mut graph = Graph::new();
        let v = graph.vertex();
        graph.container().add(&v).cpu(1);
        graph.container().add(&v).cpu(1);

        let err = graph.freeze(&options()).unwrap_err();
        assert_eq!(err, ConfigError::DoublePlacement { vertex: v.id() });
    }

    #[test]
    fn stream_endpoint_without_container_is_rejected() {
        let mut graph = Graph::new();
        let a = graph.vertex();
        let b = graph.vertex();
        graph.stream(&a, &b);
        graph.container().add(&a).cpu(1);

        let err = graph.freeze(&options()).unwrap_err();
        assert_eq!(err, ConfigError::UnplacedVertex { vertex: b.id() });
    }

    #[test]
    fn isolated_vertex_gets_an_implicit_container() {
        let mut graph = Graph::new();
        graph.vertex();

        let topology = graph.freeze(&options()).unwrap();
        assert_eq!(topology.containers.len(), 1);
        assert_eq!(topology.containers[0].members.len(), 1);
        assert_eq!(topology.placement.len(), 1);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let mut graph = Graph::new();
        let v = graph.vertex();
        let container = graph.container().add(&v).cpu(0);
        let container_id = container.id();

        let err = graph.freeze(&options()).unwrap_err();
        assert_eq!(
            err,
            ConfigError::ZeroCapacity {
                container: container_id,
            }
        );
    }

    #[test]
    fn declared_budgets_survive_the_freeze() {
        let mut graph = Graph::new();
        let a = graph.vertex();
        let b = graph.vertex();
        graph.stream(&a, &b);
        graph.container().add(&a).add(&b).cpu(4);

        let topology = graph.freeze(&options()).unwrap();
        assert_eq!(topology.containers.len(), 1);
        assert_eq!(topology.containers[0].cpus, 4);
        assert_eq!(topology.placement[0], topology.placement[1]);
    }
}
