// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::graph::{ContainerId, VertexId};
use std::fmt;

/// Errors that can occur while freezing and validating a graph.
///
/// All of these are startup-time fatal: they surface from `Executor::new`
/// and the executor never reaches the running state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A vertex referenced by a stream has no container assignment
    UnplacedVertex {
        /// The vertex missing a placement
        vertex: VertexId,
    },
    /// A vertex was assigned to more than one container slot
    DoublePlacement {
        /// The vertex with conflicting assignments
        vertex: VertexId,
    },
    /// The vertices assigned to a container demand more CPUs than it declares
    OverCapacity {
        /// The overloaded container
        container: ContainerId,
        /// Declared CPU capacity
        cpus: u32,
        /// Total CPU demand of the assigned vertices
        demand: u32,
    },
    /// A container was declared with a zero CPU budget
    ZeroCapacity {
        /// The empty-budget container
        container: ContainerId,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnplacedVertex { vertex } => {
                write!(
                    f,
                    "Vertex {} is referenced by a stream but assigned to no container",
                    vertex
                )
            }
            ConfigError::DoublePlacement { vertex } => {
                write!(f, "Vertex {} is assigned to more than one container", vertex)
            }
            ConfigError::OverCapacity {
                container,
                cpus,
                demand,
            } => {
                write!(
                    f,
                    "Container {} declares {} cpus but its vertices demand {}",
                    container, cpus, demand
                )
            }
            ConfigError::ZeroCapacity { container } => {
                write!(f, "Container {} declares a zero CPU budget", container)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
