//! Approximate parallel single-source shortest paths over geographic road graphs.
//!
//! The graph is split into angular wedges around the source, one worker thread per wedge,
//! and workers may only run `elasticity` meters ahead of their angular neighbors. See
//! [`parallel`] for the protocol and [`serial`] for the exact baseline.

pub mod config;
pub mod error;
pub mod geo;
pub mod graph;
pub mod osm;
pub mod parallel;
pub mod partition;
pub mod queue;
pub mod serial;
pub mod solution;
pub mod tmg;

pub use config::{CancelToken, SolveConfig};
pub use error::{Error, Result};
pub use graph::{Edge, EdgeId, Graph, GraphBuilder, Vertex, VertexId};
pub use parallel::{ParallelSolve, WorkerStats};
pub use partition::Partition;
pub use solution::{Comparison, Relaxation, Solution};
