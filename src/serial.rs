use tracing::debug;

use crate::error::Result;
use crate::graph::{Graph, VertexId};
use crate::queue::KeyedQueue;
use crate::solution::{Relaxation, Solution};

/// Exact single-threaded Dijkstra from `source`. Unreachable vertices are left out of the solution.
pub fn shortest_paths(graph: &Graph, source: VertexId) -> Result<Solution> {
    graph.check_vertex(source)?;
    let mut solved: Vec<Option<Relaxation>> = vec![None; graph.vertex_count()];
    let mut queue = KeyedQueue::new(Relaxation::distance_key);
    queue.push(Relaxation::seed(source));

    let mut accepted = 0;
    while let Some(next) = queue.pop() {
        if solved[next.vertex].is_some() {
            continue;
        }
        solved[next.vertex] = Some(next);
        accepted += 1;
        for edge in graph.outgoing(next.vertex) {
            if solved[edge.end].is_none() {
                queue.push(Relaxation::along(edge, next.distance));
            }
        }
    }
    debug!(source, accepted, "serial solve finished");
    Ok(Solution::new(source, solved))
}
