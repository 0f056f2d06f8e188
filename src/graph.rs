use fnv::FnvHashMap;
use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::geo;

pub type VertexId = usize;
pub type EdgeId = usize;

/// A road intersection (or OSM node).
#[derive(Clone, Debug)]
pub struct Vertex {
    pub id: VertexId,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Outgoing edges.
    pub edges: Vec<EdgeId>,
}

/// A directed road segment. Every edge has a `mirror` running the other way with the same weight.
#[derive(Clone, Debug)]
pub struct Edge {
    pub id: EdgeId,
    pub name: String,
    pub start: VertexId,
    pub end: VertexId,
    /// Meters along the shaping points.
    pub weight: f64,
    pub mirror: EdgeId,
}

#[derive(Debug, Default)]
pub struct Graph {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    by_name: FnvHashMap<String, VertexId>,
}

impl Graph {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id]
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id]
    }

    pub fn vertex_by_name(&self, name: &str) -> Option<VertexId> {
        self.by_name.get(name).copied()
    }

    /// Like `vertex_by_name`, but a miss is an error.
    pub fn resolve(&self, name: &str) -> Result<VertexId> {
        self.vertex_by_name(name)
            .ok_or_else(|| Error::UnknownVertex(name.to_string()))
    }

    pub fn outgoing(&self, id: VertexId) -> impl Iterator<Item = &Edge> + '_ {
        self.vertices[id].edges.iter().map(move |&e| &self.edges[e])
    }

    pub fn check_vertex(&self, id: VertexId) -> Result<()> {
        if id < self.vertices.len() {
            Ok(())
        } else {
            Err(Error::VertexOutOfRange {
                vertex: id,
                len: self.vertices.len(),
            })
        }
    }

    /// Checks that every edge connects vertices of this graph, sits in its start vertex's
    /// adjacency list, and has exactly one mirror with swapped endpoints and equal weight.
    pub fn validate(&self) -> Result<()> {
        for edge in &self.edges {
            self.check_vertex(edge.start)?;
            self.check_vertex(edge.end)?;
            if !(edge.weight.is_finite() && edge.weight >= 0.0) {
                return Err(Error::InvalidWeight {
                    name: edge.name.clone(),
                    weight: edge.weight,
                });
            }
        }
        for edge in &self.edges {
            let mirror = self.edges.get(edge.mirror).ok_or(Error::Unmirrored {
                edge: edge.id,
                reason: "mirror id out of range",
            })?;
            let reason = if mirror.id == edge.id {
                Some("edge mirrors itself")
            } else if mirror.mirror != edge.id {
                Some("mirror points elsewhere")
            } else if mirror.start != edge.end || mirror.end != edge.start {
                Some("mirror endpoints are not swapped")
            } else if mirror.weight != edge.weight {
                Some("mirror weight differs")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(Error::Unmirrored {
                    edge: edge.id,
                    reason,
                });
            }
        }
        for vertex in &self.vertices {
            for &e in &vertex.edges {
                match self.edges.get(e) {
                    Some(edge) if edge.start == vertex.id => {}
                    _ => {
                        return Err(Error::Unmirrored {
                            edge: e,
                            reason: "adjacency entry does not start at its vertex",
                        })
                    }
                }
            }
        }
        Ok(())
    }

    /// Breadth-first reachability from `source`, independent of any shortest path algorithm.
    pub fn reachable_from(&self, source: VertexId) -> Result<Vec<bool>> {
        self.check_vertex(source)?;
        let mut seen = vec![false; self.vertices.len()];
        let mut queue = VecDeque::new();
        seen[source] = true;
        queue.push_back(source);
        while let Some(v) = queue.pop_front() {
            for edge in self.outgoing(v) {
                if !seen[edge.end] {
                    seen[edge.end] = true;
                    queue.push_back(edge.end);
                }
            }
        }
        Ok(seen)
    }
}

/// Builds a `Graph` one vertex and road at a time. Roads are always inserted as a mirrored pair.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    graph: Graph,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertices: usize, roads: usize) -> Self {
        let mut builder = Self::new();
        builder.graph.vertices.reserve(vertices);
        builder.graph.edges.reserve(2 * roads);
        builder.graph.by_name.reserve(vertices);
        builder
    }

    pub fn add_vertex(&mut self, name: impl Into<String>, lat: f64, lon: f64) -> Result<VertexId> {
        let name = name.into();
        if self.graph.by_name.contains_key(&name) {
            return Err(Error::DuplicateVertex(name));
        }
        let id = self.graph.vertices.len();
        self.graph.by_name.insert(name.clone(), id);
        self.graph.vertices.push(Vertex {
            id,
            name,
            lat,
            lon,
            edges: Vec::new(),
        });
        Ok(id)
    }

    /// Adds a road whose weight is the great-circle length from `start` through `shaping`
    /// to `end`. Returns the id of the forward edge; its mirror is the next id.
    pub fn add_road(
        &mut self,
        name: impl Into<String>,
        start: VertexId,
        end: VertexId,
        shaping: &[(f64, f64)],
    ) -> Result<EdgeId> {
        self.graph.check_vertex(start)?;
        self.graph.check_vertex(end)?;
        let mut points = Vec::with_capacity(shaping.len() + 2);
        points.push((self.graph.vertices[start].lat, self.graph.vertices[start].lon));
        points.extend_from_slice(shaping);
        points.push((self.graph.vertices[end].lat, self.graph.vertices[end].lon));
        self.add_road_with_weight(name, start, end, geo::route_meters(&points))
    }

    pub fn add_road_with_weight(
        &mut self,
        name: impl Into<String>,
        start: VertexId,
        end: VertexId,
        weight: f64,
    ) -> Result<EdgeId> {
        let name = name.into();
        self.graph.check_vertex(start)?;
        self.graph.check_vertex(end)?;
        if !(weight.is_finite() && weight >= 0.0) {
            return Err(Error::InvalidWeight { name, weight });
        }
        let forward = self.graph.edges.len();
        let backward = forward + 1;
        self.graph.edges.push(Edge {
            id: forward,
            name: name.clone(),
            start,
            end,
            weight,
            mirror: backward,
        });
        self.graph.edges.push(Edge {
            id: backward,
            name,
            start: end,
            end: start,
            weight,
            mirror: forward,
        });
        self.graph.vertices[start].edges.push(forward);
        self.graph.vertices[end].edges.push(backward);
        Ok(forward)
    }

    pub fn build(self) -> Graph {
        self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Graph {
        let mut builder = GraphBuilder::new();
        let a = builder.add_vertex("A", 0.0, 0.0).unwrap();
        let b = builder.add_vertex("B", 0.0, 1.0).unwrap();
        let c = builder.add_vertex("C", 1.0, 0.0).unwrap();
        builder.add_road("ab", a, b, &[]).unwrap();
        builder.add_road("bc", b, c, &[(1.0, 1.0)]).unwrap();
        builder.add_road_with_weight("ca", c, a, 5.0).unwrap();
        builder.build()
    }

    #[test]
    fn every_edge_has_a_mirror() {
        let graph = triangle();
        assert_eq!(graph.edge_count(), 6);
        for edge in graph.edges() {
            let mirror = graph.edge(edge.mirror);
            assert_eq!((mirror.start, mirror.end), (edge.end, edge.start));
            assert_eq!(mirror.weight, edge.weight);
            assert_eq!(mirror.name, edge.name);
            assert_eq!(mirror.mirror, edge.id);
        }
        graph.validate().unwrap();
    }

    #[test]
    fn shaping_points_lengthen_roads() {
        let graph = triangle();
        let direct = geo::haversine_meters(0.0, 1.0, 1.0, 0.0);
        let bc = graph.edge(2);
        assert_eq!((bc.start, bc.end), (1, 2));
        assert!(bc.weight > direct);
        assert_eq!(graph.edge(0).weight, geo::haversine_meters(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn adjacency_lists_hold_outgoing_edges() {
        let graph = triangle();
        let from_b: Vec<_> = graph.outgoing(1).map(|e| e.end).collect();
        assert_eq!(from_b, vec![0, 2]);
        assert!(graph.outgoing(0).all(|e| e.start == 0));
    }

    #[test]
    fn names_resolve() {
        let graph = triangle();
        assert_eq!(graph.vertex_by_name("C"), Some(2));
        assert!(matches!(graph.resolve("D"), Err(Error::UnknownVertex(name)) if name == "D"));
    }

    #[test]
    fn rejects_bad_input() {
        let mut builder = GraphBuilder::new();
        let a = builder.add_vertex("A", 0.0, 0.0).unwrap();
        assert!(matches!(
            builder.add_vertex("A", 1.0, 1.0),
            Err(Error::DuplicateVertex(_))
        ));
        assert!(matches!(
            builder.add_road("dangling", a, 7, &[]),
            Err(Error::VertexOutOfRange { vertex: 7, len: 1 })
        ));
        assert!(matches!(
            builder.add_road_with_weight("negative", a, a, -1.0),
            Err(Error::InvalidWeight { .. })
        ));
        assert!(matches!(
            builder.add_road_with_weight("nan", a, a, f64::NAN),
            Err(Error::InvalidWeight { .. })
        ));
        assert_eq!(builder.build().edge_count(), 0);
    }

    #[test]
    fn validate_catches_broken_mirrors() {
        let mut graph = triangle();
        graph.edges[1].weight = 1.0;
        assert!(matches!(
            graph.validate(),
            Err(Error::Unmirrored { edge: 0, reason: "mirror weight differs" })
        ));

        let mut graph = triangle();
        graph.edges[3].end = 42;
        assert!(matches!(
            graph.validate(),
            Err(Error::VertexOutOfRange { vertex: 42, .. })
        ));
    }

    #[test]
    fn reachability_ignores_islands() {
        let mut builder = GraphBuilder::new();
        let a = builder.add_vertex("A", 0.0, 0.0).unwrap();
        let b = builder.add_vertex("B", 0.0, 1.0).unwrap();
        builder.add_vertex("island", 5.0, 5.0).unwrap();
        builder.add_road_with_weight("ab", a, b, 1.0).unwrap();
        let graph = builder.build();
        assert_eq!(graph.reachable_from(b).unwrap(), vec![true, true, false]);
        assert_eq!(graph.reachable_from(2).unwrap(), vec![false, false, true]);
        assert!(graph.reachable_from(3).is_err());
    }
}
