use ordered_float::OrderedFloat;
use std::io;

use crate::error::Result;
use crate::graph::{Edge, EdgeId, Graph, VertexId};

/// A proposed distance for `vertex`, reached over `via` (`None` for the seed at the source).
///
/// Records are created fresh every time an edge is relaxed, so two workers proposing the same
/// edge never share state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Relaxation {
    pub vertex: VertexId,
    pub via: Option<EdgeId>,
    pub distance: f64,
}

impl Relaxation {
    pub fn seed(source: VertexId) -> Self {
        Self {
            vertex: source,
            via: None,
            distance: 0.0,
        }
    }

    /// Relaxes `edge` out of a vertex already at `from_distance`.
    pub fn along(edge: &Edge, from_distance: f64) -> Self {
        Self {
            vertex: edge.end,
            via: Some(edge.id),
            distance: from_distance + edge.weight,
        }
    }

    pub fn distance_key(&self) -> f64 {
        self.distance
    }
}

/// Accepted relaxation per vertex. Vertices without an entry are unreachable from the source.
#[derive(Clone, Debug)]
pub struct Solution {
    source: VertexId,
    entries: Vec<Option<Relaxation>>,
}

impl Solution {
    pub(crate) fn new(source: VertexId, entries: Vec<Option<Relaxation>>) -> Self {
        Self { source, entries }
    }

    pub fn source(&self) -> VertexId {
        self.source
    }

    pub fn get(&self, v: VertexId) -> Option<&Relaxation> {
        self.entries.get(v).and_then(|e| e.as_ref())
    }

    pub fn contains(&self, v: VertexId) -> bool {
        self.get(v).is_some()
    }

    pub fn distance(&self, v: VertexId) -> Option<f64> {
        self.get(v).map(|r| r.distance)
    }

    /// Number of solved vertices.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|e| e.is_none())
    }

    pub fn solved(&self) -> impl Iterator<Item = &Relaxation> + '_ {
        self.entries.iter().flatten()
    }

    /// Distances indexed by vertex, `f64::INFINITY` when unreachable.
    pub fn distances(&self) -> Vec<f64> {
        self.entries
            .iter()
            .map(|e| e.map_or(f64::INFINITY, |r| r.distance))
            .collect()
    }

    /// Edges from the source to `v`, in travel order. `None` if `v` is unreachable.
    pub fn path_to(&self, graph: &Graph, v: VertexId) -> Option<Vec<EdgeId>> {
        let mut path = Vec::new();
        let mut cur = v;
        loop {
            match self.get(cur)?.via {
                None => break,
                Some(e) => {
                    path.push(e);
                    cur = graph.edge(e).start;
                }
            }
            // A well formed solution is a tree, so a longer walk means a cycle.
            if path.len() > self.entries.len() {
                return None;
            }
        }
        path.reverse();
        Some(path)
    }

    /// Sum of edge weights along `path_to(v)`.
    pub fn chain_distance(&self, graph: &Graph, v: VertexId) -> Option<f64> {
        self.path_to(graph, v)
            .map(|path| path.iter().map(|&e| graph.edge(e).weight).sum())
    }

    /// Measures how far this solution is from `exact`, vertex by vertex.
    pub fn compare(&self, exact: &Solution) -> Comparison {
        let mut comparison = Comparison::default();
        let mut rel_sum = 0.0;
        let len = self.entries.len().max(exact.entries.len());
        for v in 0..len {
            match (self.distance(v), exact.distance(v)) {
                (Some(approx), Some(truth)) => {
                    comparison.compared += 1;
                    let err = approx - truth;
                    if err < -1e-9 * truth.max(1.0) {
                        comparison.shorter += 1;
                    }
                    let abs = err.abs();
                    let rel = if truth > 0.0 { abs / truth } else { 0.0 };
                    comparison.max_abs_error = comparison.max_abs_error.max(abs);
                    comparison.max_rel_error = comparison.max_rel_error.max(rel);
                    rel_sum += rel;
                }
                (None, Some(_)) => comparison.missing += 1,
                (Some(_), None) => comparison.extra += 1,
                (None, None) => {}
            }
        }
        if comparison.compared > 0 {
            comparison.mean_rel_error = rel_sum / comparison.compared as f64;
        }
        comparison
    }

    /// Writes `vertex,name,distance_m` rows sorted by distance. Returns the number of rows.
    pub fn write_csv<W: io::Write>(
        &self,
        graph: &Graph,
        writer: W,
        include_unreachable: bool,
    ) -> Result<usize> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(["vertex", "name", "distance_m"])?;
        let mut rows: Vec<(VertexId, f64)> = self.distances().into_iter().enumerate().collect();
        rows.sort_by_key(|&(v, d)| (OrderedFloat(d), v));
        let mut written = 0;
        for (v, d) in rows {
            if !d.is_finite() && !include_unreachable {
                continue;
            }
            let val = if d.is_finite() {
                format!("{:.6}", d)
            } else {
                String::from("inf")
            };
            wtr.write_record([v.to_string(), graph.vertex(v).name.clone(), val])?;
            written += 1;
        }
        wtr.flush()?;
        Ok(written)
    }
}

/// Error of an approximate solution against an exact one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Comparison {
    /// Vertices solved by both.
    pub compared: usize,
    /// Solved exactly but absent from the approximation.
    pub missing: usize,
    /// Present in the approximation only.
    pub extra: usize,
    /// Vertices the approximation claims are closer than the exact distance.
    pub shorter: usize,
    pub max_abs_error: f64,
    pub max_rel_error: f64,
    pub mean_rel_error: f64,
}

impl Comparison {
    pub fn is_exact(&self, tolerance: f64) -> bool {
        self.missing == 0 && self.extra == 0 && self.max_rel_error <= tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;

    // a -1- b -2- c     d (island)
    fn line() -> Graph {
        let mut builder = GraphBuilder::new();
        let a = builder.add_vertex("a", 0.0, 0.0).unwrap();
        let b = builder.add_vertex("b", 0.0, 1.0).unwrap();
        let c = builder.add_vertex("c", 0.0, 2.0).unwrap();
        builder.add_vertex("d", 9.0, 9.0).unwrap();
        builder.add_road_with_weight("ab", a, b, 1.0).unwrap();
        builder.add_road_with_weight("bc", b, c, 2.0).unwrap();
        builder.build()
    }

    fn solved_line(graph: &Graph) -> Solution {
        let ab = graph.edge(0);
        let bc = graph.edge(2);
        let seed = Relaxation::seed(0);
        let at_b = Relaxation::along(ab, seed.distance);
        let at_c = Relaxation::along(bc, at_b.distance);
        Solution::new(0, vec![Some(seed), Some(at_b), Some(at_c), None])
    }

    #[test]
    fn lookups() {
        let graph = line();
        let solution = solved_line(&graph);
        assert_eq!(solution.len(), 3);
        assert!(!solution.is_empty());
        assert_eq!(solution.distance(2), Some(3.0));
        assert!(!solution.contains(3));
        assert_eq!(solution.distance(17), None);
        assert_eq!(solution.distances()[3], f64::INFINITY);
        assert_eq!(solution.get(1).and_then(|r| r.via), Some(0));
    }

    #[test]
    fn paths_walk_back_to_the_seed() {
        let graph = line();
        let solution = solved_line(&graph);
        assert_eq!(solution.path_to(&graph, 2), Some(vec![0, 2]));
        assert_eq!(solution.path_to(&graph, 0), Some(vec![]));
        assert_eq!(solution.path_to(&graph, 3), None);
        assert_eq!(solution.chain_distance(&graph, 2), Some(3.0));
    }

    #[test]
    fn cyclic_entries_have_no_path() {
        let graph = line();
        // b claims to be reached from c and c from b.
        let bogus = Solution::new(
            0,
            vec![
                Some(Relaxation::seed(0)),
                Some(Relaxation::along(graph.edge(3), 1.0)),
                Some(Relaxation::along(graph.edge(2), 1.0)),
                None,
            ],
        );
        assert_eq!(bogus.path_to(&graph, 2), None);
    }

    #[test]
    fn compare_reports_errors() {
        let graph = line();
        let exact = solved_line(&graph);
        assert!(exact.compare(&exact).is_exact(0.0));

        let mut entries = exact.entries.clone();
        entries[2] = Some(Relaxation {
            distance: 3.3,
            ..entries[2].unwrap()
        });
        entries[1] = None;
        let approx = Solution::new(0, entries);
        let cmp = approx.compare(&exact);
        assert_eq!(cmp.compared, 2);
        assert_eq!(cmp.missing, 1);
        assert_eq!(cmp.shorter, 0);
        assert!((cmp.max_abs_error - 0.3).abs() < 1e-12);
        assert!((cmp.max_rel_error - 0.1).abs() < 1e-12);
        assert!(!cmp.is_exact(0.5));
    }

    #[test]
    fn csv_rows_sorted_by_distance() {
        let graph = line();
        let solution = solved_line(&graph);
        let mut out = Vec::new();
        let rows = solution.write_csv(&graph, &mut out, false).unwrap();
        assert_eq!(rows, 3);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "vertex,name,distance_m\n0,a,0.000000\n1,b,1.000000\n2,c,3.000000\n"
        );

        let mut out = Vec::new();
        assert_eq!(solution.write_csv(&graph, &mut out, true).unwrap(), 4);
        assert!(String::from_utf8(out).unwrap().ends_with("3,d,inf\n"));
    }
}
