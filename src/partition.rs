use ordered_float::OrderedFloat;

use crate::error::{Error, Result};
use crate::graph::{Graph, Vertex, VertexId};

/// Angle of `v` around `source`, in radians in `[-pi, pi]`.
pub fn relative_angle(source: &Vertex, v: &Vertex) -> f64 {
    (v.lat - source.lat).atan2(v.lon - source.lon)
}

/// Assignment of every vertex to one of `wedges` angular slices around a source.
///
/// Wedges form a ring: wedge `i` neighbors `i - 1` and `i + 1` (mod the wedge count).
#[derive(Clone, Debug)]
pub struct Partition {
    wedge_of: Vec<usize>,
    wedges: usize,
}

impl Partition {
    /// Sorts all vertices by angle around `source` and cuts the order into `wedges`
    /// contiguous runs whose sizes differ by at most one.
    pub fn angular(graph: &Graph, source: VertexId, wedges: usize) -> Result<Self> {
        if wedges == 0 {
            return Err(Error::NoWedges);
        }
        graph.check_vertex(source)?;
        let src = graph.vertex(source);
        let n = graph.vertex_count();

        let mut order: Vec<VertexId> = (0..n).collect();
        order.sort_by_cached_key(|&v| OrderedFloat(relative_angle(src, graph.vertex(v))));

        let mut wedge_of = vec![0; n];
        for (position, &v) in order.iter().enumerate() {
            wedge_of[v] = position * wedges / n;
        }
        Ok(Self { wedge_of, wedges })
    }

    pub fn wedges(&self) -> usize {
        self.wedges
    }

    pub fn wedge_of(&self, v: VertexId) -> usize {
        self.wedge_of[v]
    }

    /// (left, right) neighbors of wedge `w` on the ring.
    pub fn neighbors(&self, w: usize) -> (usize, usize) {
        ((w + self.wedges - 1) % self.wedges, (w + 1) % self.wedges)
    }

    pub fn wedge_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.wedges];
        for &w in &self.wedge_of {
            sizes[w] += 1;
        }
        sizes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;

    /// A hub at the origin with `spokes` vertices evenly spaced on a circle around it.
    fn wheel(spokes: usize) -> Graph {
        let mut builder = GraphBuilder::new();
        builder.add_vertex("hub", 0.0, 0.0).unwrap();
        for i in 0..spokes {
            let theta = -3.0 + 6.0 * (i as f64) / (spokes as f64);
            builder
                .add_vertex(format!("s{}", i), theta.sin(), theta.cos())
                .unwrap();
        }
        builder.build()
    }

    #[test]
    fn wedges_are_balanced() {
        let graph = wheel(22);
        for wedges in 1..=9 {
            let partition = Partition::angular(&graph, 0, wedges).unwrap();
            let sizes = partition.wedge_sizes();
            assert_eq!(sizes.iter().sum::<usize>(), 23);
            let min = *sizes.iter().min().unwrap();
            let max = *sizes.iter().max().unwrap();
            assert!(max - min <= 1, "{} wedges gave sizes {:?}", wedges, sizes);
        }
    }

    #[test]
    fn wedges_follow_angular_order() {
        let graph = wheel(12);
        let partition = Partition::angular(&graph, 0, 4).unwrap();
        // Spokes were created in increasing angle, so their wedges never decrease.
        let spoke_wedges: Vec<usize> = (1..=12).map(|v| partition.wedge_of(v)).collect();
        assert!(spoke_wedges.windows(2).all(|w| w[0] <= w[1]), "{:?}", spoke_wedges);
        assert_eq!(spoke_wedges[0], 0);
        assert_eq!(spoke_wedges[11], 3);
    }

    #[test]
    fn single_wedge_owns_everything() {
        let graph = wheel(5);
        let partition = Partition::angular(&graph, 3, 1).unwrap();
        assert!((0..6).all(|v| partition.wedge_of(v) == 0));
        assert_eq!(partition.neighbors(0), (0, 0));
    }

    #[test]
    fn more_wedges_than_vertices() {
        let graph = wheel(2);
        let partition = Partition::angular(&graph, 0, 8).unwrap();
        assert_eq!(partition.wedges(), 8);
        let sizes = partition.wedge_sizes();
        assert_eq!(sizes.len(), 8);
        assert_eq!(sizes.iter().sum::<usize>(), 3);
        assert!(sizes.iter().all(|&s| s <= 1));
    }

    #[test]
    fn ring_neighbors_wrap() {
        let graph = wheel(8);
        let partition = Partition::angular(&graph, 0, 4).unwrap();
        assert_eq!(partition.neighbors(0), (3, 1));
        assert_eq!(partition.neighbors(3), (2, 0));
        assert_eq!(partition.neighbors(1), (0, 2));
    }

    #[test]
    fn rejects_zero_wedges_and_bad_source() {
        let graph = wheel(3);
        assert!(matches!(Partition::angular(&graph, 0, 0), Err(Error::NoWedges)));
        assert!(matches!(
            Partition::angular(&graph, 9, 2),
            Err(Error::VertexOutOfRange { vertex: 9, .. })
        ));
    }
}
