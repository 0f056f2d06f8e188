use fnv::FnvHashMap;
use hashbrown::HashSet;
use osmpbfreader::{NodeId, OsmObj, OsmPbfReader, Tags, WayId};
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

use crate::error::Result;
use crate::geo;
use crate::graph::{Graph, GraphBuilder, VertexId};

#[derive(Clone, Debug)]
struct WayLite {
    id: WayId,
    nodes: Vec<NodeId>,
    name: String,
}

fn is_way_routable(tags: &Tags, only_highways: bool) -> bool {
    if only_highways && !tags.contains_key("highway") {
        return false;
    }
    // Exclude areas and non-linear ways
    if tags.get("area").map(|v| v == "yes").unwrap_or(false) {
        return false;
    }
    true
}

fn way_name(id: WayId, tags: &Tags) -> String {
    tags.get("name")
        .or_else(|| tags.get("ref"))
        .map(|v| v.to_string())
        .unwrap_or_else(|| format!("way/{}", id.0))
}

/// Vertex name used for an OSM node, so sources can be resolved with `Graph::resolve`.
pub fn vertex_name(id: i64) -> String {
    id.to_string()
}

/// Builds a graph from the routable ways of a `.osm.pbf` extract.
///
/// Every way segment becomes a road with its mirror. One-way tags are ignored: the graph
/// model is undirected.
pub fn load(path: &Path, only_highways: bool) -> Result<Graph> {
    // Pass 1: collect routable ways and the set of node ids they reference
    let mut pbf = OsmPbfReader::new(File::open(path)?);

    let mut needed_nodes: HashSet<NodeId> = HashSet::new();
    let mut ways: Vec<WayLite> = Vec::new();

    for obj in pbf.iter() {
        if let OsmObj::Way(w) = obj? {
            if is_way_routable(&w.tags, only_highways) {
                needed_nodes.extend(w.nodes.iter().copied());
                ways.push(WayLite {
                    id: w.id,
                    name: way_name(w.id, &w.tags),
                    nodes: w.nodes,
                });
            }
        }
    }
    info!(
        ways = ways.len(),
        node_refs = needed_nodes.len(),
        "collected routable ways"
    );

    // Pass 2: read coordinates for needed nodes
    let mut pbf = OsmPbfReader::new(File::open(path)?);
    let mut coords: Vec<(NodeId, f64, f64)> = Vec::with_capacity(needed_nodes.len());
    for obj in pbf.iter() {
        if let OsmObj::Node(n) = obj? {
            if needed_nodes.contains(&n.id) {
                coords.push((n.id, n.lat(), n.lon()));
            }
        }
    }
    // Stable vertex ids regardless of block order in the file.
    coords.sort_unstable_by_key(|c| c.0 .0);

    let mut builder = GraphBuilder::with_capacity(coords.len(), coords.len());
    let mut id_to_idx: FnvHashMap<NodeId, VertexId> = FnvHashMap::default();
    for &(nid, lat, lon) in &coords {
        let idx = builder.add_vertex(vertex_name(nid.0), lat, lon)?;
        id_to_idx.insert(nid, idx);
    }

    let mut skipped = 0usize;
    for w in &ways {
        for pair in w.nodes.windows(2) {
            let (u, v) = match (id_to_idx.get(&pair[0]), id_to_idx.get(&pair[1])) {
                (Some(&u), Some(&v)) => (u, v),
                _ => {
                    skipped += 1;
                    continue;
                }
            };
            let (a, b) = (&coords[u], &coords[v]);
            let weight = geo::haversine_meters(a.1, a.2, b.1, b.2);
            if weight.is_finite() && weight > 0.0 {
                builder.add_road_with_weight(w.name.as_str(), u, v, weight)?;
            } else {
                skipped += 1;
            }
        }
    }
    debug!(skipped, "way segments without usable coordinates");

    let graph = builder.build();
    info!(
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        "built graph from osm"
    );
    Ok(graph)
}
