/*
Reader for the highway-data "TMG" graph format:

    TMG 1.0 simple
    <vertex count> <edge count>
    <name> <lat> <lon>                      (one line per vertex)
    <v1> <v2> <label> [<lat> <lon>]...      (one line per edge, trailing pairs are shaping points)

Edges are undirected; each line becomes a road and its mirror.
*/

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use crate::error::{Error, Result};
use crate::graph::{Graph, GraphBuilder};

pub fn load(path: &Path) -> Result<Graph> {
    let file = File::open(path)?;
    let graph = read(BufReader::new(file))?;
    info!(
        path = %path.display(),
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        "loaded tmg graph"
    );
    Ok(graph)
}

pub fn read<R: BufRead>(reader: R) -> Result<Graph> {
    let mut lines = Lines {
        inner: reader.lines(),
        line: 0,
    };

    let header = lines.next_line("header")?;
    if !header.starts_with("TMG") {
        return Err(lines.error(format!("expected a TMG header, got {:?}", header)));
    }

    let counts = lines.next_line("vertex and edge counts")?;
    let mut fields = counts.split_whitespace();
    let vertex_count: usize = lines.field(fields.next(), "vertex count")?;
    let edge_count: usize = lines.field(fields.next(), "edge count")?;

    let mut builder = GraphBuilder::with_capacity(vertex_count, edge_count);
    for _ in 0..vertex_count {
        let text = lines.next_line("vertex")?;
        let mut fields = text.split_whitespace();
        let name = fields
            .next()
            .ok_or_else(|| lines.error("missing vertex name".to_string()))?;
        let lat: f64 = lines.field(fields.next(), "latitude")?;
        let lon: f64 = lines.field(fields.next(), "longitude")?;
        builder
            .add_vertex(name, lat, lon)
            .map_err(|e| lines.error(e.to_string()))?;
    }

    for _ in 0..edge_count {
        let text = lines.next_line("edge")?;
        let mut fields = text.split_whitespace();
        let start: usize = lines.field(fields.next(), "start vertex")?;
        let end: usize = lines.field(fields.next(), "end vertex")?;
        let label = fields
            .next()
            .ok_or_else(|| lines.error("missing edge label".to_string()))?;
        let coords = fields
            .map(|f| lines.field::<f64>(Some(f), "shaping point coordinate"))
            .collect::<Result<Vec<_>>>()?;
        if coords.len() % 2 != 0 {
            return Err(lines.error("shaping point without a longitude".to_string()));
        }
        let shaping: Vec<(f64, f64)> = coords.chunks(2).map(|p| (p[0], p[1])).collect();
        builder
            .add_road(label, start, end, &shaping)
            .map_err(|e| lines.error(e.to_string()))?;
    }

    Ok(builder.build())
}

struct Lines<I> {
    inner: I,
    line: usize,
}

impl<I: Iterator<Item = std::io::Result<String>>> Lines<I> {
    fn next_line(&mut self, what: &str) -> Result<String> {
        loop {
            self.line += 1;
            match self.inner.next() {
                Some(text) => {
                    let text = text?;
                    if !text.trim().is_empty() {
                        return Ok(text);
                    }
                }
                None => return Err(self.error(format!("unexpected end of file, expected {}", what))),
            }
        }
    }

    fn field<T: FromStr>(&self, field: Option<&str>, what: &str) -> Result<T> {
        let field = field.ok_or_else(|| self.error(format!("missing {}", what)))?;
        field
            .parse()
            .map_err(|_| self.error(format!("invalid {} {:?}", what, field)))
    }

    fn error(&self, message: String) -> Error {
        Error::Parse {
            line: self.line,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo;

    const SAMPLE: &str = "TMG 1.0 simple
4 3
NY9@A 42.60 -73.70
NY9@B 42.65 -73.70
I-87@1 42.65 -73.75
Lonely 43.00 -74.00
0 1 NY9 42.62 -73.69 42.63 -73.69
1 2 NY9/I-87
2 0 I-87
";

    #[test]
    fn reads_vertices_and_mirrored_edges() {
        let graph = read(SAMPLE.as_bytes()).unwrap();
        assert_eq!(graph.vertex_count(), 4);
        assert_eq!(graph.edge_count(), 6);
        assert_eq!(graph.vertex_by_name("I-87@1"), Some(2));
        let v = graph.vertex(1);
        assert_eq!((v.lat, v.lon), (42.65, -73.70));
        assert!(graph.outgoing(3).next().is_none());
        graph.validate().unwrap();
    }

    #[test]
    fn shaping_points_count_toward_weight() {
        let graph = read(SAMPLE.as_bytes()).unwrap();
        let ny9 = graph.edge(0);
        assert_eq!(ny9.name, "NY9");
        let expected = geo::route_meters(&[
            (42.60, -73.70),
            (42.62, -73.69),
            (42.63, -73.69),
            (42.65, -73.70),
        ]);
        assert!((ny9.weight - expected).abs() < 1e-9);
        assert_eq!(graph.edge(ny9.mirror).weight, ny9.weight);
    }

    #[test]
    fn errors_carry_line_numbers() {
        let missing_lon = "TMG 1.0 simple\n1 0\nA 42.0\n";
        assert!(matches!(
            read(missing_lon.as_bytes()),
            Err(Error::Parse { line: 3, .. })
        ));

        let dangling = "TMG 1.0 simple\n2 1\nA 0 0\nB 0 1\n0 5 road\n";
        match read(dangling.as_bytes()) {
            Err(Error::Parse { line, message }) => {
                assert_eq!(line, 5);
                assert!(message.contains("out of range"), "{}", message);
            }
            other => panic!("unexpected {:?}", other.map(|g| g.vertex_count())),
        }

        let odd_shaping = "TMG 1.0 simple\n2 1\nA 0 0\nB 0 1\n0 1 road 0.5\n";
        assert!(matches!(
            read(odd_shaping.as_bytes()),
            Err(Error::Parse { line: 5, .. })
        ));

        let truncated = "TMG 1.0 simple\n3 0\nA 0 0\n";
        assert!(matches!(
            read(truncated.as_bytes()),
            Err(Error::Parse { line: 4, .. })
        ));

        assert!(matches!(
            read("GRAPH\n0 0\n".as_bytes()),
            Err(Error::Parse { line: 1, .. })
        ));
    }
}
