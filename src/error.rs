use std::io;

use crate::graph::{EdgeId, VertexId};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("wedge count must be at least 1")]
    NoWedges,

    #[error("elasticity must be finite and non-negative, got {0}")]
    InvalidElasticity(f64),

    #[error("vertex {vertex} is out of range for a graph of {len} vertices")]
    VertexOutOfRange { vertex: VertexId, len: usize },

    #[error("duplicate vertex name {0:?}")]
    DuplicateVertex(String),

    #[error("unknown vertex {0:?}")]
    UnknownVertex(String),

    #[error("edge {name:?} has invalid weight {weight}")]
    InvalidWeight { name: String, weight: f64 },

    #[error("edge {edge} is not mirrored: {reason}")]
    Unmirrored { edge: EdgeId, reason: &'static str },

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("solve cancelled after accepting {accepted} vertices")]
    Cancelled { accepted: usize },

    #[error("osm: {0}")]
    Osm(#[from] osmpbfreader::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
