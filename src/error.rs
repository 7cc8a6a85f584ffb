use super::{Edge, Node};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The graph exposes neither undirected, bidirectional nor directed adjacency.
    #[error("graph exposes none of the undirected, bidirectional or directed adjacency views")]
    UnsupportedGraph,

    #[error("weight function failed on edge {edge}: {reason}")]
    WeightFunction { edge: Edge, reason: String },

    #[error("weight {weight} of edge {edge} is not a finite non-negative number")]
    InvalidWeight { edge: Edge, weight: f64 },

    #[error("edge {0} is not adjacent to its source vertex")]
    UnknownEdge(Edge),

    #[error("vertex {0} does not fit into a 32 bit graph record")]
    VertexOutOfRange(Node),

    #[error("cannot derive a graph format from '{0}'")]
    UnknownFormat(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
