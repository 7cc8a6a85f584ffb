//! Uniform adjacency queries over undirected, directed and bidirectional graphs.

pub mod weighted;

use crate::error::{Error, Result};
use crate::graph::{BidirectionalGraph, DirectedGraph, Edge, Graph, UndirectedGraph};
use crate::Node;
use crossbeam::atomic::AtomicCell;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

pub use weighted::{WeightedEdgeMapping, WeightedGraphQuerier};

/// Short and long display name of a sampling policy, e.g. `("SRW", "Simple Random Walk")`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyName {
    pub short: Cow<'static, str>,
    pub long: Cow<'static, str>,
}

impl PolicyName {
    pub const fn new(short: &'static str, long: &'static str) -> Self {
        Self {
            short: Cow::Borrowed(short),
            long: Cow::Borrowed(long),
        }
    }

    pub fn owned(short: String, long: String) -> Self {
        Self {
            short: Cow::Owned(short),
            long: Cow::Owned(long),
        }
    }
}

impl fmt::Display for PolicyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.long, self.short)
    }
}

pub const SIMPLE_RANDOM_WALK: PolicyName = PolicyName::new("SRW", "Simple Random Walk");

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    Undirected,
    Directed,
    Bidirectional,
}

enum Adjacency {
    Undirected(Arc<dyn UndirectedGraph>),
    Bidirectional(Arc<dyn BidirectionalGraph>),
    Directed(Arc<dyn DirectedGraph>),
}

/// Presents "adjacent edges of v" independent of the graph's orientation:
/// undirected graphs expose their adjacency, directed graphs their out-edges
/// and bidirectional graphs their out-edges followed by their in-edges.
pub struct GraphQuerier {
    adjacency: Adjacency,
    vertex_count: usize,
    policy_name: PolicyName,
    total_queries: AtomicCell<usize>,
}

impl GraphQuerier {
    pub fn new<G: Graph + ?Sized>(graph: Arc<G>) -> Result<Self> {
        let vertex_count = graph.vertex_count();

        let adjacency = if let Some(g) = graph.clone().as_undirected() {
            Adjacency::Undirected(g)
        } else if let Some(g) = graph.clone().as_bidirectional() {
            Adjacency::Bidirectional(g)
        } else if let Some(g) = graph.as_directed() {
            Adjacency::Directed(g)
        } else {
            return Err(Error::UnsupportedGraph);
        };

        Ok(Self {
            adjacency,
            vertex_count,
            policy_name: SIMPLE_RANDOM_WALK,
            total_queries: AtomicCell::new(0),
        })
    }

    pub fn with_policy_name(mut self, policy_name: PolicyName) -> Self {
        self.policy_name = policy_name;
        self
    }

    pub fn policy_name(&self) -> &PolicyName {
        &self.policy_name
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn orientation(&self) -> Orientation {
        match self.adjacency {
            Adjacency::Undirected(_) => Orientation::Undirected,
            Adjacency::Bidirectional(_) => Orientation::Bidirectional,
            Adjacency::Directed(_) => Orientation::Directed,
        }
    }

    /// Number of calls issued to the backing graph so far.
    pub fn total_queries(&self) -> usize {
        self.total_queries.load()
    }

    pub fn adjacent_edges(&self, vertex: Node) -> Cow<'_, [Edge]> {
        match &self.adjacency {
            Adjacency::Undirected(g) => {
                self.total_queries.fetch_add(1);
                Cow::Borrowed(g.adjacent_edges(vertex))
            }
            Adjacency::Directed(g) => {
                self.total_queries.fetch_add(1);
                Cow::Borrowed(g.out_edges(vertex))
            }
            Adjacency::Bidirectional(g) => {
                self.total_queries.fetch_add(2);
                let mut edges = Vec::with_capacity(g.degree(vertex));
                edges.extend_from_slice(g.out_edges(vertex));
                edges.extend_from_slice(g.in_edges(vertex));
                Cow::Owned(edges)
            }
        }
    }

    pub fn adjacent_degree(&self, vertex: Node) -> usize {
        self.total_queries.fetch_add(1);
        match &self.adjacency {
            Adjacency::Undirected(g) => g.adjacent_degree(vertex),
            Adjacency::Directed(g) => g.out_degree(vertex),
            Adjacency::Bidirectional(g) => g.degree(vertex),
        }
    }

    /// Returns the `index`-th adjacent edge in the order of [`Self::adjacent_edges`].
    ///
    /// # Panics
    /// If `index` is not below the adjacent degree of `vertex`.
    pub fn adjacent_edge(&self, vertex: Node, index: usize) -> Edge {
        match &self.adjacency {
            Adjacency::Undirected(g) => {
                self.total_queries.fetch_add(1);
                g.adjacent_edge(vertex, index)
            }
            Adjacency::Directed(g) => {
                self.total_queries.fetch_add(1);
                g.out_edge(vertex, index)
            }
            Adjacency::Bidirectional(g) => {
                self.total_queries.fetch_add(2);
                let out_degree = g.out_degree(vertex);
                if index < out_degree {
                    g.out_edge(vertex, index)
                } else {
                    g.in_edge(vertex, index - out_degree)
                }
            }
        }
    }
}

impl fmt::Debug for GraphQuerier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphQuerier")
            .field("orientation", &self.orientation())
            .field("vertex_count", &self.vertex_count)
            .field("policy_name", &self.policy_name)
            .field("total_queries", &self.total_queries())
            .finish()
    }
}
