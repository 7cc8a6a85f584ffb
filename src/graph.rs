//! Graph abstraction consumed by the queriers.
//!
//! A backing graph advertises which adjacency view it supports through the
//! capability queries of [`Graph`]; the [`GraphQuerier`](crate::querier::GraphQuerier)
//! resolves the view once at construction time. Vertices are dense ids in
//! `0..vertex_count()`.

use super::Node;
use crate::graph_stream::AdjacencyList;
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    pub source: Node,
    pub target: Node,
}

impl Edge {
    pub fn new(source: Node, target: Node) -> Self {
        Self { source, target }
    }

    /// Returns the endpoint opposite to `vertex`; for a self-loop this is `vertex` itself.
    #[inline]
    pub fn other_endpoint(&self, vertex: Node) -> Node {
        if vertex == self.source {
            self.target
        } else {
            self.source
        }
    }

    #[inline]
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.source, self.target)
    }
}

pub trait Graph: Send + Sync + 'static {
    fn vertex_count(&self) -> usize;

    fn as_undirected(self: Arc<Self>) -> Option<Arc<dyn UndirectedGraph>> {
        None
    }

    fn as_bidirectional(self: Arc<Self>) -> Option<Arc<dyn BidirectionalGraph>> {
        None
    }

    fn as_directed(self: Arc<Self>) -> Option<Arc<dyn DirectedGraph>> {
        None
    }
}

pub trait UndirectedGraph: Send + Sync {
    fn adjacent_edges(&self, vertex: Node) -> &[Edge];

    fn adjacent_degree(&self, vertex: Node) -> usize {
        self.adjacent_edges(vertex).len()
    }

    fn adjacent_edge(&self, vertex: Node, index: usize) -> Edge {
        self.adjacent_edges(vertex)[index]
    }
}

pub trait DirectedGraph: Send + Sync {
    fn vertex_count(&self) -> usize;

    fn out_edges(&self, vertex: Node) -> &[Edge];

    fn out_degree(&self, vertex: Node) -> usize {
        self.out_edges(vertex).len()
    }

    fn out_edge(&self, vertex: Node, index: usize) -> Edge {
        self.out_edges(vertex)[index]
    }
}

pub trait BidirectionalGraph: DirectedGraph {
    fn in_edges(&self, vertex: Node) -> &[Edge];

    fn in_degree(&self, vertex: Node) -> usize {
        self.in_edges(vertex).len()
    }

    fn in_edge(&self, vertex: Node, index: usize) -> Edge {
        self.in_edges(vertex)[index]
    }

    fn degree(&self, vertex: Node) -> usize {
        self.out_degree(vertex) + self.in_degree(vertex)
    }
}

fn vertex_count_of(edges: &[Edge], declared: usize) -> usize {
    edges
        .iter()
        .map(|e| e.source.max(e.target) + 1)
        .fold(declared, usize::max)
}

fn edges_of(adjacency: &AdjacencyList) -> (usize, Vec<Edge>) {
    let mut vertex_count = 0;
    let mut edges = Vec::new();
    for (&source, targets) in adjacency {
        vertex_count = vertex_count.max(source + 1);
        edges.extend(targets.iter().map(|&target| Edge::new(source, target)));
    }
    (vertex_count, edges)
}

/// Directed graph storing out-edges only.
#[derive(Clone, Debug, Default)]
pub struct AdjacencyGraph {
    out_edges: Vec<Vec<Edge>>,
    edge_count: usize,
}

impl AdjacencyGraph {
    /// Builds the graph on at least `vertex_count` vertices; endpoints beyond grow the vertex set.
    pub fn from_edges(vertex_count: usize, edges: impl IntoIterator<Item = Edge>) -> Self {
        let edges: Vec<Edge> = edges.into_iter().collect();
        let mut out_edges = vec![Vec::new(); vertex_count_of(&edges, vertex_count)];
        for &e in &edges {
            out_edges[e.source].push(e);
        }

        Self {
            out_edges,
            edge_count: edges.len(),
        }
    }

    pub fn from_adjacency(adjacency: &AdjacencyList) -> Self {
        let (vertex_count, edges) = edges_of(adjacency);
        Self::from_edges(vertex_count, edges)
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn contains_edge(&self, source: Node, target: Node) -> bool {
        self.out_edges
            .get(source)
            .map_or(false, |es| es.iter().any(|e| e.target == target))
    }
}

impl DirectedGraph for AdjacencyGraph {
    fn vertex_count(&self) -> usize {
        self.out_edges.len()
    }

    fn out_edges(&self, vertex: Node) -> &[Edge] {
        &self.out_edges[vertex]
    }
}

impl Graph for AdjacencyGraph {
    fn vertex_count(&self) -> usize {
        self.out_edges.len()
    }

    fn as_directed(self: Arc<Self>) -> Option<Arc<dyn DirectedGraph>> {
        Some(self)
    }
}

/// Directed graph that additionally indexes in-edges.
#[derive(Clone, Debug, Default)]
pub struct BidirectionalAdjacencyGraph {
    out_edges: Vec<Vec<Edge>>,
    in_edges: Vec<Vec<Edge>>,
    edge_count: usize,
}

impl BidirectionalAdjacencyGraph {
    pub fn from_edges(vertex_count: usize, edges: impl IntoIterator<Item = Edge>) -> Self {
        let edges: Vec<Edge> = edges.into_iter().collect();
        let n = vertex_count_of(&edges, vertex_count);
        let mut out_edges = vec![Vec::new(); n];
        let mut in_edges = vec![Vec::new(); n];
        for &e in &edges {
            out_edges[e.source].push(e);
            in_edges[e.target].push(e);
        }

        Self {
            out_edges,
            in_edges,
            edge_count: edges.len(),
        }
    }

    pub fn from_adjacency(adjacency: &AdjacencyList) -> Self {
        let (vertex_count, edges) = edges_of(adjacency);
        Self::from_edges(vertex_count, edges)
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }
}

impl DirectedGraph for BidirectionalAdjacencyGraph {
    fn vertex_count(&self) -> usize {
        self.out_edges.len()
    }

    fn out_edges(&self, vertex: Node) -> &[Edge] {
        &self.out_edges[vertex]
    }
}

impl BidirectionalGraph for BidirectionalAdjacencyGraph {
    fn in_edges(&self, vertex: Node) -> &[Edge] {
        &self.in_edges[vertex]
    }
}

impl Graph for BidirectionalAdjacencyGraph {
    fn vertex_count(&self) -> usize {
        self.out_edges.len()
    }

    fn as_bidirectional(self: Arc<Self>) -> Option<Arc<dyn BidirectionalGraph>> {
        Some(self)
    }

    fn as_directed(self: Arc<Self>) -> Option<Arc<dyn DirectedGraph>> {
        Some(self)
    }
}

/// Undirected graph; every edge is listed at both endpoints, a self-loop once.
#[derive(Clone, Debug, Default)]
pub struct UndirectedAdjacencyGraph {
    adjacent: Vec<Vec<Edge>>,
    edge_count: usize,
}

impl UndirectedAdjacencyGraph {
    pub fn from_edges(vertex_count: usize, edges: impl IntoIterator<Item = Edge>) -> Self {
        let edges: Vec<Edge> = edges.into_iter().collect();
        let mut adjacent = vec![Vec::new(); vertex_count_of(&edges, vertex_count)];
        for &e in &edges {
            adjacent[e.source].push(e);
            if !e.is_self_loop() {
                adjacent[e.target].push(e);
            }
        }

        Self {
            adjacent,
            edge_count: edges.len(),
        }
    }

    pub fn from_adjacency(adjacency: &AdjacencyList) -> Self {
        let (vertex_count, edges) = edges_of(adjacency);
        Self::from_edges(vertex_count, edges)
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn contains_edge(&self, u: Node, v: Node) -> bool {
        let (Some(eu), Some(ev)) = (self.adjacent.get(u), self.adjacent.get(v)) else {
            return false;
        };
        let (shorter, from) = if eu.len() <= ev.len() { (eu, u) } else { (ev, v) };
        let to = if from == u { v } else { u };
        shorter.iter().any(|e| e.other_endpoint(from) == to)
    }
}

impl UndirectedGraph for UndirectedAdjacencyGraph {
    fn adjacent_edges(&self, vertex: Node) -> &[Edge] {
        &self.adjacent[vertex]
    }
}

impl Graph for UndirectedAdjacencyGraph {
    fn vertex_count(&self) -> usize {
        self.adjacent.len()
    }

    fn as_undirected(self: Arc<Self>) -> Option<Arc<dyn UndirectedGraph>> {
        Some(self)
    }
}
