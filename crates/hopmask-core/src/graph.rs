//! Homogeneous directed graph used for traversal.
//!
//! Every node and edge carries a provenance tag recording the type it came
//! from and its id within that type. For a natively homogeneous graph all
//! tags point at type `0`; for a projection of a [`HeteroGraph`](crate::HeteroGraph)
//! they let results be mapped back to the typed view.
//!
//! Node and edge ids are stable for the lifetime of a [`Graph`]. New ids are
//! only assigned when an induced subgraph is materialized.

use crate::{Error, Result};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Node identifier, dense from `0`.
pub type NodeId = usize;

/// Edge identifier, dense from `0`.
pub type EdgeId = usize;

/// Origin of a node in the typed graph it was projected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeTag {
    /// Index of the node type in the projection's type order.
    pub node_type: usize,
    /// Id of the node within its type.
    pub local_id: usize,
}

/// Origin of an edge in the typed graph it was projected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeTag {
    /// Index of the edge type in the projection's type order.
    pub edge_type: usize,
    /// Id of the edge within its type.
    pub local_id: usize,
}

/// Which way an expansion step follows edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// From source to destination.
    #[default]
    Outgoing,
    /// From destination back to source (message-passing direction).
    Incoming,
}

impl From<Direction> for petgraph::Direction {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Outgoing => petgraph::Direction::Outgoing,
            Direction::Incoming => petgraph::Direction::Incoming,
        }
    }
}

/// Nodes reached by one step from a node set, with the edges used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Neighborhood {
    /// Newly reached nodes, in first-reached order, without duplicates.
    pub nodes: Vec<NodeId>,
    /// Every edge used to reach them, in traversal order.
    pub edges: Vec<EdgeId>,
}

/// A directed graph with tagged nodes and edges.
///
/// Uses petgraph's directed graph internally; edge ids are petgraph edge
/// indices and never change because edges are never removed.
///
/// # Example
///
/// ```rust
/// use hopmask_core::{Direction, Graph};
///
/// let g = Graph::from_edges(3, &[(0, 1), (1, 2)]).unwrap();
/// let hop = g.neighbors_via(&[0], None, Direction::Outgoing).unwrap();
/// assert_eq!(hop.nodes, vec![1]);
/// assert_eq!(hop.edges, vec![0]);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    inner: DiGraph<NodeTag, EdgeTag>,
}

impl Graph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a homogeneous graph with `num_nodes` nodes and no edges.
    pub fn with_nodes(num_nodes: usize) -> Self {
        let mut inner = DiGraph::with_capacity(num_nodes, 0);
        for local_id in 0..num_nodes {
            inner.add_node(NodeTag {
                node_type: 0,
                local_id,
            });
        }
        Self { inner }
    }

    /// Create a homogeneous graph from an edge list.
    pub fn from_edges(num_nodes: usize, edges: &[(NodeId, NodeId)]) -> Result<Self> {
        let mut graph = Self::with_nodes(num_nodes);
        for &(src, dst) in edges {
            graph.add_edge(src, dst)?;
        }
        Ok(graph)
    }

    /// Add a node with an explicit provenance tag.
    pub fn add_tagged_node(&mut self, tag: NodeTag) -> NodeId {
        self.inner.add_node(tag).index()
    }

    /// Add an edge of the single homogeneous edge type.
    pub fn add_edge(&mut self, src: NodeId, dst: NodeId) -> Result<EdgeId> {
        let tag = EdgeTag {
            edge_type: 0,
            local_id: self.edge_count(),
        };
        self.add_tagged_edge(src, dst, tag)
    }

    /// Add an edge with an explicit provenance tag.
    pub fn add_tagged_edge(&mut self, src: NodeId, dst: NodeId, tag: EdgeTag) -> Result<EdgeId> {
        let src = self.node_index(src)?;
        let dst = self.node_index(dst)?;
        Ok(self.inner.add_edge(src, dst, tag).index())
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Check if a node exists.
    pub fn contains_node(&self, node: NodeId) -> bool {
        node < self.inner.node_count()
    }

    /// Provenance tag of a node.
    pub fn node_tag(&self, node: NodeId) -> Option<NodeTag> {
        self.inner.node_weight(NodeIndex::new(node)).copied()
    }

    /// Provenance tag of an edge.
    pub fn edge_tag(&self, edge: EdgeId) -> Option<EdgeTag> {
        self.inner.edge_weight(EdgeIndex::new(edge)).copied()
    }

    /// Source and destination of an edge.
    pub fn edge_endpoints(&self, edge: EdgeId) -> Option<(NodeId, NodeId)> {
        self.inner
            .edge_endpoints(EdgeIndex::new(edge))
            .map(|(s, d)| (s.index(), d.index()))
    }

    /// Iterate over `(src, dst)` pairs in edge-id order.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.inner
            .raw_edges()
            .iter()
            .map(|e| (e.source().index(), e.target().index()))
    }

    /// Iterate over edge tags in edge-id order.
    pub fn edge_tags(&self) -> impl Iterator<Item = EdgeTag> + '_ {
        self.inner.raw_edges().iter().map(|e| e.weight)
    }

    /// Nodes reachable over one edge from `nodes`, and the edges used.
    ///
    /// Only nodes outside `nodes` are returned. A node reachable through
    /// several edges appears once, but every one of those edges is returned.
    /// When `edge_types` is given, only edges whose tag type is in the set
    /// are followed.
    ///
    /// Output order is deterministic: input order, then ascending edge id.
    pub fn neighbors_via(
        &self,
        nodes: &[NodeId],
        edge_types: Option<&HashSet<usize>>,
        direction: Direction,
    ) -> Result<Neighborhood> {
        let mut sources = Vec::with_capacity(nodes.len());
        let mut members = HashSet::with_capacity(nodes.len());
        for &node in nodes {
            self.node_index(node)?;
            if members.insert(node) {
                sources.push(node);
            }
        }

        let mut reached = HashSet::new();
        let mut out = Neighborhood::default();
        for node in sources {
            for edge in self.incident_edges(node, direction) {
                if let Some(allowed) = edge_types {
                    if !allowed.contains(&self.inner[edge].edge_type) {
                        continue;
                    }
                }
                let Some(other) = self.far_end(edge, direction) else {
                    continue;
                };
                if members.contains(&other) {
                    continue;
                }
                out.edges.push(edge.index());
                if reached.insert(other) {
                    out.nodes.push(other);
                }
            }
        }
        Ok(out)
    }

    /// Materialize the subgraph induced by `nodes`.
    ///
    /// Local node ids follow the order of `nodes` (repeats ignored); local
    /// edge ids follow ascending original edge id. Tags are carried over.
    pub fn induced_subgraph(&self, nodes: &[NodeId]) -> Result<InducedSubgraph> {
        let mut local: HashMap<NodeId, NodeIndex> = HashMap::with_capacity(nodes.len());
        let mut kept_nodes = Vec::with_capacity(nodes.len());
        let mut inner = DiGraph::with_capacity(nodes.len(), 0);

        for &node in nodes {
            let idx = self.node_index(node)?;
            if local.contains_key(&node) {
                continue;
            }
            local.insert(node, inner.add_node(self.inner[idx]));
            kept_nodes.push(node);
        }

        let mut kept_edges: Vec<EdgeIndex> = kept_nodes
            .iter()
            .flat_map(|&node| {
                self.inner
                    .edges_directed(NodeIndex::new(node), petgraph::Direction::Outgoing)
                    .map(|e| e.id())
            })
            .filter(|&edge| {
                self.inner
                    .edge_endpoints(edge)
                    .is_some_and(|(_, dst)| local.contains_key(&dst.index()))
            })
            .collect();
        kept_edges.sort_unstable();

        let mut edge_map = HashMap::with_capacity(kept_edges.len());
        for edge in kept_edges {
            let Some((src, dst)) = self.inner.edge_endpoints(edge) else {
                continue;
            };
            let new = inner.add_edge(local[&src.index()], local[&dst.index()], self.inner[edge]);
            edge_map.insert(edge.index(), new.index());
        }

        Ok(InducedSubgraph {
            graph: Graph { inner },
            nodes: kept_nodes,
            edge_map,
        })
    }

    fn node_index(&self, node: NodeId) -> Result<NodeIndex> {
        if self.contains_node(node) {
            Ok(NodeIndex::new(node))
        } else {
            Err(Error::UnknownNode(node))
        }
    }

    fn incident_edges(&self, node: NodeId, direction: Direction) -> Vec<EdgeIndex> {
        let mut edges: Vec<EdgeIndex> = self
            .inner
            .edges_directed(NodeIndex::new(node), direction.into())
            .map(|e| e.id())
            .collect();
        edges.sort_unstable();
        edges
    }

    fn far_end(&self, edge: EdgeIndex, direction: Direction) -> Option<NodeId> {
        let (src, dst) = self.inner.edge_endpoints(edge)?;
        Some(match direction {
            Direction::Outgoing => dst.index(),
            Direction::Incoming => src.index(),
        })
    }
}

impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.inner.node_weights().eq(other.inner.node_weights())
            && self
                .inner
                .raw_edges()
                .iter()
                .map(|e| (e.source(), e.target(), e.weight))
                .eq(other
                    .inner
                    .raw_edges()
                    .iter()
                    .map(|e| (e.source(), e.target(), e.weight)))
    }
}

/// An induced subgraph together with its mapping back to the parent graph.
///
/// The mapping only lives as long as this value; it is consumed while the
/// hop mask is translated and is not persisted.
#[derive(Debug, Clone)]
pub struct InducedSubgraph {
    /// The re-indexed subgraph.
    pub graph: Graph,
    /// Parent node id of each local node, in local order.
    pub nodes: Vec<NodeId>,
    edge_map: HashMap<EdgeId, EdgeId>,
}

impl InducedSubgraph {
    /// Local id of a parent edge, if the edge survived.
    pub fn local_edge(&self, parent: EdgeId) -> Option<EdgeId> {
        self.edge_map.get(&parent).copied()
    }
}
