//! Heterogeneous graph support.
//!
//! A [`HeteroGraph`] stores one node store per node type and one COO edge
//! store per edge type, similar to PyTorch Geometric's `HeteroData`.
//! Traversal never runs on the typed form directly: [`to_homogeneous`]
//! flattens it into a single [`Graph`] whose nodes and edges remember their
//! origin, and [`split_mask`] redistributes a hop mask over that flat edge
//! space back to per-type masks.
//!
//! Types are enumerated in sorted order everywhere, so flattening is
//! deterministic for a given graph.
//!
//! # Example
//!
//! ```rust
//! use hopmask_core::hetero::{to_homogeneous, EdgeType, HeteroGraph, NodeType};
//!
//! let mut hg = HeteroGraph::new();
//! hg.add_nodes(NodeType::new("author"), 2);
//! hg.add_nodes(NodeType::new("paper"), 3);
//!
//! let writes = EdgeType::new("author", "writes", "paper");
//! hg.add_edge(&writes, 0, 1).unwrap();
//! hg.add_edge(&writes, 1, 2).unwrap();
//!
//! let projection = to_homogeneous(&hg).unwrap();
//! assert_eq!(projection.graph.node_count(), 5);
//! assert_eq!(projection.graph.edge_count(), 2);
//! ```

use crate::graph::{EdgeId, EdgeTag, Graph, NodeId, NodeTag};
use crate::{Error, Result};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

/// A node type identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeType(pub String);

impl NodeType {
    /// Create a new node type.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the type name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeType {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeType {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// An edge type identifier, represented as (src_type, relation, dst_type).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeType {
    /// Source node type.
    pub src_type: NodeType,
    /// Relation name.
    pub relation: String,
    /// Destination node type.
    pub dst_type: NodeType,
}

impl EdgeType {
    /// Create a new edge type.
    pub fn new(
        src_type: impl Into<NodeType>,
        relation: impl Into<String>,
        dst_type: impl Into<NodeType>,
    ) -> Self {
        Self {
            src_type: src_type.into(),
            relation: relation.into(),
            dst_type: dst_type.into(),
        }
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}->{}", self.src_type, self.relation, self.dst_type)
    }
}

/// Edge storage for a specific edge type (COO format).
///
/// Indices are local to the source and destination node types. The position
/// of a pair is the edge's id within its type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeStore {
    /// Source node indices (local to src_type).
    pub src: Vec<NodeId>,
    /// Target node indices (local to dst_type).
    pub dst: Vec<NodeId>,
}

impl EdgeStore {
    /// Create an empty edge store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of edges.
    pub fn num_edges(&self) -> usize {
        self.src.len()
    }

    /// Iterate over (src, dst) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.src.iter().copied().zip(self.dst.iter().copied())
    }
}

/// A heterogeneous graph with typed nodes and edges.
///
/// Every edge is checked against its declared endpoint types when added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeteroGraph {
    /// Node count by type.
    node_stores: BTreeMap<NodeType, usize>,
    /// Edges by type.
    edge_stores: BTreeMap<EdgeType, EdgeStore>,
}

impl HeteroGraph {
    /// Create an empty heterogeneous graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of node types.
    pub fn num_node_types(&self) -> usize {
        self.node_stores.len()
    }

    /// Number of edge types.
    pub fn num_edge_types(&self) -> usize {
        self.edge_stores.len()
    }

    /// True if there is exactly one node type and one edge type.
    pub fn is_homogeneous(&self) -> bool {
        self.num_node_types() == 1 && self.num_edge_types() == 1
    }

    /// All node types, sorted.
    pub fn node_types(&self) -> impl Iterator<Item = &NodeType> {
        self.node_stores.keys()
    }

    /// All edge types, sorted.
    pub fn edge_types(&self) -> impl Iterator<Item = &EdgeType> {
        self.edge_stores.keys()
    }

    /// Add `count` nodes of a type, declaring it if needed.
    ///
    /// Returns the local ids of the new nodes.
    pub fn add_nodes(&mut self, node_type: NodeType, count: usize) -> Range<NodeId> {
        let num = self.node_stores.entry(node_type).or_insert(0);
        let start = *num;
        *num += count;
        start..*num
    }

    /// Declare an edge type without adding edges.
    ///
    /// Both endpoint types must already be declared.
    pub fn add_edge_type(&mut self, edge_type: &EdgeType) -> Result<()> {
        self.check_node_type(&edge_type.src_type)?;
        self.check_node_type(&edge_type.dst_type)?;
        self.edge_stores.entry(edge_type.clone()).or_default();
        Ok(())
    }

    /// Add an edge of the given type, returning its id within the type.
    pub fn add_edge(&mut self, edge_type: &EdgeType, src: NodeId, dst: NodeId) -> Result<EdgeId> {
        if src >= self.check_node_type(&edge_type.src_type)? {
            return Err(Error::UnknownNode(src));
        }
        if dst >= self.check_node_type(&edge_type.dst_type)? {
            return Err(Error::UnknownNode(dst));
        }
        let store = self.edge_stores.entry(edge_type.clone()).or_default();
        store.src.push(src);
        store.dst.push(dst);
        Ok(store.num_edges() - 1)
    }

    /// Get edge store for a type.
    pub fn edge_store(&self, edge_type: &EdgeType) -> Option<&EdgeStore> {
        self.edge_stores.get(edge_type)
    }

    /// Number of nodes of a given type.
    pub fn num_nodes(&self, node_type: &NodeType) -> usize {
        self.node_stores.get(node_type).copied().unwrap_or(0)
    }

    /// Number of edges of a given type.
    pub fn num_edges(&self, edge_type: &EdgeType) -> usize {
        self.edge_stores
            .get(edge_type)
            .map(|s| s.num_edges())
            .unwrap_or(0)
    }

    /// Total number of nodes across all types.
    pub fn total_nodes(&self) -> usize {
        self.node_stores.values().sum()
    }

    /// Total number of edges across all types.
    pub fn total_edges(&self) -> usize {
        self.edge_stores.values().map(|s| s.num_edges()).sum()
    }

    fn check_node_type(&self, node_type: &NodeType) -> Result<usize> {
        self.node_stores
            .get(node_type)
            .copied()
            .ok_or_else(|| Error::UnknownNodeType(node_type.0.clone()))
    }
}

/// Statistics for a heterogeneous graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeteroGraphStats {
    /// Number of node types.
    pub num_node_types: usize,
    /// Number of edge types.
    pub num_edge_types: usize,
    /// Total nodes.
    pub total_nodes: usize,
    /// Total edges.
    pub total_edges: usize,
    /// Nodes per type.
    pub nodes_by_type: BTreeMap<String, usize>,
    /// Edges per type.
    pub edges_by_type: BTreeMap<String, usize>,
}

impl HeteroGraph {
    /// Get statistics about the graph.
    pub fn stats(&self) -> HeteroGraphStats {
        HeteroGraphStats {
            num_node_types: self.num_node_types(),
            num_edge_types: self.num_edge_types(),
            total_nodes: self.total_nodes(),
            total_edges: self.total_edges(),
            nodes_by_type: self
                .node_stores
                .iter()
                .map(|(t, &n)| (t.0.clone(), n))
                .collect(),
            edges_by_type: self
                .edge_stores
                .iter()
                .map(|(t, s)| (t.to_string(), s.num_edges()))
                .collect(),
        }
    }
}

/// Node-type layout of a homogeneous projection.
///
/// Node types occupy contiguous id ranges in sorted type order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeTypeIndex {
    types: Vec<NodeType>,
    offsets: Vec<usize>,
    counts: Vec<usize>,
}

impl NodeTypeIndex {
    fn from_hetero(hg: &HeteroGraph) -> Self {
        let mut types = Vec::with_capacity(hg.num_node_types());
        let mut offsets = Vec::with_capacity(hg.num_node_types());
        let mut counts = Vec::with_capacity(hg.num_node_types());
        let mut next = 0;
        for (node_type, &count) in &hg.node_stores {
            types.push(node_type.clone());
            offsets.push(next);
            counts.push(count);
            next += count;
        }
        Self {
            types,
            offsets,
            counts,
        }
    }

    /// Node types in projection order.
    pub fn types(&self) -> &[NodeType] {
        &self.types
    }

    /// Homogeneous id of a typed node.
    pub fn locate(&self, node_type: &NodeType, local_id: NodeId) -> Result<NodeId> {
        let pos = self
            .types
            .iter()
            .position(|t| t == node_type)
            .ok_or_else(|| Error::UnknownNodeType(node_type.0.clone()))?;
        if local_id >= self.counts[pos] {
            return Err(Error::UnknownNode(local_id));
        }
        Ok(self.offsets[pos] + local_id)
    }

    /// Original type and local id of a tagged node.
    pub fn origin(&self, tag: NodeTag) -> Option<(&NodeType, NodeId)> {
        self.types.get(tag.node_type).map(|t| (t, tag.local_id))
    }
}

/// Edge-type layout of a homogeneous graph: the type of every edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeTypeIndex {
    types: Vec<EdgeType>,
    edge_types: Vec<usize>,
}

impl EdgeTypeIndex {
    /// Build the index of a graph from its edge tags.
    ///
    /// `types` must be in the order the tags refer to, which is the order a
    /// [`Projection`] records. Works for projected graphs and for any
    /// subgraph induced from one.
    pub fn from_graph(graph: &Graph, types: Vec<EdgeType>) -> Self {
        Self {
            types,
            edge_types: graph.edge_tags().map(|t| t.edge_type).collect(),
        }
    }

    /// Edge types in projection order.
    pub fn types(&self) -> &[EdgeType] {
        &self.types
    }

    /// Number of indexed edges.
    pub fn len(&self) -> usize {
        self.edge_types.len()
    }

    /// True if no edges are indexed.
    pub fn is_empty(&self) -> bool {
        self.edge_types.is_empty()
    }

    /// Type of a homogeneous edge.
    pub fn type_of(&self, edge: EdgeId) -> Option<&EdgeType> {
        self.edge_types.get(edge).and_then(|&t| self.types.get(t))
    }
}

/// A heterogeneous graph flattened into one id space.
#[derive(Debug, Clone)]
pub struct Projection {
    /// The flattened graph; tags record each node's and edge's origin.
    pub graph: Graph,
    /// Node-type layout.
    pub node_index: NodeTypeIndex,
    /// Edge-type layout.
    pub edge_index: EdgeTypeIndex,
}

/// Flatten a heterogeneous graph into a homogeneous one.
///
/// Nodes are numbered type by type (sorted type order), keeping local order
/// inside a type. Edges are numbered the same way over edge types.
pub fn to_homogeneous(hg: &HeteroGraph) -> Result<Projection> {
    let node_index = NodeTypeIndex::from_hetero(hg);

    let mut graph = Graph::new();
    for (node_type, &count) in node_index.counts.iter().enumerate() {
        for local_id in 0..count {
            graph.add_tagged_node(NodeTag {
                node_type,
                local_id,
            });
        }
    }

    let mut types = Vec::with_capacity(hg.num_edge_types());
    for (edge_type_idx, (edge_type, store)) in hg.edge_stores.iter().enumerate() {
        for (local_id, (src, dst)) in store.iter().enumerate() {
            let src = node_index.locate(&edge_type.src_type, src)?;
            let dst = node_index.locate(&edge_type.dst_type, dst)?;
            graph.add_tagged_edge(
                src,
                dst,
                EdgeTag {
                    edge_type: edge_type_idx,
                    local_id,
                },
            )?;
        }
        types.push(edge_type.clone());
    }

    let edge_index = EdgeTypeIndex::from_graph(&graph, types);
    Ok(Projection {
        graph,
        node_index,
        edge_index,
    })
}

/// Split a hop-major `[k][E]` mask into edge-major `[E_type][k]` masks.
///
/// Each type's columns are taken in ascending homogeneous edge order, which
/// is that type's local edge order within the graph the index describes.
/// Every declared edge type gets an entry, possibly with zero rows.
pub fn split_mask(
    mask: &Array2<bool>,
    index: &EdgeTypeIndex,
) -> Result<BTreeMap<EdgeType, Array2<bool>>> {
    if mask.ncols() != index.len() {
        return Err(Error::MaskShape {
            expected: index.len(),
            actual: mask.ncols(),
        });
    }

    let mut columns: Vec<Vec<usize>> = vec![Vec::new(); index.types.len()];
    for (edge, &edge_type) in index.edge_types.iter().enumerate() {
        columns
            .get_mut(edge_type)
            .ok_or_else(|| Error::UnknownEdgeType(format!("#{edge_type}")))?
            .push(edge);
    }

    Ok(index
        .types
        .iter()
        .zip(columns)
        .map(|(edge_type, cols)| {
            let per_type = mask.select(Axis(1), &cols).reversed_axes();
            (edge_type.clone(), per_type)
        })
        .collect())
}

/// Resolve a typed target node to its id in the homogeneous projection.
pub fn locate_target(hg: &HeteroGraph, node_type: &NodeType, local_id: NodeId) -> Result<NodeId> {
    let mut offset = 0;
    for (t, &count) in &hg.node_stores {
        if t == node_type {
            if local_id >= count {
                return Err(Error::UnknownNode(local_id));
            }
            return Ok(offset + local_id);
        }
        offset += count;
    }
    Err(Error::UnknownNodeType(node_type.0.clone()))
}

/// A graph as handed to the extractor: natively homogeneous, or typed.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphModel {
    /// Single node type and edge type.
    Homogeneous(Graph),
    /// Several node and/or edge types.
    Heterogeneous(HeteroGraph),
}

impl GraphModel {
    /// True for the homogeneous variant.
    pub fn is_homogeneous(&self) -> bool {
        matches!(self, GraphModel::Homogeneous(_))
    }

    /// Total number of nodes.
    pub fn node_count(&self) -> usize {
        match self {
            GraphModel::Homogeneous(g) => g.node_count(),
            GraphModel::Heterogeneous(hg) => hg.total_nodes(),
        }
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> usize {
        match self {
            GraphModel::Homogeneous(g) => g.edge_count(),
            GraphModel::Heterogeneous(hg) => hg.total_edges(),
        }
    }

    /// Project to the single-type view used for traversal.
    ///
    /// Borrows a homogeneous graph; flattens a heterogeneous one.
    pub fn traversal_view(&self) -> Result<TraversalView<'_>> {
        match self {
            GraphModel::Homogeneous(g) => Ok(TraversalView {
                graph: Cow::Borrowed(g),
                typing: None,
            }),
            GraphModel::Heterogeneous(hg) => {
                let projection = to_homogeneous(hg)?;
                Ok(TraversalView {
                    graph: Cow::Owned(projection.graph),
                    typing: Some((projection.node_index, projection.edge_index.types)),
                })
            }
        }
    }
}

impl From<Graph> for GraphModel {
    fn from(g: Graph) -> Self {
        GraphModel::Homogeneous(g)
    }
}

impl From<HeteroGraph> for GraphModel {
    fn from(hg: HeteroGraph) -> Self {
        GraphModel::Heterogeneous(hg)
    }
}

/// Homogeneous view of a [`GraphModel`] plus what is needed to map back.
#[derive(Debug, Clone)]
pub struct TraversalView<'a> {
    graph: Cow<'a, Graph>,
    typing: Option<(NodeTypeIndex, Vec<EdgeType>)>,
}

impl TraversalView<'_> {
    /// The graph to traverse.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// True when the view came from a heterogeneous graph.
    pub fn is_typed(&self) -> bool {
        self.typing.is_some()
    }

    /// Edge types in tag order, for typed views.
    pub fn edge_types(&self) -> Option<&[EdgeType]> {
        self.typing.as_ref().map(|(_, types)| types.as_slice())
    }

    /// Resolve a target node to its traversal id.
    ///
    /// Typed views need the node type; homogeneous views ignore it.
    pub fn resolve(&self, node_type: Option<&NodeType>, local_id: NodeId) -> Result<NodeId> {
        match (&self.typing, node_type) {
            (Some((node_index, _)), Some(node_type)) => node_index.locate(node_type, local_id),
            (Some(_), None) => Err(Error::UnknownNodeType(String::new())),
            (None, _) if self.graph.contains_node(local_id) => Ok(local_id),
            (None, _) => Err(Error::UnknownNode(local_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn academic() -> HeteroGraph {
        let mut hg = HeteroGraph::new();
        hg.add_nodes(NodeType::new("author"), 2);
        hg.add_nodes(NodeType::new("paper"), 3);

        let writes = EdgeType::new("author", "writes", "paper");
        let cites = EdgeType::new("paper", "cites", "paper");
        hg.add_edge(&writes, 0, 0).unwrap();
        hg.add_edge(&writes, 1, 1).unwrap();
        hg.add_edge(&cites, 0, 2).unwrap();
        hg
    }

    #[test]
    fn test_hetero_graph_basic() {
        let hg = academic();
        assert_eq!(hg.num_node_types(), 2);
        assert_eq!(hg.num_edge_types(), 2);
        assert_eq!(hg.num_nodes(&NodeType::new("paper")), 3);
        assert_eq!(hg.total_edges(), 3);
        assert!(!hg.is_homogeneous());
    }

    #[test]
    fn test_add_edge_validates_types() {
        let mut hg = academic();
        let bad = EdgeType::new("venue", "hosts", "paper");
        assert!(matches!(
            hg.add_edge(&bad, 0, 0),
            Err(Error::UnknownNodeType(t)) if t == "venue"
        ));

        let writes = EdgeType::new("author", "writes", "paper");
        assert!(matches!(hg.add_edge(&writes, 2, 0), Err(Error::UnknownNode(2))));
        assert!(matches!(hg.add_edge(&writes, 0, 3), Err(Error::UnknownNode(3))));
    }

    #[test]
    fn test_to_homogeneous_layout() {
        let hg = academic();
        let p = to_homogeneous(&hg).unwrap();

        assert_eq!(p.graph.node_count(), 5);
        assert_eq!(p.graph.edge_count(), 3);
        // sorted types: author (0..2), paper (2..5)
        assert_eq!(p.node_index.locate(&NodeType::new("paper"), 0).unwrap(), 2);
        // sorted edge types: (author, writes, paper) < (paper, cites, paper)
        assert_eq!(p.edge_index.types()[0].relation, "writes");
        assert_eq!(p.graph.edge_endpoints(0), Some((0, 2)));
        assert_eq!(p.graph.edge_endpoints(2), Some((2, 4)));
        assert_eq!(p.edge_index.type_of(2).unwrap().relation, "cites");

        let tag = p.graph.node_tag(4).unwrap();
        let (t, local) = p.node_index.origin(tag).unwrap();
        assert_eq!((t.as_str(), local), ("paper", 2));
    }

    #[test]
    fn test_locate_target() {
        let hg = academic();
        assert_eq!(locate_target(&hg, &NodeType::new("author"), 1).unwrap(), 1);
        assert_eq!(locate_target(&hg, &NodeType::new("paper"), 1).unwrap(), 3);
        assert!(matches!(
            locate_target(&hg, &NodeType::new("venue"), 0),
            Err(Error::UnknownNodeType(_))
        ));
        assert!(matches!(
            locate_target(&hg, &NodeType::new("paper"), 3),
            Err(Error::UnknownNode(3))
        ));
    }

    #[test]
    fn test_split_mask_transposes_per_type() {
        let hg = academic();
        let p = to_homogeneous(&hg).unwrap();

        // 2 hops over 3 edges: writes#0 at hop 0, cites#0 at hop 1
        let mask = array![[true, false, false], [false, false, true]];
        let split = split_mask(&mask, &p.edge_index).unwrap();

        let writes = &split[&EdgeType::new("author", "writes", "paper")];
        let cites = &split[&EdgeType::new("paper", "cites", "paper")];
        assert_eq!(writes.shape(), &[2, 2]);
        assert_eq!(cites.shape(), &[1, 2]);
        assert_eq!(writes, &array![[true, false], [false, false]]);
        assert_eq!(cites, &array![[false, true]]);
    }

    #[test]
    fn test_split_mask_rejects_wrong_width() {
        let hg = academic();
        let p = to_homogeneous(&hg).unwrap();
        let mask = Array2::from_elem((2, 4), false);
        assert!(matches!(
            split_mask(&mask, &p.edge_index),
            Err(Error::MaskShape { expected: 3, actual: 4 })
        ));
    }

    #[test]
    fn test_split_mask_unknown_edge_type() {
        let hg = academic();
        let p = to_homogeneous(&hg).unwrap();
        let truncated = EdgeTypeIndex::from_graph(&p.graph, p.edge_index.types()[..1].to_vec());
        let mask = Array2::from_elem((1, 3), false);
        assert!(matches!(
            split_mask(&mask, &truncated),
            Err(Error::UnknownEdgeType(_))
        ));
    }

    #[test]
    fn test_traversal_view_resolve() {
        let model = GraphModel::from(academic());
        let view = model.traversal_view().unwrap();
        assert!(view.is_typed());
        assert_eq!(view.resolve(Some(&NodeType::new("paper")), 2).unwrap(), 4);
        assert!(matches!(view.resolve(None, 0), Err(Error::UnknownNodeType(_))));

        let model = GraphModel::from(Graph::with_nodes(3));
        let view = model.traversal_view().unwrap();
        assert_eq!(view.resolve(None, 2).unwrap(), 2);
        assert!(matches!(view.resolve(None, 3), Err(Error::UnknownNode(3))));
    }

    #[test]
    fn test_stats() {
        let stats = academic().stats();
        assert_eq!(stats.total_nodes, 5);
        assert_eq!(stats.edges_by_type["paper-cites->paper"], 1);
    }
}
