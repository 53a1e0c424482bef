//! JSON graph artifact.
//!
//! ```json
//! {
//!   "node_types": [{"name": "paper", "num_nodes": 3, "nfeat": [[0.1], [0.2], [0.3]]}],
//!   "edge_types": [{"src_type": "paper", "relation": "cites", "dst_type": "paper",
//!                   "src": [0, 1], "dst": [1, 2]}]
//! }
//! ```
//!
//! Only type declarations and adjacency are read. Extra keys, such as the
//! per-type feature tensors stored next to the structure, are ignored.

use crate::hetero::{EdgeType, GraphModel, HeteroGraph, NodeType};
use crate::{Error, Graph, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// One declared node type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeTypeSpec {
    /// Type name.
    pub name: String,
    /// Number of nodes of this type.
    pub num_nodes: usize,
}

/// One declared edge type with its edges in COO form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeTypeSpec {
    /// Source node type.
    pub src_type: String,
    /// Relation name.
    pub relation: String,
    /// Destination node type.
    pub dst_type: String,
    /// Source ids, local to `src_type`.
    #[serde(default)]
    pub src: Vec<usize>,
    /// Destination ids, local to `dst_type`.
    #[serde(default)]
    pub dst: Vec<usize>,
}

/// Serialized typed graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphFile {
    /// Node type declarations.
    pub node_types: Vec<NodeTypeSpec>,
    /// Edge type declarations.
    pub edge_types: Vec<EdgeTypeSpec>,
}

impl GraphFile {
    /// Load from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Save to a JSON file.
    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    /// Build the graph model.
    ///
    /// One node type with at most one edge type becomes [`GraphModel::Homogeneous`];
    /// anything else becomes [`GraphModel::Heterogeneous`].
    pub fn into_model(self) -> Result<GraphModel> {
        for spec in &self.edge_types {
            if spec.src.len() != spec.dst.len() {
                return Err(Error::InvalidGraph(format!(
                    "edge type {}-{}->{} has {} sources but {} destinations",
                    spec.src_type,
                    spec.relation,
                    spec.dst_type,
                    spec.src.len(),
                    spec.dst.len()
                )));
            }
        }

        if let [nodes] = self.node_types.as_slice() {
            if self.edge_types.len() <= 1 {
                let mut graph = Graph::with_nodes(nodes.num_nodes);
                if let Some(edges) = self.edge_types.first() {
                    for name in [&edges.src_type, &edges.dst_type] {
                        if *name != nodes.name {
                            return Err(Error::UnknownNodeType(name.clone()));
                        }
                    }
                    for (&src, &dst) in edges.src.iter().zip(&edges.dst) {
                        graph.add_edge(src, dst)?;
                    }
                }
                return Ok(GraphModel::Homogeneous(graph));
            }
        }

        let mut hg = HeteroGraph::new();
        for spec in &self.node_types {
            hg.add_nodes(NodeType::new(spec.name.as_str()), spec.num_nodes);
        }
        for spec in &self.edge_types {
            let edge_type = EdgeType::new(
                spec.src_type.as_str(),
                spec.relation.as_str(),
                spec.dst_type.as_str(),
            );
            hg.add_edge_type(&edge_type)?;
            for (&src, &dst) in spec.src.iter().zip(&spec.dst) {
                hg.add_edge(&edge_type, src, dst)?;
            }
        }
        Ok(GraphModel::Heterogeneous(hg))
    }
}

impl From<&HeteroGraph> for GraphFile {
    fn from(hg: &HeteroGraph) -> Self {
        let node_types = hg
            .node_types()
            .map(|t| NodeTypeSpec {
                name: t.0.clone(),
                num_nodes: hg.num_nodes(t),
            })
            .collect();
        let edge_types = hg
            .edge_types()
            .map(|t| {
                let store = hg.edge_store(t).cloned().unwrap_or_default();
                EdgeTypeSpec {
                    src_type: t.src_type.0.clone(),
                    relation: t.relation.clone(),
                    dst_type: t.dst_type.0.clone(),
                    src: store.src,
                    dst: store.dst,
                }
            })
            .collect();
        Self {
            node_types,
            edge_types,
        }
    }
}

impl GraphModel {
    /// Load a graph model from a JSON graph artifact.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        GraphFile::from_json_file(path)?.into_model()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_type_is_homogeneous() {
        let file: GraphFile = serde_json::from_str(
            r#"{
                "node_types": [{"name": "n", "num_nodes": 3, "nfeat": [[1.0], [2.0], [3.0]]}],
                "edge_types": [{"src_type": "n", "relation": "r", "dst_type": "n",
                                "src": [0, 1], "dst": [1, 2]}]
            }"#,
        )
        .unwrap();

        match file.into_model().unwrap() {
            GraphModel::Homogeneous(g) => {
                assert_eq!(g.node_count(), 3);
                assert_eq!(g.edges().collect::<Vec<_>>(), vec![(0, 1), (1, 2)]);
            }
            GraphModel::Heterogeneous(_) => panic!("expected homogeneous graph"),
        }
    }

    #[test]
    fn test_multi_type_is_heterogeneous() {
        let file: GraphFile = serde_json::from_str(
            r#"{
                "node_types": [{"name": "author", "num_nodes": 1}, {"name": "paper", "num_nodes": 2}],
                "edge_types": [
                    {"src_type": "author", "relation": "writes", "dst_type": "paper", "src": [0], "dst": [1]},
                    {"src_type": "paper", "relation": "cites", "dst_type": "paper"}
                ]
            }"#,
        )
        .unwrap();

        let model = file.into_model().unwrap();
        assert!(!model.is_homogeneous());
        assert_eq!(model.node_count(), 3);
        assert_eq!(model.edge_count(), 1);
        match model {
            GraphModel::Heterogeneous(hg) => assert_eq!(hg.num_edge_types(), 2),
            GraphModel::Homogeneous(_) => panic!("expected heterogeneous graph"),
        }
    }

    #[test]
    fn test_mismatched_coo_rejected() {
        let file = GraphFile {
            node_types: vec![NodeTypeSpec {
                name: "n".into(),
                num_nodes: 2,
            }],
            edge_types: vec![EdgeTypeSpec {
                src_type: "n".into(),
                relation: "r".into(),
                dst_type: "n".into(),
                src: vec![0, 1],
                dst: vec![1],
            }],
        };
        assert!(matches!(file.into_model(), Err(Error::InvalidGraph(_))));
    }

    #[test]
    fn test_dangling_edge_rejected() {
        let file = GraphFile {
            node_types: vec![NodeTypeSpec {
                name: "n".into(),
                num_nodes: 2,
            }],
            edge_types: vec![EdgeTypeSpec {
                src_type: "n".into(),
                relation: "r".into(),
                dst_type: "n".into(),
                src: vec![0],
                dst: vec![5],
            }],
        };
        assert!(matches!(file.into_model(), Err(Error::UnknownNode(5))));
    }

    #[test]
    fn test_hetero_roundtrip_through_file() {
        let mut hg = HeteroGraph::new();
        hg.add_nodes(NodeType::new("a"), 2);
        hg.add_nodes(NodeType::new("b"), 1);
        hg.add_edge(&EdgeType::new("a", "to", "b"), 1, 0).unwrap();
        hg.add_edge(&EdgeType::new("b", "back", "a"), 0, 0).unwrap();

        let model = GraphFile::from(&hg).into_model().unwrap();
        assert_eq!(model, GraphModel::Heterogeneous(hg));
    }
}
