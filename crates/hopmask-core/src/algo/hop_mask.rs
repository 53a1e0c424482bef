//! k-hop enclosing subgraphs with per-hop edge masks.
//!
//! Starting from one target node, the builder expands the frontier `k`
//! times. Every edge traversed at hop `h` is recorded in layer `h`; an edge
//! belongs to the first hop that traverses it and is never re-marked. After
//! the last hop the subgraph induced by all visited nodes is materialized
//! and each layer is translated into the subgraph's local edge ids.
//!
//! # Example
//!
//! ```rust
//! use hopmask_core::algo::hop_mask::build;
//! use hopmask_core::Graph;
//!
//! // 0 -> 1 -> 2
//! let g = Graph::from_edges(3, &[(0, 1), (1, 2)]).unwrap();
//! let sg = build(&g, 0, 2).unwrap();
//!
//! assert_eq!(sg.graph.node_count(), 3);
//! assert_eq!(sg.hop_edges(0), vec![0]);
//! assert_eq!(sg.hop_edges(1), vec![1]);
//! ```

use super::frontier::{expand, Expansion};
use crate::config::ExtractConfig;
use crate::graph::{EdgeId, Graph, NodeId};
use crate::{Error, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// The k-hop neighborhood of one target node with its hop mask.
///
/// Local node `0` is the target. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnclosingSubgraph {
    /// Induced subgraph over every node reached within `k` hops.
    pub graph: Graph,
    /// Id of the target in the graph it was extracted from.
    pub target: NodeId,
    /// Hop-major mask, shape `[k][E]`.
    pub hop_mask: Array2<bool>,
}

impl EnclosingSubgraph {
    /// Number of hop layers.
    pub fn hops(&self) -> usize {
        self.hop_mask.nrows()
    }

    /// Local ids of the edges attributed to `hop`.
    pub fn hop_edges(&self, hop: usize) -> Vec<EdgeId> {
        if hop >= self.hops() {
            return Vec::new();
        }
        self.hop_mask
            .row(hop)
            .iter()
            .enumerate()
            .filter_map(|(e, &on)| on.then_some(e))
            .collect()
    }

    /// Hop at which an edge was traversed, if any.
    pub fn hop_of(&self, edge: EdgeId) -> Option<usize> {
        if edge >= self.hop_mask.ncols() {
            return None;
        }
        (0..self.hops()).find(|&h| self.hop_mask[[h, edge]])
    }

    /// Edge-major copy of the mask, shape `[E][k]`.
    pub fn edge_major_mask(&self) -> Array2<bool> {
        self.hop_mask.t().to_owned()
    }
}

/// Hop-to-hop state, owned by one [`HopMaskBuilder::build`] call.
#[derive(Debug)]
struct HopAccumulator {
    /// Visited nodes in discovery order; becomes the subgraph node order.
    visited: Vec<NodeId>,
    seen: HashSet<NodeId>,
    frontier: Vec<NodeId>,
    /// Edges already attributed to a hop.
    claimed: HashSet<EdgeId>,
    /// Parent edge ids per hop.
    layers: Vec<Vec<EdgeId>>,
}

impl HopAccumulator {
    fn new(target: NodeId, hops: usize) -> Self {
        Self {
            visited: vec![target],
            seen: [target].into_iter().collect(),
            frontier: vec![target],
            claimed: HashSet::new(),
            layers: Vec::with_capacity(hops),
        }
    }

    fn absorb(&mut self, step: Expansion) {
        let layer = step
            .edges
            .into_iter()
            .filter(|&e| self.claimed.insert(e))
            .collect();
        self.layers.push(layer);

        for &node in &step.reached {
            if self.seen.insert(node) {
                self.visited.push(node);
            }
        }
        self.frontier = step.reached;
    }

    fn skip(&mut self) {
        self.layers.push(Vec::new());
    }
}

/// Builds [`EnclosingSubgraph`]s for single target nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct HopMaskBuilder {
    config: ExtractConfig,
}

impl HopMaskBuilder {
    /// Create a builder from a config.
    pub fn new(config: ExtractConfig) -> Self {
        Self { config }
    }

    /// The builder's config.
    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Extract the enclosing subgraph of `target`.
    ///
    /// A frontier that empties before `k` hops is not an error: the
    /// remaining layers stay empty.
    pub fn build(&self, graph: &Graph, target: NodeId) -> Result<EnclosingSubgraph> {
        if !graph.contains_node(target) {
            return Err(Error::UnknownNode(target));
        }
        let hops = self.config.hops;

        let mut acc = HopAccumulator::new(target, hops);
        for hop in 0..hops {
            if acc.frontier.is_empty() {
                acc.skip();
                continue;
            }
            let step = expand(graph, &acc.frontier, &acc.seen, self.config.direction)?;
            if step.is_exhausted() {
                debug!(node = target, hop, "frontier exhausted");
            }
            acc.absorb(step);
        }

        let induced = graph.induced_subgraph(&acc.visited)?;
        let mut hop_mask = Array2::from_elem((hops, induced.graph.edge_count()), false);
        for (hop, layer) in acc.layers.iter().enumerate() {
            for &edge in layer {
                if let Some(local) = induced.local_edge(edge) {
                    hop_mask[[hop, local]] = true;
                }
            }
        }

        Ok(EnclosingSubgraph {
            graph: induced.graph,
            target,
            hop_mask,
        })
    }
}

/// Extract the `k`-hop enclosing subgraph of `target`, following outgoing edges.
pub fn build(graph: &Graph, target: NodeId, k: usize) -> Result<EnclosingSubgraph> {
    HopMaskBuilder::new(ExtractConfig::with_hops(k)).build(graph, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Direction;

    fn two_branches() -> Graph {
        // 0 -> 1 -> 2, 0 -> 3 -> 4
        Graph::from_edges(5, &[(0, 1), (1, 2), (0, 3), (3, 4)]).unwrap()
    }

    #[test]
    fn test_two_hop_scenario() {
        let sg = build(&two_branches(), 0, 2).unwrap();

        assert_eq!(sg.graph.node_count(), 5);
        assert_eq!(sg.graph.edge_count(), 4);
        assert_eq!(sg.hop_mask.shape(), &[2, 4]);

        let hop0: Vec<_> = sg
            .hop_edges(0)
            .into_iter()
            .filter_map(|e| sg.graph.edge_endpoints(e))
            .collect();
        let hop1: Vec<_> = sg
            .hop_edges(1)
            .into_iter()
            .filter_map(|e| sg.graph.edge_endpoints(e))
            .collect();

        // local node order is discovery order: 0, 1, 3, 2, 4
        assert_eq!(hop0, vec![(0, 1), (0, 2)]);
        assert_eq!(hop1, vec![(1, 3), (2, 4)]);
    }

    #[test]
    fn test_zero_hops() {
        let sg = build(&two_branches(), 0, 0).unwrap();
        assert_eq!(sg.graph.node_count(), 1);
        assert_eq!(sg.graph.edge_count(), 0);
        assert_eq!(sg.hop_mask.shape(), &[0, 0]);
    }

    #[test]
    fn test_isolated_target() {
        let g = Graph::from_edges(3, &[(0, 1)]).unwrap();
        let sg = build(&g, 2, 3).unwrap();
        assert_eq!(sg.graph.node_count(), 1);
        assert_eq!(sg.hops(), 3);
        assert!(sg.hop_mask.iter().all(|&b| !b));
    }

    #[test]
    fn test_unknown_target() {
        assert!(matches!(
            build(&two_branches(), 7, 2),
            Err(Error::UnknownNode(7))
        ));
    }

    #[test]
    fn test_early_exhaustion_leaves_empty_layers() {
        let g = Graph::from_edges(2, &[(0, 1)]).unwrap();
        let sg = build(&g, 0, 4).unwrap();
        assert_eq!(sg.hop_edges(0), vec![0]);
        for hop in 1..4 {
            assert!(sg.hop_edges(hop).is_empty());
        }
    }

    #[test]
    fn test_diamond_marks_both_converging_edges() {
        // 0 -> 1 -> 3, 0 -> 2 -> 3
        let g = Graph::from_edges(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]).unwrap();
        let sg = build(&g, 0, 2).unwrap();
        assert_eq!(sg.graph.node_count(), 4);
        assert_eq!(sg.hop_edges(1).len(), 2);
    }

    #[test]
    fn test_back_edge_attributed_once() {
        // 0 -> 1, 1 -> 0: the back edge is traversed at hop 1 only
        let g = Graph::from_edges(2, &[(0, 1), (1, 0)]).unwrap();
        let sg = build(&g, 0, 3).unwrap();
        assert_eq!(sg.hop_edges(0), vec![0]);
        assert_eq!(sg.hop_edges(1), vec![1]);
        assert!(sg.hop_edges(2).is_empty());
        assert_eq!(sg.hop_of(1), Some(1));
    }

    #[test]
    fn test_incoming_direction() {
        let config = ExtractConfig {
            hops: 2,
            direction: Direction::Incoming,
            parallel: false,
        };
        let sg = HopMaskBuilder::new(config).build(&two_branches(), 4).unwrap();
        // 4 <- 3 <- 0
        assert_eq!(sg.graph.node_count(), 3);
        assert_eq!(sg.hop_edges(0).len(), 1);
        assert_eq!(sg.hop_edges(1).len(), 1);
    }

    #[test]
    fn test_edge_major_mask() {
        let sg = build(&two_branches(), 0, 2).unwrap();
        let t = sg.edge_major_mask();
        assert_eq!(t.shape(), &[4, 2]);
        for e in 0..4 {
            for h in 0..2 {
                assert_eq!(t[[e, h]], sg.hop_mask[[h, e]]);
            }
        }
    }

    #[test]
    fn test_build_is_idempotent() {
        let g = two_branches();
        assert_eq!(build(&g, 1, 2).unwrap(), build(&g, 1, 2).unwrap());
    }
}
