//! Single-step frontier expansion.
//!
//! Stateless: everything carried from hop to hop lives in the caller's
//! accumulator. Each call looks only at the newest frontier, which is what
//! makes "this edge belongs to hop h" well defined.

use crate::graph::{Direction, EdgeId, Graph, NodeId};
use crate::Result;
use std::collections::HashSet;

/// Result of one expansion step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    /// Nodes reached for the first time, in first-reached order.
    pub reached: Vec<NodeId>,
    /// Every edge traversed out of the frontier during this step.
    pub edges: Vec<EdgeId>,
}

impl Expansion {
    /// True when nothing new was reached.
    pub fn is_exhausted(&self) -> bool {
        self.reached.is_empty()
    }
}

/// Expand `frontier` by one hop.
///
/// `reached` excludes every node in `visited`; `edges` holds all edges from
/// a frontier node to a node outside the frontier, including edges that lead
/// back to already visited nodes.
pub fn expand(
    graph: &Graph,
    frontier: &[NodeId],
    visited: &HashSet<NodeId>,
    direction: Direction,
) -> Result<Expansion> {
    let hop = graph.neighbors_via(frontier, None, direction)?;
    let reached = hop
        .nodes
        .into_iter()
        .filter(|n| !visited.contains(n))
        .collect();
    Ok(Expansion {
        reached,
        edges: hop.edges,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_expand_skips_visited() {
        // 0 -> 1, 1 -> 0, 1 -> 2
        let g = Graph::from_edges(3, &[(0, 1), (1, 0), (1, 2)]).unwrap();
        let visited: HashSet<NodeId> = [0, 1].into_iter().collect();

        let step = expand(&g, &[1], &visited, Direction::Outgoing).unwrap();
        assert_eq!(step.reached, vec![2]);
        // the back edge to 0 is still traversed
        assert_eq!(step.edges, vec![1, 2]);
    }

    #[test]
    fn test_expand_exhausted() {
        let g = Graph::with_nodes(2);
        let visited: HashSet<NodeId> = [0].into_iter().collect();
        let step = expand(&g, &[0], &visited, Direction::Outgoing).unwrap();
        assert!(step.is_exhausted());
        assert!(step.edges.is_empty());
    }

    #[test]
    fn test_expand_unknown_node() {
        let g = Graph::with_nodes(1);
        let err = expand(&g, &[5], &HashSet::new(), Direction::Outgoing);
        assert!(matches!(err, Err(Error::UnknownNode(5))));
    }
}
