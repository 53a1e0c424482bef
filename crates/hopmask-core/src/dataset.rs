//! Labelled enclosing subgraphs, one per target node.

use crate::algo::hop_mask::EnclosingSubgraph;
use crate::formats::SplitIndex;
use crate::graph::NodeId;
use crate::hetero::EdgeType;
use crate::{Error, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One target node's subgraph, hop mask and label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Target node id, local to the target node type.
    pub node: NodeId,
    /// Enclosing subgraph with its hop-major mask.
    pub subgraph: EnclosingSubgraph,
    /// Per edge type masks shaped `[E_type][k]`, for heterogeneous graphs.
    pub typed_masks: Option<BTreeMap<EdgeType, Array2<bool>>>,
    /// Class label.
    pub label: i64,
}

/// Records in target-node enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if there are no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record at a position.
    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    /// Iterate over records in order.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// Records at the given positions, in the given order.
    pub fn subset(&self, indices: &[usize]) -> Result<Vec<&Record>> {
        indices
            .iter()
            .map(|&index| {
                self.records.get(index).ok_or(Error::IndexOutOfRange {
                    index,
                    len: self.records.len(),
                })
            })
            .collect()
    }

    /// Partition by an externally supplied split.
    pub fn split(&self, index: &SplitIndex) -> Result<Split<'_>> {
        Ok(Split {
            train: self.subset(&index.train_index)?,
            valid: self.subset(&index.valid_index)?,
            test: self.subset(&index.test_index)?,
        })
    }
}

impl FromIterator<Record> for Dataset {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<Record>> for Dataset {
    fn from(records: Vec<Record>) -> Self {
        Self { records }
    }
}

/// Borrowed train/valid/test partitions of a [`Dataset`].
#[derive(Debug, Clone)]
pub struct Split<'a> {
    /// Training records.
    pub train: Vec<&'a Record>,
    /// Validation records.
    pub valid: Vec<&'a Record>,
    /// Test records.
    pub test: Vec<&'a Record>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::hop_mask::build;
    use crate::Graph;

    fn dataset() -> Dataset {
        let g = Graph::from_edges(3, &[(0, 1), (1, 2)]).unwrap();
        (0..3)
            .map(|node| Record {
                node,
                subgraph: build(&g, node, 1).unwrap(),
                typed_masks: None,
                label: node as i64 % 2,
            })
            .collect()
    }

    #[test]
    fn test_subset_keeps_requested_order() {
        let ds = dataset();
        let picked = ds.subset(&[2, 0]).unwrap();
        assert_eq!(picked[0].node, 2);
        assert_eq!(picked[1].node, 0);
    }

    #[test]
    fn test_subset_out_of_range() {
        let ds = dataset();
        assert!(matches!(
            ds.subset(&[1, 3]),
            Err(Error::IndexOutOfRange { index: 3, len: 3 })
        ));
    }

    #[test]
    fn test_split() {
        let ds = dataset();
        let index = SplitIndex {
            train_index: vec![0, 1],
            valid_index: vec![2],
            test_index: vec![],
            label: vec![0, 1, 0],
        };
        let split = ds.split(&index).unwrap();
        assert_eq!(split.train.len(), 2);
        assert_eq!(split.valid[0].label, 0);
        assert!(split.test.is_empty());
    }
}
