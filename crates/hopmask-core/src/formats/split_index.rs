//! Train/valid/test index artifact.

use crate::dataset::{Dataset, Split};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Positions into a dataset for each partition, plus the aligned labels.
///
/// Positions refer to the target-node enumeration order, which is also the
/// order of a [`Dataset`](crate::Dataset)'s records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitIndex {
    /// Training positions.
    pub train_index: Vec<usize>,
    /// Validation positions.
    pub valid_index: Vec<usize>,
    /// Test positions.
    pub test_index: Vec<usize>,
    /// One label per target node.
    pub label: Vec<i64>,
}

impl SplitIndex {
    /// Load from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Keep only the first `limit` training positions.
    pub fn truncate_train(&mut self, limit: usize) {
        self.train_index.truncate(limit);
    }

    /// Partition `dataset` into train/valid/test records.
    pub fn split<'a>(&self, dataset: &'a Dataset) -> Result<Split<'a>> {
        dataset.split(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_truncate() {
        let mut index: SplitIndex = serde_json::from_str(
            r#"{"train_index": [0, 1, 2], "valid_index": [3], "test_index": [4], "label": [1, 0, 1, 1, 0]}"#,
        )
        .unwrap();
        index.truncate_train(2);
        assert_eq!(index.train_index, vec![0, 1]);
        assert_eq!(index.label.len(), 5);
    }
}
