//! Extraction configuration.

use crate::graph::Direction;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Configuration for enclosing-subgraph extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Number of expansion hops (`k`).
    pub hops: usize,
    /// Which way edges are followed.
    pub direction: Direction,
    /// Build per-target subgraphs on the rayon pool.
    pub parallel: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            hops: 2,
            direction: Direction::Outgoing,
            parallel: true,
        }
    }
}

impl ExtractConfig {
    /// Config with the given hop count and defaults otherwise.
    pub fn with_hops(hops: usize) -> Self {
        Self {
            hops,
            ..Self::default()
        }
    }

    /// Load from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ExtractConfig = serde_json::from_str(r#"{"direction": "incoming"}"#).unwrap();
        assert_eq!(config.hops, 2);
        assert_eq!(config.direction, Direction::Incoming);
        assert!(config.parallel);
    }
}
