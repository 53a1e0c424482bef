// Allow minor clippy style warnings at crate level
// These are mostly style preferences, not bugs
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::derive_partial_eq_without_eq)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unwrap_or_default)]

//! k-hop enclosing subgraphs with per-hop edge masks.
//!
//! For every target node, this crate extracts the subgraph reached within
//! `k` expansion hops and records, per hop, which of its edges were
//! traversed at that hop. The result feeds hop-aware message passing: hop
//! `h` of a model only passes messages along the edges marked in row `h`.
//!
//! - [`Graph`] - Directed graph with dense node and edge ids
//! - [`HeteroGraph`] - Typed nodes and edges, flattened with [`to_homogeneous`]
//! - [`HopMaskBuilder`] - Builds an [`EnclosingSubgraph`] for one target
//! - [`DatasetCache`] - Builds a [`Dataset`] once per key and reloads it after
//!
//! # Algorithms
//!
//! - [`algo::frontier`] - One hop of frontier expansion
//! - [`algo::hop_mask`] - Multi-hop extraction with first-hop edge attribution
//!
//! # Example
//!
//! ```rust
//! use hopmask_core::{Direction, Graph};
//!
//! // 0 -> 1 -> 2, 0 -> 3 -> 4
//! let g = Graph::from_edges(5, &[(0, 1), (1, 2), (0, 3), (3, 4)]).unwrap();
//!
//! let hood = g.neighbors_via(&[0], None, Direction::Outgoing).unwrap();
//! assert_eq!(hood.nodes, vec![1, 3]);
//! assert_eq!(hood.edges, vec![0, 2]);
//! ```

pub mod algo;
pub mod cache;
pub mod config;
pub mod dataset;
mod error;
pub mod formats;
pub mod graph;
pub mod hetero;

pub use algo::hop_mask::{EnclosingSubgraph, HopMaskBuilder};
pub use cache::{ArtifactStore, CacheDecision, DatasetCache, FsStore, MemoryStore};
pub use config::ExtractConfig;
pub use dataset::{Dataset, Record, Split};
pub use error::{Error, Result};
pub use formats::{GraphFile, SplitIndex};
pub use graph::{Direction, EdgeId, EdgeTag, Graph, InducedSubgraph, Neighborhood, NodeId, NodeTag};
pub use hetero::{
    locate_target, split_mask, to_homogeneous, EdgeType, GraphModel, HeteroGraph, NodeType,
};
