//! Traversal algorithms.

/// One-step frontier expansion.
pub mod frontier;

/// k-hop enclosing subgraphs with hop masks.
pub mod hop_mask;
