//! Build-or-load cache for whole datasets.
//!
//! A dataset is built once per cache key and persisted as a single bincode
//! artifact. Whether to load or build is decided by [`decide`], a pure
//! function of the key and an injected [`ArtifactStore`], so the decision can
//! be tested without touching the filesystem.
//!
//! The key must uniquely identify the (graph, target set, k) triple. A stale
//! or colliding key loads the wrong dataset without any error.
//!
//! # Example
//!
//! ```rust
//! use hopmask_core::cache::{DatasetCache, MemoryStore};
//! use hopmask_core::{ExtractConfig, Graph, GraphModel};
//!
//! let graph = GraphModel::from(Graph::from_edges(3, &[(0, 1), (1, 2)]).unwrap());
//! let cache = DatasetCache::new(MemoryStore::new(), ExtractConfig::with_hops(2));
//!
//! let built = cache.build_or_load(&graph, None, &[0, 1, 2], &[1, 0, 1], "toy").unwrap();
//! let loaded = cache.build_or_load(&graph, None, &[0, 1, 2], &[1, 0, 1], "toy").unwrap();
//! assert_eq!(built, loaded);
//! ```

use crate::algo::hop_mask::HopMaskBuilder;
use crate::config::ExtractConfig;
use crate::dataset::{Dataset, Record};
use crate::graph::NodeId;
use crate::hetero::{split_mask, EdgeTypeIndex, GraphModel, NodeType};
use crate::{Error, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::Instant;
use tracing::{debug, info};

/// Version of the on-disk artifact layout.
pub const ARTIFACT_VERSION: u32 = 1;

/// Storage for cache artifacts, addressed by cache key.
pub trait ArtifactStore: Send + Sync {
    /// True if an artifact exists for `key`.
    fn exists(&self, key: &str) -> bool;

    /// Read the whole artifact for `key`.
    fn read(&self, key: &str) -> Result<Vec<u8>>;

    /// Write the whole artifact for `key`, replacing any previous one.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<()>;
}

/// Artifacts as files `{data_dir}/{key}_sg.bin`.
#[derive(Debug, Clone)]
pub struct FsStore {
    data_dir: PathBuf,
}

impl FsStore {
    /// Store rooted at `data_dir` (created on first write).
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Directory holding the artifacts.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Artifact path for a cache key.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{key}_sg.bin"))
    }
}

impl ArtifactStore for FsStore {
    fn exists(&self, key: &str) -> bool {
        self.path_for(key).is_file()
    }

    fn read(&self, key: &str) -> Result<Vec<u8>> {
        Ok(fs::read(self.path_for(key))?)
    }

    /// Written to a temporary sibling and renamed into place, so an
    /// interrupted write never leaves an artifact behind.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("bin.partial");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// In-process artifact store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    artifacts: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored artifacts.
    pub fn len(&self) -> usize {
        self.artifacts.read().map(|a| a.len()).unwrap_or(0)
    }

    /// True if nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ArtifactStore for MemoryStore {
    fn exists(&self, key: &str) -> bool {
        self.artifacts
            .read()
            .map(|a| a.contains_key(key))
            .unwrap_or(false)
    }

    fn read(&self, key: &str) -> Result<Vec<u8>> {
        let artifacts = self.artifacts.read().map_err(poisoned)?;
        artifacts.get(key).cloned().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, format!("no artifact '{key}'")).into()
        })
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.artifacts
            .write()
            .map_err(poisoned)?
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> Error {
    std::io::Error::new(std::io::ErrorKind::Other, "artifact store lock poisoned").into()
}

/// Whether a cache key is satisfied by an existing artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    /// Deserialize the existing artifact.
    Load,
    /// Compute the dataset and persist it.
    Build,
}

/// Decide between loading and building for `key`.
pub fn decide<S: ArtifactStore + ?Sized>(store: &S, key: &str) -> CacheDecision {
    if store.exists(key) {
        CacheDecision::Load
    } else {
        CacheDecision::Build
    }
}

#[derive(Serialize)]
struct ArtifactRef<'a> {
    version: u32,
    key: &'a str,
    dataset: &'a Dataset,
}

#[derive(Deserialize)]
struct Artifact {
    version: u32,
    key: String,
    dataset: Dataset,
}

/// Builds datasets of enclosing subgraphs and caches them in a store.
#[derive(Debug)]
pub struct DatasetCache<S> {
    store: S,
    config: ExtractConfig,
}

impl<S: ArtifactStore> DatasetCache<S> {
    /// Create a cache over `store`.
    pub fn new(store: S, config: ExtractConfig) -> Self {
        Self { store, config }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The extraction config used for builds.
    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Whether `key` would be loaded or built.
    pub fn decide(&self, key: &str) -> CacheDecision {
        decide(&self.store, key)
    }

    /// Return the dataset for `key`, building and persisting it if needed.
    ///
    /// `targets` are node ids local to `target_type` (ignored for
    /// homogeneous graphs); `labels` must be aligned with `targets`. Any
    /// error aborts the build and nothing is written.
    pub fn build_or_load(
        &self,
        graph: &GraphModel,
        target_type: Option<&NodeType>,
        targets: &[NodeId],
        labels: &[i64],
        key: &str,
    ) -> Result<Dataset> {
        match self.decide(key) {
            CacheDecision::Load => {
                info!(key, "loading cached dataset");
                self.load(key)
            }
            CacheDecision::Build => {
                let dataset = self.build(graph, target_type, targets, labels)?;
                self.save(key, &dataset)?;
                Ok(dataset)
            }
        }
    }

    /// Build a dataset without touching the store.
    pub fn build(
        &self,
        graph: &GraphModel,
        target_type: Option<&NodeType>,
        targets: &[NodeId],
        labels: &[i64],
    ) -> Result<Dataset> {
        if targets.len() != labels.len() {
            return Err(Error::LabelMismatch {
                targets: targets.len(),
                labels: labels.len(),
            });
        }

        let start = Instant::now();
        let view = graph.traversal_view()?;
        let builder = HopMaskBuilder::new(self.config);

        let make = |(&node, &label): (&NodeId, &i64)| -> Result<Record> {
            let target = view.resolve(target_type, node)?;
            let subgraph = builder.build(view.graph(), target)?;
            let typed_masks = match view.edge_types() {
                Some(types) => {
                    let index = EdgeTypeIndex::from_graph(&subgraph.graph, types.to_vec());
                    Some(split_mask(&subgraph.hop_mask, &index)?)
                }
                None => None,
            };
            debug!(
                node,
                nodes = subgraph.graph.node_count(),
                edges = subgraph.graph.edge_count(),
                "built enclosing subgraph"
            );
            Ok(Record {
                node,
                subgraph,
                typed_masks,
                label,
            })
        };

        let records: Vec<Record> = if self.config.parallel {
            targets
                .par_iter()
                .zip(labels.par_iter())
                .map(make)
                .collect::<Result<_>>()?
        } else {
            targets
                .iter()
                .zip(labels)
                .map(make)
                .collect::<Result<_>>()?
        };

        info!(
            records = records.len(),
            hops = self.config.hops,
            elapsed = ?start.elapsed(),
            "built dataset"
        );
        Ok(Dataset::from(records))
    }

    /// Deserialize the artifact for `key`.
    pub fn load(&self, key: &str) -> Result<Dataset> {
        let bytes = self.store.read(key)?;
        let corrupt = |reason: String| Error::CacheCorrupt {
            key: key.to_string(),
            reason,
        };

        let artifact: Artifact = bincode::deserialize(&bytes).map_err(|e| corrupt(e.to_string()))?;
        if artifact.version != ARTIFACT_VERSION {
            return Err(corrupt(format!(
                "format version {} (expected {})",
                artifact.version, ARTIFACT_VERSION
            )));
        }
        if artifact.key != key {
            return Err(corrupt(format!("artifact was written for key '{}'", artifact.key)));
        }
        Ok(artifact.dataset)
    }

    /// Serialize `dataset` and write it under `key`.
    pub fn save(&self, key: &str, dataset: &Dataset) -> Result<()> {
        let bytes = bincode::serialize(&ArtifactRef {
            version: ARTIFACT_VERSION,
            key,
            dataset,
        })
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        self.store.write(key, &bytes)?;
        info!(key, bytes = bytes.len(), "wrote dataset artifact");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hetero::{EdgeType, HeteroGraph};
    use crate::Graph;

    fn two_branches() -> GraphModel {
        Graph::from_edges(5, &[(0, 1), (1, 2), (0, 3), (3, 4)])
            .unwrap()
            .into()
    }

    #[test]
    fn test_decide() {
        let store = MemoryStore::new();
        assert_eq!(decide(&store, "ds"), CacheDecision::Build);
        store.write("ds", b"anything").unwrap();
        assert_eq!(decide(&store, "ds"), CacheDecision::Load);
        assert_eq!(decide(&store, "other"), CacheDecision::Build);
    }

    #[test]
    fn test_build_then_load_roundtrip() {
        let cache = DatasetCache::new(MemoryStore::new(), ExtractConfig::with_hops(2));
        let graph = two_branches();

        let built = cache
            .build_or_load(&graph, None, &[0, 3], &[1, 0], "toy")
            .unwrap();
        assert_eq!(cache.store().len(), 1);
        assert_eq!(cache.decide("toy"), CacheDecision::Load);

        let loaded = cache.load("toy").unwrap();
        assert_eq!(built, loaded);
        assert_eq!(loaded.get(1).unwrap().label, 0);
    }

    #[test]
    fn test_load_skips_recompute() {
        let cache = DatasetCache::new(MemoryStore::new(), ExtractConfig::with_hops(1));
        let graph = two_branches();
        let first = cache
            .build_or_load(&graph, None, &[0], &[7], "toy")
            .unwrap();

        // A different request under the same key returns the cached data
        let second = cache
            .build_or_load(&graph, None, &[1, 2], &[0, 0], "toy")
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_target_writes_nothing() {
        let cache = DatasetCache::new(MemoryStore::new(), ExtractConfig::with_hops(2));
        let err = cache.build_or_load(&two_branches(), None, &[0, 42], &[0, 0], "bad");
        assert!(matches!(err, Err(Error::UnknownNode(42))));
        assert!(cache.store().is_empty());
    }

    #[test]
    fn test_label_mismatch() {
        let cache = DatasetCache::new(MemoryStore::new(), ExtractConfig::default());
        let err = cache.build(&two_branches(), None, &[0, 1], &[0]);
        assert!(matches!(
            err,
            Err(Error::LabelMismatch { targets: 2, labels: 1 })
        ));
    }

    #[test]
    fn test_corrupt_artifact() {
        let store = MemoryStore::new();
        store.write("ds", &[0xff, 0x00, 0x13]).unwrap();
        let cache = DatasetCache::new(store, ExtractConfig::default());
        assert!(matches!(
            cache.build_or_load(&two_branches(), None, &[0], &[0], "ds"),
            Err(Error::CacheCorrupt { .. })
        ));
    }

    #[test]
    fn test_artifact_key_must_match() {
        let cache = DatasetCache::new(MemoryStore::new(), ExtractConfig::default());
        let dataset = cache.build(&two_branches(), None, &[0], &[0]).unwrap();
        cache.save("a", &dataset).unwrap();
        let bytes = cache.store().read("a").unwrap();
        cache.store().write("b", &bytes).unwrap();
        assert!(matches!(cache.load("b"), Err(Error::CacheCorrupt { .. })));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let graph = two_branches();
        let targets = [4, 3, 2, 1, 0];
        let labels = [0, 1, 0, 1, 0];
        let par = DatasetCache::new(MemoryStore::new(), ExtractConfig::default())
            .build(&graph, None, &targets, &labels)
            .unwrap();
        let seq_config = ExtractConfig {
            parallel: false,
            ..ExtractConfig::default()
        };
        let seq = DatasetCache::new(MemoryStore::new(), seq_config)
            .build(&graph, None, &targets, &labels)
            .unwrap();
        assert_eq!(par, seq);
        assert_eq!(par.get(0).unwrap().node, 4);
    }

    #[test]
    fn test_heterogeneous_records_carry_typed_masks() {
        let mut hg = HeteroGraph::new();
        hg.add_nodes(NodeType::new("author"), 1);
        hg.add_nodes(NodeType::new("paper"), 2);
        let writes = EdgeType::new("author", "writes", "paper");
        let cites = EdgeType::new("paper", "cites", "paper");
        hg.add_edge(&writes, 0, 0).unwrap();
        hg.add_edge(&cites, 0, 1).unwrap();

        let cache = DatasetCache::new(MemoryStore::new(), ExtractConfig::with_hops(2));
        let graph = GraphModel::from(hg);
        let author = NodeType::new("author");
        let ds = cache
            .build_or_load(&graph, Some(&author), &[0], &[3], "hetero")
            .unwrap();

        let record = ds.get(0).unwrap();
        let masks = record.typed_masks.as_ref().unwrap();
        assert_eq!(masks[&writes].shape(), &[1, 2]);
        assert!(masks[&writes][[0, 0]]);
        assert!(masks[&cites][[0, 1]]);

        assert_eq!(cache.load("hetero").unwrap(), ds);
    }

    #[test]
    fn test_heterogeneous_requires_target_type() {
        let mut hg = HeteroGraph::new();
        hg.add_nodes(NodeType::new("a"), 1);
        hg.add_nodes(NodeType::new("b"), 1);
        let cache = DatasetCache::new(MemoryStore::new(), ExtractConfig::default());
        let err = cache.build(&GraphModel::from(hg), Some(&NodeType::new("c")), &[0], &[0]);
        assert!(matches!(err, Err(Error::UnknownNodeType(t)) if t == "c"));
    }
}
