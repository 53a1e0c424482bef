//! Hopmask CLI - Build and inspect cached hop-mask datasets.
//!
//! # Usage
//!
//! ```bash
//! # Show statistics about a graph artifact
//! hopmask stats graph.json
//!
//! # Extract 2-hop enclosing subgraphs for every target node and cache them
//! hopmask extract graph.json --split index.json --target-type paper \
//!     --data-dir data --name acm --hops 2
//!
//! # Inspect a cached dataset
//! hopmask inspect --data-dir data --name acm --record 0
//! ```
//!
//! Logging goes to stderr and is controlled with `RUST_LOG` (default `info`).

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use hopmask_core::cache::{CacheDecision, DatasetCache, FsStore};
use hopmask_core::{Dataset, Direction, ExtractConfig, GraphModel, NodeType, SplitIndex};
use indicatif::ProgressBar;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

#[derive(Parser)]
#[command(name = "hopmask")]
#[command(about = "k-hop enclosing subgraph extraction with hop masks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show statistics about a graph artifact
    Stats {
        /// Graph file (JSON)
        input: PathBuf,
    },

    /// Build (or load) the enclosing-subgraph dataset for all target nodes
    Extract {
        /// Graph file (JSON)
        input: PathBuf,

        /// Split index file with train/valid/test positions and labels (JSON)
        #[arg(short, long)]
        split: PathBuf,

        /// Node type of the targets (required for heterogeneous graphs)
        #[arg(short, long)]
        target_type: Option<String>,

        /// Directory holding cached datasets
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Dataset name, used as the cache key
        #[arg(short, long)]
        name: String,

        /// Extraction config file (JSON); flags override it
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of hops
        #[arg(long)]
        hops: Option<usize>,

        /// Edge direction followed during expansion
        #[arg(long)]
        direction: Option<DirectionArg>,

        /// Keep only the first N training positions
        #[arg(long)]
        index: Option<usize>,

        /// Build targets one by one instead of on the thread pool
        #[arg(long)]
        sequential: bool,
    },

    /// Show the contents of a cached dataset
    Inspect {
        /// Directory holding cached datasets
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Dataset name
        #[arg(short, long)]
        name: String,

        /// Print the hop mask of one record
        #[arg(short, long)]
        record: Option<usize>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DirectionArg {
    /// Source to destination
    Outgoing,
    /// Destination to source
    Incoming,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Outgoing => Direction::Outgoing,
            DirectionArg::Incoming => Direction::Incoming,
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Stats { input } => cmd_stats(&input),
        Commands::Extract {
            input,
            split,
            target_type,
            data_dir,
            name,
            config,
            hops,
            direction,
            index,
            sequential,
        } => {
            let mut config = match config {
                Some(path) => ExtractConfig::from_json_file(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => ExtractConfig::default(),
            };
            if let Some(hops) = hops {
                config.hops = hops;
            }
            if let Some(direction) = direction {
                config.direction = direction.into();
            }
            if sequential {
                config.parallel = false;
            }
            cmd_extract(
                &input,
                &split,
                target_type.map(NodeType::from),
                &data_dir,
                &name,
                config,
                index,
            )
        }
        Commands::Inspect {
            data_dir,
            name,
            record,
        } => cmd_inspect(&data_dir, &name, record),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr);
    Registry::default().with(filter).with(fmt_layer).init();
}

fn load_graph(path: &Path) -> Result<GraphModel> {
    let start = Instant::now();
    let pb = ProgressBar::new_spinner();
    pb.set_message(format!("Loading {}...", path.display()));

    let graph = GraphModel::from_json_file(path)
        .with_context(|| format!("Failed to load graph {}", path.display()))?;

    pb.finish_with_message(format!("Loaded in {:.2?}", start.elapsed()));
    Ok(graph)
}

fn cmd_stats(input: &Path) -> Result<()> {
    let graph = load_graph(input)?;

    println!("Graph Statistics");
    println!("================");
    match &graph {
        GraphModel::Homogeneous(g) => {
            println!("Kind:           homogeneous");
            println!("Nodes:          {}", g.node_count());
            println!("Edges:          {}", g.edge_count());
        }
        GraphModel::Heterogeneous(hg) => {
            let stats = hg.stats();
            println!("Kind:           heterogeneous");
            println!("Nodes:          {}", stats.total_nodes);
            println!("Edges:          {}", stats.total_edges);
            println!("Node types:     {}", stats.num_node_types);
            for (name, count) in &stats.nodes_by_type {
                println!("  {:<20} {}", name, count);
            }
            println!("Edge types:     {}", stats.num_edge_types);
            for (name, count) in &stats.edges_by_type {
                println!("  {:<20} {}", name, count);
            }
        }
    }

    Ok(())
}

fn cmd_extract(
    input: &Path,
    split: &Path,
    target_type: Option<NodeType>,
    data_dir: &Path,
    name: &str,
    config: ExtractConfig,
    train_limit: Option<usize>,
) -> Result<()> {
    let mut split_index = SplitIndex::from_json_file(split)
        .with_context(|| format!("Failed to load split index {}", split.display()))?;
    if let Some(limit) = train_limit {
        split_index.truncate_train(limit);
    }
    info!(
        dataset = name,
        hops = config.hops,
        direction = ?config.direction,
        parallel = config.parallel,
        "extract"
    );

    let cache = DatasetCache::new(FsStore::new(data_dir), config);
    let dataset = match cache.decide(name) {
        CacheDecision::Load => load_dataset(&cache, name)?,
        CacheDecision::Build => {
            let graph = load_graph(input)?;
            let num_targets = match (&graph, &target_type) {
                (GraphModel::Homogeneous(g), _) => g.node_count(),
                (GraphModel::Heterogeneous(hg), Some(t)) => hg.num_nodes(t),
                (GraphModel::Heterogeneous(_), None) => {
                    bail!("--target-type is required for heterogeneous graphs")
                }
            };
            let targets: Vec<usize> = (0..num_targets).collect();

            let start = Instant::now();
            let pb = ProgressBar::new_spinner();
            pb.set_message(format!(
                "Extracting {}-hop subgraphs for {} targets...",
                config.hops, num_targets
            ));
            let dataset = cache
                .build_or_load(
                    &graph,
                    target_type.as_ref(),
                    &targets,
                    &split_index.label,
                    name,
                )
                .with_context(|| format!("Failed to build dataset '{}'", name))?;
            pb.finish_with_message(format!("Extracted in {:.2?}", start.elapsed()));
            dataset
        }
    };

    let parts = split_index
        .split(&dataset)
        .context("Split index does not match dataset")?;

    println!("Dataset:        {}", name);
    println!("Artifact:       {}", cache.store().path_for(name).display());
    println!("Records:        {}", dataset.len());
    println!("Train:          {}", parts.train.len());
    println!("Valid:          {}", parts.valid.len());
    println!("Test:           {}", parts.test.len());
    Ok(())
}

fn load_dataset(cache: &DatasetCache<FsStore>, name: &str) -> Result<Dataset> {
    let start = Instant::now();
    let pb = ProgressBar::new_spinner();
    pb.set_message(format!("Loading cached dataset '{}'...", name));

    let dataset = cache
        .load(name)
        .with_context(|| format!("Failed to load dataset '{}'", name))?;

    pb.finish_with_message(format!("Loaded in {:.2?}", start.elapsed()));
    Ok(dataset)
}

fn cmd_inspect(data_dir: &Path, name: &str, record: Option<usize>) -> Result<()> {
    let cache = DatasetCache::new(FsStore::new(data_dir), ExtractConfig::default());
    if cache.decide(name) == CacheDecision::Build {
        bail!(
            "No cached dataset '{}' at {}",
            name,
            cache.store().path_for(name).display()
        );
    }
    let dataset = load_dataset(&cache, name)?;

    let hops = dataset.iter().next().map_or(0, |r| r.subgraph.hops());
    let nodes: usize = dataset.iter().map(|r| r.subgraph.graph.node_count()).sum();
    let edges: usize = dataset.iter().map(|r| r.subgraph.graph.edge_count()).sum();
    let typed = dataset.iter().any(|r| r.typed_masks.is_some());

    println!("Dataset:        {}", name);
    println!("Records:        {}", dataset.len());
    println!("Hops:           {}", hops);
    println!("Typed masks:    {}", if typed { "yes" } else { "no" });
    if !dataset.is_empty() {
        let n = dataset.len() as f64;
        println!("Avg nodes:      {:.2}", nodes as f64 / n);
        println!("Avg edges:      {:.2}", edges as f64 / n);
    }

    if let Some(index) = record {
        let Some(r) = dataset.get(index) else {
            bail!("Record {} out of range ({} records)", index, dataset.len());
        };
        println!();
        println!(
            "Record {} (node {}, label {}): {} nodes, {} edges",
            index,
            r.node,
            r.label,
            r.subgraph.graph.node_count(),
            r.subgraph.graph.edge_count()
        );
        for hop in 0..r.subgraph.hops() {
            let edges: Vec<String> = r
                .subgraph
                .hop_edges(hop)
                .into_iter()
                .filter_map(|e| r.subgraph.graph.edge_endpoints(e))
                .map(|(s, d)| format!("{}->{}", s, d))
                .collect();
            println!("  hop {}: [{}]", hop, edges.join(", "));
        }
        if let Some(masks) = &r.typed_masks {
            for (edge_type, mask) in masks {
                println!("  {:<24} {:?}", edge_type.to_string(), mask.shape());
            }
        }
    }

    Ok(())
}
