//! Skein CLI
//!
//! Build an in-memory HNSW graph over a JSON vector file and query it.
//!
//! # Usage
//!
//! ```bash
//! # Build a graph and print its statistics
//! skein build --input vectors.json --m 16 --ef-construction 200
//!
//! # Top-10 nearest neighbors of one query
//! skein query --input vectors.json --query 0.1,0.2,0.3 -k 10
//!
//! # Recall@10 against brute force on 100 sampled queries
//! skein recall --input vectors.json --queries 100 -k 10 --ef 64
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

use skein::dataset::{brute_force_top_k, load_vectors, parse_query, recall};
use skein::{build_index, HnswConfig, Metric};

#[derive(Parser)]
#[command(name = "skein")]
#[command(about = "Approximate nearest-neighbor search over an in-memory HNSW graph")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Graph parameters shared by every command.
#[derive(Args, Debug, Clone)]
struct GraphArgs {
    /// JSON file holding an array of vectors
    #[arg(short, long)]
    input: PathBuf,

    /// Max links per node on levels above 0
    #[arg(long, default_value = "16")]
    m: u32,

    /// Max links per node on level 0 (defaults to 2 * m)
    #[arg(long)]
    m0: Option<u32>,

    /// Beam width while inserting
    #[arg(long, default_value = "200")]
    ef_construction: u32,

    /// Keep the nearest neighbors instead of the diversity heuristic
    #[arg(long)]
    simple: bool,

    /// Distance metric
    #[arg(long, value_enum, default_value_t = Metric::Euclidean)]
    distance: Metric,

    /// Seed for level assignment
    #[arg(long, default_value = "42")]
    seed: u64,
}

impl GraphArgs {
    fn config(&self) -> anyhow::Result<HnswConfig> {
        let m0 = self.m0.unwrap_or(self.m.saturating_mul(2));
        Ok(HnswConfig::new(
            m0,
            self.m,
            self.ef_construction,
            !self.simple,
        )?)
    }

    fn build(&self) -> anyhow::Result<(Arc<Vec<Vec<f32>>>, skein::HnswIndex)> {
        let config = self.config()?;
        tracing::info!("Reading vectors from {:?}", self.input);
        let vectors: Vec<Vec<f32>> = load_vectors(&self.input)?
            .into_iter()
            .map(|v| self.distance.prepare(v))
            .collect();
        let vectors = Arc::new(vectors);
        tracing::info!(
            "Found {} vectors of dimension {}",
            vectors.len(),
            vectors[0].len()
        );
        let index = build_index(Arc::clone(&vectors), config, self.distance, self.seed)?;
        Ok((vectors, index))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build a graph and print its statistics as JSON
    Build {
        #[command(flatten)]
        graph: GraphArgs,
    },

    /// Build a graph and print the nearest neighbors of a query as JSON
    Query {
        #[command(flatten)]
        graph: GraphArgs,

        /// Comma separated query vector
        #[arg(short, long)]
        query: String,

        /// Number of results
        #[arg(short, default_value = "10")]
        k: usize,

        /// Beam width at level 0
        #[arg(long, default_value = "64")]
        ef: usize,
    },

    /// Measure recall@k against exhaustive search
    Recall {
        #[command(flatten)]
        graph: GraphArgs,

        /// Number of input vectors sampled as queries
        #[arg(long, default_value = "100")]
        queries: usize,

        /// Number of results
        #[arg(short, default_value = "10")]
        k: usize,

        /// Beam width at level 0
        #[arg(long, default_value = "64")]
        ef: usize,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build { graph } => {
            let (_, index) = graph.build()?;
            let stats = index.stats();
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }

        Commands::Query {
            graph,
            query,
            k,
            ef,
        } => {
            let query = parse_query(&query)?;
            let (vectors, index) = graph.build()?;
            if query.len() != vectors[0].len() {
                anyhow::bail!(
                    "Query has dimension {}, expected {}",
                    query.len(),
                    vectors[0].len()
                );
            }
            let query = graph.distance.prepare(query);
            let start = Instant::now();
            let results = index.find_top_k(&query, k, ef);
            tracing::info!("Query time: {:.3}ms", start.elapsed().as_secs_f64() * 1e3);
            println!("{}", serde_json::to_string_pretty(&results)?);
        }

        Commands::Recall {
            graph,
            queries,
            k,
            ef,
        } => {
            let (vectors, index) = graph.build()?;
            let distance = graph.distance.distance_function();
            let mut rng = StdRng::seed_from_u64(graph.seed);
            let mut total = 0.0;
            let mut elapsed = 0.0;
            for _ in 0..queries {
                let query = &vectors[rng.gen_range(0..vectors.len())];
                let truth = brute_force_top_k(&vectors, query, k, distance.as_ref());
                let start = Instant::now();
                let found = index.find_top_k(query, k, ef);
                elapsed += start.elapsed().as_secs_f64();
                total += recall(&found, &truth);
            }
            let queries = queries.max(1) as f64;
            println!(
                "{}",
                serde_json::json!({
                    "k": k,
                    "ef": ef,
                    "queries": queries as usize,
                    "recall": total / queries,
                    "mean_query_ms": elapsed * 1e3 / queries,
                })
            );
        }
    }

    Ok(())
}
