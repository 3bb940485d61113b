//! Vector datasets: JSON loading, synthetic data and brute-force ground truth.

use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{bail, Context};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use skein_core::{DistanceFunction, Neighbor};

/// Read a JSON array of equally sized vectors, e.g. `[[0.1, 0.2], [0.3, 0.4]]`.
pub fn load_vectors(path: &Path) -> anyhow::Result<Vec<Vec<f32>>> {
    let file = File::open(path).with_context(|| format!("opening {:?}", path))?;
    let vectors: Vec<Vec<f32>> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {:?}", path))?;
    validate_dimensions(&vectors)?;
    Ok(vectors)
}

/// Dimension shared by all vectors. Fails on empty or ragged input.
pub fn validate_dimensions(vectors: &[Vec<f32>]) -> anyhow::Result<usize> {
    let Some(first) = vectors.first() else {
        bail!("No vectors found in input");
    };
    let dim = first.len();
    if dim == 0 {
        bail!("Vectors must have at least one dimension");
    }
    for (i, vector) in vectors.iter().enumerate() {
        if vector.len() != dim {
            bail!("Vector {} has dimension {}, expected {}", i, vector.len(), dim);
        }
    }
    Ok(dim)
}

/// Parse a comma separated query such as `0.1,0.2,0.3`.
pub fn parse_query(text: &str) -> anyhow::Result<Vec<f32>> {
    text.split(',')
        .map(|part| {
            part.trim()
                .parse::<f32>()
                .with_context(|| format!("invalid query component {:?}", part))
        })
        .collect()
}

/// `n` vectors with components uniform in `[-0.5, 0.5)`.
pub fn random_vectors(n: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| (0..dim).map(|_| rng.gen::<f32>() - 0.5).collect())
        .collect()
}

/// Exact `k` nearest neighbors by exhaustive scan, nearest first.
pub fn brute_force_top_k(
    vectors: &[Vec<f32>],
    query: &[f32],
    k: usize,
    distance: &dyn DistanceFunction,
) -> Vec<Neighbor> {
    let mut all: Vec<Neighbor> = vectors
        .iter()
        .enumerate()
        .map(|(docid, vector)| Neighbor {
            docid: docid as u32,
            distance: distance.calc(query, vector),
        })
        .collect();
    all.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.docid.cmp(&b.docid)));
    all.truncate(k);
    all
}

/// Fraction of `truth` present in `found`. An empty `truth` counts as 1.0.
pub fn recall(found: &[Neighbor], truth: &[Neighbor]) -> f64 {
    if truth.is_empty() {
        return 1.0;
    }
    let found: HashSet<u32> = found.iter().map(|n| n.docid).collect();
    let hits = truth.iter().filter(|n| found.contains(&n.docid)).count();
    hits as f64 / truth.len() as f64
}
