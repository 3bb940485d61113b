//! Neighbor selection policies.
//!
//! Both policies look at candidates in ascending distance order and keep
//! discovery order for equal distances. Whatever a policy does not keep is
//! reported back in [`SelectResult::unused`] so the caller can drop the
//! matching back-links.

use super::candidate::HnswCandidate;

/// Outcome of neighbor selection.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct SelectResult {
    /// Kept candidates, nearest first.
    pub used: Vec<HnswCandidate>,
    /// Docids of discarded candidates.
    pub unused: Vec<u32>,
}

fn sorted_by_distance(candidates: &[HnswCandidate]) -> Vec<HnswCandidate> {
    let mut sorted = candidates.to_vec();
    // sort_by is stable: equal distances stay in discovery order.
    sorted.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    sorted
}

/// Keep the `max_links` nearest candidates.
pub(crate) fn select_neighbors_simple(
    candidates: &[HnswCandidate],
    max_links: usize,
) -> SelectResult {
    let mut sorted = sorted_by_distance(candidates);
    let unused = if sorted.len() > max_links {
        sorted.split_off(max_links).into_iter().map(|c| c.docid).collect()
    } else {
        Vec::new()
    };
    SelectResult {
        used: sorted,
        unused,
    }
}

/// Keep up to `max_links` candidates that no already kept candidate
/// dominates.
///
/// A candidate is dominated when some kept neighbor is strictly closer to it
/// than the candidate is to the node being linked. Dominated candidates are
/// reachable through that neighbor already. Unlike the classic variant, the
/// result is not topped up with discarded candidates.
pub(crate) fn select_neighbors_heuristic<F>(
    candidates: &[HnswCandidate],
    max_links: usize,
    distance: F,
) -> SelectResult
where
    F: Fn(u32, u32) -> f64,
{
    let mut result = SelectResult::default();
    for candidate in sorted_by_distance(candidates) {
        if result.used.len() >= max_links || have_closer_distance(&candidate, &result.used, &distance)
        {
            result.unused.push(candidate.docid);
        } else {
            result.used.push(candidate);
        }
    }
    result
}

/// True if any of `kept` is strictly closer to `candidate` than
/// `candidate.distance`.
pub(crate) fn have_closer_distance<F>(
    candidate: &HnswCandidate,
    kept: &[HnswCandidate],
    distance: &F,
) -> bool
where
    F: Fn(u32, u32) -> f64,
{
    kept.iter()
        .any(|neighbor| distance(candidate.docid, neighbor.docid) < candidate.distance)
}
