//! Maximal marginal relevance selection

use super::embedding::cosine_similarity;

/// Pick up to `k` candidate indices balancing relevance against diversity.
///
/// `lambda = 1.0` is pure relevance, `lambda = 0.0` pure diversity. The first
/// pick is always the candidate closest to the query. Ties keep the earlier
/// candidate.
pub fn maximal_marginal_relevance(
    query: &[f32],
    candidates: &[Vec<f32>],
    k: usize,
    lambda: f32,
) -> Vec<usize> {
    let limit = k.min(candidates.len());
    if limit == 0 {
        return Vec::new();
    }

    let relevance: Vec<f32> = candidates
        .iter()
        .map(|c| cosine_similarity(query, c))
        .collect();

    let mut selected: Vec<usize> = Vec::with_capacity(limit);
    // Highest similarity to any selected candidate, per candidate
    let mut redundancy = vec![f32::NEG_INFINITY; candidates.len()];
    let mut taken = vec![false; candidates.len()];

    let first = argmax(relevance.iter().copied().enumerate());
    push(first, candidates, &mut selected, &mut taken, &mut redundancy);

    while selected.len() < limit {
        let scores = (0..candidates.len()).filter(|&i| !taken[i]).map(|i| {
            let score = lambda * relevance[i] - (1.0 - lambda) * redundancy[i];
            (i, score)
        });
        let next = argmax(scores);
        push(next, candidates, &mut selected, &mut taken, &mut redundancy);
    }

    selected
}

fn push(
    index: usize,
    candidates: &[Vec<f32>],
    selected: &mut Vec<usize>,
    taken: &mut [bool],
    redundancy: &mut [f32],
) {
    selected.push(index);
    taken[index] = true;
    for (i, candidate) in candidates.iter().enumerate() {
        if !taken[i] {
            let sim = cosine_similarity(candidate, &candidates[index]);
            if sim > redundancy[i] {
                redundancy[i] = sim;
            }
        }
    }
}

/// Index of the first maximum; NaN scores never win
fn argmax(scores: impl Iterator<Item = (usize, f32)>) -> usize {
    let mut best = None;
    let mut best_score = f32::NEG_INFINITY;
    for (i, score) in scores {
        if best.is_none() || score > best_score {
            best = Some(i);
            best_score = if score.is_nan() { f32::NEG_INFINITY } else { score };
        }
    }
    best.unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(angle_deg: f32) -> Vec<f32> {
        let r = angle_deg.to_radians();
        vec![r.cos(), r.sin()]
    }

    #[test]
    fn test_empty_inputs() {
        assert!(maximal_marginal_relevance(&unit(0.0), &[], 3, 0.5).is_empty());
        assert!(maximal_marginal_relevance(&unit(0.0), &[unit(0.0)], 0, 0.5).is_empty());
    }

    #[test]
    fn test_pure_relevance_is_nearest_order() {
        let candidates = vec![unit(40.0), unit(5.0), unit(20.0), unit(6.0)];
        let picked = maximal_marginal_relevance(&unit(0.0), &candidates, 4, 1.0);
        assert_eq!(picked, vec![1, 3, 2, 0]);
    }

    #[test]
    fn test_diversity_skips_near_duplicates() {
        // two near-identical close hits and one further but distinct hit
        let candidates = vec![unit(10.0), unit(10.5), unit(-35.0)];
        let naive = maximal_marginal_relevance(&unit(0.0), &candidates, 2, 1.0);
        assert_eq!(naive, vec![0, 1]);

        let diverse = maximal_marginal_relevance(&unit(0.0), &candidates, 2, 0.5);
        assert_eq!(diverse, vec![0, 2]);
    }

    #[test]
    fn test_k_larger_than_pool() {
        let candidates = vec![unit(1.0), unit(2.0)];
        let picked = maximal_marginal_relevance(&unit(0.0), &candidates, 10, 0.5);
        assert_eq!(picked.len(), 2);
        assert_eq!(picked[0], 0);
    }

    #[test]
    fn test_no_duplicate_picks() {
        let candidates: Vec<_> = (0..8).map(|i| unit(i as f32 * 3.0)).collect();
        let mut picked = maximal_marginal_relevance(&unit(0.0), &candidates, 8, 0.3);
        picked.sort();
        picked.dedup();
        assert_eq!(picked.len(), 8);
    }
}
