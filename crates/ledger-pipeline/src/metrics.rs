//! Run metrics
//!
//! Calibration error is measured against a self-consistency proxy, not ground
//! truth: a claim counts as "correct" when it cites at least two cards and no
//! contradiction touches it.

use ledger_domain::{Claim, Edge, Relation, ResolutionGroup, RunMetrics};

/// Claims with a raw score below this count as weakly evidenced
pub const WEAK_SCORE: f64 = 0.4;

/// Label recorded alongside ECE and Brier
pub const CALIBRATION_LABEL: &str = "proxy_self_consistency";

const ECE_BINS: usize = 10;

/// Counts gathered by earlier stages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageCounts {
    /// Sources created
    pub sources: usize,
    /// Cards accepted
    pub evidence: usize,
    /// Snippets rejected by verification
    pub rejected_evidence: usize,
    /// Claim pairs sent to the relation oracle
    pub evaluated_pairs: usize,
    /// Oracle calls that failed after all retries
    pub oracle_failures: usize,
}

fn proxy_labels(claims: &[Claim], groups: &[ResolutionGroup]) -> Vec<f64> {
    claims
        .iter()
        .map(|claim| {
            let consistent =
                claim.supported_by.len() >= 2 && !groups.iter().any(|g| g.contains(&claim.id));
            if consistent {
                1.0
            } else {
                0.0
            }
        })
        .collect()
}

/// Mean squared error between predictions and 0/1 labels
pub fn brier_score(probs: &[f64], labels: &[f64]) -> f64 {
    if probs.is_empty() {
        return 0.0;
    }
    probs
        .iter()
        .zip(labels)
        .map(|(p, y)| (p - y) * (p - y))
        .sum::<f64>()
        / probs.len() as f64
}

/// Expected calibration error over equal-width bins
///
/// Bin `b` holds predictions in `[b/bins, (b+1)/bins)`; the last bin also
/// takes 1.0.
pub fn expected_calibration_error(probs: &[f64], labels: &[f64], bins: usize) -> f64 {
    if probs.is_empty() || bins == 0 {
        return 0.0;
    }
    let n = probs.len() as f64;
    let mut ece = 0.0;
    for b in 0..bins {
        let low = b as f64 / bins as f64;
        let high = (b + 1) as f64 / bins as f64;
        let members: Vec<usize> = probs
            .iter()
            .enumerate()
            .filter(|(_, &p)| (low <= p && p < high) || (b == bins - 1 && p >= 1.0))
            .map(|(i, _)| i)
            .collect();
        if members.is_empty() {
            continue;
        }
        let count = members.len() as f64;
        let accuracy = members.iter().map(|&i| labels[i]).sum::<f64>() / count;
        let confidence = members.iter().map(|&i| probs[i]).sum::<f64>() / count;
        ece += (count / n) * (accuracy - confidence).abs();
    }
    ece
}

/// Compute the metrics block of a ledger
pub fn compute_metrics(
    claims: &[Claim],
    edges: &[Edge],
    groups: &[ResolutionGroup],
    counts: StageCounts,
) -> RunMetrics {
    let total = claims.len();
    let rate = |n: usize, of: usize| if of == 0 { 0.0 } else { n as f64 / of as f64 };

    let mut metrics = RunMetrics {
        supported_claim_rate: rate(
            claims.iter().filter(|c| !c.supported_by.is_empty()).count(),
            total,
        ),
        contradiction_density: rate(
            edges
                .iter()
                .filter(|e| e.relation == Relation::Contradicts)
                .count(),
            counts.evaluated_pairs,
        ),
        weak_evidence_rate: rate(
            claims.iter().filter(|c| c.raw_score < WEAK_SCORE).count(),
            total,
        ),
        avg_raw_score: if total == 0 {
            0.0
        } else {
            claims.iter().map(|c| c.raw_score).sum::<f64>() / total as f64
        },
        calibration_label: CALIBRATION_LABEL.to_string(),
        source_count: counts.sources,
        evidence_count: counts.evidence,
        rejected_evidence: counts.rejected_evidence,
        evaluated_pairs: counts.evaluated_pairs,
        oracle_failures: counts.oracle_failures,
        resolution_count: groups.len(),
        ..RunMetrics::default()
    };

    for claim in claims {
        *metrics
            .claim_type_coverage
            .entry(claim.claim_type.as_str().to_string())
            .or_insert(0) += 1;
        *metrics
            .confidence_distribution
            .entry(claim.confidence)
            .or_insert(0) += 1;
    }

    let probs: Vec<f64> = claims.iter().map(|c| c.raw_score.clamp(0.0, 1.0)).collect();
    let labels = proxy_labels(claims, groups);
    metrics.ece = expected_calibration_error(&probs, &labels, ECE_BINS);
    metrics.brier = brier_score(&probs, &labels);
    metrics
}
