//! Confidence scoring and run-relative calibration
//!
//! Each claim gets four interpretable components, a weighted raw score in
//! [0, 1], and a 1-5 rating from its rank among the run's claims. The rating
//! is relative: the same claim can rate differently in another run.

use crate::config::{ScoringConfig, ScoringWeights};
use ledger_domain::{Claim, ClaimId, EvidenceCard, EvidenceId, ResolutionGroup, ScoreComponents};
use std::collections::{HashMap, HashSet};

/// Scores closer than this share a rank
const RANK_QUANTUM: f64 = 1e-8;

/// Thresholds below which a claim is flagged for more evidence
const WEAK_STRENGTH: f64 = 0.25;
const WEAK_DIVERSITY: f64 = 0.34;
const HEAVY_PENALTY: f64 = 0.2;

/// Saturating strength `1 − Π(1 − r)` of a set of card weights
pub fn evidence_strength(weights: impl IntoIterator<Item = f64>) -> f64 {
    let remaining: f64 = weights
        .into_iter()
        .map(|r| 1.0 - r.clamp(0.0, 1.0))
        .product();
    (1.0 - remaining).clamp(0.0, 1.0)
}

/// Source diversity `min(1, distinct / cap)`
pub fn diversity(distinct_sources: usize, cap: usize) -> f64 {
    if cap == 0 {
        return 1.0;
    }
    (distinct_sources as f64 / cap as f64).min(1.0)
}

/// Penalty for a claim in a contradiction group of `group_size`
///
/// `other_strengths` are the evidence strengths of the other members. Zero
/// outside a group.
pub fn contradiction_penalty(group_size: usize, other_strengths: &[f64]) -> f64 {
    if group_size < 2 {
        return 0.0;
    }
    let size = (group_size - 1) as f64 / group_size as f64;
    let opposing = evidence_strength(other_strengths.iter().copied());
    (size * (0.5 + 0.5 * opposing)).min(1.0)
}

/// Whether a claim's components call for more evidence
pub fn needs_more_evidence(components: &ScoreComponents) -> bool {
    components.evidence_strength < WEAK_STRENGTH
        || components.diversity < WEAK_DIVERSITY
        || components.contradiction_penalty >= HEAVY_PENALTY
}

/// Ratings 1-5 from each score's mean rank within the run
///
/// One score rates 3, as does a run where every score ties.
pub fn calibrate(scores: &[f64]) -> Vec<u8> {
    let n = scores.len();
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![3];
    }

    let keys: Vec<i64> = scores
        .iter()
        .map(|s| (s / RANK_QUANTUM).round() as i64)
        .collect();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|&i| keys[i]);

    let mut ranks = vec![0.0; n];
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && keys[order[end]] == keys[order[start]] {
            end += 1;
        }
        let mean_rank = (start + end - 1) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = mean_rank;
        }
        start = end;
    }

    ranks
        .into_iter()
        .map(|rank| {
            let pct = rank / (n - 1) as f64;
            (1.0 + 4.0 * pct + 1e-9).floor().clamp(1.0, 5.0) as u8
        })
        .collect()
}

/// Scores and calibrates canonical claims
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceScorer {
    weights: ScoringWeights,
    diversity_cap: usize,
}

impl ConfidenceScorer {
    /// Create a scorer from configuration
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            weights: config.weights(),
            diversity_cap: config.diversity_cap,
        }
    }

    /// Resolved weights
    pub fn weights(&self) -> ScoringWeights {
        self.weights
    }

    /// Weighted raw score, clamped to [0, 1]
    pub fn raw_score(&self, c: &ScoreComponents) -> f64 {
        let w = &self.weights;
        (w.evidence * c.evidence_strength + w.diversity * c.diversity
            + w.verification * c.verification_ratio
            - w.contradiction * c.contradiction_penalty)
            .clamp(0.0, 1.0)
    }

    /// Score every claim in place and assign calibrated ratings
    pub fn score(&self, claims: &mut [Claim], cards: &[EvidenceCard], groups: &[ResolutionGroup]) {
        let by_id: HashMap<&EvidenceId, &EvidenceCard> =
            cards.iter().map(|card| (&card.id, card)).collect();

        let strengths: HashMap<ClaimId, f64> = claims
            .iter()
            .map(|claim| {
                let strength = evidence_strength(
                    claim
                        .supported_by
                        .iter()
                        .filter_map(|id| by_id.get(id))
                        .map(|card| card.weight),
                );
                (claim.id.clone(), strength)
            })
            .collect();

        for claim in claims.iter_mut() {
            let claim_cards: Vec<&EvidenceCard> = claim
                .supported_by
                .iter()
                .filter_map(|id| by_id.get(id).copied())
                .collect();
            let distinct_sources: HashSet<_> = claim_cards.iter().map(|c| &c.source_id).collect();
            let verification_ratio = if claim_cards.is_empty() {
                0.0
            } else {
                claim_cards.iter().filter(|c| c.verified).count() as f64 / claim_cards.len() as f64
            };

            let penalty = groups
                .iter()
                .find(|group| group.contains(&claim.id))
                .map(|group| {
                    let others: Vec<f64> = group
                        .member_claim_ids
                        .iter()
                        .filter(|id| **id != claim.id)
                        .map(|id| strengths.get(id).copied().unwrap_or(0.0))
                        .collect();
                    contradiction_penalty(group.member_claim_ids.len(), &others)
                })
                .unwrap_or(0.0);

            let components = ScoreComponents {
                evidence_strength: strengths.get(&claim.id).copied().unwrap_or(0.0),
                diversity: diversity(distinct_sources.len(), self.diversity_cap),
                verification_ratio,
                contradiction_penalty: penalty,
            };
            claim.raw_score = self.raw_score(&components);
            claim.needs_more_evidence = needs_more_evidence(&components);
            claim.components = Some(components);
        }

        let raw: Vec<f64> = claims.iter().map(|c| c.raw_score).collect();
        for (claim, rating) in claims.iter_mut().zip(calibrate(&raw)) {
            claim.confidence = rating;
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn rating_monotonic_in_score(
            scores in prop::collection::vec(0.0f64..1.0, 2..12),
            pick in any::<prop::sample::Index>(),
            bump in 0.0f64..0.5,
        ) {
            let i = pick.index(scores.len());
            let before = calibrate(&scores)[i];
            let mut raised = scores.clone();
            raised[i] = (raised[i] + bump).min(1.0);
            let after = calibrate(&raised)[i];
            prop_assert!(after >= before);
        }

        #[test]
        fn rating_monotonic_in_strength(
            others in prop::collection::vec((0.0f64..1.0, 0.0f64..1.0, 0.0f64..1.0), 1..8),
            strength in 0.0f64..1.0,
            bump in 0.0f64..0.5,
            diversity in 0.0f64..1.0,
            penalty in 0.0f64..1.0,
        ) {
            let scorer = ConfidenceScorer::new(&ScoringConfig::default());
            let component = |s: f64| ScoreComponents {
                evidence_strength: s,
                diversity,
                verification_ratio: 1.0,
                contradiction_penalty: penalty,
            };
            let rest: Vec<f64> = others
                .iter()
                .map(|&(s, d, p)| scorer.raw_score(&ScoreComponents {
                    evidence_strength: s,
                    diversity: d,
                    verification_ratio: 1.0,
                    contradiction_penalty: p,
                }))
                .collect();

            let mut low = rest.clone();
            low.push(scorer.raw_score(&component(strength)));
            let mut high = rest;
            high.push(scorer.raw_score(&component((strength + bump).min(1.0))));

            let n = low.len() - 1;
            prop_assert!(calibrate(&high)[n] >= calibrate(&low)[n]);
        }

        #[test]
        fn ratings_in_range(scores in prop::collection::vec(0.0f64..1.0, 0..20)) {
            let ratings = calibrate(&scores);
            prop_assert_eq!(ratings.len(), scores.len());
            prop_assert!(ratings.iter().all(|r| (1..=5).contains(r)));
        }

        #[test]
        fn penalty_never_raises_score(
            strength in 0.0f64..1.0,
            diversity in 0.0f64..1.0,
            penalty in 0.0f64..1.0,
        ) {
            let scorer = ConfidenceScorer::new(&ScoringConfig::default());
            let free = ScoreComponents {
                evidence_strength: strength,
                diversity,
                verification_ratio: 1.0,
                contradiction_penalty: 0.0,
            };
            let grouped = ScoreComponents { contradiction_penalty: penalty, ..free };
            prop_assert!(scorer.raw_score(&grouped) <= scorer.raw_score(&free));
        }
    }
}
