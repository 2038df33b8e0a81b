//! Claim canonicalization: merge near-duplicate claims into one
//!
//! Claims of the same type whose statements reach the merge threshold are
//! unioned; each cluster collapses into its representative. Passes repeat
//! until nothing merges, so the output is a fixpoint and re-running on it
//! changes nothing.

use crate::disjoint_set::DisjointSet;
use crate::similarity::TermVector;
use crate::trace::{FailureKind, RunTrace, Stage};
use ledger_domain::{Claim, EvidenceId, Polarity};
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::debug;

/// Merges near-duplicate claims
#[derive(Debug, Clone, Copy)]
pub struct ClaimCanonicalizer {
    threshold: f64,
}

impl ClaimCanonicalizer {
    /// Create a canonicalizer with a cosine merge threshold
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Merge threshold
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Drop evidence ids that are not accepted cards, then claims left with none
    pub fn drop_unsupported(
        &self,
        claims: Vec<Claim>,
        accepted: &HashSet<EvidenceId>,
        trace: &mut RunTrace,
    ) -> Vec<Claim> {
        let mut kept = Vec::with_capacity(claims.len());
        for mut claim in claims {
            let before = claim.supported_by.len();
            let mut seen = HashSet::new();
            claim
                .supported_by
                .retain(|id| accepted.contains(id) && seen.insert(id.clone()));
            if claim.supported_by.len() < before {
                debug!(
                    "{} lost {} unknown or repeated evidence ids",
                    claim.id,
                    before - claim.supported_by.len()
                );
            }
            if claim.supported_by.is_empty() {
                trace.record(
                    Stage::Canonicalize,
                    FailureKind::InsufficientEvidence,
                    format!("{} cites no verified evidence: {}", claim.id, claim.statement),
                );
                continue;
            }
            kept.push(claim);
        }
        kept
    }

    /// Index pairs of same-type claims at or above the threshold
    pub fn similar_pairs(&self, claims: &[Claim]) -> Vec<(usize, usize)> {
        let vectors: Vec<TermVector> = claims
            .iter()
            .map(|c| TermVector::from_text(&c.statement))
            .collect();
        let mut pairs = Vec::new();
        for i in 0..claims.len() {
            for j in (i + 1)..claims.len() {
                if claims[i].claim_type == claims[j].claim_type
                    && vectors[i].cosine(&vectors[j]) >= self.threshold
                {
                    pairs.push((i, j));
                }
            }
        }
        pairs
    }

    /// Merge clusters until no same-type pair reaches the threshold
    pub fn canonicalize(&self, mut claims: Vec<Claim>, trace: &mut RunTrace) -> Vec<Claim> {
        let input_count = claims.len();
        let mut passes = 0;

        loop {
            let pairs = self.similar_pairs(&claims);
            if pairs.is_empty() {
                break;
            }
            passes += 1;

            let mut sets = DisjointSet::new(claims.len());
            for (i, j) in pairs {
                sets.union(i, j);
            }

            let mut slots: Vec<Option<Claim>> = claims.into_iter().map(Some).collect();
            claims = sets
                .groups()
                .into_iter()
                .filter_map(|group| {
                    let members: Vec<Claim> =
                        group.iter().filter_map(|&i| slots[i].take()).collect();
                    if members.len() > 1 {
                        let ids: Vec<&str> = members.iter().map(|c| c.id.as_str()).collect();
                        debug!("Merging claims {}", ids.join(", "));
                    }
                    let merged = merge_cluster(members)?;
                    if merged.supported_by.is_empty() {
                        trace.record(
                            Stage::Canonicalize,
                            FailureKind::InsufficientEvidence,
                            format!("merged claim {} has no evidence", merged.id),
                        );
                        return None;
                    }
                    Some(merged)
                })
                .collect();
        }

        trace.info(
            Stage::Canonicalize,
            format!(
                "{} candidate claims canonicalized into {} in {} merge passes",
                input_count,
                claims.len(),
                passes
            ),
        );
        claims
    }
}

/// Representative ordering: highest confidence, then longest statement,
/// then smallest id
fn representative_order(a: &Claim, b: &Claim) -> Ordering {
    b.confidence
        .cmp(&a.confidence)
        .then_with(|| b.statement.chars().count().cmp(&a.statement.chars().count()))
        .then_with(|| a.id.cmp(&b.id))
}

fn majority_polarity(members: &[Claim]) -> Polarity {
    let mut counts: Vec<(Polarity, usize)> = Vec::new();
    for member in members {
        match counts.iter_mut().find(|(p, _)| *p == member.polarity) {
            Some((_, n)) => *n += 1,
            None => counts.push((member.polarity, 1)),
        }
    }
    let top = counts.iter().map(|(_, n)| *n).max().unwrap_or(0);
    let mut leaders = counts.iter().filter(|(_, n)| *n == top);
    match (leaders.next(), leaders.next()) {
        (Some((polarity, _)), None) => *polarity,
        _ => Polarity::Mixed,
    }
}

/// Collapse one cluster, given in input order, into a single claim
///
/// Returns `None` for an empty cluster. A single member is returned as is.
pub fn merge_cluster(mut members: Vec<Claim>) -> Option<Claim> {
    if members.len() <= 1 {
        return members.pop();
    }

    let rep_index = (0..members.len())
        .min_by(|&a, &b| representative_order(&members[a], &members[b]))?;

    let mut supported_by: Vec<EvidenceId> = Vec::new();
    for member in &members {
        for id in &member.supported_by {
            if !supported_by.contains(id) {
                supported_by.push(id.clone());
            }
        }
    }

    let polarity = majority_polarity(&members);
    let confidence = members.iter().map(|c| c.confidence).max().unwrap_or(3);

    let rep = members[rep_index].clone();
    let mut aliases: Vec<String> = Vec::new();
    let mut push_alias = |text: &str| {
        if text != rep.statement && !aliases.iter().any(|a| a == text) {
            aliases.push(text.to_string());
        }
    };
    for alias in &rep.aliases {
        push_alias(alias);
    }
    for (i, member) in members.iter().enumerate() {
        if i == rep_index {
            continue;
        }
        push_alias(&member.statement);
        for alias in &member.aliases {
            push_alias(alias);
        }
    }

    Some(Claim {
        supported_by,
        polarity,
        confidence,
        aliases,
        ..rep
    })
}
