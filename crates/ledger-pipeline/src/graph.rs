//! Claim graph and contradiction resolution
//!
//! The graph is an arena of claims indexed by id plus a flat edge list. Only
//! `contradicts` edges drive grouping: each connected component of two or more
//! claims becomes a resolution group. `supports` and `refines` edges stay in
//! the graph for rendering.

use crate::disjoint_set::DisjointSet;
use crate::oracle_pool::{call_all, CallPolicy};
use crate::relations::claim_view;
use crate::trace::{FailureKind, RunTrace, Stage};
use ledger_domain::{
    Claim, ClaimId, Edge, EvidenceCard, EvidenceId, Relation, ResolutionGroup, ResolutionId,
    ResolutionStatus, SummaryOracle, SummaryRequest,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Claims plus the edges between them
#[derive(Debug, Clone, Default)]
pub struct ClaimGraph {
    claims: Vec<Claim>,
    index: HashMap<ClaimId, usize>,
    edges: Vec<Edge>,
}

impl ClaimGraph {
    /// Build the graph, dropping unusable edges
    ///
    /// Edges naming an unknown claim, self-edges, `unrelated` edges and
    /// repeats of an already-seen pair are traced and dropped.
    pub fn build(claims: Vec<Claim>, edges: Vec<Edge>, trace: &mut RunTrace) -> Self {
        let index: HashMap<ClaimId, usize> = claims
            .iter()
            .enumerate()
            .map(|(i, claim)| (claim.id.clone(), i))
            .collect();

        let mut kept = Vec::with_capacity(edges.len());
        let mut seen_pairs: HashSet<(usize, usize)> = HashSet::new();
        for edge in edges {
            let endpoints = (
                index.get(&edge.src_claim_id).copied(),
                index.get(&edge.dst_claim_id).copied(),
            );
            let reason = match endpoints {
                _ if edge.relation == Relation::Unrelated => Some("unrelated edges are not kept"),
                (None, _) | (_, None) => Some("edge names an unknown claim"),
                (Some(a), Some(b)) if a == b => Some("self-edge"),
                (Some(a), Some(b)) if !seen_pairs.insert((a.min(b), a.max(b))) => {
                    Some("pair already has an edge")
                }
                _ => None,
            };
            match reason {
                Some(reason) => trace.record(
                    Stage::Resolve,
                    FailureKind::Skip,
                    format!("dropped edge {} ({}): {}", edge.key(), edge.relation, reason),
                ),
                None => kept.push(edge),
            }
        }

        Self {
            claims,
            index,
            edges: kept,
        }
    }

    /// Claims in arena order
    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    /// Kept edges
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Look up a claim by id
    pub fn claim(&self, id: &ClaimId) -> Option<&Claim> {
        self.index.get(id).map(|&i| &self.claims[i])
    }

    /// Give back claims and edges
    pub fn into_parts(self) -> (Vec<Claim>, Vec<Edge>) {
        (self.claims, self.edges)
    }

    /// Contradiction components with two or more members
    ///
    /// Members are sorted by id; components are ordered by their smallest id.
    pub fn contradiction_components(&self) -> Vec<Vec<ClaimId>> {
        let mut sets = DisjointSet::new(self.claims.len());
        for edge in self.contradiction_edges() {
            if let (Some(&a), Some(&b)) = (
                self.index.get(&edge.src_claim_id),
                self.index.get(&edge.dst_claim_id),
            ) {
                sets.union(a, b);
            }
        }

        let mut components: Vec<Vec<ClaimId>> = sets
            .groups()
            .into_iter()
            .filter(|group| group.len() >= 2)
            .map(|group| {
                let mut ids: Vec<ClaimId> =
                    group.into_iter().map(|i| self.claims[i].id.clone()).collect();
                ids.sort();
                ids
            })
            .collect();
        components.sort_by(|a, b| a[0].cmp(&b[0]));
        components
    }

    fn contradiction_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges
            .iter()
            .filter(|e| e.relation == Relation::Contradicts)
    }

    /// Open resolution groups `R1..`, one per contradiction component
    pub fn resolve(&self, cards: &[EvidenceCard]) -> Vec<ResolutionGroup> {
        let weights: HashMap<&EvidenceId, f64> =
            cards.iter().map(|card| (&card.id, card.weight)).collect();

        let groups: Vec<ResolutionGroup> = self
            .contradiction_components()
            .into_iter()
            .enumerate()
            .map(|(n, members)| {
                let edge_keys = self
                    .contradiction_edges()
                    .filter(|e| members.contains(&e.src_claim_id))
                    .map(Edge::key)
                    .collect();
                let weight_by_claim: BTreeMap<ClaimId, f64> = members
                    .iter()
                    .map(|id| {
                        let total = self
                            .claim(id)
                            .map(|claim| {
                                claim
                                    .supported_by
                                    .iter()
                                    .filter_map(|e| weights.get(e))
                                    .sum::<f64>()
                            })
                            .unwrap_or(0.0);
                        (id.clone(), total)
                    })
                    .collect();

                let mut group = ResolutionGroup::open(ResolutionId::nth(n + 1), members, edge_keys);
                group.weight_by_claim = weight_by_claim;
                group
            })
            .collect();

        info!("{} contradiction groups", groups.len());
        groups
    }

    /// Summary request for one group
    pub fn summary_request(&self, group: &ResolutionGroup, cards: &[EvidenceCard]) -> SummaryRequest {
        let by_id: HashMap<EvidenceId, &EvidenceCard> =
            cards.iter().map(|card| (card.id.clone(), card)).collect();
        SummaryRequest {
            group_id: group.id.clone(),
            claims: group
                .member_claim_ids
                .iter()
                .filter_map(|id| self.claim(id))
                .map(|claim| claim_view(claim, &by_id))
                .collect(),
            rationales: self
                .contradiction_edges()
                .filter(|e| group.edge_keys.contains(&e.key()))
                .filter_map(|e| e.rationale.clone())
                .collect(),
            weight_by_claim: group.weight_by_claim.clone(),
        }
    }
}

/// Ask the summary oracle about each group
///
/// Without an oracle every group stays open. A group whose summary call fails
/// after all retries also stays open with no summary; the failure is traced.
pub async fn summarize_groups<S>(
    oracle: Option<Arc<S>>,
    graph: &ClaimGraph,
    cards: &[EvidenceCard],
    mut groups: Vec<ResolutionGroup>,
    policy: CallPolicy,
    trace: &mut RunTrace,
) -> Vec<ResolutionGroup>
where
    S: SummaryOracle + Send + Sync + 'static,
{
    if groups.is_empty() {
        return groups;
    }
    let Some(oracle) = oracle else {
        trace.record(
            Stage::Resolve,
            FailureKind::Skip,
            format!("no summary oracle; {} groups left open", groups.len()),
        );
        return groups;
    };

    let requests: Vec<SummaryRequest> = groups
        .iter()
        .map(|group| graph.summary_request(group, cards))
        .collect();
    let outcomes = call_all(requests, policy, move |request: &SummaryRequest| {
        oracle.summarize(request).map_err(|e| e.to_string())
    })
    .await;

    for (group, outcome) in groups.iter_mut().zip(outcomes) {
        match outcome.result {
            Ok(answer) => {
                debug!("{} summarized", group.id);
                group.status = ResolutionStatus::Noted;
                group.summary = Some(answer.summary);
                group.conditions = answer.conditions;
                group.leaning_claim_id = answer
                    .leaning_claim_id
                    .filter(|id| group.member_claim_ids.contains(id));
            }
            Err(e) => trace.record(
                Stage::Resolve,
                FailureKind::OracleFailure,
                format!(
                    "{} left open after {} attempts: {}",
                    group.id, outcome.attempts, e
                ),
            ),
        }
    }
    groups
}
