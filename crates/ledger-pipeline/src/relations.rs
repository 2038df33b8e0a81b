//! Relation oracle adapter: pairwise labels into typed edges
//!
//! Pairs are chosen deterministically, labelled concurrently, and turned into
//! edges in pair order. A pair whose oracle keeps failing, or keeps citing
//! evidence that belongs to neither claim, is treated as unrelated and traced.

use crate::oracle_pool::{call_all, CallPolicy};
use crate::trace::{FailureKind, RunTrace, Stage};
use ledger_domain::{
    Claim, ClaimView, Edge, EvidenceCard, EvidenceId, EvidenceSnippet, Relation, RelationAnswer,
    RelationOracle, RelationRequest,
};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, info};

const CONDITIONAL_MARKERS: &[&str] = &["when", "if", "unless", "only"];

/// Edges produced by one relation stage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationOutcome {
    /// Typed edges, `unrelated` excluded, in pair order
    pub edges: Vec<Edge>,
    /// Pairs sent to the oracle
    pub evaluated_pairs: usize,
    /// Pairs that failed after all retries
    pub failures: usize,
}

/// Index pairs to compare
///
/// All unordered pairs while the set has at most `pair_cap` claims, otherwise
/// only pairs sharing a claim type.
pub fn candidate_pairs(claims: &[Claim], pair_cap: usize) -> Vec<(usize, usize)> {
    let same_type_only = claims.len() > pair_cap;
    let mut pairs = Vec::new();
    for i in 0..claims.len() {
        for j in (i + 1)..claims.len() {
            if !same_type_only || claims[i].claim_type == claims[j].claim_type {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

/// Present a claim with its snippets
pub fn claim_view(claim: &Claim, cards: &HashMap<EvidenceId, &EvidenceCard>) -> ClaimView {
    ClaimView {
        id: claim.id.clone(),
        claim_type: claim.claim_type,
        statement: claim.statement.clone(),
        polarity: claim.polarity,
        evidence: claim
            .supported_by
            .iter()
            .filter_map(|id| cards.get(id))
            .map(|card| EvidenceSnippet {
                id: card.id.clone(),
                snippet: card.snippet.clone(),
            })
            .collect(),
    }
}

/// Reject answers citing evidence outside the pair
pub fn check_answer(request: &RelationRequest, answer: &RelationAnswer) -> Result<(), String> {
    match answer
        .evidence_ids
        .iter()
        .find(|id| !request.first.cites(id) && !request.second.cites(id))
    {
        Some(stray) => Err(format!(
            "answer cites {} which belongs to neither {} nor {}",
            stray, request.first.id, request.second.id
        )),
        None => Ok(()),
    }
}

/// Edge for an answer; `unrelated` yields none
pub fn edge_from_answer(request: &RelationRequest, answer: RelationAnswer) -> Option<Edge> {
    if answer.relation == Relation::Unrelated {
        return None;
    }
    Some(Edge::new(
        request.first.id.clone(),
        request.second.id.clone(),
        answer.relation,
        answer.rationale,
        answer.evidence_ids,
    ))
}

/// Label every candidate pair and collect the resulting edges
pub async fn evaluate_relations<O>(
    oracle: Arc<O>,
    claims: &[Claim],
    cards: &[EvidenceCard],
    pair_cap: usize,
    policy: CallPolicy,
    trace: &mut RunTrace,
) -> RelationOutcome
where
    O: RelationOracle + Send + Sync + 'static,
{
    let by_id: HashMap<EvidenceId, &EvidenceCard> =
        cards.iter().map(|card| (card.id.clone(), card)).collect();
    let views: Vec<ClaimView> = claims.iter().map(|c| claim_view(c, &by_id)).collect();
    let requests: Vec<RelationRequest> = candidate_pairs(claims, pair_cap)
        .into_iter()
        .map(|(i, j)| RelationRequest {
            first: views[i].clone(),
            second: views[j].clone(),
        })
        .collect();

    info!(
        "Labelling {} claim pairs (cap {}, {} claims)",
        requests.len(),
        pair_cap,
        claims.len()
    );

    let outcomes = call_all(requests.clone(), policy, move |request: &RelationRequest| {
        let answer = oracle.relate(request).map_err(|e| e.to_string())?;
        check_answer(request, &answer)?;
        Ok(answer)
    })
    .await;

    let mut result = RelationOutcome {
        evaluated_pairs: requests.len(),
        ..RelationOutcome::default()
    };
    for (request, outcome) in requests.iter().zip(outcomes) {
        match outcome.result {
            Ok(answer) => {
                debug!(
                    "{} / {}: {}",
                    request.first.id, request.second.id, answer.relation
                );
                if let Some(edge) = edge_from_answer(request, answer) {
                    result.edges.push(edge);
                }
            }
            Err(e) => {
                result.failures += 1;
                trace.record(
                    Stage::Relations,
                    FailureKind::OracleFailure,
                    format!(
                        "{} / {} treated as unrelated after {} attempts: {}",
                        request.first.id, request.second.id, outcome.attempts, e
                    ),
                );
            }
        }
    }

    trace.info(
        Stage::Relations,
        format!(
            "{} pairs labelled, {} edges, {} failures",
            result.evaluated_pairs,
            result.edges.len(),
            result.failures
        ),
    );
    result
}

/// Offline relation oracle working from polarity and wording alone
///
/// Opposite pro/con stances contradict; a conditional marker in either
/// statement refines; anything else is unrelated.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicRelationOracle;

fn has_conditional_marker(statement: &str) -> bool {
    statement
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| {
            CONDITIONAL_MARKERS
                .iter()
                .any(|marker| word.eq_ignore_ascii_case(marker))
        })
}

impl RelationOracle for HeuristicRelationOracle {
    type Error = Infallible;

    fn relate(&self, request: &RelationRequest) -> Result<RelationAnswer, Self::Error> {
        let (a, b) = (&request.first, &request.second);
        if a.polarity.opposes(b.polarity) {
            return Ok(RelationAnswer {
                relation: Relation::Contradicts,
                rationale: Some(format!(
                    "{} is {} while {} is {}",
                    a.id,
                    a.polarity,
                    b.id,
                    b.polarity
                )),
                evidence_ids: Vec::new(),
            });
        }
        if has_conditional_marker(&a.statement) || has_conditional_marker(&b.statement) {
            return Ok(RelationAnswer {
                relation: Relation::Refines,
                rationale: Some("one statement holds only under a condition".to_string()),
                evidence_ids: Vec::new(),
            });
        }
        Ok(RelationAnswer::unrelated())
    }
}
