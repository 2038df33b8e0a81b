//! Ledger assembly: the end-to-end run
//!
//! Stages run strictly in order, each consuming the complete output of the
//! previous one. Only oracle calls suspend; everything else is a
//! deterministic transform of the stage inputs.

use crate::canonicalize::ClaimCanonicalizer;
use crate::graph::{summarize_groups, ClaimGraph};
use crate::input::{Document, RunInput};
use crate::metrics::{compute_metrics, StageCounts};
use crate::oracle_pool::{call_all, CallPolicy};
use crate::relations::evaluate_relations;
use crate::scoring::ConfidenceScorer;
use crate::trace::{FailureKind, RunTrace, Stage};
use crate::{PipelineConfig, PipelineError};
use ledger_domain::{
    CandidateClaim, Claim, ClaimId, ClaimType, EvidenceCard, EvidenceId, ExtractionOracle,
    ExtractionRequest, InvariantViolation, Ledger, Polarity, RelationOracle, RunId, Source,
    SourceId, SummaryAnswer, SummaryOracle, SummaryRequest, LEDGER_VERSION,
};
use ledger_gatekeeper::{
    canonicalize_url, dedupe_search_results, infer_source_type, normalize_text, EvidenceVerifier,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Summary oracle used when none is configured
///
/// The pipeline never calls it; groups stay open.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSummaryOracle;

impl SummaryOracle for NoSummaryOracle {
    type Error = String;

    fn summarize(&self, request: &SummaryRequest) -> Result<SummaryAnswer, String> {
        Err(format!("no summary oracle configured for {}", request.group_id))
    }
}

/// Ledger plus the trace of the run that produced it
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Validated ledger
    pub ledger: Ledger,
    /// Stage events
    pub trace: RunTrace,
}

/// Evidence stage result
struct EvidenceOutcome {
    cards: Vec<EvidenceCard>,
    rejected: usize,
    failures: usize,
}

/// The end-to-end pipeline over injected oracles
pub struct Pipeline<E, R, S = NoSummaryOracle> {
    config: PipelineConfig,
    extraction: Arc<E>,
    relations: Arc<R>,
    summaries: Option<Arc<S>>,
}

impl<E, R> Pipeline<E, R, NoSummaryOracle>
where
    E: ExtractionOracle + Send + Sync + 'static,
    R: RelationOracle + Send + Sync + 'static,
{
    /// Create a pipeline without a summary oracle
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the configuration is invalid.
    pub fn new(config: PipelineConfig, extraction: E, relations: R) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            config,
            extraction: Arc::new(extraction),
            relations: Arc::new(relations),
            summaries: None,
        })
    }
}

impl<E, R, S> Pipeline<E, R, S>
where
    E: ExtractionOracle + Send + Sync + 'static,
    R: RelationOracle + Send + Sync + 'static,
    S: SummaryOracle + Send + Sync + 'static,
{
    /// Use `oracle` to summarize contradiction groups
    pub fn with_summaries<T>(self, oracle: T) -> Pipeline<E, R, T>
    where
        T: SummaryOracle + Send + Sync + 'static,
    {
        Pipeline {
            config: self.config,
            extraction: self.extraction,
            relations: self.relations,
            summaries: Some(Arc::new(oracle)),
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage and assemble a validated ledger
    ///
    /// # Errors
    ///
    /// - [`PipelineError::ZeroUsableEvidence`] if no snippet verifies
    /// - [`PipelineError::InvariantViolation`] if the assembled ledger is inconsistent
    pub async fn run(&self, input: RunInput) -> Result<RunOutput, PipelineError> {
        let mut trace = RunTrace::new();
        let run_id = RunId::new();
        let policy = CallPolicy::from_config(&self.config);
        info!("Starting run {}: {}", run_id, input.prompt);

        // Sources
        let sources = self.build_sources(&input, &mut trace);

        // Evidence
        let texts = index_documents(&input.documents, &mut trace);
        let evidence = self
            .gather_evidence(&input.prompt, &sources, &texts, policy, &mut trace)
            .await;
        if evidence.cards.is_empty() {
            trace.record(
                Stage::Evidence,
                FailureKind::InsufficientEvidence,
                format!(
                    "no usable evidence from {} sources ({} snippets rejected)",
                    sources.len(),
                    evidence.rejected
                ),
            );
            return Err(PipelineError::ZeroUsableEvidence);
        }
        let cards = evidence.cards;

        // Claims
        let (candidates, claim_failures) = self
            .propose_claims(&input.prompt, &cards, policy, &mut trace)
            .await;
        let claims = number_candidates(candidates, &mut trace);

        // Canonicalization
        let canonicalizer = ClaimCanonicalizer::new(self.config.merge_threshold);
        let accepted: HashSet<EvidenceId> = cards.iter().map(|c| c.id.clone()).collect();
        let claims = canonicalizer.drop_unsupported(claims, &accepted, &mut trace);
        let claims = canonicalizer.canonicalize(claims, &mut trace);

        // Relations
        let relations = evaluate_relations(
            Arc::clone(&self.relations),
            &claims,
            &cards,
            self.config.contradiction_pair_cap,
            policy,
            &mut trace,
        )
        .await;

        // Graph and resolution
        let graph = ClaimGraph::build(claims, relations.edges, &mut trace);
        let groups = graph.resolve(&cards);
        let failures_before = trace.count(FailureKind::OracleFailure);
        let groups = if self.config.summarize_resolutions {
            summarize_groups(self.summaries.clone(), &graph, &cards, groups, policy, &mut trace)
                .await
        } else {
            if !groups.is_empty() {
                trace.record(
                    Stage::Resolve,
                    FailureKind::Skip,
                    format!("summaries disabled; {} groups left open", groups.len()),
                );
            }
            groups
        };
        let summary_failures = trace.count(FailureKind::OracleFailure) - failures_before;
        let (mut claims, edges) = graph.into_parts();

        // Scoring
        ConfidenceScorer::new(&self.config.scoring).score(&mut claims, &cards, &groups);
        trace.info(
            Stage::Scoring,
            format!(
                "{} claims scored, {} flagged for more evidence",
                claims.len(),
                claims.iter().filter(|c| c.needs_more_evidence).count()
            ),
        );

        // Metrics and assembly
        let metrics = compute_metrics(
            &claims,
            &edges,
            &groups,
            StageCounts {
                sources: sources.len(),
                evidence: cards.len(),
                rejected_evidence: evidence.rejected,
                evaluated_pairs: relations.evaluated_pairs,
                oracle_failures: evidence.failures
                    + claim_failures
                    + relations.failures
                    + summary_failures,
            },
        );

        let ledger = Ledger {
            run_id,
            prompt: input.prompt,
            plan: input.plan,
            sources,
            evidence: cards,
            claims,
            edges,
            resolutions: groups,
            metrics,
            created_at: chrono::Utc::now().to_rfc3339(),
            version: LEDGER_VERSION.to_string(),
        };

        let mut violations = ledger.validate().err().unwrap_or_default();
        violations.extend(
            canonicalizer
                .similar_pairs(&ledger.claims)
                .into_iter()
                .map(|(i, j)| InvariantViolation::NearDuplicateClaims {
                    first: ledger.claims[i].id.clone(),
                    second: ledger.claims[j].id.clone(),
                }),
        );
        if !violations.is_empty() {
            return Err(PipelineError::InvariantViolation(violations));
        }

        trace.info(
            Stage::Assemble,
            format!(
                "ledger {} assembled: {} sources, {} evidence, {} claims, {} edges, {} resolutions",
                ledger.run_id,
                ledger.sources.len(),
                ledger.evidence.len(),
                ledger.claims.len(),
                ledger.edges.len(),
                ledger.resolutions.len()
            ),
        );
        Ok(RunOutput { ledger, trace })
    }

    fn build_sources(&self, input: &RunInput, trace: &mut RunTrace) -> Vec<Source> {
        let outcome = dedupe_search_results(&input.search_results);
        for skipped in &outcome.skipped {
            trace.record(
                Stage::Sources,
                FailureKind::MalformedInput,
                format!("search result {:?} dropped: {}", skipped.url, skipped.reason),
            );
        }

        let sources: Vec<Source> = outcome
            .records
            .into_iter()
            .enumerate()
            .map(|(n, canonical)| {
                let record = canonical.record;
                let source_type =
                    infer_source_type(&canonical.url, record.source_type.as_deref());
                let title = if record.title.trim().is_empty() {
                    canonical.url.clone()
                } else {
                    record.title.trim().to_string()
                };
                Source {
                    id: SourceId::nth(n + 1),
                    title,
                    author: record.author,
                    date: record.date,
                    source_type,
                    publisher: record.publisher,
                    domain: canonical.domain,
                    provider: record.provider,
                    weight: self.config.verification.weight_for(source_type),
                    url: canonical.url,
                }
            })
            .collect();

        trace.info(
            Stage::Sources,
            format!(
                "{} search results deduplicated into {} sources",
                input.search_results.len(),
                sources.len()
            ),
        );
        sources
    }

    async fn gather_evidence(
        &self,
        prompt: &str,
        sources: &[Source],
        texts: &HashMap<String, String>,
        policy: CallPolicy,
        trace: &mut RunTrace,
    ) -> EvidenceOutcome {
        let mut requests = Vec::new();
        for source in sources {
            match texts.get(&source.url) {
                Some(text) => requests.push(ExtractionRequest {
                    prompt: prompt.to_string(),
                    source: source.clone(),
                    text: text.clone(),
                }),
                None => trace.record(
                    Stage::Evidence,
                    FailureKind::Skip,
                    format!("{} has no fetched text: {}", source.id, source.url),
                ),
            }
        }

        let oracle = Arc::clone(&self.extraction);
        let outcomes = call_all(requests.clone(), policy, move |request: &ExtractionRequest| {
            oracle.extract_evidence(request).map_err(|e| e.to_string())
        })
        .await;

        let verifier = EvidenceVerifier::new(self.config.verification.clone());
        let mut result = EvidenceOutcome {
            cards: Vec::new(),
            rejected: 0,
            failures: 0,
        };
        let mut seen_snippets: HashSet<String> = HashSet::new();

        for (request, outcome) in requests.iter().zip(outcomes) {
            let source = &request.source;
            let items = match outcome.result {
                Ok(items) => items,
                Err(e) => {
                    result.failures += 1;
                    trace.record(
                        Stage::Evidence,
                        FailureKind::OracleFailure,
                        format!(
                            "extraction for {} failed after {} attempts: {}",
                            source.id, outcome.attempts, e
                        ),
                    );
                    continue;
                }
            };

            for (item_index, raw) in items.iter().enumerate() {
                let id = EvidenceId::nth(result.cards.len() + 1);
                match verifier.evaluate(id, source, raw, &request.text) {
                    Ok(card) => {
                        if !seen_snippets.insert(normalize_text(&card.snippet)) {
                            trace.record(
                                Stage::Evidence,
                                FailureKind::Skip,
                                format!(
                                    "{} item {} repeats an accepted snippet",
                                    source.id,
                                    item_index + 1
                                ),
                            );
                            continue;
                        }
                        debug!(
                            "{} accepted from {} ({}, {:.3})",
                            card.id, source.id, card.verification_method.as_str(), card.verification_score
                        );
                        result.cards.push(card);
                    }
                    Err(reason) => {
                        result.rejected += 1;
                        trace.record(
                            Stage::Evidence,
                            FailureKind::VerificationFailure,
                            format!("{} item {} rejected: {}", source.id, item_index + 1, reason),
                        );
                    }
                }
            }
        }

        trace.info(
            Stage::Evidence,
            format!(
                "{} evidence cards accepted, {} rejected",
                result.cards.len(),
                result.rejected
            ),
        );
        result
    }

    async fn propose_claims(
        &self,
        prompt: &str,
        cards: &[EvidenceCard],
        policy: CallPolicy,
        trace: &mut RunTrace,
    ) -> (Vec<CandidateClaim>, usize) {
        let oracle = Arc::clone(&self.extraction);
        let request = (prompt.to_string(), cards.to_vec());
        let mut outcomes = call_all(
            vec![request],
            policy,
            move |(prompt, cards): &(String, Vec<EvidenceCard>)| {
                oracle.propose_claims(prompt, cards).map_err(|e| e.to_string())
            },
        )
        .await;

        match outcomes.pop().map(|outcome| (outcome.result, outcome.attempts)) {
            Some((Ok(candidates), _)) => {
                trace.info(
                    Stage::Claims,
                    format!("{} candidate claims proposed", candidates.len()),
                );
                (candidates, 0)
            }
            Some((Err(e), attempts)) => {
                trace.record(
                    Stage::Claims,
                    FailureKind::OracleFailure,
                    format!("claim proposal failed after {} attempts: {}", attempts, e),
                );
                (Vec::new(), 1)
            }
            None => (Vec::new(), 0),
        }
    }
}

/// Canonical URL to page text; the first document for a URL wins
fn index_documents(documents: &[Document], trace: &mut RunTrace) -> HashMap<String, String> {
    let mut texts = HashMap::new();
    for document in documents {
        match canonicalize_url(&document.url) {
            Ok(url) => {
                texts.entry(url).or_insert_with(|| document.text.clone());
            }
            Err(e) => trace.record(
                Stage::Evidence,
                FailureKind::MalformedInput,
                format!("document {:?} ignored: {}", document.url, e),
            ),
        }
    }
    texts
}

/// Give valid candidates ids `C1..` and normalized labels
fn number_candidates(candidates: Vec<CandidateClaim>, trace: &mut RunTrace) -> Vec<Claim> {
    let mut claims = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let Some(claim_type) = ClaimType::parse(&candidate.claim_type) else {
            trace.record(
                Stage::Claims,
                FailureKind::MalformedInput,
                format!(
                    "unknown claim type {:?} for: {}",
                    candidate.claim_type, candidate.statement
                ),
            );
            continue;
        };
        let statement = candidate.statement.trim();
        if statement.is_empty() {
            trace.record(
                Stage::Claims,
                FailureKind::MalformedInput,
                "candidate claim with an empty statement",
            );
            continue;
        }
        claims.push(Claim::new(
            ClaimId::nth(claims.len() + 1),
            claim_type,
            statement,
            Polarity::normalize(&candidate.polarity),
            candidate.supported_by,
            candidate.confidence,
        ));
    }
    claims
}
