//! Model-backed oracles
//!
//! Each adapter owns a shared provider, builds the prompt for its task, asks
//! for structured output and parses the reply. Provider failures and
//! unparsable replies both surface as [`LlmError`]; retrying and degrading is
//! the caller's job.

use crate::parser::{
    parse_candidate_claims, parse_evidence_items, parse_relation_answer, parse_summary_answer,
};
use crate::prompt::{claims_prompt, evidence_prompt, relation_prompt, summary_prompt};
use crate::LlmError;
use ledger_domain::{
    CandidateClaim, EvidenceCard, ExtractionOracle, ExtractionRequest, LlmProvider, RawEvidence,
    RelationAnswer, RelationOracle, RelationRequest, SummaryAnswer, SummaryOracle, SummaryRequest,
};
use std::fmt::Display;
use std::sync::Arc;
use tracing::debug;

const RELATION_SCHEMA: &str = r#"{"relation": "supports|contradicts|refines|unrelated", "rationale": "string", "evidence_ids": ["string"]}"#;
const SUMMARY_SCHEMA: &str =
    r#"{"summary": "string", "conditions": "string|null", "leaning_claim_id": "string|null"}"#;
const EVIDENCE_SCHEMA: &str = r#"{"evidence": [{"snippet": "string", "claim_types": ["string"], "context": "string", "reliability": 1}]}"#;
const CLAIMS_SCHEMA: &str = r#"{"claims": [{"claim_type": "string", "statement": "string", "polarity": "string", "supported_by": ["string"], "confidence": 1}]}"#;

fn call<L>(llm: &L, prompt: &str, schema: &str) -> Result<String, LlmError>
where
    L: LlmProvider,
    L::Error: Display,
{
    llm.generate_structured(prompt, schema)
        .map_err(|e| LlmError::Provider(e.to_string()))
}

/// Relation oracle backed by an LLM provider
pub struct LlmRelationOracle<L: LlmProvider> {
    llm: Arc<L>,
}

impl<L: LlmProvider> LlmRelationOracle<L> {
    /// Create a relation oracle over a shared provider
    pub fn new(llm: Arc<L>) -> Self {
        Self { llm }
    }
}

impl<L> RelationOracle for LlmRelationOracle<L>
where
    L: LlmProvider,
    L::Error: Display,
{
    type Error = LlmError;

    fn relate(&self, request: &RelationRequest) -> Result<RelationAnswer, Self::Error> {
        debug!(
            "Labelling pair {} / {}",
            request.first.id, request.second.id
        );
        let response = call(self.llm.as_ref(), &relation_prompt(request), RELATION_SCHEMA)?;
        parse_relation_answer(&response)
    }
}

/// Summary oracle backed by an LLM provider
pub struct LlmSummaryOracle<L: LlmProvider> {
    llm: Arc<L>,
}

impl<L: LlmProvider> LlmSummaryOracle<L> {
    /// Create a summary oracle over a shared provider
    pub fn new(llm: Arc<L>) -> Self {
        Self { llm }
    }
}

impl<L> SummaryOracle for LlmSummaryOracle<L>
where
    L: LlmProvider,
    L::Error: Display,
{
    type Error = LlmError;

    fn summarize(&self, request: &SummaryRequest) -> Result<SummaryAnswer, Self::Error> {
        let response = call(self.llm.as_ref(), &summary_prompt(request), SUMMARY_SCHEMA)?;
        parse_summary_answer(&response)
    }
}

/// Extraction oracle backed by an LLM provider
pub struct LlmExtractionOracle<L: LlmProvider> {
    llm: Arc<L>,
}

impl<L: LlmProvider> LlmExtractionOracle<L> {
    /// Create an extraction oracle over a shared provider
    pub fn new(llm: Arc<L>) -> Self {
        Self { llm }
    }
}

impl<L> ExtractionOracle for LlmExtractionOracle<L>
where
    L: LlmProvider,
    L::Error: Display,
{
    type Error = LlmError;

    fn extract_evidence(
        &self,
        request: &ExtractionRequest,
    ) -> Result<Vec<RawEvidence>, Self::Error> {
        let response = call(self.llm.as_ref(), &evidence_prompt(request), EVIDENCE_SCHEMA)?;
        parse_evidence_items(&response)
    }

    fn propose_claims(
        &self,
        prompt: &str,
        evidence: &[EvidenceCard],
    ) -> Result<Vec<CandidateClaim>, Self::Error> {
        let response = call(
            self.llm.as_ref(),
            &claims_prompt(prompt, evidence),
            CLAIMS_SCHEMA,
        )?;
        parse_candidate_claims(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockProvider;
    use ledger_domain::{
        ClaimId, ClaimType, ClaimView, EvidenceId, EvidenceSnippet, Polarity, Relation,
        ResolutionId,
    };
    use std::collections::BTreeMap;

    fn view(n: usize) -> ClaimView {
        ClaimView {
            id: ClaimId::nth(n),
            claim_type: ClaimType::DataQuality,
            statement: format!("statement {}", n),
            polarity: Polarity::Pro,
            evidence: vec![EvidenceSnippet {
                id: EvidenceId::nth(n),
                snippet: "quote".to_string(),
            }],
        }
    }

    #[test]
    fn test_relation_oracle_parses_reply() {
        let mut provider = MockProvider::default();
        provider.add_response_containing(
            "Claim A [C1]",
            r#"{"relation": "contradicts", "rationale": "opposite", "evidence_ids": ["E1"]}"#,
        );
        let oracle = LlmRelationOracle::new(Arc::new(provider.clone()));

        let answer = oracle
            .relate(&RelationRequest {
                first: view(1),
                second: view(2),
            })
            .unwrap();
        assert_eq!(answer.relation, Relation::Contradicts);
        assert_eq!(provider.call_count(), 1);
    }

    #[test]
    fn test_relation_oracle_provider_error() {
        let mut provider = MockProvider::default();
        provider.add_error_containing("Claim A");
        let oracle = LlmRelationOracle::new(Arc::new(provider));

        let result = oracle.relate(&RelationRequest {
            first: view(1),
            second: view(2),
        });
        assert!(matches!(result, Err(LlmError::Provider(_))));
    }

    #[test]
    fn test_relation_oracle_garbage_reply() {
        let oracle = LlmRelationOracle::new(Arc::new(MockProvider::new("I think they agree.")));
        let result = oracle.relate(&RelationRequest {
            first: view(1),
            second: view(2),
        });
        assert!(matches!(result, Err(LlmError::InvalidResponse(_))));
    }

    #[test]
    fn test_summary_oracle() {
        let provider = MockProvider::new(r#"{"summary": "Scope differs", "leaning_claim_id": null}"#);
        let oracle = LlmSummaryOracle::new(Arc::new(provider));
        let answer = oracle
            .summarize(&SummaryRequest {
                group_id: ResolutionId::nth(1),
                claims: vec![view(1), view(2)],
                rationales: vec![],
                weight_by_claim: BTreeMap::new(),
            })
            .unwrap();
        assert_eq!(answer.summary, "Scope differs");
        assert!(answer.leaning_claim_id.is_none());
    }

    #[test]
    fn test_extraction_oracle_claims() {
        let provider = MockProvider::new(
            r#"{"claims": [{"claim_type": "bias", "statement": "Labels skew", "polarity": "neg", "supported_by": ["E1"]}]}"#,
        );
        let oracle = LlmExtractionOracle::new(Arc::new(provider));
        let claims = oracle.propose_claims("prompt", &[]).unwrap();
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].polarity, "neg");
        assert_eq!(claims[0].confidence, 3);
    }
}
