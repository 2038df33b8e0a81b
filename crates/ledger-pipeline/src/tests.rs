//! End-to-end runs over model-backed oracles with a mock provider

#[cfg(test)]
mod tests {
    use crate::{
        Document, FailureKind, HeuristicRelationOracle, Pipeline, PipelineConfig, PipelineError,
        RunInput,
    };
    use ledger_domain::{ClaimId, Relation, ResolutionStatus};
    use ledger_gatekeeper::SearchResult;
    use ledger_llm::{LlmExtractionOracle, LlmRelationOracle, LlmSummaryOracle, MockProvider};
    use std::sync::Arc;

    const PAPER_URL: &str = "https://arxiv.org/abs/2401.00001";
    const BLOG_URL: &str = "https://blog.example.org/notes";

    const PAPER_TEXT: &str = "Abstract. Training on synthetic data raised benchmark accuracy by four points. \
        Generated samples over-represent majority dialects.";
    const BLOG_TEXT: &str =
        "Field notes. Our production models lost robustness after switching to generated corpora.";

    const PAPER_EVIDENCE: &str = r#"{"evidence": [
        {"snippet": "Training on synthetic data raised benchmark accuracy by four points.", "claim_types": ["evaluation"], "reliability": 4},
        {"snippet": "Generated samples over-represent majority dialects.", "claim_types": ["bias"], "reliability": 3}
    ]}"#;
    const BLOG_EVIDENCE: &str = r#"{"evidence": [
        {"snippet": "Our production models lost robustness after switching to generated corpora.", "claim_types": ["evaluation"], "reliability": 3},
        {"snippet": "Synthetic data fixed every problem we ever had.", "claim_types": ["evaluation"], "reliability": 5}
    ]}"#;
    const CLAIMS: &str = r#"{"claims": [
        {"claim_type": "evaluation", "statement": "Synthetic training data improves benchmark accuracy", "polarity": "pro", "supported_by": ["E1"], "confidence": 4},
        {"claim_type": "evaluation", "statement": "Generated corpora reduce production robustness", "polarity": "con", "supported_by": ["E3"], "confidence": 3},
        {"claim_type": "bias", "statement": "Synthetic samples over-represent majority dialects", "polarity": "con", "supported_by": ["E2"], "confidence": 3},
        {"claim_type": "evaluation", "statement": "Benchmark accuracy improves with synthetic training data", "polarity": "pro", "supported_by": ["E1"], "confidence": 2}
    ]}"#;

    const CONTRADICTS: &str = r#"{"relation": "contradicts", "rationale": "Opposite effects of synthetic data", "evidence_ids": ["E1", "E3"]}"#;
    const SUMMARY: &str = r#"{"summary": "Benchmarks and production disagree", "conditions": "Benchmark gains may not transfer", "leaning_claim_id": "C1"}"#;

    fn input() -> RunInput {
        let result = |url: &str, title: &str| SearchResult {
            url: url.to_string(),
            title: title.to_string(),
            snippet: String::new(),
            author: None,
            date: None,
            source_type: None,
            publisher: None,
            provider: Some("mock".to_string()),
        };
        RunInput {
            prompt: "Does synthetic data help model training?".to_string(),
            plan: serde_json::json!({"angles": ["accuracy", "robustness"]}),
            search_results: vec![
                result(PAPER_URL, "Synthetic data at scale"),
                result(&format!("{}?utm_source=feed", BLOG_URL), "Field notes"),
            ],
            documents: vec![
                Document {
                    url: PAPER_URL.to_string(),
                    text: PAPER_TEXT.to_string(),
                },
                Document {
                    url: BLOG_URL.to_string(),
                    text: BLOG_TEXT.to_string(),
                },
            ],
        }
    }

    fn mock() -> MockProvider {
        let mut llm = MockProvider::new(r#"{"relation": "unrelated"}"#);
        llm.add_response_containing(format!("({})", PAPER_URL), PAPER_EVIDENCE);
        llm.add_response_containing(format!("({})", BLOG_URL), BLOG_EVIDENCE);
        llm.add_response_containing("Evidence cards:", CLAIMS);
        llm.add_response_containing("Group R1", SUMMARY);
        llm
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            oracle_max_retries: 0,
            ..PipelineConfig::default()
        }
    }

    #[tokio::test]
    async fn test_model_backed_run() {
        let mut llm = mock();
        llm.add_response_containing("Claim B [C2]", CONTRADICTS);
        let llm = Arc::new(llm);

        let pipeline = Pipeline::new(
            config(),
            LlmExtractionOracle::new(Arc::clone(&llm)),
            LlmRelationOracle::new(Arc::clone(&llm)),
        )
        .unwrap()
        .with_summaries(LlmSummaryOracle::new(Arc::clone(&llm)));

        let output = pipeline.run(input()).await.unwrap();
        let ledger = &output.ledger;

        assert_eq!(ledger.sources.len(), 2);
        assert_eq!(ledger.evidence.len(), 3);
        assert_eq!(ledger.metrics.rejected_evidence, 1);
        assert_eq!(output.trace.count(FailureKind::VerificationFailure), 1);

        let ids: Vec<&str> = ledger.claims.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["C1", "C2", "C3"]);
        assert_eq!(
            ledger.claims[0].aliases,
            vec!["Benchmark accuracy improves with synthetic training data".to_string()]
        );

        assert_eq!(ledger.edges.len(), 1);
        assert_eq!(ledger.edges[0].relation, Relation::Contradicts);
        assert_eq!(ledger.metrics.evaluated_pairs, 3);

        assert_eq!(ledger.resolutions.len(), 1);
        let group = &ledger.resolutions[0];
        assert_eq!(group.member_claim_ids, vec![ClaimId::nth(1), ClaimId::nth(2)]);
        assert_eq!(group.status, ResolutionStatus::Noted);
        assert_eq!(group.leaning_claim_id, Some(ClaimId::nth(1)));
        assert!(ledger.group_of(&ClaimId::nth(3)).is_none());

        assert!(ledger.validate().is_ok());
        assert_eq!(ledger.metrics.oracle_failures, 0);
    }

    #[tokio::test]
    async fn test_stray_evidence_citation_is_a_failure() {
        let mut llm = mock();
        llm.add_response_containing(
            "Claim B [C2]",
            r#"{"relation": "contradicts", "evidence_ids": ["E2"]}"#,
        );
        let llm = Arc::new(llm);

        let pipeline = Pipeline::new(
            config(),
            LlmExtractionOracle::new(Arc::clone(&llm)),
            LlmRelationOracle::new(Arc::clone(&llm)),
        )
        .unwrap();

        let output = pipeline.run(input()).await.unwrap();
        assert!(output.ledger.edges.is_empty());
        assert!(output.ledger.resolutions.is_empty());
        assert_eq!(output.ledger.metrics.oracle_failures, 1);
        assert_eq!(output.trace.count(FailureKind::OracleFailure), 1);
    }

    #[tokio::test]
    async fn test_summary_failure_leaves_group_open() {
        let mut llm = MockProvider::new(r#"{"relation": "unrelated"}"#);
        llm.add_error_containing("Group R1");
        llm.add_response_containing(format!("({})", PAPER_URL), PAPER_EVIDENCE);
        llm.add_response_containing(format!("({})", BLOG_URL), BLOG_EVIDENCE);
        llm.add_response_containing("Evidence cards:", CLAIMS);
        llm.add_response_containing("Claim B [C2]", CONTRADICTS);
        let llm = Arc::new(llm);

        let pipeline = Pipeline::new(
            config(),
            LlmExtractionOracle::new(Arc::clone(&llm)),
            LlmRelationOracle::new(Arc::clone(&llm)),
        )
        .unwrap()
        .with_summaries(LlmSummaryOracle::new(Arc::clone(&llm)));

        let output = pipeline.run(input()).await.unwrap();
        let group = &output.ledger.resolutions[0];
        assert_eq!(group.status, ResolutionStatus::Open);
        assert!(group.summary.is_none());
        assert_eq!(output.ledger.metrics.oracle_failures, 1);
    }

    #[tokio::test]
    async fn test_extraction_failure_on_every_source() {
        let llm = Arc::new(MockProvider::new("not json at all"));
        let pipeline = Pipeline::new(
            config(),
            LlmExtractionOracle::new(Arc::clone(&llm)),
            HeuristicRelationOracle,
        )
        .unwrap();

        let result = pipeline.run(input()).await;
        assert!(matches!(result, Err(PipelineError::ZeroUsableEvidence)));
    }

    #[tokio::test]
    async fn test_heuristic_relations_contradict_opposite_stances() {
        let llm = Arc::new(mock());
        let pipeline = Pipeline::new(
            config(),
            LlmExtractionOracle::new(Arc::clone(&llm)),
            HeuristicRelationOracle,
        )
        .unwrap();

        let output = pipeline.run(input()).await.unwrap();
        let contradictions: Vec<_> = output
            .ledger
            .edges
            .iter()
            .filter(|e| e.relation == Relation::Contradicts)
            .map(|e| e.key())
            .collect();
        // C1 is pro, C2 and C3 are con
        assert_eq!(contradictions, vec!["C1->C2".to_string(), "C1->C3".to_string()]);
        assert_eq!(output.ledger.resolutions.len(), 1);
        assert_eq!(output.ledger.resolutions[0].member_claim_ids.len(), 3);
        assert_eq!(output.ledger.resolutions[0].status, ResolutionStatus::Open);
    }
}
