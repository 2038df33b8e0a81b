//! Pure projections of a ledger: Markdown report and Mermaid graph
//!
//! Both renderers read nothing but the ledger and emit the same bytes for the
//! same ledger.

mod mermaid;
mod report;

pub use mermaid::render_mermaid;
pub use report::render_report;

#[cfg(test)]
pub(crate) mod tests {
    use ledger_domain::{
        Claim, ClaimId, ClaimType, Edge, EvidenceCard, EvidenceId, Ledger, Polarity, Relation,
        ResolutionGroup, ResolutionId, ResolutionStatus, RunId, RunMetrics, ScoreComponents,
        Source, SourceId, SourceType, VerificationMethod, LEDGER_VERSION,
    };
    use std::collections::{BTreeMap, BTreeSet};

    fn source(n: usize, url: &str, source_type: SourceType, weight: f64) -> Source {
        Source {
            id: SourceId::nth(n),
            url: url.to_string(),
            title: format!("Source {}", n),
            author: None,
            date: None,
            source_type,
            publisher: None,
            domain: "example.org".to_string(),
            provider: Some("recorded".to_string()),
            weight,
        }
    }

    fn card(n: usize, source: usize, snippet: &str, claim_type: ClaimType) -> EvidenceCard {
        EvidenceCard {
            id: EvidenceId::nth(n),
            source_id: SourceId::nth(source),
            claim_types: BTreeSet::from([claim_type]),
            snippet: snippet.to_string(),
            context: None,
            reliability: 4.0,
            verified: true,
            verification_score: 1.0,
            verification_method: VerificationMethod::Exact,
            weight: 0.8,
            notes: None,
        }
    }

    fn claim(
        n: usize,
        claim_type: ClaimType,
        statement: &str,
        evidence: &[usize],
        confidence: u8,
    ) -> Claim {
        let mut claim = Claim::new(
            ClaimId::nth(n),
            claim_type,
            statement,
            Polarity::Neutral,
            evidence.iter().map(|&e| EvidenceId::nth(e)).collect(),
            confidence,
        );
        claim.raw_score = confidence as f64 / 5.0;
        claim.components = Some(ScoreComponents {
            evidence_strength: 0.8,
            diversity: 0.5,
            verification_ratio: 1.0,
            contradiction_penalty: 0.0,
        });
        claim
    }

    /// Three claims: C1 contradicts C2, C1 is refined by C3
    pub(crate) fn sample_ledger() -> Ledger {
        let mut c1 = claim(
            1,
            ClaimType::Evaluation,
            "Synthetic data improves generalization",
            &[1, 2],
            5,
        );
        c1.aliases = vec!["Synthetic data helps models generalize".to_string()];
        let mut c2 = claim(
            2,
            ClaimType::Evaluation,
            "Synthetic data harms generalization",
            &[3],
            1,
        );
        c2.needs_more_evidence = true;
        let c3 = claim(
            3,
            ClaimType::Bias,
            "Synthetic data amplifies [label] bias",
            &[2],
            3,
        );

        let mut group = ResolutionGroup::open(
            ResolutionId::nth(1),
            vec![ClaimId::nth(1), ClaimId::nth(2)],
            vec!["C1->C2".to_string()],
        );
        group.status = ResolutionStatus::Noted;
        group.summary = Some("Results depend on the generator".to_string());
        group.conditions = Some("Only holds for small models".to_string());
        group.leaning_claim_id = Some(ClaimId::nth(1));
        group.weight_by_claim = BTreeMap::from([(ClaimId::nth(1), 1.6), (ClaimId::nth(2), 0.8)]);

        Ledger {
            run_id: RunId::from_value(7),
            prompt: "Is synthetic data safe for training?".to_string(),
            plan: serde_json::json!({"angles": ["quality", "bias"], "constraints": ["2023 or later"]}),
            sources: vec![
                source(1, "https://arxiv.org/abs/1", SourceType::Preprint, 0.9),
                source(2, "https://example.org/blog/post", SourceType::Blog, 0.6),
            ],
            evidence: vec![
                card(1, 1, "Accuracy rose 4 points with synthetic data.", ClaimType::Evaluation),
                card(2, 1, "Label skew grew in synthetic sets.", ClaimType::Bias),
                card(3, 2, "We saw worse transfer after synthetic pretraining.", ClaimType::Evaluation),
            ],
            claims: vec![c1, c2, c3],
            edges: vec![
                Edge::new(
                    ClaimId::nth(1),
                    ClaimId::nth(2),
                    Relation::Contradicts,
                    Some("Opposite effect on transfer".to_string()),
                    vec![EvidenceId::nth(1), EvidenceId::nth(3)],
                ),
                Edge::new(
                    ClaimId::nth(1),
                    ClaimId::nth(3),
                    Relation::Refines,
                    None,
                    Vec::new(),
                ),
            ],
            resolutions: vec![group],
            metrics: RunMetrics {
                supported_claim_rate: 1.0,
                calibration_label: crate::metrics::CALIBRATION_LABEL.to_string(),
                source_count: 2,
                evidence_count: 3,
                evaluated_pairs: 3,
                resolution_count: 1,
                ..RunMetrics::default()
            },
            created_at: "2026-01-01T00:00:00+00:00".to_string(),
            version: LEDGER_VERSION.to_string(),
        }
    }

    #[test]
    fn test_sample_ledger_is_valid() {
        assert!(sample_ledger().validate().is_ok());
    }
}
