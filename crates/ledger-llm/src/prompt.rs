//! Prompt construction for the model-backed oracles

use ledger_domain::{ClaimType, ClaimView, EvidenceCard, ExtractionRequest, RelationRequest, SummaryRequest};

/// Characters of source text included in an extraction prompt
pub const MAX_SOURCE_CHARS: usize = 6000;

const JSON_ONLY: &str =
    "You are a careful research assistant. Quote sources verbatim, never invent them. Reply with valid JSON only.";

const EVIDENCE_INSTRUCTIONS: &str = r#"Pick 1 to 3 short passages from the source text that bear on the research prompt.
Copy each passage word for word; do not paraphrase.

Rules:
- Each snippet is a verbatim quote of at most 400 characters
- claim_types lists the categories the passage speaks to
- reliability is 1 (anecdotal) to 5 (rigorous, well-sourced)

Output JSON: {"evidence": [{"snippet": "...", "claim_types": ["..."], "context": "...", "reliability": 3, "notes": "..."}]}"#;

const CLAIM_INSTRUCTIONS: &str = r#"Write 3 to 6 concise claims grounded in the evidence cards below.

Rules:
- Each claim cites 1 to 3 evidence ids from the list, and only those ids
- polarity is one of pro, con, mixed, neutral
- confidence is 1 (speculative) to 5 (well established)

Output JSON: {"claims": [{"claim_type": "...", "statement": "...", "polarity": "...", "supported_by": ["E1"], "confidence": 3}]}"#;

const RELATION_INSTRUCTIONS: &str = r#"Decide how claim A relates to claim B.
Choose exactly one relation: supports, contradicts, refines, unrelated.
- contradicts: both cannot hold at once
- refines: A narrows B to a condition or scope
- supports: A makes B more likely
Cite only evidence ids listed under the two claims.

Output JSON: {"relation": "...", "rationale": "...", "evidence_ids": ["E1"]}"#;

const SUMMARY_INSTRUCTIONS: &str = r#"The claims below contradict each other.
- Summarize what the disagreement is about
- State conditions under which each could hold, if any
- If they are truly incompatible, name the better-supported claim id; otherwise use null

Output JSON: {"summary": "...", "conditions": "...", "leaning_claim_id": null}"#;

fn claim_type_list() -> String {
    ClaimType::ALL
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn push_claim(prompt: &mut String, label: &str, claim: &ClaimView) {
    prompt.push_str(&format!(
        "{} [{}] ({}, {}): {}\n",
        label, claim.id, claim.claim_type, claim.polarity, claim.statement
    ));
    for evidence in &claim.evidence {
        prompt.push_str(&format!("  - {}: {}\n", evidence.id, evidence.snippet));
    }
}

/// Build the evidence extraction prompt for one source
pub fn evidence_prompt(request: &ExtractionRequest) -> String {
    let text: String = request.text.chars().take(MAX_SOURCE_CHARS).collect();

    let mut prompt = String::new();
    prompt.push_str(JSON_ONLY);
    prompt.push_str("\n\n");
    prompt.push_str(EVIDENCE_INSTRUCTIONS);
    prompt.push_str("\n\n");
    prompt.push_str(&format!("Research prompt: {}\n", request.prompt));
    prompt.push_str(&format!("Claim types: {}\n", claim_type_list()));
    prompt.push_str(&format!(
        "Source: {} ({})\n\n",
        request.source.title, request.source.url
    ));
    prompt.push_str("Source text:\n---\n");
    prompt.push_str(&text);
    prompt.push_str("\n---\n");
    prompt
}

/// Build the claim proposal prompt over accepted evidence
pub fn claims_prompt(research_prompt: &str, evidence: &[EvidenceCard]) -> String {
    let mut prompt = String::new();
    prompt.push_str(JSON_ONLY);
    prompt.push_str("\n\n");
    prompt.push_str(CLAIM_INSTRUCTIONS);
    prompt.push_str("\n\n");
    prompt.push_str(&format!("Research prompt: {}\n", research_prompt));
    prompt.push_str(&format!("Claim types: {}\n\n", claim_type_list()));
    prompt.push_str("Evidence cards:\n");
    for card in evidence {
        let types = card
            .claim_types
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(",");
        prompt.push_str(&format!(
            "- {} [{}] (reliability {:.1}): {}\n",
            card.id, types, card.reliability, card.snippet
        ));
    }
    prompt
}

/// Build the pairwise relation prompt
pub fn relation_prompt(request: &RelationRequest) -> String {
    let mut prompt = String::new();
    prompt.push_str(JSON_ONLY);
    prompt.push_str("\n\n");
    prompt.push_str(RELATION_INSTRUCTIONS);
    prompt.push_str("\n\n");
    push_claim(&mut prompt, "Claim A", &request.first);
    push_claim(&mut prompt, "Claim B", &request.second);
    prompt
}

/// Build the contradiction summary prompt
pub fn summary_prompt(request: &SummaryRequest) -> String {
    let mut prompt = String::new();
    prompt.push_str(JSON_ONLY);
    prompt.push_str("\n\n");
    prompt.push_str(SUMMARY_INSTRUCTIONS);
    prompt.push_str("\n\n");
    prompt.push_str(&format!("Group {}\n", request.group_id));
    for claim in &request.claims {
        push_claim(&mut prompt, "Claim", claim);
    }
    if !request.rationales.is_empty() {
        prompt.push_str("\nWhy they conflict:\n");
        for rationale in &request.rationales {
            prompt.push_str(&format!("- {}\n", rationale));
        }
    }
    prompt.push_str("\nEvidence weight by claim:\n");
    for (id, weight) in &request.weight_by_claim {
        prompt.push_str(&format!("- {}: {:.2}\n", id, weight));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_domain::{ClaimId, EvidenceId, EvidenceSnippet, Polarity, ResolutionId, Source, SourceId, SourceType};
    use std::collections::BTreeMap;

    fn view(n: usize, statement: &str) -> ClaimView {
        ClaimView {
            id: ClaimId::nth(n),
            claim_type: ClaimType::Evaluation,
            statement: statement.to_string(),
            polarity: Polarity::Pro,
            evidence: vec![EvidenceSnippet {
                id: EvidenceId::nth(n),
                snippet: format!("snippet for {}", n),
            }],
        }
    }

    #[test]
    fn test_relation_prompt_lists_both_claims() {
        let prompt = relation_prompt(&RelationRequest {
            first: view(1, "Benchmarks saturate quickly"),
            second: view(2, "Benchmarks remain informative"),
        });
        assert!(prompt.contains("Claim A [C1]"));
        assert!(prompt.contains("Claim B [C2]"));
        assert!(prompt.contains("E2: snippet for 2"));
        assert!(prompt.contains("supports, contradicts, refines, unrelated"));
    }

    #[test]
    fn test_evidence_prompt_truncates_text() {
        let request = ExtractionRequest {
            prompt: "Is synthetic data safe?".to_string(),
            source: Source {
                id: SourceId::nth(1),
                url: "https://example.org".to_string(),
                title: "Example".to_string(),
                author: None,
                date: None,
                source_type: SourceType::Other,
                publisher: None,
                domain: "example.org".to_string(),
                provider: None,
                weight: 0.5,
            },
            text: "x".repeat(MAX_SOURCE_CHARS + 500),
        };
        let prompt = evidence_prompt(&request);
        assert!(prompt.contains("Research prompt: Is synthetic data safe?"));
        assert!(!prompt.contains(&"x".repeat(MAX_SOURCE_CHARS + 1)));
        assert!(prompt.contains("data_quality, bias, evaluation, privacy_security, ops_risk"));
    }

    #[test]
    fn test_summary_prompt_includes_weights() {
        let mut weights = BTreeMap::new();
        weights.insert(ClaimId::nth(1), 0.75);
        weights.insert(ClaimId::nth(2), 0.4);
        let prompt = summary_prompt(&SummaryRequest {
            group_id: ResolutionId::nth(1),
            claims: vec![view(1, "a"), view(2, "b")],
            rationales: vec!["opposite findings".to_string()],
            weight_by_claim: weights,
        });
        assert!(prompt.contains("Group R1"));
        assert!(prompt.contains("- C1: 0.75"));
        assert!(prompt.contains("- opposite findings"));
    }
}
