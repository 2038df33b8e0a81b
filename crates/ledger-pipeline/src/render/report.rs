//! Markdown report rendering

use ledger_domain::{Claim, ClaimType, EvidenceCard, Ledger, Relation, ResolutionStatus};
use std::fmt::Write;

/// Claims at or below this confidence are listed as needing stronger evidence
const WEAK_CONFIDENCE: u8 = 2;

/// Render the run as a Markdown report
///
/// Sections: prompt, plan angles and constraints, claims grouped by type,
/// contradictions, resolution groups, source appendix, weak claims, metrics.
/// Every claim gets an `claim-<id>` anchor that the Mermaid click targets
/// point at.
pub fn render_report(ledger: &Ledger) -> String {
    let mut out = String::new();
    out.push_str("# Research Report\n\n");

    out.push_str("## Question\n\n");
    out.push_str(ledger.prompt.trim());
    out.push_str("\n\n");

    write_plan(&mut out, ledger);
    write_findings(&mut out, ledger);
    write_contradictions(&mut out, ledger);
    write_resolutions(&mut out, ledger);
    write_sources(&mut out, ledger);
    write_weak_claims(&mut out, ledger);
    write_metrics(&mut out, ledger);

    out
}

/// Plan entries as display strings; non-string values render as JSON
fn plan_list(plan: &serde_json::Value, key: &str) -> Vec<String> {
    match plan.get(key) {
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(serde_json::Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn write_plan(out: &mut String, ledger: &Ledger) {
    out.push_str("## Research angles\n\n");
    let angles = plan_list(&ledger.plan, "angles");
    if angles.is_empty() {
        out.push_str("No angles recorded.\n");
    }
    for angle in &angles {
        let _ = writeln!(out, "- {}", angle);
    }
    out.push('\n');

    let constraints = plan_list(&ledger.plan, "constraints");
    if !constraints.is_empty() {
        out.push_str("## Constraints\n\n");
        for constraint in &constraints {
            let _ = writeln!(out, "- {}", constraint);
        }
        out.push('\n');
    }
}

fn anchor(claim: &Claim) -> String {
    format!("claim-{}", claim.id.as_str().to_lowercase())
}

fn evidence_line(ledger: &Ledger, card: &EvidenceCard) -> String {
    let title = ledger
        .source(&card.source_id)
        .map(|s| s.title.as_str())
        .unwrap_or("unknown source");
    format!(
        "- ({}, {}) {} - {} [weight {:.2}, {}, {}]",
        card.id,
        card.source_id,
        card.snippet,
        title,
        card.weight,
        if card.verified { "verified" } else { "unverified" },
        card.verification_method.as_str()
    )
}

fn write_claim(out: &mut String, ledger: &Ledger, claim: &Claim) {
    let _ = writeln!(out, "<a id=\"{}\"></a>", anchor(claim));
    let _ = writeln!(
        out,
        "#### Claim {} ({}) - Confidence: {}/5\n",
        claim.id, claim.claim_type, claim.confidence
    );
    let _ = writeln!(out, "**Claim:** {}\n", claim.statement);
    let _ = writeln!(out, "- Polarity: {}", claim.polarity);
    let _ = writeln!(out, "- Raw score: {:.3}", claim.raw_score);
    if let Some(c) = &claim.components {
        let _ = writeln!(
            out,
            "- Components: strength {:.2}, diversity {:.2}, verification {:.2}, contradiction penalty {:.2}",
            c.evidence_strength, c.diversity, c.verification_ratio, c.contradiction_penalty
        );
    }
    if !claim.aliases.is_empty() {
        let _ = writeln!(out, "- Also stated as: {}", claim.aliases.join("; "));
    }
    if claim.needs_more_evidence {
        out.push_str("- Status: needs more evidence\n");
    }
    if let Some(group) = ledger.group_of(&claim.id) {
        let _ = writeln!(out, "- Disputed in: {}", group.id);
    }

    out.push_str("\n**Evidence:**\n\n");
    for id in &claim.supported_by {
        match ledger.evidence_card(id) {
            Some(card) => {
                out.push_str(&evidence_line(ledger, card));
                out.push('\n');
            }
            None => {
                let _ = writeln!(out, "- ({}) missing from ledger", id);
            }
        }
    }
    out.push('\n');
}

fn write_findings(out: &mut String, ledger: &Ledger) {
    out.push_str("## Findings by claim type\n\n");
    if ledger.claims.is_empty() {
        out.push_str("No claims survived the run.\n\n");
        return;
    }
    for claim_type in ClaimType::ALL {
        let claims: Vec<&Claim> = ledger
            .claims
            .iter()
            .filter(|c| c.claim_type == claim_type)
            .collect();
        if claims.is_empty() {
            continue;
        }
        let _ = writeln!(out, "### {}\n", claim_type.label());
        for claim in claims {
            write_claim(out, ledger, claim);
        }
    }
}

fn write_contradictions(out: &mut String, ledger: &Ledger) {
    out.push_str("## Contradictions\n\n");
    let contradictions: Vec<_> = ledger
        .edges
        .iter()
        .filter(|e| e.relation == Relation::Contradicts)
        .collect();
    if contradictions.is_empty() {
        out.push_str("None detected.\n\n");
        return;
    }
    for edge in contradictions {
        let _ = write!(out, "- {} contradicts {}", edge.src_claim_id, edge.dst_claim_id);
        if let Some(rationale) = &edge.rationale {
            let _ = write!(out, ": {}", rationale);
        }
        if let Some(group) = ledger.group_of(&edge.src_claim_id) {
            let _ = write!(out, " ({})", group.id);
        }
        out.push('\n');
    }
    out.push('\n');
}

fn write_resolutions(out: &mut String, ledger: &Ledger) {
    out.push_str("## Resolution groups\n\n");
    if ledger.resolutions.is_empty() {
        out.push_str("None.\n\n");
        return;
    }
    for group in &ledger.resolutions {
        let members: Vec<&str> = group.member_claim_ids.iter().map(|id| id.as_str()).collect();
        let _ = writeln!(out, "### {} ({})\n", group.id, group.status.as_str());
        let _ = writeln!(out, "- Members: {}", members.join(", "));
        match (&group.summary, group.status) {
            (Some(summary), _) => {
                let _ = writeln!(out, "- Summary: {}", summary);
            }
            (None, ResolutionStatus::Open) => out.push_str("- Summary: not available\n"),
            (None, ResolutionStatus::Noted) => {}
        }
        if let Some(conditions) = &group.conditions {
            let _ = writeln!(out, "- Conditions: {}", conditions);
        }
        if let Some(leaning) = &group.leaning_claim_id {
            let _ = writeln!(out, "- Evidence leans toward: {}", leaning);
        }
        if !group.weight_by_claim.is_empty() {
            let weights: Vec<String> = group
                .weight_by_claim
                .iter()
                .map(|(id, w)| format!("{} {:.2}", id, w))
                .collect();
            let _ = writeln!(out, "- Evidence weight: {}", weights.join(", "));
        }
        out.push('\n');
    }
}

fn write_sources(out: &mut String, ledger: &Ledger) {
    out.push_str("## Sources\n\n");
    if ledger.sources.is_empty() {
        out.push_str("None.\n\n");
        return;
    }
    for source in &ledger.sources {
        let _ = write!(
            out,
            "- {}: [{}]({}) - {}, weight {:.2}",
            source.id, source.title, source.url, source.source_type, source.weight
        );
        if let Some(provider) = &source.provider {
            let _ = write!(out, ", via {}", provider);
        }
        out.push('\n');
    }
    out.push('\n');
}

fn write_weak_claims(out: &mut String, ledger: &Ledger) {
    out.push_str("## Claims needing stronger evidence\n\n");
    let weak: Vec<&Claim> = ledger
        .claims
        .iter()
        .filter(|c| c.confidence <= WEAK_CONFIDENCE || c.needs_more_evidence)
        .collect();
    if weak.is_empty() {
        out.push_str("None.\n\n");
        return;
    }
    for claim in weak {
        let _ = writeln!(
            out,
            "- [{}](#{}) ({}/5): {}",
            claim.id,
            anchor(claim),
            claim.confidence,
            claim.statement
        );
    }
    out.push('\n');
}

fn write_metrics(out: &mut String, ledger: &Ledger) {
    let m = &ledger.metrics;
    out.push_str("## Evaluation metrics\n\n");
    let _ = writeln!(out, "- Sources: {}", m.source_count);
    let _ = writeln!(
        out,
        "- Evidence cards: {} ({} rejected)",
        m.evidence_count, m.rejected_evidence
    );
    let _ = writeln!(out, "- Supported claim rate: {:.3}", m.supported_claim_rate);
    let _ = writeln!(
        out,
        "- Contradiction density: {:.3} over {} evaluated pairs",
        m.contradiction_density, m.evaluated_pairs
    );
    let _ = writeln!(out, "- Weak evidence rate: {:.3}", m.weak_evidence_rate);
    let _ = writeln!(out, "- Average raw score: {:.3}", m.avg_raw_score);
    let _ = writeln!(
        out,
        "- ECE: {:.3}, Brier: {:.3} ({})",
        m.ece, m.brier, m.calibration_label
    );
    let _ = writeln!(out, "- Resolution groups: {}", m.resolution_count);
    let _ = writeln!(out, "- Oracle failures: {}", m.oracle_failures);
    if !m.claim_type_coverage.is_empty() {
        let coverage: Vec<String> = m
            .claim_type_coverage
            .iter()
            .map(|(t, n)| format!("{} {}", t, n))
            .collect();
        let _ = writeln!(out, "- Claim types: {}", coverage.join(", "));
    }
    let _ = writeln!(
        out,
        "\nGenerated {} (ledger {}, run {})",
        ledger.created_at, ledger.version, ledger.run_id
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::tests::sample_ledger;

    #[test]
    fn test_sections_in_order() {
        let report = render_report(&sample_ledger());
        let headings = [
            "# Research Report",
            "## Question",
            "## Research angles",
            "## Constraints",
            "## Findings by claim type",
            "## Contradictions",
            "## Resolution groups",
            "## Sources",
            "## Claims needing stronger evidence",
            "## Evaluation metrics",
        ];
        let mut last = 0;
        for heading in headings {
            let at = report[last..]
                .find(heading)
                .unwrap_or_else(|| panic!("missing {}", heading));
            last += at + heading.len();
        }
    }

    #[test]
    fn test_claims_grouped_by_type() {
        let report = render_report(&sample_ledger());
        let evaluation = report.find("### Evaluation").unwrap();
        let bias = report.find("### Bias").unwrap();
        // Type order, not claim order
        assert!(bias < evaluation);
        assert!(report.contains("<a id=\"claim-c3\"></a>"));
        assert!(report.contains("#### Claim C1 (evaluation) - Confidence: 5/5"));
    }

    #[test]
    fn test_evidence_bullets_separate_from_statement() {
        let report = render_report(&sample_ledger());
        assert!(report.contains("**Claim:** Synthetic data improves generalization\n"));
        assert!(report.contains(
            "- (E1, S1) Accuracy rose 4 points with synthetic data. - Source 1 [weight 0.80, verified, exact]"
        ));
        assert!(report.contains("- Also stated as: Synthetic data helps models generalize"));
    }

    #[test]
    fn test_contradictions_and_resolutions() {
        let report = render_report(&sample_ledger());
        assert!(report.contains("- C1 contradicts C2: Opposite effect on transfer (R1)"));
        assert!(report.contains("### R1 (noted)"));
        assert!(report.contains("- Evidence leans toward: C1"));
        assert!(report.contains("- Evidence weight: C1 1.60, C2 0.80"));
        assert!(report.contains("- Conditions: Only holds for small models"));
    }

    #[test]
    fn test_weak_claims_listed() {
        let report = render_report(&sample_ledger());
        let section = &report[report.find("## Claims needing stronger evidence").unwrap()..];
        assert!(section.contains("- [C2](#claim-c2) (1/5)"));
        assert!(!section.contains("[C1]"));
    }

    #[test]
    fn test_empty_ledger_sections() {
        let mut ledger = sample_ledger();
        ledger.claims.clear();
        ledger.edges.clear();
        ledger.resolutions.clear();
        ledger.plan = serde_json::Value::Null;
        let report = render_report(&ledger);
        assert!(report.contains("No angles recorded."));
        assert!(!report.contains("## Constraints"));
        assert!(report.contains("No claims survived the run."));
        assert!(report.contains("## Contradictions\n\nNone detected."));
    }

    #[test]
    fn test_report_is_reproducible() {
        let ledger = sample_ledger();
        assert_eq!(render_report(&ledger), render_report(&ledger));
    }
}
