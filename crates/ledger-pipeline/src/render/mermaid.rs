//! Mermaid `graph TD` rendering of the claim graph

use ledger_domain::{Claim, ClaimType, Ledger, Relation};

const LABEL_WIDTH: usize = 72;

const CLASS_DEFS: &[&str] = &[
    "classDef claim_data_quality fill:#e3f2fd,stroke:#1e88e5,color:#0d47a1",
    "classDef claim_bias fill:#fce4ec,stroke:#d81b60,color:#880e4f",
    "classDef claim_evaluation fill:#e8f5e9,stroke:#43a047,color:#1b5e20",
    "classDef claim_privacy_security fill:#fff3e0,stroke:#fb8c00,color:#e65100",
    "classDef claim_ops_risk fill:#f3e5f5,stroke:#8e24aa,color:#4a148c",
];

fn node_class(claim_type: ClaimType) -> String {
    format!("claim_{}", claim_type.as_str())
}

fn edge_color(relation: Relation) -> &'static str {
    match relation {
        Relation::Supports => "#2e7d32",
        Relation::Contradicts => "#c62828",
        Relation::Refines => "#ef6c00",
        Relation::Unrelated => "#616161",
    }
}

fn border_color(confidence: u8) -> &'static str {
    match confidence {
        4.. => "#1b5e20",
        3 => "#ef6c00",
        _ => "#b71c1c",
    }
}

fn border_width(confidence: u8) -> u8 {
    match confidence {
        5.. => 5,
        4 => 4,
        3 => 3,
        _ => 2,
    }
}

/// Strip characters that would end a quoted Mermaid label
fn clean_label(text: &str) -> String {
    text.replace('\n', " ")
        .replace('"', "'")
        .replace('[', "(")
        .replace(']', ")")
        .trim()
        .to_string()
}

/// Greedy word wrap joined with `<br/>`; long words are never split
fn wrap_label(text: &str, width: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        return text.to_string();
    }
    lines.join("<br/>")
}

fn push_node(lines: &mut Vec<String>, claim: &Claim) {
    let label = wrap_label(
        &clean_label(&format!("{}: {}", claim.id, claim.statement)),
        LABEL_WIDTH,
    );
    lines.push(format!(
        "{}[\"{}\"]:::{}",
        claim.id,
        label,
        node_class(claim.claim_type)
    ));
    lines.push(format!(
        "style {} stroke:{},stroke-width:{}px",
        claim.id,
        border_color(claim.confidence),
        border_width(claim.confidence)
    ));
    lines.push(format!(
        "click {} \"#claim-{}\" \"Open claim details\"",
        claim.id,
        claim.id.as_str().to_lowercase()
    ));
}

/// Render the claim graph as Mermaid text
///
/// Nodes follow ledger claim order and edges follow ledger edge order, so
/// `linkStyle` indices match edge positions.
pub fn render_mermaid(ledger: &Ledger) -> String {
    let mut lines = vec!["graph TD".to_string()];
    for claim in &ledger.claims {
        push_node(&mut lines, claim);
    }

    for (index, edge) in ledger.edges.iter().enumerate() {
        lines.push(format!(
            "{} -->|{}| {}",
            edge.src_claim_id, edge.relation, edge.dst_claim_id
        ));
        lines.push(format!(
            "linkStyle {} stroke:{},stroke-width:2px",
            index,
            edge_color(edge.relation)
        ));
    }

    lines.push(String::new());
    lines.extend(CLASS_DEFS.iter().map(|line| line.to_string()));
    lines.push(String::new());
    lines.join("\n")
}
