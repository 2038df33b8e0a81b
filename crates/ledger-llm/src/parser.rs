//! Parse LLM output into oracle answers

use crate::LlmError;
use ledger_domain::{CandidateClaim, ClaimId, EvidenceId, RawEvidence, Relation, RelationAnswer, SummaryAnswer};
use serde_json::{Map, Value};
use tracing::warn;

/// Extract JSON from a response, handling markdown code blocks and chatter
///
/// Models sometimes wrap the payload in a fenced block or add a sentence
/// before it; the outermost object or array is returned.
pub fn extract_json(response: &str) -> Result<String, LlmError> {
    let trimmed = response.trim();

    let body = if trimmed.starts_with("```") {
        let lines: Vec<&str> = trimmed.lines().collect();
        if lines.len() < 2 {
            return Err(LlmError::InvalidResponse("Empty code block".to_string()));
        }
        // Skip the opening fence and a closing fence if present
        let end = if lines[lines.len() - 1].trim_start().starts_with("```") {
            lines.len() - 1
        } else {
            lines.len()
        };
        lines[1..end].join("\n")
    } else {
        trimmed.to_string()
    };

    let start = body.find(['{', '[']);
    let end = body.rfind(['}', ']']);
    match (start, end) {
        (Some(start), Some(end)) if start <= end => Ok(body[start..=end].to_string()),
        _ => Err(LlmError::InvalidResponse(format!(
            "No JSON found in response: {}",
            preview(trimmed)
        ))),
    }
}

fn preview(text: &str) -> String {
    text.chars().take(80).collect()
}

fn parse_value(response: &str) -> Result<Value, LlmError> {
    let json = extract_json(response)?;
    serde_json::from_str(&json)
        .map_err(|e| LlmError::InvalidResponse(format!("JSON parse error: {}", e)))
}

fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>, LlmError> {
    value
        .as_object()
        .ok_or_else(|| LlmError::InvalidResponse(format!("Expected a JSON object for {}", what)))
}

/// Optional string field; `null` and missing are both `None`
fn optional_string(obj: &Map<String, Value>, key: &str) -> Result<Option<String>, String> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(other) => Err(format!("'{}' must be a string, got {}", key, other)),
    }
}

fn string_list(obj: &Map<String, Value>, key: &str) -> Result<Vec<String>, String> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(|s| s.trim().to_string())
                    .ok_or_else(|| format!("'{}' must contain only strings", key))
            })
            .collect(),
        Some(other) => Err(format!("'{}' must be an array, got {}", key, other)),
    }
}

/// Items of a list reply, given either bare or under `key`
fn list_items(value: &Value, key: &str) -> Result<Vec<Value>, LlmError> {
    match value {
        Value::Array(items) => Ok(items.clone()),
        Value::Object(obj) => match obj.get(key) {
            Some(Value::Array(items)) => Ok(items.clone()),
            _ => Err(LlmError::InvalidResponse(format!(
                "Expected an array under '{}'",
                key
            ))),
        },
        _ => Err(LlmError::InvalidResponse(format!(
            "Expected a JSON array or an object with '{}'",
            key
        ))),
    }
}

/// Parse a relation oracle reply
///
/// An unknown relation label or mistyped field is a schema violation.
pub fn parse_relation_answer(response: &str) -> Result<RelationAnswer, LlmError> {
    let value = parse_value(response)?;
    let obj = as_object(&value, "relation")?;

    let label = obj
        .get("relation")
        .and_then(Value::as_str)
        .ok_or_else(|| LlmError::InvalidResponse("Missing or invalid 'relation'".to_string()))?;
    let relation = Relation::parse(label)
        .ok_or_else(|| LlmError::InvalidResponse(format!("Unknown relation '{}'", label)))?;

    let rationale = optional_string(obj, "rationale").map_err(LlmError::InvalidResponse)?;
    let evidence_ids = string_list(obj, "evidence_ids")
        .map_err(LlmError::InvalidResponse)?
        .into_iter()
        .map(EvidenceId::from)
        .collect();

    Ok(RelationAnswer {
        relation,
        rationale,
        evidence_ids,
    })
}

/// Parse a contradiction summary reply
pub fn parse_summary_answer(response: &str) -> Result<SummaryAnswer, LlmError> {
    let value = parse_value(response)?;
    let obj = as_object(&value, "summary")?;

    let summary = optional_string(obj, "summary")
        .map_err(LlmError::InvalidResponse)?
        .ok_or_else(|| LlmError::InvalidResponse("Missing or empty 'summary'".to_string()))?;
    let conditions = optional_string(obj, "conditions").map_err(LlmError::InvalidResponse)?;
    let leaning_claim_id = optional_string(obj, "leaning_claim_id")
        .map_err(LlmError::InvalidResponse)?
        .filter(|id| !id.eq_ignore_ascii_case("null"))
        .map(ClaimId::from);

    Ok(SummaryAnswer {
        summary,
        conditions,
        leaning_claim_id,
    })
}

/// Parse evidence snippets, skipping malformed items
pub fn parse_evidence_items(response: &str) -> Result<Vec<RawEvidence>, LlmError> {
    let value = parse_value(response)?;
    let mut evidence = Vec::new();

    for (idx, item) in list_items(&value, "evidence")?.iter().enumerate() {
        match parse_evidence_json(item) {
            Ok(raw) => evidence.push(raw),
            Err(e) => warn!("Failed to parse evidence item {}: {}", idx, e),
        }
    }

    Ok(evidence)
}

fn parse_evidence_json(json: &Value) -> Result<RawEvidence, String> {
    let obj = json
        .as_object()
        .ok_or_else(|| "Evidence item is not a JSON object".to_string())?;

    let snippet = optional_string(obj, "snippet")?
        .ok_or_else(|| "Missing or empty 'snippet'".to_string())?;
    let reliability = obj
        .get("reliability")
        .and_then(Value::as_f64)
        .map(|r| r.round().clamp(1.0, 5.0) as u8)
        .unwrap_or(3);

    Ok(RawEvidence {
        claim_types: string_list(obj, "claim_types")?,
        snippet,
        context: optional_string(obj, "context")?,
        reliability,
        notes: optional_string(obj, "notes")?,
    })
}

/// Parse candidate claims, skipping malformed items
pub fn parse_candidate_claims(response: &str) -> Result<Vec<CandidateClaim>, LlmError> {
    let value = parse_value(response)?;
    let mut claims = Vec::new();

    for (idx, item) in list_items(&value, "claims")?.iter().enumerate() {
        match parse_claim_json(item) {
            Ok(claim) => claims.push(claim),
            Err(e) => warn!("Failed to parse claim {}: {}", idx, e),
        }
    }

    Ok(claims)
}

fn parse_claim_json(json: &Value) -> Result<CandidateClaim, String> {
    let obj = json
        .as_object()
        .ok_or_else(|| "Claim is not a JSON object".to_string())?;

    let claim_type = optional_string(obj, "claim_type")?
        .ok_or_else(|| "Missing or invalid 'claim_type'".to_string())?;
    let statement = optional_string(obj, "statement")?
        .ok_or_else(|| "Missing or invalid 'statement'".to_string())?;
    let confidence = obj
        .get("confidence")
        .and_then(Value::as_f64)
        .map(|c| c.round().clamp(1.0, 5.0) as u8)
        .unwrap_or(3);

    Ok(CandidateClaim {
        claim_type,
        statement,
        polarity: optional_string(obj, "polarity")?.unwrap_or_default(),
        supported_by: string_list(obj, "supported_by")?
            .into_iter()
            .map(EvidenceId::from)
            .collect(),
        confidence,
    })
}
