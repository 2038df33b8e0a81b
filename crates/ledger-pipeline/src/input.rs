//! Run input and the recorded run bundle
//!
//! A bundle carries the recorded outputs of the collaborators the core does
//! not own: the plan, search results, fetched page text, and the extraction
//! model's evidence items and claim proposals. Replaying a bundle through
//! [`RecordedExtractionOracle`] makes a run fully offline and repeatable.

use crate::PipelineError;
use ledger_domain::{CandidateClaim, EvidenceCard, ExtractionOracle, ExtractionRequest, RawEvidence};
use ledger_gatekeeper::{canonicalize_url, SearchResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// Extracted text of one fetched page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Page URL, matched to sources after canonicalization
    pub url: String,
    /// Extracted plain text
    pub text: String,
}

/// Evidence items recorded for one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedExtraction {
    /// Page URL
    pub url: String,
    /// Raw evidence items, in extraction order
    #[serde(default)]
    pub evidence: Vec<RawEvidence>,
}

/// What the pipeline consumes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunInput {
    /// Research prompt
    pub prompt: String,
    /// Opaque research plan
    pub plan: serde_json::Value,
    /// Raw search results
    pub search_results: Vec<SearchResult>,
    /// Fetched page text
    pub documents: Vec<Document>,
}

/// A recorded research run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunBundle {
    /// Research prompt
    pub prompt: String,
    /// Opaque research plan
    #[serde(default)]
    pub plan: serde_json::Value,
    /// Raw search results
    #[serde(default)]
    pub search_results: Vec<SearchResult>,
    /// Fetched page text
    #[serde(default)]
    pub documents: Vec<Document>,
    /// Recorded evidence extraction, per page
    #[serde(default)]
    pub extractions: Vec<RecordedExtraction>,
    /// Recorded claim proposals
    #[serde(default)]
    pub claims: Vec<CandidateClaim>,
}

impl RunBundle {
    /// Parse a bundle from JSON
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a bundle file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Pipeline input, without the recorded oracle outputs
    pub fn input(&self) -> RunInput {
        RunInput {
            prompt: self.prompt.clone(),
            plan: self.plan.clone(),
            search_results: self.search_results.clone(),
            documents: self.documents.clone(),
        }
    }

    /// Split into pipeline input and a replaying extraction oracle
    pub fn into_parts(self) -> (RunInput, RecordedExtractionOracle) {
        let input = self.input();
        let oracle = RecordedExtractionOracle::new(self.extractions, self.claims);
        (input, oracle)
    }
}

/// Extraction oracle replaying recorded output
///
/// Evidence is looked up by canonical page URL; a page with no recording
/// yields no evidence. Claim proposals are returned as recorded.
#[derive(Debug, Clone, Default)]
pub struct RecordedExtractionOracle {
    evidence: HashMap<String, Vec<RawEvidence>>,
    claims: Vec<CandidateClaim>,
}

impl RecordedExtractionOracle {
    /// Index recordings by canonical URL
    ///
    /// Recordings with unusable URLs are skipped; repeated URLs append.
    pub fn new(extractions: Vec<RecordedExtraction>, claims: Vec<CandidateClaim>) -> Self {
        let mut evidence: HashMap<String, Vec<RawEvidence>> = HashMap::new();
        for extraction in extractions {
            match canonicalize_url(&extraction.url) {
                Ok(url) => evidence.entry(url).or_default().extend(extraction.evidence),
                Err(e) => warn!("Ignoring recorded extraction: {}", e),
            }
        }
        Self { evidence, claims }
    }
}

impl ExtractionOracle for RecordedExtractionOracle {
    type Error = String;

    fn extract_evidence(&self, request: &ExtractionRequest) -> Result<Vec<RawEvidence>, String> {
        let items = self
            .evidence
            .get(&request.source.url)
            .cloned()
            .unwrap_or_default();
        debug!("Replaying {} evidence items for {}", items.len(), request.source.url);
        Ok(items)
    }

    fn propose_claims(
        &self,
        _prompt: &str,
        _evidence: &[EvidenceCard],
    ) -> Result<Vec<CandidateClaim>, String> {
        Ok(self.claims.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_domain::{Source, SourceId, SourceType};

    const BUNDLE: &str = r#"{
        "prompt": "Is synthetic data safe for training?",
        "plan": {"angles": ["quality", "privacy"]},
        "search_results": [
            {"url": "https://example.org/a/?utm_source=feed", "title": "A"}
        ],
        "documents": [
            {"url": "https://example.org/a", "text": "Synthetic data improves recall."}
        ],
        "extractions": [
            {"url": "https://EXAMPLE.org/a#intro", "evidence": [
                {"snippet": "Synthetic data improves recall.", "claim_types": ["data_quality"], "reliability": 4}
            ]},
            {"url": "not a url", "evidence": []}
        ],
        "claims": [
            {"claim_type": "data_quality", "statement": "Synthetic data improves recall", "polarity": "pro", "supported_by": ["E1"], "confidence": 4}
        ]
    }"#;

    fn source(url: &str) -> Source {
        Source {
            id: SourceId::nth(1),
            url: url.to_string(),
            title: "A".to_string(),
            author: None,
            date: None,
            source_type: SourceType::Other,
            publisher: None,
            domain: "example.org".to_string(),
            provider: None,
            weight: 0.5,
        }
    }

    #[test]
    fn test_parse_bundle() {
        let bundle = RunBundle::from_json(BUNDLE).unwrap();
        assert_eq!(bundle.search_results.len(), 1);
        assert_eq!(bundle.documents.len(), 1);
        assert_eq!(bundle.claims[0].confidence, 4);
        assert_eq!(bundle.plan["angles"][1], "privacy");
    }

    #[test]
    fn test_minimal_bundle() {
        let bundle = RunBundle::from_json(r#"{"prompt": "p"}"#).unwrap();
        assert!(bundle.plan.is_null());
        assert!(bundle.extractions.is_empty());
    }

    #[test]
    fn test_invalid_bundle() {
        assert!(matches!(
            RunBundle::from_json("{\"plan\": {}}"),
            Err(PipelineError::Json(_))
        ));
    }

    #[test]
    fn test_recorded_oracle_matches_canonical_url() {
        let (input, oracle) = RunBundle::from_json(BUNDLE).unwrap().into_parts();
        assert_eq!(input.prompt, "Is synthetic data safe for training?");

        let request = ExtractionRequest {
            prompt: input.prompt.clone(),
            source: source("https://example.org/a"),
            text: String::new(),
        };
        let items = oracle.extract_evidence(&request).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].reliability, 4);

        let request = ExtractionRequest {
            source: source("https://example.org/b"),
            ..request
        };
        assert!(oracle.extract_evidence(&request).unwrap().is_empty());
        assert_eq!(oracle.propose_claims("", &[]).unwrap().len(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let result = RunBundle::load("/definitely/not/here.json");
        assert!(matches!(result, Err(PipelineError::Io(_))));
    }
}
