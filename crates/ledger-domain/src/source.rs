//! Source module - canonical web sources cited by evidence

use crate::ids::SourceId;
use serde::{Deserialize, Serialize};

/// Kind of publication a source is
///
/// The type drives the reliability multiplier applied to every evidence card
/// drawn from the source:
/// - Paper: peer-reviewed publication
/// - Preprint: arXiv and similar, not yet reviewed
/// - Report: institutional, government or academic reports
/// - Documentation: vendor or project documentation
/// - Blog / News: editorial content
/// - Other: anything unrecognised
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Peer-reviewed paper
    Paper,
    /// Preprint server article
    Preprint,
    /// Blog post
    Blog,
    /// Institutional report
    Report,
    /// Product or project documentation
    Documentation,
    /// News article
    News,
    /// Unclassified
    #[default]
    Other,
}

impl SourceType {
    /// Every source type, in declaration order
    pub const ALL: [SourceType; 7] = [
        SourceType::Paper,
        SourceType::Preprint,
        SourceType::Blog,
        SourceType::Report,
        SourceType::Documentation,
        SourceType::News,
        SourceType::Other,
    ];

    /// Get the source type name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Paper => "paper",
            SourceType::Preprint => "preprint",
            SourceType::Blog => "blog",
            SourceType::Report => "report",
            SourceType::Documentation => "documentation",
            SourceType::News => "news",
            SourceType::Other => "other",
        }
    }

    /// Parse a source type, accepting a few common spellings
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "paper" | "journal" | "conference" => Some(SourceType::Paper),
            "preprint" | "arxiv" => Some(SourceType::Preprint),
            "blog" | "post" => Some(SourceType::Blog),
            "report" | "whitepaper" => Some(SourceType::Report),
            "documentation" | "docs" | "doc" => Some(SourceType::Documentation),
            "news" | "article" => Some(SourceType::News),
            "other" => Some(SourceType::Other),
            _ => None,
        }
    }
}

impl std::str::FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid source type: {}", s))
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A canonical source, one per normalized URL
///
/// Sources are created once during URL deduplication. Only metadata
/// enrichment (richer record wins) happens before ids are assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Sequential id (`S1..`)
    pub id: SourceId,

    /// Canonical URL
    pub url: String,

    /// Page or publication title
    pub title: String,

    /// Author, when the search record carried one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Publication date as reported by the search provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    /// Publication kind
    #[serde(rename = "type")]
    pub source_type: SourceType,

    /// Publisher or venue
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,

    /// Lower-cased host of the canonical URL
    pub domain: String,

    /// Search provider that surfaced the record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Reliability multiplier for this source's type
    pub weight: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_type_parse_roundtrip() {
        for source_type in SourceType::ALL {
            assert_eq!(SourceType::parse(source_type.as_str()), Some(source_type));
        }
    }

    #[test]
    fn test_source_type_aliases() {
        assert_eq!("arXiv".parse::<SourceType>(), Ok(SourceType::Preprint));
        assert_eq!(SourceType::parse(" Docs "), Some(SourceType::Documentation));
        assert!(SourceType::parse("podcast").is_none());
    }

    #[test]
    fn test_source_serializes_type_field() {
        let source = Source {
            id: SourceId::nth(1),
            url: "https://arxiv.org/abs/1234".to_string(),
            title: "A study".to_string(),
            author: None,
            date: None,
            source_type: SourceType::Preprint,
            publisher: None,
            domain: "arxiv.org".to_string(),
            provider: Some("tavily".to_string()),
            weight: 0.9,
        };

        let value = serde_json::to_value(&source).unwrap();
        assert_eq!(value["type"], "preprint");
        assert_eq!(value["id"], "S1");
        assert!(value.get("author").is_none());
    }
}
