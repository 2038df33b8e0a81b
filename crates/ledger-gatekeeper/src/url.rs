//! URL canonicalization and search result deduplication
//!
//! Search providers return the same page under many spellings: tracking
//! parameters, fragments, trailing slashes, upper-case hosts, explicit default
//! ports. Two records describe the same source iff their canonical URL strings
//! are identical.

use crate::GatekeeperError;
use ledger_domain::SourceType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};
use ::url::{form_urlencoded, Url};

/// Query parameters that only carry tracking information
const TRACKING_PARAMS: &[&str] = &["ref", "ref_src", "fbclid", "gclid", "mc_cid", "mc_eid"];

/// A raw record returned by a search provider
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchResult {
    /// URL as returned by the provider
    pub url: String,
    /// Result title
    #[serde(default)]
    pub title: String,
    /// Result snippet
    #[serde(default)]
    pub snippet: String,
    /// Author
    #[serde(default)]
    pub author: Option<String>,
    /// Publication date
    #[serde(default)]
    pub date: Option<String>,
    /// Declared source type label
    #[serde(default)]
    pub source_type: Option<String>,
    /// Publisher or venue
    #[serde(default)]
    pub publisher: Option<String>,
    /// Search provider name
    #[serde(default)]
    pub provider: Option<String>,
}

impl SearchResult {
    /// Number of populated optional metadata fields
    pub fn metadata_richness(&self) -> usize {
        [
            &self.author,
            &self.date,
            &self.source_type,
            &self.publisher,
            &self.provider,
        ]
        .iter()
        .filter(|field| field.as_deref().is_some_and(|v| !v.trim().is_empty()))
        .count()
    }

    /// Whether `self` should replace `existing` on a canonical URL collision
    fn is_richer_than(&self, existing: &SearchResult) -> bool {
        let mine = self.metadata_richness();
        let theirs = existing.metadata_richness();
        if mine != theirs {
            return mine > theirs;
        }
        self.title.chars().count() > existing.title.chars().count()
    }
}

/// A search result that survived deduplication
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    /// Canonical URL
    pub url: String,
    /// Lower-cased host
    pub domain: String,
    /// Winning record for this URL
    pub record: SearchResult,
}

/// A search result dropped because its URL is unusable
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRecord {
    /// URL as given
    pub url: String,
    /// Why it was dropped
    pub reason: GatekeeperError,
}

/// Outcome of deduplicating a batch of search results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupeOutcome {
    /// One record per canonical URL, in first-occurrence order
    pub records: Vec<CanonicalRecord>,
    /// Records with malformed URLs
    pub skipped: Vec<SkippedRecord>,
}

/// Normalize a URL into its canonical string form
///
/// Lower-cases scheme and host, strips default ports, tracking parameters,
/// fragments and trailing slashes, and sorts the remaining query parameters.
/// Only `http` and `https` URLs with a host are accepted.
///
/// # Examples
///
/// ```
/// use ledger_gatekeeper::canonicalize_url;
///
/// let canon = canonicalize_url("HTTPS://Example.com:443/a/?utm_source=x&b=2&a=1#top").unwrap();
/// assert_eq!(canon, "https://example.com/a?a=1&b=2");
/// ```
pub fn canonicalize_url(raw: &str) -> Result<String, GatekeeperError> {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed).map_err(|e| GatekeeperError::MalformedUrl {
        url: trimmed.to_string(),
        reason: e.to_string(),
    })?;

    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(GatekeeperError::UnsupportedScheme {
            url: trimmed.to_string(),
            scheme: scheme.to_string(),
        });
    }

    let host = match parsed.host_str() {
        Some(host) if !host.is_empty() => host.to_lowercase(),
        _ => return Err(GatekeeperError::MissingHost(trimmed.to_string())),
    };

    let mut canonical = format!("{}://{}", scheme, host);
    // `port()` is None when the port is the scheme default
    if let Some(port) = parsed.port() {
        canonical.push(':');
        canonical.push_str(&port.to_string());
    }
    canonical.push_str(parsed.path().trim_end_matches('/'));

    let mut params: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    if !params.is_empty() {
        params.sort();
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params.iter())
            .finish();
        canonical.push('?');
        canonical.push_str(&query);
    }

    Ok(canonical)
}

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}

/// Lower-cased host of a URL, empty when it has none
pub fn domain_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_default()
}

/// Deduplicate search results by canonical URL
///
/// On collision the record with strictly more populated metadata wins, then
/// the one with the strictly longer title; otherwise the earlier record stays.
/// The winner takes the position of the first occurrence.
pub fn dedupe_search_results(results: &[SearchResult]) -> DedupeOutcome {
    let mut outcome = DedupeOutcome::default();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for result in results {
        let canonical = match canonicalize_url(&result.url) {
            Ok(canonical) => canonical,
            Err(reason) => {
                warn!("Skipping search result: {}", reason);
                outcome.skipped.push(SkippedRecord {
                    url: result.url.clone(),
                    reason,
                });
                continue;
            }
        };

        match positions.get(&canonical) {
            Some(&index) => {
                let existing = &mut outcome.records[index];
                if result.is_richer_than(&existing.record) {
                    debug!("Richer metadata replaces record for {}", canonical);
                    existing.record = result.clone();
                }
            }
            None => {
                positions.insert(canonical.clone(), outcome.records.len());
                outcome.records.push(CanonicalRecord {
                    domain: domain_of(&canonical),
                    url: canonical,
                    record: result.clone(),
                });
            }
        }
    }

    outcome
}

/// Determine a source's type from its declared label or its URL
///
/// A declared type other than `other` wins. Otherwise arXiv hosts are
/// preprints, blog platforms are blogs, news hosts are news, documentation
/// paths are documentation and `.gov`/`.edu` hosts are reports.
pub fn infer_source_type(url: &str, declared: Option<&str>) -> SourceType {
    if let Some(declared) = declared.and_then(SourceType::parse) {
        if declared != SourceType::Other {
            return declared;
        }
    }

    let domain = domain_of(url);
    let lowered = url.to_lowercase();
    let domain_has = |tokens: &[&str]| tokens.iter().any(|t| domain.contains(t));

    if domain_has(&["arxiv.org"]) {
        SourceType::Preprint
    } else if domain_has(&["medium.com", "substack.com", "blog"]) {
        SourceType::Blog
    } else if domain_has(&["news", "nytimes", "reuters", "bbc", "cnn"]) {
        SourceType::News
    } else if ["/docs/", "/documentation/", "/manual/"]
        .iter()
        .any(|t| lowered.contains(t))
    {
        SourceType::Documentation
    } else if domain.ends_with(".gov") || domain.ends_with(".edu") {
        SourceType::Report
    } else {
        SourceType::Other
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: trailing slash, fragment and tracking parameters never change the canonical form
        #[test]
        fn test_canonical_form_ignores_noise(
            host in "[a-z]{1,10}\\.(com|org|net)",
            segments in proptest::collection::vec("[a-z0-9]{1,8}", 0..4),
            fragment in "[a-z]{0,6}",
            tracker in "[a-z0-9]{1,6}",
        ) {
            let path = segments.join("/");
            let base = format!("https://{}/{}", host, path);
            let noisy = format!("https://{}/{}/?utm_source={}&gclid={}#{}", host.to_uppercase(), path, tracker, tracker, fragment);

            let a = canonicalize_url(&base);
            let b = canonicalize_url(&noisy);
            prop_assert!(a.is_ok());
            prop_assert_eq!(a, b);
        }

        /// Property: canonicalization is idempotent
        #[test]
        fn test_canonicalize_idempotent(
            host in "[a-z]{1,10}\\.org",
            path in "(/[a-z]{1,5}){0,3}/?",
            key in "[a-z]{1,4}",
            value in "[a-z0-9]{0,4}",
        ) {
            let once = canonicalize_url(&format!("http://{}{}?{}={}", host, path, key, value));
            prop_assert!(once.is_ok());
            if let Ok(once) = once {
                prop_assert_eq!(canonicalize_url(&once), Ok(once.clone()));
            }
        }
    }
}
