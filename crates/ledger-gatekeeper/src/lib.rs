//! Evidence Ledger Gatekeeper
//!
//! Decides what input is allowed into a ledger at all.
//!
//! The Gatekeeper provides:
//! - URL canonicalization and search result deduplication
//! - Source type inference and per-type source weighting
//! - Evidence verification (exact or fuzzy) against extracted source text
//! - Thin-text reliability downweighting
//!
//! # Examples
//!
//! ```
//! use ledger_gatekeeper::{EvidenceVerifier, VerificationConfig};
//!
//! let verifier = EvidenceVerifier::new(VerificationConfig::default());
//! let result = verifier.verify("Data  QUALITY matters", "In practice, data quality matters most.");
//! assert!(result.verified);
//! assert_eq!(result.score, 1.0);
//! ```

#![warn(missing_docs)]

mod config;
mod error;
pub mod url;
mod verifier;

pub use config::VerificationConfig;
pub use error::GatekeeperError;
pub use crate::url::{
    canonicalize_url, dedupe_search_results, domain_of, infer_source_type, CanonicalRecord,
    DedupeOutcome, SearchResult, SkippedRecord,
};
pub use verifier::{normalize_text, EvidenceVerifier, RejectionReason, Verification};
