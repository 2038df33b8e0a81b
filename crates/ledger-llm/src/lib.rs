//! Evidence Ledger LLM Layer
//!
//! Pluggable LLM providers and the model-backed oracles built on them.
//!
//! # Architecture
//!
//! This crate provides implementations of the `LlmProvider` trait from
//! `ledger-domain`, and adapters that turn any provider into an
//! `ExtractionOracle`, `RelationOracle` or `SummaryOracle` by building a
//! prompt and parsing the JSON reply.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic mock for testing
//! - `OllamaProvider`: Local Ollama API integration
//!
//! # Examples
//!
//! ```
//! use ledger_llm::MockProvider;
//! use ledger_domain::traits::LlmProvider;
//!
//! let provider = MockProvider::new("Hello from LLM!");
//! let result = provider.generate("test prompt").unwrap();
//! assert_eq!(result, "Hello from LLM!");
//! ```

#![warn(missing_docs)]

pub mod ollama;
pub mod oracles;
pub mod parser;
pub mod prompt;

use ledger_domain::traits::LlmProvider as LlmProviderTrait;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

pub use ollama::OllamaProvider;
pub use oracles::{LlmExtractionOracle, LlmRelationOracle, LlmSummaryOracle};

/// Errors that can occur during LLM operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Error surfaced by the underlying provider
    #[error("Provider error: {0}")]
    Provider(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

#[derive(Debug, Clone)]
enum PromptMatch {
    Exact(String),
    Contains(String),
}

impl PromptMatch {
    fn matches(&self, prompt: &str) -> bool {
        match self {
            PromptMatch::Exact(p) => p == prompt,
            PromptMatch::Contains(fragment) => prompt.contains(fragment.as_str()),
        }
    }
}

#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Error,
}

#[derive(Debug, Default)]
struct MockState {
    rules: Vec<(PromptMatch, MockReply)>,
    prompts: Vec<String>,
}

/// Mock LLM provider for deterministic testing
///
/// Returns pre-configured responses without making any network calls. Rules
/// are checked in insertion order; the first match wins, otherwise the
/// default response is returned. Clones share state.
///
/// # Examples
///
/// ```
/// use ledger_llm::MockProvider;
/// use ledger_domain::traits::LlmProvider;
///
/// // Simple fixed response
/// let provider = MockProvider::new("Fixed response");
/// assert_eq!(provider.generate("any prompt").unwrap(), "Fixed response");
///
/// // Per-prompt responses
/// let mut provider = MockProvider::default();
/// provider.add_response("prompt1", "response1");
/// provider.add_response_containing("Claim A", r#"{"relation": "unrelated"}"#);
/// assert_eq!(provider.generate("prompt1").unwrap(), "response1");
/// assert!(provider.generate("... Claim A: x ...").unwrap().contains("unrelated"));
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // Poisoning only means another clone panicked mid-call
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a response for an exact prompt
    pub fn add_response(&mut self, prompt: impl Into<String>, response: impl Into<String>) {
        self.state().rules.push((
            PromptMatch::Exact(prompt.into()),
            MockReply::Text(response.into()),
        ));
    }

    /// Add a response for any prompt containing `fragment`
    pub fn add_response_containing(
        &mut self,
        fragment: impl Into<String>,
        response: impl Into<String>,
    ) {
        self.state().rules.push((
            PromptMatch::Contains(fragment.into()),
            MockReply::Text(response.into()),
        ));
    }

    /// Configure to return an error for a specific prompt
    pub fn add_error(&mut self, prompt: impl Into<String>) {
        self.state()
            .rules
            .push((PromptMatch::Exact(prompt.into()), MockReply::Error));
    }

    /// Configure to return an error for any prompt containing `fragment`
    pub fn add_error_containing(&mut self, fragment: impl Into<String>) {
        self.state()
            .rules
            .push((PromptMatch::Contains(fragment.into()), MockReply::Error));
    }

    /// Get the number of times generate was called
    pub fn call_count(&self) -> usize {
        self.state().prompts.len()
    }

    /// Prompts received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.state().prompts.clone()
    }

    /// Reset the call count
    pub fn reset_call_count(&self) {
        self.state().prompts.clear();
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

impl LlmProviderTrait for MockProvider {
    type Error = LlmError;

    fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        let mut state = self.state();
        state.prompts.push(prompt.to_string());

        let reply = state
            .rules
            .iter()
            .find(|(matcher, _)| matcher.matches(prompt))
            .map(|(_, reply)| reply.clone());

        match reply {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Error) => Err(LlmError::Other("Mock error".to_string())),
            None => Ok(self.default_response.clone()),
        }
    }

    fn generate_structured(&self, prompt: &str, _schema: &str) -> Result<String, Self::Error> {
        self.generate(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_provider_default() {
        let provider = MockProvider::new("Test response");
        let result = provider.generate("any prompt");
        assert_eq!(result, Ok("Test response".to_string()));
    }

    #[test]
    fn test_mock_provider_specific_responses() {
        let mut provider = MockProvider::default();
        provider.add_response("hello", "world");
        provider.add_response("foo", "bar");

        assert_eq!(provider.generate("hello").unwrap(), "world");
        assert_eq!(provider.generate("foo").unwrap(), "bar");
        assert_eq!(
            provider.generate("unknown").unwrap(),
            "Default mock response"
        );
    }

    #[test]
    fn test_mock_provider_first_matching_rule_wins() {
        let mut provider = MockProvider::default();
        provider.add_response_containing("C1", "first");
        provider.add_response_containing("C2", "second");

        assert_eq!(provider.generate("pair C1 and C2").unwrap(), "first");
        assert_eq!(provider.generate("pair C2 and C3").unwrap(), "second");
    }

    #[test]
    fn test_mock_provider_call_count() {
        let provider = MockProvider::new("test");

        assert_eq!(provider.call_count(), 0);

        provider.generate("prompt1").unwrap();
        assert_eq!(provider.call_count(), 1);

        provider.generate("prompt2").unwrap();
        assert_eq!(provider.call_count(), 2);
        assert_eq!(provider.prompts(), vec!["prompt1", "prompt2"]);

        provider.reset_call_count();
        assert_eq!(provider.call_count(), 0);
    }

    #[test]
    fn test_mock_provider_error() {
        let mut provider = MockProvider::default();
        provider.add_error("bad prompt");
        provider.add_error_containing("timeout");

        assert!(matches!(
            provider.generate("bad prompt"),
            Err(LlmError::Other(_))
        ));
        assert!(provider.generate("simulate a timeout here").is_err());
        assert!(provider.generate("fine").is_ok());
    }

    #[test]
    fn test_mock_provider_structured() {
        let provider = MockProvider::new("structured response");
        let result = provider.generate_structured("prompt", "schema");
        assert_eq!(result, Ok("structured response".to_string()));
    }

    #[test]
    fn test_mock_provider_clone_shares_state() {
        let provider1 = MockProvider::new("test");
        let provider2 = provider1.clone();

        provider1.generate("test").unwrap();

        assert_eq!(provider1.call_count(), 1);
        assert_eq!(provider2.call_count(), 1);
    }
}
