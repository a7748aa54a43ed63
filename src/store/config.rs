use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::lexical::bm25::{Bm25Algorithm, Bm25Parameters};
use crate::lexical::tokenizer::{DEFAULT_TOKENIZATION_REGEX, RegexTokenizer};

/// Configuration for a [`DocumentStore`](crate::DocumentStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentStoreConfig {
    /// Pattern whose matches are the BM25 terms.
    pub tokenization_regex: String,
    /// BM25 variant used for retrieval.
    pub algorithm: Bm25Algorithm,
    /// Free BM25 parameters passed to the model.
    pub parameters: Bm25Parameters,
}

impl DocumentStoreConfig {
    pub fn new() -> Self {
        Self {
            tokenization_regex: DEFAULT_TOKENIZATION_REGEX.to_string(),
            algorithm: Bm25Algorithm::default(),
            parameters: Bm25Parameters::default(),
        }
    }

    pub fn builder() -> DocumentStoreConfigBuilder {
        DocumentStoreConfigBuilder::default()
    }

    /// Check the regex compiles and the parameters are usable.
    pub fn validate(&self) -> Result<()> {
        self.build_tokenizer().map(|_| ())
    }

    /// Validate the configuration and compile its tokenizer.
    pub(crate) fn build_tokenizer(&self) -> Result<RegexTokenizer> {
        self.parameters.validate()?;
        RegexTokenizer::new(&self.tokenization_regex)
    }
}

impl Default for DocumentStoreConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
pub struct DocumentStoreConfigBuilder {
    config: DocumentStoreConfig,
}

impl DocumentStoreConfigBuilder {
    pub fn tokenization_regex(mut self, regex: impl Into<String>) -> Self {
        self.config.tokenization_regex = regex.into();
        self
    }

    pub fn algorithm(mut self, algorithm: Bm25Algorithm) -> Self {
        self.config.algorithm = algorithm;
        self
    }

    pub fn parameters(mut self, parameters: Bm25Parameters) -> Self {
        self.config.parameters = parameters;
        self
    }

    pub fn build(self) -> DocumentStoreConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = DocumentStoreConfig::default();
        assert_eq!(config.tokenization_regex, r"(?u)\b\w\w+\b");
        assert_eq!(config.algorithm, Bm25Algorithm::Okapi);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_json() {
        let config: DocumentStoreConfig = serde_json::from_value(json!({
            "algorithm": "BM25Plus",
            "parameters": {"k1": 1.2, "delta": 0.8}
        }))
        .unwrap();
        assert_eq!(config.algorithm, Bm25Algorithm::BM25Plus);
        assert_eq!(config.parameters.k1, Some(1.2));
        assert_eq!(config.parameters.b, None);
        assert_eq!(config.tokenization_regex, DEFAULT_TOKENIZATION_REGEX);

        let bad: std::result::Result<DocumentStoreConfig, _> =
            serde_json::from_value(json!({"algorithm": "BM99"}));
        assert!(bad.is_err());
    }

    #[test]
    fn test_builder_and_validation() {
        let config = DocumentStoreConfig::builder()
            .tokenization_regex(r"\w+")
            .algorithm(Bm25Algorithm::BM25L)
            .parameters(Bm25Parameters::default().b(0.5))
            .build();
        assert!(config.validate().is_ok());

        let config = DocumentStoreConfig::builder()
            .tokenization_regex("[")
            .build();
        assert!(config.validate().is_err());
    }
}
