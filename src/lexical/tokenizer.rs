//! Tokenizers for BM25 corpus building.

use std::fmt::Debug;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{QuarryError, Result};

/// Default token pattern: runs of two or more word characters.
pub const DEFAULT_TOKENIZATION_REGEX: &str = r"(?u)\b\w\w+\b";

lazy_static! {
    static ref DEFAULT_PATTERN: Regex = Regex::new(DEFAULT_TOKENIZATION_REGEX)
        .expect("default tokenization regex is valid");
}

/// Splits text into terms. Callers pass already lowercased text.
pub trait Tokenizer: Send + Sync + Debug {
    fn tokenize(&self, text: &str) -> Vec<String>;

    /// Get the name of this tokenizer (for debugging and configuration).
    fn name(&self) -> &'static str;
}

/// Tokenizer that emits every match of a regular expression.
#[derive(Debug, Clone)]
pub struct RegexTokenizer {
    pattern: Regex,
}

impl RegexTokenizer {
    /// Create a tokenizer from a pattern string.
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|e| {
            QuarryError::invalid_config(format!("invalid tokenization regex '{pattern}': {e}"))
        })?;
        Ok(Self { pattern })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

impl Default for RegexTokenizer {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.clone(),
        }
    }
}

impl Tokenizer for RegexTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        self.pattern
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    fn name(&self) -> &'static str {
        "regex"
    }
}
