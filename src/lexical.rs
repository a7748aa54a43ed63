//! Lexical (keyword-based) retrieval.
//!
//! # Module Structure
//!
//! - `tokenizer`: text to terms
//! - `bm25`: BM25 Okapi / L / Plus ranking models
//! - `retrieval`: corpus building, scoring, rescaling and top-k selection

pub mod bm25;
pub mod retrieval;
pub mod tokenizer;

// Re-exports
pub use bm25::{Bm25Algorithm, Bm25Index, Bm25Parameters, ScoringModel};
pub use retrieval::{Bm25Request, Bm25RequestBuilder};
pub use tokenizer::{RegexTokenizer, Tokenizer};
