//! # Quarry
//!
//! An ephemeral in-memory document store for Rust.
//!
//! ## Features
//!
//! - Text and table documents with free-form metadata
//! - Nested boolean metadata filters with type-aware comparisons
//! - BM25 retrieval (Okapi, BM25L, BM25+) with optional score rescaling
//!
//! ```
//! use quarry::{Document, DocumentStore, DuplicatePolicy};
//! use serde_json::json;
//!
//! let mut store = DocumentStore::new();
//! store.write_documents(
//!     vec![
//!         Document::text("1", "the cat sat").with_meta("type", "article"),
//!         Document::text("2", "the dog ran fast").with_meta("type", "blog"),
//!     ],
//!     DuplicatePolicy::Fail,
//! )?;
//!
//! let articles = store.filter_documents_json(&json!({"type": "article"}))?;
//! assert_eq!(articles.len(), 1);
//!
//! let hits = store.bm25_retrieval("cat", 1, true)?;
//! assert_eq!(hits[0].id(), "1");
//! # Ok::<(), quarry::QuarryError>(())
//! ```

pub mod data;
mod error;
pub mod filter;
pub mod lexical;
pub mod store;

// Re-exports for the public API
pub use data::{Content, ContentType, DataValue, Document, DocumentBuilder, Table};
pub use error::{QuarryError, Result};
pub use filter::{Filter, FilterNode};
pub use lexical::{Bm25Algorithm, Bm25Parameters, Bm25Request};
pub use store::config::DocumentStoreConfig;
pub use store::{DocumentStore, DuplicatePolicy, SharedDocumentStore};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
