//! In-memory document store.
//!
//! [`DocumentStore`] owns an ID-to-document mapping. It is ephemeral: nothing
//! is persisted and all state is dropped with the store. It carries no
//! internal lock; share it across threads through [`SharedDocumentStore`].

pub mod config;

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use log::{trace, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::data::Document;
use crate::error::{QuarryError, Result};
use crate::filter::Filter;
use crate::lexical::retrieval::{self, Bm25Request};
use crate::lexical::tokenizer::{RegexTokenizer, Tokenizer};

use self::config::DocumentStoreConfig;

/// A store behind a reader-writer lock: one writer or many readers at a time.
pub type SharedDocumentStore = Arc<RwLock<DocumentStore>>;

/// What to do when a written document's ID is already stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Keep the stored document and ignore the new one.
    Skip,
    /// Replace the stored document.
    Overwrite,
    /// Fail with [`QuarryError::DuplicateDocument`].
    #[default]
    Fail,
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DuplicatePolicy::Skip => "skip",
            DuplicatePolicy::Overwrite => "overwrite",
            DuplicatePolicy::Fail => "fail",
        })
    }
}

impl FromStr for DuplicatePolicy {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "skip" => Ok(DuplicatePolicy::Skip),
            "overwrite" => Ok(DuplicatePolicy::Overwrite),
            "fail" => Ok(DuplicatePolicy::Fail),
            other => Err(QuarryError::invalid_config(format!(
                "unknown duplicate policy '{other}'"
            ))),
        }
    }
}

/// Ephemeral in-memory document store with metadata filtering and BM25
/// retrieval.
#[derive(Debug)]
pub struct DocumentStore {
    /// Documents keyed by ID. Iteration follows ID order.
    storage: BTreeMap<String, Document>,
    config: DocumentStoreConfig,
    tokenizer: Arc<dyn Tokenizer>,
}

impl DocumentStore {
    /// Create an empty store with the default configuration.
    pub fn new() -> Self {
        Self {
            storage: BTreeMap::new(),
            config: DocumentStoreConfig::default(),
            tokenizer: Arc::new(RegexTokenizer::default()),
        }
    }

    /// Create an empty store from a configuration.
    ///
    /// Fails with [`QuarryError::InvalidConfig`] if the configuration does not
    /// validate.
    pub fn with_config(config: DocumentStoreConfig) -> Result<Self> {
        let tokenizer = config.build_tokenizer()?;
        Ok(Self {
            storage: BTreeMap::new(),
            config,
            tokenizer: Arc::new(tokenizer),
        })
    }

    /// Replace the tokenizer used for BM25 corpus and query terms.
    ///
    /// The custom tokenizer takes precedence over the configured
    /// `tokenization_regex`, which is left as it was. Use [`Self::tokenizer`]
    /// to see what retrieval actually uses.
    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Wrap the store for shared multi-threaded access.
    pub fn into_shared(self) -> SharedDocumentStore {
        Arc::new(RwLock::new(self))
    }

    /// The configuration the store was created with. Its
    /// `tokenization_regex` does not reflect a tokenizer set through
    /// [`Self::with_tokenizer`].
    pub fn config(&self) -> &DocumentStoreConfig {
        &self.config
    }

    /// The tokenizer retrieval uses.
    pub fn tokenizer(&self) -> &dyn Tokenizer {
        self.tokenizer.as_ref()
    }

    /// Number of stored documents.
    pub fn count_documents(&self) -> usize {
        self.storage.len()
    }

    /// Look up a document by ID.
    pub fn get_document(&self, id: &str) -> Option<&Document> {
        self.storage.get(id)
    }

    /// Documents matching `filter`, in storage order. The empty filter
    /// returns every document.
    pub fn filter_documents(&self, filter: &Filter) -> Result<Vec<Document>> {
        Ok(self.matching(filter)?.into_iter().cloned().collect())
    }

    /// Parse a JSON filter expression and apply it.
    pub fn filter_documents_json(&self, expression: &serde_json::Value) -> Result<Vec<Document>> {
        self.filter_documents(&Filter::parse(expression)?)
    }

    pub(crate) fn matching(&self, filter: &Filter) -> Result<Vec<&Document>> {
        if filter.is_empty() {
            return Ok(self.storage.values().collect());
        }
        let mut matched = Vec::new();
        for document in self.storage.values() {
            if filter.matches(document)? {
                matched.push(document);
            }
        }
        Ok(matched)
    }

    /// Write documents, resolving ID conflicts with `policy`.
    ///
    /// Every document is validated before anything is written. Writes then
    /// happen in order; under [`DuplicatePolicy::Fail`] the first conflict
    /// aborts the call, and documents written before it stay written.
    ///
    /// Returns the number of documents inserted or overwritten.
    pub fn write_documents<I>(&mut self, documents: I, policy: DuplicatePolicy) -> Result<usize>
    where
        I: IntoIterator<Item = Document>,
    {
        let documents: Vec<Document> = documents.into_iter().collect();
        for document in &documents {
            document.validate()?;
        }

        let mut written = 0;
        for document in documents {
            match self.storage.entry(document.id().to_string()) {
                Entry::Vacant(entry) => {
                    entry.insert(document);
                    written += 1;
                }
                Entry::Occupied(mut entry) => match policy {
                    DuplicatePolicy::Fail => {
                        return Err(QuarryError::duplicate_document(entry.key().clone()));
                    }
                    DuplicatePolicy::Skip => {
                        warn!("ID '{}' already exists, skipping", entry.key());
                    }
                    DuplicatePolicy::Overwrite => {
                        entry.insert(document);
                        written += 1;
                    }
                },
            }
        }

        trace!("wrote {written} documents (policy: {policy})");
        Ok(written)
    }

    /// Write documents from a JSON array.
    ///
    /// Fails with [`QuarryError::Validation`] before any write if the input is
    /// not an array or any element is not a well-formed document.
    pub fn write_documents_json(
        &mut self,
        documents: &serde_json::Value,
        policy: DuplicatePolicy,
    ) -> Result<usize> {
        let items = documents
            .as_array()
            .ok_or_else(|| QuarryError::validation("Please provide a list of Documents."))?;
        let documents = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                Document::deserialize(item).map_err(|e| {
                    QuarryError::validation(format!(
                        "element {index} is not a valid document: {e}"
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.write_documents(documents, policy)
    }

    /// Delete documents by ID.
    ///
    /// Stops at the first ID that is not stored with
    /// [`QuarryError::MissingDocument`]; deletions before it stay applied.
    pub fn delete_documents<I, S>(&mut self, ids: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut deleted = 0usize;
        for id in ids {
            let id = id.as_ref();
            if self.storage.remove(id).is_none() {
                return Err(QuarryError::missing_document(id));
            }
            deleted += 1;
        }
        trace!("deleted {deleted} documents");
        Ok(())
    }

    /// Rank text and table documents against `query` with BM25.
    ///
    /// Returns at most `top_k` scored copies in descending score order. With
    /// `scale_score`, scores are mapped into (0, 1) by `sigmoid(score / 8)`.
    pub fn bm25_retrieval(
        &self,
        query: &str,
        top_k: usize,
        scale_score: bool,
    ) -> Result<Vec<Document>> {
        let request = Bm25Request::builder(query)
            .top_k(top_k)
            .scale_score(scale_score)
            .build();
        self.search_bm25(&request)
    }

    /// Run a BM25 request, including its optional metadata filter.
    pub fn search_bm25(&self, request: &Bm25Request) -> Result<Vec<Document>> {
        retrieval::retrieve(
            self,
            self.tokenizer.as_ref(),
            self.config.algorithm,
            &self.config.parameters,
            request,
        )
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}
