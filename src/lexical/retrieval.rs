//! BM25 retrieval over the documents of a store.
//!
//! Every call rebuilds the ranking model from the store's current contents:
//!
//! 1. select text and table documents (plus the request's own filter),
//! 2. render each to lowercase text; tables become CSV,
//! 3. tokenize the corpus and the query,
//! 4. build the BM25 model and score every corpus entry,
//! 5. optionally rescale with `sigmoid(score / 8)`,
//! 6. stable-sort by descending score and keep `top_k`,
//! 7. return scored copies of the documents.

use log::debug;

use crate::data::{Content, ContentType, Document};
use crate::error::Result;
use crate::filter::{Filter, FilterNode};
use crate::lexical::bm25::{Bm25Algorithm, Bm25Index, Bm25Parameters, ScoringModel};
use crate::lexical::tokenizer::Tokenizer;
use crate::store::DocumentStore;

/// Divisor applied to raw scores before the logistic function.
pub const SCORE_SCALING_DIVISOR: f64 = 8.0;

/// BM25 retrieval request.
#[derive(Debug, Clone)]
pub struct Bm25Request {
    /// Free-text query.
    pub query: String,
    /// Maximum number of documents to return.
    pub top_k: usize,
    /// Map scores into (0, 1).
    pub scale_score: bool,
    /// Additional metadata filter on the candidates.
    pub filter: Filter,
}

impl Bm25Request {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: 10,
            scale_score: true,
            filter: Filter::all(),
        }
    }

    pub fn builder(query: impl Into<String>) -> Bm25RequestBuilder {
        Bm25RequestBuilder {
            request: Self::new(query),
        }
    }
}

pub struct Bm25RequestBuilder {
    request: Bm25Request,
}

impl Bm25RequestBuilder {
    pub fn top_k(mut self, top_k: usize) -> Self {
        self.request.top_k = top_k;
        self
    }

    pub fn scale_score(mut self, scale_score: bool) -> Self {
        self.request.scale_score = scale_score;
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.request.filter = filter;
        self
    }

    pub fn build(self) -> Bm25Request {
        self.request
    }
}

/// Logistic rescaling of a raw BM25 score into the open interval (0, 1).
///
/// The logistic saturates to exactly 0.0 or 1.0 in `f64` for large raw
/// scores, so the result is clamped inside the bounds.
pub fn scale_score(score: f64) -> f64 {
    let scaled = 1.0 / (1.0 + (-score / SCORE_SCALING_DIVISOR).exp());
    scaled.clamp(f64::MIN_POSITIVE, 1.0 - f64::EPSILON)
}

/// Lowercased text form of a document, or `None` if its payload does not
/// match its content type or is a ragged table.
pub fn render(document: &Document) -> Option<String> {
    match (document.content_type(), document.content()) {
        (ContentType::Text, Content::Text(text)) => Some(text.to_lowercase()),
        (ContentType::Table, Content::Table(table)) if !table.is_rectangular() => {
            debug!("skipping table document '{}': rows are ragged", document.id());
            None
        }
        (ContentType::Table, Content::Table(table)) => match table.to_csv() {
            Ok(csv) => Some(csv.to_lowercase()),
            Err(e) => {
                debug!("skipping table document '{}': {e}", document.id());
                None
            }
        },
        (content_type, _) => {
            debug!(
                "skipping document '{}': content does not match type '{content_type}'",
                document.id()
            );
            None
        }
    }
}

/// Score every corpus entry, optionally rescale, and return the `top_k`
/// (corpus index, score) pairs. Ties keep corpus order.
pub fn rank(
    model: &dyn ScoringModel,
    query: &[String],
    top_k: usize,
    scale: bool,
) -> Vec<(usize, f64)> {
    let mut ranked: Vec<(usize, f64)> = model
        .scores(query)
        .into_iter()
        .map(|score| if scale { scale_score(score) } else { score })
        .enumerate()
        .collect();
    // `sort_by` is stable.
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(top_k);
    ranked
}

pub(crate) fn retrieve(
    store: &DocumentStore,
    tokenizer: &dyn Tokenizer,
    algorithm: Bm25Algorithm,
    parameters: &Bm25Parameters,
    request: &Bm25Request,
) -> Result<Vec<Document>> {
    if request.top_k == 0 {
        return Ok(Vec::new());
    }

    let lexical_types = Filter::from_node(FilterNode::is_in(
        "content_type",
        vec![ContentType::Text.as_str(), ContentType::Table.as_str()],
    ));
    let candidates = store.matching(&lexical_types.and(request.filter.clone()))?;

    // `included[i]` is the document behind corpus entry `i`.
    let mut included = Vec::with_capacity(candidates.len());
    let mut corpus = Vec::with_capacity(candidates.len());
    for document in candidates {
        if let Some(text) = render(document) {
            corpus.push(tokenizer.tokenize(&text));
            included.push(document);
        }
    }
    if corpus.is_empty() {
        return Ok(Vec::new());
    }

    debug!(
        "updating BM25 representation: {} docs, algorithm {algorithm}",
        corpus.len()
    );
    let model = Bm25Index::build(algorithm, parameters, &corpus)?;
    let query = tokenizer.tokenize(&request.query.to_lowercase());

    Ok(rank(&model, &query, request.top_k, request.scale_score)
        .into_iter()
        .map(|(index, score)| included[index].scored(score))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Table;

    #[derive(Debug)]
    struct FixedScores(Vec<f64>);

    impl ScoringModel for FixedScores {
        fn scores(&self, _query: &[String]) -> Vec<f64> {
            self.0.clone()
        }

        fn corpus_size(&self) -> usize {
            self.0.len()
        }
    }

    #[test]
    fn test_scale_score() {
        assert_eq!(scale_score(0.0), 0.5);
        assert!(scale_score(8.0) > 0.73 && scale_score(8.0) < 0.74);
        assert!(scale_score(-20.0) > 0.0);
        assert!(scale_score(20.0) < 1.0);
    }

    #[test]
    fn test_scale_score_stays_inside_bounds_when_saturated() {
        for raw in [400.0, 1e6, f64::MAX] {
            let scaled = scale_score(raw);
            assert!(scaled < 1.0, "{raw} -> {scaled}");
        }
        for raw in [-1e4, -1e6, f64::MIN] {
            let scaled = scale_score(raw);
            assert!(scaled > 0.0, "{raw} -> {scaled}");
        }
        assert!(scale_score(1e6) >= scale_score(300.0));
    }

    #[test]
    fn test_rank_is_stable_and_truncates() {
        let model = FixedScores(vec![1.0, 3.0, 1.0, 3.0, 2.0]);
        let ranked = rank(&model, &[], 4, false);
        let order: Vec<usize> = ranked.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, vec![1, 3, 4, 0]);
    }

    #[test]
    fn test_rank_scaling_preserves_order() {
        let model = FixedScores(vec![-2.0, 5.0, 0.0]);
        let ranked = rank(&model, &[], 10, true);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].0, 1);
        assert!(ranked.iter().all(|(_, s)| *s > 0.0 && *s < 1.0));
    }

    #[test]
    fn test_render() {
        assert_eq!(
            render(&Document::text("1", "Hello World")),
            Some("hello world".to_string())
        );

        let table = Table::new(["Name", "City"]).add_row(["Ada", "London"]);
        assert_eq!(
            render(&Document::table("2", table)),
            Some("name,city\nada,london\n".to_string())
        );

        let mut ragged = Table::new(["a", "b"]);
        ragged.rows.push(vec!["only one".into()]);
        assert_eq!(render(&Document::table("3", ragged)), None);
    }

    #[test]
    fn test_builder_defaults() {
        let request = Bm25Request::builder("cats").build();
        assert_eq!(request.top_k, 10);
        assert!(request.scale_score);
        assert!(request.filter.is_empty());
    }
}
