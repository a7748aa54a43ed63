//! BM25 ranking over a tokenized corpus.
//!
//! Three variants are provided:
//!
//! - **Okapi**: `idf = ln((N - df + 0.5) / (df + 0.5))`; terms whose IDF comes
//!   out negative are floored to `epsilon * mean(idf)`.
//! - **BM25L**: `idf = ln((N + 1) / (df + 0.5))` and a `delta` shift on the
//!   length-normalized term frequency.
//! - **BM25+**: `idf = ln((N + 1) / df)` and a `delta` lower bound on every
//!   query-term contribution.
//!
//! References:
//! - Robertson & Zaragoza (2009). "The Probabilistic Relevance Framework: BM25 and Beyond."
//! - Lv & Zhai (2011). "When documents are very long, BM25 fails!"

use std::fmt;
use std::str::FromStr;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{QuarryError, Result};

/// A ranking model built over a corpus.
pub trait ScoringModel: Send + Sync + fmt::Debug {
    /// Score a tokenized query against every corpus entry.
    ///
    /// The result has one score per corpus entry, in corpus order.
    fn scores(&self, query: &[String]) -> Vec<f64>;

    /// Number of corpus entries.
    fn corpus_size(&self) -> usize;
}

/// BM25 variant selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Bm25Algorithm {
    /// Standard BM25 (Okapi).
    #[default]
    Okapi,
    /// BM25L: shifts the normalized term frequency by `delta`.
    BM25L,
    /// BM25+: lower-bounds each term contribution by `delta`.
    BM25Plus,
}

impl Bm25Algorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Bm25Algorithm::Okapi => "BM25Okapi",
            Bm25Algorithm::BM25L => "BM25L",
            Bm25Algorithm::BM25Plus => "BM25Plus",
        }
    }

    fn default_delta(&self) -> f64 {
        match self {
            Bm25Algorithm::Okapi => 0.0,
            Bm25Algorithm::BM25L => 0.5,
            Bm25Algorithm::BM25Plus => 1.0,
        }
    }
}

impl fmt::Display for Bm25Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Bm25Algorithm {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "BM25Okapi" => Ok(Bm25Algorithm::Okapi),
            "BM25L" => Ok(Bm25Algorithm::BM25L),
            "BM25Plus" => Ok(Bm25Algorithm::BM25Plus),
            other => Err(QuarryError::invalid_config(format!(
                "BM25 algorithm '{other}' not found"
            ))),
        }
    }
}

impl TryFrom<String> for Bm25Algorithm {
    type Error = QuarryError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Bm25Algorithm> for String {
    fn from(value: Bm25Algorithm) -> Self {
        value.name().to_string()
    }
}

/// Free BM25 parameters. Unset values take the variant's default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bm25Parameters {
    /// Term-frequency saturation (default 1.5).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k1: Option<f64>,
    /// Length normalization (default 0.75).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b: Option<f64>,
    /// Okapi IDF floor factor (default 0.25).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epsilon: Option<f64>,
    /// BM25L / BM25+ offset (default 0.5 / 1.0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<f64>,
}

impl Bm25Parameters {
    pub fn k1(mut self, k1: f64) -> Self {
        self.k1 = Some(k1);
        self
    }

    pub fn b(mut self, b: f64) -> Self {
        self.b = Some(b);
        self
    }

    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = Some(epsilon);
        self
    }

    pub fn delta(mut self, delta: f64) -> Self {
        self.delta = Some(delta);
        self
    }

    /// Reject non-finite or negative overrides.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("k1", self.k1),
            ("b", self.b),
            ("epsilon", self.epsilon),
            ("delta", self.delta),
        ] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(QuarryError::invalid_config(format!(
                        "BM25 parameter '{name}' must be a finite non-negative number, got {v}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Resolved parameters for one model build.
#[derive(Debug, Clone, Copy)]
struct Resolved {
    k1: f64,
    b: f64,
    epsilon: f64,
    delta: f64,
}

impl Resolved {
    fn new(algorithm: Bm25Algorithm, params: &Bm25Parameters) -> Self {
        Self {
            k1: params.k1.unwrap_or(1.5),
            b: params.b.unwrap_or(0.75),
            epsilon: params.epsilon.unwrap_or(0.25),
            delta: params.delta.unwrap_or_else(|| algorithm.default_delta()),
        }
    }
}

/// BM25 model over an in-memory tokenized corpus.
#[derive(Debug)]
pub struct Bm25Index {
    algorithm: Bm25Algorithm,
    params: Resolved,
    /// Per-entry term frequencies.
    term_freqs: Vec<AHashMap<String, u32>>,
    doc_lengths: Vec<usize>,
    avg_doc_length: f64,
    idf: AHashMap<String, f64>,
}

impl Bm25Index {
    /// Build a model over `corpus`.
    pub fn build(
        algorithm: Bm25Algorithm,
        params: &Bm25Parameters,
        corpus: &[Vec<String>],
    ) -> Result<Self> {
        params.validate()?;
        let params = Resolved::new(algorithm, params);

        let mut term_freqs = Vec::with_capacity(corpus.len());
        let mut doc_lengths = Vec::with_capacity(corpus.len());
        let mut doc_freqs: AHashMap<String, u32> = AHashMap::new();
        let mut total_length = 0usize;

        for tokens in corpus {
            let mut freqs: AHashMap<String, u32> = AHashMap::new();
            for token in tokens {
                *freqs.entry(token.clone()).or_insert(0) += 1;
            }
            for term in freqs.keys() {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }
            total_length += tokens.len();
            doc_lengths.push(tokens.len());
            term_freqs.push(freqs);
        }

        let avg_doc_length = if corpus.is_empty() {
            0.0
        } else {
            total_length as f64 / corpus.len() as f64
        };
        let idf = compute_idf(algorithm, &params, corpus.len(), &doc_freqs);

        Ok(Self {
            algorithm,
            params,
            term_freqs,
            doc_lengths,
            avg_doc_length,
            idf,
        })
    }

    /// IDF of a term, or `None` if no entry contains it.
    pub fn idf(&self, term: &str) -> Option<f64> {
        self.idf.get(term).copied()
    }

    fn length_ratio(&self, index: usize) -> f64 {
        if self.avg_doc_length > 0.0 {
            self.doc_lengths[index] as f64 / self.avg_doc_length
        } else {
            1.0
        }
    }

    fn score_entry(&self, index: usize, query: &[String]) -> f64 {
        let Resolved { k1, b, delta, .. } = self.params;
        let norm = 1.0 - b + b * self.length_ratio(index);
        let freqs = &self.term_freqs[index];

        query
            .iter()
            .map(|term| {
                let idf = self.idf.get(term).copied().unwrap_or(0.0);
                let tf = freqs.get(term).copied().unwrap_or(0) as f64;
                // Zero-denominator guards cover k1 = 0 with an absent term.
                let weight = match self.algorithm {
                    Bm25Algorithm::Okapi if tf == 0.0 => 0.0,
                    Bm25Algorithm::Okapi => tf * (k1 + 1.0) / (tf + k1 * norm),
                    Bm25Algorithm::BM25L => {
                        let ctd = if norm > 0.0 { tf / norm } else { tf };
                        let denominator = k1 + ctd + delta;
                        if denominator > 0.0 {
                            (k1 + 1.0) * (ctd + delta) / denominator
                        } else {
                            0.0
                        }
                    }
                    Bm25Algorithm::BM25Plus if tf == 0.0 => delta,
                    Bm25Algorithm::BM25Plus => delta + tf * (k1 + 1.0) / (k1 * norm + tf),
                };
                idf * weight
            })
            .sum()
    }
}

impl ScoringModel for Bm25Index {
    fn scores(&self, query: &[String]) -> Vec<f64> {
        (0..self.term_freqs.len())
            .map(|index| self.score_entry(index, query))
            .collect()
    }

    fn corpus_size(&self) -> usize {
        self.term_freqs.len()
    }
}

fn compute_idf(
    algorithm: Bm25Algorithm,
    params: &Resolved,
    corpus_size: usize,
    doc_freqs: &AHashMap<String, u32>,
) -> AHashMap<String, f64> {
    let n = corpus_size as f64;
    let mut idf: AHashMap<String, f64> = doc_freqs
        .iter()
        .map(|(term, &df)| {
            let df = df as f64;
            let value = match algorithm {
                Bm25Algorithm::Okapi => ((n - df + 0.5) / (df + 0.5)).ln(),
                Bm25Algorithm::BM25L => ((n + 1.0) / (df + 0.5)).ln(),
                Bm25Algorithm::BM25Plus => ((n + 1.0) / df).ln(),
            };
            (term.clone(), value)
        })
        .collect();

    if algorithm == Bm25Algorithm::Okapi && !idf.is_empty() {
        let average = idf.values().sum::<f64>() / idf.len() as f64;
        let floor = params.epsilon * average;
        for value in idf.values_mut() {
            if *value < 0.0 {
                *value = floor;
            }
        }
    }
    idf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus(texts: &[&str]) -> Vec<Vec<String>> {
        texts
            .iter()
            .map(|t| t.split_whitespace().map(str::to_string).collect())
            .collect()
    }

    fn query(terms: &[&str]) -> Vec<String> {
        terms.iter().map(|t| t.to_string()).collect()
    }

    fn sample() -> Vec<Vec<String>> {
        corpus(&[
            "rust programming systems language fast",
            "python programming scripting easy",
            "java enterprise programming verbose",
            "rust memory safety zero cost abstractions",
            "go concurrency channels goroutines",
        ])
    }

    #[test]
    fn test_okapi_ranks_matching_documents_first() {
        let index = Bm25Index::build(Bm25Algorithm::Okapi, &Bm25Parameters::default(), &sample())
            .unwrap();
        let scores = index.scores(&query(&["rust"]));
        assert_eq!(scores.len(), 5);
        assert!(scores[0] > 0.0);
        assert!(scores[3] > 0.0);
        assert_eq!(scores[1], 0.0);
        assert_eq!(scores[2], 0.0);
        // Shorter document wins on equal term frequency.
        assert!(scores[0] > scores[3]);
    }

    #[test]
    fn test_okapi_idf_floor() {
        let index = Bm25Index::build(Bm25Algorithm::Okapi, &Bm25Parameters::default(), &sample())
            .unwrap();
        // "programming" is in 3 of 5 entries, so its raw IDF is negative.
        let raw = ((5.0 - 3.0 + 0.5) / (3.0 + 0.5f64)).ln();
        assert!(raw < 0.0);
        let floored = index.idf("programming").unwrap();
        assert_ne!(floored, raw);
        assert!(floored > 0.0);
    }

    #[test]
    fn test_okapi_matches_reference_values() {
        let corpus = corpus(&["the cat sat", "the dog ran fast"]);
        let index =
            Bm25Index::build(Bm25Algorithm::Okapi, &Bm25Parameters::default(), &corpus).unwrap();
        // df("cat") = 1 of 2 entries: ln(1.5 / 1.5) = 0.
        assert_eq!(index.idf("cat"), Some(0.0));
        // "the" is everywhere: floored to 0.25 * mean idf.
        let mean = ((0.5f64 / 2.5).ln()) / 6.0;
        let the = index.idf("the").unwrap();
        assert!((the - 0.25 * mean).abs() < 1e-12);
    }

    // N = 3, lengths 2, 2, 3 (avgdl 7/3). "rust" appears once, in entry 0.
    fn small() -> Vec<Vec<String>> {
        corpus(&["rust fast", "python slow", "go fast fast"])
    }

    fn length_norm(doc_len: f64) -> f64 {
        1.0 - 0.75 + 0.75 * doc_len / (7.0 / 3.0)
    }

    #[test]
    fn test_okapi_score_values() {
        let index =
            Bm25Index::build(Bm25Algorithm::Okapi, &Bm25Parameters::default(), &small()).unwrap();
        let scores = index.scores(&query(&["rust"]));

        let idf = (2.5f64 / 1.5).ln();
        let expected = idf * 2.5 / (1.0 + 1.5 * length_norm(2.0));
        assert!((scores[0] - expected).abs() < 1e-12, "{}", scores[0]);
        assert_eq!(scores[1], 0.0);
        assert_eq!(scores[2], 0.0);
    }

    #[test]
    fn test_bm25l_score_values() {
        let index =
            Bm25Index::build(Bm25Algorithm::BM25L, &Bm25Parameters::default(), &small()).unwrap();
        let scores = index.scores(&query(&["rust"]));

        let idf = (4.0f64 / 1.5).ln();
        let ctd = 1.0 / length_norm(2.0);
        let matching = idf * 2.5 * (ctd + 0.5) / (1.5 + ctd + 0.5);
        let absent = idf * 2.5 * 0.5 / (1.5 + 0.5);
        assert!((scores[0] - matching).abs() < 1e-12, "{}", scores[0]);
        assert!((scores[1] - absent).abs() < 1e-12, "{}", scores[1]);
        assert!((scores[2] - absent).abs() < 1e-12, "{}", scores[2]);
    }

    #[test]
    fn test_bm25plus_score_values() {
        let index =
            Bm25Index::build(Bm25Algorithm::BM25Plus, &Bm25Parameters::default(), &small())
                .unwrap();
        let scores = index.scores(&query(&["rust", "fast"]));

        let idf_rust = 4.0f64.ln();
        let idf_fast = (4.0f64 / 2.0).ln();
        let term = |tf: f64, doc_len: f64| 1.0 + tf * 2.5 / (1.5 * length_norm(doc_len) + tf);
        let expected = [
            idf_rust * term(1.0, 2.0) + idf_fast * term(1.0, 2.0),
            idf_rust * 1.0 + idf_fast * 1.0,
            idf_rust * 1.0 + idf_fast * term(2.0, 3.0),
        ];
        for (score, expected) in scores.iter().zip(expected) {
            assert!((score - expected).abs() < 1e-12, "{score} != {expected}");
        }
    }

    #[test]
    fn test_bm25l_and_plus_score_non_matching_terms() {
        let corpus = sample();
        for algorithm in [Bm25Algorithm::BM25L, Bm25Algorithm::BM25Plus] {
            let index = Bm25Index::build(algorithm, &Bm25Parameters::default(), &corpus).unwrap();
            let scores = index.scores(&query(&["rust"]));
            assert!(scores[0] > scores[1], "{algorithm}");
            // The delta term gives non-matching entries a positive floor.
            assert!(scores[1] > 0.0, "{algorithm}");
        }
    }

    #[test]
    fn test_unknown_query_terms_score_zero() {
        let index = Bm25Index::build(Bm25Algorithm::Okapi, &Bm25Parameters::default(), &sample())
            .unwrap();
        assert!(index.scores(&query(&["haskell"])).iter().all(|s| *s == 0.0));
        assert!(index.scores(&[]).iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_empty_corpus_and_empty_entries() {
        let index =
            Bm25Index::build(Bm25Algorithm::Okapi, &Bm25Parameters::default(), &[]).unwrap();
        assert_eq!(index.corpus_size(), 0);
        assert!(index.scores(&query(&["x"])).is_empty());

        let index = Bm25Index::build(
            Bm25Algorithm::BM25L,
            &Bm25Parameters::default(),
            &[vec![], vec![]],
        )
        .unwrap();
        assert!(index.scores(&query(&["x"])).iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_parameters() {
        let params = Bm25Parameters::default().k1(1.2).b(0.5);
        assert!(params.validate().is_ok());
        assert!(Bm25Parameters::default().k1(f64::NAN).validate().is_err());
        assert!(Bm25Parameters::default().b(-1.0).validate().is_err());

        // b = 0 disables length normalization.
        let corpus = corpus(&["rust", "rust padding padding padding"]);
        let index =
            Bm25Index::build(Bm25Algorithm::BM25Plus, &Bm25Parameters::default().b(0.0), &corpus)
                .unwrap();
        let scores = index.scores(&query(&["rust"]));
        assert!((scores[0] - scores[1]).abs() < 1e-12);
    }

    #[test]
    fn test_algorithm_names() {
        assert_eq!("BM25Okapi".parse::<Bm25Algorithm>().unwrap(), Bm25Algorithm::Okapi);
        assert_eq!("BM25L".parse::<Bm25Algorithm>().unwrap(), Bm25Algorithm::BM25L);
        assert_eq!("BM25Plus".parse::<Bm25Algorithm>().unwrap(), Bm25Algorithm::BM25Plus);
        assert!("BM42".parse::<Bm25Algorithm>().is_err());

        let json = serde_json::to_string(&Bm25Algorithm::BM25Plus).unwrap();
        assert_eq!(json, "\"BM25Plus\"");
    }
}
