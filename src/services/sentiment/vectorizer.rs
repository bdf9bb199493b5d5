// Feature Vectorizer
// Pre-fitted bag-of-words / tf-idf transform, scikit-learn compatible

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::artifacts::ArtifactError;

pub const DEFAULT_TOKEN_PATTERN: &str = r"(?u)\b\w\w+\b";

/// Sparse vector with a fixed dimension. Entries are sorted by index, without duplicates.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    dim: usize,
    entries: Vec<(usize, f64)>,
}

impl FeatureVector {
    /// Builds from arbitrary entries; duplicate indices are summed, out-of-range ones dropped.
    pub fn from_entries(dim: usize, entries: impl IntoIterator<Item = (usize, f64)>) -> Self {
        let mut merged: BTreeMap<usize, f64> = BTreeMap::new();
        for (idx, value) in entries {
            if idx < dim {
                *merged.entry(idx).or_insert(0.0) += value;
            }
        }
        Self {
            dim,
            entries: merged.into_iter().filter(|(_, v)| *v != 0.0).collect(),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, idx: usize) -> f64 {
        self.entries
            .binary_search_by_key(&idx, |(i, _)| *i)
            .map(|pos| self.entries[pos].1)
            .unwrap_or(0.0)
    }

    /// Dot product with a dense row of the same dimension.
    pub fn dot(&self, dense: &[f64]) -> f64 {
        self.entries
            .iter()
            .map(|(idx, value)| dense.get(*idx).copied().unwrap_or(0.0) * value)
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    L1,
    L2,
}

/// On-disk shape of the vectorizer artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorizerSpec {
    pub vocabulary: HashMap<String, usize>,
    #[serde(default)]
    pub idf: Option<Vec<f64>>,
    #[serde(default)]
    pub norm: Option<Norm>,
    #[serde(default)]
    pub sublinear_tf: bool,
    #[serde(default)]
    pub binary: bool,
    #[serde(default = "default_true")]
    pub lowercase: bool,
    #[serde(default = "default_token_pattern")]
    pub token_pattern: String,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
}

fn default_true() -> bool { true }
fn default_token_pattern() -> String { DEFAULT_TOKEN_PATTERN.to_string() }
fn default_ngram_range() -> (usize, usize) { (1, 1) }

impl VectorizerSpec {
    /// Plain count vectorizer over the given vocabulary, indices in iteration order.
    pub fn counts<'a>(terms: impl IntoIterator<Item = &'a str>) -> Self {
        let vocabulary = terms
            .into_iter()
            .enumerate()
            .map(|(idx, term)| (term.to_string(), idx))
            .collect();
        Self {
            vocabulary,
            idf: None,
            norm: None,
            sublinear_tf: false,
            binary: false,
            lowercase: true,
            token_pattern: default_token_pattern(),
            ngram_range: default_ngram_range(),
        }
    }
}

/// Immutable transform; vocabulary and weighting never change after load.
#[derive(Debug, Clone)]
pub struct FittedVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Option<Vec<f64>>,
    norm: Option<Norm>,
    sublinear_tf: bool,
    binary: bool,
    lowercase: bool,
    ngram_range: (usize, usize),
    token_re: Regex,
}

impl FittedVectorizer {
    pub fn from_spec(spec: VectorizerSpec) -> Result<Self, ArtifactError> {
        let dim = spec.vocabulary.len();
        if dim == 0 {
            return Err(ArtifactError::Invalid("vectorizer vocabulary is empty".to_string()));
        }

        let mut seen = vec![false; dim];
        for (term, &idx) in &spec.vocabulary {
            if idx >= dim || seen[idx] {
                return Err(ArtifactError::Invalid(format!(
                    "vocabulary index {} for '{}' is out of range or duplicated",
                    idx, term
                )));
            }
            seen[idx] = true;
        }

        if let Some(ref idf) = spec.idf {
            if idf.len() != dim {
                return Err(ArtifactError::Invalid(format!(
                    "idf has {} weights for {} terms",
                    idf.len(),
                    dim
                )));
            }
            if idf.iter().any(|w| !w.is_finite()) {
                return Err(ArtifactError::Invalid("idf contains non-finite weights".to_string()));
            }
        }

        let (min_n, max_n) = spec.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(ArtifactError::Invalid(format!(
                "invalid ngram range ({}, {})",
                min_n, max_n
            )));
        }

        let token_re = Regex::new(&spec.token_pattern).map_err(|e| {
            ArtifactError::Invalid(format!("token pattern does not compile: {}", e))
        })?;

        Ok(Self {
            vocabulary: spec.vocabulary,
            idf: spec.idf,
            norm: spec.norm,
            sublinear_tf: spec.sublinear_tf,
            binary: spec.binary,
            lowercase: spec.lowercase,
            ngram_range: spec.ngram_range,
            token_re,
        })
    }

    pub fn dim(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    fn analyze(&self, doc: &str) -> Vec<String> {
        let doc = if self.lowercase {
            doc.to_lowercase()
        } else {
            doc.to_string()
        };
        let tokens: Vec<&str> = self.token_re.find_iter(&doc).map(|m| m.as_str()).collect();

        let (min_n, max_n) = self.ngram_range;
        let mut grams = Vec::new();
        for n in min_n..=max_n.min(tokens.len()) {
            for window in tokens.windows(n) {
                grams.push(window.join(" "));
            }
        }
        grams
    }

    /// Map cleaned text into the fitted feature space. Unknown terms are ignored.
    pub fn vectorize(&self, cleaned: &str) -> FeatureVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for gram in self.analyze(cleaned) {
            if let Some(idx) = self.term_index(&gram) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let mut entries: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(idx, tf)| {
                let mut weight = if self.binary { 1.0 } else { tf };
                if self.sublinear_tf {
                    weight = 1.0 + weight.ln();
                }
                if let Some(ref idf) = self.idf {
                    weight *= idf[idx];
                }
                (idx, weight)
            })
            .collect();

        if let Some(norm) = self.norm {
            let length = match norm {
                Norm::L1 => entries.iter().map(|(_, w)| w.abs()).sum::<f64>(),
                Norm::L2 => entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt(),
            };
            if length > 0.0 {
                for (_, w) in entries.iter_mut() {
                    *w /= length;
                }
            }
        }

        FeatureVector::from_entries(self.dim(), entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_count_vectorizer() {
        let v = FittedVectorizer::from_spec(VectorizerSpec::counts(["film", "güzel", "kötü"])).unwrap();
        let x = v.vectorize("film güzel güzel bilinmeyen");
        assert_eq!(x.dim(), 3);
        assert_eq!(x.get(0), 1.0);
        assert_eq!(x.get(1), 2.0);
        assert_eq!(x.get(2), 0.0);
        assert_eq!(x.nnz(), 2);
    }

    #[test]
    fn test_default_pattern_drops_single_letters() {
        let v = FittedVectorizer::from_spec(VectorizerSpec::counts(["o", "ev"])).unwrap();
        let x = v.vectorize("o ev");
        assert_eq!(x.get(0), 0.0);
        assert_eq!(x.get(1), 1.0);
    }

    #[test]
    fn test_tfidf_l2() {
        let mut spec = VectorizerSpec::counts(["iyi", "kötü"]);
        spec.idf = Some(vec![1.0, 2.0]);
        spec.norm = Some(Norm::L2);
        let v = FittedVectorizer::from_spec(spec).unwrap();
        let x = v.vectorize("iyi kötü");
        let norm = (1.0f64 + 4.0).sqrt();
        assert!(approx(x.get(0), 1.0 / norm));
        assert!(approx(x.get(1), 2.0 / norm));
    }

    #[test]
    fn test_sublinear_binary_and_l1() {
        let mut spec = VectorizerSpec::counts(["iyi", "kötü"]);
        spec.sublinear_tf = true;
        spec.norm = Some(Norm::L1);
        let v = FittedVectorizer::from_spec(spec.clone()).unwrap();
        let x = v.vectorize("iyi iyi iyi kötü");
        let a = 1.0 + 3.0f64.ln();
        assert!(approx(x.get(0), a / (a + 1.0)));
        assert!(approx(x.get(1), 1.0 / (a + 1.0)));

        spec.sublinear_tf = false;
        spec.norm = None;
        spec.binary = true;
        let v = FittedVectorizer::from_spec(spec).unwrap();
        assert_eq!(v.vectorize("iyi iyi iyi").get(0), 1.0);
    }

    #[test]
    fn test_bigrams() {
        let mut spec = VectorizerSpec::counts(["hiç", "iyi", "hiç iyi"]);
        spec.ngram_range = (1, 2);
        let v = FittedVectorizer::from_spec(spec).unwrap();
        let x = v.vectorize("hiç iyi değil");
        assert_eq!(x.get(0), 1.0);
        assert_eq!(x.get(1), 1.0);
        assert_eq!(x.get(2), 1.0);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let v = FittedVectorizer::from_spec(VectorizerSpec::counts(["iyi"])).unwrap();
        let x = v.vectorize("");
        assert!(x.is_empty());
        assert_eq!(x.dim(), 1);
    }

    #[test]
    fn test_invalid_specs() {
        let mut spec = VectorizerSpec::counts(["a1", "b2"]);
        spec.idf = Some(vec![1.0]);
        assert!(FittedVectorizer::from_spec(spec).is_err());

        let mut spec = VectorizerSpec::counts(["a1", "b2"]);
        spec.vocabulary.insert("b2".to_string(), 5);
        assert!(FittedVectorizer::from_spec(spec).is_err());

        let mut spec = VectorizerSpec::counts(["a1"]);
        spec.ngram_range = (2, 1);
        assert!(FittedVectorizer::from_spec(spec).is_err());

        assert!(FittedVectorizer::from_spec(VectorizerSpec::counts(Vec::<&str>::new())).is_err());
    }

    #[test]
    fn test_feature_vector_helpers() {
        let x = FeatureVector::from_entries(4, [(2, 1.0), (0, 0.5), (2, 1.0), (9, 3.0)]);
        assert_eq!(x.entries(), &[(0, 0.5), (2, 2.0)]);
        assert!(approx(x.dot(&[2.0, 0.0, 0.25, 1.0]), 1.5));
    }
}
