// Text Processing Service
// Turkish normalization: lower-case, alphabet filter, stopword removal, stemming

use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, warn};

/// Turkish stopword list (NLTK corpus, 53 entries).
pub const TURKISH_STOPWORDS: &[&str] = &[
    "acaba", "ama", "aslında", "az", "bazı", "belki", "biri", "birkaç", "birşey", "biz",
    "bu", "çok", "çünkü", "da", "daha", "de", "defa", "diye", "eğer", "en",
    "gibi", "hem", "hep", "hepsi", "her", "hiç", "için", "ile", "ise", "kez",
    "ki", "kim", "mı", "mu", "mü", "nasıl", "ne", "neden", "nerde", "nerede",
    "nereye", "niçin", "niye", "o", "sanki", "şey", "siz", "şu", "tüm", "ve",
    "veya", "ya", "yani",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreprocessError {
    #[error("stemmer failed on token '{token}'")]
    StemmerFailed { token: String },
    #[error("stem '{stem}' of token '{token}' is outside the Turkish alphabet")]
    ForeignStem { token: String, stem: String },
}

fn disallowed_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-zçğıöşü\s]").unwrap())
}

fn is_turkish_lowercase(c: char) -> bool {
    c.is_ascii_lowercase() || matches!(c, 'ç' | 'ğ' | 'ı' | 'ö' | 'ş' | 'ü')
}

/// Lower-case and drop everything except Turkish lowercase letters and whitespace.
pub fn strip_to_turkish_alphabet(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let lowered = text.to_lowercase();
    disallowed_re().replace_all(&lowered, "").into_owned()
}

enum TokenStemmer {
    Snowball(Stemmer),
    Custom(fn(&str) -> String),
}

impl TokenStemmer {
    fn stem(&self, token: &str) -> String {
        match self {
            TokenStemmer::Snowball(stemmer) => stemmer.stem(token).into_owned(),
            TokenStemmer::Custom(f) => f(token),
        }
    }
}

/// Deterministic text-to-stems transform. Built once at start-up; holds no mutable state.
pub struct TextNormalizer {
    stopwords: HashSet<String>,
    stemmer: TokenStemmer,
}

impl fmt::Debug for TextNormalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stemmer = match self.stemmer {
            TokenStemmer::Snowball(_) => "snowball-turkish",
            TokenStemmer::Custom(_) => "custom",
        };
        f.debug_struct("TextNormalizer")
            .field("stopwords", &self.stopwords.len())
            .field("stemmer", &stemmer)
            .finish()
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::turkish()
    }
}

impl TextNormalizer {
    /// Standard Turkish stopwords with the Snowball Turkish stemmer.
    pub fn turkish() -> Self {
        Self {
            stopwords: TURKISH_STOPWORDS.iter().map(|w| w.to_string()).collect(),
            stemmer: TokenStemmer::Snowball(Stemmer::create(Algorithm::Turkish)),
        }
    }

    /// Same stopwords, caller-provided stemming function.
    pub fn with_stemmer_fn(stem: fn(&str) -> String) -> Self {
        Self {
            stopwords: TURKISH_STOPWORDS.iter().map(|w| w.to_string()).collect(),
            stemmer: TokenStemmer::Custom(stem),
        }
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }

    /// Full pipeline, surfacing stemming failures.
    pub fn try_normalize(&self, text: &str) -> Result<String, PreprocessError> {
        let cleaned = strip_to_turkish_alphabet(text);
        let mut stems: Vec<String> = Vec::new();

        for token in cleaned.split_whitespace() {
            if self.is_stopword(token) {
                continue;
            }
            let stem = panic::catch_unwind(AssertUnwindSafe(|| self.stemmer.stem(token)))
                .map_err(|_| PreprocessError::StemmerFailed {
                    token: token.to_string(),
                })?;
            if !stem.chars().all(is_turkish_lowercase) {
                return Err(PreprocessError::ForeignStem {
                    token: token.to_string(),
                    stem,
                });
            }
            if !stem.is_empty() {
                stems.push(stem);
            }
        }

        Ok(stems.join(" "))
    }

    /// Pipeline used by classification: any preprocessing failure yields an empty string.
    pub fn normalize(&self, text: &str) -> String {
        match self.try_normalize(text) {
            Ok(cleaned) => {
                debug!(
                    "[NORMALIZER] {} chars -> {} stems",
                    text.chars().count(),
                    cleaned.split(' ').filter(|s| !s.is_empty()).count()
                );
                cleaned
            }
            Err(e) => {
                warn!("[NORMALIZER] preprocessing failed, using empty text: {}", e);
                String::new()
            }
        }
    }
}
