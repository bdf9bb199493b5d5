// Model Artifacts
// Loads the classifier/vectorizer pair as one unit; any failure disables both

use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::naive_bayes::{ClassifierSpec, NaiveBayesModel};
use super::vectorizer::{FittedVectorizer, VectorizerSpec};

pub const MODEL_FILE: &str = "sentiment_model.json";
pub const VECTORIZER_FILE: &str = "vectorizer.json";

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("artifact not found: {0}")]
    Missing(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid artifact: {0}")]
    Invalid(String),
    #[error("classifier expects {classifier} features but vectorizer produces {vectorizer}")]
    Mismatch { classifier: usize, vectorizer: usize },
}

/// Fitted classifier and the exact vectorizer it was trained with.
#[derive(Debug, Clone)]
pub struct ModelArtifactPair {
    classifier: NaiveBayesModel,
    vectorizer: FittedVectorizer,
}

impl ModelArtifactPair {
    pub fn new(classifier: NaiveBayesModel, vectorizer: FittedVectorizer) -> Result<Self, ArtifactError> {
        if classifier.n_features() != vectorizer.dim() {
            return Err(ArtifactError::Mismatch {
                classifier: classifier.n_features(),
                vectorizer: vectorizer.dim(),
            });
        }
        Ok(Self { classifier, vectorizer })
    }

    pub fn from_specs(classifier: ClassifierSpec, vectorizer: VectorizerSpec) -> Result<Self, ArtifactError> {
        Self::new(
            NaiveBayesModel::from_spec(classifier)?,
            FittedVectorizer::from_spec(vectorizer)?,
        )
    }

    /// Read both artifact files from `dir`.
    pub fn load(dir: &Path) -> Result<Self, ArtifactError> {
        let model_path = dir.join(MODEL_FILE);
        let vec_path = dir.join(VECTORIZER_FILE);

        let classifier: ClassifierSpec = read_json(&model_path)?;
        let vectorizer: VectorizerSpec = read_json(&vec_path)?;
        Self::from_specs(classifier, vectorizer)
    }

    /// Fail-closed load: `None` unless both halves load and agree.
    pub fn load_or_none(dir: &Path) -> Option<Self> {
        match Self::load(dir) {
            Ok(pair) => {
                info!(
                    "[LOCAL_MODEL] Loaded artifacts from {} (features={}, classes={:?})",
                    dir.display(),
                    pair.vectorizer.dim(),
                    pair.classifier.classes()
                );
                Some(pair)
            }
            Err(e) => {
                warn!("[LOCAL_MODEL] Local classification disabled: {}", e);
                None
            }
        }
    }

    pub fn classifier(&self) -> &NaiveBayesModel {
        &self.classifier
    }

    pub fn vectorizer(&self) -> &FittedVectorizer {
        &self.vectorizer
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::Missing(path.to_path_buf()));
    }
    let content = fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
