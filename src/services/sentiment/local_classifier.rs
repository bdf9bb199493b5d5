// Local Classifier
// Normalizer -> vectorizer -> Naive Bayes, never failing outward

use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{Label, LocalVerdict};
use crate::services::text_processor::TextNormalizer;

use super::artifacts::ModelArtifactPair;
use super::naive_bayes::ClassifyError;
use super::vectorizer::FeatureVector;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocalClassificationError {
    #[error("model not trained yet: classifier/vectorizer artifacts are not loaded")]
    ArtifactMissing,
    #[error(transparent)]
    Classify(#[from] ClassifyError),
}

#[derive(Debug)]
pub struct LocalClassifier {
    normalizer: TextNormalizer,
    artifacts: Option<ModelArtifactPair>,
}

impl LocalClassifier {
    pub fn new(normalizer: TextNormalizer, artifacts: Option<ModelArtifactPair>) -> Self {
        Self { normalizer, artifacts }
    }

    /// Turkish normalizer plus whatever pair loads from `dir` (possibly none).
    pub fn from_model_dir(dir: &Path) -> Self {
        Self::new(TextNormalizer::turkish(), ModelArtifactPair::load_or_none(dir))
    }

    pub fn is_ready(&self) -> bool {
        self.artifacts.is_some()
    }

    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    pub fn vectorize(&self, cleaned: &str) -> Result<FeatureVector, LocalClassificationError> {
        let pair = self.artifacts.as_ref().ok_or(LocalClassificationError::ArtifactMissing)?;
        Ok(pair.vectorizer().vectorize(cleaned))
    }

    pub fn classify(&self, vector: &FeatureVector) -> Result<LocalVerdict, LocalClassificationError> {
        let pair = self.artifacts.as_ref().ok_or(LocalClassificationError::ArtifactMissing)?;
        let (code, confidence) = pair.classifier().predict(vector)?;
        Ok(LocalVerdict::new(Label::from_ordinal(code), confidence))
    }

    /// Full local path with errors surfaced.
    pub fn try_classify(&self, text: &str) -> Result<LocalVerdict, LocalClassificationError> {
        if !self.is_ready() {
            return Err(LocalClassificationError::ArtifactMissing);
        }
        let cleaned = self.normalizer.normalize(text);
        let vector = self.vectorize(&cleaned)?;
        self.classify(&vector)
    }

    /// Full local path; every failure becomes the `Hata` sentinel with confidence 0.0.
    pub fn classify_local(&self, text: &str) -> LocalVerdict {
        match self.try_classify(text) {
            Ok(verdict) => {
                info!(
                    "[LOCAL_MODEL] label={} confidence={:.4}",
                    verdict.label, verdict.confidence
                );
                verdict
            }
            Err(e) => {
                warn!("[LOCAL_MODEL] classification failed: {}", e);
                LocalVerdict::failed()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::sentiment::fixtures;

    #[test]
    fn test_classify_local_labels() {
        let c = fixtures::local_classifier();
        assert_eq!(c.classify_local("Harika bir film!").label, Label::Positive);
        assert_eq!(c.classify_local("Berbat ve KÖTÜ.").label, Label::Negative);
        assert_eq!(c.classify_local("normal").label, Label::Notr);
    }

    #[test]
    fn test_confidence_is_max_posterior() {
        let c = fixtures::local_classifier();
        let verdict = c.classify_local("harika film");
        // Positive: 0.35*0.1, Negative: 0.05*0.1, Notr: 0.1*0.2
        let expected = 0.035 / (0.035 + 0.005 + 0.02);
        assert!((verdict.confidence - expected).abs() < 1e-9);
        assert!((0.0..=1.0).contains(&verdict.confidence));
    }

    #[test]
    fn test_deterministic_for_fixed_pair() {
        let c = fixtures::local_classifier();
        let a = c.classify_local("film güzel ama biraz kötü");
        let b = c.classify_local("film güzel ama biraz kötü");
        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_class_code_maps_to_notr() {
        let mut spec = fixtures::classifier_spec();
        spec.classes = vec![0, 1, 3];
        let pair = ModelArtifactPair::from_specs(spec, fixtures::vectorizer_spec()).unwrap();
        let c = LocalClassifier::new(fixtures::normalizer(), Some(pair));
        assert_eq!(c.classify_local("normal").label, Label::Notr);
    }

    #[test]
    fn test_missing_artifacts_give_sentinel() {
        let c = LocalClassifier::new(fixtures::normalizer(), None);
        assert!(!c.is_ready());
        assert_eq!(
            c.try_classify("harika"),
            Err(LocalClassificationError::ArtifactMissing)
        );
        let verdict = c.classify_local("harika");
        assert_eq!(verdict.label, Label::Error);
        assert_eq!(verdict.confidence, 0.0);
    }

    #[test]
    fn test_wrong_dimension_vector_is_an_error() {
        let c = fixtures::local_classifier();
        let wrong = FeatureVector::from_entries(2, [(0, 1.0)]);
        assert!(matches!(
            c.classify(&wrong),
            Err(LocalClassificationError::Classify(ClassifyError::DimensionMismatch { .. }))
        ));
    }

    #[test]
    fn test_from_model_dir_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let c = LocalClassifier::from_model_dir(dir.path());
        assert!(!c.is_ready());
        assert!(c.classify_local("Bu film çok güzeldi").is_failed());
    }
}
