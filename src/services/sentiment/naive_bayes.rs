// Naive Bayes Inference
// Multinomial Naive Bayes over a pre-fitted parameter set; no fitting happens here

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::artifacts::ArtifactError;
use super::vectorizer::FeatureVector;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifyError {
    #[error("feature vector has {actual} dimensions, model expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("posterior computation produced a non-finite value")]
    NonFinite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClassifierKind {
    #[default]
    MultinomialNb,
}

/// On-disk shape of the classifier artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierSpec {
    #[serde(default)]
    pub kind: ClassifierKind,
    /// Ordinal class codes, in the same order as the rows below.
    pub classes: Vec<i64>,
    pub class_log_prior: Vec<f64>,
    pub feature_log_prob: Vec<Vec<f64>>,
}

#[derive(Debug, Clone)]
pub struct NaiveBayesModel {
    classes: Vec<i64>,
    class_log_prior: Vec<f64>,
    feature_log_prob: Vec<Vec<f64>>,
    n_features: usize,
}

impl NaiveBayesModel {
    pub fn from_spec(spec: ClassifierSpec) -> Result<Self, ArtifactError> {
        let n_classes = spec.classes.len();
        if n_classes == 0 {
            return Err(ArtifactError::Invalid("classifier has no classes".to_string()));
        }
        if spec.class_log_prior.len() != n_classes || spec.feature_log_prob.len() != n_classes {
            return Err(ArtifactError::Invalid(format!(
                "{} classes but {} priors and {} likelihood rows",
                n_classes,
                spec.class_log_prior.len(),
                spec.feature_log_prob.len()
            )));
        }

        let n_features = spec.feature_log_prob[0].len();
        if n_features == 0 || spec.feature_log_prob.iter().any(|row| row.len() != n_features) {
            return Err(ArtifactError::Invalid(
                "likelihood rows are empty or of unequal length".to_string(),
            ));
        }
        let has_nan = spec.class_log_prior.iter().any(|v| v.is_nan())
            || spec.feature_log_prob.iter().flatten().any(|v| v.is_nan());
        if has_nan {
            return Err(ArtifactError::Invalid("classifier parameters contain NaN".to_string()));
        }

        Ok(Self {
            classes: spec.classes,
            class_log_prior: spec.class_log_prior,
            feature_log_prob: spec.feature_log_prob,
            n_features,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn classes(&self) -> &[i64] {
        &self.classes
    }

    /// log P(c) + sum_i x_i * log P(w_i | c), one entry per class.
    pub fn joint_log_likelihood(&self, x: &FeatureVector) -> Result<Vec<f64>, ClassifyError> {
        if x.dim() != self.n_features {
            return Err(ClassifyError::DimensionMismatch {
                expected: self.n_features,
                actual: x.dim(),
            });
        }
        Ok(self
            .feature_log_prob
            .iter()
            .zip(self.class_log_prior.iter())
            .map(|(row, prior)| prior + x.dot(row))
            .collect())
    }

    /// Posterior per class, normalized with log-sum-exp.
    pub fn predict_proba(&self, x: &FeatureVector) -> Result<Vec<f64>, ClassifyError> {
        let jll = self.joint_log_likelihood(x)?;
        let max = jll.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() {
            return Err(ClassifyError::NonFinite);
        }
        let sum_exp: f64 = jll.iter().map(|s| (s - max).exp()).sum();
        let log_norm = max + sum_exp.ln();

        let probs: Vec<f64> = jll.iter().map(|s| (s - log_norm).exp()).collect();
        if probs.iter().any(|p| !p.is_finite()) {
            return Err(ClassifyError::NonFinite);
        }
        Ok(probs)
    }

    /// Maximum-posterior class code and its posterior. Ties go to the earliest class.
    pub fn predict(&self, x: &FeatureVector) -> Result<(i64, f64), ClassifyError> {
        let probs = self.predict_proba(x)?;
        let mut best = 0;
        for (idx, p) in probs.iter().enumerate() {
            if *p > probs[best] {
                best = idx;
            }
        }
        Ok((self.classes[best], probs[best].clamp(0.0, 1.0)))
    }
}
