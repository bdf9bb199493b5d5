//! Shared helpers: a tiny six-term model written as real artifact files.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use duygu_lib::services::providers::ProviderClient;
use duygu_lib::services::sentiment::{
    ClassifierKind, ClassifierSpec, GeminiJudge, LocalClassifier, ModelArtifactPair, VectorizerSpec,
    MODEL_FILE, VECTORIZER_FILE,
};
use duygu_lib::services::TextNormalizer;

pub const TERMS: [&str; 6] = ["harika", "güzel", "kötü", "berbat", "film", "normal"];

pub fn vectorizer_spec() -> VectorizerSpec {
    VectorizerSpec::counts(TERMS)
}

pub fn classifier_spec() -> ClassifierSpec {
    let ln = |row: [f64; 6]| row.iter().map(|p| p.ln()).collect::<Vec<f64>>();
    ClassifierSpec {
        kind: ClassifierKind::MultinomialNb,
        classes: vec![0, 1, 2],
        class_log_prior: vec![(1.0f64 / 3.0).ln(); 3],
        feature_log_prob: vec![
            ln([0.05, 0.05, 0.35, 0.35, 0.1, 0.1]),
            ln([0.35, 0.35, 0.05, 0.05, 0.1, 0.1]),
            ln([0.1, 0.1, 0.1, 0.1, 0.2, 0.4]),
        ],
    }
}

pub fn write_artifacts(dir: &Path) {
    fs::write(
        dir.join(MODEL_FILE),
        serde_json::to_string_pretty(&classifier_spec()).unwrap(),
    )
    .unwrap();
    fs::write(
        dir.join(VECTORIZER_FILE),
        serde_json::to_string_pretty(&vectorizer_spec()).unwrap(),
    )
    .unwrap();
}

/// Classifier over the artifacts in `dir`, with identity stemming.
pub fn local_classifier(dir: &Path) -> LocalClassifier {
    let normalizer = TextNormalizer::with_stemmer_fn(|token| token.to_string());
    let pair = ModelArtifactPair::load(dir).ok();
    LocalClassifier::new(normalizer, pair)
}

pub fn judge_for(base_url: &str, api_key: Option<&str>) -> GeminiJudge {
    GeminiJudge::new(
        ProviderClient::with_settings(base_url, Duration::from_secs(5)),
        api_key.map(str::to_string),
        "gemini-flash-latest",
    )
}

pub fn arc_local(dir: &Path) -> Arc<LocalClassifier> {
    Arc::new(local_classifier(dir))
}

pub const GENERATE_PATH: &str = "/v1beta/models/gemini-flash-latest:generateContent";

pub fn judge_answer_json(text: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }]
    })
}
