// Sentiment Analysis Module
// Local Naive Bayes verdict first, then an LLM second opinion
//
// Submodules:
// - vectorizer: pre-fitted bag-of-words / tf-idf feature transform
// - naive_bayes: multinomial Naive Bayes inference
// - artifacts: loading the classifier/vectorizer pair
// - local_classifier: normalize -> vectorize -> classify
// - llm_judge: prompt, remote call and failure classification
// - hybrid: two-phase orchestration and result marshaling
// - context: wiring everything from the app configuration

pub mod artifacts;
pub mod context;
pub mod hybrid;
pub mod llm_judge;
pub mod local_classifier;
pub mod naive_bayes;
pub mod vectorizer;

pub use artifacts::{ArtifactError, ModelArtifactPair, MODEL_FILE, VECTORIZER_FILE};
pub use context::AnalysisContext;
pub use hybrid::{HybridEvaluator, PreflightError, RemoteInbox};
pub use llm_judge::{
    build_judgment_prompt, classify_error_text, classify_failure, parse_structured_verdict,
    GeminiJudge, RemoteJudge,
};
pub use local_classifier::{LocalClassificationError, LocalClassifier};
pub use naive_bayes::{ClassifierKind, ClassifierSpec, ClassifyError, NaiveBayesModel};
pub use vectorizer::{FeatureVector, FittedVectorizer, Norm, VectorizerSpec};
