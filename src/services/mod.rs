// Duygu Core Services
// Text normalization, configuration, the Gemini client and the sentiment pipeline

pub mod text_processor;
pub mod config_store;
pub mod providers;
pub mod sentiment;

pub use text_processor::*;
pub use config_store::*;
pub use providers::*;

pub use sentiment::{
    AnalysisContext,
    GeminiJudge,
    HybridEvaluator,
    LocalClassifier,
    ModelArtifactPair,
    PreflightError,
    RemoteInbox,
    RemoteJudge,
};
