// Analysis Context
// Long-lived handles built once at startup from the app configuration

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::models::ConcurrencyPolicy;
use crate::services::config_store::AppConfig;
use crate::services::providers::{api_key_from_env, ProviderClient, GEMINI_DEFAULT_URL};

use super::hybrid::{HybridEvaluator, RemoteInbox};
use super::llm_judge::GeminiJudge;
use super::local_classifier::LocalClassifier;

const PROVIDER: &str = "google";

/// Local classifier, remote judge and policy. The artifacts are read exactly once, here.
pub struct AnalysisContext {
    local: Arc<LocalClassifier>,
    judge: Arc<GeminiJudge>,
    policy: ConcurrencyPolicy,
    model_dir: PathBuf,
}

/// `GEMINI_API_URL` wins over the configured base URL.
fn resolve_base_url(config: &AppConfig) -> String {
    env::var("GEMINI_API_URL")
        .ok()
        .or_else(|| config.remote.base_url.clone())
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| GEMINI_DEFAULT_URL.to_string())
}

fn resolve_api_key(config: &AppConfig) -> Option<String> {
    api_key_from_env(PROVIDER).or_else(|| {
        config
            .api_keys
            .get(PROVIDER)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    })
}

impl AnalysisContext {
    pub fn from_config(config: &AppConfig) -> Self {
        let model_dir = config.resolved_model_dir();
        let local = LocalClassifier::from_model_dir(&model_dir);

        let client = ProviderClient::with_settings(
            &resolve_base_url(config),
            Duration::from_secs(config.remote.timeout_secs.max(1)),
        );
        let api_key = resolve_api_key(config);
        if api_key.is_none() {
            warn!("[CONTEXT] No Google API key found; remote judgments will report a missing key");
        }
        let judge = GeminiJudge::new(client, api_key, config.remote.model.clone());

        info!(
            "[CONTEXT] model_dir={} local_ready={} remote_model={} endpoint={} policy={:?}",
            model_dir.display(),
            local.is_ready(),
            judge.model(),
            config.remote.base_url.as_deref().unwrap_or("default"),
            config.concurrency
        );

        Self::with_parts(local, judge, config.concurrency, model_dir)
    }

    pub fn with_parts(
        local: LocalClassifier,
        judge: GeminiJudge,
        policy: ConcurrencyPolicy,
        model_dir: PathBuf,
    ) -> Self {
        Self {
            local: Arc::new(local),
            judge: Arc::new(judge),
            policy,
            model_dir,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.local.is_ready()
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    pub fn local(&self) -> &LocalClassifier {
        &self.local
    }

    pub fn judge(&self) -> &GeminiJudge {
        &self.judge
    }

    /// Fresh evaluator and inbox sharing this context's classifier and judge.
    pub fn evaluator(&self) -> (HybridEvaluator, RemoteInbox) {
        self.evaluator_with_policy(self.policy)
    }

    pub fn evaluator_with_policy(&self, policy: ConcurrencyPolicy) -> (HybridEvaluator, RemoteInbox) {
        HybridEvaluator::new(Arc::clone(&self.local), self.judge.clone(), policy)
    }
}
