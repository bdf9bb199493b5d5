// Remote Judgment Client
// Asks the LLM for its own label and a critique of the local verdict

use async_trait::async_trait;
use tracing::{info, warn};

use crate::models::{
    Agreement, Label, RemoteFailure, RemoteOutcome, RemoteVerdict, StructuredRemoteVerdict,
};
use crate::services::providers::{
    block_none_safety_settings, ModelInfo, ProviderClient, ProviderError, GEMINI_DEFAULT_MODEL,
};

/// Marker the service puts in rate-limit / quota error text.
const QUOTA_MARKER: &str = "429";

const JUDGMENT_PROMPT_TEMPLATE: &str = r#"Sen uzman bir Türkçe Duygu Analizi asistanısın.

Analiz edilecek metin: "{text}"

Bizim yerel makine öğrenmesi modelimiz (Naive Bayes) bu metni şu şekilde etiketledi: "{label}"

Görevin:
1. Metnin duygu durumunu sen de analiz et (Positive, Negative veya Notr).
2. Yerel modelin tahmini doğru mu yanlış mı değerlendir.
3. Kısa bir açıklama yap.

Cevabını şu formatta ver:
LLM Tahmini: [Senin Kararın]
Yerel Model: [Doğru/Yanlış]
Açıklama: [Kısa açıklaman]"#;

/// Fixed prompt with the raw text and local label embedded verbatim.
pub fn build_judgment_prompt(text: &str, local_label: Label) -> String {
    // Label first: the user text may itself contain "{label}".
    JUDGMENT_PROMPT_TEMPLATE
        .replace("{label}", local_label.as_str())
        .replacen("{text}", text, 1)
}

/// Transport/service error text to a failure kind.
pub fn classify_error_text(detail: &str) -> RemoteFailure {
    if detail.contains(QUOTA_MARKER) {
        RemoteFailure::QuotaExceeded {
            detail: detail.to_string(),
        }
    } else {
        RemoteFailure::Generic {
            detail: detail.to_string(),
        }
    }
}

pub fn classify_failure(err: &ProviderError) -> RemoteFailure {
    match err {
        ProviderError::EmptyResponse { reason } => RemoteFailure::EmptyOrBlocked {
            reason: reason.clone(),
        },
        ProviderError::MissingApiKey => RemoteFailure::CredentialMissing,
        // Transport errors embed the request URL, whose port may contain the marker.
        ProviderError::HttpError(e) => match e.status() {
            Some(status) if status.as_u16() == 429 => RemoteFailure::QuotaExceeded {
                detail: err.to_string(),
            },
            _ => RemoteFailure::Generic {
                detail: err.to_string(),
            },
        },
        other => classify_error_text(&other.to_string()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    LlmLabel,
    Agreement,
    Rationale,
}

fn field_for_key(key: &str) -> Option<Field> {
    let key = key
        .trim()
        .trim_matches(|c: char| c == '*' || c == '#' || c == '-')
        .trim()
        .to_lowercase();
    if key.contains("llm") && key.contains("tahmin") {
        Some(Field::LlmLabel)
    } else if key.contains("yerel model") {
        Some(Field::Agreement)
    } else if key.contains("açıklama") || key.contains("aciklama") {
        Some(Field::Rationale)
    } else {
        None
    }
}

fn parse_agreement(value: &str) -> Option<Agreement> {
    let lowered = value.to_lowercase();
    if lowered.contains("yanlış") || lowered.contains("yanlis") {
        Some(Agreement::Incorrect)
    } else if lowered.contains("doğru") || lowered.contains("dogru") {
        Some(Agreement::Correct)
    } else {
        None
    }
}

/// Tolerant reading of the three labeled lines. Missing or malformed lines leave fields empty.
pub fn parse_structured_verdict(text: &str) -> StructuredRemoteVerdict {
    let mut verdict = StructuredRemoteVerdict::default();
    let mut rationale_lines: Vec<String> = Vec::new();
    let mut in_rationale = false;

    for line in text.lines() {
        let field = line.split_once(':').and_then(|(key, value)| {
            field_for_key(key).map(|f| (f, value.trim().trim_matches('*').trim()))
        });

        match field {
            Some((Field::LlmLabel, value)) => {
                in_rationale = false;
                verdict.llm_label = Label::from_text(value).or_else(|| {
                    value.split_whitespace().next().and_then(Label::from_text)
                });
            }
            Some((Field::Agreement, value)) => {
                in_rationale = false;
                verdict.agreement = parse_agreement(value);
            }
            Some((Field::Rationale, value)) => {
                in_rationale = true;
                if !value.is_empty() {
                    rationale_lines.push(value.to_string());
                }
            }
            None if in_rationale => {
                let value = line.trim();
                if !value.is_empty() {
                    rationale_lines.push(value.to_string());
                }
            }
            None => {}
        }
    }

    if !rationale_lines.is_empty() {
        verdict.rationale = Some(rationale_lines.join("\n"));
    }
    verdict
}

/// Second-opinion source for the hybrid evaluator.
#[async_trait]
pub trait RemoteJudge: Send + Sync {
    async fn judge(&self, text: &str, local_label: Label) -> RemoteOutcome;
}

pub struct GeminiJudge {
    client: ProviderClient,
    api_key: Option<String>,
    model: String,
}

impl GeminiJudge {
    pub fn new(client: ProviderClient, api_key: Option<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: if model.trim().is_empty() {
                GEMINI_DEFAULT_MODEL.to_string()
            } else {
                model
            },
        }
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Models that accept `generateContent`.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, RemoteFailure> {
        let api_key = self.api_key.as_deref().ok_or(RemoteFailure::CredentialMissing)?;
        let models = self
            .client
            .list_models(api_key)
            .await
            .map_err(|e| classify_failure(&e))?;
        Ok(models
            .into_iter()
            .filter(|m| m.supported_generation_methods.iter().any(|g| g == "generateContent"))
            .collect())
    }
}

#[async_trait]
impl RemoteJudge for GeminiJudge {
    async fn judge(&self, text: &str, local_label: Label) -> RemoteOutcome {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!("[LLM_JUDGE] API key not configured, skipping remote judgment");
            return Err(RemoteFailure::CredentialMissing);
        };

        let prompt = build_judgment_prompt(text, local_label);
        info!(
            "[LLM_JUDGE] Requesting judgment model={} text_chars={} local_label={}",
            self.model,
            text.chars().count(),
            local_label
        );

        match self
            .client
            .generate_content(&self.model, api_key, &prompt, block_none_safety_settings())
            .await
        {
            Ok(result) => {
                info!(
                    "[LLM_JUDGE] ok model={} latency_ms={} finish_reason={:?}",
                    self.model, result.latency_ms, result.finish_reason
                );
                Ok(RemoteVerdict {
                    text: result.content,
                })
            }
            Err(e) => {
                let failure = classify_failure(&e);
                match &failure {
                    RemoteFailure::EmptyOrBlocked { reason } => {
                        warn!("[LLM_JUDGE] empty response, finish/block reason: {}", reason)
                    }
                    _ => warn!("[LLM_JUDGE] request failed: {}", e),
                }
                Err(failure)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_text_and_label_verbatim() {
        let prompt = build_judgment_prompt("Kargo \"çok\" geç geldi {label}", Label::Negative);
        assert!(prompt.contains("Analiz edilecek metin: \"Kargo \"çok\" geç geldi {label}\""));
        assert!(prompt.contains("şu şekilde etiketledi: \"Negative\""));
        assert!(prompt.contains("LLM Tahmini: [Senin Kararın]"));
        assert!(prompt.contains("Yerel Model: [Doğru/Yanlış]"));
        assert!(prompt.contains("Açıklama: [Kısa açıklaman]"));
        assert!(prompt.contains("(Positive, Negative veya Notr)"));
    }

    #[test]
    fn test_quota_marker_detection() {
        assert!(matches!(
            classify_error_text("API error: 429 - RESOURCE_EXHAUSTED"),
            RemoteFailure::QuotaExceeded { .. }
        ));
        assert!(matches!(
            classify_error_text("API error: 503 - unavailable"),
            RemoteFailure::Generic { .. }
        ));
        let api = ProviderError::ApiError {
            status: 429,
            message: "quota".to_string(),
        };
        assert!(matches!(classify_failure(&api), RemoteFailure::QuotaExceeded { .. }));
    }

    #[test]
    fn test_empty_response_maps_to_blocked() {
        let err = ProviderError::EmptyResponse {
            reason: "SAFETY".to_string(),
        };
        assert_eq!(
            classify_failure(&err),
            RemoteFailure::EmptyOrBlocked {
                reason: "SAFETY".to_string()
            }
        );
        assert_eq!(classify_failure(&ProviderError::MissingApiKey), RemoteFailure::CredentialMissing);
    }

    #[test]
    fn test_parse_well_formed_answer() {
        let text = "LLM Tahmini: Positive\nYerel Model: Doğru\nAçıklama: Metin açıkça memnuniyet bildiriyor.";
        let parsed = parse_structured_verdict(text);
        assert_eq!(parsed.llm_label, Some(Label::Positive));
        assert_eq!(parsed.agreement, Some(Agreement::Correct));
        assert_eq!(parsed.rationale.as_deref(), Some("Metin açıkça memnuniyet bildiriyor."));
    }

    #[test]
    fn test_parse_markdown_and_multiline() {
        let text = "**LLM Tahmini:** [Negative]\n**Yerel Model:** Yanlış\n**Açıklama:**\nKullanıcı şikayet ediyor.\nÜrün kırık gelmiş.";
        let parsed = parse_structured_verdict(text);
        assert_eq!(parsed.llm_label, Some(Label::Negative));
        assert_eq!(parsed.agreement, Some(Agreement::Incorrect));
        assert_eq!(
            parsed.rationale.as_deref(),
            Some("Kullanıcı şikayet ediyor.\nÜrün kırık gelmiş.")
        );
    }

    #[test]
    fn test_parse_tolerates_free_text() {
        let parsed = parse_structured_verdict("Bence bu metin biraz karışık.");
        assert_eq!(parsed, StructuredRemoteVerdict::default());

        let partial = parse_structured_verdict("LLM Tahmini: Notr (kararsız)");
        assert_eq!(partial.llm_label, Some(Label::Notr));
        assert!(partial.agreement.is_none());
    }

    #[tokio::test]
    async fn test_missing_key_short_circuits() {
        let judge = GeminiJudge::new(
            ProviderClient::with_settings("http://127.0.0.1:9", std::time::Duration::from_millis(50)),
            Some("   ".to_string()),
            "",
        );
        assert!(!judge.has_credential());
        assert_eq!(judge.model(), GEMINI_DEFAULT_MODEL);
        assert_eq!(
            judge.judge("harika", Label::Positive).await,
            Err(RemoteFailure::CredentialMissing)
        );
        assert_eq!(judge.list_models().await, Err(RemoteFailure::CredentialMissing));
    }
}
