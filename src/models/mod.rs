// Duygu Data Models
// Verdicts, labels and the per-request analysis lifecycle shared by services and the CLI

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

pub type RequestId = Uuid;

// ============ Labels ============

/// Sentiment label projected from the classifier's ordinal class code.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Negative,
    Positive,
    Notr,
    /// Sentinel for a failed local classification.
    #[serde(rename = "Hata")]
    Error,
}

impl Label {
    /// 0 is Negative, 1 is Positive, every other code collapses to Notr.
    pub fn from_ordinal(code: i64) -> Self {
        match code {
            0 => Label::Negative,
            1 => Label::Positive,
            _ => Label::Notr,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Negative => "Negative",
            Label::Positive => "Positive",
            Label::Notr => "Notr",
            Label::Error => "Hata",
        }
    }

    /// Lenient parse used when reading the LLM's free-text answer.
    pub fn from_text(val: &str) -> Option<Self> {
        let cleaned: String = val
            .trim()
            .trim_matches(|c: char| c == '[' || c == ']' || c == '*' || c == '"' || c == '.')
            .to_lowercase();
        match cleaned.as_str() {
            "positive" | "pozitif" | "olumlu" => Some(Label::Positive),
            "negative" | "negatif" | "olumsuz" => Some(Label::Negative),
            "notr" | "nötr" | "neutral" => Some(Label::Notr),
            _ => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============ Local Verdict ============

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalVerdict {
    pub label: Label,
    /// Winning class posterior. A relative strength indicator, not a calibrated probability.
    pub confidence: f64,
}

impl LocalVerdict {
    pub fn new(label: Label, confidence: f64) -> Self {
        Self {
            label,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn failed() -> Self {
        Self {
            label: Label::Error,
            confidence: 0.0,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.label == Label::Error
    }

    /// Confidence formatted the way the result card shows it, e.g. `%87.50`.
    pub fn confidence_display(&self) -> String {
        format!("%{:.2}", self.confidence * 100.0)
    }
}

// ============ Remote Verdict ============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteVerdict {
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Agreement {
    Correct,
    Incorrect,
}

/// Best-effort reading of the three-line answer format. Every field is optional
/// because the remote model is instructed to follow the format, not forced to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredRemoteVerdict {
    pub llm_label: Option<Label>,
    pub agreement: Option<Agreement>,
    pub rationale: Option<String>,
}

/// Every way the remote path can end without a usable verdict.
/// `Display` yields the message shown to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteFailure {
    #[error("HATA: API Key bulunamadı! Lütfen GOOGLE_API_KEY değişkenini veya yapılandırma dosyasını kontrol edin.")]
    CredentialMissing,
    #[error("Yapay zeka boş bir cevap döndürdü. Lütfen tekrar deneyin. (Sebep: {reason})")]
    EmptyOrBlocked { reason: String },
    #[error("HATA: Google API kotası doldu (429). Lütfen 1 dakika bekleyip tekrar deneyin.")]
    QuotaExceeded { detail: String },
    #[error("Bağlantı Hatası: {detail}")]
    Generic { detail: String },
}

pub type RemoteOutcome = Result<RemoteVerdict, RemoteFailure>;

// ============ Analysis Lifecycle ============

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnalysisState {
    Idle,
    LocalClassifying,
    LocalDone,
    RemoteQuerying,
    RemoteDone,
    RemoteFailed,
}

impl AnalysisState {
    pub fn can_transition_to(self, next: AnalysisState) -> bool {
        use AnalysisState::*;
        matches!(
            (self, next),
            (Idle, LocalClassifying)
                | (LocalClassifying, LocalDone)
                | (LocalDone, RemoteQuerying)
                | (RemoteQuerying, RemoteDone)
                | (RemoteQuerying, RemoteFailed)
                | (RemoteDone, Idle)
                | (RemoteFailed, Idle)
        )
    }
}

/// Result of a successful submission: the local half, available immediately.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub request_id: RequestId,
    pub local: LocalVerdict,
}

/// Remote half of an analysis, handed back to the submitting context.
#[derive(Debug, Clone)]
pub struct RemoteDelivery {
    pub request_id: RequestId,
    pub local: LocalVerdict,
    pub outcome: RemoteOutcome,
    pub state: AnalysisState,
    pub latency_ms: i64,
}

impl RemoteDelivery {
    /// Text ready for display, whether the call succeeded or not.
    pub fn display_text(&self) -> String {
        match &self.outcome {
            Ok(verdict) => verdict.text.clone(),
            Err(failure) => failure.to_string(),
        }
    }
}

// ============ Options ============

/// What to do when a submission arrives while remote calls are still running.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum ConcurrencyPolicy {
    /// Every request runs to completion; arrival order of answers is not guaranteed.
    #[default]
    AllowConcurrent,
    /// New submissions are refused while a remote call is pending.
    #[value(alias = "reject")]
    RejectIfBusy,
    /// Older in-flight calls are aborted when a new one is dispatched.
    #[value(alias = "latest")]
    LatestWins,
}
