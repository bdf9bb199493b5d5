// Hybrid Evaluator
// Synchronous local verdict, asynchronous remote judgment marshaled back through an inbox

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use thiserror::Error;
use tokio::sync::{mpsc, Notify};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{
    AnalysisState, ConcurrencyPolicy, LocalVerdict, RemoteDelivery, RemoteFailure, RemoteOutcome,
    RequestId, Submission,
};

use super::llm_judge::RemoteJudge;
use super::local_classifier::LocalClassifier;

/// Reasons a submission is refused before any classification or remote call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreflightError {
    #[error("Lütfen bir metin girin.")]
    EmptyText,
    #[error("Model dosyaları bulunamadı. Önce modeli eğitin.")]
    ArtifactMissing,
    #[error("Önceki analiz henüz tamamlanmadı ({in_flight} istek bekliyor).")]
    Busy { in_flight: usize },
}

/// Receiving end for remote results. Owned by the context that submits.
pub struct RemoteInbox {
    rx: mpsc::UnboundedReceiver<RemoteDelivery>,
}

impl RemoteInbox {
    pub async fn recv(&mut self) -> Option<RemoteDelivery> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<RemoteDelivery> {
        self.rx.try_recv().ok()
    }
}

/// Abort handles of dispatched remote calls, keyed by request id.
struct InFlight {
    tasks: Mutex<HashMap<RequestId, AbortHandle>>,
    idle: Notify,
}

impl InFlight {
    fn new() -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
            idle: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RequestId, AbortHandle>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn release(&self, request_id: &RequestId) {
        let mut tasks = self.lock();
        tasks.remove(request_id);
        if tasks.is_empty() {
            self.idle.notify_waiters();
        }
    }
}

fn advance(request_id: RequestId, state: &mut AnalysisState, next: AnalysisState) {
    if state.can_transition_to(next) {
        debug!("[HYBRID] {} state {:?} -> {:?}", request_id, state, next);
    } else {
        warn!("[HYBRID] {} unexpected transition {:?} -> {:?}", request_id, state, next);
    }
    *state = next;
}

/// Awaits one remote call and turns however it ended into at most one delivery.
/// Aborted calls deliver nothing. The entry is released on every path.
async fn supervise(
    request_id: RequestId,
    local: LocalVerdict,
    mut state: AnalysisState,
    call: JoinHandle<RemoteOutcome>,
    outbox: mpsc::UnboundedSender<RemoteDelivery>,
    registry: Arc<InFlight>,
    start: Instant,
) {
    let outcome = match call.await {
        Ok(outcome) => Some(outcome),
        Err(e) if e.is_panic() => {
            warn!("[HYBRID] {} remote judge panicked", request_id);
            Some(Err(RemoteFailure::Generic {
                detail: "uzak değerlendirme beklenmedik şekilde sonlandı".to_string(),
            }))
        }
        Err(_) => {
            info!("[HYBRID] {} remote call cancelled", request_id);
            None
        }
    };

    if let Some(outcome) = outcome {
        let latency_ms = start.elapsed().as_millis() as i64;
        let next = if outcome.is_ok() {
            AnalysisState::RemoteDone
        } else {
            AnalysisState::RemoteFailed
        };
        advance(request_id, &mut state, next);
        info!("[HYBRID] {} state={:?} latency_ms={}", request_id, state, latency_ms);

        let delivery = RemoteDelivery {
            request_id,
            local,
            outcome,
            state,
            latency_ms,
        };
        if outbox.send(delivery).is_err() {
            debug!("[HYBRID] {} inbox closed, dropping remote result", request_id);
        }
    }
    // Released after queuing: zero in flight means every result is in the inbox.
    registry.release(&request_id);
}

pub struct HybridEvaluator {
    local: Arc<LocalClassifier>,
    judge: Arc<dyn RemoteJudge>,
    policy: ConcurrencyPolicy,
    outbox: mpsc::UnboundedSender<RemoteDelivery>,
    in_flight: Arc<InFlight>,
}

impl HybridEvaluator {
    pub fn new(
        local: Arc<LocalClassifier>,
        judge: Arc<dyn RemoteJudge>,
        policy: ConcurrencyPolicy,
    ) -> (Self, RemoteInbox) {
        let (outbox, rx) = mpsc::unbounded_channel();
        let evaluator = Self {
            local,
            judge,
            policy,
            outbox,
            in_flight: Arc::new(InFlight::new()),
        };
        (evaluator, RemoteInbox { rx })
    }

    pub fn policy(&self) -> ConcurrencyPolicy {
        self.policy
    }

    pub fn local(&self) -> &LocalClassifier {
        &self.local
    }

    /// Remote calls dispatched and not yet finished or aborted.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Resolves once every dispatched remote call has finished or been aborted.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.in_flight.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Runs the local phase and dispatches the remote phase in the background.
    ///
    /// Returns as soon as the local verdict exists; the remote result arrives later
    /// on the [`RemoteInbox`] tagged with the same request id. Must be called from
    /// within a Tokio runtime.
    pub fn submit(&self, text: &str) -> Result<Submission, PreflightError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PreflightError::EmptyText);
        }
        if !self.local.is_ready() {
            warn!("[HYBRID] Rejecting submission: model artifacts not loaded");
            return Err(PreflightError::ArtifactMissing);
        }

        // Held until the new task is registered so busy checks and aborts see a consistent set.
        let mut in_flight = self.in_flight.lock();
        if self.policy == ConcurrencyPolicy::RejectIfBusy && !in_flight.is_empty() {
            info!("[HYBRID] Busy, rejecting submission (in_flight={})", in_flight.len());
            return Err(PreflightError::Busy {
                in_flight: in_flight.len(),
            });
        }

        let request_id = Uuid::new_v4();
        let mut state = AnalysisState::Idle;
        advance(request_id, &mut state, AnalysisState::LocalClassifying);
        let local = self.local.classify_local(text);
        advance(request_id, &mut state, AnalysisState::LocalDone);
        info!(
            "[HYBRID] {} local verdict label={} confidence={}",
            request_id,
            local.label,
            local.confidence_display()
        );

        if self.policy == ConcurrencyPolicy::LatestWins {
            for (older, handle) in in_flight.drain() {
                handle.abort();
                info!("[HYBRID] {} superseded by {}, remote call aborted", older, request_id);
            }
        }

        let judge = Arc::clone(&self.judge);
        let owned_text = text.to_string();
        let label = local.label;

        advance(request_id, &mut state, AnalysisState::RemoteQuerying);
        let start = Instant::now();
        // The sentinel label is forwarded too; the judge still gets to answer.
        let call = tokio::spawn(async move { judge.judge(&owned_text, label).await });
        in_flight.insert(request_id, call.abort_handle());
        tokio::spawn(supervise(
            request_id,
            local,
            state,
            call,
            self.outbox.clone(),
            Arc::clone(&self.in_flight),
            start,
        ));

        Ok(Submission { request_id, local })
    }
}
