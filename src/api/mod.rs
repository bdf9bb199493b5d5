// Command Handlers
// Entry points behind the `duygu` binary: one-shot analysis, interactive session, model listing, key storage

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

use crate::models::{Agreement, LocalVerdict, RemoteDelivery};
use crate::services::sentiment::{parse_structured_verdict, AnalysisContext};
use crate::services::{AppConfig, ConfigStore};

pub const RETRAIN_NOTICE: &str = "Eğitim fonksiyonu bu arayüzde henüz kullanılamıyor. \
Modeli yeniden eğitmek için eğitim betiğini çalıştırıp sentiment_model.json ve vectorizer.json dosyalarını model dizinine kopyalayın.";

const REPL_BANNER: &str = "Duygu Analizi: metni yazıp Enter'a basın (çıkmak için :q).";
const REPL_QUIT: [&str; 3] = [":q", "exit", "quit"];

fn io_err(e: std::io::Error) -> String {
    format!("Çıktı yazılamadı: {}", e)
}

/// Local half of the result, rendered immediately after submission.
pub fn format_local_card(local: &LocalVerdict) -> String {
    format!(
        "Yerel Model (Naive Bayes)\n  Tahmin: {}\n  Güven Skoru: {}",
        local.label,
        local.confidence_display()
    )
}

/// Remote half: raw judge text (or the failure message) plus whatever the structured reading found.
pub fn format_remote_card(delivery: &RemoteDelivery) -> String {
    let mut card = String::from("Gemini AI Değerlendirmesi\n");
    for line in delivery.display_text().lines() {
        card.push_str("  ");
        card.push_str(line);
        card.push('\n');
    }

    if let Ok(verdict) = &delivery.outcome {
        let structured = parse_structured_verdict(&verdict.text);
        if let Some(agreement) = structured.agreement {
            let mark = match agreement {
                Agreement::Correct => "yerel tahmini onayladı",
                Agreement::Incorrect => "yerel tahmine katılmadı",
            };
            card.push_str(&format!("  [Özet: LLM {}]\n", mark));
        }
    }
    card.push_str(&format!("  ({} ms)", delivery.latency_ms));
    card
}

/// Analyze one text: print the local verdict, then wait for and print the remote one.
pub async fn analyze_once<W: Write>(
    ctx: &AnalysisContext,
    text: &str,
    out: &mut W,
) -> Result<RemoteDelivery, String> {
    let (evaluator, mut inbox) = ctx.evaluator();
    let submission = evaluator.submit(text).map_err(|e| e.to_string())?;

    writeln!(out, "{}", format_local_card(&submission.local)).map_err(io_err)?;
    writeln!(out, "LLM (Yapay Zeka) Doğrulaması Başlatılıyor...").map_err(io_err)?;
    out.flush().map_err(io_err)?;

    let delivery = inbox
        .recv()
        .await
        .ok_or_else(|| "Uzak değerlendirme sonucu alınamadı.".to_string())?;
    writeln!(out, "{}", format_remote_card(&delivery)).map_err(io_err)?;
    Ok(delivery)
}

/// Stored configuration, or the defaults when the file cannot be read or parsed.
pub fn load_config(store: &ConfigStore) -> AppConfig {
    match store.load() {
        Ok(config) => config,
        Err(e) => {
            warn!(
                "[CLI] Ignoring unreadable config {}: {}; using defaults",
                store.config_file().display(),
                e
            );
            AppConfig::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplSummary {
    pub submitted: usize,
    pub rejected: usize,
    pub delivered: usize,
}

/// Interactive session. Local verdicts print as lines arrive; remote verdicts print
/// whenever the inbox yields them. On end of input, in-flight judgments are awaited.
pub async fn run_repl<R, W>(ctx: &AnalysisContext, input: R, out: &mut W) -> Result<ReplSummary, String>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let (evaluator, mut inbox) = ctx.evaluator();
    let mut lines = input.lines();
    let mut summary = ReplSummary::default();

    writeln!(out, "{}", REPL_BANNER).map_err(io_err)?;
    if !ctx.is_ready() {
        writeln!(out, "Uyarı: model dosyaları yüklenemedi ({}).", ctx.model_dir().display())
            .map_err(io_err)?;
    }
    out.flush().map_err(io_err)?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.map_err(|e| format!("Girdi okunamadı: {}", e))? else {
                    break;
                };
                if REPL_QUIT.contains(&line.trim()) {
                    break;
                }
                match evaluator.submit(&line) {
                    Ok(submission) => {
                        summary.submitted += 1;
                        writeln!(out, "{}", format_local_card(&submission.local)).map_err(io_err)?;
                    }
                    Err(e) => {
                        summary.rejected += 1;
                        writeln!(out, "Uyarı: {}", e).map_err(io_err)?;
                    }
                }
                out.flush().map_err(io_err)?;
            }
            Some(delivery) = inbox.recv() => {
                summary.delivered += 1;
                writeln!(out, "{}", format_remote_card(&delivery)).map_err(io_err)?;
                out.flush().map_err(io_err)?;
            }
        }
    }

    if evaluator.in_flight() > 0 {
        info!("[REPL] Input closed, waiting for {} remote judgment(s)", evaluator.in_flight());
    }
    evaluator.wait_idle().await;
    while let Some(delivery) = inbox.try_recv() {
        summary.delivered += 1;
        writeln!(out, "{}", format_remote_card(&delivery)).map_err(io_err)?;
    }
    out.flush().map_err(io_err)?;

    info!(
        "[REPL] Session ended submitted={} rejected={} delivered={}",
        summary.submitted, summary.rejected, summary.delivered
    );
    Ok(summary)
}

/// Print the models that can serve `generateContent`.
pub async fn list_models<W: Write>(ctx: &AnalysisContext, out: &mut W) -> Result<usize, String> {
    let models = ctx.judge().list_models().await.map_err(|e| e.to_string())?;
    for model in &models {
        match model.display_name.as_deref() {
            Some(display) => writeln!(out, "{}  ({})", model.name, display),
            None => writeln!(out, "{}", model.name),
        }
        .map_err(io_err)?;
    }
    Ok(models.len())
}

/// Persist the Google API key in the config file.
pub fn store_api_key(store: &ConfigStore, key: &str) -> Result<(), String> {
    let key = key.trim();
    if key.is_empty() {
        return Err("API anahtarı boş olamaz.".to_string());
    }
    store.set_api_key("google", key).map_err(|e| {
        warn!("[CONFIG] Failed to store API key: {}", e);
        e.to_string()
    })?;
    info!("[CONFIG] API key stored in {}", store.config_file().display());
    Ok(())
}

pub fn retrain_notice() -> &'static str {
    RETRAIN_NOTICE
}
