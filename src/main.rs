//! duygu: hybrid Turkish sentiment analysis from the terminal

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing::info;

use duygu_lib::api;
use duygu_lib::models::ConcurrencyPolicy;
use duygu_lib::services::{AnalysisContext, ConfigStore};

/// Local Naive Bayes verdict with a Gemini second opinion
#[derive(Parser)]
#[command(name = "duygu")]
#[command(version = duygu_lib::PKG_VERSION)]
#[command(about = "Türkçe hibrit duygu analizi")]
struct Args {
    /// Config directory (default: <config dir>/duygu)
    #[arg(long, env = "DUYGU_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Directory holding sentiment_model.json and vectorizer.json
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Remote model name
    #[arg(long)]
    model: Option<String>,

    /// Behavior while remote calls are pending
    #[arg(long, value_enum)]
    policy: Option<ConcurrencyPolicy>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a single text and wait for the remote judgment
    Analyze {
        /// Text to analyze
        text: String,
    },

    /// Read texts line by line from stdin (default)
    Repl,

    /// List remote models that support generateContent
    Models,

    /// Store the Google API key in the config file
    SetKey {
        key: String,
    },

    /// Retrain the local model
    Retrain,
}

fn config_store(args: &Args) -> Result<ConfigStore> {
    let dir = match &args.config_dir {
        Some(dir) => dir.clone(),
        None => ConfigStore::default_config_dir()
            .ok_or_else(|| anyhow!("could not determine a config directory; pass --config-dir"))?,
    };
    Ok(ConfigStore::new(dir))
}

#[tokio::main]
async fn main() -> Result<()> {
    duygu_lib::init_logging();
    let args = Args::parse();
    let store = config_store(&args)?;

    let command = args.command.unwrap_or(Command::Repl);

    match &command {
        Command::SetKey { key } => {
            api::store_api_key(&store, key).map_err(|e| anyhow!(e))?;
            println!("API anahtarı kaydedildi: {}", store.config_file().display());
            return Ok(());
        }
        Command::Retrain => {
            println!("{}", api::retrain_notice());
            return Ok(());
        }
        _ => {}
    }

    let mut config = api::load_config(&store);
    if let Some(dir) = &args.model_dir {
        config.model_dir = Some(dir.to_string_lossy().to_string());
    }
    if let Some(model) = &args.model {
        config.remote.model = model.clone();
    }
    if let Some(policy) = args.policy {
        config.concurrency = policy;
    }

    let ctx = AnalysisContext::from_config(&config);
    info!(startup_ms = duygu_lib::startup_elapsed_ms(), "context.ready");

    let mut stdout = std::io::stdout();
    match &command {
        Command::Analyze { text } => {
            api::analyze_once(&ctx, text, &mut stdout)
                .await
                .map_err(|e| anyhow!(e))?;
        }
        Command::Models => {
            let count = api::list_models(&ctx, &mut stdout)
                .await
                .map_err(|e| anyhow!(e))?;
            info!("[CLI] Listed {} models", count);
        }
        _ => {
            let input = BufReader::new(tokio::io::stdin());
            api::run_repl(&ctx, input, &mut stdout)
                .await
                .map_err(|e| anyhow!(e))?;
        }
    }

    Ok(())
}
