use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use said::config::Config;
use said::logging::{self, LogLevel};
use said::{FileStorage, OllamaGenerate, TerminalView, TranscriptStore, TurnController};
use tokio::io::{BufReader, stdin};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "said", version, about = "Chat with a local Ollama model")]
struct Cli {
    /// Path to a TOML config file
    #[arg(short = 'c', long, env = "SAID_CONFIG")]
    config: Option<PathBuf>,

    /// Full URL of the generate endpoint
    #[arg(long, env = "SAID_URL")]
    url: Option<String>,

    /// Model name
    #[arg(short = 'm', long, env = "SAID_MODEL")]
    model: Option<String>,

    /// Directory holding the stored conversation
    #[arg(long, env = "SAID_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Start with an empty conversation
    #[arg(long)]
    fresh: bool,

    /// Disable the busy spinner
    #[arg(long)]
    no_spinner: bool,

    /// Logging verbosity level
    #[arg(long, default_value = "warn")]
    log_level: LogLevel,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_level);

    let mut cfg = match &cli.config {
        Some(path) => Config::load(path).await?,
        None => Config::default(),
    };
    if let Some(url) = cli.url {
        cfg.url = url;
    }
    if let Some(model) = cli.model {
        cfg.model = model;
    }
    if let Some(dir) = cli.data_dir {
        cfg.data_dir = dir;
    }
    debug!(?cfg, "configuration");

    let storage = FileStorage::new(&cfg.data_dir);
    let store = TranscriptStore::with_key(Box::new(storage), cfg.history_key.clone());
    let client = Arc::new(OllamaGenerate::new(cfg.url, cfg.model));
    let view = TerminalView::stdout(!cli.no_spinner);
    let mut controller = TurnController::new(store, client, Box::new(view));

    if cli.fresh {
        controller.reset()?;
    } else {
        controller.start()?;
    }

    said::repl::run(&mut controller, BufReader::new(stdin())).await
}
