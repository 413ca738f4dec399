use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use trustlayer_core::{
    default_data_dir, open_store, save_history, ChatSession, ConfigFile, StoreKind, SystemClock, Variant,
};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

/// How often pending replies are checked
const TICK_RATE: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[command(name = "trustlayer")]
#[command(about = "Support chat with a human trust layer, in your terminal")]
#[command(version)]
struct Cli {
    /// Reply style: delayed (typing indicator) or instant
    #[arg(short, long, env = "TRUSTLAYER_VARIANT")]
    variant: Option<String>,

    /// Where history is kept: file, sqlite or memory
    #[arg(short, long, env = "TRUSTLAYER_STORE")]
    store: Option<String>,

    /// Config file (defaults to <config dir>/trustlayer/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for history and logs
    #[arg(long, env = "TRUSTLAYER_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log file (defaults to <data dir>/trustlayer.log)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Start with an empty conversation
    #[arg(long)]
    clear_history: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_file = load_config(cli.config.as_deref())?;

    let variant = cli.variant.as_deref().map(parse_variant).transpose()?;
    let config = config_file.resolve(variant)?;

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };
    let log_file = cli.log_file.unwrap_or_else(|| data_dir.join("trustlayer.log"));
    init_logging(&log_file)?;

    let store_kind = match cli.store.as_deref() {
        Some(s) => StoreKind::from_str(s).ok_or_else(|| anyhow!("unknown store {:?} (file, sqlite, memory)", s))?,
        None => config_file.store_kind()?.unwrap_or_default(),
    };
    let mut store = open_store(store_kind, &data_dir)?;
    if cli.clear_history {
        save_history(&mut *store, &config.history_key, &[])?;
        log::info!("history cleared");
    }

    let session = ChatSession::new(config, store, Box::new(SystemClock::new()))?;
    let mut app = App::new(session);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app).await;

    app.session.end();
    tui::restore()?;
    result
}

async fn run(terminal: &mut Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new(TICK_RATE);

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }
    }

    Ok(())
}

/// A missing file means defaults; an unreadable or malformed one stops startup
fn load_config(path: Option<&Path>) -> Result<ConfigFile> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => ConfigFile::get_config_path()?,
    };
    ConfigFile::load_from(&path).with_context(|| format!("loading config {}", path.display()))
}

fn parse_variant(s: &str) -> Result<Variant> {
    Variant::from_str(s).ok_or_else(|| {
        let known: Vec<&str> = Variant::all().iter().map(|v| v.as_str()).collect();
        anyhow!("unknown variant {:?} (expected one of: {})", s, known.join(", "))
    })
}

/// Logs go to a file; the terminal belongs to the UI
fn init_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variant() {
        assert_eq!(parse_variant("Instant").unwrap(), Variant::Instant);
        let err = parse_variant("slow").unwrap_err().to_string();
        assert!(err.contains("delayed, instant"));
    }

    #[test]
    fn test_malformed_config_fails_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = format!("{:#}", load_config(Some(&path)).unwrap_err());
        assert!(err.contains("loading config"));
        assert!(err.contains("config.json"));

        let missing = load_config(Some(&dir.path().join("absent.json"))).unwrap();
        assert!(missing.variant.is_none());
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from([
            "trustlayer",
            "--variant",
            "instant",
            "--store",
            "sqlite",
            "--clear-history",
        ])
        .unwrap();
        assert_eq!(cli.variant.as_deref(), Some("instant"));
        assert_eq!(cli.store.as_deref(), Some("sqlite"));
        assert!(cli.clear_history);
        assert!(cli.config.is_none());
    }
}
