mod api;
mod app;
mod config;
mod error;
mod models;
mod stats;
mod store;
mod ui;
mod voice;

use crate::api::ApiClient;
use crate::app::App;
use crate::config::Config;
use crate::error::ConfigError;
use crate::models::Category;
use crate::store::{MemoryStore, TaskStore};
use crate::voice::executor::CommandExecutor;
use crate::voice::intent::IntentParser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use dotenv::dotenv;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::{self, OpenOptions};
use std::io;
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// The terminal belongs to the UI, so logs go to a file.
fn init_logging(config: &Config) -> io::Result<()> {
    let path = config.log_file();
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("voicetask=info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn executor<S: TaskStore>(store: S, config: &Config) -> CommandExecutor<S> {
    CommandExecutor::new(store)
        .with_parser(IntentParser::new(config.voice.strictness()))
        .with_matching(config.voice.match_strategy())
}

async fn start<S: TaskStore>(
    config: &Config,
    store: S,
    categories: Vec<Category>,
) -> Result<(), Box<dyn std::error::Error>> {
    let tasks = store.list_tasks().await?;
    info!(count = tasks.len(), "tasks loaded");
    let app = App::new(executor(store, config), tasks, categories, &config.reminders);

    // Setup terminal UI
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    terminal.hide_cursor()?;

    let res = ui::run_app(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::load()?;
    init_logging(&config)?;

    if config.offline {
        info!("running offline with an in-memory store");
        return start(&config, MemoryStore::new(), Vec::new()).await;
    }

    let (Some(url), Some(key)) = (&config.instance_url, &config.api_key) else {
        return Err(ConfigError::Missing("INSTANCE_URL and API_KEY").into());
    };
    let client = ApiClient::new(url, key);
    let categories = client.fetch_categories().await.unwrap_or_else(|err| {
        warn!(%err, "could not load categories");
        Vec::new()
    });
    start(&config, client, categories).await
}
