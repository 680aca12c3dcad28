//! Strat-Opt TUI: seven-panel terminal client for the parameter-sweep backend.
//!
//! Panels:
//! 1. Optimizer: range grid, run options, streaming sweep progress
//! 2. Results: sortable result table, drill-down selection
//! 3. Chart: equity curve for the open row with the buy-and-hold overlay
//! 4. Buy & Hold: baseline backtest
//! 5. Signal: current BUY/SELL/HOLD for one parameter set
//! 6. Settings: local preferences and the backend config
//! 7. Help: keyboard shortcuts

mod app;
mod form;
mod input;
mod logging;
mod table;
mod theme;
mod ui;
mod worker;

use std::io::{self, stdout};
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use stratopt_client::{Backend, ClientConfig, HttpBackend, OfflineBackend};
use stratopt_core::{FileStorage, SettingsStore};

use crate::app::AppState;
use crate::worker::WorkerCommand;

/// Per-step delay for the offline backend, so the progress bar is visible.
const OFFLINE_STEP_DELAY: Duration = Duration::from_millis(40);

#[derive(Parser, Debug)]
#[command(name = "stratopt-tui", version, about = "Terminal client for strategy parameter sweeps")]
struct Cli {
    /// Use the built-in offline backend instead of HTTP.
    #[arg(long)]
    offline: bool,

    /// Client config file (TOML). Defaults to <config dir>/stratopt/client.toml.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the backend base URL.
    #[arg(long)]
    base_url: Option<String>,

    /// Override the ticker.
    #[arg(long)]
    ticker: Option<String>,

    /// Log level for the log file.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Install a panic hook that restores the terminal before printing the panic.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stderr(), LeaveAlternateScreen);
        default_hook(info);
    }));

    // Paths
    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stratopt");
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stratopt");

    let log_path = logging::init_logging(&data_dir, &cli.log_level)?;
    tracing::info!("stratopt-tui starting, logging to {}", log_path.display());

    // Client config, then CLI overrides
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("client.toml"));
    let mut client_config = ClientConfig::load(&config_path)?;
    if let Some(url) = cli.base_url {
        client_config.base_url = url;
    }
    if let Some(ticker) = cli.ticker {
        client_config.ticker = ticker;
    }
    let ticker = client_config.ticker.clone();

    let backend: Arc<dyn Backend> = if cli.offline {
        Arc::new(OfflineBackend::new().with_step_delay(OFFLINE_STEP_DELAY))
    } else {
        Arc::new(HttpBackend::new(client_config)?)
    };
    tracing::info!("backend: {}", backend.name());

    let settings = SettingsStore::load(Box::new(FileStorage::new(&config_dir)));

    // Worker channels
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let (resp_tx, resp_rx) = mpsc::channel();
    let worker_handle = worker::spawn_worker(Arc::clone(&backend), cmd_rx, resp_tx)
        .context("failed to spawn worker thread")?;

    let export_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let mut app = AppState::new(backend, settings, ticker, cmd_tx.clone(), resp_rx, export_dir);
    app.request_config();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_app(&mut terminal, &mut app);

    // Shutdown worker; the session and drill threads are stopped when `app` drops.
    let _ = cmd_tx.send(WorkerCommand::Shutdown);
    let _ = worker_handle.join();
    drop(app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    tracing::info!("stratopt-tui exiting");
    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
) -> Result<()> {
    loop {
        // 1. Render
        terminal.draw(|f| ui::draw(f, app))?;

        // 2. Drain worker responses and streaming events (non-blocking)
        while let Ok(resp) = app.worker_rx.try_recv() {
            app.handle_worker_response(resp);
        }
        app.tick();

        // 3. Poll for input events (50ms timeout for ~20 FPS tick)
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                input::handle_key(app, key);
            }
        }

        // 4. Check quit
        if !app.running {
            break;
        }
    }
    Ok(())
}
