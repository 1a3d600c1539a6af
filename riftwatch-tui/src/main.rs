//! riftwatch - live lobby companion
//!
//! Terminal UI that follows a companion backend's push channel, analyses
//! both rosters' match history and gates automation commands on the game
//! client connection.

mod app;
mod ui;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{Event, EventStream},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use riftwatch_core::backend::BackendClient;
use riftwatch_core::push::PushClient;
use riftwatch_core::Config;
use tokio::sync::{mpsc, oneshot};

use crate::app::App;

/// Redraw interval, keeps relative times fresh
const TICK: Duration = Duration::from_secs(1);

#[derive(Parser, Debug)]
#[command(name = "riftwatch")]
#[command(about = "Live lobby companion for the game client")]
#[command(version)]
struct Args {
    /// Config file (default: $XDG_CONFIG_HOME/riftwatch/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Backend base URL, overrides the config file
    #[arg(long)]
    backend: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;

    if let Some(url) = args.backend {
        config.backend.base_url = url;
    }
    config
        .backend
        .validate()
        .context("invalid backend configuration")?;

    // Initialize logging (to file, not stdout since we have a TUI)
    let _log_guard =
        riftwatch_core::logging::init(&config).context("failed to initialize logging")?;

    tracing::info!(backend = %config.backend.base_url, "riftwatch starting up");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let result = runtime.block_on(run(config));

    tracing::info!("riftwatch shutting down");

    result
}

async fn run(config: Config) -> Result<()> {
    let client = Arc::new(
        BackendClient::new(config.backend.clone()).context("failed to create backend client")?,
    );
    let push = PushClient::new(&config.push, &config.backend).context("invalid push URL")?;
    tracing::info!(url = %push.url(), "Push channel configured");

    let (update_tx, mut update_rx) = mpsc::unbounded_channel();
    let (channel_tx, mut channel_rx) = mpsc::channel(64);
    let (command_tx, command_rx) = mpsc::unbounded_channel();

    let push_handle = push.spawn(channel_tx, command_rx);

    // One detection attempt at startup
    let (detect_tx, mut detect_rx) = oneshot::channel();
    let detect_client = Arc::clone(&client);
    tokio::spawn(async move {
        let _ = detect_tx.send(detect_client.autodetect().await);
    });

    let mut app = App::new(
        client,
        &config.notifications,
        config.backend.base_url.clone(),
        update_tx,
        command_tx,
    );

    // Setup terminal
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal")?;

    // Run the main loop
    let result = run_app(
        &mut terminal,
        &mut app,
        &mut update_rx,
        &mut channel_rx,
        &mut detect_rx,
    )
    .await;

    // Restore terminal
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;

    // Dropping the app closes the command channel, which stops the push client.
    drop(app);
    if tokio::time::timeout(Duration::from_secs(1), push_handle)
        .await
        .is_err()
    {
        tracing::debug!("Push channel did not stop in time");
    }

    result
}

/// Run the main application loop.
async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<Arc<BackendClient>>,
    updates: &mut mpsc::UnboundedReceiver<riftwatch_core::SessionUpdate>,
    channel: &mut mpsc::Receiver<riftwatch_core::push::ChannelEvent>,
    detect: &mut oneshot::Receiver<riftwatch_core::Result<riftwatch_core::backend::AutodetectResponse>>,
) -> Result<()> {
    let mut events = EventStream::new();
    let mut ticker = tokio::time::interval(TICK);
    let mut detect_pending = true;

    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        tokio::select! {
            _ = ticker.tick() => {}
            Some(event) = events.next() => {
                if let Event::Key(key) = event.context("failed to read terminal event")? {
                    app.handle_key(key);
                }
            }
            Some(event) = channel.recv() => {
                app.on_channel_event(event);
            }
            Some(update) = updates.recv() => {
                app.on_update(update);
            }
            result = &mut *detect, if detect_pending => {
                detect_pending = false;
                if let Ok(result) = result {
                    app.on_autodetect(result);
                }
            }
        }

        // Check if we should quit
        if app.should_quit {
            break;
        }
    }

    Ok(())
}
