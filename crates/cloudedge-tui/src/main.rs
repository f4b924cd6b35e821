//! CloudEdge console - product tools and an AI assistant in the terminal

mod app;
mod handler;
mod tui;
mod ui;

use anyhow::Result;
use cloudedge_core::Config;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app::App;
use tui::{EventHandler, Tui};

#[tokio::main]
async fn main() -> Result<()> {
    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = init_logging()?;

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        Config::new()
    });
    let resolved = config.resolve();

    if resolved.api_key.is_none() {
        tracing::warn!(
            provider = resolved.provider.as_str(),
            env_var = resolved.provider.env_var(),
            "No API key configured; the assistant will answer with a configuration error"
        );
    } else {
        tracing::info!(
            provider = resolved.provider.as_str(),
            model = %resolved.model,
            "Assistant configured"
        );
    }

    let mut app = App::new(resolved);
    let mut events = EventHandler::new(app.store.subscribe());

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }
    }
    Ok(())
}

/// Log to a file under the config directory; the terminal belongs to the UI
fn init_logging() -> Result<WorkerGuard> {
    let log_dir = Config::get_config_dir()
        .map(|dir| dir.join("logs"))
        .unwrap_or_else(|_| std::env::temp_dir().join("cloudedge"));
    std::fs::create_dir_all(&log_dir)?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(
        &log_dir,
        "cloudedge.log",
    ));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cloudedge=info,cloudedge_core=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .init();

    tracing::info!(path = %log_dir.join("cloudedge.log").display(), "Logging initialized");
    Ok(guard)
}
