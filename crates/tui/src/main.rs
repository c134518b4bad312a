mod app;
mod events;
mod strings;
mod terminal;
mod theme;
mod ui;

use anyhow::Result;
use terminal::TerminalGuard;

fn main() -> Result<()> {
    let _log_guard = init_logging();
    let mut app = app::App::new();
    let mut term = TerminalGuard::new()?;
    events::run(&mut term.terminal, &mut app)
}

// Logs go to a file; stdout belongs to the terminal UI.
fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let base = directories::BaseDirs::new()?;
    let dir = base.data_dir().join("paperchat").join("logs");
    std::fs::create_dir_all(&dir).ok()?;
    let file = tracing_appender::rolling::never(dir, "tui.log");
    let (writer, guard) = tracing_appender::non_blocking(file);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Some(guard)
}
