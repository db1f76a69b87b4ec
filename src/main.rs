use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use clap::Parser;

use contop::app::{self, AppOptions};
use contop::registry::FilterMode;

#[derive(Parser)]
#[command(name = "contop", version, about = "Interactive terminal dashboard for Docker containers")]
struct Cli {
    /// Start with only running containers shown.
    #[arg(long)]
    running_only: bool,

    /// Seconds between automatic container list refreshes.
    #[arg(long, default_value_t = 10)]
    refresh: u64,

    /// Append diagnostic logs to this file (the TUI owns the terminal, so
    /// nothing is logged unless this is set). RUST_LOG controls the filter.
    #[arg(long)]
    log_file: Option<std::path::PathBuf>,
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();

    // Keep the appender's worker alive for the whole run.
    let _guard = cli.log_file.as_deref().map(init_tracing);

    let should_quit = Arc::new(AtomicBool::new(false));
    for sig in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        let _ = signal_hook::flag::register(sig, Arc::clone(&should_quit))?;
    }

    let options = AppOptions {
        filter: if cli.running_only {
            FilterMode::RunningOnly
        } else {
            FilterMode::All
        },
        tick_rate: Duration::from_secs(cli.refresh.max(1)),
    };

    app::run(should_quit, options)
}

fn init_tracing(path: &Path) -> tracing_appender::non_blocking::WorkerGuard {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file = path
        .file_name()
        .map(|f| f.to_os_string())
        .unwrap_or_else(|| "contop.log".into());

    let appender = tracing_appender::rolling::never(dir, file);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();
    guard
}
