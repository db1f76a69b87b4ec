mod input;
mod render;
mod state;

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing::info;

use crate::docker::DockerClient;
use crate::model::{ContainerUIState, LogViewState};
use crate::registry::{FilterMode, Registry};
use crate::runtime::ContainerRuntime;
use crate::session::SessionManager;
use crate::view::Presenter;

/// Startup knobs resolved from the command line.
pub struct AppOptions {
    pub filter: FilterMode,
    pub tick_rate: Duration,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            filter: FilterMode::All,
            tick_rate: Duration::from_secs(10),
        }
    }
}

/// Restore the terminal to normal mode. Safe to call multiple times.
pub fn restore_terminal() {
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
    let _ = disable_raw_mode();
}

/// Main application state: the registry, the session state machine, and the
/// UI-side state the views read.
pub struct App {
    pub rt: Arc<tokio::runtime::Runtime>,
    pub client: DockerClient,
    pub registry: Registry,
    pub session: SessionManager,
    pub filter: FilterMode,
    pub ui_state: ContainerUIState,
    pub log_state: Option<LogViewState>,
    pub status_message: Option<String>,
    pub tick_rate: Duration,
    pub last_tick: Instant,
}

impl App {
    pub fn new(rt: Arc<tokio::runtime::Runtime>, client: DockerClient, options: AppOptions) -> Self {
        let tick_rate = options.tick_rate;
        Self {
            rt,
            client,
            registry: Registry::new(),
            session: SessionManager::new(),
            filter: options.filter,
            ui_state: ContainerUIState::default(),
            log_state: None,
            status_message: None,
            tick_rate,
            // Make the first loop iteration refresh immediately.
            last_tick: Instant::now() - tick_rate,
        }
    }
}

/// Run the application. Sets up the terminal, runs the main loop, restores
/// the terminal on exit.
pub fn run(should_quit: Arc<AtomicBool>, options: AppOptions) -> io::Result<()> {
    let rt = Arc::new(
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .worker_threads(2)
            .build()
            .expect("Failed to create tokio runtime"),
    );

    // Connect before touching the terminal so a failure prints normally.
    let client = DockerClient::try_new()
        .ok_or_else(|| io::Error::other("could not configure a Docker connection"))?;
    rt.block_on(client.ping())
        .map_err(|e| io::Error::other(format!("Docker daemon unreachable: {}", e)))?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, Clear(ClearType::All))?;

    info!("connected to Docker daemon, starting main loop");
    let mut app = App::new(rt, client, options);
    let mut needs_render = true;

    loop {
        if should_quit.load(Ordering::Relaxed) {
            break;
        }

        let now = Instant::now();

        if app.process_tick() {
            needs_render = true;
        }
        if app.poll_detail() {
            needs_render = true;
        }
        if let Some(notice) = app.session.poll_action() {
            app.status_message = Some(notice);
            needs_render = true;
        }

        if needs_render {
            if Presenter::render_size_guard()? {
                needs_render = false;
                let timeout = app.tick_rate.saturating_sub(now.elapsed());
                if crossterm::event::poll(timeout.min(Duration::from_millis(100)))? {
                    let _ = crossterm::event::read()?;
                }
                continue;
            }

            render::render(&mut app)?;
            needs_render = false;
        }

        let timeout = app.tick_rate.saturating_sub(now.elapsed());
        if crossterm::event::poll(timeout.min(Duration::from_millis(100)))? {
            if let crossterm::event::Event::Key(key_event) = crossterm::event::read()? {
                match input::handle_key(&mut app, key_event) {
                    Some(input::InputResult::Quit) => break,
                    Some(input::InputResult::Consumed) => needs_render = true,
                    None => {}
                }
            }
        }
    }

    // Quitting cancels any live detail session the same way leaving it does.
    let rt = Arc::clone(&app.rt);
    rt.block_on(app.session.exit_detail());

    restore_terminal();
    info!("terminal restored, exiting");
    Ok(())
}
