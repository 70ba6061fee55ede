mod app;
mod cli;
mod domain;
mod infra;
mod ui;

use crate::app::{AppCommand, AppError, AppEvent, Dispatcher, Inbox, SharedContext};
use crate::cli::{CliInvocation, CliRunError, ENDPOINT_ENV, RunOptions};
use crate::infra::{
    HttpConnector, LoggingError, TraderError, default_settings_path, init_logging,
    load_settings_or_default, save_settings,
};
use crossterm::cursor::SetCursorStyle;
use crossterm::event::{
    self, Event, KeyEventKind, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::terminal::size as terminal_size;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use crossterm::{ExecutableCommand, execute};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::{self, Stdout, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
enum MainError {
    #[error(transparent)]
    App(#[from] AppError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error(transparent)]
    Trader(#[from] TraderError),

    #[error(transparent)]
    Command(#[from] CliRunError),

    #[error("failed to start the async runtime: {0}")]
    Runtime(io::Error),
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum Flow {
    Continue,
    Quit,
    Abort(String),
}

fn main() {
    if let Err(error) = run_main() {
        let mut err = io::stderr().lock();
        let _ = writeln!(err, "{error}");
        std::process::exit(1);
    }
}

fn run_main() -> Result<(), MainError> {
    let args = std::env::args().collect::<Vec<_>>();
    let invocation = match crate::cli::parse_invocation(&args) {
        Ok(invocation) => invocation,
        Err(error) => {
            let mut err = io::stderr().lock();
            let _ = writeln!(err, "{error}");
            let _ = writeln!(err);
            print_help();
            std::process::exit(2);
        }
    };

    match invocation {
        CliInvocation::PrintHelp => {
            print_help();
            Ok(())
        }
        CliInvocation::PrintVersion => {
            let mut out = io::stdout().lock();
            let _ = writeln!(out, "{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        CliInvocation::Tui(options) => run_tui(options),
        CliInvocation::OpenOrders(options) => {
            let endpoint = options.resolve_endpoint(std::env::var(ENDPOINT_ENV).ok());
            let connector = HttpConnector::new(&endpoint)?;
            let mut input = io::stdin().lock();
            let mut out = io::stdout().lock();
            crate::cli::run_open_orders(&mut input, &mut out, &connector)?;
            Ok(())
        }
    }
}

fn print_help() {
    let mut out = io::stdout().lock();
    let _ = write!(out, "{}", crate::cli::help_text());
}

fn run_tui(options: RunOptions) -> Result<(), MainError> {
    init_logging(&options.log_file)?;

    let endpoint = options.resolve_endpoint(std::env::var(ENDPOINT_ENV).ok());
    let connector = HttpConnector::new(&endpoint)?;
    let settings_path = options
        .config_path
        .clone()
        .unwrap_or_else(default_settings_path);
    let settings = load_settings_or_default(&settings_path);
    info!(
        endpoint = %connector.endpoint(),
        settings = %settings_path.display(),
        "starting trader-tui"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_time()
        .thread_name("trader-worker")
        .build()
        .map_err(MainError::Runtime)?;
    let (dispatcher, inbox) = Dispatcher::channel(runtime.handle().clone());
    let mut ctx = SharedContext::new(settings, Arc::new(connector));

    let mut terminal = setup_terminal()?;
    if let Ok((width, height)) = terminal_size() {
        ctx.viewport = (width, height);
    }
    spawn_input_reader(dispatcher.clone());

    let result = run(&mut terminal, ctx, dispatcher, inbox, &settings_path);
    restore_terminal(&mut terminal)?;
    runtime.shutdown_timeout(Duration::from_millis(250));
    info!("trader-tui stopped");
    Ok(result?)
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, AppError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let _ = stdout.execute(PushKeyboardEnhancementFlags(
        KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES,
    ));
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<(), AppError> {
    disable_raw_mode()?;
    let _ = execute!(
        terminal.backend_mut(),
        PopKeyboardEnhancementFlags,
        SetCursorStyle::DefaultUserShape
    );
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Blocks on terminal input off the UI thread and forwards it to the inbox.
fn spawn_input_reader(dispatcher: Dispatcher) {
    let spawned = std::thread::Builder::new()
        .name("input-reader".to_string())
        .spawn(move || {
            loop {
                let delivered = match event::read() {
                    Ok(Event::Key(key)) if key.kind != KeyEventKind::Release => {
                        dispatcher.dispatch(AppEvent::Key(key))
                    }
                    Ok(Event::Resize(width, height)) => {
                        dispatcher.dispatch(AppEvent::Resize { width, height })
                    }
                    Ok(_) => true,
                    Err(error) => {
                        dispatcher.dispatch(AppEvent::Fatal(format!(
                            "failed to read terminal input: {error}"
                        )));
                        break;
                    }
                };
                if !delivered {
                    break;
                }
            }
        });
    if let Err(error) = spawned {
        warn!(%error, "failed to start the input reader");
    }
}

fn run<W: Write>(
    terminal: &mut Terminal<CrosstermBackend<W>>,
    ctx: SharedContext,
    dispatcher: Dispatcher,
    mut inbox: Inbox,
    settings_path: &Path,
) -> Result<(), AppError> {
    let (mut model, mut command) = crate::app::init(ctx, dispatcher);
    loop {
        match execute_command(terminal, command, settings_path)? {
            Flow::Continue => {}
            Flow::Quit => return Ok(()),
            Flow::Abort(message) => {
                terminal.draw(|frame| crate::ui::render(frame, &model))?;
                return Err(AppError::InputClosed(message));
            }
        }

        terminal.draw(|frame| crate::ui::render(frame, &model))?;

        let Some(event) = inbox.recv() else {
            return Ok(());
        };
        (model, command) = crate::app::update(model, event);
    }
}

fn execute_command<W: Write>(
    terminal: &mut Terminal<CrosstermBackend<W>>,
    command: AppCommand,
    settings_path: &Path,
) -> Result<Flow, AppError> {
    match command {
        AppCommand::None => {}
        AppCommand::Quit => return Ok(Flow::Quit),
        AppCommand::Abort(message) => return Ok(Flow::Abort(message)),
        AppCommand::BlinkCursor => {
            execute!(terminal.backend_mut(), SetCursorStyle::BlinkingBar)?;
        }
        AppCommand::SaveSettings(settings) => match save_settings(settings_path, &settings) {
            Ok(()) => info!(path = %settings_path.display(), "settings saved"),
            Err(error) => warn!(%error, path = %settings_path.display(), "failed to save settings"),
        },
    }
    Ok(Flow::Continue)
}
