//! ptop - a full-screen Linux process monitor
//!
//! Displays a periodically refreshed summary of system activity (uptime,
//! load, task states, CPU and memory use) above up to four independently
//! configured task windows.
//!
//! Controls (see `h` in the program for the full list):
//! - q: Quit
//! - h or ?: Help
//! - A: Toggle the alternate display of four windows
//! - f, o: Manage fields and sort order
//! - <, >: Move the sort column
//! - k, r: Signal or renice a task
//! - d or s: Change the delay
//! - W: Write the configuration file

mod app;
mod constants;
mod system;
mod ui;

use std::fs::File;
use std::io::{self, IsTerminal};
use std::process::ExitCode;
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use crossterm::event::{self, Event, KeyEventKind};
use tracing::{debug, error, info};

use app::cli::Args;
use app::input::Key;
use app::rcfile;
use app::{EngineState, KeyAction};
use constants::{
    APP_NAME, BATCH_DEFAULT_COLS, BATCH_DEFAULT_ROWS, DEFAULT_DELAY_SECS, INPUT_POLL_MS,
    PRIME_DELAY_MS, PROC_ROOT,
};
use system::uptime::local_clock;
use system::{signals, ProcSnapshot, SetupResult};
use ui::{Screen, TerminalGuard};

fn main() -> ExitCode {
    let args = Args::parse();
    setup_logging(&args);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fatal");
            eprintln!("\t{}: {}", APP_NAME, e);
            ExitCode::FAILURE
        }
    }
}

/// Installs the log subscriber.
///
/// Logs go to `--log-file` when given. Without one, batch mode logs to
/// stderr and interactive mode does not log at all, since the screen
/// belongs to the display.
fn setup_logging(args: &Args) {
    let Some(level) = args.log_level.level() else {
        return;
    };
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);

    let result = match &args.log_file {
        Some(path) => match File::create(path) {
            Ok(file) => builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init(),
            Err(e) => {
                eprintln!("{}: cannot open log file '{}': {}", APP_NAME, path.display(), e);
                return;
            }
        },
        None if args.batch => builder.with_writer(io::stderr).try_init(),
        None => return,
    };
    if let Err(e) = result {
        eprintln!("{}: failed to initialize logging: {}", APP_NAME, e);
    }
}

fn run(args: &Args) -> SetupResult<()> {
    let rc_path = rcfile::personal_path();
    let loaded = rcfile::load(&rc_path)?;
    let system_rc = rcfile::read_system_rc(&rcfile::system_path());

    let provider = ProcSnapshot::new(PROC_ROOT);
    let mut state = EngineState::new(Box::new(provider), PROC_ROOT, loaded, system_rc, rc_path)?;
    args.apply(&mut state)?;
    signals::install()?;

    info!(
        batch = state.batch,
        delay = state.delay,
        secure = state.secure,
        "starting"
    );

    // The first frame's percentages need a previous sample to diff against.
    state.refresh()?;
    thread::sleep(Duration::from_millis(PRIME_DELAY_MS));

    if state.batch {
        run_batch(&mut state)
    } else {
        run_interactive(&mut state)
    }
}

/// The delay as a duration, tolerating values no `Duration` can hold
fn delay_duration(delay: f64) -> Duration {
    Duration::try_from_secs_f64(delay).unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_DELAY_SECS))
}

// ============================================================================
// Batch mode
// ============================================================================

fn run_batch(state: &mut EngineState) -> SetupResult<()> {
    let fallback = (BATCH_DEFAULT_COLS, BATCH_DEFAULT_ROWS);
    let tty = io::stdout().is_terminal();
    let probe = move || {
        if tty {
            ui::terminal_size(fallback)
        } else {
            fallback
        }
    };
    let mut out = io::stdout().lock();
    let mut frames = 0u64;

    loop {
        if signals::take_pause() {
            signals::stop_self()?;
        }
        if signals::take_resize() {
            state.latch.request();
        }
        if state.latch.is_pending() {
            state.calibrate(probe)?;
        }
        state.refresh()?;
        let frame = ui::compose(state, local_clock(), Instant::now());
        match ui::write_batch(&mut out, &frame) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                debug!("output closed");
                break;
            }
            Err(e) => return Err(e.into()),
        }

        frames += 1;
        if state.iterations.is_some_and(|n| frames >= n) {
            break;
        }
        if !sleep_unless_quit(delay_duration(state.delay)) {
            break;
        }
    }
    info!(frames, "batch done");
    Ok(())
}

/// Sleeps for `total`, waking early on a quit request. Returns false when
/// the program should end.
fn sleep_unless_quit(total: Duration) -> bool {
    let deadline = Instant::now() + total;
    let slice = Duration::from_millis(INPUT_POLL_MS);
    loop {
        if signals::quit_requested() {
            return false;
        }
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            return true;
        }
        thread::sleep(left.min(slice));
    }
}

// ============================================================================
// Interactive mode
// ============================================================================

/// Why the wait between frames ended
enum Wake {
    /// The delay ran out
    Timeout,
    /// A key was pressed
    Key(Key),
    /// The terminal changed size
    Resize,
    /// A stop signal arrived, or Ctrl-Z was pressed
    Pause,
    /// A terminating signal arrived
    Quit,
}

fn run_interactive(state: &mut EngineState) -> SetupResult<()> {
    let mut term = TerminalGuard::enter()?;
    let mut screen = Screen::new();
    let mut stdout = io::stdout();
    let probe = || ui::terminal_size((BATCH_DEFAULT_COLS, BATCH_DEFAULT_ROWS));
    let mut frames = 0u64;
    let mut resample = true;

    loop {
        if state.latch.is_pending() {
            let before = state.geometry;
            state.calibrate(probe)?;
            if state.geometry != before {
                screen.invalidate();
            }
        }
        if resample {
            state.refresh()?;
            frames += 1;
        }
        let frame = ui::compose(state, local_clock(), Instant::now());
        screen.paint(&mut stdout, frame.lines, frame.cursor)?;

        if resample && state.iterations.is_some_and(|n| frames >= n) {
            break;
        }

        match wait_for_input(delay_duration(state.delay))? {
            Wake::Timeout => resample = true,
            Wake::Key(key) => {
                if state.handle_key(key) == KeyAction::Exit {
                    break;
                }
                // prompts and sub-screens redraw without a new sample
                resample = state.prompt.is_none() && state.view.is_tasks();
            }
            Wake::Resize => {
                state.latch.request();
                screen.invalidate();
                resample = false;
            }
            Wake::Pause => {
                term.suspend()?;
                signals::stop_self()?;
                term.resume()?;
                debug!("resumed after stop");
                state.latch.request();
                screen.invalidate();
                resample = true;
            }
            Wake::Quit => break,
        }
    }
    info!(frames, "interactive done");
    Ok(())
}

/// Waits up to `timeout` for something that needs a new frame.
///
/// Polls in short slices so signals are noticed promptly.
fn wait_for_input(timeout: Duration) -> io::Result<Wake> {
    let deadline = Instant::now() + timeout;
    let slice = Duration::from_millis(INPUT_POLL_MS);
    loop {
        if signals::quit_requested() {
            return Ok(Wake::Quit);
        }
        if signals::take_pause() {
            return Ok(Wake::Pause);
        }
        if signals::take_resize() {
            return Ok(Wake::Resize);
        }
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            return Ok(Wake::Timeout);
        }
        if !event::poll(left.min(slice))? {
            continue;
        }
        match event::read()? {
            Event::Key(k) if k.kind == KeyEventKind::Press => match ui::decode_key(k) {
                Some(Key::Suspend) => return Ok(Wake::Pause),
                Some(key) => return Ok(Wake::Key(key)),
                None => {}
            },
            Event::Resize(..) => return Ok(Wake::Resize),
            _ => {}
        }
    }
}
