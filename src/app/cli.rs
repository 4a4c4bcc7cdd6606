//! Command-line argument parsing
//!
//! Options are parsed with clap and then applied on top of the state
//! built from the rc files, so the command line always wins.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::Level;

use crate::constants::{MONPIDMAX, SCREENMAX, W_MIN_COL};
use crate::system::error::{SetupError, SetupResult};
use crate::system::users::{user_certify, UserMatch};

use super::state::{EngineState, WidthOverride};
use super::window::{SHOW_CMDLIN, SHOW_CTIMES, SHOW_IDLEPS};

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Maximum tracing level, or `None` when logging is off
    pub fn level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

/// Parsed command-line arguments
#[derive(Parser, Debug, Clone)]
#[command(
    name = "ptop",
    about = "Full-screen Linux process monitor with up to four configurable windows",
    version
)]
pub struct Args {
    /// Batch mode: plain frames on stdout, no keyboard input
    #[arg(short = 'b')]
    pub batch: bool,

    /// Toggle command line / program name
    #[arg(short = 'c')]
    pub cmdline: bool,

    /// Delay between updates, in seconds
    #[arg(short = 'd', value_name = "SECS", allow_negative_numbers = true)]
    pub delay: Option<String>,

    /// Show individual threads
    #[arg(short = 'H')]
    pub threads: bool,

    /// Toggle idle tasks
    #[arg(short = 'i')]
    pub idle: bool,

    /// Exit after this many frames
    #[arg(short = 'n', value_name = "N")]
    pub iterations: Option<String>,

    /// Monitor only these pids (0 is ptop itself)
    #[arg(short = 'p', value_name = "PID", value_delimiter = ',')]
    pub pids: Vec<String>,

    /// Secure mode: no kill, renice or delay changes
    #[arg(short = 's')]
    pub secure: bool,

    /// Toggle cumulative time
    #[arg(short = 'S')]
    pub cumulative: bool,

    /// Show only tasks with this effective user (name or uid)
    #[arg(short = 'u', value_name = "USER")]
    pub user: Option<String>,

    /// Show only tasks with this real, effective, saved or filesystem user
    #[arg(short = 'U', value_name = "USER")]
    pub any_user: Option<String>,

    /// Output width override
    #[arg(short = 'w', value_name = "COLS", num_args = 0..=1)]
    pub width: Option<Option<String>>,

    /// Log level
    #[arg(long, value_enum, default_value_t = LogLevel::Off)]
    pub log_level: LogLevel,

    /// Log file (interactive mode logs nowhere without one)
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

fn usage(msg: impl Into<String>) -> SetupError {
    SetupError::Usage(msg.into())
}

impl Args {
    /// Applies the options to the startup state.
    pub fn apply(&self, state: &mut EngineState) -> SetupResult<()> {
        state.batch |= self.batch;
        state.threads |= self.threads;
        state.secure |= self.secure;

        let w = state.stack.current_mut();
        if self.cmdline {
            w.toggle(SHOW_CMDLIN);
        }
        if self.idle {
            w.toggle(SHOW_IDLEPS);
            w.rc.maxtasks = 0;
        }
        if self.cumulative {
            w.toggle(SHOW_CTIMES);
        }

        if let Some(d) = &self.delay {
            if state.secure {
                return Err(usage("-d disallowed in \"secure\" mode"));
            }
            state.delay = parse_delay(d)?;
        }
        if let Some(n) = &self.iterations {
            state.iterations = Some(parse_iterations(n)?);
        }

        let selections = usize::from(!self.pids.is_empty())
            + usize::from(self.user.is_some())
            + usize::from(self.any_user.is_some());
        if selections > 1 {
            return Err(usage("conflicting process selections (U/p/u)"));
        }
        if !self.pids.is_empty() {
            state.monpids = parse_pids(&self.pids)?;
        }
        let filter = match (&self.user, &self.any_user) {
            (Some(u), _) => Some((u, UserMatch::Effective)),
            (_, Some(u)) => Some((u, UserMatch::Any)),
            _ => None,
        };
        if let Some((name, which)) = filter {
            state.stack.current_mut().usrfilter = user_certify(name, which).map_err(usage)?;
        }

        if let Some(width) = &self.width {
            state.width_override = parse_width(width.as_deref(), state.batch)?;
        }
        Ok(())
    }
}

fn parse_delay(arg: &str) -> SetupResult<f64> {
    match arg.replace(',', ".").parse::<f64>() {
        Ok(secs) if secs >= 0.0 && secs.is_finite() => Ok(secs),
        _ => Err(usage(format!("bad delay interval '{}'", arg))),
    }
}

fn parse_iterations(arg: &str) -> SetupResult<u64> {
    match arg.parse::<u64>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(usage(format!("bad iterations argument '{}'", arg))),
    }
}

/// Pids to monitor, with 0 meaning this process and duplicates dropped.
fn parse_pids(args: &[String]) -> SetupResult<Vec<i32>> {
    let mut pids = Vec::new();
    for arg in args.iter().filter(|a| !a.is_empty()) {
        let pid = match arg.trim().parse::<i32>() {
            Ok(0) => std::process::id() as i32,
            Ok(pid) if pid > 0 => pid,
            _ => return Err(usage(format!("bad pid '{}'", arg))),
        };
        if pids.contains(&pid) {
            continue;
        }
        if pids.len() == MONPIDMAX {
            return Err(usage(format!("pid limit ({}) exceeded", MONPIDMAX)));
        }
        pids.push(pid);
    }
    Ok(pids)
}

/// `-w`: an explicit width, the widest row in batch mode, or the size
/// the environment advertises.
fn parse_width(arg: Option<&str>, batch: bool) -> SetupResult<Option<WidthOverride>> {
    match arg {
        Some(a) => match a.parse::<usize>() {
            Ok(cols) if cols >= usize::from(W_MIN_COL) => Ok(Some(WidthOverride {
                cols: cols.min(SCREENMAX),
                rows: None,
            })),
            _ => Err(usage(format!(
                "bad width arg '{}', must be at least {}",
                a, W_MIN_COL
            ))),
        },
        None if batch => Ok(Some(WidthOverride {
            cols: SCREENMAX,
            rows: None,
        })),
        None => {
            let env = |name: &str| std::env::var(name).ok().and_then(|v| v.parse::<usize>().ok());
            Ok(env("COLUMNS").map(|cols| WidthOverride {
                cols: cols.max(usize::from(W_MIN_COL)),
                rows: env("LINES"),
            }))
        }
    }
}
