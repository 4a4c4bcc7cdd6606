//! Fire-and-forget process control (signal delivery and renice)

use std::str::FromStr;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tracing::info;

use super::error::{ControlError, ControlResult};

/// Parses a signal given as a number, a bare name (`KILL`) or a full
/// name (`SIGKILL`), case-insensitively.
pub fn parse_signal(input: &str) -> ControlResult<Signal> {
    let input = input.trim();
    if let Ok(num) = input.parse::<i32>() {
        return Signal::try_from(num).map_err(|_| ControlError::BadSignal);
    }
    let upper = input.to_ascii_uppercase();
    let full = if upper.starts_with("SIG") {
        upper
    } else {
        format!("SIG{}", upper)
    };
    Signal::from_str(&full).map_err(|_| ControlError::BadSignal)
}

/// Sends `signal` to `pid`.
pub fn send_signal(pid: i32, signal: Signal) -> ControlResult<()> {
    info!(pid, signal = %signal, "sending signal");
    kill(Pid::from_raw(pid), signal).map_err(|e| ControlError::Signal {
        pid,
        signal: signal as i32,
        reason: e.desc().to_string(),
    })
}

/// Sets the nice value of `pid`.
pub fn renice(pid: i32, nice: i32) -> ControlResult<()> {
    info!(pid, nice, "renice");
    // SAFETY: setpriority takes plain integers and reports failure via errno
    let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS, pid as libc::id_t, nice) };
    if rc == 0 {
        Ok(())
    } else {
        Err(ControlError::Renice {
            pid,
            nice,
            reason: std::io::Error::last_os_error().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_signal_forms() {
        assert_eq!(parse_signal("9"), Ok(Signal::SIGKILL));
        assert_eq!(parse_signal("KILL"), Ok(Signal::SIGKILL));
        assert_eq!(parse_signal("sighup"), Ok(Signal::SIGHUP));
        assert_eq!(parse_signal(" TERM "), Ok(Signal::SIGTERM));
    }

    #[test]
    fn test_parse_signal_rejects_garbage() {
        assert_eq!(parse_signal("NOPE"), Err(ControlError::BadSignal));
        assert_eq!(parse_signal("999"), Err(ControlError::BadSignal));
    }

    #[test]
    fn test_signal_to_missing_pid_fails() {
        // pid_max is at most 2^22, so this pid cannot exist
        let err = send_signal(0x7fff_fff0, Signal::SIGCONT).unwrap_err();
        assert!(matches!(err, ControlError::Signal { .. }));
    }

    #[test]
    fn test_renice_missing_pid_fails() {
        let err = renice(0x7fff_fff0, 5).unwrap_err();
        assert!(matches!(err, ControlError::Renice { nice: 5, .. }));
    }
}
