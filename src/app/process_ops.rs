//! Process management operations (signal, renice)

use nix::sys::signal::Signal;
use tracing::warn;

use super::state::EngineState;
use crate::system::procctl::{parse_signal, renice, send_signal};

impl EngineState {
    /// First task shown in the current window, or 0 when none is.
    pub fn default_pid(&self) -> i32 {
        let w = self.stack.current();
        w.order
            .iter()
            .skip(w.begtask)
            .filter_map(|p| self.records.get(p.idx))
            .find(|rec| w.shows(rec))
            .map_or(0, |rec| rec.tid)
    }

    /// Sends the signal named by `input` (SIGTERM when blank) to `pid`.
    ///
    /// Failures end up on the message row.
    pub fn signal_task(&mut self, pid: i32, input: &str) {
        let signal = if input.trim().is_empty() {
            Ok(Signal::SIGTERM)
        } else {
            parse_signal(input)
        };
        let result = signal.and_then(|sig| send_signal(pid, sig));
        if let Err(e) = result {
            warn!(pid, error = %e, "signal failed");
            self.show_msg(e.to_string());
        }
    }

    /// Sets the nice value of `pid`, reporting failures on the message row.
    pub fn renice_task(&mut self, pid: i32, nice: i64) {
        let nice = nice.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
        if let Err(e) = renice(pid, nice) {
            warn!(pid, nice, error = %e, "renice failed");
            self.show_msg(e.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::forest::Placement;
    use crate::app::state::tests::{engine, task};

    #[test]
    fn test_default_pid_is_first_shown() {
        let mut state = engine(vec![vec![task(10, 0), task(20, 5), task(30, 9)]]);
        assert_eq!(state.default_pid(), 0);
        state.refresh().unwrap();
        state.arrange(0);
        assert_eq!(state.default_pid(), 30);

        state.stack.current_mut().begtask = 1;
        assert_eq!(state.default_pid(), 20);
        state.stack.current_mut().order = vec![Placement::flat(0)];
        state.stack.current_mut().begtask = 0;
        assert_eq!(state.default_pid(), 10);
    }

    #[test]
    fn test_bad_signal_shows_message() {
        let mut state = engine(vec![vec![]]);
        state.signal_task(1, "NOTASIGNAL");
        assert_eq!(state.msg.as_ref().unwrap().text, "Invalid signal");
    }

    #[test]
    fn test_signal_to_missing_pid_reports() {
        let mut state = engine(vec![vec![]]);
        // pid_max is far below this
        state.signal_task(i32::MAX, "CONT");
        assert!(state.msg.as_ref().unwrap().text.starts_with("Failed signal pid"));
    }
}
