//! Signal latches
//!
//! Handlers only store into atomics. The main loop drains them at safe
//! points: the top of each frame and after every key.

use std::sync::atomic::{AtomicBool, Ordering};

use nix::sys::signal::{
    pthread_sigmask, sigaction, SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal,
};
use tracing::debug;

static QUIT: AtomicBool = AtomicBool::new(false);
static PAUSE: AtomicBool = AtomicBool::new(false);
static RESIZE: AtomicBool = AtomicBool::new(false);

extern "C" fn on_terminate(_: libc::c_int) {
    QUIT.store(true, Ordering::SeqCst);
}

extern "C" fn on_pause(_: libc::c_int) {
    PAUSE.store(true, Ordering::SeqCst);
}

extern "C" fn on_resize(_: libc::c_int) {
    RESIZE.store(true, Ordering::SeqCst);
}

const TERMINATE_SET: [Signal; 6] = [
    Signal::SIGALRM,
    Signal::SIGHUP,
    Signal::SIGINT,
    Signal::SIGPIPE,
    Signal::SIGQUIT,
    Signal::SIGTERM,
];

const PAUSE_SET: [Signal; 3] = [Signal::SIGTSTP, Signal::SIGTTIN, Signal::SIGTTOU];

const RESIZE_SET: [Signal; 2] = [Signal::SIGCONT, Signal::SIGWINCH];

/// Installs the terminate, pause and resize handlers.
pub fn install() -> nix::Result<()> {
    let groups: [(&[Signal], extern "C" fn(libc::c_int)); 3] = [
        (&TERMINATE_SET, on_terminate),
        (&PAUSE_SET, on_pause),
        (&RESIZE_SET, on_resize),
    ];
    for (signals, handler) in groups {
        let action = SigAction::new(SigHandler::Handler(handler), SaFlags::SA_RESTART, SigSet::empty());
        for &sig in signals {
            // SAFETY: every handler only stores into an atomic
            unsafe { sigaction(sig, &action)? };
        }
    }
    debug!("signal handlers installed");
    Ok(())
}

/// True once a terminate-class signal has arrived
pub fn quit_requested() -> bool {
    QUIT.load(Ordering::SeqCst)
}

/// Consumes a latched pause request
pub fn take_pause() -> bool {
    PAUSE.swap(false, Ordering::SeqCst)
}

/// Consumes a latched resize/continue notification
pub fn take_resize() -> bool {
    RESIZE.swap(false, Ordering::SeqCst)
}

/// Stops the whole process until SIGCONT.
pub fn stop_self() -> nix::Result<()> {
    nix::sys::signal::raise(Signal::SIGSTOP)
}

/// Keeps the resize signals pending while alive.
///
/// Anything that arrives meanwhile is delivered when the guard drops.
pub struct ResizeBlock {
    previous: Option<SigSet>,
}

impl ResizeBlock {
    /// Blocks SIGWINCH and SIGCONT for the calling thread.
    pub fn new() -> Self {
        let mut set = SigSet::empty();
        for sig in RESIZE_SET {
            set.add(sig);
        }
        let mut previous = SigSet::empty();
        let previous = pthread_sigmask(SigmaskHow::SIG_BLOCK, Some(&set), Some(&mut previous))
            .ok()
            .map(|_| previous);
        Self { previous }
    }
}

impl Drop for ResizeBlock {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            let _ = pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&previous), None);
        }
    }
}

/// Engine-side "needs recalibration" flag.
///
/// Requests made while a recalibration is running are deferred and become
/// pending only once it finishes, so a resize racing a recalibration
/// yields exactly one further pass.
#[derive(Debug, Default)]
pub struct ResizeLatch {
    pending: AtomicBool,
    deferred: AtomicBool,
    busy: AtomicBool,
}

impl ResizeLatch {
    /// Creates a latch that is already pending, so the first frame
    /// calibrates
    pub fn new() -> Self {
        let latch = Self::default();
        latch.pending.store(true, Ordering::SeqCst);
        latch
    }

    /// Asks for a recalibration before the next frame
    pub fn request(&self) {
        if self.busy.load(Ordering::SeqCst) {
            self.deferred.store(true, Ordering::SeqCst);
        } else {
            self.pending.store(true, Ordering::SeqCst);
        }
    }

    /// True when the next frame must recalibrate
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    /// Marks a recalibration as running
    pub fn begin(&self) {
        self.busy.store(true, Ordering::SeqCst);
    }

    /// Marks the running recalibration done, promoting deferred requests
    pub fn finish(&self) {
        self.pending.store(false, Ordering::SeqCst);
        self.busy.store(false, Ordering::SeqCst);
        if self.deferred.swap(false, Ordering::SeqCst) {
            self.pending.store(true, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_latch_is_pending() {
        assert!(ResizeLatch::new().is_pending());
    }

    #[test]
    fn test_request_outside_recalibration() {
        let latch = ResizeLatch::default();
        latch.request();
        assert!(latch.is_pending());
        latch.begin();
        latch.finish();
        assert!(!latch.is_pending());
    }

    #[test]
    fn test_request_during_recalibration_is_deferred_once() {
        let latch = ResizeLatch::new();
        latch.begin();
        latch.request();
        latch.request();
        latch.finish();
        assert!(latch.is_pending());
        latch.begin();
        latch.finish();
        assert!(!latch.is_pending());
    }

    #[test]
    fn test_resize_block_restores_mask() {
        let before = SigSet::thread_get_mask().unwrap();
        {
            let _block = ResizeBlock::new();
            let during = SigSet::thread_get_mask().unwrap();
            assert!(during.contains(Signal::SIGWINCH));
        }
        let after = SigSet::thread_get_mask().unwrap();
        assert_eq!(before.contains(Signal::SIGWINCH), after.contains(Signal::SIGWINCH));
    }
}
