//! The single shutdown path.
//!
//! Every exit trigger (quit from the UI, the window closing, a service watcher,
//! a panic) lands in [`Shutdown::request`]. The body runs exactly once: it
//! disposes the process group, killing every descendant, and then exits with
//! the code of whichever trigger got there first.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};

use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::process::{LaunchOutcome, ProcessGroup};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    UserQuit,
    WindowClosed,
    AlreadyRunning,
    ServiceSpawnFailed,
    ServiceJoinFailed,
    ServiceFailed(LaunchOutcome),
    Panicked,
}

impl ExitReason {
    pub fn exit_code(self) -> i32 {
        match self {
            ExitReason::UserQuit | ExitReason::WindowClosed => 0,
            _ => 1,
        }
    }
}

/// Final step of shutdown, normally `std::process::exit`
pub type ExitFn = Box<dyn Fn(i32) + Send + Sync>;

pub struct Shutdown {
    group: Arc<ProcessGroup>,
    in_progress: AtomicBool,
    once: Once,
    reason: Mutex<Option<ExitReason>>,
    exit: ExitFn,
}

impl Shutdown {
    pub fn new(group: Arc<ProcessGroup>) -> Self {
        Self::with_exit(group, Box::new(|code| std::process::exit(code)))
    }

    pub fn with_exit(group: Arc<ProcessGroup>, exit: ExitFn) -> Self {
        Self {
            group,
            in_progress: AtomicBool::new(false),
            once: Once::new(),
            reason: Mutex::new(None),
            exit,
        }
    }

    /// Tear everything down and exit. Safe to call concurrently from any
    /// trigger; callers after the first block until the first finishes
    pub fn request(&self, reason: ExitReason) {
        // Flag first, so watchers observing the kill classify it as clean
        if self.in_progress.swap(true, Ordering::AcqRel) {
            debug!("Shutdown already in progress, ignoring {:?}", reason);
        }

        self.once.call_once(|| {
            *self.reason.lock() = Some(reason);
            info!(
                "Shutting down ({:?}), exit code {}",
                reason,
                reason.exit_code()
            );

            if let Err(e) = self.group.dispose() {
                error!("[{}] {}", e.code(), e);
            }

            (self.exit)(reason.exit_code());
        });
    }

    /// Entry point for the panic hook
    pub fn on_panic(&self) {
        if self.is_shutting_down() {
            // The panic came from inside shutdown itself; re-entering the
            // once-body would deadlock, so leave immediately
            (self.exit)(ExitReason::Panicked.exit_code());
            return;
        }
        self.request(ExitReason::Panicked);
    }

    pub fn is_shutting_down(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// The reason that won the race, once shutdown has run
    pub fn reason(&self) -> Option<ExitReason> {
        *self.reason.lock()
    }

    pub fn group(&self) -> &Arc<ProcessGroup> {
        &self.group
    }
}


#[cfg(test)]
mod tests {
    use super::testing::recording_shutdown;
    use super::*;
    use std::thread;

    #[test]
    fn test_quit_disposes_group_and_exits_zero() {
        let group = Arc::new(ProcessGroup::create().unwrap());
        let (shutdown, codes) = recording_shutdown(group.clone());

        shutdown.request(ExitReason::UserQuit);

        assert!(group.is_disposed());
        assert_eq!(*codes.lock(), vec![0]);
        assert_eq!(shutdown.reason(), Some(ExitReason::UserQuit));
    }

    #[test]
    fn test_shutdown_body_runs_once() {
        let group = Arc::new(ProcessGroup::create().unwrap());
        let (shutdown, codes) = recording_shutdown(group);

        shutdown.request(ExitReason::WindowClosed);
        shutdown.request(ExitReason::UserQuit);
        shutdown.request(ExitReason::ServiceFailed(LaunchOutcome::LateFailure));

        assert_eq!(*codes.lock(), vec![0]);
        assert_eq!(shutdown.reason(), Some(ExitReason::WindowClosed));
    }

    #[test]
    fn test_concurrent_triggers_exit_once() {
        let group = Arc::new(ProcessGroup::create().unwrap());
        let (shutdown, codes) = recording_shutdown(group);

        let handles: Vec<_> = [
            ExitReason::UserQuit,
            ExitReason::WindowClosed,
            ExitReason::ServiceFailed(LaunchOutcome::EarlyFailure),
        ]
        .into_iter()
        .map(|reason| {
            let shutdown = shutdown.clone();
            thread::spawn(move || shutdown.request(reason))
        })
        .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(codes.lock().len(), 1);
        assert!(shutdown.is_shutting_down());
    }

    #[test]
    fn test_failure_reasons_exit_one() {
        assert_eq!(ExitReason::AlreadyRunning.exit_code(), 1);
        assert_eq!(ExitReason::ServiceSpawnFailed.exit_code(), 1);
        assert_eq!(ExitReason::ServiceJoinFailed.exit_code(), 1);
        assert_eq!(
            ExitReason::ServiceFailed(LaunchOutcome::EarlyFailure).exit_code(),
            1
        );
        assert_eq!(ExitReason::Panicked.exit_code(), 1);
    }

    #[test]
    fn test_panic_during_shutdown_exits_directly() {
        let group = Arc::new(ProcessGroup::create().unwrap());
        let (shutdown, codes) = recording_shutdown(group);

        shutdown.request(ExitReason::UserQuit);
        shutdown.on_panic();

        assert_eq!(*codes.lock(), vec![0, 1]);
    }
}
