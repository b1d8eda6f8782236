//! Deadline shared by an async caller and the blocking SSH work it spawned.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Time budget of one remote command.
///
/// The async side abandons the deadline when it stops waiting; the blocking
/// side asks it for the time left before every libssh2 call and for admission
/// right before `exec`. Once abandoned or expired, no command is admitted.
#[derive(Debug)]
pub(crate) struct CommandDeadline {
    expires: Instant,
    abandoned: AtomicBool,
    executed: AtomicBool,
}

impl CommandDeadline {
    pub fn new(budget: Duration) -> Self {
        Self {
            expires: Instant::now() + budget,
            abandoned: AtomicBool::new(false),
            executed: AtomicBool::new(false),
        }
    }

    /// Time left, or `None` once expired or abandoned.
    pub fn remaining(&self) -> Option<Duration> {
        if self.abandoned.load(Ordering::SeqCst) {
            return None;
        }
        self.expires
            .checked_duration_since(Instant::now())
            .filter(|left| !left.is_zero())
    }

    /// Admits the command for execution if there is time left.
    pub fn admit_exec(&self) -> bool {
        if self.remaining().is_none() {
            return false;
        }
        self.executed.store(true, Ordering::SeqCst);
        true
    }

    pub fn abandon(&self) {
        self.abandoned.store(true, Ordering::SeqCst);
    }

    /// Returns true if the command was handed to the remote shell.
    pub fn was_executed(&self) -> bool {
        self.executed.load(Ordering::SeqCst)
    }
}

/// Converts a duration to a libssh2 timeout. Zero means "no timeout" to
/// libssh2, so the result is at least one millisecond.
pub(crate) fn libssh2_millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis())
        .unwrap_or(u32::MAX)
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_deadline_admits() {
        let deadline = CommandDeadline::new(Duration::from_secs(60));

        let left = deadline.remaining().unwrap();
        assert!(left <= Duration::from_secs(60));
        assert!(deadline.admit_exec());
        assert!(deadline.was_executed());
    }

    #[test]
    fn test_abandoned_deadline_refuses() {
        let deadline = CommandDeadline::new(Duration::from_secs(60));
        deadline.abandon();

        assert!(deadline.remaining().is_none());
        assert!(!deadline.admit_exec());
        assert!(!deadline.was_executed());
    }

    #[test]
    fn test_expired_deadline_refuses() {
        let deadline = CommandDeadline::new(Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(20));

        assert!(deadline.remaining().is_none());
        assert!(!deadline.admit_exec());
    }

    #[test]
    fn test_libssh2_millis_never_zero() {
        assert_eq!(libssh2_millis(Duration::ZERO), 1);
        assert_eq!(libssh2_millis(Duration::from_millis(250)), 250);
        assert_eq!(libssh2_millis(Duration::from_secs(u64::MAX)), u32::MAX);
    }
}
