use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError, Sender};

use mr_core::RacerError;

use super::instance::TerminateHandle;

pub(crate) struct Watchdog {
    cancel: Sender<()>,
    thread: JoinHandle<bool>,
}

impl Watchdog {
    pub(crate) fn arm(
        instance_id: u64,
        target: TerminateHandle,
        timeout: Duration,
    ) -> Result<Option<Self>, RacerError> {
        if timeout.is_zero() {
            return Ok(None);
        }

        let (cancel, cancelled) = channel::bounded::<()>(1);
        let thread = thread::Builder::new()
            .name(format!("mr-watchdog-{}", instance_id))
            .spawn(move || match cancelled.recv_timeout(timeout) {
                Err(RecvTimeoutError::Timeout) => {
                    tracing::debug!(instance_id, ?timeout, "watchdog fired");
                    target.terminate();
                    true
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => false,
            })
            .map_err(|error| {
                RacerError::resource(
                    "EVAL_WATCHDOG_SPAWN",
                    format!("Cannot start watchdog thread: {}", error),
                )
            })?;

        Ok(Some(Self { cancel, thread }))
    }

    pub(crate) fn disarm(self) -> bool {
        let _ = self.cancel.send(());
        self.thread.join().unwrap_or(false)
    }
}

#[cfg(test)]
mod watchdog_tests {
    use std::time::Instant;

    use super::*;

    #[test]
    fn zero_timeout_starts_no_thread() {
        let handle = TerminateHandle::default();
        let watchdog = Watchdog::arm(1, handle.clone(), Duration::ZERO).expect("arm");
        assert!(watchdog.is_none());
        assert!(!handle.is_requested());
    }

    #[test]
    fn fires_once_after_timeout() {
        let handle = TerminateHandle::default();
        let watchdog = Watchdog::arm(1, handle.clone(), Duration::from_millis(10))
            .expect("arm")
            .expect("watchdog");
        std::thread::sleep(Duration::from_millis(100));
        assert!(handle.is_requested());
        assert!(watchdog.disarm());
    }

    #[test]
    fn disarm_cancels_the_sleep_promptly() {
        let handle = TerminateHandle::default();
        let watchdog = Watchdog::arm(1, handle.clone(), Duration::from_secs(60))
            .expect("arm")
            .expect("watchdog");
        let started = Instant::now();
        assert!(!watchdog.disarm());
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!handle.is_requested());
    }
}
