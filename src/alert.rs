//! Repeating audible alerts.
//!
//! While a hazardous state persists, a background task repeats a spoken
//! warning at a fixed interval until cancelled. Cancellation joins the task
//! thread, so a cancelled loop is guaranteed to have stopped before any
//! alert for a different state can start. The speech synthesis itself lives
//! behind the `Announcer` contract.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Sink for one spoken utterance. Implementations must not block for longer
/// than one utterance takes to deliver.
pub trait Announcer: Send + Sync {
    fn speak(&self, text: &str);
}

/// Default announcer: routes alert text to the operator log.
pub struct LogAnnouncer;

impl Announcer for LogAnnouncer {
    fn speak(&self, text: &str) {
        log::warn!("alert: {}", text);
    }
}

/// Handle to a running repeating alert. Dropping the handle cancels the
/// loop and joins the thread.
pub struct AlertHandle {
    cancelled: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl AlertHandle {
    /// Stop the alert loop and wait for its thread to exit.
    pub fn cancel(mut self) {
        self.cancel_inner();
    }

    fn cancel_inner(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                log::error!("alert thread panicked");
            }
        }
    }
}

impl Drop for AlertHandle {
    fn drop(&mut self) {
        self.cancel_inner();
    }
}

/// Speak `text` immediately and then once per `interval` until cancelled.
///
/// The sleep is sliced so cancellation takes effect within ~50ms rather
/// than waiting out the full interval.
pub fn speak_repeatedly(
    announcer: Arc<dyn Announcer>,
    text: String,
    interval: Duration,
) -> AlertHandle {
    let cancelled = Arc::new(AtomicBool::new(false));
    let cancelled_thread = cancelled.clone();
    let join = std::thread::spawn(move || {
        const SLICE: Duration = Duration::from_millis(50);
        loop {
            announcer.speak(&text);
            let mut waited = Duration::ZERO;
            while waited < interval {
                if cancelled_thread.load(Ordering::SeqCst) {
                    return;
                }
                let step = SLICE.min(interval - waited);
                std::thread::sleep(step);
                waited += step;
            }
            if cancelled_thread.load(Ordering::SeqCst) {
                return;
            }
        }
    });
    AlertHandle {
        cancelled,
        join: Some(join),
    }
}
