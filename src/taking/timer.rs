use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use log::{info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// The countdown reached zero. Fired at most once per timer.
    Expired,
}

/// Wall-clock countdown for one survey session.
///
/// Ticks once per second on a spawned task; each tick recomputes
/// `remaining = max(0, deadline - now)` so a delayed tick cannot stretch
/// the deadline. At zero it fires exactly one [`TimerEvent::Expired`] and
/// stops. Not restartable; a session that needs a new countdown starts a
/// new timer.
pub struct CountdownTimer {
    remaining: Arc<AtomicU64>,
    // One-shot guard shared with the tick task. Whichever of cancel() and
    // natural expiry flips it first wins; the loser is a no-op.
    finished: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CountdownTimer {
    pub fn start(total_seconds: u64) -> (CountdownTimer, mpsc::UnboundedReceiver<TimerEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let remaining = Arc::new(AtomicU64::new(total_seconds));
        let finished = Arc::new(AtomicBool::new(false));

        if total_seconds == 0 {
            // Misconfigured (zero or negative) duration: expire immediately
            // instead of ticking or erroring out.
            warn!("⏱️ Countdown started with no time budget, expiring immediately");
            finished.store(true, Ordering::SeqCst);
            let _ = events.send(TimerEvent::Expired);
            return (
                CountdownTimer {
                    remaining,
                    finished,
                    handle: None,
                },
                receiver,
            );
        }

        info!("⏱️ Countdown started: {}s", total_seconds);
        let deadline = Instant::now() + Duration::from_secs(total_seconds);
        let handle = tokio::spawn({
            let remaining = Arc::clone(&remaining);
            let finished = Arc::clone(&finished);
            async move {
                let mut ticks = time::interval_at(
                    Instant::now() + Duration::from_secs(1),
                    Duration::from_secs(1),
                );
                loop {
                    ticks.tick().await;
                    let left = deadline.saturating_duration_since(Instant::now()).as_secs();
                    remaining.store(left, Ordering::SeqCst);
                    if left == 0 {
                        if !finished.swap(true, Ordering::SeqCst) {
                            info!("⏰ Countdown expired");
                            let _ = events.send(TimerEvent::Expired);
                        }
                        break;
                    }
                }
            }
        });

        (
            CountdownTimer {
                remaining,
                finished,
                handle: Some(handle),
            },
            receiver,
        )
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining.load(Ordering::SeqCst)
    }

    /// Stop ticking without firing `Expired`. Idempotent; loses cleanly if
    /// natural expiry already won the race.
    pub fn cancel(&self) {
        if self.finished.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = &self.handle {
            handle.abort();
        }
        info!("⏹️ Countdown cancelled with {}s left", self.remaining_seconds());
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
