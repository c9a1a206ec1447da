//! Self-resetting inactivity watchdog
//!
//! One watchdog guards one request attempt. Every byte of progress ticks it,
//! pushing the deadline back by the full window; only a genuinely quiet
//! window cancels the attempt. A stalled connection dies on time while a
//! slow-but-moving download runs forever.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Handle to an armed inactivity deadline.
///
/// Dropping the handle disarms the background task without cancelling the
/// attempt, so early returns and error paths need no cleanup call.
pub struct Watchdog {
    reset: Option<mpsc::Sender<()>>,
    token: CancellationToken,
    timeout: Duration,
}

/// Detached tick handle for streams that outlive the borrow of the watchdog.
/// Ticking after the watchdog is gone is a no-op.
#[derive(Clone)]
pub struct Ticker(Option<mpsc::Sender<()>>);

impl Ticker {
    pub fn tick(&self) {
        if let Some(tx) = &self.0 {
            let _ = tx.try_send(());
        }
    }
}

impl Watchdog {
    /// Arm a deadline of `timeout` with no activity. Zero disables the
    /// watchdog: no task is spawned and the token never cancels.
    pub fn arm(timeout: Duration) -> Self {
        let token = CancellationToken::new();
        if timeout.is_zero() {
            return Watchdog {
                reset: None,
                token,
                timeout,
            };
        }

        let (tx, mut rx) = mpsc::channel::<()>(1);
        let task_token = token.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(timeout) => {
                        task_token.cancel();
                        break;
                    }
                    msg = rx.recv() => match msg {
                        // activity: fall through and re-arm a fresh window
                        Some(()) => continue,
                        // handle dropped: disarm silently
                        None => break,
                    },
                }
            }
        });

        Watchdog {
            reset: Some(tx),
            token,
            timeout,
        }
    }

    /// Record liveness. Never blocks: the channel holds one pending reset
    /// and a full channel already means the window will restart.
    pub fn tick(&self) {
        if let Some(tx) = &self.reset {
            let _ = tx.try_send(());
        }
    }

    /// True once the deadline has fired.
    pub fn fired(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Token callers race their I/O against.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Clonable tick handle, for body streams moved into the client.
    pub fn ticker(&self) -> Ticker {
        Ticker(self.reset.clone())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Disarm without waiting for drop.
    pub fn stop(&mut self) {
        self.reset = None;
    }
}
