//! Token bucket and stream shaping
//!
//! The bucket pays out its byte budget in fixed 100 ms windows. Callers ask
//! for what they have and take what the window can give; a drained window
//! parks the caller until the next one opens.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_stream::try_stream;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{Stream, TryStreamExt};
use tokio::time::Instant;

const INTERVAL: Duration = Duration::from_millis(100);

/// Byte budget refilled on a fixed window.
///
/// Shared behind an `Arc` when one cap covers both the request and response
/// body, so the two streams drain a single budget.
pub struct TokenBucket {
    per_interval: u64,
    state: Mutex<Window>,
}

struct Window {
    start: Instant,
    consumed: u64,
}

impl TokenBucket {
    /// Bucket paying out `bytes_per_second`, replenished every 100 ms.
    pub fn new(bytes_per_second: u64) -> Self {
        TokenBucket {
            per_interval: (bytes_per_second / 10).max(1),
            state: Mutex::new(Window {
                start: Instant::now(),
                consumed: 0,
            }),
        }
    }

    /// Take up to `want` bytes from the current window, sleeping while the
    /// budget is spent. Grants at least one byte for a nonzero `want`.
    pub async fn acquire(&self, want: usize) -> usize {
        if want == 0 {
            return 0;
        }
        loop {
            let next_window = {
                let mut window = self
                    .state
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                let now = Instant::now();
                if now >= window.start + INTERVAL {
                    // advance by whole intervals so pacing does not drift
                    let periods = ((now - window.start).as_nanos() / INTERVAL.as_nanos()) as u32;
                    window.start += INTERVAL * periods;
                    window.consumed = 0;
                }
                if window.consumed < self.per_interval {
                    let grant = (self.per_interval - window.consumed).min(want as u64);
                    window.consumed += grant;
                    return grant as usize;
                }
                window.start + INTERVAL
            };
            tokio::time::sleep_until(next_window).await;
        }
    }

    /// Budget available per 100 ms window.
    pub fn per_interval(&self) -> u64 {
        self.per_interval
    }
}

/// Wrap a byte stream so no chunk leaves faster than the bucket allows.
/// Oversized chunks are split; errors and end-of-stream pass through.
pub fn shape_stream<S, E>(
    bucket: Arc<TokenBucket>,
    inner: S,
) -> BoxStream<'static, Result<Bytes, E>>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Send + 'static,
{
    Box::pin(try_stream! {
        futures::pin_mut!(inner);
        while let Some(mut chunk) = inner.try_next().await? {
            while !chunk.is_empty() {
                let granted = bucket.acquire(chunk.len()).await;
                yield chunk.split_to(granted);
            }
        }
    })
}
