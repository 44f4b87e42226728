//! Aggregate progress for concurrent artifact downloads.
//!
//! Download tasks add to shared atomic counters; a ticker task samples them
//! at a fixed interval and turns changes into [`DownloadEvent::Progress`].

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::events::{DownloadEvent, EventSink};

/// Smallest sampling period the ticker accepts.
const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Shared counters for one download invocation.
#[derive(Debug, Default)]
pub struct ProgressCounters {
    downloaded: AtomicU64,
    expected: AtomicU64,
    completed: AtomicUsize,
}

impl ProgressCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the announced size of a transfer that just started.
    pub fn add_expected(&self, bytes: u64) {
        self.expected.fetch_add(bytes, Ordering::SeqCst);
    }

    /// Record received bytes.
    pub fn add_downloaded(&self, bytes: u64) {
        self.downloaded.fetch_add(bytes, Ordering::SeqCst);
    }

    pub fn downloaded(&self) -> u64 {
        self.downloaded.load(Ordering::SeqCst)
    }

    pub fn expected(&self) -> u64 {
        self.expected.load(Ordering::SeqCst)
    }

    /// Count one more satisfied artifact and return the new total.
    pub fn mark_completed(&self) -> usize {
        self.completed.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

/// Turns successive counter readings into progress events.
#[derive(Debug, Default)]
pub(crate) struct ProgressSampler {
    last_bytes: u64,
}

impl ProgressSampler {
    /// Returns an event when the downloaded total moved since the previous
    /// sample and the expected total is known. Samples at or past 100% are
    /// withheld; the terminal event is emitted by the orchestrator.
    pub(crate) fn sample(
        &mut self,
        downloaded: u64,
        expected: u64,
        elapsed: Duration,
    ) -> Option<DownloadEvent> {
        if expected == 0 {
            // Rate is measured from the last tick, not from the start.
            self.last_bytes = downloaded;
            return None;
        }
        if downloaded == self.last_bytes {
            return None;
        }

        let delta = downloaded.saturating_sub(self.last_bytes);
        self.last_bytes = downloaded;

        let fraction = downloaded as f64 / expected as f64;
        if fraction >= 1.0 {
            return None;
        }

        let secs = elapsed.as_secs_f64();
        let rate_mbps = if secs > 0.0 {
            delta as f64 / 1_000_000.0 / secs
        } else {
            0.0
        };

        Some(DownloadEvent::Progress {
            fraction,
            rate_mbps,
        })
    }
}

/// Background task sampling [`ProgressCounters`] every interval.
#[derive(Debug)]
pub(crate) struct ProgressTicker {
    handle: Option<JoinHandle<()>>,
}

impl ProgressTicker {
    pub(crate) fn start(counters: Arc<ProgressCounters>, sink: EventSink, period: Duration) -> Self {
        let period = period.max(MIN_INTERVAL);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;

            let mut sampler = ProgressSampler::default();
            let mut last = Instant::now();
            loop {
                interval.tick().await;
                let now = Instant::now();
                if let Some(event) =
                    sampler.sample(counters.downloaded(), counters.expected(), now - last)
                {
                    sink.emit(event);
                }
                last = now;
            }
        });

        Self {
            handle: Some(handle),
        }
    }

    /// Stop sampling. No event is emitted by the ticker after this returns.
    pub(crate) async fn stop(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
        }
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
