use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{Duration, Instant};

/// Snapshot taken right after one recipient has been attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastProgress {
    /// 1-based position of the recipient just attempted.
    pub index: usize,
    pub total: usize,
    pub delivered: usize,
    pub failed: usize,
}

impl BroadcastProgress {
    pub fn is_final(&self) -> bool {
        self.index == self.total
    }

    pub fn percent(&self) -> f32 {
        if self.total == 0 {
            return 100.0;
        }
        self.index as f32 * 100.0 / self.total as f32
    }
}

/// Receives a progress snapshot after every attempt.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, progress: BroadcastProgress);
}

impl<F> ProgressSink for F
where
    F: Fn(BroadcastProgress) + Send + Sync,
{
    fn emit(&self, progress: BroadcastProgress) {
        self(progress)
    }
}

/// Forwards progress to whoever is rendering it, typically across tasks.
pub struct ChannelProgressSink {
    tx: UnboundedSender<BroadcastProgress>,
}

impl ChannelProgressSink {
    pub fn new(tx: UnboundedSender<BroadcastProgress>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, progress: BroadcastProgress) {
        // The receiver going away must not stop the run.
        if self.tx.send(progress).is_err() {
            log::debug!(
                "Progress receiver dropped at {}/{}",
                progress.index,
                progress.total
            );
        }
    }
}

pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {
    fn emit(&self, _progress: BroadcastProgress) {}
}

/// Tracks elapsed time so a front end can show an ETA.
#[derive(Debug, Clone, Copy)]
pub struct ProgressTracker {
    start_time: Instant,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn estimate_remaining(&self, progress: &BroadcastProgress) -> Option<Duration> {
        estimate_remaining(self.elapsed(), progress)
    }
}

/// Average time per attempt so far, times attempts left.
pub fn estimate_remaining(elapsed: Duration, progress: &BroadcastProgress) -> Option<Duration> {
    if progress.index == 0 {
        return None;
    }

    let remaining = progress.total.saturating_sub(progress.index) as u32;
    let per_attempt = elapsed / progress.index as u32;
    let estimate = per_attempt * remaining;

    log::trace!(
        "ETA {}s (avg {}ms per recipient, {} remaining)",
        estimate.as_secs(),
        per_attempt.as_millis(),
        remaining
    );

    Some(estimate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn progress(index: usize, total: usize) -> BroadcastProgress {
        BroadcastProgress {
            index,
            total,
            delivered: index,
            failed: 0,
        }
    }

    #[test]
    fn final_and_percent() {
        assert!(!progress(1, 4).is_final());
        assert!(progress(4, 4).is_final());
        assert_eq!(progress(1, 4).percent(), 25.0);
        assert_eq!(progress(0, 0).percent(), 100.0);
    }

    #[test]
    fn eta_scales_with_remaining_work() {
        let eta = estimate_remaining(Duration::from_secs(10), &progress(2, 6)).unwrap();
        assert_eq!(eta, Duration::from_secs(20));

        let eta = estimate_remaining(Duration::from_secs(3), &progress(3, 3)).unwrap();
        assert_eq!(eta, Duration::ZERO);

        assert!(estimate_remaining(Duration::from_secs(1), &progress(0, 3)).is_none());
    }

    #[test]
    fn closures_are_sinks() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let sink = move |p: BroadcastProgress| seen_clone.lock().unwrap().push(p.index);

        sink.emit(progress(1, 2));
        sink.emit(progress(2, 2));

        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn channel_sink_survives_dropped_receiver() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let sink = ChannelProgressSink::new(tx);
        drop(rx);
        sink.emit(progress(1, 1));
    }
}
