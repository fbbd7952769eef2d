use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use signurl_protocol::UploadProgress;

/// Callback invoked with aggregate upload progress.
pub type ProgressCallback = Arc<dyn Fn(UploadProgress) + Send + Sync>;

/// Trailing window used for the throughput estimate.
const SPEED_WINDOW: Duration = Duration::from_secs(5);

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Aggregates per-part byte counts into whole-object progress.
///
/// Each part reports an absolute loaded count, so a part that fails and is
/// retried later simply resets its own contribution instead of inflating the
/// total.
pub struct ProgressTracker {
    inner: Mutex<TrackerInner>,
    callback: Option<ProgressCallback>,
    interval: Duration,
}

struct TrackerInner {
    total: u64,
    loaded: u64,
    parts: HashMap<u32, u64>,
    throughput: Throughput,
    last_notified: Option<Instant>,
}

impl ProgressTracker {
    /// Creates a tracker for an object of `total` bytes.
    ///
    /// `interval` throttles callback invocations; `None` or zero notifies on
    /// every update. The update that reaches `total` is always delivered.
    pub fn new(total: u64, callback: Option<ProgressCallback>, interval: Option<Duration>) -> Self {
        Self {
            inner: Mutex::new(TrackerInner {
                total,
                loaded: 0,
                parts: HashMap::new(),
                throughput: Throughput::new(SPEED_WINDOW),
                last_notified: None,
            }),
            callback,
            interval: interval.unwrap_or(Duration::ZERO),
        }
    }

    /// Returns a per-part reporting handle.
    pub fn part(self: &Arc<Self>, part_number: u32) -> PartProgress {
        PartProgress {
            tracker: Arc::clone(self),
            part_number,
        }
    }

    /// Sets the loaded byte count for one part.
    pub fn set_part(&self, part_number: u32, loaded: u64) {
        let notify = {
            let mut inner = lock(&self.inner);
            let previous = inner.parts.insert(part_number, loaded).unwrap_or(0);
            if previous == loaded {
                return;
            }
            inner.loaded = inner.loaded - previous + loaded;
            if loaded > previous {
                inner.throughput.record(Instant::now(), loaded - previous);
            }
            self.should_notify(&mut inner)
        };
        if notify {
            self.notify();
        }
    }

    /// Drops a part's contribution back to zero (failed transfer).
    pub fn reset_part(&self, part_number: u32) {
        self.set_part(part_number, 0);
    }

    /// Bytes loaded so far across all parts.
    pub fn loaded(&self) -> u64 {
        lock(&self.inner).loaded
    }

    /// Total object size.
    pub fn total(&self) -> u64 {
        lock(&self.inner).total
    }

    /// Current progress snapshot.
    pub fn snapshot(&self) -> UploadProgress {
        let inner = lock(&self.inner);
        UploadProgress {
            loaded: inner.loaded,
            total: inner.total,
            bytes_per_second: inner.throughput.rate(),
        }
    }

    /// Estimated time until every byte is loaded, or `None` while nothing
    /// is moving.
    pub fn eta(&self) -> Option<Duration> {
        let inner = lock(&self.inner);
        let rate = inner.throughput.rate();
        if rate <= 0.0 {
            return None;
        }
        let remaining = inner.total.saturating_sub(inner.loaded);
        Some(Duration::from_secs_f64(remaining as f64 / rate))
    }

    fn should_notify(&self, inner: &mut TrackerInner) -> bool {
        if self.callback.is_none() {
            return false;
        }
        let now = Instant::now();
        let due = self.interval.is_zero()
            || inner.loaded >= inner.total
            || inner
                .last_notified
                .is_none_or(|last| now.duration_since(last) >= self.interval);
        if due {
            inner.last_notified = Some(now);
        }
        due
    }

    fn notify(&self) {
        if let Some(cb) = &self.callback {
            cb(self.snapshot());
        }
    }
}

/// Progress handle bound to one part, handed to a transfer worker.
#[derive(Clone)]
pub struct PartProgress {
    tracker: Arc<ProgressTracker>,
    part_number: u32,
}

impl PartProgress {
    /// Reports the number of bytes of this part sent so far.
    pub fn report(&self, loaded: u64) {
        self.tracker.set_part(self.part_number, loaded);
    }

    /// Forgets everything this part reported.
    pub fn reset(&self) {
        self.tracker.reset_part(self.part_number);
    }

    pub fn part_number(&self) -> u32 {
        self.part_number
    }
}

/// Upload rate over a trailing time window.
///
/// Each record appends a mark holding the running total of bytes sent.
/// The rate is the growth of that total between the oldest and newest
/// marks still inside the window. Resets never lower the total.
struct Throughput {
    window: Duration,
    sent: u64,
    marks: VecDeque<(Instant, u64)>,
}

impl Throughput {
    fn new(window: Duration) -> Self {
        Self {
            window,
            sent: 0,
            marks: VecDeque::new(),
        }
    }

    fn record(&mut self, now: Instant, bytes: u64) {
        self.sent += bytes;
        self.marks.push_back((now, self.sent));
        while self.marks.len() > 1
            && self
                .marks
                .front()
                .is_some_and(|(at, _)| now.duration_since(*at) > self.window)
        {
            self.marks.pop_front();
        }
    }

    /// Bytes per second, 0.0 until two marks span a non-zero interval.
    fn rate(&self) -> f64 {
        let (Some((from, base)), Some((to, sent))) = (self.marks.front(), self.marks.back())
        else {
            return 0.0;
        };
        let elapsed = to.duration_since(*from).as_secs_f64();
        if elapsed <= 0.0 {
            return 0.0;
        }
        (sent - base) as f64 / elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording_tracker(total: u64) -> (Arc<ProgressTracker>, Arc<Mutex<Vec<UploadProgress>>>) {
        let received: Arc<Mutex<Vec<UploadProgress>>> = Arc::new(Mutex::new(Vec::new()));
        let r = Arc::clone(&received);
        let cb: ProgressCallback = Arc::new(move |p: UploadProgress| r.lock().unwrap().push(p));
        (
            Arc::new(ProgressTracker::new(total, Some(cb), None)),
            received,
        )
    }

    #[test]
    fn aggregates_parts() {
        let (tracker, received) = recording_tracker(30);
        tracker.part(1).report(10);
        tracker.part(2).report(5);
        tracker.part(2).report(10);
        tracker.part(3).report(10);

        assert_eq!(tracker.loaded(), 30);
        assert_eq!(tracker.total(), 30);
        let events = received.lock().unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events.last().unwrap().loaded, 30);
        assert!(events.last().unwrap().is_complete());
    }

    #[test]
    fn reset_part_removes_contribution() {
        let (tracker, _) = recording_tracker(20);
        let part = tracker.part(1);
        part.report(10);
        tracker.part(2).report(7);
        part.reset();
        assert_eq!(tracker.loaded(), 7);

        part.report(10);
        assert_eq!(tracker.loaded(), 17);
    }

    #[test]
    fn unchanged_report_is_silent() {
        let (tracker, received) = recording_tracker(10);
        tracker.part(1).report(4);
        tracker.part(1).report(4);
        assert_eq!(received.lock().unwrap().len(), 1);
    }

    #[test]
    fn throttled_but_final_update_delivered() {
        let received: Arc<Mutex<Vec<u64>>> = Arc::new(Mutex::new(Vec::new()));
        let r = Arc::clone(&received);
        let cb: ProgressCallback =
            Arc::new(move |p: UploadProgress| r.lock().unwrap().push(p.loaded));
        let tracker = Arc::new(ProgressTracker::new(
            100,
            Some(cb),
            Some(Duration::from_secs(3600)),
        ));

        for loaded in (10..=90).step_by(10) {
            tracker.part(1).report(loaded);
        }
        tracker.part(1).report(100);

        let events = received.lock().unwrap();
        // First update plus the completing one.
        assert_eq!(*events, vec![10, 100]);
    }

    #[test]
    fn snapshot_without_callback() {
        let tracker = Arc::new(ProgressTracker::new(8, None, None));
        tracker.part(1).report(8);
        let snap = tracker.snapshot();
        assert_eq!(snap.loaded, 8);
        assert_eq!(snap.total, 8);
    }

    #[test]
    fn part_handle_number() {
        let tracker = Arc::new(ProgressTracker::new(8, None, None));
        assert_eq!(tracker.part(3).part_number(), 3);
    }

    #[test]
    fn throughput_needs_two_marks() {
        let mut t = Throughput::new(SPEED_WINDOW);
        assert_eq!(t.rate(), 0.0);
        t.record(Instant::now(), 100);
        assert_eq!(t.rate(), 0.0);
    }

    #[test]
    fn throughput_over_window() {
        let start = Instant::now();
        let mut t = Throughput::new(Duration::from_secs(5));
        t.record(start, 100);
        t.record(start + Duration::from_secs(1), 300);
        t.record(start + Duration::from_secs(2), 300);
        assert_eq!(t.rate(), 300.0);

        // Marks older than the window fall out; the newest always stays.
        t.record(start + Duration::from_secs(6), 400);
        assert_eq!(t.rate(), 700.0 / 5.0);
        t.record(start + Duration::from_secs(30), 50);
        assert_eq!(t.marks.len(), 1);
        assert_eq!(t.rate(), 0.0);
    }

    #[test]
    fn eta_follows_rate() {
        let tracker = ProgressTracker::new(10_000, None, None);
        assert!(tracker.eta().is_none());

        tracker.set_part(1, 1000);
        std::thread::sleep(Duration::from_millis(50));
        tracker.set_part(1, 2000);

        assert!(tracker.snapshot().bytes_per_second > 0.0);
        let eta = tracker.eta().unwrap();
        assert!(eta > Duration::ZERO);

        tracker.set_part(1, 10_000);
        assert_eq!(tracker.eta(), Some(Duration::ZERO));
    }

    #[test]
    fn concurrent_part_reports() {
        use std::thread;

        let tracker = Arc::new(ProgressTracker::new(10 * 100, None, None));
        let mut handles = vec![];
        for part_number in 1..=10u32 {
            let part = tracker.part(part_number);
            handles.push(thread::spawn(move || {
                for loaded in 1..=100 {
                    part.report(loaded);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(tracker.loaded(), 1000);
    }
}
