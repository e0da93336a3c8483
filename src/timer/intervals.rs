use chrono::{DateTime, Duration, Utc};

/// A single contiguous run of the stopwatch. Intervals are plain values: closing one replaces it
/// in the owning [IntervalStore] instead of mutating it through a shared reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub stop: Option<DateTime<Utc>>,
}

impl Interval {
    pub fn open(start: DateTime<Utc>) -> Self {
        Self { start, stop: None }
    }

    pub fn closed(start: DateTime<Utc>, stop: DateTime<Utc>) -> Self {
        Self {
            start,
            stop: Some(stop),
        }
    }

    pub fn is_open(&self) -> bool {
        self.stop.is_none()
    }

    /// Open intervals are measured up to `now`. Nothing is clamped, so a stop that precedes its
    /// start yields a negative duration.
    pub fn duration(&self, now: DateTime<Utc>) -> Duration {
        self.stop.unwrap_or(now) - self.start
    }

    pub fn with_stop(self, stop: DateTime<Utc>) -> Self {
        Self {
            stop: Some(stop),
            ..self
        }
    }
}

/// Accumulated stopwatch time as a chronological list of intervals. Only the last interval may be
/// open, and the store is running exactly when it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntervalStore {
    intervals: Vec<Interval>,
}

impl IntervalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a store from its flat form `[start0, stop0, start1, stop1, ..., startN]`. An odd
    /// trailing entry becomes the start of an open interval.
    pub fn from_timestamps(timestamps: &[DateTime<Utc>]) -> Self {
        let intervals = timestamps
            .chunks(2)
            .map(|pair| Interval {
                start: pair[0],
                stop: pair.get(1).copied(),
            })
            .collect();
        Self { intervals }
    }

    pub fn to_timestamps(&self) -> Vec<DateTime<Utc>> {
        self.intervals
            .iter()
            .flat_map(|interval| std::iter::once(interval.start).chain(interval.stop))
            .collect()
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn is_running(&self) -> bool {
        self.intervals.last().is_some_and(Interval::is_open)
    }

    /// Opens a new interval. Does nothing while an interval is already open, so the first start
    /// wins.
    pub fn start(&mut self, now: DateTime<Utc>) {
        if self.is_running() {
            return;
        }
        self.intervals.push(Interval::open(now));
    }

    /// Closes the open interval at `now`. `now` is taken as is, even when it precedes the start.
    pub fn stop(&mut self, now: DateTime<Utc>) {
        if !self.is_running() {
            return;
        }
        let last = self.intervals.len() - 1;
        self.intervals[last] = self.intervals[last].with_stop(now);
    }

    /// Drops every interval, including an open one.
    pub fn clear(&mut self) {
        self.intervals.clear();
    }

    pub fn total_elapsed(&self, now: DateTime<Utc>) -> Duration {
        self.intervals
            .iter()
            .fold(Duration::zero(), |total, interval| total + interval.duration(now))
    }
}
