use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Source of time for the stopwatch and its tick loop. Swapped out in tests to control what "now"
/// means.
#[async_trait]
pub trait Clock: Sync + Send + 'static {
    /// Wall clock time, recorded into intervals.
    fn time(&self) -> DateTime<Utc>;

    /// Monotonic time, used only to schedule ticks.
    fn instant(&self) -> Instant;

    async fn sleep_until(&self, instant: Instant);
}

pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, instant: Instant) {
        tokio::time::sleep_until(instant).await;
    }
}

#[cfg(test)]
pub mod test_clock {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};
    use tokio::time::Instant;

    use super::Clock;

    /// Clock whose wall time only moves when told to. Clones share the same time.
    #[derive(Clone)]
    pub struct TestClock {
        now: Arc<Mutex<DateTime<Utc>>>,
    }

    impl TestClock {
        pub fn new(now: DateTime<Utc>) -> Self {
            Self {
                now: Arc::new(Mutex::new(now)),
            }
        }

        pub fn set(&self, now: DateTime<Utc>) {
            *self.now.lock().unwrap() = now;
        }

        pub fn advance(&self, by: Duration) {
            *self.now.lock().unwrap() += by;
        }
    }

    #[async_trait]
    impl Clock for TestClock {
        fn time(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }

        fn instant(&self) -> Instant {
            Instant::now()
        }

        async fn sleep_until(&self, instant: Instant) {
            tokio::time::sleep_until(instant).await;
        }
    }
}
