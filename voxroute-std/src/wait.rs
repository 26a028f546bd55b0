//! Bounded polling wait.
//!
//! Lets one request wait for a value that an unrelated, concurrently running
//! request is expected to produce. There is no shared signal between the two,
//! only a store, so the waiter polls on a fixed schedule and gives up once the
//! schedule is exhausted.

use std::{future::Future, time::Duration};
use tokio::time::sleep;
use voxroute_core::WaitError;

/// Delays of the default schedule, in milliseconds.
///
/// The platform stops waiting for a callback answer shortly after the last
/// attempt, so the schedule must not be stretched.
pub const DEFAULT_SCHEDULE_MS: [u64; 6] = [100, 300, 500, 1000, 2000, 3000];

/// A time-bounded retry loop over a fixed delay schedule.
///
/// The supplier is invoked once per schedule slot. Slot `i` sleeps for
/// `schedule[i]` before attempt `i + 1`; the last slot never sleeps because
/// no attempt follows it. With [`DEFAULT_SCHEDULE_MS`] that is six attempts
/// and five sleeps totalling 3.9 seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedWait {
    schedule: Vec<Duration>,
}

impl Default for BoundedWait {
    fn default() -> Self {
        Self::from_millis(DEFAULT_SCHEDULE_MS)
    }
}

impl BoundedWait {
    /// Create a wait over an explicit schedule.
    pub fn new(schedule: impl IntoIterator<Item = Duration>) -> Self {
        Self {
            schedule: schedule.into_iter().collect(),
        }
    }

    /// Create a wait over a schedule given in milliseconds.
    pub fn from_millis(schedule: impl IntoIterator<Item = u64>) -> Self {
        Self::new(schedule.into_iter().map(Duration::from_millis))
    }

    /// The delay schedule.
    pub fn schedule(&self) -> &[Duration] {
        &self.schedule
    }

    /// Maximum number of supplier invocations.
    pub fn attempts(&self) -> usize {
        self.schedule.len()
    }

    /// Total sleep time when every attempt comes back empty.
    pub fn budget(&self) -> Duration {
        let sleeps = self.schedule.len().saturating_sub(1);
        self.schedule[..sleeps].iter().sum()
    }

    /// Poll `supplier` until it yields a value or the schedule runs out.
    ///
    /// A supplier error ends the wait immediately.
    pub async fn until<T, E, F, Fut>(&self, mut supplier: F) -> Result<T, WaitError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        let attempts = self.schedule.len();
        let mut waited = Duration::ZERO;

        for (idx, delay) in self.schedule.iter().enumerate() {
            if let Some(value) = supplier().await.map_err(WaitError::Source)? {
                return Ok(value);
            }
            if idx + 1 < attempts {
                sleep(*delay).await;
                waited += *delay;
            }
        }

        Err(WaitError::Timeout { attempts, waited })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        convert::Infallible,
        sync::atomic::{AtomicUsize, Ordering},
    };
    use tokio::time::Instant;

    #[test]
    fn test_default_schedule_budget() {
        let wait = BoundedWait::default();
        assert_eq!(wait.attempts(), 6);
        assert_eq!(wait.budget(), Duration::from_millis(3900));
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolves_on_third_attempt() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let start = Instant::now();

        let value = BoundedWait::default()
            .until(move || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                Ok::<_, Infallible>((n == 3).then_some("<menu/>"))
            })
            .await
            .unwrap();

        assert_eq!(value, "<menu/>");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 100ms + 300ms of sleeps, nothing after success.
        assert_eq!(start.elapsed(), Duration::from_millis(400));
        assert!(start.elapsed() < BoundedWait::default().budget());
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_after_six_attempts() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let start = Instant::now();

        let err = BoundedWait::default()
            .until(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<Option<()>, Infallible>(None)
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 6);
        assert_eq!(start.elapsed(), Duration::from_millis(3900));
        match err {
            WaitError::Timeout { attempts, waited } => {
                assert_eq!(attempts, 6);
                assert_eq!(waited, Duration::from_millis(3900));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_supplier_error_aborts() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        let err = BoundedWait::default()
            .until(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<Option<()>, _>(std::io::Error::other("store down"))
            })
            .await
            .unwrap_err();

        assert!(!err.is_timeout());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_value_never_sleeps() {
        let start = Instant::now();
        let value = BoundedWait::from_millis([50, 50])
            .until(|| async { Ok::<_, Infallible>(Some(7)) })
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_empty_schedule_times_out_without_attempts() {
        let err = BoundedWait::new([])
            .until(|| async { Ok::<_, Infallible>(Some(1)) })
            .await
            .unwrap_err();
        assert!(matches!(err, WaitError::Timeout { attempts: 0, .. }));
    }
}
