//! Reference-counted busy indicator shared by every fetch group.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::error::CounterInvariantViolation;

#[derive(Debug, Clone)]
pub struct LoaderCounter {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    count: Mutex<usize>,
    busy: watch::Sender<bool>,
}

impl LoaderCounter {
    pub fn new() -> Self {
        let (busy, _) = watch::channel(false);
        Self { inner: Arc::new(Inner { count: Mutex::new(0), busy }) }
    }

    /// Open a fetch group. The counter goes back down when the guard drops,
    /// including when the owning task is aborted.
    pub fn begin(&self) -> LoaderGuard {
        self.acquire();
        LoaderGuard { counter: self.clone() }
    }

    pub fn count(&self) -> usize {
        *self.inner.count.lock()
    }

    pub fn is_busy(&self) -> bool {
        self.count() > 0
    }

    /// Busy flag stream. Only 0→1 and 1→0 transitions are published.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.busy.subscribe()
    }

    fn acquire(&self) {
        let mut count = self.inner.count.lock();
        *count += 1;
        if *count == 1 {
            self.inner.busy.send_replace(true);
        }
    }

    fn release(&self) -> Result<(), CounterInvariantViolation> {
        let mut count = self.inner.count.lock();
        *count = count.checked_sub(1).ok_or(CounterInvariantViolation)?;
        if *count == 0 {
            self.inner.busy.send_replace(false);
        }
        Ok(())
    }
}

impl Default for LoaderCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped membership in the loader count.
#[derive(Debug)]
#[must_use = "the loader is released as soon as the guard is dropped"]
pub struct LoaderGuard {
    counter: LoaderCounter,
}

impl Drop for LoaderGuard {
    fn drop(&mut self) {
        if let Err(defect) = self.counter.release() {
            tracing::error!(%defect, "loader guard released an unbalanced counter");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_groups_keep_loader_busy() {
        let loader = LoaderCounter::new();
        let busy = loader.subscribe();

        let first = loader.begin();
        let second = loader.begin();
        assert_eq!(loader.count(), 2);

        drop(first);
        assert!(loader.is_busy());
        assert!(*busy.borrow());

        drop(second);
        assert_eq!(loader.count(), 0);
        assert!(!*busy.borrow());
    }

    #[test]
    fn release_at_zero_is_reported_and_saturates() {
        let loader = LoaderCounter::new();
        assert_eq!(loader.release(), Err(CounterInvariantViolation));
        assert_eq!(loader.count(), 0);
    }

    #[tokio::test]
    async fn guard_released_when_task_is_aborted() {
        let loader = LoaderCounter::new();
        let guard = loader.begin();
        let task = tokio::spawn(async move {
            let _guard = guard;
            std::future::pending::<()>().await;
        });

        task.abort();
        let _ = task.await;
        assert_eq!(loader.count(), 0);
    }

    #[tokio::test]
    async fn busy_flag_does_not_flicker_between_groups() {
        let loader = LoaderCounter::new();
        let mut busy = loader.subscribe();

        let first = loader.begin();
        busy.changed().await.unwrap();
        assert!(*busy.borrow_and_update());

        let second = loader.begin();
        drop(first);
        assert!(!busy.has_changed().unwrap());

        drop(second);
        busy.changed().await.unwrap();
        assert!(!*busy.borrow_and_update());
    }
}
