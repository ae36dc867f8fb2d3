//! Bounded worker pool.
//!
//! `submit` returns immediately; the spawned task waits for one of `size`
//! slots before running. A slow job occupies a slot, never the submitter.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct WorkerPool {
    slots: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// `size` is clamped to at least one slot.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            slots: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    /// Queue `job`. Resolves to `None` if the pool was closed before the job
    /// got a slot.
    pub fn submit<F>(&self, job: F) -> JoinHandle<Option<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let slots = Arc::clone(&self.slots);
        tokio::spawn(async move {
            let _slot = slots.acquire_owned().await.ok()?;
            Some(job.await)
        })
    }

    /// Stop handing out slots. Jobs already running finish; queued ones
    /// resolve to `None`.
    pub fn close(&self) {
        self.slots.close();
    }

    /// Wait until every slot is free again.
    pub async fn drain(&self) {
        if let Ok(all) = self.slots.acquire_many(self.size as u32).await {
            drop(all);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn never_runs_more_than_size_jobs() {
        let pool = WorkerPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                pool.submit(async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for h in handles {
            assert_eq!(h.await.unwrap(), Some(()));
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn submit_does_not_block_when_saturated() {
        let pool = WorkerPool::new(1);
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let blocker = pool.submit(async move {
            let _ = rx.await;
        });

        // Pool is full; submitting must still return right away.
        let queued = pool.submit(async { 7 });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!queued.is_finished());

        tx.send(()).unwrap();
        blocker.await.unwrap();
        assert_eq!(queued.await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn closed_pool_rejects_queued_jobs() {
        let pool = WorkerPool::new(1);
        pool.close();
        assert_eq!(pool.submit(async { 1 }).await.unwrap(), None);
    }

    #[test]
    fn zero_size_is_clamped() {
        assert_eq!(WorkerPool::new(0).size(), 1);
    }
}
