//! Per-surface sequential mutation queue.
//!
//! Holding a `MutationPermit` for the whole read-compute-commit-broadcast
//! sequence keeps a second mutation from reading a `current` value that the
//! first one is about to replace. Waiters are served in FIFO order.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct MutationQueue {
    lane: Mutex<()>,
    completed: AtomicU64,
}

/// Exclusive right to mutate on behalf of one surface.
pub struct MutationPermit<'a> {
    _guard: MutexGuard<'a, ()>,
    completed: &'a AtomicU64,
}

impl Drop for MutationPermit<'_> {
    fn drop(&mut self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

impl MutationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for every earlier mutation of this surface to finish.
    pub async fn acquire(&self) -> MutationPermit<'_> {
        MutationPermit {
            _guard: self.lane.lock().await,
            completed: &self.completed,
        }
    }

    /// Mutations that have released their permit so far.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::MutationQueue;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[tokio::test]
    async fn permits_serialize_mutations() {
        let queue = Arc::new(MutationQueue::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for index in 0..4u32 {
            let queue = queue.clone();
            let log = log.clone();
            handles.push(tokio::spawn(async move {
                let _permit = queue.acquire().await;
                log.lock().await.push(format!("start {index}"));
                tokio::task::yield_now().await;
                log.lock().await.push(format!("end {index}"));
            }));
        }
        for handle in handles {
            handle.await.expect("task should finish");
        }

        let log = log.lock().await;
        for pair in log.chunks(2) {
            let started = pair[0].trim_start_matches("start ");
            let ended = pair[1].trim_start_matches("end ");
            assert_eq!(started, ended, "mutations interleaved: {log:?}");
        }
        assert_eq!(queue.completed(), 4);
    }
}
