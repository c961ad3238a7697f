//! Bounded set of connection workers.
//!
//! The pool is a counting semaphore. The acceptor takes a [`Worker`] slot
//! before it accepts, so once every slot is busy pending connections wait in
//! the kernel's listen backlog instead of piling up in memory.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

/// A reserved slot in the pool, released when the job it runs finishes.
#[derive(Debug)]
pub struct Worker {
    permit: OwnedSemaphorePermit,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Slots not currently running a job.
    pub fn idle(&self) -> usize {
        self.permits.available_permits()
    }

    /// Waits until a slot is free.
    pub async fn reserve(&self) -> anyhow::Result<Worker> {
        let permit = Arc::clone(&self.permits).acquire_owned().await?;
        Ok(Worker { permit })
    }
}

impl Worker {
    /// Runs `job` on the runtime's thread pool, holding the slot until it
    /// completes. A panicking job still frees its slot.
    pub fn spawn<F>(self, job: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permit = self.permit;
        tokio::spawn(async move {
            let _permit = permit;
            job.await;
        })
    }
}
