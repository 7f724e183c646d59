//! Component I: tokenizer worker pool.
//!
//! Workers are isolated tokio tasks with no shared mutable state beyond a
//! read-only, process-shared tokenizer cache keyed by name. Counting jobs
//! are partitioned into `⌈N/K⌉`-sized contiguous slices across the pool and
//! reassembled in slice order.

use super::Tokenizer;
use crate::errors::{EngineError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tracing::debug;

/// Shared, read-only (after first load) tokenizer cache. A `Mutex` guards
/// only the insert-if-absent race on first use of a given name; every
/// subsequent lookup is a cheap clone of an `Arc`.
type TokenizerCache = Mutex<HashMap<String, Arc<Tokenizer>>>;

pub struct WorkerPool {
    workers: usize,
    capacity: Arc<Semaphore>,
    cache: Arc<TokenizerCache>,
    next_job_id: AtomicU64,
    shutting_down: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Pool sized to the number of logical CPUs.
    pub fn new() -> Self {
        Self::with_capacity(std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
    }

    pub fn with_capacity(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            workers,
            capacity: Arc::new(Semaphore::new(workers)),
            cache: Arc::new(Mutex::new(HashMap::new())),
            next_job_id: AtomicU64::new(0),
            shutting_down: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Count tokens for each input string against `tokenizer_name`,
    /// partitioning across the pool and preserving input order.
    pub async fn count_batch(&self, tokenizer_name: &str, inputs: Vec<String>, add_special_tokens: bool) -> Result<Vec<usize>> {
        if self.shutting_down.load(Ordering::SeqCst) {
            return Err(EngineError::PoolShuttingDown);
        }
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let job_id = self.next_job_id.fetch_add(1, Ordering::SeqCst);
        let tokenizer = self.tokenizer_for(tokenizer_name).await?;
        let slice_size = inputs.len().div_ceil(self.workers);

        let mut handles = Vec::new();
        for (worker_id, chunk) in inputs.chunks(slice_size).enumerate() {
            let permit = Arc::clone(&self.capacity);
            let tokenizer = Arc::clone(&tokenizer);
            let chunk: Vec<String> = chunk.to_vec();
            let shutting_down = Arc::clone(&self.shutting_down);
            handles.push(tokio::spawn(async move {
                let _permit = permit.acquire_owned().await.map_err(|_| EngineError::PoolShuttingDown)?;
                if shutting_down.load(Ordering::SeqCst) {
                    return Err(EngineError::PoolJobCancelled);
                }
                debug!(job_id, worker_id, "dispatched tokenizer job");
                Ok::<Vec<usize>, EngineError>(chunk.iter().map(|text| tokenizer.count(text, add_special_tokens)).collect())
            }));
        }

        let mut results = Vec::with_capacity(inputs.len());
        for handle in handles {
            let slice = handle.await.map_err(|e| EngineError::AbortErr(e.to_string()))??;
            results.extend(slice);
        }
        Ok(results)
    }

    async fn tokenizer_for(&self, name: &str) -> Result<Arc<Tokenizer>> {
        let mut cache = self.cache.lock().await;
        if let Some(tok) = cache.get(name) {
            return Ok(Arc::clone(tok));
        }
        let tok = Arc::new(Tokenizer::load(name)?);
        cache.insert(name.to_string(), Arc::clone(&tok));
        Ok(tok)
    }

    /// Reject all further jobs, including slices already spawned but not
    /// yet past their permit acquisition.
    pub fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
    }

    /// Undo a previous shutdown so the pool can be reused.
    pub fn restart(&self) {
        self.shutting_down.store(false, Ordering::SeqCst);
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shutdown_rejects_new_dispatches() {
        let pool = WorkerPool::with_capacity(2);
        pool.shutdown();
        let err = pool.count_batch("missing", vec!["hi".to_string()], false).await.unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::PoolShuttingDown);
    }

    #[tokio::test]
    async fn restart_allows_dispatch_after_shutdown() {
        let pool = WorkerPool::with_capacity(2);
        pool.shutdown();
        pool.restart();
        let err = pool.count_batch("still-missing-tokenizer", vec!["hi".to_string()], false).await.unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::TokenizerNotFound);
    }

    #[tokio::test]
    async fn empty_input_returns_empty_without_touching_cache() {
        let pool = WorkerPool::with_capacity(2);
        let results = pool.count_batch("unused-name", vec![], false).await.unwrap();
        assert!(results.is_empty());
    }
}
