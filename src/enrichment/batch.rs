use crate::error::{AppError, Result};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Reference number of concurrent sub-resource fetches
pub const DEFAULT_PARALLELISM: usize = 10;

/// A failed fetch within a batch
#[derive(Debug)]
pub struct ItemError {
    /// Position of the failed item in the input batch; `None` if a worker died outside a fetch
    pub index: Option<usize>,
    pub error: AppError,
}

/// Result of a batch: one value per input item plus every error encountered
#[derive(Debug)]
pub struct BatchOutcome<T> {
    /// Aligned 1:1 with the input; failed items hold `T::default()`
    pub results: Vec<T>,
    pub errors: Vec<ItemError>,
}

impl<T> BatchOutcome<T> {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    /// Summarise the failures as a recoverable partial-fetch error
    pub fn partial_error(&self, resource: &str) -> Option<AppError> {
        if self.errors.is_empty() {
            return None;
        }
        Some(AppError::PartialFetch {
            resource: resource.to_string(),
            failed: self.errors.len(),
            total: self.results.len(),
            errors: self.errors.iter().map(|e| e.error.to_string()).collect(),
        })
    }
}

/// Fetches a per-item sub-resource for a whole batch with a bounded worker pool.
///
/// The queue is filled with the full batch up front; `min(parallelism, len)` workers
/// drain it. Failures never abort sibling fetches.
#[derive(Debug, Clone, Copy)]
pub struct BatchEnricher {
    parallelism: usize,
}

impl Default for BatchEnricher {
    fn default() -> Self {
        Self::new(DEFAULT_PARALLELISM)
    }
}

impl BatchEnricher {
    pub fn new(parallelism: usize) -> Self {
        Self {
            parallelism: parallelism.max(1),
        }
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    pub fn worker_count(&self, batch_len: usize) -> usize {
        self.parallelism.min(batch_len)
    }

    /// Run `fetch_one` for every item and wait for all workers to finish
    pub async fn enrich<I, T, F, Fut>(&self, items: &[I], fetch_one: F) -> BatchOutcome<T>
    where
        I: Clone + Send + 'static,
        T: Default + Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let start = Instant::now();
        let total = items.len();
        let mut results: Vec<T> = std::iter::repeat_with(T::default).take(total).collect();
        let mut errors = Vec::new();

        if total == 0 {
            return BatchOutcome { results, errors };
        }

        let queue: Arc<Mutex<VecDeque<(usize, I)>>> =
            Arc::new(Mutex::new(items.iter().cloned().enumerate().collect()));
        let fetch_one = Arc::new(fetch_one);
        let workers = self.worker_count(total);
        let (tx, mut rx) = mpsc::unbounded_channel::<(usize, Result<T>)>();

        let mut pool = JoinSet::new();
        for worker_id in 0..workers {
            let queue = Arc::clone(&queue);
            let fetch_one = Arc::clone(&fetch_one);
            let tx = tx.clone();

            pool.spawn(async move {
                let mut fetched = 0usize;
                loop {
                    let next = queue.lock().await.pop_front();
                    let Some((index, item)) = next else {
                        break;
                    };
                    // the receiver lives until every worker has joined
                    let _ = tx.send((index, fetch_one(item).await));
                    fetched += 1;
                }
                debug!(worker_id, fetched, "Batch worker finished");
            });
        }
        drop(tx);

        let mut aborted = Vec::new();
        while let Some(joined) = pool.join_next().await {
            if let Err(join_error) = joined {
                warn!(error = %join_error, "Batch worker aborted");
                aborted.push(join_error.to_string());
            }
        }

        let mut delivered = vec![false; total];
        while let Some((index, outcome)) = rx.recv().await {
            delivered[index] = true;
            match outcome {
                Ok(value) => results[index] = value,
                Err(error) => {
                    warn!(index, error = %error, "Batch fetch failed");
                    errors.push(ItemError {
                        index: Some(index),
                        error,
                    });
                }
            }
        }

        // items taken by a worker that died, or never taken because every worker died
        if !aborted.is_empty() {
            let reason = aborted.join("; ");
            let lost: Vec<usize> = (0..total).filter(|&i| !delivered[i]).collect();
            if lost.is_empty() {
                errors.push(ItemError {
                    index: None,
                    error: AppError::Internal(format!("batch worker aborted: {}", reason)),
                });
            }
            for index in lost {
                errors.push(ItemError {
                    index: Some(index),
                    error: AppError::Internal(format!("batch worker aborted: {}", reason)),
                });
            }
        }

        errors.sort_by_key(|e| e.index);

        info!(
            items = total,
            workers,
            failed = errors.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Batch enrichment completed"
        );

        BatchOutcome { results, errors }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_results_keep_input_order() {
        let enricher = BatchEnricher::new(4);
        let items: Vec<u64> = (0..20).collect();

        // later items finish first
        let outcome = enricher
            .enrich(&items, |n: u64| async move {
                tokio::time::sleep(Duration::from_millis(20 - n)).await;
                Ok(n * 10)
            })
            .await;

        assert!(outcome.is_complete());
        assert_eq!(outcome.results, (0..20).map(|n| n * 10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_failures_leave_defaults_and_are_all_reported() {
        let enricher = BatchEnricher::default();
        let items: Vec<usize> = (0..23).collect();

        let outcome = enricher
            .enrich(&items, |n: usize| async move {
                if n == 7 || n == 19 {
                    Err(AppError::Network(format!("fetch {} failed", n)))
                } else {
                    Ok(vec![n])
                }
            })
            .await;

        assert_eq!(outcome.results.len(), 23);
        assert!(outcome.results[7].is_empty());
        assert!(outcome.results[19].is_empty());
        for (i, value) in outcome.results.iter().enumerate() {
            if i != 7 && i != 19 {
                assert_eq!(value, &vec![i]);
            }
        }
        assert_eq!(outcome.errors.len(), 2);
        assert_eq!(outcome.errors[0].index, Some(7));
        assert_eq!(outcome.errors[1].index, Some(19));

        match outcome.partial_error("log entry") {
            Some(AppError::PartialFetch { failed, total, .. }) => {
                assert_eq!(failed, 2);
                assert_eq!(total, 23);
            }
            other => panic!("expected partial fetch error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let enricher = BatchEnricher::new(3);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let items: Vec<usize> = (0..12).collect();

        let (flight, top) = (Arc::clone(&in_flight), Arc::clone(&peak));
        let outcome = enricher
            .enrich(&items, move |_n: usize| {
                let (flight, top) = (Arc::clone(&flight), Arc::clone(&top));
                async move {
                    let now = flight.fetch_add(1, Ordering::SeqCst) + 1;
                    top.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await;

        assert!(outcome.is_complete());
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_worker_panic_keeps_fetched_results() {
        let items: Vec<usize> = (0..6).collect();

        let outcome = BatchEnricher::new(1)
            .enrich(&items, |n: usize| async move {
                if n == 5 {
                    panic!("fetch {} blew up", n);
                }
                Ok(vec![n])
            })
            .await;

        for (i, value) in outcome.results.iter().take(5).enumerate() {
            assert_eq!(value, &vec![i]);
        }
        assert!(outcome.results[5].is_empty());
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].index, Some(5));
        assert!(matches!(outcome.errors[0].error, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn test_items_left_by_dead_workers_are_reported() {
        let items: Vec<usize> = (0..4).collect();

        // the only worker dies on the first item, the rest are never fetched
        let outcome = BatchEnricher::new(1)
            .enrich(&items, |n: usize| async move {
                if n == 0 {
                    panic!("first fetch blew up");
                }
                Ok(n)
            })
            .await;

        let failed: Vec<_> = outcome.errors.iter().map(|e| e.index).collect();
        assert_eq!(failed, vec![Some(0), Some(1), Some(2), Some(3)]);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let outcome = BatchEnricher::default()
            .enrich(&Vec::<u8>::new(), |_n: u8| async move { Ok(1u8) })
            .await;
        assert!(outcome.results.is_empty());
        assert!(outcome.partial_error("note").is_none());
    }

    #[test]
    fn test_worker_count() {
        let enricher = BatchEnricher::new(10);
        assert_eq!(enricher.worker_count(3), 3);
        assert_eq!(enricher.worker_count(100), 10);
        assert_eq!(BatchEnricher::new(0).parallelism(), 1);
    }
}
