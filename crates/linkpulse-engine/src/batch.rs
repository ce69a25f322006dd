//! Bounded-batch execution of per-link audits.
//!
//! Links are partitioned into fixed-size batches that run strictly
//! sequentially; within one batch every item runs concurrently on its own
//! spawned task. The spawn boundary is what makes "drop this link, keep the
//! run" robust: a panicking audit surfaces as a `JoinError` for that item
//! instead of tearing down the batch.

use std::future::Future;

use futures::future::join_all;
use tokio::task::JoinError;

/// Run `op` over `items` in sequential batches of `batch_size`.
///
/// Batch N+1 does not start until every task of batch N has resolved.
/// Results are returned in input order; a panicked task yields `Err` in its
/// slot.
pub(crate) async fn run_in_batches<T, R, F, Fut>(
    items: Vec<T>,
    batch_size: usize,
    op: F,
) -> Vec<Result<R, JoinError>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = R> + Send + 'static,
{
    let batch_size = batch_size.max(1);
    let mut results = Vec::with_capacity(items.len());
    let mut remaining = items.into_iter();

    loop {
        let batch: Vec<T> = remaining.by_ref().take(batch_size).collect();
        if batch.is_empty() {
            break;
        }

        let handles: Vec<_> = batch
            .into_iter()
            .map(|item| tokio::spawn(op(item)))
            .collect();

        // Batch-local accumulation; merged into the run's results only after
        // the whole batch has resolved.
        let batch_results = join_all(handles).await;
        results.extend(batch_results);
    }

    results
}
