//! Parallel fetches under one shared deadline.
//!
//! ```text
//!   keys ──► spawn one task per key ──► fetch(key, round token)
//!                  │                          │
//!                  │                 try_send {key, outcome}
//!                  ▼                          ▼
//!            watcher: join all ──► all_done   mpsc (capacity = keys)
//!                                     │        │
//!                 select! { item | all_done | deadline }   (first pass)
//!                                     │
//!                       while try_recv() { record }        (second pass)
//!                                     │
//!                          drop guard cancels the round token
//! ```
//!
//! The first pass waits on whichever of a new item, the join, or the deadline
//! happens first; `tokio::select!` picks at random among ready branches, so
//! the join can win while finished items still sit in the channel. The second
//! pass never waits and picks those up. On expiry the collector yields once
//! before the second pass, so a fetch whose timer fired on the same tick as
//! the deadline has published by then.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::entities::{CollectionResult, Deadline, FetchError, FetchKey, FetchOutcome};
use crate::use_cases::ports::Fetcher;

/// Published once by every per-key task
struct Completion<K> {
    key: K,
    outcome: FetchOutcome,
}

/// Fans out one fetch per key and fans the outcomes back in before a deadline.
///
/// The collector itself cannot fail. A fetch error is recorded as a
/// [`FetchOutcome::Failure`]; a fetch that had not finished when the round was
/// torn down is simply absent from the result.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParallelCollector;

impl ParallelCollector {
    pub fn new() -> Self {
        Self
    }

    /// Run one collection round.
    ///
    /// Every fetch receives a child of the deadline's token. That child is
    /// cancelled when this returns (or when this future is dropped), so fetches
    /// that are still running can abort their own I/O. Tasks are never killed:
    /// a fetch that ignores cancellation finishes detached and its outcome is
    /// discarded.
    pub async fn run<K, F>(
        &self,
        keys: &[K],
        fetcher: Arc<F>,
        deadline: &Deadline,
    ) -> CollectionResult<K>
    where
        K: FetchKey,
        F: Fetcher<K> + ?Sized + 'static,
    {
        let mut items = CollectionResult::with_capacity(keys.len());
        if keys.is_empty() {
            return items;
        }

        let round = deadline.token().child_token();
        let _teardown = round.clone().drop_guard();

        // Room for every key, so a task can always deposit its result and exit.
        let (tx, mut rx) = mpsc::channel::<Completion<K>>(keys.len());

        let handles: Vec<JoinHandle<()>> = keys
            .iter()
            .cloned()
            .map(|key| {
                let fetcher = Arc::clone(&fetcher);
                let cancel = round.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let outcome = match AssertUnwindSafe(fetcher.fetch(&key, cancel))
                        .catch_unwind()
                        .await
                    {
                        Ok(result) => FetchOutcome::from(result),
                        Err(panic) => FetchOutcome::failure(FetchError::Panicked(
                            panic_message(&*panic),
                        )),
                    };
                    // Only fails once the collector has stopped listening.
                    let _ = tx.try_send(Completion { key, outcome });
                })
            })
            .collect();
        // The channel closes when the last task drops its sender.
        drop(tx);

        let (done_tx, mut all_done) = oneshot::channel::<()>();
        tokio::spawn(async move {
            // Panics are caught inside each task and tasks are never aborted.
            let _ = join_all(handles).await;
            let _ = done_tx.send(());
        });

        let expired = deadline.expired();
        tokio::pin!(expired);

        let mut closed = false;
        loop {
            tokio::select! {
                item = rx.recv(), if !closed => match item {
                    Some(Completion { key, outcome }) => items.record(key, outcome),
                    None => closed = true,
                },
                _ = &mut all_done => break,
                () = &mut expired => {
                    // Let fetches woken on the same timer tick publish first.
                    tokio::task::yield_now().await;
                    break;
                }
            }
        }

        while let Ok(Completion { key, outcome }) = rx.try_recv() {
            items.record(key, outcome);
        }

        items
    }
}

/// Text of a caught panic payload
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
