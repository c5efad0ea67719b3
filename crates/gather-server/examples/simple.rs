//! Simple example demonstrating the parallel collector on its own
//!
//! This example shows how to:
//! - Wrap an async closure as a fetcher
//! - Gather several keys under one shared deadline
//! - Tell failures apart from keys that did not finish in time
//!
//! Run with `cargo run --example simple`.

use gather_server::prelude::*;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    // Each key takes as many milliseconds as its number; odd ones fail
    let fetcher = fetch_fn(|key: u64, cancel: CancellationToken| async move {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(key)) => {}
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
        }
        if key % 2 == 1 {
            Err(FetchError::Status { status: 503 })
        } else {
            Ok(format!("slept {key}ms").into_bytes())
        }
    });

    let keys: Vec<u64> = vec![10, 25, 40, 120, 400, 800];
    let deadline = Deadline::after(Duration::from_millis(250));
    println!("Gathering {} keys with a 250ms deadline...\n", keys.len());

    let result = ParallelCollector::new()
        .run(&keys, Arc::new(fetcher), &deadline)
        .await;

    for key in &keys {
        match result.get(key) {
            Some(FetchOutcome::Success { payload }) => {
                println!("{key:>4}: ok     {}", String::from_utf8_lossy(payload))
            }
            Some(FetchOutcome::Failure { error }) => println!("{key:>4}: failed {error}"),
            None => println!("{key:>4}: timed out"),
        }
    }

    println!(
        "\n{} of {} keys finished in time",
        result.len(),
        keys.len()
    );
}
