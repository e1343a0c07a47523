//! Fixed-size worker pools joined as a unit

use crate::logging::Logger;
use futures::future::join_all;
use std::future::Future;

/// Spawn `count` workers (at least one) and wait for all of them.
///
/// Results come back for every worker that returned normally; a worker that
/// panicked is logged and left out, the others are unaffected.
pub async fn run_workers<W, Fut, R>(name: &str, count: usize, output: &Logger, worker: W) -> Vec<R>
where
    W: Fn(usize) -> Fut,
    Fut: Future<Output = R> + Send + 'static,
    R: Send + 'static,
{
    let count = count.max(1);
    output.verbose(&format!("Starting {} {} workers", count, name));

    let handles: Vec<_> = (0..count).map(|id| tokio::spawn(worker(id))).collect();

    let mut results = Vec::with_capacity(count);
    for (id, joined) in join_all(handles).await.into_iter().enumerate() {
        match joined {
            Ok(result) => results.push(result),
            Err(e) => output.error(&format!("{} worker {} terminated abnormally: {}", name, id, e)),
        }
    }

    output.verbose(&format!("All {} workers finished", name));
    results
}
