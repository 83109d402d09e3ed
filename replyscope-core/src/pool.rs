//! Bounded, order-preserving concurrency
//!
//! Futures are polled cooperatively on the calling task: nothing is spawned,
//! so borrowed state (clients, key lists) can be shared without `Arc`.

use std::future::Future;

use futures::stream::{FuturesUnordered, StreamExt};

/// Run `tasks` with at most `limit` in flight and return their outputs in
/// submission order.
///
/// A slot freed by a finished task is refilled from the queue before the next
/// completion is awaited. A `limit` of 0 is treated as 1. Tasks are not
/// cancelled when a sibling returns an error; fallible tasks should return
/// `Result` and let the caller decide.
pub async fn run_pooled<I, Fut>(tasks: I, limit: usize) -> Vec<Fut::Output>
where
    I: IntoIterator<Item = Fut>,
    Fut: Future,
{
    let limit = limit.max(1);
    let mut queue = tasks.into_iter().enumerate();
    let mut arena: Vec<Option<Fut::Output>> = Vec::new();
    let mut in_flight = FuturesUnordered::new();

    for (idx, task) in queue.by_ref().take(limit) {
        arena.push(None);
        in_flight.push(tagged(idx, task));
    }

    while let Some((idx, output)) = in_flight.next().await {
        arena[idx] = Some(output);

        if let Some((next_idx, task)) = queue.next() {
            arena.push(None);
            in_flight.push(tagged(next_idx, task));
        }
    }

    arena.into_iter().flatten().collect()
}

async fn tagged<F: Future>(idx: usize, task: F) -> (usize, F::Output) {
    (idx, task.await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct Gauge {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Gauge {
        fn enter(&self) {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
        }

        fn leave(&self) {
            self.current.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_limit_respected_and_order_preserved() {
        let gauge = Arc::new(Gauge::default());

        // Later tasks finish first, so completion order is the reverse of
        // submission order within each wave.
        let tasks = (0..20u64).map(|i| {
            let gauge = Arc::clone(&gauge);
            async move {
                gauge.enter();
                tokio::time::sleep(Duration::from_millis(100 - i * 3)).await;
                gauge.leave();
                i
            }
        });

        let results = run_pooled(tasks, 5).await;

        assert_eq!(results, (0..20).collect::<Vec<_>>());
        assert_eq!(gauge.peak.load(Ordering::SeqCst), 5);
        assert_eq!(gauge.current.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_free_slot_is_reused_immediately() {
        let durations = [100u64, 10, 10, 10];
        let start = tokio::time::Instant::now();

        let tasks = durations.iter().map(|ms| async move {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
            *ms
        });
        let results = run_pooled(tasks, 2).await;

        assert_eq!(results, vec![100, 10, 10, 10]);
        // The three short tasks share one slot while the long one runs.
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_millis(100) && elapsed < Duration::from_millis(110),
            "elapsed {elapsed:?}"
        );
    }

    #[tokio::test]
    async fn test_failure_does_not_cancel_siblings() {
        let finished = Arc::new(AtomicUsize::new(0));

        let tasks = (0..6).map(|i| {
            let finished = Arc::clone(&finished);
            async move {
                tokio::task::yield_now().await;
                finished.fetch_add(1, Ordering::SeqCst);
                if i == 1 {
                    Err(format!("task {i} failed"))
                } else {
                    Ok(i)
                }
            }
        });

        let results = run_pooled(tasks, 2).await;

        assert_eq!(finished.load(Ordering::SeqCst), 6);
        assert_eq!(results.len(), 6);
        assert_eq!(results[0], Ok(0));
        assert_eq!(results[1], Err("task 1 failed".to_string()));
        assert_eq!(results[5], Ok(5));
    }

    #[tokio::test]
    async fn test_zero_limit_runs_sequentially() {
        let gauge = Arc::new(Gauge::default());
        let tasks = (0..3).map(|i| {
            let gauge = Arc::clone(&gauge);
            async move {
                gauge.enter();
                tokio::task::yield_now().await;
                gauge.leave();
                i
            }
        });

        assert_eq!(run_pooled(tasks, 0).await, vec![0, 1, 2]);
        assert_eq!(gauge.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_queue() {
        let tasks: Vec<std::future::Ready<u8>> = Vec::new();
        assert!(run_pooled(tasks, 5).await.is_empty());
    }
}
