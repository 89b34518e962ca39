//! Bounded concurrent task execution.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::{stream, FutureExt, StreamExt};

const PROGRESS_EVERY: usize = 25;

/// How one task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome<T> {
    Completed(T),
    TimedOut,
    Panicked(String),
}

impl<T> TaskOutcome<T> {
    #[must_use]
    pub fn completed(self) -> Option<T> {
        match self {
            TaskOutcome::Completed(value) => Some(value),
            TaskOutcome::TimedOut | TaskOutcome::Panicked(_) => None,
        }
    }
}

/// Run `f` over every task with at most `limit` in flight.
///
/// Each task gets its own `per_task_timeout`; a timeout or panic affects
/// only that task. Outcomes are returned sorted by input index.
pub async fn run_bounded<I, T, F, Fut, R>(
    tasks: I,
    limit: usize,
    per_task_timeout: Duration,
    f: F,
) -> Vec<(usize, TaskOutcome<R>)>
where
    I: IntoIterator<Item = T>,
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
{
    let tasks: Vec<T> = tasks.into_iter().collect();
    let total = tasks.len();
    let f = &f;
    let mut done = 0usize;

    let mut outcomes: Vec<(usize, TaskOutcome<R>)> =
        stream::iter(tasks.into_iter().enumerate())
            .map(|(idx, task)| async move {
                let guarded = AssertUnwindSafe(async move { f(task).await }).catch_unwind();
                let outcome = match tokio::time::timeout(per_task_timeout, guarded).await {
                    Ok(Ok(value)) => TaskOutcome::Completed(value),
                    Ok(Err(payload)) => TaskOutcome::Panicked(panic_message(payload.as_ref())),
                    Err(_) => TaskOutcome::TimedOut,
                };
                (idx, outcome)
            })
            .buffer_unordered(limit.max(1))
            .inspect(|_| {
                done += 1;
                if done % PROGRESS_EVERY == 0 || done == total {
                    tracing::info!(done, total, "crawl progress");
                }
            })
            .collect()
            .await;

    outcomes.sort_by_key(|(idx, _)| *idx);
    outcomes
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "task panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn results_are_sorted_by_index() {
        let outcomes = run_bounded(vec![30u64, 10, 20], 3, Duration::from_secs(5), |ms| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            ms * 2
        })
        .await;

        let values: Vec<(usize, TaskOutcome<u64>)> = outcomes;
        assert_eq!(
            values,
            vec![
                (0, TaskOutcome::Completed(60)),
                (1, TaskOutcome::Completed(20)),
                (2, TaskOutcome::Completed(40)),
            ]
        );
    }

    #[tokio::test]
    async fn never_exceeds_the_limit() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let outcomes = run_bounded(0..20, 3, Duration::from_secs(5), |_| {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }
        })
        .await;

        assert_eq!(outcomes.len(), 20);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn slow_task_times_out_alone() {
        let outcomes = run_bounded(vec![5u64, 5_000], 2, Duration::from_millis(200), |ms| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            ms
        })
        .await;

        assert_eq!(outcomes[0].1, TaskOutcome::Completed(5));
        assert_eq!(outcomes[1].1, TaskOutcome::TimedOut);
    }

    #[tokio::test]
    async fn panic_is_contained() {
        let outcomes = run_bounded(vec![1, 2, 3], 2, Duration::from_secs(5), |n| async move {
            assert!(n != 2, "bad task {n}");
            n
        })
        .await;

        assert_eq!(outcomes[0].1, TaskOutcome::Completed(1));
        assert!(matches!(&outcomes[1].1, TaskOutcome::Panicked(msg) if msg.contains("bad task 2")));
        assert_eq!(outcomes[2].1, TaskOutcome::Completed(3));
    }

    #[tokio::test]
    async fn zero_limit_still_runs() {
        let outcomes = run_bounded(vec![1], 0, Duration::from_secs(1), |n| async move { n }).await;
        assert_eq!(outcomes[0].1.clone().completed(), Some(1));
    }
}
