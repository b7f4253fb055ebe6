//! Deferred work that outlives the request that scheduled it.
//!
//! Handlers push boxed futures through [`BackgroundTasks`]; a single
//! [`BackgroundExecutor`] task owns the `JoinSet` they run in. Responses are
//! returned without waiting on any of this work.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::{broadcast, mpsc, Notify};
use tokio::task::JoinSet;

use crate::observability::metrics;

type Task = BoxFuture<'static, ()>;

/// Handle used to extend work past the end of a request.
#[derive(Clone)]
pub struct BackgroundTasks {
    tx: mpsc::UnboundedSender<Task>,
    in_flight: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl BackgroundTasks {
    /// Schedule `future` without waiting for it.
    ///
    /// Work submitted after the executor has stopped is dropped with a warning.
    pub fn extend<F>(&self, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlightGuard {
            in_flight: self.in_flight.clone(),
            idle: self.idle.clone(),
        };

        let task: Task = Box::pin(async move {
            let _guard = guard;
            future.await;
        });

        if self.tx.send(task).is_err() {
            tracing::warn!("Background executor stopped, dropping task");
            metrics::record_background_task("rejected");
        }
    }

    /// Number of scheduled tasks that have not finished.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Wait until every scheduled task has finished or been dropped.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Decrements the in-flight count when a task completes, panics or is dropped.
struct InFlightGuard {
    in_flight: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Runs background tasks until shutdown, then drains them.
pub struct BackgroundExecutor {
    rx: mpsc::UnboundedReceiver<Task>,
    tasks: JoinSet<()>,
    grace: Duration,
}

impl BackgroundExecutor {
    /// Create an executor and the handle that feeds it.
    pub fn new(grace: Duration) -> (Self, BackgroundTasks) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = BackgroundTasks {
            tx,
            in_flight: Arc::new(AtomicUsize::new(0)),
            idle: Arc::new(Notify::new()),
        };
        let executor = Self {
            rx,
            tasks: JoinSet::new(),
            grace,
        };
        (executor, handle)
    }

    /// Accept tasks until `shutdown` fires or every handle is dropped.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        loop {
            tokio::select! {
                task = self.rx.recv() => match task {
                    Some(task) => {
                        self.tasks.spawn(task);
                        metrics::record_background_task("spawned");
                    }
                    None => break,
                },
                Some(result) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    log_join_result(result);
                }
                _ = shutdown.recv() => {
                    tracing::info!("Background executor shutting down");
                    break;
                }
            }
        }

        self.drain().await;
    }

    async fn drain(mut self) {
        self.rx.close();
        while let Ok(task) = self.rx.try_recv() {
            self.tasks.spawn(task);
        }

        let pending = self.tasks.len();
        if pending == 0 {
            return;
        }
        tracing::info!(pending, grace_secs = self.grace.as_secs(), "Draining background tasks");

        let tasks = &mut self.tasks;
        let drained = tokio::time::timeout(self.grace, async {
            while let Some(result) = tasks.join_next().await {
                log_join_result(result);
            }
        })
        .await;

        if drained.is_err() {
            let abandoned = self.tasks.len();
            tracing::warn!(abandoned, "Grace period elapsed, abandoning background tasks");
            self.tasks.abort_all();
            metrics::record_background_abandoned(abandoned);
        }
    }
}

fn log_join_result(result: Result<(), tokio::task::JoinError>) {
    match result {
        Ok(()) => metrics::record_background_task("completed"),
        Err(e) if e.is_panic() => {
            tracing::error!(error = %e, "Background task panicked");
            metrics::record_background_task("panicked");
        }
        Err(_) => metrics::record_background_task("cancelled"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[tokio::test]
    async fn test_tasks_run_and_wait_idle() {
        let (executor, tasks) = BackgroundExecutor::new(Duration::from_secs(1));
        let (_tx, shutdown) = broadcast::channel(1);
        tokio::spawn(executor.run(shutdown));

        let done = Arc::new(AtomicBool::new(false));
        let flag = done.clone();
        tasks.extend(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            flag.store(true, Ordering::SeqCst);
        });

        tasks.wait_idle().await;
        assert!(done.load(Ordering::SeqCst));
        assert_eq!(tasks.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_drains_pending_tasks() {
        let (executor, tasks) = BackgroundExecutor::new(Duration::from_secs(5));
        let (tx, shutdown) = broadcast::channel(1);

        let done = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let done = done.clone();
            tasks.extend(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }

        tx.send(()).unwrap();
        executor.run(shutdown).await;

        assert_eq!(done.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_grace_period_abandons_stuck_tasks() {
        let (executor, tasks) = BackgroundExecutor::new(Duration::from_millis(20));
        let (tx, shutdown) = broadcast::channel(1);

        tasks.extend(std::future::pending());
        tx.send(()).unwrap();
        executor.run(shutdown).await;

        tasks.wait_idle().await;
        assert_eq!(tasks.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_extend_after_stop_is_dropped() {
        let (executor, tasks) = BackgroundExecutor::new(Duration::from_millis(20));
        drop(executor);

        tasks.extend(async {});
        tasks.wait_idle().await;
        assert_eq!(tasks.in_flight(), 0);
    }
}
