// Worker - Single-consumer FIFO task queue

pub mod constants;
mod panic_guard;
mod shutdown;

use constants::*;
pub use panic_guard::{execute_guarded_async, PanicGuardResult};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::domain::JobId;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Callback invoked by the worker for each dequeued job.
///
/// Implementations persist their own failures; anything that escapes
/// (a panic) is logged and the worker moves on.
#[async_trait]
pub trait JobProcessor: Send + Sync {
    async fn process(&self, job_id: &str);
}

/// Unbounded FIFO of job ids drained by exactly one background worker.
///
/// No priority, no deduplication: enqueuing the same id twice runs it twice.
pub struct TaskQueue {
    tx: mpsc::UnboundedSender<JobId>,
    rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<JobId>>>,
    poll_interval: Duration,
    running: Mutex<Option<RunningWorker>>,
}

struct RunningWorker {
    shutdown: ShutdownSender,
    handle: JoinHandle<()>,
}

impl TaskQueue {
    pub fn new(poll_interval: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(tokio::sync::Mutex::new(rx)),
            poll_interval,
            running: Mutex::new(None),
        }
    }

    /// Append a job id. Never blocks.
    pub fn enqueue(&self, job_id: impl Into<JobId>) {
        let job_id = job_id.into();
        // The queue owns a receiver, so send only fails if it was torn down.
        if let Err(e) = self.tx.send(job_id) {
            error!(job_id = %e.0, "Task queue closed, job dropped");
        }
    }

    /// Spawn the worker loop. Returns false if a worker is already running.
    pub fn start(&self, processor: Arc<dyn JobProcessor>) -> bool {
        let mut running = match self.running.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(worker) = running.as_ref() {
            if !worker.handle.is_finished() {
                return false;
            }
        }

        let (shutdown, token) = shutdown_channel();
        let rx = Arc::clone(&self.rx);
        let poll_interval = self.poll_interval;
        let handle = tokio::spawn(async move {
            worker_loop(rx, processor, token, poll_interval).await;
        });
        *running = Some(RunningWorker { shutdown, handle });
        true
    }

    pub fn is_running(&self) -> bool {
        match self.running.lock() {
            Ok(guard) => guard.as_ref().is_some_and(|w| !w.handle.is_finished()),
            Err(poisoned) => poisoned
                .into_inner()
                .as_ref()
                .is_some_and(|w| !w.handle.is_finished()),
        }
    }

    /// Signal the worker and wait up to `STOP_GRACE_PERIOD` for it to exit.
    ///
    /// An in-flight job is never aborted; if it outlives the grace period the
    /// worker finishes it in the background and then exits.
    pub async fn stop(&self) {
        let worker = match self.running.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(worker) = worker else {
            return;
        };

        worker.shutdown.shutdown();
        match tokio::time::timeout(STOP_GRACE_PERIOD, worker.handle).await {
            Ok(Ok(())) => info!("Task queue worker stopped"),
            Ok(Err(e)) => error!(error = %e, "Task queue worker ended abnormally"),
            Err(_) => warn!(
                grace_ms = STOP_GRACE_PERIOD.as_millis() as u64,
                "Task queue worker still busy after grace period"
            ),
        }
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

async fn worker_loop(
    rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<JobId>>>,
    processor: Arc<dyn JobProcessor>,
    mut shutdown: ShutdownToken,
    poll_interval: Duration,
) {
    // Held for the worker's lifetime: a restarted worker waits here until
    // a previous one (still finishing a job) releases the queue.
    let mut rx = rx.lock().await;
    info!("Task queue worker started");

    loop {
        if shutdown.is_shutdown() {
            break;
        }

        let next = tokio::select! {
            item = tokio::time::timeout(poll_interval, rx.recv()) => item,
            _ = shutdown.wait() => {
                info!("Task queue worker interrupted during idle");
                break;
            }
        };

        let job_id = match next {
            Ok(Some(job_id)) => job_id,
            Ok(None) => break,
            Err(_) => continue,
        };

        info!(job_id = %job_id, "Dequeued job");
        let processor = Arc::clone(&processor);
        let id = job_id.clone();
        let result = execute_guarded_async(async move { processor.process(&id).await }).await;
        if result.is_panicked() {
            error!(job_id = %job_id, "Job processor panicked, continuing with next job");
        }
    }

    info!("Task queue worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingProcessor {
        seen: Mutex<Vec<String>>,
        active: AtomicUsize,
        max_active: AtomicUsize,
        delay: Duration,
    }

    impl RecordingProcessor {
        fn new(delay: Duration) -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
                delay,
            }
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl JobProcessor for RecordingProcessor {
        async fn process(&self, job_id: &str) {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            if job_id == "panic" {
                self.active.fetch_sub(1, Ordering::SeqCst);
                panic!("processor exploded");
            }
            tokio::time::sleep(self.delay).await;
            self.seen.lock().unwrap().push(job_id.to_string());
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    async fn wait_for(processor: &RecordingProcessor, count: usize) {
        for _ in 0..200 {
            if processor.seen().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("timed out waiting for {} jobs", count);
    }

    #[tokio::test]
    async fn test_fifo_and_single_concurrency() {
        let queue = TaskQueue::new(Duration::from_millis(20));
        let processor = Arc::new(RecordingProcessor::new(Duration::from_millis(5)));
        for id in ["a", "b", "c", "d"] {
            queue.enqueue(id);
        }
        assert!(queue.start(processor.clone()));

        wait_for(&processor, 4).await;
        assert_eq!(processor.seen(), vec!["a", "b", "c", "d"]);
        assert_eq!(processor.max_active.load(Ordering::SeqCst), 1);
        queue.stop().await;
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let queue = TaskQueue::new(Duration::from_millis(20));
        let processor = Arc::new(RecordingProcessor::new(Duration::ZERO));
        assert!(queue.start(processor.clone()));
        assert!(!queue.start(processor.clone()));
        assert!(queue.is_running());
        queue.stop().await;
        assert!(!queue.is_running());
    }

    #[tokio::test]
    async fn test_panic_does_not_kill_worker() {
        let queue = TaskQueue::new(Duration::from_millis(20));
        let processor = Arc::new(RecordingProcessor::new(Duration::ZERO));
        queue.start(processor.clone());

        queue.enqueue("panic");
        queue.enqueue("after");
        wait_for(&processor, 1).await;
        assert_eq!(processor.seen(), vec!["after"]);
        queue.stop().await;
    }

    #[tokio::test]
    async fn test_same_id_runs_twice() {
        let queue = TaskQueue::new(Duration::from_millis(20));
        let processor = Arc::new(RecordingProcessor::new(Duration::ZERO));
        queue.start(processor.clone());
        queue.enqueue("job-1");
        queue.enqueue("job-1");
        wait_for(&processor, 2).await;
        assert_eq!(processor.seen(), vec!["job-1", "job-1"]);
        queue.stop().await;
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_prompt() {
        let queue = TaskQueue::new(Duration::from_secs(30));
        let processor = Arc::new(RecordingProcessor::new(Duration::ZERO));
        queue.start(processor);

        let started = std::time::Instant::now();
        queue.stop().await;
        assert!(started.elapsed() < STOP_GRACE_PERIOD);
    }

    #[tokio::test]
    async fn test_items_enqueued_after_restart_are_processed() {
        let queue = TaskQueue::new(Duration::from_millis(20));
        let processor = Arc::new(RecordingProcessor::new(Duration::ZERO));
        queue.start(processor.clone());
        queue.stop().await;

        queue.enqueue("late");
        assert!(queue.start(processor.clone()));
        wait_for(&processor, 1).await;
        assert_eq!(processor.seen(), vec!["late"]);
        queue.stop().await;
    }
}
