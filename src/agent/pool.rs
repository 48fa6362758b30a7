//! Bounded worker pool for event processing.
//!
//! Arrival is unbounded (the platform pushes events at its own pace); the
//! pool bounds both concurrency and buffering. Bursts are absorbed up to the
//! queue capacity; sustained overload sheds the newest work instead of
//! growing memory or blocking the dispatcher.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio::{
    sync::{Mutex, mpsc},
    task::JoinHandle,
};
use tracing::{error, info, warn};

use crate::base::types::{MentionEvent, Void};

use super::Agent;

/// One unit of dispatched processing.
///
/// A closed set: the platform delivers a small, fixed set of event kinds.
/// Each item is created by the dispatcher and consumed exactly once by a
/// single worker.
#[derive(Debug)]
pub enum WorkItem {
    /// An app-mention event to route through the agent.
    AppMention(MentionEvent),
}

impl WorkItem {
    /// Process the item to completion on the calling worker.
    pub async fn process(self, agent: &Agent) -> Void {
        match self {
            WorkItem::AppMention(event) => agent.handle_mention(&event).await,
        }
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkItem::AppMention(event) => write!(f, "AppMention{{user: {}, channel: {}}}", event.user, event.channel),
        }
    }
}

/// Fixed-size pool of workers draining a shared bounded queue.
pub struct WorkerPool {
    worker_count: usize,
    queue_tx: mpsc::Sender<WorkItem>,
    queue_rx: Arc<Mutex<mpsc::Receiver<WorkItem>>>,
    workers: Vec<JoinHandle<()>>,
    dropped: Arc<AtomicU64>,
}

impl WorkerPool {
    /// Create a pool with `worker_count` workers and a queue of `queue_capacity` items.
    pub fn new(worker_count: usize, queue_capacity: usize) -> Self {
        assert!(worker_count >= 1, "worker count must be at least 1");
        assert!(queue_capacity >= 1, "queue capacity must be at least 1");

        let (queue_tx, queue_rx) = mpsc::channel(queue_capacity);

        Self {
            worker_count,
            queue_tx,
            queue_rx: Arc::new(Mutex::new(queue_rx)),
            workers: Vec::new(),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Spawn the worker loops.
    pub fn start(&mut self, agent: Agent) {
        info!("Starting worker pool with {} workers", self.worker_count);

        for id in 1..=self.worker_count {
            self.workers.push(tokio::spawn(worker_loop(id, self.queue_rx.clone(), agent.clone())));
        }
    }

    /// Non-blocking enqueue.
    ///
    /// A full queue sheds the item; a closed queue (pool stopping) rejects
    /// it. Either way the item is counted and logged, and the caller never
    /// blocks or sees an error.
    pub fn submit(&self, item: WorkItem) {
        match self.queue_tx.try_send(item) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Closed(item)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Worker pool is shutting down, cannot submit work: {}", item);
            }
            Err(mpsc::error::TrySendError::Full(item)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Work queue is full, dropping work item: {}", item);
            }
        }
    }

    /// Number of items shed so far.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Close the queue and wait for the workers to drain it.
    ///
    /// Every item accepted by `submit` is processed before `stop` returns.
    /// Consuming the pool makes a second stop unrepresentable.
    pub async fn stop(self) {
        info!("Stopping worker pool ...");

        drop(self.queue_tx);
        futures::future::join_all(self.workers).await;

        info!("Worker pool stopped");
    }
}

/// A single worker loop: one item at a time until the queue closes and drains.
///
/// A failing item is logged and isolated; it never stops the loop.
async fn worker_loop(id: usize, queue: Arc<Mutex<mpsc::Receiver<WorkItem>>>, agent: Agent) {
    info!("Worker {} started", id);

    loop {
        // The lock is only held while waiting for the next item; processing
        // happens after it is released, so workers run concurrently.
        let item = queue.lock().await.recv().await;

        let Some(item) = item else {
            info!("Worker {} shutting down (queue closed)", id);
            return;
        };

        let label = item.to_string();
        if let Err(err) = item.process(&agent).await {
            error!("Worker {} failed to process {}: {}", id, label, err);
        }
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Semaphore;

    use crate::{
        base::types::{Res, ThreadMessage},
        service::{
            chat::{ChatClient, GenericChatClient},
            db::{DbClient, GenericDbClient},
            llm::{GenericLlmClient, LlmClient},
        },
    };

    use super::*;

    /// Chat stub whose posts block on a semaphore, to park workers mid-item.
    struct GatedChat {
        gate: Arc<Semaphore>,
        entered: Arc<AtomicU64>,
        posted: Arc<AtomicU64>,
    }

    #[async_trait]
    impl GenericChatClient for GatedChat {
        fn bot_user_id(&self) -> &str {
            "UBOT"
        }

        async fn start(&self, _mentions: mpsc::UnboundedSender<MentionEvent>) -> Void {
            Ok(())
        }

        async fn post_message(&self, channel_id: &str, _thread_ts: &str, _text: &str) -> Void {
            self.entered.fetch_add(1, Ordering::SeqCst);
            let _permit = self.gate.acquire().await?;

            if channel_id == "C-FAIL" {
                return Err(anyhow::anyhow!("post rejected"));
            }

            self.posted.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn thread_replies(&self, _channel_id: &str, _thread_ts: &str) -> Res<Vec<ThreadMessage>> {
            Ok(Vec::new())
        }
    }

    struct NullDb;

    #[async_trait]
    impl GenericDbClient for NullDb {
        async fn get_binding(&self, _conversation_ts: &str) -> Res<Option<String>> {
            Ok(None)
        }

        async fn create_binding(&self, _conversation_ts: &str, _thread_handle: &str) -> Void {
            Ok(())
        }
    }

    struct NullLlm;

    #[async_trait]
    impl GenericLlmClient for NullLlm {
        async fn create_thread(&self, _project: &str, _version: &str) -> Res<String> {
            Ok("handle".into())
        }

        async fn query(&self, _project: &str, _version: &str, _thread_handle: &str, _message: &str) -> Res<String> {
            Ok("response".into())
        }

        async fn elaborate(&self, _thread_handle: &str, _message: &str) -> Res<String> {
            Ok("response".into())
        }

        async fn inject(&self, _project: &str, _version: &str, _text: &str) -> Void {
            Ok(())
        }
    }

    struct Harness {
        gate: Arc<Semaphore>,
        entered: Arc<AtomicU64>,
        posted: Arc<AtomicU64>,
        agent: Agent,
    }

    fn harness() -> Harness {
        let gate = Arc::new(Semaphore::new(0));
        let entered = Arc::new(AtomicU64::new(0));
        let posted = Arc::new(AtomicU64::new(0));

        let chat = ChatClient::new(Arc::new(GatedChat {
            gate: gate.clone(),
            entered: entered.clone(),
            posted: posted.clone(),
        }));
        let agent = Agent::new(DbClient::new(Arc::new(NullDb)), LlmClient::new(Arc::new(NullLlm)), chat);

        Harness { gate, entered, posted, agent }
    }

    /// An event that routes to the generic help reply (a single post).
    fn help_event(channel: &str, n: u64) -> MentionEvent {
        MentionEvent {
            channel: channel.into(),
            ts: format!("1700000000.{n:06}"),
            thread_ts: None,
            user: "U1".into(),
            text: "<@UBOT> bogus".into(),
        }
    }

    async fn wait_until(counter: &AtomicU64, expected: u64) {
        for _ in 0..200 {
            if counter.load(Ordering::SeqCst) >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("counter never reached {expected}");
    }

    #[tokio::test]
    async fn sheds_overload_without_blocking_and_drains_the_rest_on_stop() {
        let h = harness();
        let mut pool = WorkerPool::new(1, 5);
        pool.start(h.agent.clone());

        // Park the single worker on the first item.
        pool.submit(WorkItem::AppMention(help_event("C1", 0)));
        wait_until(&h.entered, 1).await;

        // Fill the queue exactly to capacity: nothing dropped.
        for n in 1..=5 {
            pool.submit(WorkItem::AppMention(help_event("C1", n)));
        }
        assert_eq!(pool.dropped_count(), 0);

        // Two more over capacity: shed, not blocked.
        pool.submit(WorkItem::AppMention(help_event("C1", 6)));
        pool.submit(WorkItem::AppMention(help_event("C1", 7)));
        assert_eq!(pool.dropped_count(), 2);

        // Unblock the worker; stop must drain every accepted item first.
        h.gate.add_permits(100);
        pool.stop().await;

        assert_eq!(h.posted.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn a_failing_item_does_not_stop_the_worker() {
        let h = harness();
        h.gate.add_permits(100);

        let mut pool = WorkerPool::new(1, 5);
        pool.start(h.agent.clone());

        pool.submit(WorkItem::AppMention(help_event("C-FAIL", 0)));
        pool.submit(WorkItem::AppMention(help_event("C1", 1)));
        pool.stop().await;

        // The failed post was entered but never counted; the next item still ran.
        assert_eq!(h.entered.load(Ordering::SeqCst), 2);
        assert_eq!(h.posted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn workers_process_items_concurrently() {
        let h = harness();
        let mut pool = WorkerPool::new(3, 10);
        pool.start(h.agent.clone());

        for n in 0..3 {
            pool.submit(WorkItem::AppMention(help_event("C1", n)));
        }

        // All three workers are parked inside an item at once.
        wait_until(&h.entered, 3).await;

        h.gate.add_permits(100);
        pool.stop().await;

        assert_eq!(h.posted.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stop_with_an_idle_pool_returns_promptly() {
        let h = harness();
        let mut pool = WorkerPool::new(2, 5);
        pool.start(h.agent.clone());

        pool.stop().await;

        assert_eq!(h.posted.load(Ordering::SeqCst), 0);
    }
}
