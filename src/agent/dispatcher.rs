//! Dispatch loop between the chat event stream and the worker pool.

use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::base::types::MentionEvent;

use super::pool::{WorkItem, WorkerPool};

/// Single reader of the mention event stream.
///
/// Wraps each event into a work item and submits it to the pool without ever
/// waiting for a worker to be free; back-pressure is the pool's concern. On
/// shutdown the pool is drained before the dispatcher returns, so nothing
/// already accepted is lost; events still sitting in the stream are
/// deliberately dropped (delivery is best-effort).
pub struct Dispatcher {
    events: UnboundedReceiver<MentionEvent>,
    pool: WorkerPool,
}

impl Dispatcher {
    /// Create a dispatcher over an event stream and a started pool.
    pub fn new(events: UnboundedReceiver<MentionEvent>, pool: WorkerPool) -> Self {
        Self { events, pool }
    }

    /// Run until cancelled or the event stream closes, then drain-stop the pool.
    #[instrument(skip_all)]
    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                maybe_event = self.events.recv() => {
                    match maybe_event {
                        Some(event) => self.pool.submit(WorkItem::AppMention(event)),
                        None => {
                            info!("Mention stream closed; dispatcher shutting down ...");
                            break;
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!("Dispatcher shutting down ...");
                    break;
                }
            }
        }

        self.pool.stop().await;
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    #[tokio::test]
    async fn cancellation_stops_the_dispatcher_and_the_pool() {
        let (tx, rx) = mpsc::unbounded_channel();
        let pool = WorkerPool::new(1, 5);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(Dispatcher::new(rx, pool).run(cancel.clone()));

        cancel.cancel();
        task.await.unwrap();

        // The stream outlives the dispatcher; sending is now pointless but harmless.
        drop(tx);
    }

    #[tokio::test]
    async fn a_closed_stream_stops_the_dispatcher() {
        let (tx, rx) = mpsc::unbounded_channel::<MentionEvent>();
        let pool = WorkerPool::new(1, 5);

        let task = tokio::spawn(Dispatcher::new(rx, pool).run(CancellationToken::new()));

        drop(tx);
        task.await.unwrap();
    }
}
