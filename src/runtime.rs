//! Runtime services and shared state for the answer-bot.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::{
    agent::{Agent, dispatcher::Dispatcher, pool::WorkerPool},
    base::{
        config::Config,
        types::{Res, Void},
    },
    service::{chat::ChatClient, db::DbClient, llm::LlmClient},
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the database client, knowledge client, chat client, and
/// configuration. It is designed to be trivially cloneable, allowing it to be
/// passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The thread binding store instance.
    pub db: DbClient,
    /// The knowledge backend client instance.
    pub llm: LlmClient,
    /// The chat client instance.
    pub chat: ChatClient,
}

impl Runtime {
    /// Create a new runtime instance.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> Res<Self> {
        // Initialize the thread binding store.
        let db = DbClient::surreal(&config).await?;

        // Initialize the knowledge backend client.
        let llm = LlmClient::llamaindex(&config);

        // Initialize the slack client.
        let chat = ChatClient::slack(&config).await?;

        Ok(Self { config, db, llm, chat })
    }

    /// Run the bot until the chat listener shuts down.
    ///
    /// Wires the mention stream through the dispatcher into the worker pool,
    /// then runs the chat listener. When the listener returns, the
    /// dispatcher is cancelled and the pool drains in-flight work before
    /// this method returns.
    pub async fn start(&self) -> Void {
        let (mention_tx, mention_rx) = mpsc::unbounded_channel();

        let agent = Agent::new(self.db.clone(), self.llm.clone(), self.chat.clone());

        let mut pool = WorkerPool::new(self.config.worker_count, self.config.queue_capacity);
        pool.start(agent);

        let cancel = CancellationToken::new();
        let dispatcher_task = tokio::spawn(Dispatcher::new(mention_rx, pool).run(cancel.clone()));

        // Runs until the process is told to shut down.
        let listener_result = self.chat.start(mention_tx).await;

        // Stop reading new events; the dispatcher drains the pool before exiting.
        cancel.cancel();
        dispatcher_task.await?;

        listener_result
    }
}
