pub mod slack;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use crate::base::types::{MentionEvent, Res, ThreadMessage, Void};

// Traits.

/// Generic "chat" trait that clients must implement.
///
/// This trait defines the core functionality for interacting with chat platforms
/// like Slack. Implementing this trait allows different chat services to be used
/// with the answer-bot.
#[async_trait]
pub trait GenericChatClient: Send + Sync + 'static {
    /// Get the bot user ID.
    ///
    /// Returns the unique identifier for the bot in the chat platform,
    /// which is used to detect when the bot is mentioned.
    fn bot_user_id(&self) -> &str;

    /// Start the chat client listener.
    ///
    /// Sets up event listeners for the chat platform and delivers every
    /// app-mention event into `mentions`. Returns when the listener shuts
    /// down; the sender is dropped with it, which closes the mention stream.
    async fn start(&self, mentions: UnboundedSender<MentionEvent>) -> Void;

    /// Send a message to a channel thread.
    ///
    /// Used to post acknowledgements, answers, and help replies in the
    /// thread the triggering mention belongs to.
    async fn post_message(&self, channel_id: &str, thread_ts: &str, text: &str) -> Void;

    /// Get the transcript of a conversation thread, parent message included.
    ///
    /// Messages are returned in chronological order. A thread that does not
    /// exist (the mention was a top-level message) yields an empty transcript.
    async fn thread_replies(&self, channel_id: &str, thread_ts: &str) -> Res<Vec<ThreadMessage>>;
}

// Structs.

/// Chat client handle for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<dyn GenericChatClient>,
}

impl Deref for ChatClient {
    type Target = dyn GenericChatClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ChatClient {
    pub fn new(inner: Arc<dyn GenericChatClient>) -> Self {
        Self { inner }
    }
}
