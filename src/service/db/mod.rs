pub mod surreal;

use std::{fmt, ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::{Res, Void};

// Traits.

/// Generic database client trait that clients must implement.
///
/// The store keeps the durable mapping from a conversation thread to the
/// backend-thread handle that holds its conversational memory. A
/// conversation has at most one binding, ever; the store's key uniqueness is
/// the only synchronization between workers racing to provision the same
/// conversation.
#[async_trait]
pub trait GenericDbClient: Send + Sync + 'static {
    /// Look up the backend-thread handle bound to a conversation.
    async fn get_binding(&self, conversation_ts: &str) -> Res<Option<String>>;

    /// Persist the binding for a conversation.
    ///
    /// Fails with an error downcastable to [`BindingExists`] when the
    /// conversation already has a binding, so a caller that lost the
    /// provisioning race can detect it and reuse the winner's handle.
    async fn create_binding(&self, conversation_ts: &str, thread_handle: &str) -> Void;
}

/// Database client for answer-bot.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct DbClient {
    inner: Arc<dyn GenericDbClient>,
}

impl Deref for DbClient {
    type Target = dyn GenericDbClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl DbClient {
    pub fn new(inner: Arc<dyn GenericDbClient>) -> Self {
        Self { inner }
    }
}

// Errors.

/// The conversation already has a binding.
///
/// Not a failure of the store; it is the signal that another worker won the
/// provisioning race for this conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingExists;

impl fmt::Display for BindingExists {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a thread binding already exists for this conversation")
    }
}

impl std::error::Error for BindingExists {}
