pub mod llamaindex;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::{Res, Void};

// Traits.

/// Generic knowledge-backend client trait that clients must implement.
///
/// The backend keeps conversational memory per thread handle and answers
/// questions against a project/version document index. Implementing this
/// trait allows different answering backends to be used with the answer-bot.
#[async_trait]
pub trait GenericLlmClient: Send + Sync + 'static {
    /// Create a new backend conversation thread for a project/version pair.
    ///
    /// Returns the opaque handle the backend uses to maintain conversational
    /// memory across queries in the same thread.
    async fn create_thread(&self, project: &str, version: &str) -> Res<String>;

    /// Answer a question inside an existing backend thread.
    async fn query(&self, project: &str, version: &str, thread_handle: &str, message: &str) -> Res<String>;

    /// Expand on a message without consulting a document index.
    async fn elaborate(&self, thread_handle: &str, message: &str) -> Res<String>;

    /// Add raw text to the project/version document index.
    async fn inject(&self, project: &str, version: &str, text: &str) -> Void;
}

// Structs.

/// Knowledge-backend client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct LlmClient {
    inner: Arc<dyn GenericLlmClient>,
}

impl Deref for LlmClient {
    type Target = dyn GenericLlmClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl LlmClient {
    pub fn new(inner: Arc<dyn GenericLlmClient>) -> Self {
        Self { inner }
    }
}
