//! SurrealDB-backed thread binding store.
//!
//! Bindings live in the `thread_binding` table, one record per conversation,
//! with the conversation timestamp as the record id. Record-id uniqueness is
//! what makes duplicate provisioning attempts fail distinguishably.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use surrealdb::{Surreal, engine::any::Any, opt::auth::Root};
use tracing::instrument;

use crate::base::{
    config::Config,
    types::{Res, Void},
};

use super::{BindingExists, DbClient, GenericDbClient};

/// Table holding the conversation → backend-thread mapping.
const BINDING_TABLE: &str = "thread_binding";

// Extra methods on `DbClient` applied by the surreal implementation.

impl DbClient {
    /// Creates a new SurrealDB client from the application config.
    pub async fn surreal(config: &Config) -> Res<Self> {
        let client = SurrealDbClient::new(config).await?;
        Ok(Self { inner: Arc::new(client) })
    }

    /// Creates an in-memory SurrealDB client (used by tests).
    pub async fn surreal_memory() -> Res<Self> {
        let client = SurrealDbClient::memory().await?;
        Ok(Self { inner: Arc::new(client) })
    }
}

// Structs.

/// Stored content of one thread binding record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ThreadBinding {
    thread_handle: String,
}

/// SurrealDB client implementation.
#[derive(Clone)]
pub struct SurrealDbClient {
    db: Surreal<Any>,
}

impl SurrealDbClient {
    /// Connect to the configured endpoint and select the bot namespace.
    #[instrument(name = "SurrealDbClient::new", skip_all)]
    pub async fn new(config: &Config) -> Res<Self> {
        let db = surrealdb::engine::any::connect(&config.db_endpoint).await?;

        db.signin(Root {
            username: &config.db_username,
            password: &config.db_password,
        })
        .await?;

        db.use_ns("answer_bot").use_db("answer_bot").await?;

        Ok(Self { db })
    }

    /// Connect to a fresh in-memory engine.
    pub async fn memory() -> Res<Self> {
        let db = surrealdb::engine::any::connect("mem://").await?;
        db.use_ns("answer_bot").use_db("answer_bot").await?;

        Ok(Self { db })
    }
}

#[async_trait]
impl GenericDbClient for SurrealDbClient {
    #[instrument(skip(self))]
    async fn get_binding(&self, conversation_ts: &str) -> Res<Option<String>> {
        let record: Option<ThreadBinding> = self.db.select((BINDING_TABLE, conversation_ts)).await?;

        Ok(record.map(|r| r.thread_handle))
    }

    #[instrument(skip(self))]
    async fn create_binding(&self, conversation_ts: &str, thread_handle: &str) -> Void {
        let result: Result<Option<ThreadBinding>, surrealdb::Error> = self
            .db
            .create((BINDING_TABLE, conversation_ts))
            .content(ThreadBinding {
                thread_handle: thread_handle.to_string(),
            })
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(surrealdb::Error::Db(surrealdb::error::Db::RecordExists { .. })) => Err(anyhow::Error::new(BindingExists)),
            Err(e) => Err(anyhow::anyhow!("Failed to create thread binding: {}", e)),
        }
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_binding_returns_none_for_unknown_conversation() {
        let db = DbClient::surreal_memory().await.unwrap();

        let handle = db.get_binding("1700000000.000001").await.unwrap();

        assert_eq!(handle, None);
    }

    #[tokio::test]
    async fn create_then_get_roundtrips_the_handle() {
        let db = DbClient::surreal_memory().await.unwrap();

        db.create_binding("1700000000.000001", "handle-1").await.unwrap();
        let handle = db.get_binding("1700000000.000001").await.unwrap();

        assert_eq!(handle.as_deref(), Some("handle-1"));
    }

    #[tokio::test]
    async fn duplicate_create_surfaces_binding_exists() {
        let db = DbClient::surreal_memory().await.unwrap();

        db.create_binding("1700000000.000001", "winner").await.unwrap();
        let err = db.create_binding("1700000000.000001", "loser").await.unwrap_err();

        assert!(err.downcast_ref::<BindingExists>().is_some());

        // The loser's handle must never replace the winner's.
        let handle = db.get_binding("1700000000.000001").await.unwrap();
        assert_eq!(handle.as_deref(), Some("winner"));
    }

    #[tokio::test]
    async fn bindings_are_keyed_per_conversation() {
        let db = DbClient::surreal_memory().await.unwrap();

        db.create_binding("1700000000.000001", "handle-1").await.unwrap();
        db.create_binding("1700000000.000002", "handle-2").await.unwrap();

        assert_eq!(db.get_binding("1700000000.000001").await.unwrap().as_deref(), Some("handle-1"));
        assert_eq!(db.get_binding("1700000000.000002").await.unwrap().as_deref(), Some("handle-2"));
    }
}
