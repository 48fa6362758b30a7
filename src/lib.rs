//! Library root for `answer-bot`.
//!
//! Answer-bot is a knowledge assistant for Slack channels designed to:
//! - Answer questions against per-project, per-version document indexes
//! - Keep conversational memory per Slack thread on the answering backend
//! - Elaborate on previous answers on request
//! - Grow its indexes from thread content users ask it to inject
//!
//! The bot integrates with Slack for chat, SurrealDB for the thread binding
//! store, and a LlamaIndex-style server for answers. The architecture is
//! built around extensible traits that allow for different implementations
//! of each service, with a bounded worker pool between event ingress and
//! processing.

#[deny(missing_docs)]
pub mod agent;
pub mod base;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use rustls::crypto;
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the answer-bot runtime:
/// - Initializes the crypto provider
/// - Creates the runtime context with store, backend, and chat clients
/// - Starts the dispatcher, worker pool, and chat listener
pub async fn start(config: Config) -> Void {
    info!("Starting answer-bot ...");

    // Start the crypto provider.
    crypto::ring::default_provider().install_default().unwrap();

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
