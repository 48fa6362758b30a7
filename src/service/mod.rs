//! Service integrations for external APIs and clients.
//!
//! This module contains implementations for the services used by the answer-bot:
//! - Chat services (e.g., Slack)
//! - Thread binding stores (e.g., SurrealDB)
//! - Knowledge backends (e.g., a LlamaIndex server)
//!
//! Each service module defines both generic traits and concrete implementations,
//! allowing for extensibility and easy testing.

pub mod chat;
pub mod db;
pub mod llm;
