//! Event handling and command orchestration for answer-bot.
//!
//! This module owns the path from a mention event to a posted reply:
//! - The dispatcher and worker pool fan events out to bounded concurrency
//! - Command parsing turns mention text into an operation
//! - The agent coordinates the chat platform, the binding store, and the
//!   knowledge backend, provisioning backend threads idempotently

pub mod command;
pub mod dispatcher;
pub mod pool;

use anyhow::Context;
use tracing::{debug, instrument};

use crate::{
    base::types::{MentionEvent, Res, ThreadMessage, Void},
    service::{
        chat::ChatClient,
        db::{BindingExists, DbClient},
        llm::LlmClient,
    },
};

use command::Command;

/// Acknowledgement posted before searching for an answer.
const ANSWER_ACK: &str = "Searching for answer...";

/// Acknowledgement posted before elaborating. Also the artifact stripped out
/// of injected thread content when the bot's own ack got caught in the run.
const ELABORATE_ACK: &str = "Elaborating...";

/// Pseudo-project under which every elaborate thread is created.
const ELABORATE_PROJECT: &str = "elaborate";

/// Coordinates one mention event against the store and the knowledge backend.
///
/// Cloneable; every worker holds its own handle. The agent itself is
/// stateless; the only cross-worker state is the binding store, and the
/// store's key uniqueness is the only synchronization used.
#[derive(Clone)]
pub struct Agent {
    db: DbClient,
    llm: LlmClient,
    chat: ChatClient,
}

impl Agent {
    /// Create a new agent over the given service handles.
    pub fn new(db: DbClient, llm: LlmClient, chat: ChatClient) -> Self {
        Self { db, llm, chat }
    }

    /// Route one mention event to the matching operation.
    ///
    /// Malformed input never fails the event: missing arguments or an
    /// unknown keyword resolve to a help reply.
    #[instrument(skip_all, fields(channel = %event.channel, user = %event.user))]
    pub async fn handle_mention(&self, event: &MentionEvent) -> Void {
        let channel = &event.channel;
        let conversation_ts = event.conversation_ts();

        match Command::parse(&event.text) {
            Err(usage) => self.chat.post_message(channel, conversation_ts, usage).await,
            Ok(Command::Answer { project, version, full_thread }) => self.answer_question(channel, conversation_ts, &project, &version, full_thread).await,
            Ok(Command::Inject { project, version }) => self.inject(channel, conversation_ts, &project, &version).await,
            Ok(Command::Elaborate) => self.elaborate(channel, conversation_ts).await,
            Ok(Command::Unknown) => self.chat.post_message(channel, conversation_ts, command::HELP).await,
        }
    }

    /// Answer the question in a conversation against a project/version index.
    ///
    /// The conversation's backend thread is created on first use and reused
    /// for every later question in the same conversation.
    #[instrument(skip(self))]
    pub async fn answer_question(&self, channel: &str, conversation_ts: &str, project: &str, version: &str, full_thread: bool) -> Void {
        self.chat.post_message(channel, conversation_ts, ANSWER_ACK).await.context("failed to post initial message")?;

        let replies = self.chat.thread_replies(channel, conversation_ts).await.context("failed to get thread messages")?;
        let message = if full_thread {
            transcript(&replies)
        } else {
            question_message(&replies)?.to_string()
        };

        let thread_handle = self.provision_thread(conversation_ts, project, version).await?;

        let response = match self.llm.query(project, version, &thread_handle, &message).await {
            Ok(response) => response,
            Err(e) => {
                let _ = self.chat.post_message(channel, conversation_ts, &format!("Failed to generate a response: {e}")).await;
                return Err(e.context("failed to generate response"));
            }
        };

        self.chat
            .post_message(channel, conversation_ts, &format!("Here is the information I was able to find\n{response}"))
            .await
            .context("failed to send response")
    }

    /// Expand on the last message in a conversation.
    ///
    /// Elaborate threads carry no durable identity: each call gets a fresh
    /// backend thread under a shared pseudo-project and the binding store is
    /// never consulted.
    #[instrument(skip(self))]
    pub async fn elaborate(&self, channel: &str, conversation_ts: &str) -> Void {
        self.chat.post_message(channel, conversation_ts, ELABORATE_ACK).await.context("failed to post initial message")?;

        let replies = self.chat.thread_replies(channel, conversation_ts).await.context("failed to get thread messages")?;
        let message = question_message(&replies)?.to_string();

        let thread_handle = self.llm.create_thread(ELABORATE_PROJECT, "").await.context("failed to create backend thread")?;

        let response = match self.llm.elaborate(&thread_handle, &message).await {
            Ok(response) => response,
            Err(e) => {
                let _ = self.chat.post_message(channel, conversation_ts, &format!("Failed to generate a response: {e}")).await;
                return Err(e.context("failed to generate response"));
            }
        };

        self.chat.post_message(channel, conversation_ts, &response).await.context("failed to send response")
    }

    /// Add the triggering author's last messages to a project/version index.
    #[instrument(skip(self))]
    pub async fn inject(&self, channel: &str, conversation_ts: &str, project: &str, version: &str) -> Void {
        let replies = self.chat.thread_replies(channel, conversation_ts).await.context("failed to get thread messages")?;
        let text = contiguous_author_run(&replies)?;

        if let Err(e) = self.llm.inject(project, version, &text).await {
            let _ = self.chat.post_message(channel, conversation_ts, &format!("Failed to inject the document: {e}")).await;
            return Err(e.context("failed to inject messages"));
        }

        self.chat
            .post_message(channel, conversation_ts, &format!("Document injected for project {project} on version {version}"))
            .await
            .context("failed to send response")
    }

    /// Get the backend thread handle for a conversation, creating it on first use.
    ///
    /// Two workers can race here when two mentions land in the same new
    /// conversation at once. Both may create a backend thread, but the store
    /// accepts only one binding; the loser discards its local handle and
    /// re-fetches the winner's, so exactly one backend thread ever carries
    /// the conversation.
    async fn provision_thread(&self, conversation_ts: &str, project: &str, version: &str) -> Res<String> {
        if let Some(handle) = self.db.get_binding(conversation_ts).await.context("failed to get thread binding")? {
            return Ok(handle);
        }

        let handle = self.llm.create_thread(project, version).await.context("failed to create backend thread")?;

        match self.db.create_binding(conversation_ts, &handle).await {
            Ok(()) => Ok(handle),
            Err(e) if e.downcast_ref::<BindingExists>().is_some() => {
                debug!("Lost the provisioning race for conversation {}; reusing the existing binding", conversation_ts);

                self.db
                    .get_binding(conversation_ts)
                    .await
                    .context("failed to re-fetch thread binding")?
                    .ok_or_else(|| anyhow::anyhow!("thread binding disappeared after a duplicate create"))
            }
            Err(e) => Err(e.context("failed to persist thread binding")),
        }
    }
}

// Transcript heuristics.
//
// The platform echoes the bot's acknowledgement and the triggering mention
// into the thread, so the user's question is a fixed offset from the end.

/// The full thread transcript, one message per line.
fn transcript(replies: &[ThreadMessage]) -> String {
    replies.iter().map(|message| format!("{}\n", message.text)).collect()
}

/// The user's question: the message two positions before the most recent one
/// (skipping the just-posted ack and the mention that triggered us).
fn question_message(replies: &[ThreadMessage]) -> Res<&str> {
    if replies.len() < 3 {
        return Err(anyhow::anyhow!("unexpected number of messages in thread ({})", replies.len()));
    }

    Ok(&replies[replies.len() - 3].text)
}

/// The contiguous run of messages written by the last human author, oldest
/// first, walking backward from just before the triggering mention until the
/// author changes. The thread's parent message is never included, and a
/// leading elaborate ack caught in the run is stripped.
fn contiguous_author_run(replies: &[ThreadMessage]) -> Res<String> {
    if replies.len() < 2 {
        return Err(anyhow::anyhow!("unexpected number of messages in thread ({})", replies.len()));
    }

    let author = &replies[replies.len() - 2].user;

    let mut text = String::new();
    for message in replies[1..replies.len() - 1].iter().rev() {
        if &message.user != author {
            break;
        }

        text.insert_str(0, &message.text);
    }

    let text = text.strip_prefix(ELABORATE_ACK).unwrap_or(&text);

    Ok(text.to_string())
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    fn message(user: &str, text: &str) -> ThreadMessage {
        ThreadMessage {
            user: user.into(),
            text: text.into(),
        }
    }

    #[test]
    fn transcript_joins_all_messages() {
        let replies = vec![message("U1", "first"), message("U2", "second")];

        assert_eq!(transcript(&replies), "first\nsecond\n");
    }

    #[test]
    fn question_message_skips_the_ack_and_the_mention() {
        let replies = vec![
            message("U1", "how do I configure sriov?"),
            message("U1", "<@UBOT> answer sriov 4.16"),
            message("UBOT", "Searching for answer..."),
        ];

        assert_eq!(question_message(&replies).unwrap(), "how do I configure sriov?");
    }

    #[test]
    fn question_message_rejects_short_transcripts() {
        let replies = vec![message("U1", "only"), message("U1", "two")];

        let err = question_message(&replies).unwrap_err();
        assert!(err.to_string().contains("unexpected number of messages"));
    }

    #[test]
    fn contiguous_author_run_collects_the_last_authors_messages() {
        let replies = vec![
            message("U1", "parent"),
            message("U2", "other author"),
            message("U3", "part one. "),
            message("U3", "part two."),
            message("U3", "<@UBOT> inject sriov 4.16"),
        ];

        // Walks back from just before the mention, stopping at U2.
        assert_eq!(contiguous_author_run(&replies).unwrap(), "part one. part two.");
    }

    #[test]
    fn contiguous_author_run_never_includes_the_parent() {
        let replies = vec![message("U1", "parent"), message("U1", "body"), message("U1", "<@UBOT> inject sriov 4.16")];

        assert_eq!(contiguous_author_run(&replies).unwrap(), "body");
    }

    #[test]
    fn contiguous_author_run_strips_the_elaborate_ack() {
        // Injecting a previous elaborate result picks up the bot's own ack,
        // which must not end up in the index.
        let replies = vec![
            message("U1", "parent"),
            message("UBOT", "Elaborating..."),
            message("UBOT", "the elaborated text"),
            message("U1", "<@UBOT> inject sriov 4.16"),
        ];

        assert_eq!(contiguous_author_run(&replies).unwrap(), "the elaborated text");
    }

    #[test]
    fn contiguous_author_run_rejects_short_transcripts() {
        let replies = vec![message("U1", "only")];

        assert!(contiguous_author_run(&replies).is_err());
    }
}
