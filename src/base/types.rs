use serde::{Deserialize, Serialize};

pub type Err = anyhow::Error;
pub type Res<T> = Result<T, Err>;
pub type Void = Res<()>;

/// An app-mention event, reduced to the fields the bot acts on.
///
/// The Slack layer converts the platform event into this owned form so the
/// dispatcher, pool, and agent never touch transport types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentionEvent {
    /// Channel the mention was posted in.
    pub channel: String,
    /// Timestamp of the mention message itself.
    pub ts: String,
    /// Timestamp of the parent thread, when the mention was posted inside one.
    pub thread_ts: Option<String>,
    /// User that mentioned the bot.
    pub user: String,
    /// Raw message text, including the mention marker.
    pub text: String,
}

impl MentionEvent {
    /// The conversation this event belongs to.
    ///
    /// A mention inside a thread belongs to that thread; a top-level mention
    /// starts a new thread keyed by its own timestamp. Resolved once per
    /// event, before any backend call, and used as the idempotency key for
    /// backend-thread provisioning.
    pub fn conversation_ts(&self) -> &str {
        self.thread_ts.as_deref().unwrap_or(&self.ts)
    }
}

/// One message of a thread transcript, as returned by the chat client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadMessage {
    /// Author user ID.
    pub user: String,
    /// Message text.
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mention(ts: &str, thread_ts: Option<&str>) -> MentionEvent {
        MentionEvent {
            channel: "C123".into(),
            ts: ts.into(),
            thread_ts: thread_ts.map(Into::into),
            user: "U123".into(),
            text: "<@BOT> answer sriov 4.16".into(),
        }
    }

    #[test]
    fn conversation_ts_prefers_existing_thread() {
        let event = mention("1700000001.000100", Some("1700000000.000001"));
        assert_eq!(event.conversation_ts(), "1700000000.000001");
    }

    #[test]
    fn conversation_ts_falls_back_to_own_timestamp() {
        let event = mention("1700000001.000100", None);
        assert_eq!(event.conversation_ts(), "1700000001.000100");
    }
}
