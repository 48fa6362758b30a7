//! Chat service integration for answer-bot.
//!
//! This module provides functionality for interacting with chat platforms like Slack:
//! - Receiving app-mention events and forwarding them to the dispatcher
//! - Posting replies into conversation threads
//! - Retrieving thread transcripts
//!
//! The `GenericChatClient` trait can be implemented for different chat
//! services; the default implementation speaks Slack Socket Mode.

use crate::base::{
    config::Config,
    types::{MentionEvent, Res, ThreadMessage, Void},
};
use async_trait::async_trait;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use slack_morphism::{errors::SlackClientError, events::SlackAppMentionEvent, prelude::*};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, instrument, warn};

use std::{ops::Deref, sync::Arc};

use super::{ChatClient, GenericChatClient};

// Type aliases.

type FullClient = slack_morphism::SlackClient<SlackClientHyperConnector<HttpsConnector<HttpConnector>>>;

// Extra methods on `ChatClient` applied by the slack implementation.

impl ChatClient {
    /// Creates a new Slack chat client.
    pub async fn slack(config: &Config) -> Res<Self> {
        let client = SlackChatClient::new(config).await?;
        Ok(Self { inner: Arc::new(client) })
    }
}

// Structs.

/// User state for the slack socket client.
struct SlackUserState {
    mentions: UnboundedSender<MentionEvent>,
    bot_user_id: String,
}

/// Slack client implementation.
#[derive(Clone)]
struct SlackChatClient {
    pub app_token: SlackApiToken,
    pub bot_token: SlackApiToken,
    pub bot_user_id: String,
    pub client: Arc<FullClient>,
}

impl Deref for SlackChatClient {
    type Target = FullClient;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

impl SlackChatClient {
    /// Create a new Slack chat client.
    #[instrument(name = "SlackChatClient::new", skip_all)]
    pub async fn new(config: &Config) -> Res<Self> {
        // Initialize tokens.

        let app_token = SlackApiToken::new(SlackApiTokenValue(config.slack_app_token.clone()));
        let bot_token = SlackApiToken::new(SlackApiTokenValue(config.slack_bot_token.clone()));

        // Initialize the Slack client.

        let https_connector = HttpsConnector::<HttpConnector>::builder().with_native_roots()?.https_only().enable_all_versions().build();
        let connector = SlackClientHyperConnector::with_connector(https_connector);
        let client = Arc::new(slack_morphism::SlackClient::new(connector));

        // Get the bot's user ID.

        let session = client.open_session(&bot_token);
        let bot_user = session.auth_test().await?;
        let bot_user_id = bot_user.user_id.0;

        info!("Slack bot user ID: {}", bot_user_id);

        Ok(Self {
            app_token,
            bot_token,
            bot_user_id,
            client,
        })
    }
}

/// Reduce a Slack app-mention event to the fields the bot acts on.
fn to_mention_event(event: SlackAppMentionEvent) -> MentionEvent {
    MentionEvent {
        channel: event.channel.0,
        ts: event.origin.ts.0,
        thread_ts: event.origin.thread_ts.map(|ts| ts.0),
        user: event.user.0,
        text: event.content.text.unwrap_or_default(),
    }
}

#[async_trait]
impl GenericChatClient for SlackChatClient {
    fn bot_user_id(&self) -> &str {
        &self.bot_user_id
    }

    async fn start(&self, mentions: UnboundedSender<MentionEvent>) -> Void {
        // Initialize the socket mode listener.

        let socket_mode_callbacks = SlackSocketModeListenerCallbacks::new()
            .with_command_events(handle_command_event)
            .with_interaction_events(handle_interaction_event)
            .with_push_events(handle_push_event);

        // Initialize the socket mode listener environment.

        let listener_environment = Arc::new(SlackClientEventsListenerEnvironment::new(self.client.clone()).with_user_state(SlackUserState {
            mentions,
            bot_user_id: self.bot_user_id.clone(),
        }));

        let socket_mode_listener = Arc::new(SlackClientSocketModeListener::new(
            &SlackClientSocketModeConfig::new(),
            listener_environment.clone(),
            socket_mode_callbacks,
        ));

        // Register an app token to listen for events,
        socket_mode_listener.listen_for(&self.app_token).await?;

        // Start WS connections calling Slack API to get WS url for the token,
        // and wait for Ctrl-C to shutdown.
        socket_mode_listener.serve().await;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn post_message(&self, channel_id: &str, thread_ts: &str, text: &str) -> Void {
        let message = SlackMessageContent::new().with_text(text.to_string());

        let request = SlackApiChatPostMessageRequest::new(SlackChannelId(channel_id.to_string()), message)
            .with_as_user(true)
            .with_thread_ts(SlackTs(thread_ts.to_string()))
            .with_link_names(true);

        let session = self.client.open_session(&self.bot_token);

        let _ = session.chat_post_message(&request).await.map_err(|e| anyhow::anyhow!("Failed to post message: {}", e))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn thread_replies(&self, channel_id: &str, thread_ts: &str) -> Res<Vec<ThreadMessage>> {
        let request = SlackApiConversationsRepliesRequest::new(SlackChannelId(channel_id.to_string()), SlackTs(thread_ts.to_string()));
        let session = self.client.open_session(&self.bot_token);

        let response = session.conversations_replies(&request).await;

        let response = if let Err(e) = &response
            && let SlackClientError::ApiError(ae) = e
            && ae.code == "thread_not_found"
        {
            // If the thread is not found (due to this being a top-level message), we can just return an empty transcript.
            return Ok(Vec::new());
        } else {
            response?
        };

        let messages = response
            .messages
            .into_iter()
            .map(|message| ThreadMessage {
                user: message.sender.user.map(|u| u.0).unwrap_or_default(),
                text: message.content.text.unwrap_or_default(),
            })
            .collect();

        Ok(messages)
    }
}

// Socket mode listener callbacks for Slack.

/// Handles command events from Slack.
async fn handle_command_event(
    event: SlackCommandEvent,
    _client: Arc<SlackHyperClient>,
    _states: SlackClientEventsUserState,
) -> Result<SlackCommandEventResponse, Box<dyn std::error::Error + Send + Sync>> {
    warn!("[COMMAND] {:#?}", event);
    Ok(SlackCommandEventResponse::new(SlackMessageContent::new().with_text("No app commands are currently supported.".into())))
}

/// Handles interaction events from Slack.
async fn handle_interaction_event(event: SlackInteractionEvent, _client: Arc<SlackHyperClient>, _states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    warn!("[INTERACTION] {:#?}", event);
    Ok(())
}

/// Handles push events from Slack.
///
/// App mentions are handed to the dispatcher; everything else is ignored so
/// a slow worker never stalls the socket loop.
#[instrument(skip_all)]
async fn handle_push_event(event_callback: SlackPushEventCallback, _client: Arc<SlackHyperClient>, states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let event = event_callback.event;
    let states = states.read().await;
    let user_state = states.get_user_state::<SlackUserState>().ok_or(anyhow::anyhow!("Failed to get user state"))?;

    match event {
        SlackEventCallbackBody::AppMention(slack_app_mention_event) => {
            info!("Received app mention event ...");

            if user_state.mentions.send(to_mention_event(slack_app_mention_event)).is_err() {
                warn!("Dispatcher is gone; discarding app mention event.");
            }
        }
        SlackEventCallbackBody::Message(slack_message_event) => {
            // The bot only reacts to explicit mentions; plain messages are ignored.
            let text = slack_message_event.content.as_ref().and_then(|c| c.text.as_deref()).unwrap_or_default();
            if text.contains(&user_state.bot_user_id) {
                warn!("Skipping message event that mentions the bot; the app mention handler covers it.");
            }
        }
        _ => {
            warn!("Received unhandled push event.")
        }
    }

    Ok(())
}
