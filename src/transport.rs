use async_trait::async_trait;

use crate::error::TransportError;
use crate::session::StepId;

/// Action name the transport maps to "start a case inquiry".
pub const ACTION_START: &str = "start";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Free text typed by the user.
    Text(String),
    /// An explicit action (button tap, command) by name.
    Action(String),
}

/// One inbound event from the messaging transport. Action callbacks carry
/// the step they were rendered for, so the engine can drop stale or
/// duplicate deliveries without touching the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub user_id: String,
    pub kind: EventKind,
    pub expected_step: Option<StepId>,
}

impl InboundEvent {
    pub fn text(user_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            kind: EventKind::Text(body.into()),
            expected_step: None,
        }
    }

    pub fn action(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            kind: EventKind::Action(name.into()),
            expected_step: None,
        }
    }

    pub fn expecting(mut self, step: StepId) -> Self {
        self.expected_step = Some(step);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    Text(String),
    Media { caption: String, url: String },
}

/// The only thing the core needs from the messaging provider.
#[async_trait]
pub trait ChannelTransport: Send + Sync {
    async fn send(&self, user_id: &str, message: OutboundMessage) -> Result<(), TransportError>;
}

/// Console transport for local runs: prints outbound messages to stdout.
#[derive(Debug, Default)]
pub struct ConsoleTransport;

#[async_trait]
impl ChannelTransport for ConsoleTransport {
    async fn send(&self, user_id: &str, message: OutboundMessage) -> Result<(), TransportError> {
        match message {
            OutboundMessage::Text(body) => println!("[{user_id}] {body}"),
            OutboundMessage::Media { caption, url } => println!("[{user_id}] {caption}\n    {url}"),
        }
        Ok(())
    }
}
