use std::sync::Arc;

use async_trait::async_trait;

use crate::error::FlowError;
use crate::records::RecordsClient;
use crate::report::ReportOrchestrator;
use crate::session::{FieldValue, Session, StepId};
use crate::transport::OutboundMessage;

pub mod engine;
pub mod steps;

pub use engine::FlowEngine;

pub type Fields = Vec<(String, FieldValue)>;

/// The outcome of a step's input handler. Every handler execution yields
/// exactly one of these; the engine is the only place that applies them.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Record captured data, move forward, run the next step's entry action.
    Advance(StepId, Fields),
    /// Re-render the current step's prompt, optionally with a corrective
    /// message; `current_step` unchanged.
    Retry(Option<String>),
    /// Move to an arbitrary step. This is the explicit edge for "back to
    /// menu" and for skips that used to be side-channel injections.
    Jump(StepId, Fields),
    /// End the interaction; the session returns to `Idle`.
    Terminal(String),
    /// Guarded no-op: nothing sent, nothing changed.
    Stay,
}

/// What a step does when it becomes current: messages to send, plus an
/// optional chained transition so transient steps (lookup, report
/// generation) can move on without waiting for input.
#[derive(Debug)]
pub struct EntryOutcome {
    pub messages: Vec<OutboundMessage>,
    pub next: Option<Transition>,
}

impl EntryOutcome {
    pub fn silent() -> Self {
        Self { messages: Vec::new(), next: None }
    }

    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            messages: vec![OutboundMessage::Text(text.into())],
            next: None,
        }
    }

    pub fn message(message: OutboundMessage) -> Self {
        Self { messages: vec![message], next: None }
    }

    pub fn then(mut self, transition: Transition) -> Self {
        self.next = Some(transition);
        self
    }
}

/// Collaborators a step may call. Pure steps ignore it.
pub struct StepContext {
    pub records: Arc<dyn RecordsClient>,
    pub reports: Arc<ReportOrchestrator>,
}

/// A named unit of the conversation state machine.
#[async_trait]
pub trait FlowStep: Send + Sync {
    fn id(&self) -> StepId;

    /// Entry action, run when the step becomes current.
    async fn on_enter(
        &self,
        session: &Session,
        ctx: &StepContext,
    ) -> Result<EntryOutcome, FlowError>;

    /// Input handler for the captured raw text.
    async fn on_input(
        &self,
        raw: &str,
        session: &Session,
        ctx: &StepContext,
    ) -> Result<Transition, FlowError>;
}
