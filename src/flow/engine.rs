use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::error::{FlowError, TransportError};
use crate::flow::{EntryOutcome, FlowStep, StepContext, Transition};
use crate::session::{Session, SessionStore, StepId};
use crate::transport::{ChannelTransport, EventKind, InboundEvent, OutboundMessage, ACTION_START};

// A chained entry action could in principle loop; cap the hops so a wiring
// mistake surfaces as an error instead of a spin.
const MAX_TRANSITION_HOPS: usize = 8;

/// Dispatches inbound events to the step named by the session, applies the
/// returned transition and persists the session before anything is sent.
pub struct FlowEngine {
    steps: HashMap<StepId, Arc<dyn FlowStep>>,
    sessions: Arc<dyn SessionStore>,
    transport: Arc<dyn ChannelTransport>,
    ctx: StepContext,
    user_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl FlowEngine {
    pub fn new(
        steps: Vec<Arc<dyn FlowStep>>,
        sessions: Arc<dyn SessionStore>,
        transport: Arc<dyn ChannelTransport>,
        ctx: StepContext,
    ) -> Self {
        let steps = steps.into_iter().map(|s| (s.id(), s)).collect();
        Self {
            steps,
            sessions,
            transport,
            ctx,
            user_locks: DashMap::new(),
        }
    }

    /// Handles one inbound event end to end. Events for the same user are
    /// serialized in arrival order; events for different users run
    /// concurrently.
    pub async fn handle_event(&self, event: InboundEvent) -> Result<(), FlowError> {
        let lock = self
            .user_locks
            .entry(event.user_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock.lock().await;
        let result = self.dispatch(&event).await;
        drop(guard);

        // Sessions expire via TTL; the lock entry must not outlive them.
        // Two strong refs means the map and this handler are the only
        // holders, so no other event for this user is queued or running.
        self.user_locks
            .remove_if(&event.user_id, |_, entry| Arc::strong_count(entry) == 2);
        result
    }

    async fn dispatch(&self, event: &InboundEvent) -> Result<(), FlowError> {
        let mut session = self.sessions.get(&event.user_id).await?;

        // Stale or duplicate callback: the step it was rendered for is no
        // longer current. Dropping it is the cancellation mechanism for
        // abandoned sub-flows.
        if let Some(expected) = event.expected_step {
            if expected != session.current_step {
                debug!(
                    user = %event.user_id,
                    ?expected,
                    current = ?session.current_step,
                    "dropping stale event"
                );
                return Ok(());
            }
        }

        let transition = match (&event.kind, session.current_step) {
            (EventKind::Action(name), StepId::Idle) if name == ACTION_START => {
                Transition::Advance(StepId::AwaitingDocumentType, Vec::new())
            }
            (EventKind::Action(name), step) => {
                debug!(user = %event.user_id, action = %name, ?step, "ignoring action");
                Transition::Stay
            }
            (EventKind::Text(_), StepId::Idle) => Transition::Stay,
            (EventKind::Text(body), step) => {
                let handler = self.step(step)?;
                handler.on_input(body, &session, &self.ctx).await?
            }
        };

        let mut outbox = Vec::new();
        self.apply(&mut session, transition, &mut outbox).await?;

        // Send-after-persist: a confirmed send against state that failed
        // to persist would be worse than a dropped prompt.
        self.sessions.put(session).await?;
        for message in outbox {
            self.transport
                .send(&event.user_id, message)
                .await
                .map_err(|e| {
                    error!(user = %event.user_id, error = %e, "outbound send failed");
                    TransportError(e.to_string())
                })?;
        }
        Ok(())
    }

    fn step(&self, id: StepId) -> Result<&Arc<dyn FlowStep>, FlowError> {
        self.steps
            .get(&id)
            .ok_or_else(|| FlowError::Internal(format!("no step registered for {id:?}")))
    }

    /// Applies a transition, following entry actions of entered steps until
    /// the machine comes to rest on a step awaiting input.
    async fn apply(
        &self,
        session: &mut Session,
        mut transition: Transition,
        outbox: &mut Vec<OutboundMessage>,
    ) -> Result<(), FlowError> {
        for _ in 0..MAX_TRANSITION_HOPS {
            match transition {
                Transition::Stay => return Ok(()),
                Transition::Retry(Some(prompt)) => {
                    outbox.push(OutboundMessage::Text(prompt));
                    return Ok(());
                }
                Transition::Retry(None) => {
                    let step = self.step(session.current_step)?;
                    let outcome = step.on_enter(session, &self.ctx).await?;
                    match self.collect(outcome, outbox) {
                        Some(next) => transition = next,
                        None => return Ok(()),
                    }
                }
                Transition::Terminal(message) => {
                    outbox.push(OutboundMessage::Text(message));
                    session.reset();
                    return Ok(());
                }
                Transition::Advance(next, fields) | Transition::Jump(next, fields) => {
                    session.merge(fields);
                    session.current_step = next;
                    let step = self.step(next)?;
                    let outcome = step.on_enter(session, &self.ctx).await?;
                    match self.collect(outcome, outbox) {
                        Some(chained) => transition = chained,
                        None => return Ok(()),
                    }
                }
            }
        }
        Err(FlowError::Internal(format!(
            "transition chain exceeded {MAX_TRANSITION_HOPS} hops at {:?}",
            session.current_step
        )))
    }

    fn collect(
        &self,
        outcome: EntryOutcome,
        outbox: &mut Vec<OutboundMessage>,
    ) -> Option<Transition> {
        outbox.extend(outcome.messages);
        outcome.next
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use url::Url;

    use super::*;
    use crate::error::RecordsError;
    use crate::flow::steps;
    use crate::records::model::{CaseRecord, ClientProcesses};
    use crate::records::RecordsClient;
    use crate::report::{HtmlRenderer, MemoryArtifactStore, ReportOrchestrator};
    use crate::session::InMemorySessionStore;

    struct NoRecords;

    #[async_trait]
    impl RecordsClient for NoRecords {
        async fn find_by_document(&self, _: &str) -> Result<ClientProcesses, RecordsError> {
            Err(RecordsError::NotFound)
        }

        async fn find_detail_by_code(&self, _: &str) -> Result<CaseRecord, RecordsError> {
            Err(RecordsError::NotFound)
        }

        async fn find_all_with_detail(&self, _: &str) -> Result<ClientProcesses, RecordsError> {
            Err(RecordsError::NotFound)
        }
    }

    struct SilentTransport;

    #[async_trait]
    impl ChannelTransport for SilentTransport {
        async fn send(&self, _: &str, _: OutboundMessage) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn engine() -> FlowEngine {
        let reports = ReportOrchestrator::new(
            Arc::new(HtmlRenderer),
            Arc::new(MemoryArtifactStore::default()),
            Url::parse("https://files.example.com/reports/").unwrap(),
            Duration::from_secs(60),
        );
        FlowEngine::new(
            steps::builtin(),
            InMemorySessionStore::new(Duration::from_secs(60)),
            Arc::new(SilentTransport),
            StepContext {
                records: Arc::new(NoRecords),
                reports: Arc::new(reports),
            },
        )
    }

    #[tokio::test]
    async fn lock_entries_are_released_after_handling() {
        let engine = engine();

        engine
            .handle_event(InboundEvent::action("user-1", ACTION_START))
            .await
            .unwrap();
        engine
            .handle_event(InboundEvent::text("user-1", "1"))
            .await
            .unwrap();
        engine
            .handle_event(InboundEvent::text("user-2", "hello"))
            .await
            .unwrap();

        assert!(engine.user_locks.is_empty());
    }
}
