use thiserror::Error;

/// Recoverable input failure. Carries the user-facing reason so the step
/// can re-prompt without inventing wording at the call site.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// Failures of the external case-records service, classified at the client
/// boundary. Callers never see raw transport errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordsError {
    #[error("no records found")]
    NotFound,
    #[error("records service unreachable: {0}")]
    Connection(String),
    #[error("unexpected response shape: {0}")]
    InvalidResponseShape(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    #[error("no cases to report")]
    EmptyInput,
    #[error("report rendering failed: {0}")]
    Render(String),
    #[error("artifact storage failed: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("session persistence failed: {0}")]
pub struct SessionStoreError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transport send failed: {0}")]
pub struct TransportError(pub String);

/// Umbrella error surfaced by the flow engine. Step handlers classify
/// recoverable failures into transitions themselves; anything that reaches
/// the engine as an `Err` is fatal for the current event only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error(transparent)]
    Records(#[from] RecordsError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    Session(#[from] SessionStoreError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("internal flow error: {0}")]
    Internal(String),
}

/// How a failure affects the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Re-prompt the current step, session unchanged.
    RetryStep,
    /// Valid id but nothing found: tell the user and re-prompt for the id.
    EmptyResult,
    /// External service unreachable: tell the user and re-prompt for the id.
    ConnectionRetry,
    /// Offer the numbered alternatives menu (retry / new flow / human).
    ErrorOptions,
    /// Fatal for this event: no further side effects.
    Fatal,
}

/// Classification table for the lookup phase. The report-generation phase
/// maps every failure to `ErrorOptions` so the session always lands on a
/// step with a way forward.
pub fn classify(error: &FlowError) -> Classification {
    match error {
        FlowError::Records(RecordsError::NotFound) => Classification::EmptyResult,
        FlowError::Records(RecordsError::Connection(_)) => Classification::ConnectionRetry,
        FlowError::Records(RecordsError::InvalidResponseShape(_)) => Classification::ConnectionRetry,
        FlowError::Report(_) => Classification::ErrorOptions,
        FlowError::Session(_) => Classification::Fatal,
        FlowError::Transport(_) => Classification::Fatal,
        FlowError::Internal(_) => Classification::Fatal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_failures_classify_per_table() {
        assert_eq!(
            classify(&FlowError::Records(RecordsError::NotFound)),
            Classification::EmptyResult
        );
        assert_eq!(
            classify(&FlowError::Records(RecordsError::Connection("timeout".into()))),
            Classification::ConnectionRetry
        );
        assert_eq!(
            classify(&FlowError::Records(RecordsError::InvalidResponseShape(
                "missing list".into()
            ))),
            Classification::ConnectionRetry
        );
    }

    #[test]
    fn report_failures_offer_alternatives() {
        assert_eq!(
            classify(&FlowError::Report(ReportError::EmptyInput)),
            Classification::ErrorOptions
        );
        assert_eq!(
            classify(&FlowError::Report(ReportError::Render("boom".into()))),
            Classification::ErrorOptions
        );
    }

    #[test]
    fn persistence_failure_is_fatal() {
        assert_eq!(
            classify(&FlowError::Session(SessionStoreError("disk full".into()))),
            Classification::Fatal
        );
    }
}
