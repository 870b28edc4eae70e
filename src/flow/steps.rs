//! The conversation steps. Menu steps resolve numeric replies through the
//! menu builder before transitioning; capture steps apply their grammar
//! and re-prompt on invalid input without losing captured data. Transient
//! steps (lookup, report generation) do their work in the entry action
//! and chain straight to the next step.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::error::{classify, Classification, FlowError};
use crate::flow::{EntryOutcome, Fields, FlowStep, StepContext, Transition};
use crate::menu::{
    document_type_menu, process_menu, report_error_menu, report_success_menu, MenuOption,
};
use crate::records::model::{CaseRecord, ClientProcesses};
use crate::session::{
    FieldValue, Session, StepId, FIELD_DOCUMENT_NUMBER, FIELD_DOCUMENT_TYPE, FIELD_PROCESSES,
};
use crate::transport::OutboundMessage;
use crate::util::render_handlebars;
use crate::validate::{validate_document_number, validate_menu_choice};

const WELCOME: &str =
    "Hello! I can look up legal cases linked to your documents and send you a summary report.";
const ASK_DOCUMENT_NUMBER: &str =
    "Please send the document number, digits only (6 to 15).";
const NO_PROCESSES: &str =
    "We couldn't find any processes for that document. You can try another document number.";
const SERVICE_UNAVAILABLE: &str =
    "We couldn't reach the case-records service right now. Let's try that document number again.";

/// Every step of the conversation, ready for engine registration.
pub fn builtin() -> Vec<Arc<dyn FlowStep>> {
    vec![
        Arc::new(IdleStep),
        Arc::new(AwaitingDocumentType),
        Arc::new(AwaitingDocumentNumber),
        Arc::new(LookupInProgress),
        Arc::new(ProcessSelection),
        Arc::new(ReportGenerate),
        Arc::new(ReportOptionsSuccess),
        Arc::new(ReportOptionsError),
    ]
}

fn document_number_of(session: &Session) -> Result<String, FlowError> {
    session
        .document_number()
        .map(str::to_string)
        .ok_or_else(|| FlowError::Internal("no document number captured".into()))
}

fn processes_of(session: &Session) -> Result<&ClientProcesses, FlowError> {
    session
        .processes()
        .ok_or_else(|| FlowError::Internal("no processes cached for selection".into()))
}

fn format_case_list(header: &str, cases: &[CaseRecord]) -> String {
    let mut out = String::from(header);
    for case in cases {
        out.push_str(&format!("\n• {} — {}", case.internal_code, case.state));
        if let Some(process_type) = &case.process_type {
            out.push_str(&format!(" ({process_type})"));
        }
        if let Some(updated) = case.updated_at {
            out.push_str(&format!(", last update {}", updated.format("%Y-%m-%d")));
        }
    }
    out
}

fn invalid_choice(reason: &str, prompt: &str) -> Transition {
    Transition::Retry(Some(format!("{reason}\n\n{prompt}")))
}

/// Waits for the explicit start action; free text is ignored.
pub struct IdleStep;

#[async_trait]
impl FlowStep for IdleStep {
    fn id(&self) -> StepId {
        StepId::Idle
    }

    async fn on_enter(&self, _: &Session, _: &StepContext) -> Result<EntryOutcome, FlowError> {
        Ok(EntryOutcome::silent())
    }

    async fn on_input(&self, _: &str, _: &Session, _: &StepContext) -> Result<Transition, FlowError> {
        Ok(Transition::Stay)
    }
}

pub struct AwaitingDocumentType;

#[async_trait]
impl FlowStep for AwaitingDocumentType {
    fn id(&self) -> StepId {
        StepId::AwaitingDocumentType
    }

    async fn on_enter(&self, session: &Session, _: &StepContext) -> Result<EntryOutcome, FlowError> {
        let welcome = render_handlebars(WELCOME, session.fields());
        Ok(EntryOutcome::prompt(format!(
            "{welcome}\n\n{}",
            document_type_menu().prompt
        )))
    }

    async fn on_input(
        &self,
        raw: &str,
        _: &Session,
        _: &StepContext,
    ) -> Result<Transition, FlowError> {
        let menu = document_type_menu();
        let index = match validate_menu_choice(raw, menu.len()) {
            Ok(index) => index,
            Err(reason) => return Ok(invalid_choice(&reason.0, &menu.prompt)),
        };
        let document_type = match menu.resolve(index) {
            Some(MenuOption::PersonDocument) => "person",
            Some(MenuOption::CompanyDocument) => "company",
            _ => return Ok(invalid_choice("That option isn't available.", &menu.prompt)),
        };
        Ok(Transition::Advance(
            StepId::AwaitingDocumentNumber,
            vec![(
                FIELD_DOCUMENT_TYPE.to_string(),
                FieldValue::String(document_type.into()),
            )],
        ))
    }
}

pub struct AwaitingDocumentNumber;

#[async_trait]
impl FlowStep for AwaitingDocumentNumber {
    fn id(&self) -> StepId {
        StepId::AwaitingDocumentNumber
    }

    async fn on_enter(&self, _: &Session, _: &StepContext) -> Result<EntryOutcome, FlowError> {
        Ok(EntryOutcome::prompt(ASK_DOCUMENT_NUMBER))
    }

    async fn on_input(
        &self,
        raw: &str,
        _: &Session,
        _: &StepContext,
    ) -> Result<Transition, FlowError> {
        match validate_document_number(raw) {
            Ok(document_number) => Ok(Transition::Advance(
                StepId::LookupInProgress,
                vec![(
                    FIELD_DOCUMENT_NUMBER.to_string(),
                    FieldValue::String(document_number),
                )],
            )),
            Err(reason) => Ok(Transition::Retry(Some(reason.0))),
        }
    }
}

/// Transient: queries the records service on entry and chains to the
/// selection menu, or back to the capture step on failure. The cached
/// `ClientProcesses` is recomputed here every time the document changes.
pub struct LookupInProgress;

#[async_trait]
impl FlowStep for LookupInProgress {
    fn id(&self) -> StepId {
        StepId::LookupInProgress
    }

    async fn on_enter(
        &self,
        session: &Session,
        ctx: &StepContext,
    ) -> Result<EntryOutcome, FlowError> {
        let document = document_number_of(session)?;
        match ctx.records.find_by_document(&document).await {
            Ok(processes) if processes.total() == 0 => Ok(EntryOutcome::prompt(NO_PROCESSES)
                .then(Transition::Jump(StepId::AwaitingDocumentNumber, Vec::new()))),
            Ok(processes) => {
                let fields: Fields = vec![(
                    FIELD_PROCESSES.to_string(),
                    FieldValue::Processes(processes),
                )];
                Ok(EntryOutcome::silent().then(Transition::Jump(StepId::ProcessSelection, fields)))
            }
            Err(e) => {
                let failure = FlowError::from(e);
                match classify(&failure) {
                    Classification::EmptyResult => Ok(EntryOutcome::prompt(NO_PROCESSES)
                        .then(Transition::Jump(StepId::AwaitingDocumentNumber, Vec::new()))),
                    Classification::ConnectionRetry => Ok(EntryOutcome::prompt(SERVICE_UNAVAILABLE)
                        .then(Transition::Jump(StepId::AwaitingDocumentNumber, Vec::new()))),
                    _ => Err(failure),
                }
            }
        }
    }

    async fn on_input(&self, _: &str, _: &Session, _: &StepContext) -> Result<Transition, FlowError> {
        Ok(Transition::Stay)
    }
}

pub struct ProcessSelection;

#[async_trait]
impl FlowStep for ProcessSelection {
    fn id(&self) -> StepId {
        StepId::ProcessSelection
    }

    async fn on_enter(&self, session: &Session, _: &StepContext) -> Result<EntryOutcome, FlowError> {
        let processes = processes_of(session)?;
        let menu = process_menu(processes.total_active(), processes.total_finalized());
        Ok(EntryOutcome::prompt(menu.prompt))
    }

    async fn on_input(
        &self,
        raw: &str,
        session: &Session,
        _: &StepContext,
    ) -> Result<Transition, FlowError> {
        let processes = processes_of(session)?;
        // Rebuilt from the same counts that rendered the prompt, so the
        // numeric reply resolves to what the user actually saw.
        let menu = process_menu(processes.total_active(), processes.total_finalized());
        let index = match validate_menu_choice(raw, menu.len()) {
            Ok(index) => index,
            Err(reason) => return Ok(invalid_choice(&reason.0, &menu.prompt)),
        };
        match menu.resolve(index) {
            Some(MenuOption::ActiveProcesses) => Ok(Transition::Retry(Some(format!(
                "{}\n\n{}",
                format_case_list("Your active processes:", &processes.active),
                menu.prompt
            )))),
            Some(MenuOption::FinalizedProcesses) => Ok(Transition::Retry(Some(format!(
                "{}\n\n{}",
                format_case_list("Your finalized processes:", &processes.finalized),
                menu.prompt
            )))),
            Some(MenuOption::SummaryReport) => {
                Ok(Transition::Advance(StepId::ReportGenerate, Vec::new()))
            }
            _ => Ok(invalid_choice("That option isn't available.", &menu.prompt)),
        }
    }
}

/// Transient: fetches full detail, runs the report orchestrator and chains
/// to the success or error options step. Whatever fails here, the session
/// is never left without a way forward.
pub struct ReportGenerate;

#[async_trait]
impl FlowStep for ReportGenerate {
    fn id(&self) -> StepId {
        StepId::ReportGenerate
    }

    async fn on_enter(
        &self,
        session: &Session,
        ctx: &StepContext,
    ) -> Result<EntryOutcome, FlowError> {
        let document = document_number_of(session)?;
        let detail = match ctx.records.find_all_with_detail(&document).await {
            Ok(detail) => detail,
            Err(e) => {
                warn!(%document, error = %e, "detail fetch failed during report generation");
                return Ok(EntryOutcome::silent()
                    .then(Transition::Jump(StepId::ReportOptionsError, Vec::new())));
            }
        };
        let client_name = detail.client_name.clone().unwrap_or_else(|| document.clone());
        let records = detail.all();
        match ctx.reports.generate(&records, &client_name).await {
            Ok(deliverable) => Ok(EntryOutcome::message(OutboundMessage::Media {
                caption: "Here is your case summary report.".into(),
                url: deliverable.media_url.to_string(),
            })
            .then(Transition::Jump(StepId::ReportOptionsSuccess, Vec::new()))),
            Err(e) => {
                warn!(%document, error = %e, "report generation failed");
                Ok(EntryOutcome::silent()
                    .then(Transition::Jump(StepId::ReportOptionsError, Vec::new())))
            }
        }
    }

    async fn on_input(&self, _: &str, _: &Session, _: &StepContext) -> Result<Transition, FlowError> {
        Ok(Transition::Stay)
    }
}

pub struct ReportOptionsSuccess;

#[async_trait]
impl FlowStep for ReportOptionsSuccess {
    fn id(&self) -> StepId {
        StepId::ReportOptionsSuccess
    }

    async fn on_enter(&self, _: &Session, _: &StepContext) -> Result<EntryOutcome, FlowError> {
        Ok(EntryOutcome::prompt(report_success_menu().prompt))
    }

    async fn on_input(
        &self,
        raw: &str,
        _: &Session,
        _: &StepContext,
    ) -> Result<Transition, FlowError> {
        let menu = report_success_menu();
        let index = match validate_menu_choice(raw, menu.len()) {
            Ok(index) => index,
            Err(reason) => return Ok(invalid_choice(&reason.0, &menu.prompt)),
        };
        match menu.resolve(index) {
            Some(MenuOption::NewInquiry) => {
                Ok(Transition::Jump(StepId::AwaitingDocumentType, Vec::new()))
            }
            Some(MenuOption::Finish) => Ok(Transition::Terminal(
                "Thank you for reaching out. Whenever you need us again, just say hi!".into(),
            )),
            _ => Ok(invalid_choice("That option isn't available.", &menu.prompt)),
        }
    }
}

pub struct ReportOptionsError;

#[async_trait]
impl FlowStep for ReportOptionsError {
    fn id(&self) -> StepId {
        StepId::ReportOptionsError
    }

    async fn on_enter(&self, _: &Session, _: &StepContext) -> Result<EntryOutcome, FlowError> {
        Ok(EntryOutcome::prompt(report_error_menu().prompt))
    }

    async fn on_input(
        &self,
        raw: &str,
        _: &Session,
        _: &StepContext,
    ) -> Result<Transition, FlowError> {
        let menu = report_error_menu();
        let index = match validate_menu_choice(raw, menu.len()) {
            Ok(index) => index,
            Err(reason) => return Ok(invalid_choice(&reason.0, &menu.prompt)),
        };
        match menu.resolve(index) {
            Some(MenuOption::RetryReport) => {
                Ok(Transition::Jump(StepId::ReportGenerate, Vec::new()))
            }
            Some(MenuOption::NewInquiry) => {
                Ok(Transition::Jump(StepId::AwaitingDocumentType, Vec::new()))
            }
            Some(MenuOption::TalkToAgent) => Ok(Transition::Terminal(
                "No problem. One of our agents will get in touch with you shortly.".into(),
            )),
            _ => Ok(invalid_choice("That option isn't available.", &menu.prompt)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_list_includes_code_state_and_date() {
        let case = CaseRecord {
            internal_code: "0001-A".into(),
            state: "in progress".into(),
            updated_at: "2026-05-01T12:00:00Z".parse().ok(),
            jurisdiction: None,
            process_type: Some("Civil".into()),
            procedural_parts: Vec::new(),
            performances: Vec::new(),
        };
        let out = format_case_list("Your active processes:", &[case]);
        assert!(out.contains("0001-A"));
        assert!(out.contains("in progress"));
        assert!(out.contains("(Civil)"));
        assert!(out.contains("2026-05-01"));
    }
}
