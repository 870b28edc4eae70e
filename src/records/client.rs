use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::RecordsError;
use crate::records::model::{CaseRecord, ClientProcesses, Performance, ProceduralPart};

/// The three operations the conversation consumes from the case-records
/// service. Failures are typed; raw transport errors never cross this
/// boundary.
#[async_trait]
pub trait RecordsClient: Send + Sync {
    /// Cases for a document number, without performance history.
    async fn find_by_document(&self, document_number: &str)
        -> Result<ClientProcesses, RecordsError>;

    /// One fully populated case by its internal code.
    async fn find_detail_by_code(&self, internal_code: &str) -> Result<CaseRecord, RecordsError>;

    /// All cases for a document number with full detail, for reporting.
    async fn find_all_with_detail(
        &self,
        document_number: &str,
    ) -> Result<ClientProcesses, RecordsError>;
}

// Wire shapes. Deployments of the records service name the same semantic
// lists differently; serde aliases merge them here so normalization never
// leaks to callers.

#[derive(Debug, Deserialize)]
struct WireProcesses {
    #[serde(default, alias = "document", alias = "documentNumber")]
    document_number: Option<String>,
    #[serde(default, alias = "client", alias = "clientName")]
    client_name: Option<String>,
    #[serde(default, alias = "ongoing", alias = "inProgress", alias = "activeProcesses")]
    active: Option<Vec<WireCase>>,
    #[serde(default, alias = "archived", alias = "closed", alias = "finalizedProcesses")]
    finalized: Option<Vec<WireCase>>,
}

#[derive(Debug, Deserialize)]
struct WireCase {
    #[serde(default, alias = "code", alias = "internalCode", alias = "processCode")]
    internal_code: Option<String>,
    #[serde(default, alias = "status")]
    state: Option<String>,
    #[serde(default, alias = "updatedAt", alias = "lastUpdate")]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "court")]
    jurisdiction: Option<String>,
    #[serde(default, alias = "type", alias = "processType")]
    process_type: Option<String>,
    #[serde(default, alias = "parties", alias = "proceduralParts")]
    parts: Vec<WirePart>,
    #[serde(default, alias = "history", alias = "movements")]
    performances: Vec<WirePerformance>,
}

#[derive(Debug, Deserialize)]
struct WirePart {
    #[serde(alias = "party")]
    name: String,
    #[serde(default, alias = "kind")]
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WirePerformance {
    #[serde(default, alias = "performedAt")]
    date: Option<DateTime<Utc>>,
    #[serde(alias = "text", alias = "summary")]
    description: String,
}

impl WireCase {
    fn normalize(self) -> Result<CaseRecord, RecordsError> {
        let internal_code = self.internal_code.ok_or_else(|| {
            RecordsError::InvalidResponseShape("case without an internal code".into())
        })?;
        Ok(CaseRecord {
            internal_code,
            state: self.state.unwrap_or_else(|| "unknown".into()),
            updated_at: self.updated_at,
            jurisdiction: self.jurisdiction,
            process_type: self.process_type,
            procedural_parts: self
                .parts
                .into_iter()
                .map(|p| ProceduralPart { name: p.name, role: p.role })
                .collect(),
            performances: self
                .performances
                .into_iter()
                .map(|p| Performance { date: p.date, description: p.description })
                .collect(),
        })
    }
}

impl WireProcesses {
    fn normalize(self, document_number: &str) -> Result<ClientProcesses, RecordsError> {
        if self.active.is_none() && self.finalized.is_none() {
            return Err(RecordsError::InvalidResponseShape(
                "response carries neither an active nor a finalized list".into(),
            ));
        }
        let normalize_all = |cases: Option<Vec<WireCase>>| {
            cases
                .unwrap_or_default()
                .into_iter()
                .map(WireCase::normalize)
                .collect::<Result<Vec<_>, _>>()
        };
        Ok(ClientProcesses {
            document_number: self
                .document_number
                .unwrap_or_else(|| document_number.to_string()),
            client_name: self.client_name,
            active: normalize_all(self.active)?,
            finalized: normalize_all(self.finalized)?,
        })
    }
}

/// REST client for the case-records service. Every call carries the
/// configured timeout; a timeout surfaces as `RecordsError::Connection`.
#[derive(Debug, Clone)]
pub struct HttpRecordsClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpRecordsClient {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, RecordsError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RecordsError::Connection(format!("client setup: {e}")))?;
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, RecordsError> {
        self.base_url
            .join(path)
            .map_err(|e| RecordsError::Connection(format!("bad endpoint {path}: {e}")))
    }

    async fn fetch_processes(&self, url: Url, document_number: &str)
        -> Result<ClientProcesses, RecordsError>
    {
        debug!(%url, "querying records service");
        let response = self.http.get(url).send().await.map_err(to_records_error)?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(RecordsError::NotFound),
            status if !status.is_success() => Err(RecordsError::Connection(format!(
                "records service answered {status}"
            ))),
            _ => {
                let wire: WireProcesses = response
                    .json()
                    .await
                    .map_err(|e| RecordsError::InvalidResponseShape(e.to_string()))?;
                wire.normalize(document_number)
            }
        }
    }
}

fn to_records_error(e: reqwest::Error) -> RecordsError {
    if e.is_timeout() {
        RecordsError::Connection("request timed out".into())
    } else {
        RecordsError::Connection(e.to_string())
    }
}

#[async_trait]
impl RecordsClient for HttpRecordsClient {
    async fn find_by_document(&self, document_number: &str)
        -> Result<ClientProcesses, RecordsError>
    {
        let mut url = self.endpoint("processes")?;
        url.query_pairs_mut().append_pair("document", document_number);
        self.fetch_processes(url, document_number).await
    }

    async fn find_detail_by_code(&self, internal_code: &str) -> Result<CaseRecord, RecordsError> {
        let url = self.endpoint(&format!("processes/{internal_code}"))?;
        debug!(%url, "querying case detail");
        let response = self.http.get(url).send().await.map_err(to_records_error)?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(RecordsError::NotFound),
            status if !status.is_success() => Err(RecordsError::Connection(format!(
                "records service answered {status}"
            ))),
            _ => {
                let wire: WireCase = response
                    .json()
                    .await
                    .map_err(|e| RecordsError::InvalidResponseShape(e.to_string()))?;
                wire.normalize()
            }
        }
    }

    async fn find_all_with_detail(
        &self,
        document_number: &str,
    ) -> Result<ClientProcesses, RecordsError> {
        let mut url = self.endpoint("processes")?;
        url.query_pairs_mut()
            .append_pair("document", document_number)
            .append_pair("detail", "full");
        self.fetch_processes(url, document_number).await
    }
}
