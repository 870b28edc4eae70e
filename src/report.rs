use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use handlebars::Handlebars;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::error::ReportError;
use crate::records::model::{CaseRecord, Performance, ProceduralPart};

/// Render-ready projection of one case. Field mapping from `CaseRecord`
/// is lossless: party lists and performance history carry over untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessDetail {
    pub internal_code: String,
    pub state: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub jurisdiction: Option<String>,
    pub process_type: Option<String>,
    pub procedural_parts: Vec<ProceduralPart>,
    pub performances: Vec<Performance>,
}

impl From<&CaseRecord> for ProcessDetail {
    fn from(record: &CaseRecord) -> Self {
        Self {
            internal_code: record.internal_code.clone(),
            state: record.state.clone(),
            updated_at: record.updated_at,
            jurisdiction: record.jurisdiction.clone(),
            process_type: record.process_type.clone(),
            procedural_parts: record.procedural_parts.clone(),
            performances: record.performances.clone(),
        }
    }
}

/// Built just-in-time per report request; never persisted between requests.
#[derive(Debug, Clone, Serialize)]
pub struct ReportModel {
    pub client_name: String,
    pub generated_at: DateTime<Utc>,
    pub processes: Vec<ProcessDetail>,
}

/// A generated artifact: its unique reference and the public locator the
/// delivery path hands to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Deliverable {
    pub reference: String,
    pub media_url: Url,
}

/// The external rendering collaborator. The orchestrator treats the
/// produced bytes as opaque.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, model: &ReportModel) -> Result<Vec<u8>, ReportError>;
}

const REPORT_TEMPLATE: &str = r#"<html>
<head><title>Case report for {{client_name}}</title></head>
<body>
<h1>Case report for {{client_name}}</h1>
<p>Generated at {{generated_at}}</p>
{{#each processes}}
<h2>{{internal_code}}</h2>
<p>State: {{state}}{{#if process_type}} | Type: {{process_type}}{{/if}}{{#if jurisdiction}} | Jurisdiction: {{jurisdiction}}{{/if}}</p>
<h3>Parties</h3>
<ul>{{#each procedural_parts}}<li>{{name}}{{#if role}} ({{role}}){{/if}}</li>{{/each}}</ul>
<h3>History</h3>
<ul>{{#each performances}}<li>{{#if date}}{{date}} - {{/if}}{{description}}</li>{{/each}}</ul>
{{/each}}
</body>
</html>
"#;

/// Default renderer: a Handlebars HTML document.
#[derive(Debug, Default)]
pub struct HtmlRenderer;

#[async_trait]
impl Renderer for HtmlRenderer {
    async fn render(&self, model: &ReportModel) -> Result<Vec<u8>, ReportError> {
        let handlebars = Handlebars::new();
        let html = handlebars
            .render_template(REPORT_TEMPLATE, model)
            .map_err(|e| ReportError::Render(e.to_string()))?;
        Ok(html.into_bytes())
    }
}

/// Where rendered artifacts live until disposal.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn put(&self, reference: &str, bytes: &[u8]) -> Result<(), ReportError>;
    async fn remove(&self, reference: &str) -> Result<(), ReportError>;
}

/// Writes artifacts under a configured directory.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    dir: PathBuf,
}

impl FsArtifactStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn put(&self, reference: &str, bytes: &[u8]) -> Result<(), ReportError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ReportError::Storage(e.to_string()))?;
        tokio::fs::write(self.dir.join(reference), bytes)
            .await
            .map_err(|e| ReportError::Storage(e.to_string()))
    }

    async fn remove(&self, reference: &str) -> Result<(), ReportError> {
        tokio::fs::remove_file(self.dir.join(reference))
            .await
            .map_err(|e| ReportError::Storage(e.to_string()))
    }
}

/// In-memory artifact store, for tests and local runs.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    artifacts: DashMap<String, Vec<u8>>,
}

impl MemoryArtifactStore {
    pub fn contains(&self, reference: &str) -> bool {
        self.artifacts.contains_key(reference)
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn put(&self, reference: &str, bytes: &[u8]) -> Result<(), ReportError> {
        self.artifacts.insert(reference.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn remove(&self, reference: &str) -> Result<(), ReportError> {
        self.artifacts
            .remove(reference)
            .map(|_| ())
            .ok_or_else(|| ReportError::Storage(format!("{reference} not found")))
    }
}

/// Aggregates case records into a report, renders it, stores the artifact
/// and schedules its disposal. A failure here never corrupts the session;
/// the flow decides what to offer the user.
pub struct ReportOrchestrator {
    renderer: Arc<dyn Renderer>,
    store: Arc<dyn ArtifactStore>,
    base_url: Url,
    disposal_delay: Duration,
}

impl ReportOrchestrator {
    pub fn new(
        renderer: Arc<dyn Renderer>,
        store: Arc<dyn ArtifactStore>,
        base_url: Url,
        disposal_delay: Duration,
    ) -> Self {
        Self { renderer, store, base_url, disposal_delay }
    }

    pub async fn generate(
        &self,
        records: &[CaseRecord],
        client_name: &str,
    ) -> Result<Deliverable, ReportError> {
        if records.is_empty() {
            return Err(ReportError::EmptyInput);
        }
        let model = ReportModel {
            client_name: client_name.to_string(),
            generated_at: Utc::now(),
            processes: records.iter().map(ProcessDetail::from).collect(),
        };
        let bytes = self.renderer.render(&model).await?;
        let reference = reference_for(&records[0].internal_code);
        self.store.put(&reference, &bytes).await?;
        let media_url = self
            .base_url
            .join(&reference)
            .map_err(|e| ReportError::Storage(format!("bad locator for {reference}: {e}")))?;
        self.schedule_disposal(reference.clone());
        debug!(%reference, cases = records.len(), "report generated");
        Ok(Deliverable { reference, media_url })
    }

    /// Fire-and-forget cleanup after the deliverable has been handed to
    /// the delivery path. Failure is logged, never escalated.
    fn schedule_disposal(&self, reference: String) {
        let store = Arc::clone(&self.store);
        let delay = self.disposal_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match store.remove(&reference).await {
                Ok(()) => debug!(%reference, "report artifact disposed"),
                Err(e) => warn!(%reference, error = %e, "report artifact disposal failed"),
            }
        });
    }
}

/// Unique per call: primary case code, millisecond timestamp and a short
/// random suffix, so overlapping reports never collide.
fn reference_for(primary_code: &str) -> String {
    let code: String = primary_code
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "report-{code}-{}-{}.html",
        Utc::now().timestamp_millis(),
        &suffix[..8]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::model::CaseRecord;

    fn sample_record(code: &str) -> CaseRecord {
        CaseRecord {
            internal_code: code.to_string(),
            state: "in progress".into(),
            updated_at: Some(Utc::now()),
            jurisdiction: Some("3rd Civil Court".into()),
            process_type: Some("Civil".into()),
            procedural_parts: vec![
                ProceduralPart { name: "Ada Example".into(), role: Some("client".into()) },
                ProceduralPart { name: "Acme Ltd".into(), role: Some("defendant".into()) },
            ],
            performances: vec![
                Performance { date: Some(Utc::now()), description: "Filed petition".into() },
                Performance { date: None, description: "Awaiting ruling".into() },
            ],
        }
    }

    fn orchestrator(store: Arc<MemoryArtifactStore>, delay: Duration) -> ReportOrchestrator {
        ReportOrchestrator::new(
            Arc::new(HtmlRenderer),
            store,
            Url::parse("https://files.example.com/reports/").unwrap(),
            delay,
        )
    }

    #[test]
    fn process_detail_mapping_is_lossless() {
        let record = sample_record("0001-A");
        let detail = ProcessDetail::from(&record);
        assert_eq!(detail.internal_code, record.internal_code);
        assert_eq!(detail.state, record.state);
        assert_eq!(detail.updated_at, record.updated_at);
        assert_eq!(detail.jurisdiction, record.jurisdiction);
        assert_eq!(detail.process_type, record.process_type);
        assert_eq!(detail.procedural_parts, record.procedural_parts);
        assert_eq!(detail.performances, record.performances);
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let store = Arc::new(MemoryArtifactStore::default());
        let orchestrator = orchestrator(store, Duration::from_secs(60));
        let result = orchestrator.generate(&[], "Ada Example").await;
        assert_eq!(result.unwrap_err(), ReportError::EmptyInput);
    }

    #[tokio::test]
    async fn identical_input_yields_distinct_references() {
        let store = Arc::new(MemoryArtifactStore::default());
        let orchestrator = orchestrator(store.clone(), Duration::from_secs(60));
        let records = vec![sample_record("0001-A")];

        let first = orchestrator.generate(&records, "Ada Example").await.unwrap();
        let second = orchestrator.generate(&records, "Ada Example").await.unwrap();

        assert_ne!(first.reference, second.reference);
        assert!(store.contains(&first.reference));
        assert!(store.contains(&second.reference));
    }

    #[tokio::test]
    async fn locator_is_built_from_base_url() {
        let store = Arc::new(MemoryArtifactStore::default());
        let orchestrator = orchestrator(store, Duration::from_secs(60));
        let deliverable = orchestrator
            .generate(&[sample_record("0001/A")], "Ada Example")
            .await
            .unwrap();
        assert!(deliverable
            .media_url
            .as_str()
            .starts_with("https://files.example.com/reports/report-0001-A-"));
    }

    #[tokio::test]
    async fn artifact_is_disposed_after_delay() {
        let store = Arc::new(MemoryArtifactStore::default());
        let orchestrator = orchestrator(store.clone(), Duration::from_millis(20));
        let deliverable = orchestrator
            .generate(&[sample_record("0001-A")], "Ada Example")
            .await
            .unwrap();

        assert!(store.contains(&deliverable.reference));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!store.contains(&deliverable.reference));
    }

    #[tokio::test]
    async fn fs_store_writes_and_disposes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsArtifactStore::new(dir.path().to_path_buf()));
        let orchestrator = ReportOrchestrator::new(
            Arc::new(HtmlRenderer),
            store,
            Url::parse("https://files.example.com/reports/").unwrap(),
            Duration::from_millis(20),
        );

        let deliverable = orchestrator
            .generate(&[sample_record("0001-A")], "Ada Example")
            .await
            .unwrap();

        let path = dir.path().join(&deliverable.reference);
        let html = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(html.contains("0001-A"));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn rendered_report_lists_every_case() {
        let model = ReportModel {
            client_name: "Ada Example".into(),
            generated_at: Utc::now(),
            processes: vec![
                ProcessDetail::from(&sample_record("0001-A")),
                ProcessDetail::from(&sample_record("0002-B")),
            ],
        };
        let bytes = HtmlRenderer.render(&model).await.unwrap();
        let html = String::from_utf8(bytes).unwrap();
        assert!(html.contains("0001-A"));
        assert!(html.contains("0002-B"));
        assert!(html.contains("Ada Example"));
        assert!(html.contains("Awaiting ruling"));
    }
}
