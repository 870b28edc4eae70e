use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One party attached to a case (plaintiff, defendant, counsel, client...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProceduralPart {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// One entry of a case's performance history (filings, rulings, movements).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    pub description: String,
}

/// A single legal case as returned by the records service. Read-only on
/// this side: transformed for display and reporting, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub internal_code: String,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_type: Option<String>,
    #[serde(default)]
    pub procedural_parts: Vec<ProceduralPart>,
    #[serde(default)]
    pub performances: Vec<Performance>,
}

/// Aggregated cases for one document number, split into active and
/// finalized buckets. Cached in the session for the selection sub-flow and
/// recomputed whenever the document number changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientProcesses {
    pub document_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(default)]
    pub active: Vec<CaseRecord>,
    #[serde(default)]
    pub finalized: Vec<CaseRecord>,
}

impl ClientProcesses {
    pub fn total_active(&self) -> usize {
        self.active.len()
    }

    pub fn total_finalized(&self) -> usize {
        self.finalized.len()
    }

    pub fn total(&self) -> usize {
        self.active.len() + self.finalized.len()
    }

    /// All cases, active first, in service order.
    pub fn all(&self) -> Vec<CaseRecord> {
        self.active
            .iter()
            .chain(self.finalized.iter())
            .cloned()
            .collect()
    }
}
