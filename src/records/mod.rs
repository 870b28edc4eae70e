pub mod client;
pub mod model;

pub use client::{HttpRecordsClient, RecordsClient};
pub use model::{CaseRecord, ClientProcesses, Performance, ProceduralPart};
