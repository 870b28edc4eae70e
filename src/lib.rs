//! Conversational flow engine for a text-message legal-case assistant:
//! per-user sessions, step-by-step input capture, case-records lookups and
//! summary-report generation.

pub mod config;
pub mod error;
pub mod flow;
pub mod logger;
pub mod menu;
pub mod records;
pub mod report;
pub mod session;
pub mod transport;
pub mod util;
pub mod validate;
