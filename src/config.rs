use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;
use url::Url;

/// Runtime settings, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base URL of the case-records service.
    pub records_api_url: Url,
    /// Bounded wait for every external call; a timeout reads as a
    /// connection failure.
    pub request_timeout: Duration,
    /// Where rendered report artifacts are written.
    pub artifact_dir: PathBuf,
    /// Public base address used to build deliverable locators.
    pub artifact_base_url: Url,
    /// Idle expiry for sessions; an expired session restarts at Idle.
    pub session_ttl: Duration,
    /// How long a report artifact stays retrievable before disposal.
    pub report_disposal_delay: Duration,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let records_api_url = env_or("CASEBOT_RECORDS_URL", "http://localhost:8080/api/")
            .parse::<Url>()
            .context("CASEBOT_RECORDS_URL is not a valid URL")?;
        let artifact_base_url = env_or("CASEBOT_ARTIFACT_BASE_URL", "http://localhost:8081/reports/")
            .parse::<Url>()
            .context("CASEBOT_ARTIFACT_BASE_URL is not a valid URL")?;
        let settings = Self {
            records_api_url,
            request_timeout: Duration::from_secs(secs_or("CASEBOT_TIMEOUT_SECS", 10)?),
            artifact_dir: PathBuf::from(env_or("CASEBOT_ARTIFACT_DIR", "./reports")),
            artifact_base_url,
            session_ttl: Duration::from_secs(secs_or("CASEBOT_SESSION_TTL_SECS", 1800)?),
            report_disposal_delay: Duration::from_secs(secs_or("CASEBOT_REPORT_DISPOSAL_SECS", 600)?),
        };
        info!(
            records = %settings.records_api_url,
            artifacts = %settings.artifact_dir.display(),
            "settings loaded"
        );
        Ok(settings)
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn secs_or(key: &str, default: u64) -> Result<u64> {
    match env::var(key) {
        Ok(raw) => raw.parse().with_context(|| format!("{key} must be a number of seconds")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_env() {
        // Keys are namespaced, so a clean test environment hits every default.
        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.request_timeout, Duration::from_secs(10));
        assert_eq!(settings.session_ttl, Duration::from_secs(1800));
        assert_eq!(settings.report_disposal_delay, Duration::from_secs(600));
    }
}
