use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use casebot::config::Settings;
use casebot::flow::{steps, FlowEngine, StepContext};
use casebot::logger::init_tracing;
use casebot::records::HttpRecordsClient;
use casebot::report::{FsArtifactStore, HtmlRenderer, ReportOrchestrator};
use casebot::session::InMemorySessionStore;
use casebot::transport::{ConsoleTransport, InboundEvent, ACTION_START};

#[derive(Parser, Debug)]
#[command(name = "casebot", about = "Legal-case inquiry assistant")]
struct Args {
    /// Path to a .env file with settings.
    #[arg(long, default_value = ".env")]
    env: PathBuf,

    /// Directory for rolling log files; console-only when omitted.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Default log level when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if args.env.exists() {
        dotenvy::from_path(&args.env).ok();
    }
    let _guard = init_tracing(args.log_dir.clone(), &args.log_level)?;
    let settings = Settings::from_env()?;

    let records = Arc::new(HttpRecordsClient::new(
        settings.records_api_url.clone(),
        settings.request_timeout,
    )?);
    let reports = Arc::new(ReportOrchestrator::new(
        Arc::new(HtmlRenderer),
        Arc::new(FsArtifactStore::new(settings.artifact_dir.clone())),
        settings.artifact_base_url.clone(),
        settings.report_disposal_delay,
    ));
    let sessions = InMemorySessionStore::new(settings.session_ttl);
    let engine = FlowEngine::new(
        steps::builtin(),
        sessions,
        Arc::new(ConsoleTransport),
        StepContext { records, reports },
    );

    info!("casebot ready; type /start to begin, Ctrl-D to quit");
    let user = "console".to_string();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        let event = if line == "/start" {
            InboundEvent::action(user.as_str(), ACTION_START)
        } else {
            InboundEvent::text(user.as_str(), line)
        };
        if let Err(e) = engine.handle_event(event).await {
            error!(error = %e, "event handling failed");
        }
    }
    Ok(())
}
