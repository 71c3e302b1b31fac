use blemish_core::models::Session;
use blemish_core::InspectionService;
use serde::Serialize;

use super::common::{format_timestamp, parse_session_id};
use crate::error::CliError;

pub async fn run_start(
    service: &InspectionService,
    product: i64,
    workstation: i64,
    inspector: &str,
) -> Result<(), CliError> {
    let inspector = inspector.trim();
    if inspector.is_empty() {
        return Err(CliError::EmptyInspector);
    }

    let session = service.start_session(product, workstation, inspector).await?;
    println!("{}", session.id);
    Ok(())
}

pub async fn run_pause(service: &InspectionService, id: &str) -> Result<(), CliError> {
    let id = parse_session_id(id)?;
    service.pause_session(&id).await?;
    println!("{id}");
    Ok(())
}

pub async fn run_resume(service: &InspectionService, id: &str) -> Result<(), CliError> {
    let id = parse_session_id(id)?;
    service.resume_session(&id).await?;
    println!("{id}");
    Ok(())
}

pub async fn run_close(service: &InspectionService, id: &str) -> Result<(), CliError> {
    let id = parse_session_id(id)?;
    service.close_session(&id).await?;
    println!("{id}");
    Ok(())
}

pub async fn run_tick(service: &InspectionService, id: &str, seconds: i64) -> Result<(), CliError> {
    let id = parse_session_id(id)?;
    service.record_active_time(&id, seconds).await?;
    println!("{id}");
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct SessionListItem {
    pub id: String,
    pub server_id: Option<i64>,
    pub product_id: i64,
    pub workstation_id: i64,
    pub inspector: String,
    pub status: String,
    pub active_seconds: i64,
    pub started: String,
    pub sync_status: String,
}

pub fn session_to_list_item(session: &Session) -> SessionListItem {
    SessionListItem {
        id: session.id.as_str(),
        server_id: session.server_id,
        product_id: session.product_id,
        workstation_id: session.workstation_id,
        inspector: session.inspector.clone(),
        status: session.status.as_str().to_string(),
        active_seconds: session.active_seconds,
        started: format_timestamp(session.created_at),
        sync_status: session.sync_status.as_str().to_string(),
    }
}

pub fn format_session_lines(sessions: &[Session]) -> Vec<String> {
    sessions
        .iter()
        .map(|session| {
            format!(
                "{}  {:>7}  {:<8}  product={} station={} inspector={} [{}]",
                session.id,
                format!("{}s", session.active_seconds),
                session.status.as_str(),
                session.product_id,
                session.workstation_id,
                session.inspector,
                session.sync_status.as_str(),
            )
        })
        .collect()
}

pub async fn run_list(
    service: &InspectionService,
    limit: usize,
    as_json: bool,
) -> Result<(), CliError> {
    let sessions = service.list_sessions(limit, 0).await?;

    if as_json {
        let items = sessions
            .iter()
            .map(session_to_list_item)
            .collect::<Vec<SessionListItem>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!("No sessions recorded.");
        return Ok(());
    }

    for line in format_session_lines(&sessions) {
        println!("{line}");
    }
    Ok(())
}
