use blemish_core::models::{ItemStatus, SessionStatus, SyncStatus};
use blemish_core::InspectionService;
use pretty_assertions::assert_eq;

use crate::cli::{CompletionShell, SeverityArg};
use crate::commands::common::{format_timestamp, parse_defect_id, parse_session_id};
use crate::commands::completions::run_completions;
use crate::commands::defect::format_defect_lines;
use crate::commands::item::format_item_lines;
use crate::commands::session::{format_session_lines, session_to_list_item};
use crate::commands::{defect, item, session, sync};
use crate::config::CliConfig;
use crate::error::CliError;

fn service() -> InspectionService {
    InspectionService::open_in_memory().unwrap()
}

#[tokio::test]
async fn session_start_and_close_flow() {
    let service = service();

    session::run_start(&service, 7, 3, "inspector-1")
        .await
        .unwrap();
    let sessions = service.list_sessions(10, 0).await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].status, SessionStatus::Open);
    assert_eq!(sessions[0].sync_status, SyncStatus::Pending);

    let id = sessions[0].id.as_str();
    session::run_close(&service, &id).await.unwrap();

    let closed = service.list_sessions(10, 0).await.unwrap();
    assert_eq!(closed[0].status, SessionStatus::Closed);
    // create + update queued
    assert_eq!(service.pending_count().await.unwrap(), 2);
}

#[tokio::test]
async fn session_start_rejects_blank_inspector() {
    let service = service();
    let result = session::run_start(&service, 7, 3, "   ").await;
    assert!(matches!(result, Err(CliError::EmptyInspector)));
}

#[tokio::test]
async fn item_add_assigns_monotonic_sequence() {
    let service = service();
    let started = service.start_session(7, 3, "inspector-1").await.unwrap();
    let id = started.id.as_str();

    item::run_add(&service, &id, false).await.unwrap();
    item::run_add(&service, &id, true).await.unwrap();

    let items = service.list_items(&started.id).await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].seq, 1);
    assert_eq!(items[0].status, ItemStatus::Ok);
    assert_eq!(items[1].seq, 2);
    assert_eq!(items[1].status, ItemStatus::Defective);
}

#[tokio::test]
async fn defect_add_validates_position() {
    let service = service();
    let started = service.start_session(7, 3, "inspector-1").await.unwrap();
    let item = service
        .advance_item(&started.id, ItemStatus::Defective)
        .await
        .unwrap();
    let item_id = item.id.as_str();

    defect::run_add(
        &service,
        &item_id,
        12,
        0.5,
        0.5,
        Some(SeverityArg::Major),
        Some("dent".to_string()),
    )
    .await
    .unwrap();

    let out_of_range = defect::run_add(&service, &item_id, 12, 1.5, 0.5, None, None).await;
    assert!(matches!(
        out_of_range,
        Err(CliError::Core(blemish_core::Error::InvalidInput(_)))
    ));

    let defects = service.list_defects(&item.id).await.unwrap();
    assert_eq!(defects.len(), 1);
    assert_eq!(defects[0].note.as_deref(), Some("dent"));
}

#[tokio::test]
async fn defect_remove_tombstones_and_queues_delete() {
    let service = service();
    let started = service.start_session(7, 3, "inspector-1").await.unwrap();
    let item = service
        .advance_item(&started.id, ItemStatus::Defective)
        .await
        .unwrap();
    let marked = service
        .mark_defect(&item.id, 12, 0.2, 0.8, None, None)
        .await
        .unwrap();

    let defect_id = marked.id.as_str();
    defect::run_remove(&service, &defect_id).await.unwrap();

    assert!(service.list_defects(&item.id).await.unwrap().is_empty());
    // create session + create item + create defect + delete defect
    assert_eq!(service.pending_count().await.unwrap(), 4);
}

#[tokio::test]
async fn sync_now_while_offline_leaves_queue_untouched() {
    let service = service();
    service.start_session(7, 3, "inspector-1").await.unwrap();

    let config = CliConfig::default();
    sync::run_now(&service, &config, true).await.unwrap();
    assert_eq!(service.pending_count().await.unwrap(), 1);
}

#[tokio::test]
async fn sync_now_without_api_url_is_a_config_error() {
    let service = service();
    let config = CliConfig::default();
    let result = sync::run_now(&service, &config, false).await;
    assert!(matches!(result, Err(CliError::ApiNotConfigured)));
}

#[tokio::test]
async fn sync_status_renders_in_both_modes() {
    let service = service();
    service.start_session(7, 3, "inspector-1").await.unwrap();
    sync::run_status(&service, false, false).await.unwrap();
    sync::run_status(&service, true, true).await.unwrap();
}

#[test]
fn id_parsers_reject_malformed_input() {
    assert!(matches!(
        parse_session_id("abc"),
        Err(CliError::InvalidId("session", _))
    ));
    assert!(matches!(
        parse_defect_id(" "),
        Err(CliError::InvalidId("defect", _))
    ));
}

#[tokio::test]
async fn list_formatters_surface_sync_state() {
    let service = service();
    let started = service.start_session(7, 3, "inspector-1").await.unwrap();
    let item = service
        .advance_item(&started.id, ItemStatus::Defective)
        .await
        .unwrap();
    service
        .mark_defect(&item.id, 12, 0.25, 0.75, Some(SeverityArg::Minor.into()), None)
        .await
        .unwrap();

    let sessions = service.list_sessions(10, 0).await.unwrap();
    let lines = format_session_lines(&sessions);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("OPEN"));
    assert!(lines[0].contains("[pending]"));

    let json_item = session_to_list_item(&sessions[0]);
    assert_eq!(json_item.status, "OPEN");
    assert_eq!(json_item.sync_status, "pending");

    let items = service.list_items(&started.id).await.unwrap();
    let lines = format_item_lines(&items);
    assert!(lines[0].contains("DEFECTIVE"));

    let defects = service.list_defects(&item.id).await.unwrap();
    let lines = format_defect_lines(&defects);
    assert!(lines[0].contains("severity=MINOR"));
    assert!(lines[0].contains("(0.250, 0.750)"));
}

#[test]
fn completions_write_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blemish.bash");

    run_completions(CompletionShell::Bash, Some(&path)).unwrap();

    let script = std::fs::read_to_string(&path).unwrap();
    assert!(script.contains("blemish"));
}

#[test]
fn timestamps_format_for_humans() {
    assert!(format_timestamp(1_700_000_000_000).starts_with("2023-"));
}
