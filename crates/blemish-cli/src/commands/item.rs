use blemish_core::models::{InspectionItem, ItemStatus};
use blemish_core::InspectionService;
use serde::Serialize;

use super::common::parse_session_id;
use crate::error::CliError;

pub async fn run_add(
    service: &InspectionService,
    session: &str,
    defective: bool,
) -> Result<(), CliError> {
    let session_id = parse_session_id(session)?;
    let status = if defective {
        ItemStatus::Defective
    } else {
        ItemStatus::Ok
    };
    let item = service.advance_item(&session_id, status).await?;
    println!("{} (#{})", item.id, item.seq);
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct ItemListItem {
    pub id: String,
    pub server_id: Option<i64>,
    pub seq: i64,
    pub status: String,
    pub sync_status: String,
}

pub fn item_to_list_item(item: &InspectionItem) -> ItemListItem {
    ItemListItem {
        id: item.id.as_str(),
        server_id: item.server_id,
        seq: item.seq,
        status: item.status.as_str().to_string(),
        sync_status: item.sync_status.as_str().to_string(),
    }
}

pub fn format_item_lines(items: &[InspectionItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| {
            format!(
                "#{:<4} {}  {:<9} [{}]",
                item.seq,
                item.id,
                item.status.as_str(),
                item.sync_status.as_str(),
            )
        })
        .collect()
}

pub async fn run_list(
    service: &InspectionService,
    session: &str,
    as_json: bool,
) -> Result<(), CliError> {
    let session_id = parse_session_id(session)?;
    let items = service.list_items(&session_id).await?;

    if as_json {
        let listed = items
            .iter()
            .map(item_to_list_item)
            .collect::<Vec<ItemListItem>>();
        println!("{}", serde_json::to_string_pretty(&listed)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("No items in session.");
        return Ok(());
    }

    for line in format_item_lines(&items) {
        println!("{line}");
    }
    Ok(())
}
