use blemish_core::models::{Defect, Severity};
use blemish_core::InspectionService;
use serde::Serialize;

use super::common::{parse_defect_id, parse_item_id};
use crate::cli::SeverityArg;
use crate::error::CliError;

pub async fn run_add(
    service: &InspectionService,
    item: &str,
    defect_type: i64,
    x: f64,
    y: f64,
    severity: Option<SeverityArg>,
    note: Option<String>,
) -> Result<(), CliError> {
    let item_id = parse_item_id(item)?;
    let defect = service
        .mark_defect(
            &item_id,
            defect_type,
            x,
            y,
            severity.map(Severity::from),
            note,
        )
        .await?;
    println!("{}", defect.id);
    Ok(())
}

pub async fn run_remove(service: &InspectionService, id: &str) -> Result<(), CliError> {
    let id = parse_defect_id(id)?;
    service.delete_defect(&id).await?;
    println!("{id}");
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct DefectListItem {
    pub id: String,
    pub server_id: Option<i64>,
    pub defect_type_id: i64,
    pub x: f64,
    pub y: f64,
    pub severity: Option<String>,
    pub note: Option<String>,
    pub sync_status: String,
}

pub fn defect_to_list_item(defect: &Defect) -> DefectListItem {
    DefectListItem {
        id: defect.id.as_str(),
        server_id: defect.server_id,
        defect_type_id: defect.defect_type_id,
        x: defect.x,
        y: defect.y,
        severity: defect.severity.map(|s| s.as_str().to_string()),
        note: defect.note.clone(),
        sync_status: defect.sync_status.as_str().to_string(),
    }
}

pub fn format_defect_lines(defects: &[Defect]) -> Vec<String> {
    defects
        .iter()
        .map(|defect| {
            let severity = defect.severity.map_or("-", Severity::as_str);
            format!(
                "{}  type={} at ({:.3}, {:.3}) severity={} [{}]",
                defect.id,
                defect.defect_type_id,
                defect.x,
                defect.y,
                severity,
                defect.sync_status.as_str(),
            )
        })
        .collect()
}

pub async fn run_list(
    service: &InspectionService,
    item: &str,
    as_json: bool,
) -> Result<(), CliError> {
    let item_id = parse_item_id(item)?;
    let defects = service.list_defects(&item_id).await?;

    if as_json {
        let listed = defects
            .iter()
            .map(defect_to_list_item)
            .collect::<Vec<DefectListItem>>();
        println!("{}", serde_json::to_string_pretty(&listed)?);
        return Ok(());
    }

    if defects.is_empty() {
        println!("No defects on item.");
        return Ok(());
    }

    for line in format_defect_lines(&defects) {
        println!("{line}");
    }
    Ok(())
}
