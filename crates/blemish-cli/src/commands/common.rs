//! Helpers shared across commands.

use std::path::Path;

use blemish_core::models::{DefectId, ItemId, SessionId};
use blemish_core::InspectionService;

use crate::error::CliError;

/// Open the service over the resolved database path
pub async fn open_service(db_path: &Path) -> Result<InspectionService, CliError> {
    Ok(InspectionService::open_path(db_path).await?)
}

pub fn parse_session_id(raw: &str) -> Result<SessionId, CliError> {
    raw.trim()
        .parse()
        .map_err(|_| CliError::InvalidId("session", raw.to_string()))
}

pub fn parse_item_id(raw: &str) -> Result<ItemId, CliError> {
    raw.trim()
        .parse()
        .map_err(|_| CliError::InvalidId("item", raw.to_string()))
}

pub fn parse_defect_id(raw: &str) -> Result<DefectId, CliError> {
    raw.trim()
        .parse()
        .map_err(|_| CliError::InvalidId("defect", raw.to_string()))
}

/// Render a Unix-ms timestamp for terminal output
pub fn format_timestamp(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map_or_else(|| "-".to_string(), |ts| ts.format("%Y-%m-%d %H:%M").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ids_reject_garbage() {
        assert!(parse_session_id("not-a-uuid").is_err());
        assert!(parse_item_id("").is_err());
        let id = SessionId::new();
        assert_eq!(parse_session_id(&id.as_str()).unwrap(), id);
    }

    #[test]
    fn format_timestamp_handles_out_of_range() {
        assert_eq!(format_timestamp(i64::MAX), "-");
        assert!(format_timestamp(1_700_000_000_000).starts_with("2023-"));
    }
}
