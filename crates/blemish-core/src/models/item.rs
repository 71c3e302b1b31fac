//! Inspected item model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{ServerId, SessionId, SyncStatus};
use crate::error::Error;

/// A unique local identifier for an inspected item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Create a new unique item ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ItemId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Verdict for one inspected physical unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemStatus {
    Ok,
    Defective,
}

impl ItemStatus {
    /// Stable string form stored in the database
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Defective => "DEFECTIVE",
        }
    }
}

impl FromStr for ItemStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OK" => Ok(Self::Ok),
            "DEFECTIVE" => Ok(Self::Defective),
            other => Err(Error::InvalidInput(format!("unknown item status: {other}"))),
        }
    }
}

/// One inspected physical unit within a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionItem {
    /// Local identifier
    pub id: ItemId,
    /// Server identifier, present once synced
    pub server_id: Option<ServerId>,
    /// Owning session (local reference, always present)
    pub session_id: SessionId,
    /// Owning session's server identifier, filled in once known
    pub session_server_id: Option<ServerId>,
    /// Sequence number, monotonic within the session
    pub seq: i64,
    /// Verdict for this unit
    pub status: ItemStatus,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Whether the local state has been reflected to the server
    pub sync_status: SyncStatus,
}

impl InspectionItem {
    /// Create the next item in a session
    #[must_use]
    pub fn new(session_id: SessionId, seq: i64, status: ItemStatus) -> Self {
        Self {
            id: ItemId::new(),
            server_id: None,
            session_id,
            session_server_id: None,
            seq,
            status,
            created_at: chrono::Utc::now().timestamp_millis(),
            sync_status: SyncStatus::Pending,
        }
    }
}
