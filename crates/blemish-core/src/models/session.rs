//! Inspection session model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{ServerId, SyncStatus};
use crate::error::Error;

/// A unique local identifier for a session, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new unique session ID using UUID v7
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

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Lifecycle status of an inspection session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionStatus {
    Open,
    Paused,
    Closed,
}

impl SessionStatus {
    /// Stable string form stored in the database
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Paused => "PAUSED",
            Self::Closed => "CLOSED",
        }
    }
}

impl FromStr for SessionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(Self::Open),
            "PAUSED" => Ok(Self::Paused),
            "CLOSED" => Ok(Self::Closed),
            other => Err(Error::InvalidInput(format!(
                "unknown session status: {other}"
            ))),
        }
    }
}

/// One inspection run at a workstation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Local identifier, assigned before any server round-trip
    pub id: SessionId,
    /// Server identifier, present once the creating operation replayed
    pub server_id: Option<ServerId>,
    /// Inspected product (catalog reference)
    pub product_id: ServerId,
    /// Workstation the run happens at (catalog reference)
    pub workstation_id: ServerId,
    /// Inspector user reference
    pub inspector: String,
    /// Lifecycle status
    pub status: SessionStatus,
    /// Accumulated active time in seconds
    pub active_seconds: i64,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
    /// Whether the local state has been reflected to the server
    pub sync_status: SyncStatus,
}

impl Session {
    /// Start a new session for a product at a workstation
    #[must_use]
    pub fn new(product_id: ServerId, workstation_id: ServerId, inspector: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: SessionId::new(),
            server_id: None,
            product_id,
            workstation_id,
            inspector: inspector.into(),
            status: SessionStatus::Open,
            active_seconds: 0,
            created_at: now,
            updated_at: now,
            sync_status: SyncStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_unique() {
        let id1 = SessionId::new();
        let id2 = SessionId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_session_id_parse() {
        let id = SessionId::new();
        let parsed: SessionId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_session_new() {
        let session = Session::new(7, 3, "inspector-1");
        assert_eq!(session.status, SessionStatus::Open);
        assert_eq!(session.sync_status, SyncStatus::Pending);
        assert_eq!(session.active_seconds, 0);
        assert!(session.server_id.is_none());
        assert_eq!(session.created_at, session.updated_at);
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            SessionStatus::Open,
            SessionStatus::Paused,
            SessionStatus::Closed,
        ] {
            let parsed: SessionStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("open".parse::<SessionStatus>().is_err());
    }
}
