//! Pending sync operation model

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::ServerId;
use crate::error::Error;

/// Attempt ceiling after which an operation is permanently dropped
pub const MAX_ATTEMPTS: u32 = 5;

/// Whether an entity's local state has been reflected to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Not yet replayed to the server
    Pending,
    /// Local state matches the server
    Synced,
    /// A replay attempt failed; retriable until the ceiling, then terminal
    Error,
}

impl SyncStatus {
    /// Stable string form stored in the database
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Synced => "synced",
            Self::Error => "error",
        }
    }
}

impl FromStr for SyncStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "synced" => Ok(Self::Synced),
            "error" => Ok(Self::Error),
            other => Err(Error::InvalidInput(format!("unknown sync status: {other}"))),
        }
    }
}

/// Kind of mutation an operation replays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Create,
    Update,
    Delete,
}

impl OpKind {
    /// Stable string form stored in the database
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl FromStr for OpKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(Error::InvalidInput(format!(
                "unknown operation kind: {other}"
            ))),
        }
    }
}

/// Kind of entity an operation targets.
///
/// A closed set so handler dispatch in the sync engine is checked for
/// exhaustiveness at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Session,
    Item,
    Defect,
}

impl EntityKind {
    /// Stable string form stored in the database
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Item => "item",
            Self::Defect => "defect",
        }
    }

    /// REST collection name on the remote API
    #[must_use]
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Session => "sessions",
            Self::Item => "items",
            Self::Defect => "defects",
        }
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "session" => Ok(Self::Session),
            "item" => Ok(Self::Item),
            "defect" => Ok(Self::Defect),
            other => Err(Error::InvalidInput(format!("unknown entity kind: {other}"))),
        }
    }
}

/// An entry in the pending operation queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncOperation {
    /// Queue row id (auto-incrementing)
    pub id: i64,
    /// Mutation kind
    pub kind: OpKind,
    /// Target entity kind
    pub entity: EntityKind,
    /// Local identifier of the target entity
    pub local_id: String,
    /// Server identifier, when it was already known at enqueue time
    pub server_id: Option<ServerId>,
    /// Opaque data needed to replay the operation
    pub payload: serde_json::Value,
    /// Enqueue timestamp (Unix ms); replay order is ascending on this
    pub created_at: i64,
    /// Failed replay attempts so far
    pub attempts: u32,
    /// Error message from the most recent failed attempt
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrips() {
        for kind in [OpKind::Create, OpKind::Update, OpKind::Delete] {
            let parsed: OpKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        for entity in [EntityKind::Session, EntityKind::Item, EntityKind::Defect] {
            let parsed: EntityKind = entity.as_str().parse().unwrap();
            assert_eq!(parsed, entity);
        }
        for status in [SyncStatus::Pending, SyncStatus::Synced, SyncStatus::Error] {
            let parsed: SyncStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_collections() {
        assert_eq!(EntityKind::Session.collection(), "sessions");
        assert_eq!(EntityKind::Item.collection(), "items");
        assert_eq!(EntityKind::Defect.collection(), "defects");
    }
}
