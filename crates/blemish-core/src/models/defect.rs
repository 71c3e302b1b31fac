//! Defect mark model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{ItemId, ServerId, SyncStatus};
use crate::error::Error;

/// A unique local identifier for a defect mark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DefectId(Uuid);

impl DefectId {
    /// Create a new unique defect ID using UUID v7
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

impl Default for DefectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DefectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DefectId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Severity of a marked flaw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Minor,
    Major,
    Critical,
}

impl Severity {
    /// Stable string form stored in the database
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minor => "MINOR",
            Self::Major => "MAJOR",
            Self::Critical => "CRITICAL",
        }
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MINOR" => Ok(Self::Minor),
            "MAJOR" => Ok(Self::Major),
            "CRITICAL" => Ok(Self::Critical),
            other => Err(Error::InvalidInput(format!("unknown severity: {other}"))),
        }
    }
}

/// One marked flaw on an item, positioned on the product template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Defect {
    /// Local identifier
    pub id: DefectId,
    /// Server identifier, present once synced
    pub server_id: Option<ServerId>,
    /// Owning item (local reference, always present)
    pub item_id: ItemId,
    /// Owning item's server identifier, filled in once known
    pub item_server_id: Option<ServerId>,
    /// Defect type (catalog reference)
    pub defect_type_id: ServerId,
    /// Normalized template position, x in [0, 1]
    pub x: f64,
    /// Normalized template position, y in [0, 1]
    pub y: f64,
    /// Optional severity grading
    pub severity: Option<Severity>,
    /// Optional free-form note
    pub note: Option<String>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Whether the local state has been reflected to the server
    pub sync_status: SyncStatus,
}

impl Defect {
    /// Mark a defect on an item at a normalized template position.
    ///
    /// Returns `InvalidInput` when the position falls outside the unit square.
    pub fn new(item_id: ItemId, defect_type_id: ServerId, x: f64, y: f64) -> crate::Result<Self> {
        if !(0.0..=1.0).contains(&x) || !(0.0..=1.0).contains(&y) {
            return Err(Error::InvalidInput(format!(
                "defect position must be normalized to [0,1], got ({x}, {y})"
            )));
        }
        Ok(Self {
            id: DefectId::new(),
            server_id: None,
            item_id,
            item_server_id: None,
            defect_type_id,
            x,
            y,
            severity: None,
            note: None,
            created_at: chrono::Utc::now().timestamp_millis(),
            sync_status: SyncStatus::Pending,
        })
    }

    /// Attach a severity grading
    #[must_use]
    pub const fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Attach a free-form note
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defect_new_validates_position() {
        let item = ItemId::new();
        assert!(Defect::new(item, 1, 0.5, 0.5).is_ok());
        assert!(Defect::new(item, 1, 0.0, 1.0).is_ok());
        assert!(Defect::new(item, 1, -0.1, 0.5).is_err());
        assert!(Defect::new(item, 1, 0.5, 1.01).is_err());
    }

    #[test]
    fn test_defect_builders() {
        let defect = Defect::new(ItemId::new(), 2, 0.25, 0.75)
            .unwrap()
            .with_severity(Severity::Major)
            .with_note("scratch near the hinge");
        assert_eq!(defect.severity, Some(Severity::Major));
        assert_eq!(defect.note.as_deref(), Some("scratch near the hinge"));
    }

    #[test]
    fn test_severity_roundtrip() {
        for severity in [Severity::Minor, Severity::Major, Severity::Critical] {
            let parsed: Severity = severity.as_str().parse().unwrap();
            assert_eq!(parsed, severity);
        }
    }
}
