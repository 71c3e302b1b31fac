//! Server-owned reference data cached locally for offline availability

use serde::{Deserialize, Serialize};

use super::ServerId;

/// A product that can be inspected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Server identifier (catalogs are server-owned, never created locally)
    pub id: ServerId,
    /// Display name
    pub name: String,
    /// Reference to the template image defects are positioned on
    pub template_ref: Option<String>,
}

/// A workstation inspections run at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workstation {
    /// Server identifier
    pub id: ServerId,
    /// Display name
    pub name: String,
}

/// A defect classification selectable when marking a flaw
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefectType {
    /// Server identifier
    pub id: ServerId,
    /// Display label
    pub label: String,
    /// Display color hint (hex), when the server provides one
    pub color: Option<String>,
}
