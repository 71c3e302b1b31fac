//! Data models for Blemish

mod catalog;
mod defect;
mod item;
mod operation;
mod session;

pub use catalog::{DefectType, Product, Workstation};
pub use defect::{Defect, DefectId, Severity};
pub use item::{InspectionItem, ItemId, ItemStatus};
pub use operation::{EntityKind, OpKind, SyncOperation, SyncStatus, MAX_ATTEMPTS};
pub use session::{Session, SessionId, SessionStatus};

/// Server-assigned identifier, present once an entity has been created remotely.
pub type ServerId = i64;
