//! blemish-core - Core library for Blemish
//!
//! This crate contains the shared models, local store, and offline sync
//! subsystem used by all Blemish interfaces (tablet, kiosk, CLI).

pub mod db;
pub mod error;
pub mod models;
pub mod service;
pub mod state;
pub mod sync;

pub use error::{Error, Result};
pub use models::{Defect, DefectId, InspectionItem, ItemId, Session, SessionId};
pub use service::InspectionService;
pub use state::SyncState;
