//! Local store for Blemish

mod connection;
mod migrations;
mod queue;
mod repository;

pub use connection::Database;
pub use queue::{OperationQueue, SqliteOperationQueue};
pub use repository::{
    CatalogRepository, DefectRepository, ItemRepository, SessionRepository,
    SqliteCatalogRepository, SqliteDefectRepository, SqliteItemRepository,
    SqliteSessionRepository,
};
