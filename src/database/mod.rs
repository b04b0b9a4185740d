pub mod migrations;
pub mod repository;

pub use migrations::*;
pub use repository::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Slot id {0} does not fit the channels table")]
    IdOutOfRange(u64),
}
