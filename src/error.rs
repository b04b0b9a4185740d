//! Errors surfaced to the binary. Everything below the scheduler is handled
//! per metric and per cycle; only startup problems end up here.

use thiserror::Error;

use crate::platform::PlatformError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}

pub type Result<T> = std::result::Result<T, Error>;
