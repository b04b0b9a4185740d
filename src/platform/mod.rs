//! The chat platform whose channel names display the metrics.

pub mod discord;

pub use discord::{DiscordClient, DiscordConfig};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::types::SlotId;

#[derive(Error, Debug)]
pub enum PlatformError {
    /// HTTP 429. `retry_after` is the platform's advised wait, if it sent one.
    #[error("Rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },
    #[error("Not found")]
    NotFound,
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid response: {0}")]
    Decode(String),
}

impl PlatformError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, PlatformError::RateLimited { .. })
    }
}

/// A channel or category as seen on the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSlot {
    pub id: SlotId,
    pub name: String,
    pub parent_id: Option<SlotId>,
}

#[async_trait]
pub trait Platform: Send + Sync {
    /// Name of the authenticated account; succeeds once the session is usable.
    async fn current_user(&self) -> Result<String, PlatformError>;

    /// `None` when the container no longer exists.
    async fn get_container(&self, id: SlotId) -> Result<Option<RemoteSlot>, PlatformError>;

    async fn rename_container(&self, id: SlotId, name: &str) -> Result<(), PlatformError>;

    /// `None` when the slot no longer exists.
    async fn get_slot(&self, id: SlotId) -> Result<Option<RemoteSlot>, PlatformError>;

    async fn rename_slot(&self, id: SlotId, name: &str) -> Result<(), PlatformError>;

    /// Create a slot named `name` under `container` and return its id.
    async fn create_slot(&self, container: SlotId, name: &str) -> Result<SlotId, PlatformError>;
}
