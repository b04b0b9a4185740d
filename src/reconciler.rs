use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::platform::{Platform, PlatformError};
use crate::registry::SlotRegistry;
use crate::types::{FormattedLabel, SlotId};

pub const DEFAULT_CATEGORY_ID: SlotId = SlotId(1270450616988340244);

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
    #[error("Still rate limited after {attempts} attempts")]
    RateLimitExhausted { attempts: u32 },
    #[error("Shutdown requested")]
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Category every slot is created under.
    pub container: SlotId,
    /// Extra attempts after a rate-limit response before giving up on the cycle.
    pub rate_limit_retries: u32,
    /// Wait used when a rate-limit response carries no hint.
    pub default_retry_after: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            container: DEFAULT_CATEGORY_ID,
            rate_limit_retries: 1,
            default_retry_after: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The slot already showed the label; no write was made.
    Unchanged(SlotId),
    Renamed(SlotId),
    Created(SlotId),
}

impl ReconcileOutcome {
    pub fn slot_id(&self) -> SlotId {
        match self {
            ReconcileOutcome::Unchanged(id) | ReconcileOutcome::Renamed(id) | ReconcileOutcome::Created(id) => *id,
        }
    }
}

/// Makes exactly one remote slot per metric carry the metric's current label.
pub struct Reconciler {
    platform: Arc<dyn Platform>,
    config: ReconcilerConfig,
    cancel: CancellationToken,
}

impl Reconciler {
    pub fn new(platform: Arc<dyn Platform>, config: ReconcilerConfig, cancel: CancellationToken) -> Self {
        Self {
            platform,
            config,
            cancel,
        }
    }

    /// Create or rename the slot bound to `name` so it shows `label`.
    ///
    /// A rate-limit response suspends this metric for the advised wait and
    /// retries up to `rate_limit_retries` times; after that the metric is left
    /// for the next cycle. The registry is only written after a create the
    /// platform confirmed.
    pub async fn reconcile(
        &self,
        registry: &mut SlotRegistry,
        name: &str,
        label: &FormattedLabel,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.try_reconcile(registry, name, label.as_str()).await {
                Ok(outcome) => return Ok(outcome),
                Err(PlatformError::RateLimited { retry_after }) => {
                    self.wait_out_rate_limit(name, attempts, retry_after).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn try_reconcile(
        &self,
        registry: &mut SlotRegistry,
        name: &str,
        label: &str,
    ) -> Result<ReconcileOutcome, PlatformError> {
        if let Some(id) = registry.lookup(name) {
            match self.platform.get_slot(id).await? {
                Some(slot) if slot.name == label => {
                    debug!(metric = name, slot_id = %id, "Channel already up to date");
                    return Ok(ReconcileOutcome::Unchanged(id));
                }
                Some(_) => {
                    self.platform.rename_slot(id, label).await?;
                    info!(metric = name, slot_id = %id, "Updated channel to {}", label);
                    return Ok(ReconcileOutcome::Renamed(id));
                }
                None => {
                    warn!(metric = name, slot_id = %id, "Bound channel no longer exists, creating a new one");
                }
            }
        }

        let id = self.platform.create_slot(self.config.container, label).await?;
        info!(metric = name, slot_id = %id, "Created channel {}", label);

        if let Err(e) = registry.record(name, id).await {
            warn!(metric = name, slot_id = %id, "Channel binding kept in memory only: {}", e);
        }
        Ok(ReconcileOutcome::Created(id))
    }

    /// Give the container its static title. Returns whether a rename was sent.
    pub async fn label_container(&self, title: &str) -> Result<bool, ReconcileError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.try_label_container(title).await {
                Ok(renamed) => return Ok(renamed),
                Err(PlatformError::RateLimited { retry_after }) => {
                    self.wait_out_rate_limit("category", attempts, retry_after).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn try_label_container(&self, title: &str) -> Result<bool, PlatformError> {
        let container = self.config.container;
        match self.platform.get_container(container).await? {
            Some(current) if current.name == title => Ok(false),
            Some(_) => {
                self.platform.rename_container(container, title).await?;
                Ok(true)
            }
            None => Err(PlatformError::NotFound),
        }
    }

    async fn wait_out_rate_limit(
        &self,
        name: &str,
        attempts: u32,
        retry_after: Option<Duration>,
    ) -> Result<(), ReconcileError> {
        if attempts > self.config.rate_limit_retries {
            warn!(metric = name, attempts, "Still rate limited, leaving it for the next cycle");
            return Err(ReconcileError::RateLimitExhausted { attempts });
        }

        let wait = retry_after.unwrap_or(self.config.default_retry_after);
        warn!(metric = name, retry_after_secs = wait.as_secs(), "Rate limited, retrying after backoff");

        tokio::select! {
            _ = self.cancel.cancelled() => Err(ReconcileError::Cancelled),
            _ = sleep(wait) => Ok(()),
        }
    }
}
