use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::derive::{derive, DeriveContext};
use crate::error::{Error, Result};
use crate::platform::{Platform, PlatformError};
use crate::reconciler::{ReconcileError, ReconcileOutcome, Reconciler};
use crate::registry::SlotRegistry;
use crate::sources::DataSource;
use crate::types::{MetricSpec, RawObservation, Source};

pub const DEFAULT_CATEGORY_TITLE: &str = "XELIS STATS";

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Sleep between the end of one cycle and the start of the next.
    pub interval: Duration,
    /// Static name given to the category once at startup.
    pub container_title: String,
    /// How often readiness is re-checked while the platform is unreachable.
    pub ready_poll: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(400),
            container_title: DEFAULT_CATEGORY_TITLE.to_string(),
            ready_poll: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    AwaitReady,
    Running,
}

/// Tally of one pass over the metrics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub cycle: u64,
    pub started_at: DateTime<Utc>,
    pub created: usize,
    pub renamed: usize,
    pub unchanged: usize,
    pub abandoned: usize,
    /// Metrics whose upstream fetch failed and were shown as `N/A`.
    pub unavailable: usize,
}

impl CycleReport {
    pub fn processed(&self) -> usize {
        self.created + self.renamed + self.unchanged + self.abandoned
    }
}

/// Single worker that polls, derives and reconciles every metric on a fixed interval.
pub struct StatsScheduler {
    metrics: Vec<MetricSpec>,
    sources: Arc<dyn DataSource>,
    platform: Arc<dyn Platform>,
    reconciler: Reconciler,
    registry: SlotRegistry,
    config: SchedulerConfig,
    cancel: CancellationToken,
    state: SchedulerState,
    cycles: u64,
}

impl StatsScheduler {
    pub fn new(
        metrics: Vec<MetricSpec>,
        sources: Arc<dyn DataSource>,
        platform: Arc<dyn Platform>,
        reconciler: Reconciler,
        registry: SlotRegistry,
        config: SchedulerConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            metrics,
            sources,
            platform,
            reconciler,
            registry,
            config,
            cancel,
            state: SchedulerState::AwaitReady,
            cycles: 0,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn registry(&self) -> &SlotRegistry {
        &self.registry
    }

    /// Block until the platform answers, then switch to `Running`.
    ///
    /// Returns `Ok(false)` if shutdown was requested first. A rejected
    /// credential is fatal since retrying cannot fix it.
    pub async fn wait_until_ready(&mut self) -> Result<bool> {
        loop {
            let mut wait = self.config.ready_poll;
            match self.platform.current_user().await {
                Ok(user) => {
                    info!("Logged in as {}", user);
                    self.state = SchedulerState::Running;
                    return Ok(true);
                }
                Err(e @ PlatformError::Unauthorized(_)) => return Err(Error::Platform(e)),
                Err(PlatformError::RateLimited { retry_after }) => {
                    wait = wait.max(retry_after.unwrap_or_default());
                    warn!("Rate limited while waiting for the platform, retrying in {:?}", wait);
                }
                Err(e) => warn!("Platform not ready yet: {}", e),
            }

            tokio::select! {
                _ = self.cancel.cancelled() => return Ok(false),
                _ = sleep(wait) => {}
            }
        }
    }

    /// Best effort: failures are logged and never stop the update loop.
    pub async fn label_container(&self) {
        let title = &self.config.container_title;
        match self.reconciler.label_container(title).await {
            Ok(true) => info!("Category name set to {}", title),
            Ok(false) => info!("Category already named {}", title),
            Err(e) => error!("Failed to set category name to {}: {}", title, e),
        }
    }

    /// One pass over every metric in configured order.
    ///
    /// Failures stay with the metric that hit them. Each upstream source is
    /// fetched at most once per cycle.
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.cycles += 1;
        let mut report = CycleReport {
            cycle: self.cycles,
            started_at: Utc::now(),
            ..Default::default()
        };
        info!(cycle = report.cycle, "update channels");

        let mut observations: HashMap<Source, RawObservation> = HashMap::new();

        for spec in &self.metrics {
            if self.cancel.is_cancelled() {
                break;
            }

            let observation = observe(self.sources.as_ref(), &mut observations, &spec.source).await;
            if !observation.is_available() {
                report.unavailable += 1;
            }

            let ctx = if spec.needs_price() {
                let price = observe(self.sources.as_ref(), &mut observations, &Source::Price).await;
                DeriveContext::with_price(price.as_f64())
            } else {
                DeriveContext::default()
            };

            let label = derive(spec, &observation, &ctx);

            match self.reconciler.reconcile(&mut self.registry, &spec.name, &label).await {
                Ok(ReconcileOutcome::Created(_)) => report.created += 1,
                Ok(ReconcileOutcome::Renamed(_)) => report.renamed += 1,
                Ok(ReconcileOutcome::Unchanged(_)) => report.unchanged += 1,
                Err(ReconcileError::Cancelled) => break,
                Err(e) => {
                    error!(metric = %spec.name, "Error creating/updating channel: {}", e);
                    report.abandoned += 1;
                }
            }
        }

        info!(
            cycle = report.cycle,
            processed = report.processed(),
            created = report.created,
            renamed = report.renamed,
            unchanged = report.unchanged,
            abandoned = report.abandoned,
            unavailable = report.unavailable,
            "Update cycle finished"
        );
        report
    }

    /// `AWAIT_READY -> RUNNING`, then cycle until the cancellation token fires.
    pub async fn run(mut self) -> Result<()> {
        if !self.wait_until_ready().await? {
            info!("Shutdown requested before the platform was ready");
            return Ok(());
        }

        self.label_container().await;

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            if AssertUnwindSafe(self.run_cycle()).catch_unwind().await.is_err() {
                error!("Update cycle panicked, continuing with the next one");
            }

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = sleep(self.config.interval) => {}
            }
        }

        info!("Stats scheduler stopped");
        Ok(())
    }
}

async fn observe(
    sources: &dyn DataSource,
    memo: &mut HashMap<Source, RawObservation>,
    source: &Source,
) -> RawObservation {
    if let Some(observation) = memo.get(source) {
        return observation.clone();
    }
    let observation = sources.fetch(source).await;
    memo.insert(source.clone(), observation.clone());
    observation
}
