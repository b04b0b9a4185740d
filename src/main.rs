use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use xelis_stats_bot::catalog::default_metrics;
use xelis_stats_bot::config::Config;
use xelis_stats_bot::database::SlotRepository;
use xelis_stats_bot::platform::DiscordClient;
use xelis_stats_bot::reconciler::Reconciler;
use xelis_stats_bot::registry::SlotRegistry;
use xelis_stats_bot::scheduler::StatsScheduler;
use xelis_stats_bot::sources::HttpDataSource;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    info!(
        guild_id = config.guild_id,
        category_id = config.category_id,
        interval_secs = config.interval_secs,
        "starting xelis stats bot"
    );

    let repository = Arc::new(SlotRepository::open(&config.database).await?);
    let registry = SlotRegistry::load(repository.clone()).await?;
    info!("✅ Slot registry ready with {} channels", registry.len());

    let platform = Arc::new(DiscordClient::new(config.discord())?);
    let sources = Arc::new(HttpDataSource::new(&config.sources())?);

    let cancel = CancellationToken::new();
    let reconciler = Reconciler::new(platform.clone(), config.reconciler(), cancel.clone());
    let scheduler = StatsScheduler::new(
        default_metrics(),
        sources,
        platform,
        reconciler,
        registry,
        config.scheduler(),
        cancel.clone(),
    );

    // Shutdown signal handler (SIGINT + SIGTERM).
    let shutdown_cancel = cancel.clone();
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut sigterm = tokio::signal::unix::signal(
                tokio::signal::unix::SignalKind::terminate(),
            )
            .expect("failed to register SIGTERM handler");
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {},
                _ = sigterm.recv() => {},
            }
        }
        #[cfg(not(unix))]
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl+c");
        info!("received shutdown signal, stopping");
        shutdown_cancel.cancel();
    });

    scheduler.run().await?;

    repository.close().await;
    info!("shutdown complete");
    Ok(())
}
