//! CLI configuration via clap.

use clap::Parser;
use std::time::Duration;

use crate::platform::DiscordConfig;
use crate::reconciler::ReconcilerConfig;
use crate::scheduler::SchedulerConfig;
use crate::sources::{SourceConfig, DEFAULT_NODE_URL, DEFAULT_TICKER_URL};
use crate::types::SlotId;

#[derive(Parser, Clone)]
#[command(name = "xelis-stats-bot")]
#[command(about = "Keeps XELIS network stats in the names of Discord channels")]
pub struct Config {
    /// Discord bot token
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Guild the stats channels live in
    #[arg(long, env = "GUILD_ID", default_value = "985624643576672256")]
    pub guild_id: u64,

    /// Category the stats channels are created under
    #[arg(long, env = "CATEGORY_ID", default_value = "1270450616988340244")]
    pub category_id: u64,

    /// Name given to the category at startup
    #[arg(long, env = "CATEGORY_TITLE", default_value = "XELIS STATS")]
    pub category_title: String,

    /// Node JSON-RPC endpoint
    #[arg(long, env = "XELIS_NODE_URL", default_value = DEFAULT_NODE_URL)]
    pub node_url: String,

    /// Price ticker endpoint
    #[arg(long, env = "PRICE_TICKER_URL", default_value = DEFAULT_TICKER_URL)]
    pub ticker_url: String,

    /// SQLite file holding channel ids
    #[arg(long, env = "DATABASE_PATH", default_value = "channels.db")]
    pub database: String,

    /// Seconds between update cycles
    #[arg(long, env = "UPDATE_INTERVAL_SECS", default_value = "400")]
    pub interval_secs: u64,

    /// Retries after a rate-limit response before skipping a channel for the cycle
    #[arg(long, default_value = "1")]
    pub rate_limit_retries: u32,

    /// Backoff when a rate-limit response has no retry hint
    #[arg(long, default_value = "60")]
    pub default_retry_after_secs: u64,

    /// Timeout for every outgoing HTTP request
    #[arg(long, default_value = "10")]
    pub http_timeout_secs: u64,
}

impl Config {
    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            interval: Duration::from_secs(self.interval_secs),
            container_title: self.category_title.clone(),
            ..Default::default()
        }
    }

    pub fn reconciler(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            container: SlotId(self.category_id),
            rate_limit_retries: self.rate_limit_retries,
            default_retry_after: Duration::from_secs(self.default_retry_after_secs),
        }
    }

    pub fn discord(&self) -> DiscordConfig {
        DiscordConfig {
            timeout: Duration::from_secs(self.http_timeout_secs),
            ..DiscordConfig::new(&self.token, SlotId(self.guild_id))
        }
    }

    pub fn sources(&self) -> SourceConfig {
        SourceConfig {
            node_url: self.node_url.clone(),
            ticker_url: self.ticker_url.clone(),
            timeout: Duration::from_secs(self.http_timeout_secs),
        }
    }
}
