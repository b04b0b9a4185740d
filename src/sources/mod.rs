//! Upstream data adapters.
//!
//! Fetch failures never escape this module as errors: every adapter folds
//! transport problems, bad statuses and malformed payloads into
//! [`RawObservation::Unavailable`]. The next scheduled cycle is the retry.

pub mod node_rpc;
pub mod ticker;

pub use node_rpc::NodeRpcClient;
pub use ticker::TickerClient;

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use crate::types::{RawObservation, Source};

pub const DEFAULT_NODE_URL: &str = "https://node.xelis.io/json_rpc";
pub const DEFAULT_TICKER_URL: &str = "https://api.coinpaprika.com/v1/tickers/xel-xelis";

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected status code: {0}")]
    Status(u16),
    #[error("Malformed response: {0}")]
    Malformed(String),
    #[error("RPC error: {0}")]
    Rpc(String),
    #[error("Missing field: {0}")]
    MissingField(String),
}

#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(&self, source: &Source) -> RawObservation;
}

#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub node_url: String,
    pub ticker_url: String,
    pub timeout: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            node_url: DEFAULT_NODE_URL.to_string(),
            ticker_url: DEFAULT_TICKER_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Node RPC and price ticker over one shared HTTP client.
pub struct HttpDataSource {
    node: NodeRpcClient,
    ticker: TickerClient,
}

impl HttpDataSource {
    pub fn new(config: &SourceConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            node: NodeRpcClient::new(client.clone(), &config.node_url),
            ticker: TickerClient::new(client, &config.ticker_url),
        })
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    async fn fetch(&self, source: &Source) -> RawObservation {
        match source {
            Source::NodeRpc { method } => self.node.fetch(method).await,
            Source::Price => self.ticker.fetch().await,
        }
    }
}
