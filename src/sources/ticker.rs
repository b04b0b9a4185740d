use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use super::FetchError;
use crate::types::{lookup_path, RawObservation};

const PRICE_PATH: &str = "quotes.USD.price";

/// Price ticker (coinpaprika style `quotes.USD.price`).
pub struct TickerClient {
    client: Client,
    url: String,
}

impl TickerClient {
    pub fn new(client: Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }

    pub async fn price(&self) -> Result<f64, FetchError> {
        let response = self.client.get(&self.url).send().await?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))?;

        lookup_path(&body, PRICE_PATH)
            .and_then(Value::as_f64)
            .ok_or_else(|| FetchError::MissingField(PRICE_PATH.to_string()))
    }

    pub async fn fetch(&self) -> RawObservation {
        match self.price().await {
            Ok(price) => {
                debug!("Fetched price {}", price);
                RawObservation::Available(Value::from(price))
            }
            Err(e) => {
                warn!("Failed to fetch price data: {}", e);
                RawObservation::unavailable(e.to_string())
            }
        }
    }
}
