use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::FetchError;
use crate::types::RawObservation;

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

/// JSON-RPC 2.0 client for the node's `json_rpc` endpoint.
pub struct NodeRpcClient {
    client: Client,
    url: String,
}

impl NodeRpcClient {
    pub fn new(client: Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }

    /// Call `method` without params and return its `result` object.
    pub async fn call(&self, method: &str) -> Result<Value, FetchError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "id": 1
        });

        let response = self.client.post(&self.url).json(&payload).send().await?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))?;

        if let Some(error) = body.error {
            return Err(FetchError::Rpc(error.to_string()));
        }

        match body.result {
            Some(result @ Value::Object(_)) => Ok(result),
            Some(other) => Err(FetchError::Malformed(format!("result is not an object: {}", other))),
            None => Err(FetchError::MissingField("result".to_string())),
        }
    }

    pub async fn fetch(&self, method: &str) -> RawObservation {
        match self.call(method).await {
            Ok(result) => {
                debug!("Fetched {} from node", method);
                RawObservation::Available(result)
            }
            Err(e) => {
                warn!("Failed to fetch node data for method {}: {}", method, e);
                RawObservation::unavailable(e.to_string())
            }
        }
    }
}
