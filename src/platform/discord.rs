use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::time::Duration;
use tracing::debug;

use super::{Platform, PlatformError, RemoteSlot};
use crate::types::SlotId;

pub const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Discord channel type for voice channels, which show their name in the
/// sidebar without letting anyone post.
const GUILD_VOICE: u8 = 2;

#[derive(Clone)]
pub struct DiscordConfig {
    pub token: String,
    pub guild_id: SlotId,
    pub api_base: String,
    pub timeout: Duration,
}

impl DiscordConfig {
    pub fn new(token: &str, guild_id: SlotId) -> Self {
        Self {
            token: token.to_string(),
            guild_id,
            api_base: DISCORD_API_BASE.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &"<redacted>")
            .field("guild_id", &self.guild_id)
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ChannelPayload {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    parent_id: Option<String>,
}

impl ChannelPayload {
    fn into_slot(self) -> Result<RemoteSlot, PlatformError> {
        let id = self
            .id
            .parse()
            .map_err(|_| PlatformError::Decode(format!("channel id {:?}", self.id)))?;
        Ok(RemoteSlot {
            id,
            name: self.name.unwrap_or_default(),
            parent_id: self.parent_id.and_then(|parent| parent.parse().ok()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    username: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    retry_after: Option<f64>,
}

/// Minimal Discord REST client: bot auth, channel reads, renames and creates.
pub struct DiscordClient {
    client: Client,
    config: DiscordConfig,
}

impl DiscordClient {
    pub fn new(config: DiscordConfig) -> Result<Self, PlatformError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.config.api_base, path))
            .header(AUTHORIZATION, format!("Bot {}", self.config.token))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, PlatformError> {
        let response = builder.send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }

    async fn get_channel(&self, id: SlotId) -> Result<Option<RemoteSlot>, PlatformError> {
        let path = format!("/channels/{}", id);
        match self.send(self.request(Method::GET, &path)).await {
            Ok(response) => {
                let payload: ChannelPayload = response
                    .json()
                    .await
                    .map_err(|e| PlatformError::Decode(e.to_string()))?;
                payload.into_slot().map(Some)
            }
            Err(PlatformError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn rename_channel(&self, id: SlotId, name: &str) -> Result<(), PlatformError> {
        let path = format!("/channels/{}", id);
        self.send(self.request(Method::PATCH, &path).json(&json!({ "name": name })))
            .await?;
        debug!(slot_id = %id, "Renamed channel to {}", name);
        Ok(())
    }
}

#[async_trait]
impl Platform for DiscordClient {
    async fn current_user(&self) -> Result<String, PlatformError> {
        let response = self.send(self.request(Method::GET, "/users/@me")).await?;
        let user: UserPayload = response
            .json()
            .await
            .map_err(|e| PlatformError::Decode(e.to_string()))?;
        Ok(user.username)
    }

    async fn get_container(&self, id: SlotId) -> Result<Option<RemoteSlot>, PlatformError> {
        self.get_channel(id).await
    }

    async fn rename_container(&self, id: SlotId, name: &str) -> Result<(), PlatformError> {
        self.rename_channel(id, name).await
    }

    async fn get_slot(&self, id: SlotId) -> Result<Option<RemoteSlot>, PlatformError> {
        self.get_channel(id).await
    }

    async fn rename_slot(&self, id: SlotId, name: &str) -> Result<(), PlatformError> {
        self.rename_channel(id, name).await
    }

    async fn create_slot(&self, container: SlotId, name: &str) -> Result<SlotId, PlatformError> {
        let path = format!("/guilds/{}/channels", self.config.guild_id);
        let body = json!({
            "name": name,
            "type": GUILD_VOICE,
            "parent_id": container.to_string(),
        });

        let response = self.send(self.request(Method::POST, &path).json(&body)).await?;
        let payload: ChannelPayload = response
            .json()
            .await
            .map_err(|e| PlatformError::Decode(e.to_string()))?;
        Ok(payload.into_slot()?.id)
    }
}

async fn error_from_response(response: Response) -> PlatformError {
    let status = response.status();
    let header = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let text = response.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();

    match status {
        StatusCode::TOO_MANY_REQUESTS => PlatformError::RateLimited {
            retry_after: parse_retry_after(header.as_deref(), body.retry_after),
        },
        StatusCode::NOT_FOUND => PlatformError::NotFound,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            PlatformError::Unauthorized(body.message.unwrap_or_else(|| status.to_string()))
        }
        _ => PlatformError::Api {
            status: status.as_u16(),
            message: body.message.unwrap_or(text),
        },
    }
}

/// Advised wait from the `Retry-After` header, else the JSON body's
/// `retry_after`, rounded up to whole seconds.
pub fn parse_retry_after(header: Option<&str>, body_secs: Option<f64>) -> Option<Duration> {
    header
        .and_then(|value| value.trim().parse::<f64>().ok())
        .or(body_secs)
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(|secs| Duration::from_secs(secs.ceil() as u64))
}
