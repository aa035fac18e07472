//! HTTP API client for the irradiance server

use crate::api::{endpoints, types::*};
use crate::error::{CliError, Result};
use irradiance_common::Tier;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use uuid::Uuid;

/// Default timeout for API requests in seconds.
/// Can be overridden via IRRADIANCE_API_TIMEOUT_SECS.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Header the server's caller gate reads
pub const USER_ID_HEADER: &str = "x-user-id";

pub struct ApiClient {
    client: Client,
    base_url: String,
    user: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, user: Option<String>) -> Result<Self> {
        let timeout_secs = std::env::var("IRRADIANCE_API_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_API_TIMEOUT_SECS);

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn with_caller(&self, request: RequestBuilder) -> RequestBuilder {
        match self.user {
            Some(ref user) => request.header(USER_ID_HEADER, user),
            None => request,
        }
    }

    /// Check server health
    pub async fn health_check(&self) -> Result<bool> {
        let url = endpoints::health_url(&self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Resolve a coordinate, returning the server's JSON verbatim
    pub async fn resolve(
        &self,
        lat: f64,
        lon: f64,
        tier: Option<Tier>,
        dataset: Option<&str>,
        version_id: Option<Uuid>,
    ) -> Result<serde_json::Value> {
        let url = endpoints::resolve_url(&self.base_url, tier);
        let mut body = serde_json::json!({ "lat": lat, "lon": lon });
        if let Some(dataset) = dataset {
            body["dataset"] = dataset.into();
        }
        if let Some(version_id) = version_id {
            body["version_id"] = version_id.to_string().into();
        }

        let response = self
            .with_caller(self.client.post(&url).json(&body))
            .send()
            .await?;
        decode(response).await
    }

    /// Send one import action
    pub async fn import<T: DeserializeOwned>(&self, action: &ImportAction<'_>) -> Result<T> {
        let url = endpoints::imports_url(&self.base_url);
        let response = self
            .with_caller(self.client.post(&url).json(action))
            .send()
            .await?;
        decode(response).await
    }

    pub async fn list_datasets(&self) -> Result<Vec<DatasetSummary>> {
        let url = endpoints::datasets_url(&self.base_url);
        let response = self.with_caller(self.client.get(&url)).send().await?;
        let envelope: ApiResponse<Vec<DatasetSummary>> = decode(response).await?;

        if !envelope.success {
            return Err(CliError::api("Dataset listing reported failure"));
        }

        Ok(envelope.data)
    }
}

/// Decode a success body, or turn an error body into [`CliError::Server`]
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if status.is_success() {
        return Ok(serde_json::from_slice(&bytes)?);
    }

    match serde_json::from_slice::<ErrorBody>(&bytes) {
        Ok(body) => Err(CliError::Server {
            status: status.as_u16(),
            code: body.code.unwrap_or_else(|| "UNKNOWN".to_string()),
            message: body.error,
        }),
        Err(_) => Err(CliError::api(format!(
            "HTTP {} with body '{}'",
            status,
            String::from_utf8_lossy(&bytes).chars().take(200).collect::<String>()
        ))),
    }
}
