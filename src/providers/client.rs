use crate::providers::error::{ServiceError, ServiceResult};
use anyhow::{Context, Result};
use serde_json::Value;
use std::time::Duration;

/// Shared HTTP client behind every provider adapter.
///
/// Cloning is cheap; all clones reuse the same connection pool.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    http: reqwest::Client,
}

impl ProviderClient {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("failed to build provider HTTP client")?;
        Ok(Self { http })
    }

    /// Fetches `url` and decodes the body as JSON.
    ///
    /// Transport failures (timeouts included) and non-success statuses map to
    /// [`ServiceError::Network`]; a body that fails to decode maps to
    /// [`ServiceError::NoData`].
    pub async fn get_json(&self, url: &str) -> ServiceResult<Value> {
        self.dispatch(self.http.get(url)).await
    }

    /// Same as [`ProviderClient::get_json`] with one extra request header.
    pub async fn get_json_with_header(
        &self,
        url: &str,
        header_name: &str,
        header_value: &str,
    ) -> ServiceResult<Value> {
        self.dispatch(self.http.get(url).header(header_name, header_value))
            .await
    }

    async fn dispatch(&self, request: reqwest::RequestBuilder) -> ServiceResult<Value> {
        let response = request
            .send()
            .await
            .map_err(|err| ServiceError::network(format!("request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::network(format!(
                "response has error code: {}",
                status.as_u16()
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|_| ServiceError::no_data("unable to parse JSON"))
    }
}
