use crate::runtime::telemetry;
use anyhow::{bail, Result};
use std::time::Duration;

const DEFAULT_POOL_SIZE: usize = 2;
const DEFAULT_JOB_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_IP_API_URL: &str = "http://ip-api.com/json";
const DEFAULT_RDAP_URL: &str = "https://rdap.org";
const DEFAULT_PING_URL: &str = "https://api.viewdns.info/ping/";
const DEFAULT_VIRUS_TOTAL_URL: &str = "https://www.virustotal.com/api/v3/domains";

/// Runtime configuration for the lookup dispatcher.
///
/// All instances must be constructed via [`DispatchConfig::builder`] or
/// [`DispatchConfig::new`] so invariants are validated before any consumer
/// observes the values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    pool_size: usize,
    job_timeout: Duration,
    request_timeout: Duration,
    metrics_interval: Duration,
    ip_api_url: String,
    rdap_url: String,
    ping_url: String,
    virus_total_url: String,
    ping_api_key: Option<String>,
    virus_total_api_key: Option<String>,
}

pub struct DispatchConfigParams {
    pub pool_size: usize,
    pub job_timeout: Duration,
    pub request_timeout: Duration,
    pub metrics_interval: Duration,
    pub ip_api_url: String,
    pub rdap_url: String,
    pub ping_url: String,
    pub virus_total_url: String,
    pub ping_api_key: Option<String>,
    pub virus_total_api_key: Option<String>,
}

impl DispatchConfig {
    /// Returns a builder to incrementally construct and validate a configuration.
    pub fn builder() -> DispatchConfigBuilder {
        DispatchConfigBuilder::default()
    }

    /// Constructs a configuration directly from the provided values.
    ///
    /// Prefer [`DispatchConfig::builder`] for ergonomics when many values use defaults.
    /// Callers that already have concrete runtime parameters can use this method to enforce
    /// validation without going through the builder.
    pub fn new(params: DispatchConfigParams) -> Result<Self> {
        let DispatchConfigParams {
            pool_size,
            job_timeout,
            request_timeout,
            metrics_interval,
            ip_api_url,
            rdap_url,
            ping_url,
            virus_total_url,
            ping_api_key,
            virus_total_api_key,
        } = params;

        let config = Self {
            pool_size,
            job_timeout,
            request_timeout,
            metrics_interval,
            ip_api_url: trimmed_string(ip_api_url),
            rdap_url: trimmed_string(rdap_url),
            ping_url: trimmed_string(ping_url),
            virus_total_url: trimmed_string(virus_total_url),
            ping_api_key: ping_api_key.map(trimmed_string),
            virus_total_api_key: virus_total_api_key.map(trimmed_string),
        };

        config.validate()?;
        Ok(config)
    }

    /// Number of worker units kept alive by the dispatcher.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Deadline for a single dispatched job before its result is synthesized.
    pub fn job_timeout(&self) -> Duration {
        self.job_timeout
    }

    /// Per-request timeout applied to the provider HTTP client.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Interval used by the telemetry reporter.
    pub fn metrics_interval(&self) -> Duration {
        self.metrics_interval
    }

    /// Base URL for the ip-api geolocation endpoint.
    pub fn ip_api_url(&self) -> &str {
        &self.ip_api_url
    }

    /// Base URL for the RDAP registry endpoint.
    pub fn rdap_url(&self) -> &str {
        &self.rdap_url
    }

    /// Base URL for the ViewDNS ping endpoint.
    pub fn ping_url(&self) -> &str {
        &self.ping_url
    }

    /// Base URL for the VirusTotal domain report endpoint.
    pub fn virus_total_url(&self) -> &str {
        &self.virus_total_url
    }

    /// API key for the ViewDNS ping provider, when configured.
    pub fn ping_api_key(&self) -> Option<&str> {
        self.ping_api_key.as_deref()
    }

    /// API key for the VirusTotal provider, when configured.
    pub fn virus_total_api_key(&self) -> Option<&str> {
        self.virus_total_api_key.as_deref()
    }

    /// Performs validation on an existing configuration instance.
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            bail!("pool_size must be greater than 0");
        }

        if self.job_timeout.is_zero() {
            bail!("job_timeout must be greater than 0");
        }

        if self.request_timeout.is_zero() {
            bail!("request_timeout must be greater than 0");
        }

        if self.metrics_interval.is_zero() {
            bail!("metrics_interval must be greater than 0");
        }

        validate_url(&self.ip_api_url, "ip_api_url")?;
        validate_url(&self.rdap_url, "rdap_url")?;
        validate_url(&self.ping_url, "ping_url")?;
        validate_url(&self.virus_total_url, "virus_total_url")?;

        if let Some(key) = &self.ping_api_key {
            ensure_not_empty(key, "ping_api_key")?;
        }

        if let Some(key) = &self.virus_total_api_key {
            ensure_not_empty(key, "virus_total_api_key")?;
        }

        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct DispatchConfigBuilder {
    pool_size: Option<usize>,
    job_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
    metrics_interval: Option<Duration>,
    ip_api_url: Option<String>,
    rdap_url: Option<String>,
    ping_url: Option<String>,
    virus_total_url: Option<String>,
    ping_api_key: Option<String>,
    virus_total_api_key: Option<String>,
}

impl DispatchConfigBuilder {
    pub fn pool_size(mut self, count: usize) -> Self {
        self.pool_size = Some(count);
        self
    }

    pub fn job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = Some(timeout);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn metrics_interval(mut self, interval: Duration) -> Self {
        self.metrics_interval = Some(interval);
        self
    }

    pub fn ip_api_url(mut self, url: impl Into<String>) -> Self {
        self.ip_api_url = Some(url.into());
        self
    }

    pub fn rdap_url(mut self, url: impl Into<String>) -> Self {
        self.rdap_url = Some(url.into());
        self
    }

    pub fn ping_url(mut self, url: impl Into<String>) -> Self {
        self.ping_url = Some(url.into());
        self
    }

    pub fn virus_total_url(mut self, url: impl Into<String>) -> Self {
        self.virus_total_url = Some(url.into());
        self
    }

    pub fn ping_api_key(mut self, key: impl Into<String>) -> Self {
        self.ping_api_key = Some(key.into());
        self
    }

    pub fn virus_total_api_key(mut self, key: impl Into<String>) -> Self {
        self.virus_total_api_key = Some(key.into());
        self
    }

    pub fn build(self) -> Result<DispatchConfig> {
        let params = DispatchConfigParams {
            pool_size: self.pool_size.unwrap_or(DEFAULT_POOL_SIZE),
            job_timeout: self
                .job_timeout
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_JOB_TIMEOUT_SECS)),
            request_timeout: self
                .request_timeout
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
            metrics_interval: self
                .metrics_interval
                .unwrap_or(telemetry::DEFAULT_METRICS_INTERVAL),
            ip_api_url: self
                .ip_api_url
                .unwrap_or_else(|| DEFAULT_IP_API_URL.to_owned()),
            rdap_url: self.rdap_url.unwrap_or_else(|| DEFAULT_RDAP_URL.to_owned()),
            ping_url: self.ping_url.unwrap_or_else(|| DEFAULT_PING_URL.to_owned()),
            virus_total_url: self
                .virus_total_url
                .unwrap_or_else(|| DEFAULT_VIRUS_TOTAL_URL.to_owned()),
            ping_api_key: self.ping_api_key,
            virus_total_api_key: self.virus_total_api_key,
        };

        DispatchConfig::new(params)
    }
}

fn trimmed_string(value: String) -> String {
    value.trim().to_owned()
}

fn ensure_not_empty(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("{field} cannot be empty");
    }
    Ok(())
}

fn validate_url(url: &str, field: &str) -> Result<()> {
    let url = url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!("{field} must start with http:// or https://");
    }
    Ok(())
}
