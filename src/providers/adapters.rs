//! Adapters for the supported lookup providers. Each adapter receives a
//! validated, scheme-stripped domain and returns the provider's JSON payload
//! or a typed failure.

use crate::providers::client::ProviderClient;
use crate::providers::error::{ServiceError, ServiceResult};
use crate::workers::validate::is_ip_address;
use futures::future::BoxFuture;
use serde_json::{Map, Value};

/// A single external information source.
///
/// Implementations must be infallible in the panic sense: every recoverable
/// failure comes back as a [`ServiceError`] so the calling worker can report
/// it instead of dying.
pub trait ProviderAdapter: Send + Sync {
    fn fetch<'a>(&'a self, domain: &'a str) -> BoxFuture<'a, ServiceResult<Value>>;
}

/// Geolocation lookup backed by ip-api.com. Returns the payload unchanged.
pub struct IpApiProvider {
    client: ProviderClient,
    base_url: String,
}

impl IpApiProvider {
    pub fn new(client: ProviderClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn lookup(&self, domain: &str) -> ServiceResult<Value> {
        let url = format!("{}/{domain}", self.base_url.trim_end_matches('/'));
        self.client.get_json(&url).await
    }
}

impl ProviderAdapter for IpApiProvider {
    fn fetch<'a>(&'a self, domain: &'a str) -> BoxFuture<'a, ServiceResult<Value>> {
        Box::pin(self.lookup(domain))
    }
}

/// Registration data lookup against an RDAP service.
///
/// RDAP answers on different paths for IP addresses and domain names, and its
/// payloads are large; only the `events` and `nameservers` fields survive.
pub struct RdapProvider {
    client: ProviderClient,
    base_url: String,
}

impl RdapProvider {
    pub fn new(client: ProviderClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn lookup(&self, domain: &str) -> ServiceResult<Value> {
        let segment = if is_ip_address(domain) { "ip" } else { "domain" };
        let url = format!("{}/{segment}/{domain}", self.base_url.trim_end_matches('/'));
        let payload = self.client.get_json(&url).await?;
        Ok(project_rdap_fields(payload))
    }
}

impl ProviderAdapter for RdapProvider {
    fn fetch<'a>(&'a self, domain: &'a str) -> BoxFuture<'a, ServiceResult<Value>> {
        Box::pin(self.lookup(domain))
    }
}

/// Ping measurements from the ViewDNS API. Requires an API key.
pub struct PingProvider {
    client: ProviderClient,
    base_url: String,
    api_key: String,
}

impl PingProvider {
    pub fn new(
        client: ProviderClient,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    async fn lookup(&self, domain: &str) -> ServiceResult<Value> {
        let url = format!(
            "{}?host={domain}&apikey={}&output=json",
            self.base_url, self.api_key
        );
        self.client.get_json(&url).await
    }
}

impl ProviderAdapter for PingProvider {
    fn fetch<'a>(&'a self, domain: &'a str) -> BoxFuture<'a, ServiceResult<Value>> {
        Box::pin(self.lookup(domain))
    }
}

/// Domain reputation report from VirusTotal. Requires an API key, sent as the
/// `x-apikey` header. Only the payload's `data` field is returned.
pub struct VirusTotalProvider {
    client: ProviderClient,
    base_url: String,
    api_key: String,
}

impl VirusTotalProvider {
    pub fn new(
        client: ProviderClient,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    async fn lookup(&self, domain: &str) -> ServiceResult<Value> {
        let url = format!("{}/{domain}", self.base_url.trim_end_matches('/'));
        let mut payload = self
            .client
            .get_json_with_header(&url, "x-apikey", &self.api_key)
            .await?;
        match payload.get_mut("data") {
            Some(data) => Ok(data.take()),
            None => Err(ServiceError::no_data("response has no data field")),
        }
    }
}

impl ProviderAdapter for VirusTotalProvider {
    fn fetch<'a>(&'a self, domain: &'a str) -> BoxFuture<'a, ServiceResult<Value>> {
        Box::pin(self.lookup(domain))
    }
}

/// Keeps only the RDAP fields the API exposes. Fields absent from the payload
/// stay absent from the projection.
fn project_rdap_fields(mut payload: Value) -> Value {
    let mut projected = Map::new();
    for field in ["events", "nameservers"] {
        if let Some(value) = payload.get_mut(field) {
            projected.insert(field.to_owned(), value.take());
        }
    }
    Value::Object(projected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rdap_projection_keeps_known_fields() {
        let payload = json!({
            "events": [{"eventAction": "registration"}],
            "nameservers": [{"ldhName": "ns1.example.com"}],
            "notices": ["dropped"],
        });
        let projected = project_rdap_fields(payload);
        assert_eq!(
            projected,
            json!({
                "events": [{"eventAction": "registration"}],
                "nameservers": [{"ldhName": "ns1.example.com"}],
            })
        );
    }

    #[test]
    fn rdap_projection_of_sparse_payload_is_empty_object() {
        assert_eq!(project_rdap_fields(json!({"notices": []})), json!({}));
        assert_eq!(project_rdap_fields(json!("not an object")), json!({}));
    }
}
