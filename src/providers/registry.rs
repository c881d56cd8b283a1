use crate::providers::adapters::{
    IpApiProvider, PingProvider, ProviderAdapter, RdapProvider, VirusTotalProvider,
};
use crate::providers::client::ProviderClient;
use crate::providers::service::ServiceId;
use crate::runtime::config::DispatchConfig;
use anyhow::Result;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Maps service names to the adapter that answers them.
///
/// A query naming a service absent from the registry fails that service with
/// a validation error instead of failing the whole query.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    adapters: HashMap<ServiceId, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the live adapter set for `config`.
    ///
    /// ip-api and RDAP need no credentials and are always registered; ping and
    /// VirusTotal join only when their API key is configured.
    pub fn from_config(config: &DispatchConfig) -> Result<Self> {
        let client = ProviderClient::new(config.request_timeout())?;

        let mut registry = Self::new();
        registry.register(
            ServiceId::IpApi,
            Arc::new(IpApiProvider::new(client.clone(), config.ip_api_url())),
        );
        registry.register(
            ServiceId::Rdap,
            Arc::new(RdapProvider::new(client.clone(), config.rdap_url())),
        );
        if let Some(key) = config.ping_api_key() {
            registry.register(
                ServiceId::Ping,
                Arc::new(PingProvider::new(client.clone(), config.ping_url(), key)),
            );
        }
        if let Some(key) = config.virus_total_api_key() {
            registry.register(
                ServiceId::VirusTotal,
                Arc::new(VirusTotalProvider::new(
                    client,
                    config.virus_total_url(),
                    key,
                )),
            );
        }

        Ok(registry)
    }

    pub fn register(&mut self, service: ServiceId, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(service, adapter);
    }

    pub fn get(&self, service: ServiceId) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(&service).cloned()
    }

    pub fn contains(&self, service: ServiceId) -> bool {
        self.adapters.contains_key(&service)
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Registered service names in declaration order, for logs and tests.
    pub fn service_names(&self) -> Vec<&'static str> {
        ServiceId::ALL
            .into_iter()
            .filter(|service| self.adapters.contains_key(service))
            .map(|service| service.as_str())
            .collect()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("services", &self.service_names())
            .finish()
    }
}
