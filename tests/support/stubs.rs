use std::sync::Arc;
use std::time::Duration;

use domainprobe::{ProviderAdapter, ServiceError, ServiceResult};
use futures::future::BoxFuture;
use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::sleep;

/// Answers every request with a clone of one payload and records the domains
/// it was asked about.
pub struct StaticProvider {
    payload: Value,
    requests: AsyncMutex<Vec<String>>,
}

impl StaticProvider {
    pub fn new(payload: Value) -> Arc<Self> {
        Arc::new(Self {
            payload,
            requests: AsyncMutex::new(Vec::new()),
        })
    }

    pub async fn request_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    pub async fn requests(&self) -> Vec<String> {
        self.requests.lock().await.clone()
    }
}

impl ProviderAdapter for StaticProvider {
    fn fetch<'a>(&'a self, domain: &'a str) -> BoxFuture<'a, ServiceResult<Value>> {
        Box::pin(async move {
            self.requests.lock().await.push(domain.to_owned());
            Ok(self.payload.clone())
        })
    }
}

/// Fails every request with a clone of one error.
pub struct FailingProvider {
    error: ServiceError,
}

impl FailingProvider {
    pub fn new(error: ServiceError) -> Arc<Self> {
        Arc::new(Self { error })
    }
}

impl ProviderAdapter for FailingProvider {
    fn fetch<'a>(&'a self, _domain: &'a str) -> BoxFuture<'a, ServiceResult<Value>> {
        Box::pin(async move { Err(self.error.clone()) })
    }
}

/// Panics on every request, taking its worker unit down with it.
pub struct PanickingProvider;

impl PanickingProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }
}

impl ProviderAdapter for PanickingProvider {
    fn fetch<'a>(&'a self, _domain: &'a str) -> BoxFuture<'a, ServiceResult<Value>> {
        Box::pin(async { panic!("stub provider panicked") })
    }
}

/// Sleeps well past any job deadline before answering.
pub struct StallingProvider {
    delay: Duration,
}

impl StallingProvider {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self { delay })
    }
}

impl ProviderAdapter for StallingProvider {
    fn fetch<'a>(&'a self, _domain: &'a str) -> BoxFuture<'a, ServiceResult<Value>> {
        Box::pin(async move {
            sleep(self.delay).await;
            Ok(Value::Null)
        })
    }
}
