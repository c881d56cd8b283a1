use crate::providers::error::ServiceError;
use crate::providers::service::ServiceId;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::oneshot;

/// A caller's request: one domain, any number of services.
///
/// Duplicate services are accepted and answered once; an empty service list
/// resolves to an empty result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupQuery {
    pub domain: String,
    pub services: Vec<ServiceId>,
}

impl LookupQuery {
    pub fn new(domain: impl Into<String>, services: impl Into<Vec<ServiceId>>) -> Self {
        Self {
            domain: domain.into(),
            services: services.into(),
        }
    }

    /// Requested services with duplicates removed, first occurrence kept.
    pub fn distinct_services(&self) -> Vec<ServiceId> {
        let mut distinct = Vec::with_capacity(self.services.len());
        for service in &self.services {
            if !distinct.contains(service) {
                distinct.push(*service);
            }
        }
        distinct
    }
}

/// Per-service slice of a completed query.
///
/// Exactly one of `data` and `error` is populated; the constructors are the
/// only way to build one.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceResponse {
    service: ServiceId,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ServiceError>,
}

impl ServiceResponse {
    pub fn with_data(service: ServiceId, data: Value) -> Self {
        Self {
            service,
            data: Some(data),
            error: None,
        }
    }

    pub fn with_error(service: ServiceId, error: ServiceError) -> Self {
        Self {
            service,
            data: None,
            error: Some(error),
        }
    }

    pub fn from_outcome(service: ServiceId, outcome: Result<Value, ServiceError>) -> Self {
        match outcome {
            Ok(data) => Self::with_data(service, data),
            Err(error) => Self::with_error(service, error),
        }
    }

    pub fn service(&self) -> ServiceId {
        self.service
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&ServiceError> {
        self.error.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.data.is_some()
    }
}

/// Bookkeeping for one in-flight query inside the routing loop.
///
/// Responses merge first-wins per service; the query completes when every
/// distinct requested service has exactly one entry.
pub(super) struct PendingQuery {
    domain: String,
    expected: Vec<ServiceId>,
    responses: Vec<ServiceResponse>,
    reply: oneshot::Sender<Vec<ServiceResponse>>,
}

impl PendingQuery {
    pub(super) fn new(
        domain: String,
        expected: Vec<ServiceId>,
        reply: oneshot::Sender<Vec<ServiceResponse>>,
    ) -> Self {
        let responses = Vec::with_capacity(expected.len());
        Self {
            domain,
            expected,
            responses,
            reply,
        }
    }

    pub(super) fn domain(&self) -> &str {
        &self.domain
    }

    /// Records `response` unless its service is unexpected or already
    /// answered. Returns whether the entry was kept.
    pub(super) fn record(&mut self, response: ServiceResponse) -> bool {
        if !self.expected.contains(&response.service()) {
            return false;
        }
        if self
            .responses
            .iter()
            .any(|existing| existing.service() == response.service())
        {
            return false;
        }
        self.responses.push(response);
        true
    }

    pub(super) fn is_complete(&self) -> bool {
        self.responses.len() == self.expected.len()
    }

    /// Delivers the collected responses to the caller. Send failures mean
    /// the caller gave up waiting and are ignored.
    pub(super) fn finish(self) {
        let _ = self.reply.send(self.responses);
    }
}
