use crate::providers::error::{ErrorKind, ServiceError, ServiceResult};
use crate::providers::registry::ProviderRegistry;
use crate::providers::service::ServiceId;
use crate::runtime::telemetry::Telemetry;
use crate::workers::messages::{
    DispatchEvent, DispatchEventSender, Job, JobReceiver, JobResponse, WorkerGeneration,
};
use crate::workers::validate::validate_domain;
use anyhow::Result;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// One isolated execution unit of the dispatch pool.
///
/// A unit drains its mailbox strictly in order and carries one job to
/// completion before taking the next. Recoverable failures come back as
/// error-bearing responses; only a panic escapes to the supervisor.
pub struct WorkerUnit {
    slot: usize,
    generation: WorkerGeneration,
    registry: Arc<ProviderRegistry>,
    jobs: JobReceiver,
    events: DispatchEventSender,
    shutdown: CancellationToken,
    telemetry: Arc<Telemetry>,
}

pub struct WorkerUnitParams {
    pub slot: usize,
    pub generation: WorkerGeneration,
    pub registry: Arc<ProviderRegistry>,
    pub jobs: JobReceiver,
    pub events: DispatchEventSender,
    pub shutdown: CancellationToken,
    pub telemetry: Arc<Telemetry>,
}

impl WorkerUnit {
    pub fn new(params: WorkerUnitParams) -> Self {
        let WorkerUnitParams {
            slot,
            generation,
            registry,
            jobs,
            events,
            shutdown,
            telemetry,
        } = params;

        Self {
            slot,
            generation,
            registry,
            jobs,
            events,
            shutdown,
            telemetry,
        }
    }

    #[tracing::instrument(
        name = "worker",
        skip_all,
        fields(slot = self.slot, generation = self.generation)
    )]
    pub async fn run(mut self) -> Result<()> {
        tracing::info!("worker unit started");

        loop {
            let job = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("shutdown requested; exiting worker loop");
                    break;
                }
                job = self.jobs.recv() => match job {
                    Some(job) => job,
                    None => {
                        tracing::debug!("job channel closed; exiting worker loop");
                        break;
                    }
                },
            };

            let response_future = self.handle(job);
            tokio::pin!(response_future);
            let response = tokio::select! {
                response = &mut response_future => response,
                _ = self.shutdown.cancelled() => {
                    tracing::info!("shutdown requested mid-job; abandoning it");
                    break;
                }
            };

            if self
                .events
                .send(DispatchEvent::Response(response))
                .await
                .is_err()
            {
                tracing::debug!("event channel closed; exiting worker loop");
                break;
            }
        }

        tracing::info!("worker unit exited");
        Ok(())
    }

    async fn handle(&self, job: Job) -> JobResponse {
        let Job {
            query,
            service,
            domain,
        } = job;
        tracing::debug!(query, service = %service, domain = %domain, "processing job");

        let outcome = self.lookup(service, &domain).await;
        match &outcome {
            Ok(_) => {
                tracing::debug!(query, service = %service, "job produced data");
            }
            Err(err) => {
                tracing::warn!(query, service = %service, error = %err, "job failed");
                match err.kind() {
                    ErrorKind::Validation => self.telemetry.record_validation_failure(),
                    _ => self.telemetry.record_provider_error(),
                }
            }
        }

        JobResponse {
            query,
            slot: self.slot,
            service,
            domain,
            outcome,
        }
    }

    async fn lookup(&self, service: ServiceId, domain: &str) -> ServiceResult<Value> {
        let cleaned = validate_domain(domain)?;
        let adapter = self.registry.get(service).ok_or_else(|| {
            ServiceError::validation(format!("no provider configured for {service}"))
        })?;
        adapter.fetch(&cleaned).await
    }
}
