use crate::providers::registry::ProviderRegistry;
use crate::runtime::telemetry::Telemetry;
use crate::workers::messages::{
    job_channel, DispatchEvent, DispatchEventSender, JobSender, WorkerGeneration,
};
use crate::workers::unit::{WorkerUnit, WorkerUnitParams};
use futures::FutureExt;
use std::any::Any;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// One occupied slot of the dispatch pool: the mailbox of the unit currently
/// holding the slot, the generation it was spawned with, and the supervisor
/// task handle to join on shutdown.
pub(super) struct PoolSlot {
    pub(super) jobs: JobSender,
    pub(super) generation: WorkerGeneration,
    pub(super) handle: JoinHandle<()>,
}

pub(super) struct WorkerSpawnParams {
    pub slot: usize,
    pub generation: WorkerGeneration,
    pub registry: Arc<ProviderRegistry>,
    pub events: DispatchEventSender,
    pub shutdown: CancellationToken,
    pub telemetry: Arc<Telemetry>,
}

/// Creates a fresh worker unit with its own mailbox and spawns it under a
/// supervisor that reports panics and error exits as crash events.
pub(super) fn spawn_worker_unit(params: WorkerSpawnParams) -> PoolSlot {
    let WorkerSpawnParams {
        slot,
        generation,
        registry,
        events,
        shutdown,
        telemetry,
    } = params;

    let (job_tx, job_rx) = job_channel();
    let unit = WorkerUnit::new(WorkerUnitParams {
        slot,
        generation,
        registry,
        jobs: job_rx,
        events: events.clone(),
        shutdown,
        telemetry,
    });
    let handle = tokio::spawn(supervise(slot, generation, unit, events));

    PoolSlot {
        jobs: job_tx,
        generation,
        handle,
    }
}

async fn supervise(
    slot: usize,
    generation: WorkerGeneration,
    unit: WorkerUnit,
    events: DispatchEventSender,
) {
    let result = std::panic::AssertUnwindSafe(unit.run()).catch_unwind().await;

    match result {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            tracing::error!(slot, generation, error = %err, "worker unit exited with error");
            notify_crash(slot, generation, &events).await;
        }
        Err(panic_payload) => {
            let panic_msg = panic_message(panic_payload.as_ref());
            tracing::error!(slot, generation, panic = %panic_msg, "worker unit panicked");
            notify_crash(slot, generation, &events).await;
        }
    }
}

async fn notify_crash(slot: usize, generation: WorkerGeneration, events: &DispatchEventSender) {
    if events
        .send(DispatchEvent::WorkerCrashed { slot, generation })
        .await
        .is_err()
    {
        tracing::debug!(slot, "routing loop is gone; dropping crash notice");
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::adapters::ProviderAdapter;
    use crate::providers::error::ServiceResult;
    use crate::providers::service::ServiceId;
    use crate::workers::messages::{dispatch_event_channel, Job};
    use anyhow::Result;
    use futures::future::BoxFuture;
    use serde_json::Value;
    use std::time::Duration;
    use tokio::time::timeout;

    struct PanickingProvider;

    impl ProviderAdapter for PanickingProvider {
        fn fetch<'a>(&'a self, _domain: &'a str) -> BoxFuture<'a, ServiceResult<Value>> {
            Box::pin(async { panic!("provider blew up") })
        }
    }

    #[tokio::test]
    async fn supervisor_turns_worker_panics_into_crash_events() -> Result<()> {
        let mut registry = ProviderRegistry::default();
        registry.register(ServiceId::IpApi, Arc::new(PanickingProvider));

        let (event_tx, mut event_rx) = dispatch_event_channel(8);
        let shutdown = CancellationToken::new();
        let slot = spawn_worker_unit(WorkerSpawnParams {
            slot: 3,
            generation: 7,
            registry: Arc::new(registry),
            events: event_tx,
            shutdown: shutdown.clone(),
            telemetry: Arc::new(Telemetry::default()),
        });

        slot.jobs.send(Job {
            query: 1,
            service: ServiceId::IpApi,
            domain: "example.com".into(),
        })?;

        let event = timeout(Duration::from_secs(1), event_rx.recv())
            .await
            .expect("crash event should arrive before the timeout")
            .expect("event channel should stay open");
        match event {
            DispatchEvent::WorkerCrashed {
                slot: crashed,
                generation,
            } => {
                assert_eq!(crashed, 3, "crash should name the slot that panicked");
                assert_eq!(generation, 7, "crash should carry the unit generation");
            }
            other => panic!("expected a crash event, got {other:?}"),
        }

        slot.handle.await?;
        Ok(())
    }

    #[tokio::test]
    async fn clean_worker_exit_produces_no_crash_event() -> Result<()> {
        let (event_tx, mut event_rx) = dispatch_event_channel(8);
        let shutdown = CancellationToken::new();
        let slot = spawn_worker_unit(WorkerSpawnParams {
            slot: 0,
            generation: 1,
            registry: Arc::new(ProviderRegistry::default()),
            events: event_tx,
            shutdown: shutdown.clone(),
            telemetry: Arc::new(Telemetry::default()),
        });

        shutdown.cancel();
        slot.handle.await?;

        assert!(
            event_rx.try_recv().is_err(),
            "a cancelled worker should not report a crash"
        );
        Ok(())
    }
}
