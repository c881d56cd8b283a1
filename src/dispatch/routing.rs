use crate::dispatch::pool::{spawn_worker_unit, PoolSlot, WorkerSpawnParams};
use crate::dispatch::query::{LookupQuery, PendingQuery, ServiceResponse};
use crate::providers::error::ServiceError;
use crate::providers::registry::ProviderRegistry;
use crate::providers::service::ServiceId;
use crate::runtime::telemetry::Telemetry;
use crate::workers::messages::{
    DispatchEvent, DispatchEventReceiver, DispatchEventSender, Job, JobResponse, QueryId,
    WorkerGeneration,
};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Queue depth for caller commands. Submissions beyond this apply gentle
/// back-pressure on callers while the loop catches up.
pub(super) const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Requests from the dispatcher facade to the routing loop.
#[derive(Debug)]
pub(super) enum DispatchCommand {
    Submit {
        lookup: LookupQuery,
        reply: oneshot::Sender<Vec<ServiceResponse>>,
    },
}

pub(super) type DispatchCommandSender = mpsc::Sender<DispatchCommand>;
pub(super) type DispatchCommandReceiver = mpsc::Receiver<DispatchCommand>;

pub(super) fn dispatch_command_channel() -> (DispatchCommandSender, DispatchCommandReceiver) {
    mpsc::channel(COMMAND_CHANNEL_CAPACITY)
}

/// Single-task owner of the pool slots, the round-robin cursor, and the
/// pending-query table.
///
/// All dispatch state is confined to this task, so assignment, aggregation,
/// crash handling, and respawns never race each other. The rest of the crate
/// talks to it exclusively through the command and event channels.
pub(super) struct RoutingLoop {
    slots: Vec<PoolSlot>,
    cursor: usize,
    pending: HashMap<QueryId, PendingQuery>,
    next_query: QueryId,
    next_generation: WorkerGeneration,
    commands: DispatchCommandReceiver,
    events: DispatchEventReceiver,
    event_tx: DispatchEventSender,
    registry: Arc<ProviderRegistry>,
    telemetry: Arc<Telemetry>,
    job_timeout: Duration,
    run_token: CancellationToken,
}

pub(super) struct RoutingLoopParams {
    pub pool_size: usize,
    pub job_timeout: Duration,
    pub registry: Arc<ProviderRegistry>,
    pub telemetry: Arc<Telemetry>,
    pub commands: DispatchCommandReceiver,
    pub events: DispatchEventReceiver,
    pub event_tx: DispatchEventSender,
    pub run_token: CancellationToken,
}

impl RoutingLoop {
    pub(super) fn new(params: RoutingLoopParams) -> Self {
        let RoutingLoopParams {
            pool_size,
            job_timeout,
            registry,
            telemetry,
            commands,
            events,
            event_tx,
            run_token,
        } = params;

        let pool_size = pool_size.max(1);
        let mut routing = Self {
            slots: Vec::with_capacity(pool_size),
            cursor: 0,
            pending: HashMap::new(),
            next_query: 0,
            next_generation: 0,
            commands,
            events,
            event_tx,
            registry,
            telemetry,
            job_timeout,
            run_token,
        };
        for slot in 0..pool_size {
            let pool_slot = routing.spawn_slot(slot);
            routing.slots.push(pool_slot);
        }
        routing
    }

    pub(super) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        tracing::debug!(pool = self.slots.len(), "routing loop started");

        loop {
            tokio::select! {
                _ = self.run_token.cancelled() => {
                    tracing::debug!("routing loop received shutdown signal");
                    break;
                }
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        tracing::debug!("command channel closed; shutting down routing loop");
                        break;
                    }
                },
                event = self.events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => {
                        tracing::debug!("event channel closed; shutting down routing loop");
                        break;
                    }
                },
            }
        }

        self.shutdown().await;
    }

    fn handle_command(&mut self, command: DispatchCommand) {
        match command {
            DispatchCommand::Submit { lookup, reply } => self.accept_query(lookup, reply),
        }
    }

    fn handle_event(&mut self, event: DispatchEvent) {
        match event {
            DispatchEvent::Response(response) => self.record_response(response),
            DispatchEvent::JobExpired { query, service } => self.expire_job(query, service),
            DispatchEvent::WorkerCrashed { slot, generation } => {
                self.handle_crash(slot, generation)
            }
        }
    }

    fn accept_query(&mut self, lookup: LookupQuery, reply: oneshot::Sender<Vec<ServiceResponse>>) {
        self.next_query += 1;
        let query = self.next_query;
        let services = lookup.distinct_services();

        self.telemetry.record_query_submitted();
        tracing::info!(
            query,
            domain = %lookup.domain,
            services = services.len(),
            "query accepted"
        );

        if services.is_empty() {
            self.telemetry.record_query_completed();
            let _ = reply.send(Vec::new());
            return;
        }

        let job_count = services.len() as u64;
        let pending = PendingQuery::new(lookup.domain.clone(), services.clone(), reply);
        self.pending.insert(query, pending);
        self.telemetry.record_pending_queries(self.pending.len());

        for service in services {
            self.assign_job(Job {
                query,
                service,
                domain: lookup.domain.clone(),
            });
            self.arm_job_timer(query, service);
        }
        self.telemetry.record_jobs_dispatched(job_count);
    }

    /// Hands the job to the slot under the cursor and advances the cursor.
    ///
    /// A closed mailbox means the unit died before its supervisor's crash
    /// event reached us. The slot is respawned right away and the job is not
    /// requeued; its timer settles the query with a crash entry.
    fn assign_job(&mut self, job: Job) {
        let slot_index = self.cursor;
        self.cursor = (self.cursor + 1) % self.slots.len();

        tracing::debug!(
            query = job.query,
            service = %job.service,
            slot = slot_index,
            "job assigned"
        );
        if let Err(err) = self.slots[slot_index].jobs.send(job) {
            tracing::warn!(
                slot = slot_index,
                error = %err,
                "worker mailbox closed; respawning the slot"
            );
            self.respawn_slot(slot_index);
        }
    }

    fn arm_job_timer(&self, query: QueryId, service: ServiceId) {
        let events = self.event_tx.clone();
        let deadline = self.job_timeout;
        let run_token = self.run_token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = run_token.cancelled() => {}
                _ = tokio::time::sleep(deadline) => {
                    let _ = events.send(DispatchEvent::JobExpired { query, service }).await;
                }
            }
        });
    }

    fn record_response(&mut self, response: JobResponse) {
        self.telemetry.record_response();
        let JobResponse {
            query,
            slot,
            service,
            outcome,
            ..
        } = response;

        let Some(pending) = self.pending.get_mut(&query) else {
            tracing::debug!(
                query,
                service = %service,
                slot,
                "response for a settled query; dropping it"
            );
            return;
        };
        if !pending.record(ServiceResponse::from_outcome(service, outcome)) {
            tracing::debug!(
                query,
                service = %service,
                slot,
                "service already answered; dropping the late response"
            );
            return;
        }
        self.settle_if_complete(query);
    }

    /// A job passed its deadline without an answer. If its service is still
    /// unanswered the query gets a crash entry for it, so a hung or lost
    /// worker can never stall the caller forever.
    fn expire_job(&mut self, query: QueryId, service: ServiceId) {
        let Some(pending) = self.pending.get_mut(&query) else {
            return;
        };
        let expired = ServiceResponse::with_error(
            service,
            ServiceError::worker_crash("worker did not respond within the job deadline"),
        );
        if !pending.record(expired) {
            return;
        }
        self.telemetry.record_job_expired();
        tracing::warn!(
            query,
            service = %service,
            domain = %pending.domain(),
            "job deadline passed; recording a crash entry"
        );
        self.settle_if_complete(query);
    }

    fn settle_if_complete(&mut self, query: QueryId) {
        let complete = self
            .pending
            .get(&query)
            .is_some_and(|pending| pending.is_complete());
        if !complete {
            return;
        }

        if let Some(pending) = self.pending.remove(&query) {
            self.telemetry.record_query_completed();
            tracing::info!(query, domain = %pending.domain(), "query completed");
            pending.finish();
        }
        self.telemetry.record_pending_queries(self.pending.len());
    }

    fn handle_crash(&mut self, slot: usize, generation: WorkerGeneration) {
        let current = self.slots.get(slot).map(|pool_slot| pool_slot.generation);
        if current != Some(generation) {
            tracing::debug!(slot, generation, "stale crash event; slot already replaced");
            return;
        }

        self.telemetry.record_worker_crash();
        tracing::error!(slot, generation, "worker crashed; respawning its slot");
        self.respawn_slot(slot);
    }

    fn respawn_slot(&mut self, slot: usize) {
        let replacement = self.spawn_slot(slot);
        // Dropping the retired handle detaches its finished supervisor task.
        let _ = std::mem::replace(&mut self.slots[slot], replacement);
        self.telemetry.record_worker_respawn();
    }

    fn spawn_slot(&mut self, slot: usize) -> PoolSlot {
        self.next_generation += 1;
        spawn_worker_unit(WorkerSpawnParams {
            slot,
            generation: self.next_generation,
            registry: self.registry.clone(),
            events: self.event_tx.clone(),
            shutdown: self.run_token.clone(),
            telemetry: self.telemetry.clone(),
        })
    }

    async fn shutdown(mut self) {
        self.run_token.cancel();
        // Unblocks any worker parked on a full event channel.
        drop(self.events);

        let slots = std::mem::take(&mut self.slots);
        let handles: Vec<JoinHandle<()>> = slots.into_iter().map(|slot| slot.handle).collect();
        let results = join_all(handles).await;
        for (slot, result) in results.into_iter().enumerate() {
            if let Err(err) = result {
                tracing::warn!(slot, error = %err, "worker task terminated unexpectedly");
            }
        }

        if !self.pending.is_empty() {
            tracing::info!(
                dropped = self.pending.len(),
                "dropping unfinished queries on shutdown"
            );
        }
        self.pending.clear();
        self.telemetry.record_pending_queries(0);
        tracing::debug!("routing loop stopped");
    }
}
