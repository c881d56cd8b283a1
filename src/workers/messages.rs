use crate::providers::error::ServiceError;
use crate::providers::service::ServiceId;
use serde_json::Value;
use tokio::sync::mpsc;

/// Identifier the routing loop assigns to each accepted lookup.
pub type QueryId = u64;

/// Identity of one spawned worker unit. Respawning a pool slot produces a
/// fresh generation so events from a replaced unit can be told apart from
/// its successor's.
pub type WorkerGeneration = u64;

/// One unit of work: ask `service` about `domain`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub query: QueryId,
    pub service: ServiceId,
    pub domain: String,
}

/// Terminal outcome of one job.
///
/// `outcome` keeps payload and failure mutually exclusive by construction.
/// `slot` records which pool slot produced the answer.
#[derive(Debug, Clone)]
pub struct JobResponse {
    pub query: QueryId,
    pub slot: usize,
    pub service: ServiceId,
    pub domain: String,
    pub outcome: Result<Value, ServiceError>,
}

/// Events flowing from worker units and their supervisors back to the
/// routing loop.
#[derive(Debug)]
pub enum DispatchEvent {
    /// A worker finished a job, successfully or not.
    Response(JobResponse),
    /// A worker task panicked or exited unexpectedly; its slot needs a
    /// replacement unit.
    WorkerCrashed {
        slot: usize,
        generation: WorkerGeneration,
    },
    /// A dispatched job passed its deadline without a response.
    JobExpired { query: QueryId, service: ServiceId },
}

pub type JobSender = mpsc::UnboundedSender<Job>;
pub type JobReceiver = mpsc::UnboundedReceiver<Job>;
pub type DispatchEventSender = mpsc::Sender<DispatchEvent>;
pub type DispatchEventReceiver = mpsc::Receiver<DispatchEvent>;

/// Per-unit mailbox. Unbounded so the routing loop never blocks on a busy
/// slot; depth stays bounded in practice by the pending-query table.
pub fn job_channel() -> (JobSender, JobReceiver) {
    mpsc::unbounded_channel()
}

pub fn dispatch_event_channel(capacity: usize) -> (DispatchEventSender, DispatchEventReceiver) {
    mpsc::channel(capacity)
}
