//! Worker units and the message protocol between them and the dispatch
//! routing loop:
//! - `messages`: job/response/event types plus channel constructors
//! - `unit`: the isolated execution unit run by each pool slot
//! - `validate`: query syntax checks shared with the adapters

pub mod messages;
pub mod unit;
pub mod validate;


pub use messages::{
    dispatch_event_channel, job_channel, DispatchEvent, DispatchEventReceiver, DispatchEventSender,
    Job, JobReceiver, JobResponse, JobSender, QueryId, WorkerGeneration,
};
pub use unit::{WorkerUnit, WorkerUnitParams};
