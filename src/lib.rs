pub mod dispatch;
pub mod providers;
pub mod runtime;
pub mod workers;

pub use dispatch::dispatcher::Dispatcher;
pub use dispatch::query::{LookupQuery, ServiceResponse};
pub use providers::adapters::{
    IpApiProvider, PingProvider, ProviderAdapter, RdapProvider, VirusTotalProvider,
};
pub use providers::client::ProviderClient;
pub use providers::error::{ErrorKind, ServiceError, ServiceResult};
pub use providers::registry::ProviderRegistry;
pub use providers::service::ServiceId;
pub use runtime::config::{DispatchConfig, DispatchConfigBuilder, DispatchConfigParams};
pub use runtime::telemetry::{init_tracing, Telemetry, TelemetrySnapshot};
pub use workers::messages::{Job, JobResponse, QueryId};
pub use workers::unit::WorkerUnit;
