//! Provider integration: the adapter seam, the shared HTTP client, the
//! concrete lookup services, and the error taxonomy they report in.

pub mod adapters;
pub mod client;
pub mod error;
pub mod registry;
pub mod service;

pub use adapters::{
    IpApiProvider, PingProvider, ProviderAdapter, RdapProvider, VirusTotalProvider,
};
pub use client::ProviderClient;
pub use error::{ErrorKind, ServiceError, ServiceResult};
pub use registry::ProviderRegistry;
pub use service::ServiceId;
