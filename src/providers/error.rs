use serde::Serialize;
use thiserror::Error;

/// Classification of a failed service lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Network,
    NoData,
    WorkerCrash,
}

/// Failure carried inside a per-service response.
///
/// The wire shape is `{ "code": ..., "message": ... }`, with codes kept stable
/// for API consumers. `Validation`, `Network`, and `NoData` originate in the
/// workers and adapters; `WorkerCrash` is synthesized by the dispatcher when a
/// job's deadline expires without a response.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code")]
pub enum ServiceError {
    #[error("validation failed: {message}")]
    #[serde(rename = "BAD_REQUEST")]
    Validation { message: String },

    #[error("network failure: {message}")]
    #[serde(rename = "NETWORK_ERROR")]
    Network { message: String },

    #[error("no data: {message}")]
    #[serde(rename = "NO_DATA")]
    NoData { message: String },

    #[error("worker crashed: {message}")]
    #[serde(rename = "WORKER_CRASH")]
    WorkerCrash { message: String },
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn no_data(message: impl Into<String>) -> Self {
        Self::NoData {
            message: message.into(),
        }
    }

    pub fn worker_crash(message: impl Into<String>) -> Self {
        Self::WorkerCrash {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Network { .. } => ErrorKind::Network,
            Self::NoData { .. } => ErrorKind::NoData,
            Self::WorkerCrash { .. } => ErrorKind::WorkerCrash,
        }
    }

    /// Stable machine-readable code exposed to API consumers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "BAD_REQUEST",
            Self::Network { .. } => "NETWORK_ERROR",
            Self::NoData { .. } => "NO_DATA",
            Self::WorkerCrash { .. } => "WORKER_CRASH",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Validation { message }
            | Self::Network { message }
            | Self::NoData { message }
            | Self::WorkerCrash { message } => message,
        }
    }
}
