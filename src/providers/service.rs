use crate::providers::error::ServiceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Logical name of an external information provider.
///
/// The wire names are part of the public API contract and never change case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceId {
    #[serde(rename = "IPAPI")]
    IpApi,
    #[serde(rename = "RDAP")]
    Rdap,
    #[serde(rename = "Ping")]
    Ping,
    #[serde(rename = "VirusTotal")]
    VirusTotal,
}

impl ServiceId {
    pub const ALL: [ServiceId; 4] = [
        ServiceId::IpApi,
        ServiceId::Rdap,
        ServiceId::Ping,
        ServiceId::VirusTotal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceId::IpApi => "IPAPI",
            ServiceId::Rdap => "RDAP",
            ServiceId::Ping => "Ping",
            ServiceId::VirusTotal => "VirusTotal",
        }
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceId {
    type Err = ServiceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ServiceId::ALL
            .into_iter()
            .find(|service| service.as_str() == value)
            .ok_or_else(|| ServiceError::validation(format!("unknown service: {value}")))
    }
}
