use crate::providers::error::{ServiceError, ServiceResult};
use regex::Regex;
use std::sync::OnceLock;

static IP_ADDRESS: OnceLock<Regex> = OnceLock::new();
static DOMAIN_NAME: OnceLock<Regex> = OnceLock::new();

fn ip_address_pattern() -> &'static Regex {
    IP_ADDRESS.get_or_init(|| {
        Regex::new(r"^(?:[0-9]{1,3}\.){3}[0-9]{1,3}$").expect("ip pattern should compile")
    })
}

fn domain_name_pattern() -> &'static Regex {
    DOMAIN_NAME.get_or_init(|| {
        Regex::new(r"^(?:https?://)?\w+\.\w{2,4}$").expect("domain pattern should compile")
    })
}

/// Dotted-quad shape check. Octet ranges are not enforced.
pub fn is_ip_address(value: &str) -> bool {
    ip_address_pattern().is_match(value)
}

/// Two-label hostname (`name.tld`) with an optional scheme prefix and a
/// 2 to 4 character TLD.
pub fn is_url(value: &str) -> bool {
    domain_name_pattern().is_match(value)
}

/// Drops a leading `http://` or `https://` so adapters receive a bare target.
pub fn strip_scheme(value: &str) -> &str {
    value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"))
        .unwrap_or(value)
}

/// Checks query syntax and normalizes the domain for the adapters.
pub fn validate_domain(domain: &str) -> ServiceResult<String> {
    if is_ip_address(domain) || is_url(domain) {
        Ok(strip_scheme(domain).to_owned())
    } else {
        Err(ServiceError::validation("invalid domain"))
    }
}
