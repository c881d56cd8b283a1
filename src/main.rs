use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, ensure, Context, Result};
use domainprobe::{DispatchConfig, Dispatcher, LookupQuery, ServiceId};

const DEFAULT_POOL_SIZE: usize = 2;
const DEFAULT_JOB_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_LOG_DIRECTIVE: &str = "info";

#[tokio::main]
async fn main() -> Result<()> {
    init_cli_tracing();

    let args = CliArgs::parse()?;
    let config = args.to_dispatch_config()?;

    let mut dispatcher = Dispatcher::from_config(config)?;
    dispatcher.start().await?;

    let outcome = dispatcher
        .submit_query(LookupQuery::new(args.domain, args.services))
        .await;
    dispatcher.stop().await?;

    let responses = outcome?;
    println!("{}", serde_json::to_string_pretty(&responses)?);
    Ok(())
}

fn init_cli_tracing() {
    if env::var_os("RUST_LOG").is_none() {
        env::set_var("RUST_LOG", DEFAULT_LOG_DIRECTIVE);
    }
    domainprobe::init_tracing();
}

struct CliArgs {
    domain: String,
    services: Vec<ServiceId>,
    pool_size: usize,
    job_timeout_secs: u64,
    request_timeout_secs: u64,
    ip_api_url: Option<String>,
    rdap_url: Option<String>,
    ping_url: Option<String>,
    virus_total_url: Option<String>,
    ping_api_key: Option<String>,
    virus_total_api_key: Option<String>,
}

impl CliArgs {
    fn parse() -> Result<Self> {
        let mut cli = env::args().skip(1);
        let Some(domain) = cli.next() else {
            bail!("usage: domainprobe <domain> [service ...] (services: IPAPI, RDAP, Ping, VirusTotal)");
        };

        let services = cli
            .map(|name| {
                ServiceId::from_str(&name)
                    .with_context(|| format!("unrecognized service '{name}'"))
            })
            .collect::<Result<Vec<_>>>()?;
        let services = if services.is_empty() {
            ServiceId::ALL.into()
        } else {
            services
        };

        let pool_size =
            parse_env_with_default::<usize>("DOMAINPROBE_POOL_SIZE", DEFAULT_POOL_SIZE)?;
        let job_timeout_secs = parse_env_with_default::<u64>(
            "DOMAINPROBE_JOB_TIMEOUT_SECS",
            DEFAULT_JOB_TIMEOUT_SECS,
        )?;
        let request_timeout_secs = parse_env_with_default::<u64>(
            "DOMAINPROBE_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;

        ensure!(pool_size > 0, "DOMAINPROBE_POOL_SIZE must be greater than 0");
        ensure!(
            job_timeout_secs > 0,
            "DOMAINPROBE_JOB_TIMEOUT_SECS must be greater than 0"
        );
        ensure!(
            request_timeout_secs > 0,
            "DOMAINPROBE_REQUEST_TIMEOUT_SECS must be greater than 0"
        );

        Ok(Self {
            domain,
            services,
            pool_size,
            job_timeout_secs,
            request_timeout_secs,
            ip_api_url: read_optional_env("DOMAINPROBE_IP_API_URL"),
            rdap_url: read_optional_env("DOMAINPROBE_RDAP_URL"),
            ping_url: read_optional_env("DOMAINPROBE_PING_URL"),
            virus_total_url: read_optional_env("DOMAINPROBE_VIRUS_TOTAL_URL"),
            ping_api_key: read_optional_env("DOMAINPROBE_PING_API_KEY"),
            virus_total_api_key: read_optional_env("DOMAINPROBE_VIRUS_TOTAL_API_KEY"),
        })
    }

    fn to_dispatch_config(&self) -> Result<DispatchConfig> {
        let mut builder = DispatchConfig::builder()
            .pool_size(self.pool_size)
            .job_timeout(Duration::from_secs(self.job_timeout_secs))
            .request_timeout(Duration::from_secs(self.request_timeout_secs));

        if let Some(url) = &self.ip_api_url {
            builder = builder.ip_api_url(url.clone());
        }
        if let Some(url) = &self.rdap_url {
            builder = builder.rdap_url(url.clone());
        }
        if let Some(url) = &self.ping_url {
            builder = builder.ping_url(url.clone());
        }
        if let Some(url) = &self.virus_total_url {
            builder = builder.virus_total_url(url.clone());
        }
        if let Some(key) = &self.ping_api_key {
            builder = builder.ping_api_key(key.clone());
        }
        if let Some(key) = &self.virus_total_api_key {
            builder = builder.virus_total_api_key(key.clone());
        }

        builder.build()
    }
}

fn read_optional_env(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

fn parse_env_with_default<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("failed to parse {key}='{value}'")),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("failed to read {key}")),
    }
}
